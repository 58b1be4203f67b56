// Copyright (c) 2024 Mike Tsao

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

/// A pure `[0,1] → [0,1]` shaping function applied to a morph's progress.
/// Every curve maps 0 to 0 and 1 to 1 exactly, so a finished morph always
/// lands precisely on its target.
#[derive(
    Clone, Copy, Debug, Default, Display, EnumIter, PartialEq, Eq, Serialize, Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Easing {
    #[allow(missing_docs)]
    #[default]
    Linear,
    /// Quadratic, accelerating from zero.
    EaseInQuad,
    /// Quadratic, decelerating to the target.
    EaseOutQuad,
    /// Quadratic in and out, C¹-continuous at the midpoint.
    EaseInOut,
    /// Exponential, accelerating from zero.
    Exponential,
    /// A decaying-bounce landing on the target.
    Bounce,
}
impl Easing {
    /// Applies the curve. Inputs outside `[0,1]` are clamped first.
    pub fn apply(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseInQuad => t * t,
            Easing::EaseOutQuad => t * (2.0 - t),
            Easing::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
            Easing::Exponential => {
                if t == 0.0 {
                    0.0
                } else {
                    2.0f64.powf(10.0 * (t - 1.0))
                }
            }
            Easing::Bounce => {
                const N1: f64 = 7.5625;
                const D1: f64 = 2.75;
                if t < 1.0 / D1 {
                    N1 * t * t
                } else if t < 2.0 / D1 {
                    let t = t - 1.5 / D1;
                    N1 * t * t + 0.75
                } else if t < 2.5 / D1 {
                    let t = t - 2.25 / D1;
                    N1 * t * t + 0.9375
                } else {
                    let t = t - 2.625 / D1;
                    N1 * t * t + 0.984375
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;
    use strum::IntoEnumIterator;

    #[test]
    fn endpoints_are_exact_for_every_curve() {
        for easing in Easing::iter() {
            assert_eq!(easing.apply(0.0), 0.0, "{easing} must map 0 to exactly 0");
            assert_eq!(easing.apply(1.0), 1.0, "{easing} must map 1 to exactly 1");
        }
    }

    #[test]
    fn out_of_range_inputs_are_clamped() {
        for easing in Easing::iter() {
            assert_eq!(easing.apply(-0.5), 0.0);
            assert_eq!(easing.apply(1.5), 1.0);
        }
    }

    #[test]
    fn ease_in_out_matches_reference_curve() {
        // The two halves are 2t² and -1+(4-2t)t, which is the same curve as
        // 1-(-2t+2)²/2 for the upper half.
        assert_eq!(Easing::EaseInOut.apply(0.25), 0.125);
        assert_eq!(Easing::EaseInOut.apply(0.75), 0.875);
        for t in [0.6, 0.75, 0.9] {
            let alt = 1.0 - (-2.0 * t + 2.0f64).powi(2) / 2.0;
            assert!(
                approx_eq!(f64, Easing::EaseInOut.apply(t), alt, ulps = 4),
                "algebraic forms should agree at t={t}"
            );
        }
    }

    #[test]
    fn ease_in_out_is_continuous_and_smooth_at_midpoint() {
        let eps = 1e-9;
        let below = Easing::EaseInOut.apply(0.5 - eps);
        let above = Easing::EaseInOut.apply(0.5 + eps);
        assert!((above - below).abs() < 1e-6, "C⁰ at the midpoint");

        // Slopes from both sides approach 2.
        let slope_below = (Easing::EaseInOut.apply(0.5) - below) / eps;
        let slope_above = (above - Easing::EaseInOut.apply(0.5)) / eps;
        assert!(
            (slope_below - slope_above).abs() < 1e-3,
            "C¹ at the midpoint: {slope_below} vs {slope_above}"
        );
    }

    #[test]
    fn curves_stay_in_unit_interval() {
        for easing in Easing::iter() {
            for i in 0..=100 {
                let t = i as f64 / 100.0;
                let v = easing.apply(t);
                assert!(
                    (0.0..=1.0).contains(&v),
                    "{easing}({t}) = {v} escaped the unit interval"
                );
            }
        }
    }
}
