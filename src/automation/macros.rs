// Copyright (c) 2024 Mike Tsao

use crate::{
    automation::Easing,
    types::{MacroId, Millis, ParamName},
};
use derive_builder::Builder;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

/// The shaping applied to a macro's 0..=1 scalar before range-scaling it into
/// a target parameter.
#[derive(
    Clone, Copy, Debug, Default, Display, EnumIter, PartialEq, Eq, Serialize, Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum MacroCurve {
    #[allow(missing_docs)]
    #[default]
    Linear,
    /// `v²`: slow start, fast finish.
    Exponential,
    /// `√v`: fast start, slow finish.
    Logarithmic,
    /// `sin(v·π/2)`: gentle at both ends.
    Sine,
}
impl MacroCurve {
    /// Applies the curve to a clamped 0..=1 input.
    pub fn apply(&self, v: f64) -> f64 {
        let v = v.clamp(0.0, 1.0);
        match self {
            MacroCurve::Linear => v,
            MacroCurve::Exponential => v * v,
            MacroCurve::Logarithmic => v.sqrt(),
            MacroCurve::Sine => (v * core::f64::consts::FRAC_PI_2).sin(),
        }
    }
}

/// One target of a macro: which parameter it drives, over what output range,
/// through which curve.
#[derive(Clone, Debug, PartialEq, Builder, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MacroMapping {
    /// The parameter this mapping drives.
    #[builder(setter(into))]
    pub target: ParamName,
    /// The parameter value at macro 0 (after curving).
    #[builder(default)]
    pub min: f64,
    /// The parameter value at macro 1 (after curving).
    #[builder(default = "1.0")]
    pub max: f64,
    /// The curve applied to the macro scalar before range-scaling.
    #[builder(default)]
    pub curve: MacroCurve,
}
impl MacroMapping {
    /// The parameter value this mapping produces for the given macro scalar.
    pub fn evaluate(&self, scalar: f64) -> f64 {
        let curved = self.curve.apply(scalar);
        self.min + (self.max - self.min) * curved
    }
}

/// A named 0..=1 control that fans out to many parameters at once.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MacroControl {
    /// The macro's id.
    pub id: MacroId,
    /// A display label.
    pub label: String,
    /// The current scalar, in 0..=1.
    pub value: f64,
    /// The mappings, in registration order.
    pub mappings: Vec<MacroMapping>,
    /// An optional external-controller channel binding, in 0..=127.
    pub channel: Option<u8>,
}

#[derive(Clone, Copy, Debug)]
struct MacroMotion {
    from: f64,
    to: f64,
    start: Millis,
    duration: Millis,
    easing: Easing,
}

/// Owns macro controls and their in-flight motions. Evaluation is a pure
/// function of a macro's scalar and its mapping list; the actual parameter
/// writes are the caller's job (the engine batches them into the
/// [ParamStore](crate::automation::ParamStore)), which is what keeps macros
/// free of hidden state.
///
/// Macros may be registered before their target parameters exist; binding is
/// deferred until each write, so setup order doesn't matter.
#[derive(Debug, Default)]
pub struct MacroSystem {
    macros: FxHashMap<MacroId, MacroControl>,
    motions: FxHashMap<MacroId, MacroMotion>,
}
impl MacroSystem {
    /// Registers (or replaces) a macro. Target parameters aren't validated;
    /// they may be registered later.
    pub fn register_macro(&mut self, id: MacroId, label: &str, mappings: Vec<MacroMapping>) {
        self.motions.remove(&id);
        self.macros.insert(
            id.clone(),
            MacroControl {
                id,
                label: label.to_string(),
                value: 0.0,
                mappings,
                channel: None,
            },
        );
    }

    /// Returns the macro, if registered.
    pub fn get(&self, id: &MacroId) -> Option<&MacroControl> {
        self.macros.get(id)
    }

    /// All registered macros. Order is undefined.
    pub fn iter(&self) -> impl Iterator<Item = &MacroControl> {
        self.macros.values()
    }

    /// Binds the macro to an external-controller channel. Returns false on
    /// unknown id or out-of-range channel.
    pub fn bind_controller(&mut self, id: &MacroId, channel: u8) -> bool {
        if channel > 127 {
            return false;
        }
        if let Some(control) = self.macros.get_mut(id) {
            control.channel = Some(channel);
            true
        } else {
            false
        }
    }

    /// Clears the macro's controller binding.
    pub fn unbind_controller(&mut self, id: &MacroId) -> bool {
        if let Some(control) = self.macros.get_mut(id) {
            control.channel = None;
            true
        } else {
            false
        }
    }

    /// Every macro bound to the given channel. Multiple macros may share a
    /// channel; all of them fire.
    pub fn macros_for_channel(&self, channel: u8) -> Vec<MacroId> {
        self.macros
            .values()
            .filter(|m| m.channel == Some(channel))
            .map(|m| m.id.clone())
            .collect()
    }

    /// The parameter values a macro produces at the given scalar. Pure: no
    /// state is read beyond the mapping list, and none is written.
    pub fn evaluate(&self, id: &MacroId, scalar: f64) -> Option<Vec<(ParamName, f64)>> {
        self.macros.get(id).map(|control| {
            control
                .mappings
                .iter()
                .map(|m| (m.target.clone(), m.evaluate(scalar)))
                .collect()
        })
    }

    /// Stores a new scalar (clamped to 0..=1), cancelling any in-flight
    /// motion, and returns the batch of parameter values to apply. [None]
    /// means the id is unknown.
    pub fn set_scalar(&mut self, id: &MacroId, scalar: f64) -> Option<Vec<(ParamName, f64)>> {
        let scalar = scalar.clamp(0.0, 1.0);
        let control = self.macros.get_mut(id)?;
        control.value = scalar;
        self.motions.remove(id);
        self.evaluate(id, scalar)
    }

    /// Stores a new scalar without cancelling the motion that produced it.
    /// Used by the per-tick motion path.
    fn set_scalar_from_motion(&mut self, id: &MacroId, scalar: f64) -> Option<Vec<(ParamName, f64)>> {
        let control = self.macros.get_mut(id)?;
        control.value = scalar;
        self.evaluate(id, scalar)
    }

    /// Begins animating the macro's own scalar from its current value to
    /// `target`. The eased scalar is applied to targets every tick, so the
    /// macro's easing and each parameter's mapping curve compose into one
    /// smooth compound curve. Returns false on unknown id.
    pub fn begin_motion(
        &mut self,
        id: &MacroId,
        target: f64,
        duration: Millis,
        easing: Easing,
        now: Millis,
    ) -> bool {
        let Some(control) = self.macros.get(id) else {
            return false;
        };
        self.motions.insert(
            id.clone(),
            MacroMotion {
                from: control.value,
                to: target.clamp(0.0, 1.0),
                start: now,
                duration,
                easing,
            },
        );
        true
    }

    /// The per-tick motion step: updates every in-motion macro's scalar and
    /// returns (id, batch) pairs for the caller to apply immediately.
    /// Finished motions are removed.
    pub fn advance(&mut self, now: Millis) -> Vec<(MacroId, f64, Vec<(ParamName, f64)>)> {
        let mut out = Vec::default();
        let ids: Vec<MacroId> = self.motions.keys().cloned().collect();
        for id in ids {
            let motion = self.motions[&id];
            let progress = if motion.duration.is_instant() {
                1.0
            } else {
                ((now - motion.start).0 / motion.duration.0).clamp(0.0, 1.0)
            };
            let scalar = motion.from + (motion.to - motion.from) * motion.easing.apply(progress);
            if let Some(batch) = self.set_scalar_from_motion(&id, scalar) {
                out.push((id.clone(), scalar, batch));
            }
            if progress >= 1.0 {
                self.motions.remove(&id);
            }
        }
        out
    }

    /// Whether any macro is in motion.
    pub fn has_motion(&self) -> bool {
        !self.motions.is_empty()
    }
}
