// Copyright (c) 2024 Mike Tsao

use crate::{
    automation::Easing,
    types::{Millis, ParamName},
    util::Rng,
};
use derivative::Derivative;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// How a parameter prefers to be displayed. Informational only; the
/// automation math is always linear in the stored value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisplayCurve {
    #[allow(missing_docs)]
    #[default]
    Linear,
    #[allow(missing_docs)]
    Exponential,
    #[allow(missing_docs)]
    Logarithmic,
}

/// The side-effect hook invoked on every accepted, value-changing write.
pub type ParamChangeFn = Box<dyn FnMut(f64) + Send>;

/// Registration-time configuration for a live parameter.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct ParamConfig {
    /// The inclusive lower bound.
    pub min: f64,
    /// The inclusive upper bound.
    pub max: f64,
    /// The initial value. Out-of-range values are tolerated and clamped,
    /// because setup often arrives out of order.
    pub default: f64,
    /// Display preference.
    pub curve: DisplayCurve,
    /// Invoked with the new value on every accepted change.
    #[derivative(Debug = "ignore")]
    pub on_change: Option<ParamChangeFn>,
}
impl ParamConfig {
    /// A parameter spanning the given range.
    pub fn new(min: f64, max: f64, default: f64) -> Self {
        Self {
            min,
            max,
            default,
            curve: DisplayCurve::default(),
            on_change: None,
        }
    }

    /// The normalized 0..=1 range that module parameters use.
    pub fn normalized(default: f64) -> Self {
        Self::new(0.0, 1.0, default)
    }

    /// Attaches a change callback.
    pub fn with_on_change(mut self, on_change: ParamChangeFn) -> Self {
        self.on_change = Some(on_change);
        self
    }

    /// Sets the display curve.
    pub fn with_curve(mut self, curve: DisplayCurve) -> Self {
        self.curve = curve;
        self
    }
}

#[derive(Derivative)]
#[derivative(Debug)]
struct ParamEntry {
    value: f64,
    min: f64,
    max: f64,
    curve: DisplayCurve,
    #[derivative(Debug = "ignore")]
    on_change: Option<ParamChangeFn>,
}

/// An in-flight interpolation. At most one exists per parameter.
#[derive(Clone, Copy, Debug)]
struct Morph {
    start_value: f64,
    target: f64,
    start: Millis,
    duration: Millis,
    easing: Easing,
}
impl Morph {
    /// The interpolated value at `now`, and whether the morph is finished.
    fn value_at(&self, now: Millis) -> (f64, bool) {
        let progress = if self.duration.is_instant() {
            1.0
        } else {
            ((now - self.start).0 / self.duration.0).clamp(0.0, 1.0)
        };
        let eased = self.easing.apply(progress);
        (
            self.start_value + (self.target - self.start_value) * eased,
            progress >= 1.0,
        )
    }
}

#[derive(Clone, Debug)]
struct ParamLink {
    target: ParamName,
    scale: f64,
    offset: f64,
}

/// A flat namespace of named, range-bounded automatable values: the single
/// shared table that direct control, morphs, macros, and preset interpolation
/// all write into. The rule for competing writers is strictly last-write-wins
/// per parameter; there is no merging between automation sources.
///
/// The store never reads a clock. [ParamStore::advance] is the scheduling
/// step; callers hand it a timestamp, and it moves every in-flight morph
/// forward, removing each one the tick it reaches its target.
#[derive(Debug, Default)]
pub struct ParamStore {
    entries: FxHashMap<ParamName, ParamEntry>,
    morphs: FxHashMap<ParamName, Morph>,
    links: FxHashMap<ParamName, Vec<ParamLink>>,
}

/// Link propagation stops after this many hops. Cyclic links settle instead
/// of recursing forever; see DESIGN.md.
const LINK_DEPTH_BUDGET: usize = 8;

impl ParamStore {
    /// Registers a parameter, overwriting any existing registration with the
    /// same name. The default is clamped into range on write.
    pub fn register(&mut self, name: ParamName, config: ParamConfig) {
        let value = config.default.clamp(config.min, config.max);
        self.entries.insert(
            name,
            ParamEntry {
                value,
                min: config.min,
                max: config.max,
                curve: config.curve,
                on_change: config.on_change,
            },
        );
    }

    /// Forgets a parameter and any in-flight morph or links touching it. The
    /// store never does this on its own; it's an obligation of the module
    /// disposal path, which is what makes automation of a disposed module a
    /// defined no-op.
    pub fn unregister(&mut self, name: &ParamName) -> bool {
        let existed = self.entries.remove(name).is_some();
        self.morphs.remove(name);
        self.links.remove(name);
        for links in self.links.values_mut() {
            links.retain(|l| l.target != *name);
        }
        existed
    }

    #[allow(missing_docs)]
    pub fn contains(&self, name: &ParamName) -> bool {
        self.entries.contains_key(name)
    }

    /// The current value, if registered.
    pub fn value(&self, name: &ParamName) -> Option<f64> {
        self.entries.get(name).map(|e| e.value)
    }

    /// The inclusive bounds, if registered.
    pub fn bounds(&self, name: &ParamName) -> Option<(f64, f64)> {
        self.entries.get(name).map(|e| (e.min, e.max))
    }

    /// The display curve, if registered.
    pub fn display_curve(&self, name: &ParamName) -> Option<DisplayCurve> {
        self.entries.get(name).map(|e| e.curve)
    }

    /// Sets a value immediately, clamping into range. A pending morph for the
    /// parameter is cancelled: the write wins. Unknown names are a silent
    /// no-op. Returns the accepted (name, value) changes, including any
    /// propagated through links.
    pub fn set_value(&mut self, name: &ParamName, value: f64, notify: bool) -> Vec<(ParamName, f64)> {
        let mut accepted = Vec::default();
        if self.entries.contains_key(name) {
            self.morphs.remove(name);
            self.apply(name, value, notify, 0, &mut accepted);
        }
        accepted
    }

    fn apply(
        &mut self,
        name: &ParamName,
        value: f64,
        notify: bool,
        depth: usize,
        accepted: &mut Vec<(ParamName, f64)>,
    ) {
        let Some(entry) = self.entries.get_mut(name) else {
            return;
        };
        let clamped = value.clamp(entry.min, entry.max);
        if clamped == entry.value {
            return;
        }
        entry.value = clamped;
        if notify {
            if let Some(on_change) = entry.on_change.as_mut() {
                on_change(clamped);
            }
        }
        accepted.push((name.clone(), clamped));

        if depth >= LINK_DEPTH_BUDGET {
            return;
        }
        if let Some(links) = self.links.get(name) {
            let links = links.clone();
            for link in links {
                // A linked write is an ordinary write: it cancels the
                // target's pending morph too.
                self.morphs.remove(&link.target);
                self.apply(
                    &link.target,
                    clamped * link.scale + link.offset,
                    notify,
                    depth + 1,
                    accepted,
                );
            }
        }
    }

    /// Begins (or replaces) a timed interpolation toward `target`. Replacing
    /// an in-flight morph captures the current interpolated value as the new
    /// start, so the parameter never jumps. Unknown names are a silent no-op;
    /// a zero duration degenerates to [ParamStore::set_value]. Returns any
    /// immediately-accepted changes.
    pub fn morph(
        &mut self,
        name: &ParamName,
        target: f64,
        duration: Millis,
        easing: Easing,
        now: Millis,
    ) -> Vec<(ParamName, f64)> {
        if !self.entries.contains_key(name) {
            return Vec::default();
        }
        if duration.is_instant() {
            return self.set_value(name, target, true);
        }
        let start_value = if let Some(existing) = self.morphs.get(name) {
            existing.value_at(now).0
        } else {
            self.entries[name].value
        };
        self.morphs.insert(
            name.clone(),
            Morph {
                start_value,
                target,
                start: now,
                duration,
                easing,
            },
        );
        Vec::default()
    }

    /// Applies [ParamStore::morph] to each entry. Not transactional: unknown
    /// names are skipped and the rest are scheduled.
    pub fn morph_multiple(
        &mut self,
        targets: &[(ParamName, f64)],
        duration: Millis,
        easing: Easing,
        now: Millis,
    ) -> Vec<(ParamName, f64)> {
        let mut accepted = Vec::default();
        for (name, target) in targets {
            accepted.extend(self.morph(name, *target, duration, easing, now));
        }
        accepted
    }

    /// The scheduling step: moves every in-flight morph to its interpolated
    /// value at `now`, with notification, and drops each morph the tick its
    /// progress reaches 1 (at which point the value equals the target
    /// exactly). Iteration order across simultaneously-completing morphs is
    /// unspecified. Returns all accepted changes.
    pub fn advance(&mut self, now: Millis) -> Vec<(ParamName, f64)> {
        let mut accepted = Vec::default();
        let names: Vec<ParamName> = self.morphs.keys().cloned().collect();
        for name in names {
            // A link write earlier in this same tick may have cancelled it.
            let Some(morph) = self.morphs.get(&name) else {
                continue;
            };
            let (value, done) = morph.value_at(now);
            self.apply(&name, value, true, 0, &mut accepted);
            if done {
                self.morphs.remove(&name);
            }
        }
        accepted
    }

    /// Whether any morph is in flight. The embedding runtime uses this to
    /// stop scheduling ticks when idle.
    pub fn has_active_morphs(&self) -> bool {
        !self.morphs.is_empty()
    }

    /// Whether this specific parameter is morphing.
    pub fn is_morphing(&self, name: &ParamName) -> bool {
        self.morphs.contains_key(name)
    }

    /// Drops all pending morphs without resolving them. Values freeze at
    /// their last-applied point, not at their targets.
    pub fn clear(&mut self) {
        self.morphs.clear();
    }

    /// Makes every accepted change to `source` also write
    /// `value * scale + offset` to `target`. Links compose; chains propagate
    /// up to a fixed depth budget, which also keeps cyclic links from
    /// recursing forever.
    pub fn link(&mut self, source: &ParamName, target: &ParamName, scale: f64, offset: f64) {
        self.links.entry(source.clone()).or_default().push(ParamLink {
            target: target.clone(),
            scale,
            offset,
        });
    }

    /// Removes all links from `source` to `target`.
    pub fn unlink(&mut self, source: &ParamName, target: &ParamName) {
        if let Some(links) = self.links.get_mut(source) {
            links.retain(|l| l.target != *target);
        }
    }

    /// The full name → value table.
    pub fn snapshot(&self) -> FxHashMap<ParamName, f64> {
        self.entries
            .iter()
            .map(|(name, entry)| (name.clone(), entry.value))
            .collect()
    }

    /// Applies a value table: immediately when `duration` is zero, otherwise
    /// as a batch morph with linear easing. Unknown names are skipped.
    pub fn restore(
        &mut self,
        values: &FxHashMap<ParamName, f64>,
        duration: Millis,
        now: Millis,
    ) -> Vec<(ParamName, f64)> {
        if duration.is_instant() {
            let mut accepted = Vec::default();
            for (name, value) in values {
                accepted.extend(self.set_value(name, *value, true));
            }
            accepted
        } else {
            let targets: Vec<(ParamName, f64)> =
                values.iter().map(|(n, v)| (n.clone(), *v)).collect();
            self.morph_multiple(&targets, duration, Easing::Linear, now)
        }
    }

    /// Sets every parameter to a uniform random value within its bounds.
    pub fn randomize(&mut self, rng: &mut Rng) -> Vec<(ParamName, f64)> {
        let names: Vec<ParamName> = self.entries.keys().cloned().collect();
        let mut accepted = Vec::default();
        for name in names {
            let (min, max) = self.bounds(&name).unwrap();
            let value = rng.rand_float_in(min, max);
            accepted.extend(self.set_value(&name, value, true));
        }
        accepted
    }

    /// All registered parameter names. Order is undefined.
    pub fn names(&self) -> impl Iterator<Item = &ParamName> {
        self.entries.keys()
    }

    #[allow(missing_docs)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
