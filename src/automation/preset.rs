// Copyright (c) 2024 Mike Tsao

use crate::{
    automation::Easing,
    types::{BankName, Millis, ParamName},
};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};
use thiserror::Error;

/// One of the two live morph slots.
#[derive(
    Clone, Copy, Debug, Display, EnumIter, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
    Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Slot {
    #[allow(missing_docs)]
    A,
    #[allow(missing_docs)]
    B,
}

/// A named, timestamped full capture of the parameter store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PresetSnapshot {
    /// A user-facing name.
    pub name: String,
    /// Parameter name → captured value.
    pub parameters: FxHashMap<ParamName, f64>,
    /// When the capture happened.
    pub timestamp: Millis,
}

/// The serialized form of one banked snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BankEntry {
    /// Which slot the snapshot was saved from.
    pub slot: Slot,
    /// The snapshot's name.
    pub name: String,
    /// Parameter name → value.
    pub parameters: FxHashMap<ParamName, f64>,
    /// The snapshot's capture time.
    pub timestamp: Millis,
}

/// The serialized form of a whole bank. Any storage backend (file, HTTP API,
/// key-value store) can be substituted behind this shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BankExport {
    /// The bank's name.
    pub name: BankName,
    /// The banked snapshots.
    pub presets: Vec<BankEntry>,
}

/// Why a bank import was rejected. Imports are atomic: a rejected import
/// leaves all prior state untouched.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The payload wasn't valid JSON, or was missing required fields.
    #[error("malformed bank import: {0}")]
    Malformed(#[from] serde_json::Error),
    /// The payload parsed but described an empty or self-contradictory bank.
    #[error("invalid bank import: {0}")]
    Invalid(String),
}

#[derive(Clone, Copy, Debug)]
struct PositionMotion {
    from: f64,
    to: f64,
    start: Millis,
    duration: Millis,
    easing: Easing,
}

/// Holds the two live snapshots (A and B), interpolates the whole parameter
/// table between them, and manages a named bank of saved snapshots.
///
/// Interpolation is linear per-parameter over the union of keys present in
/// either snapshot; a key absent from one side reads as 0 there.
#[derive(Debug, Default)]
pub struct PresetMorpher {
    slot_a: Option<PresetSnapshot>,
    slot_b: Option<PresetSnapshot>,
    position: f64,
    banks: FxHashMap<BankName, FxHashMap<Slot, PresetSnapshot>>,
    motion: Option<PositionMotion>,
}
impl PresetMorpher {
    /// Captures the given parameter table into a slot.
    pub fn capture_slot(
        &mut self,
        slot: Slot,
        name: &str,
        parameters: FxHashMap<ParamName, f64>,
        now: Millis,
    ) {
        let snapshot = PresetSnapshot {
            name: name.to_string(),
            parameters,
            timestamp: now,
        };
        match slot {
            Slot::A => self.slot_a = Some(snapshot),
            Slot::B => self.slot_b = Some(snapshot),
        }
    }

    /// The snapshot currently in a slot.
    pub fn slot(&self, slot: Slot) -> Option<&PresetSnapshot> {
        match slot {
            Slot::A => self.slot_a.as_ref(),
            Slot::B => self.slot_b.as_ref(),
        }
    }

    /// The current morph position; 0 is fully A, 1 is fully B.
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Computes the blended parameter table at `position`, over the union of
    /// keys in both slots, treating absent keys as 0. Returns [None] when
    /// either slot is unset, since there is nothing sensible to blend toward.
    pub fn blend(&self, position: f64) -> Option<Vec<(ParamName, f64)>> {
        let (a, b) = (self.slot_a.as_ref()?, self.slot_b.as_ref()?);
        let position = position.clamp(0.0, 1.0);
        let mut keys: Vec<&ParamName> = a.parameters.keys().collect();
        for key in b.parameters.keys() {
            if !a.parameters.contains_key(key) {
                keys.push(key);
            }
        }
        Some(
            keys.into_iter()
                .map(|key| {
                    let from = a.parameters.get(key).copied().unwrap_or(0.0);
                    let to = b.parameters.get(key).copied().unwrap_or(0.0);
                    (key.clone(), from + (to - from) * position)
                })
                .collect(),
        )
    }

    /// Records a new position, cancelling any in-flight motion. The engine
    /// calls this after applying the blend.
    pub fn set_position(&mut self, position: f64) {
        self.position = position.clamp(0.0, 1.0);
        self.motion = None;
    }

    fn set_position_from_motion(&mut self, position: f64) {
        self.position = position.clamp(0.0, 1.0);
    }

    /// Begins animating the morph position itself. Like macro motion, the
    /// eased position is applied to parameters every tick. Returns false when
    /// either slot is unset.
    pub fn begin_motion(
        &mut self,
        target: f64,
        duration: Millis,
        easing: Easing,
        now: Millis,
    ) -> bool {
        if self.slot_a.is_none() || self.slot_b.is_none() {
            return false;
        }
        self.motion = Some(PositionMotion {
            from: self.position,
            to: target.clamp(0.0, 1.0),
            start: now,
            duration,
            easing,
        });
        true
    }

    /// The per-tick motion step: returns the new position if a motion is in
    /// flight, removing it once finished.
    pub fn advance(&mut self, now: Millis) -> Option<f64> {
        let motion = self.motion?;
        let progress = if motion.duration.is_instant() {
            1.0
        } else {
            ((now - motion.start).0 / motion.duration.0).clamp(0.0, 1.0)
        };
        let position = motion.from + (motion.to - motion.from) * motion.easing.apply(progress);
        self.set_position_from_motion(position);
        if progress >= 1.0 {
            self.motion = None;
        }
        Some(position)
    }

    /// Whether the position is animating.
    pub fn has_motion(&self) -> bool {
        self.motion.is_some()
    }

    /// Swaps the A and B slots. The position is left alone, so the audible
    /// result inverts.
    pub fn swap_ab(&mut self) {
        core::mem::swap(&mut self.slot_a, &mut self.slot_b);
    }

    /// Copies slot A over slot B. Returns false if A is unset.
    pub fn copy_a_to_b(&mut self) -> bool {
        if let Some(a) = &self.slot_a {
            self.slot_b = Some(a.clone());
            true
        } else {
            false
        }
    }

    /// Copies slot B over slot A. Returns false if B is unset.
    pub fn copy_b_to_a(&mut self) -> bool {
        if let Some(b) = &self.slot_b {
            self.slot_a = Some(b.clone());
            true
        } else {
            false
        }
    }

    /// Saves the given live slot into a bank. Returns false if the slot is
    /// unset.
    pub fn save_to_bank(&mut self, bank: &BankName, slot: Slot) -> bool {
        let Some(snapshot) = self.slot(slot).cloned() else {
            return false;
        };
        self.banks
            .entry(bank.clone())
            .or_default()
            .insert(slot, snapshot);
        true
    }

    /// Loads a banked snapshot into the matching live slot. Returns false on
    /// unknown bank or empty slot.
    pub fn load_from_bank(&mut self, bank: &BankName, slot: Slot) -> bool {
        let Some(snapshot) = self.banks.get(bank).and_then(|b| b.get(&slot)).cloned() else {
            return false;
        };
        match slot {
            Slot::A => self.slot_a = Some(snapshot),
            Slot::B => self.slot_b = Some(snapshot),
        }
        true
    }

    /// The contents of a bank, sorted by slot.
    pub fn bank_contents(&self, bank: &BankName) -> Option<Vec<(Slot, &PresetSnapshot)>> {
        self.banks.get(bank).map(|slots| {
            let mut contents: Vec<(Slot, &PresetSnapshot)> =
                slots.iter().map(|(slot, snapshot)| (*slot, snapshot)).collect();
            contents.sort_by_key(|(slot, _)| *slot);
            contents
        })
    }

    /// All bank names. Order is undefined.
    pub fn bank_names(&self) -> impl Iterator<Item = &BankName> {
        self.banks.keys()
    }

    /// Serializes a bank for any storage backend. [None] on unknown bank.
    pub fn export_bank(&self, bank: &BankName) -> Option<String> {
        let contents = self.bank_contents(bank)?;
        let export = BankExport {
            name: bank.clone(),
            presets: contents
                .into_iter()
                .map(|(slot, snapshot)| BankEntry {
                    slot,
                    name: snapshot.name.clone(),
                    parameters: snapshot.parameters.clone(),
                    timestamp: snapshot.timestamp,
                })
                .collect(),
        };
        // The export shape is plain data; serialization can't fail.
        serde_json::to_string(&export).ok()
    }

    /// Deserializes and installs a whole bank, replacing any bank with the
    /// same name. Malformed input rejects the entire import and leaves every
    /// bank untouched.
    pub fn import_bank(&mut self, json: &str) -> Result<BankName, ImportError> {
        let export: BankExport = serde_json::from_str(json)?;
        if export.presets.is_empty() {
            return Err(ImportError::Invalid("bank contains no presets".to_string()));
        }
        let mut slots: FxHashMap<Slot, PresetSnapshot> = Default::default();
        for entry in export.presets {
            if slots.contains_key(&entry.slot) {
                return Err(ImportError::Invalid(format!(
                    "bank defines slot {} twice",
                    entry.slot
                )));
            }
            slots.insert(
                entry.slot,
                PresetSnapshot {
                    name: entry.name,
                    parameters: entry.parameters,
                    timestamp: entry.timestamp,
                },
            );
        }
        self.banks.insert(export.name.clone(), slots);
        Ok(export.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    fn params(pairs: &[(&str, f64)]) -> FxHashMap<ParamName, f64> {
        pairs
            .iter()
            .map(|(name, value)| (ParamName::from(*name), *value))
            .collect()
    }

    fn captured_morpher() -> PresetMorpher {
        let mut m = PresetMorpher::default();
        m.capture_slot(Slot::A, "dark", params(&[("x", 0.0)]), Millis(1.0));
        m.capture_slot(Slot::B, "bright", params(&[("y", 10.0)]), Millis(2.0));
        m
    }

    #[test]
    fn blend_requires_both_slots() {
        let mut m = PresetMorpher::default();
        assert!(m.blend(0.5).is_none(), "no slots, nothing to blend");
        m.capture_slot(Slot::A, "only-a", params(&[("x", 1.0)]), Millis(1.0));
        assert!(m.blend(0.5).is_none(), "one slot is still not enough");
    }

    #[test]
    fn blend_covers_union_with_absent_keys_as_zero() {
        let m = captured_morpher();
        let mut blended = m.blend(0.5).unwrap();
        blended.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(blended.len(), 2, "union of A and B keys");
        assert_eq!(blended[0], (ParamName::from("x"), 0.0));
        assert_eq!(blended[1], (ParamName::from("y"), 5.0));
    }

    #[test]
    fn blend_endpoints_reproduce_slots() {
        let mut m = PresetMorpher::default();
        m.capture_slot(Slot::A, "a", params(&[("x", 2.0)]), Millis(1.0));
        m.capture_slot(Slot::B, "b", params(&[("x", 8.0)]), Millis(2.0));
        assert_eq!(m.blend(0.0).unwrap()[0].1, 2.0);
        assert_eq!(m.blend(1.0).unwrap()[0].1, 8.0);
        assert!(approx_eq!(f64, m.blend(0.25).unwrap()[0].1, 3.5, epsilon = 1e-12));
    }

    #[test]
    fn motion_animates_position() {
        let mut m = captured_morpher();
        assert!(m.begin_motion(1.0, Millis(100.0), Easing::Linear, Millis::zero()));
        assert!(m.has_motion());

        assert!(approx_eq!(
            f64,
            m.advance(Millis(50.0)).unwrap(),
            0.5,
            epsilon = 1e-12
        ));
        assert_eq!(m.advance(Millis(100.0)), Some(1.0));
        assert!(!m.has_motion(), "finished motion should be removed");
        assert_eq!(m.advance(Millis(200.0)), None);
    }

    #[test]
    fn motion_requires_both_slots() {
        let mut m = PresetMorpher::default();
        assert!(!m.begin_motion(1.0, Millis(100.0), Easing::Linear, Millis::zero()));
    }

    #[test]
    fn swap_and_copy() {
        let mut m = captured_morpher();
        m.swap_ab();
        assert_eq!(m.slot(Slot::A).unwrap().name, "bright");
        assert_eq!(m.slot(Slot::B).unwrap().name, "dark");

        assert!(m.copy_a_to_b());
        assert_eq!(m.slot(Slot::B).unwrap().name, "bright");

        let mut empty = PresetMorpher::default();
        assert!(!empty.copy_a_to_b(), "copy from an unset slot fails");
        assert!(!empty.copy_b_to_a());
    }

    #[test]
    fn bank_round_trip_preserves_contents() {
        let mut m = captured_morpher();
        let bank = BankName::from("favorites");
        assert!(m.save_to_bank(&bank, Slot::A));
        assert!(m.save_to_bank(&bank, Slot::B));

        let exported = m.export_bank(&bank).unwrap();

        let mut fresh = PresetMorpher::default();
        let imported = fresh.import_bank(&exported).unwrap();
        assert_eq!(imported, bank);

        let original = m.bank_contents(&bank).unwrap();
        let restored = fresh.bank_contents(&bank).unwrap();
        assert_eq!(
            original.len(),
            restored.len(),
            "same slot list after round trip"
        );
        for ((slot_a, snap_a), (slot_b, snap_b)) in original.iter().zip(restored.iter()) {
            assert_eq!(slot_a, slot_b);
            assert_eq!(snap_a.name, snap_b.name);
            assert_eq!(
                snap_a.parameters.len(),
                snap_b.parameters.len(),
                "same parameter counts"
            );
        }
    }

    #[test]
    fn malformed_import_is_atomic() {
        let mut m = captured_morpher();
        let bank = BankName::from("favorites");
        m.save_to_bank(&bank, Slot::A);

        assert!(matches!(
            m.import_bank("not json at all"),
            Err(ImportError::Malformed(_))
        ));
        // Missing required fields.
        assert!(m
            .import_bank(r#"{"name":"x","presets":[{"slot":"a"}]}"#)
            .is_err());
        // Parses but empty.
        assert!(matches!(
            m.import_bank(r#"{"name":"x","presets":[]}"#),
            Err(ImportError::Invalid(_))
        ));

        assert_eq!(
            m.bank_names().count(),
            1,
            "failed imports must leave prior banks untouched"
        );
        assert!(m.bank_contents(&bank).is_some());
    }

    #[test]
    fn load_from_bank_restores_live_slot() {
        let mut m = captured_morpher();
        let bank = BankName::from("favorites");
        m.save_to_bank(&bank, Slot::A);
        m.capture_slot(Slot::A, "scratch", params(&[("z", 1.0)]), Millis(9.0));
        assert_eq!(m.slot(Slot::A).unwrap().name, "scratch");

        assert!(m.load_from_bank(&bank, Slot::A));
        assert_eq!(m.slot(Slot::A).unwrap().name, "dark");

        assert!(!m.load_from_bank(&BankName::from("ghost"), Slot::A));
        assert!(!m.load_from_bank(&bank, Slot::B), "slot B was never banked");
    }
}
