// Copyright (c) 2024 Mike Tsao

//! Everything that changes parameter values over time: timed morphs with
//! easing, one-to-many macro controls, and whole-table A/B preset morphing.

/// The most commonly used imports.
pub mod prelude {
    pub use super::{
        AutomationClip, BankEntry, BankExport, DisplayCurve, Easing, ImportError, MacroControl,
        MacroCurve, MacroMapping, MacroMappingBuilder, MacroSystem, ParamChangeFn, ParamConfig,
        ParamRecorder, ParamStore, PresetMorpher, PresetSnapshot, RecordedChange, Slot,
    };
}

pub use easing::Easing;
pub use macros::{MacroControl, MacroCurve, MacroMapping, MacroMappingBuilder, MacroSystem};
pub use params::{DisplayCurve, ParamChangeFn, ParamConfig, ParamStore};
pub use preset::{BankEntry, BankExport, ImportError, PresetMorpher, PresetSnapshot, Slot};
pub use recorder::{AutomationClip, ParamRecorder, RecordedChange};

mod easing;
mod macros;
mod params;
mod preset;
mod recorder;
