// Copyright (c) 2024 Mike Tsao

//! Common data types used throughout the system.

/// The most commonly used imports.
pub mod prelude {
    pub use super::{
        BankName, EngineEvent, EventBus, InstanceUid, InstanceUidFactory, MacroId, ManualTimeSource,
        Millis, ModuleKey, ParamName, SystemTimeSource, TimeSource,
    };
}

pub use {
    events::{EngineEvent, EventBus},
    names::{BankName, MacroId, ModuleKey, ParamName},
    time::{ManualTimeSource, Millis, SystemTimeSource, TimeSource},
    uid::{InstanceUid, InstanceUidFactory},
};

mod events;
mod names;
mod time;
mod uid;
