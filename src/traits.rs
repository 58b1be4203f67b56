// Copyright (c) 2024 Mike Tsao

//! The traits that define the seams between the engine and the DSP modules it
//! hosts.

use crate::graph::ModuleGraph;

/// Quick import of all important traits.
pub mod prelude {
    pub use super::ModuleCore;
}

/// The contract every synthesis or effect unit implements. The registry and
/// the automation layer only ever call these operations; everything else about
/// a module (its oscillator math, its filter topology) is its own business.
pub trait ModuleCore: core::fmt::Debug {
    /// Builds the module's connection points. A module is not considered
    /// initialized until this has yielded exactly one input and one output;
    /// the registry treats any other shape as a fatal initialization error
    /// and refuses to store the instance.
    fn create_graph(&mut self) -> anyhow::Result<ModuleGraph>;

    /// Applies a new value for the named parameter. Values for parameters the
    /// engine routes automatically are normalized to 0..=1; a module that
    /// registers its own parameters may use any range it likes.
    fn set_param(&mut self, name: &str, value: f64);

    /// Releases whatever the module holds. Called once, just before the
    /// instance is dropped from the registry.
    fn dispose(&mut self) {}
}

/// The constructor the registry stores for each module definition.
pub type ModuleCtorFn = fn() -> Box<dyn ModuleCore>;
