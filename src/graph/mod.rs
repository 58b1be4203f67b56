// Copyright (c) 2024 Mike Tsao

//! The signal graph: module instances and the typed connections between them.

/// The most commonly used imports.
pub mod prelude {
    pub use super::{Connection, ConnectionTarget, ModuleGraph, ModuleInstance, PortSpec};
}

pub use {
    connection::{Connection, ConnectionTarget, ModuleGraph, PortSpec},
    instance::ModuleInstance,
};

mod connection;
mod instance;
