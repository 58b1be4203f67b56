// Copyright (c) 2024 Mike Tsao

//! The string-keyed namespaces that the engine indexes on.

use serde::{Deserialize, Serialize};
use synonym::Synonym;

/// A globally unique identifier for a kind of module, such as a phaser effect,
/// an 808-style bass voice, or a step sequencer.
#[derive(Synonym, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ModuleKey(pub String);

/// The name of an automatable parameter, unique within a
/// [ParamStore](crate::automation::ParamStore). Module-owned parameters use
/// the convention `<instance uid>.<param>`.
#[derive(Synonym, Serialize, Deserialize)]
pub struct ParamName(pub String);
impl ParamName {
    /// Splits a module-owned parameter name into its instance and parameter
    /// halves, or [None] if the name doesn't follow the convention.
    pub fn split_instance(&self) -> Option<(&str, &str)> {
        self.0.split_once('.')
    }
}

/// The identifier of a macro control.
#[derive(Synonym, Serialize, Deserialize)]
pub struct MacroId(pub String);

/// The name of a preset bank.
#[derive(Synonym, Serialize, Deserialize)]
pub struct BankName(pub String);
