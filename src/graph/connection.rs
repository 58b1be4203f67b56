// Copyright (c) 2024 Mike Tsao

use crate::types::{InstanceUid, Millis};
use serde::{Deserialize, Serialize};

/// One of a module's connection points, as reported by
/// [ModuleCore::create_graph()](crate::traits::ModuleCore::create_graph).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PortSpec {
    /// A short label such as "in" or "out".
    pub label: String,
    /// How many channels the port carries.
    pub channels: usize,
}
impl PortSpec {
    /// A single-channel port with the given label.
    pub fn mono(label: &str) -> Self {
        Self {
            label: label.to_string(),
            channels: 1,
        }
    }

    /// A two-channel port with the given label.
    pub fn stereo(label: &str) -> Self {
        Self {
            label: label.to_string(),
            channels: 2,
        }
    }
}

/// The set of connection points a module exposes. The engine requires exactly
/// one input and one output.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ModuleGraph {
    /// The module's input ports.
    pub inputs: Vec<PortSpec>,
    /// The module's output ports.
    pub outputs: Vec<PortSpec>,
}
impl ModuleGraph {
    /// The common case: one mono input, one mono output.
    pub fn mono_in_out() -> Self {
        Self {
            inputs: vec![PortSpec::mono("in")],
            outputs: vec![PortSpec::mono("out")],
        }
    }

    /// One stereo input, one stereo output.
    pub fn stereo_in_out() -> Self {
        Self {
            inputs: vec![PortSpec::stereo("in")],
            outputs: vec![PortSpec::stereo("out")],
        }
    }

    /// Whether this graph satisfies the one-input, one-output contract.
    pub fn is_valid(&self) -> bool {
        self.inputs.len() == 1 && self.outputs.len() == 1
    }
}

/// Where a connection delivers its signal: either another module's input, or
/// an opaque external sink (an audio device, a renderer) the engine doesn't
/// manage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionTarget {
    /// Another module in the same registry.
    Module(InstanceUid),
    /// A sink outside the engine's knowledge.
    External(String),
}

/// A directed edge from one module's output to a target input. Both endpoints
/// are validated to exist when the connection is created; the connection is
/// owned by its source module, and disposing the source releases it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Connection {
    /// Where the signal goes.
    pub target: ConnectionTarget,
    /// The channel index within the source's output port.
    pub output_channel: usize,
    /// The channel index within the target's input port.
    pub input_channel: usize,
    /// When the connection was made.
    pub created_at: Millis,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_validity() {
        assert!(ModuleGraph::mono_in_out().is_valid());
        assert!(ModuleGraph::stereo_in_out().is_valid());
        assert!(
            !ModuleGraph::default().is_valid(),
            "a module with no ports is not initialized"
        );

        let two_outs = ModuleGraph {
            inputs: vec![PortSpec::mono("in")],
            outputs: vec![PortSpec::mono("out-a"), PortSpec::mono("out-b")],
        };
        assert!(
            !two_outs.is_valid(),
            "extra connection points violate the module contract"
        );
    }
}
