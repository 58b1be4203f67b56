// Copyright (c) 2024 Mike Tsao

//! The notification surface. Every component reports through one typed event
//! enum and one publish/subscribe utility, rather than each component carrying
//! its own emitter.

use crate::types::{InstanceUid, MacroId, ModuleKey, ParamName};
use crossbeam::channel::{unbounded, Receiver, Sender};

/// Everything the engine announces to the outside world. UI layers subscribe;
/// none of them are required for the engine to run.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineEvent {
    /// A module definition was registered (or re-registered).
    ModuleRegistered {
        /// The definition's key.
        key: ModuleKey,
    },
    /// A module instance was created.
    ModuleInstantiated {
        /// The new instance's uid.
        uid: InstanceUid,
    },
    /// A module instance was disposed and removed.
    ModuleRemoved {
        /// The removed instance's uid.
        uid: InstanceUid,
    },
    /// A live parameter accepted a new value.
    ParameterChanged {
        /// The parameter's name.
        name: ParamName,
        /// The accepted (clamped) value.
        value: f64,
    },
    /// A macro's scalar changed and its mappings were applied.
    MacroChanged {
        /// The macro's id.
        id: MacroId,
        /// The macro's new scalar, in 0..=1.
        value: f64,
    },
    /// The A/B preset morph position changed.
    MorphPositionChanged {
        /// The new position; 0 is fully A, 1 is fully B.
        position: f64,
    },
}

/// A small typed publish/subscribe hub. Subscribers receive events on a
/// channel; a subscriber that drops its [Receiver] is pruned on the next
/// publish.
#[derive(Debug, Default)]
pub struct EventBus {
    senders: Vec<Sender<EngineEvent>>,
}
impl EventBus {
    /// Registers a new subscriber and returns its event stream.
    pub fn subscribe(&mut self) -> Receiver<EngineEvent> {
        let (sender, receiver) = unbounded();
        self.senders.push(sender);
        receiver
    }

    /// Delivers an event to every live subscriber.
    pub fn publish(&mut self, event: EngineEvent) {
        self.senders.retain(|s| s.send(event.clone()).is_ok());
    }

    /// The number of live subscribers as of the last publish.
    pub fn subscriber_count(&self) -> usize {
        self.senders.len()
    }
}
