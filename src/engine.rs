// Copyright (c) 2024 Mike Tsao

//! The engine owns every subsystem and is the only place they meet. Each
//! subsystem returns the parameter writes it accepted; the engine routes those
//! writes to module cores and announces them on the event bus. Keeping the
//! routing here means the subsystems stay independently testable.

use crate::{
    automation::{
        AutomationClip, Easing, MacroMapping, MacroSystem, ParamConfig, ParamRecorder, ParamStore,
        PresetMorpher, Slot,
    },
    graph::ConnectionTarget,
    registry::{EntitlementFn, ModuleDescriptor, ModuleFilter, ModuleRegistry, RegistryError},
    traits::ModuleCtorFn,
    types::{
        BankName, EngineEvent, EventBus, InstanceUid, MacroId, Millis, ModuleKey, ParamName,
        SystemTimeSource, TimeSource,
    },
    util::Rng,
};
use crossbeam::channel::Receiver;
use delegate::delegate;
use rustc_hash::FxHashMap;

/// The top-level object. One engine per document or session; everything else
/// hangs off it.
///
/// Operations that care about time stamp themselves from the engine's
/// [TimeSource]. Nothing moves on its own: the embedding runtime calls
/// [Engine::advance] on its frame cadence while [Engine::needs_tick] is true,
/// and may stop calling it entirely while idle.
#[derive(Debug)]
pub struct Engine {
    registry: ModuleRegistry,
    params: ParamStore,
    macros: MacroSystem,
    presets: PresetMorpher,
    recorder: ParamRecorder,
    bus: EventBus,
    time: Box<dyn TimeSource>,
    rng: Rng,
}
impl Default for Engine {
    fn default() -> Self {
        Self::new_with(Box::new(SystemTimeSource::default()))
    }
}
impl Engine {
    /// Creates an engine driven by the given clock. Tests inject a
    /// [ManualTimeSource](crate::types::ManualTimeSource) here.
    pub fn new_with(time: Box<dyn TimeSource>) -> Self {
        Self {
            registry: ModuleRegistry::default(),
            params: ParamStore::default(),
            macros: MacroSystem::default(),
            presets: PresetMorpher::default(),
            recorder: ParamRecorder::default(),
            bus: EventBus::default(),
            time,
            rng: Rng::default(),
        }
    }

    /// The engine's current time.
    pub fn now(&self) -> Millis {
        self.time.now()
    }

    /// Registers a listener for engine events.
    pub fn subscribe(&mut self) -> Receiver<EngineEvent> {
        self.bus.subscribe()
    }

    /// Whether anything is animating. While this is false, the embedding
    /// runtime can skip [Engine::advance] entirely.
    pub fn needs_tick(&self) -> bool {
        self.params.has_active_morphs()
            || self.macros.has_motion()
            || self.presets.has_motion()
            || self.recorder.is_playing()
    }

    /// The per-frame step: resolves every in-flight morph, macro motion,
    /// preset-position motion, and clip playback at the current time.
    pub fn advance(&mut self) {
        let now = self.now();

        let writes = self.params.advance(now);
        self.route_writes(writes);

        let due = self.recorder.advance(now);
        self.apply_batch(&due);

        for (id, scalar, batch) in self.macros.advance(now) {
            self.apply_batch(&batch);
            self.bus.publish(EngineEvent::MacroChanged { id, value: scalar });
        }

        if let Some(position) = self.presets.advance(now) {
            if let Some(batch) = self.presets.blend(position) {
                self.apply_batch(&batch);
            }
            self.bus.publish(EngineEvent::MorphPositionChanged { position });
        }
    }

    /// Announces accepted writes, captures them if a recording is in
    /// progress, and forwards module-owned ones (named
    /// `<instance uid>.<param>`) to their module cores.
    fn route_writes(&mut self, writes: Vec<(ParamName, f64)>) {
        let now = self.time.now();
        for (name, value) in writes {
            self.recorder.capture(&name, value, now);
            if let Some((instance, param)) = name.split_instance() {
                self.registry
                    .set_param(&InstanceUid::from(instance), param, value);
            }
            self.bus.publish(EngineEvent::ParameterChanged { name, value });
        }
    }

    /// Writes a batch of raw target values through the store and routes
    /// whatever it accepts.
    fn apply_batch(&mut self, batch: &[(ParamName, f64)]) {
        let mut writes = Vec::default();
        for (name, value) in batch {
            writes.extend(self.params.set_value(name, *value, true));
        }
        self.route_writes(writes);
    }

    // ------------------------------------------------------------------
    // Modules

    /// Registers (or hot-reloads) a module definition.
    pub fn register_module(&mut self, descriptor: ModuleDescriptor, ctor: ModuleCtorFn) {
        let key = descriptor.key.clone();
        self.registry.register(descriptor, ctor);
        self.bus.publish(EngineEvent::ModuleRegistered { key });
    }

    /// Removes a module definition, disposing its live instances first.
    /// Returns the uids that were disposed.
    pub fn unregister_module(&mut self, key: &ModuleKey) -> Vec<InstanceUid> {
        let uids: Vec<InstanceUid> = self
            .registry
            .list_instances()
            .filter(|i| i.key() == key)
            .map(|i| i.uid().clone())
            .collect();
        for uid in &uids {
            self.remove_module(uid);
        }
        self.registry.unregister(key);
        uids
    }

    /// Instantiates a module and registers each of its parameters with the
    /// live store under `<uid>.<param>`, normalized to 0..=1, defaulting to
    /// the instance's initial value.
    pub fn create_module(
        &mut self,
        key: &ModuleKey,
        options: &FxHashMap<String, f64>,
    ) -> Result<InstanceUid, RegistryError> {
        let now = self.now();
        let uid = self.registry.create_instance(key, options, now)?;
        let initial: Vec<(ParamName, f64)> = self
            .registry
            .get_instance(&uid)
            .map(|instance| {
                instance
                    .params()
                    .iter()
                    .map(|(param, value)| (instance.qualified_param_name(param), *value))
                    .collect()
            })
            .unwrap_or_default();
        for (name, value) in initial {
            self.params.register(name, ParamConfig::normalized(value));
        }
        self.bus
            .publish(EngineEvent::ModuleInstantiated { uid: uid.clone() });
        Ok(uid)
    }

    /// Disposes an instance and forgets its parameters, so no morph or macro
    /// can write to a dead module. Returns false on unknown uid.
    pub fn remove_module(&mut self, uid: &InstanceUid) -> bool {
        let Some(instance) = self.registry.get_instance(uid) else {
            return false;
        };
        let names = instance.qualified_param_names();
        self.registry.remove_instance(uid);
        for name in names {
            self.params.unregister(&name);
        }
        self.bus
            .publish(EngineEvent::ModuleRemoved { uid: uid.clone() });
        true
    }

    /// Wires a connection from an instance's output. Stamped with the current
    /// time.
    pub fn connect(
        &mut self,
        source: &InstanceUid,
        target: ConnectionTarget,
        output_channel: usize,
        input_channel: usize,
    ) -> anyhow::Result<()> {
        let now = self.now();
        self.registry
            .connect(source, target, output_channel, input_channel, now)
    }

    /// Enables or disables an instance. Returns false on unknown uid.
    pub fn set_enabled(&mut self, uid: &InstanceUid, enabled: bool) -> bool {
        if let Some(instance) = self.registry.get_instance_mut(uid) {
            instance.set_enabled(enabled);
            true
        } else {
            false
        }
    }

    /// Sets or clears an instance's bypass. Returns false on unknown uid.
    pub fn set_bypassed(&mut self, uid: &InstanceUid, bypassed: bool) -> bool {
        if let Some(instance) = self.registry.get_instance_mut(uid) {
            instance.set_bypassed(bypassed);
            true
        } else {
            false
        }
    }

    delegate! {
        to self.registry {
            /// Replaces the tier-entitlement predicate.
            pub fn set_entitlement(&mut self, entitlement: EntitlementFn);
            /// All definitions matching the filter, sorted by key.
            pub fn list_modules(&self, filter: &ModuleFilter) -> Vec<&ModuleDescriptor>;
            /// Whether a definition exists for the key.
            pub fn is_registered(&self, key: &ModuleKey) -> bool;
            /// Returns the specified instance.
            pub fn get_instance(
                &self,
                uid: &InstanceUid,
            ) -> Option<&crate::graph::ModuleInstance>;
            #[allow(missing_docs)]
            pub fn instance_count(&self) -> usize;
            /// Removes all of `source`'s connections to the target.
            pub fn disconnect(&mut self, source: &InstanceUid, target: &ConnectionTarget) -> usize;
        }
    }

    // ------------------------------------------------------------------
    // Parameters

    /// Registers a freestanding parameter (one not owned by a module), such as
    /// a master volume or crossfader.
    pub fn register_param(&mut self, name: ParamName, config: ParamConfig) {
        self.params.register(name, config);
    }

    /// Sets a parameter immediately, cancelling any in-flight morph on it.
    pub fn set_param_value(&mut self, name: &ParamName, value: f64) {
        let writes = self.params.set_value(name, value, true);
        self.route_writes(writes);
    }

    /// Begins a timed morph toward `target`.
    pub fn morph_param(&mut self, name: &ParamName, target: f64, duration: Millis, easing: Easing) {
        let now = self.now();
        let writes = self.params.morph(name, target, duration, easing, now);
        self.route_writes(writes);
    }

    /// Begins timed morphs toward each target. Unknown names are skipped.
    pub fn morph_params(&mut self, targets: &[(ParamName, f64)], duration: Millis, easing: Easing) {
        let now = self.now();
        let writes = self.params.morph_multiple(targets, duration, easing, now);
        self.route_writes(writes);
    }

    /// Sets every parameter to a random value within its bounds.
    pub fn randomize_params(&mut self) {
        let writes = self.params.randomize(&mut self.rng);
        self.route_writes(writes);
    }

    delegate! {
        to self.params {
            /// A parameter's current value.
            #[call(value)]
            pub fn param_value(&self, name: &ParamName) -> Option<f64>;
            /// A parameter's (min, max) bounds.
            #[call(bounds)]
            pub fn param_bounds(&self, name: &ParamName) -> Option<(f64, f64)>;
            /// Whether a parameter is registered.
            #[call(contains)]
            pub fn has_param(&self, name: &ParamName) -> bool;
            /// Whether a specific parameter is morphing.
            pub fn is_morphing(&self, name: &ParamName) -> bool;
            /// Drops all pending morphs, freezing values in place.
            #[call(clear)]
            pub fn clear_morphs(&mut self);
            /// Makes accepted writes to `source` also write
            /// `value * scale + offset` to `target`.
            #[call(link)]
            pub fn link_params(&mut self, source: &ParamName, target: &ParamName, scale: f64, offset: f64);
            /// Removes all links from `source` to `target`.
            #[call(unlink)]
            pub fn unlink_params(&mut self, source: &ParamName, target: &ParamName);
        }
    }

    // ------------------------------------------------------------------
    // Macros

    delegate! {
        to self.macros {
            /// Registers (or replaces) a macro control.
            pub fn register_macro(&mut self, id: MacroId, label: &str, mappings: Vec<MacroMapping>);
            /// Binds a macro to an external-controller channel.
            pub fn bind_controller(&mut self, id: &MacroId, channel: u8) -> bool;
            /// Clears a macro's controller binding.
            pub fn unbind_controller(&mut self, id: &MacroId) -> bool;
        }
    }

    /// The current scalar of a macro.
    pub fn macro_value(&self, id: &MacroId) -> Option<f64> {
        self.macros.get(id).map(|m| m.value)
    }

    /// Moves a macro to a new scalar. With a zero duration the mapped values
    /// land immediately; otherwise each target parameter morphs to its mapped
    /// value with linear easing. Unknown ids are a no-op.
    pub fn set_macro(&mut self, id: &MacroId, scalar: f64, duration: Millis) {
        let Some(batch) = self.macros.set_scalar(id, scalar) else {
            return;
        };
        if duration.is_instant() {
            self.apply_batch(&batch);
        } else {
            let now = self.now();
            let writes = self.params.morph_multiple(&batch, duration, Easing::Linear, now);
            self.route_writes(writes);
        }
        // set_scalar clamped it; re-read the stored value.
        if let Some(value) = self.macro_value(id) {
            self.bus.publish(EngineEvent::MacroChanged {
                id: id.clone(),
                value,
            });
        }
    }

    /// Animates a macro's own scalar toward `target`, re-applying its mappings
    /// every tick.
    pub fn morph_macro(&mut self, id: &MacroId, target: f64, duration: Millis, easing: Easing) {
        let now = self.now();
        self.macros.begin_motion(id, target, duration, easing, now);
    }

    /// Handles a hardware-controller message: every macro bound to `channel`
    /// moves to `value / 127` immediately.
    pub fn handle_controller_input(&mut self, channel: u8, value: u8) {
        let scalar = f64::from(value.min(127)) / 127.0;
        for id in self.macros.macros_for_channel(channel) {
            self.set_macro(&id, scalar, Millis::zero());
        }
    }

    // ------------------------------------------------------------------
    // Presets

    /// Captures the entire live parameter table into an A/B slot.
    pub fn capture_slot(&mut self, slot: Slot, name: &str) {
        let now = self.now();
        self.presets.capture_slot(slot, name, self.params.snapshot(), now);
    }

    /// Moves the A/B morph to `position` and applies the blended table,
    /// immediately at zero duration or as a batch morph otherwise. A warning
    /// (not an error) when either slot is unset, since pre-capture crossfader
    /// wiggles are routine.
    pub fn set_morph_position(&mut self, position: f64, duration: Millis) {
        let Some(batch) = self.presets.blend(position) else {
            eprintln!("WARNING: ignoring morph position change with an unset slot");
            return;
        };
        self.presets.set_position(position);
        if duration.is_instant() {
            self.apply_batch(&batch);
        } else {
            let now = self.now();
            let writes = self.params.morph_multiple(&batch, duration, Easing::Linear, now);
            self.route_writes(writes);
        }
        self.bus.publish(EngineEvent::MorphPositionChanged {
            position: self.presets.position(),
        });
    }

    /// Animates the A/B morph position toward `target`, re-blending every
    /// tick.
    pub fn morph_to(&mut self, target: f64, duration: Millis, easing: Easing) {
        let now = self.now();
        if !self.presets.begin_motion(target, duration, easing, now) {
            eprintln!("WARNING: ignoring timed morph with an unset slot");
        }
    }

    /// Swaps the A and B slots and re-applies the blend at the current
    /// position, inverting the audible result.
    pub fn swap_ab(&mut self) {
        self.presets.swap_ab();
        if let Some(batch) = self.presets.blend(self.presets.position()) {
            self.apply_batch(&batch);
        }
    }

    delegate! {
        to self.presets {
            /// The current A/B morph position.
            #[call(position)]
            pub fn morph_position(&self) -> f64;
            /// The snapshot currently in a slot.
            pub fn slot(&self, slot: Slot) -> Option<&crate::automation::PresetSnapshot>;
            /// Copies slot A over slot B.
            pub fn copy_a_to_b(&mut self) -> bool;
            /// Copies slot B over slot A.
            pub fn copy_b_to_a(&mut self) -> bool;
            /// Saves a live slot into a named bank.
            pub fn save_to_bank(&mut self, bank: &BankName, slot: Slot) -> bool;
            /// Loads a banked snapshot into the matching live slot.
            pub fn load_from_bank(&mut self, bank: &BankName, slot: Slot) -> bool;
            /// Serializes a bank for storage.
            pub fn export_bank(&self, bank: &BankName) -> Option<String>;
            /// Deserializes and installs a whole bank. Atomic.
            pub fn import_bank(
                &mut self,
                json: &str,
            ) -> Result<BankName, crate::automation::ImportError>;
        }
    }

    // ------------------------------------------------------------------
    // Recording

    /// Begins recording every accepted parameter write into a clip. Discards
    /// any recording already in progress.
    pub fn start_recording(&mut self) {
        let now = self.now();
        self.recorder.start_recording(now);
    }

    /// Ends the recording and returns the clip, or [None] if nothing was
    /// being recorded.
    pub fn stop_recording(&mut self) -> Option<AutomationClip> {
        let now = self.now();
        self.recorder.stop_recording(now)
    }

    /// Plays a clip from its beginning; its changes are re-applied through
    /// the store as their offsets elapse.
    pub fn play_clip(&mut self, clip: AutomationClip) {
        let now = self.now();
        self.recorder.play(clip, now);
    }

    delegate! {
        to self.recorder {
            /// Whether a recording is in progress.
            pub fn is_recording(&self) -> bool;
            /// Whether a clip is playing.
            pub fn is_playing(&self) -> bool;
            /// Stops playback without emitting the remaining changes.
            pub fn stop_playback(&mut self) -> bool;
        }
    }

    // ------------------------------------------------------------------

    /// Tears the session down: cancels all animation and disposes every
    /// instance. The engine is reusable afterward, though empty.
    pub fn shutdown(&mut self) {
        self.params.clear();
        self.recorder.stop_playback();
        let uids: Vec<InstanceUid> = self
            .registry
            .list_instances()
            .map(|i| i.uid().clone())
            .collect();
        for uid in uids {
            self.remove_module(&uid);
        }
    }
}
