// Copyright (c) 2024 Mike Tsao

//! The module registry owns module definitions (registered types) and module
//! instances (live objects), and mediates creation, lookup, disposal,
//! tier-gating, and indexing.

use crate::{
    graph::{ConnectionTarget, ModuleInstance},
    traits::{ModuleCore, ModuleCtorFn},
    types::{InstanceUid, InstanceUidFactory, Millis, ModuleKey},
    util::Rng,
};
use anyhow::anyhow;
use derivative::Derivative;
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

pub use definition::{Category, ModuleDescriptor, ModuleDescriptorBuilder, ModuleFilter, Tier};

mod definition;

/// The most commonly used imports.
pub mod prelude {
    pub use super::{
        Category, ModuleDescriptor, ModuleDescriptorBuilder, ModuleFilter, ModuleRegistry,
        RegistryError, Tier,
    };
}

/// The failures a caller must branch on. Probe-style lookups (`get_instance`,
/// `remove_instance`) return [Option]/[bool] instead, because misses are
/// expected during setup races.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No definition is registered under the requested key.
    #[error("no module definition named '{0}' is registered")]
    DefinitionNotFound(ModuleKey),
    /// The definition is gated behind a tier the caller doesn't have. Carries
    /// a hint suitable for an upgrade prompt.
    #[error("module '{key}' requires the {tier} tier: {hint}")]
    TierDenied {
        /// The requested definition.
        key: ModuleKey,
        /// The tier the definition requires.
        tier: Tier,
        /// A message suitable for surfacing to the user.
        hint: String,
    },
    /// The module failed to produce a valid graph (exactly one input and one
    /// output). Fatal for the instance; nothing is stored.
    #[error("module '{key}' failed to initialize: {reason}")]
    InitializationFault {
        /// The requested definition.
        key: ModuleKey,
        /// What went wrong.
        reason: String,
    },
}

/// The host-injected predicate deciding whether the current user may
/// instantiate modules of a given [Tier].
pub type EntitlementFn = Box<dyn Fn(Tier) -> bool>;

#[derive(Derivative)]
#[derivative(Debug)]
struct ModuleDefinition {
    descriptor: ModuleDescriptor,
    #[derivative(Debug = "ignore")]
    ctor: ModuleCtorFn,
}

/// Owns module definitions and live instances. Definitions may be
/// re-registered at any time (hot reloading is expected); instances are
/// created through [ModuleRegistry::create_instance] and live until disposed.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct ModuleRegistry {
    definitions: FxHashMap<ModuleKey, ModuleDefinition>,
    by_category: FxHashMap<Category, FxHashSet<ModuleKey>>,
    instances: FxHashMap<InstanceUid, ModuleInstance>,
    uid_factory: InstanceUidFactory,
    #[derivative(Debug = "ignore")]
    entitlement: EntitlementFn,
    rng: Rng,
}
impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new_with(Box::new(|_| true))
    }
}
impl ModuleRegistry {
    /// Creates a registry with the given entitlement predicate. The registry
    /// does not decide entitlements itself; the host does.
    pub fn new_with(entitlement: EntitlementFn) -> Self {
        Self {
            definitions: Default::default(),
            by_category: Default::default(),
            instances: Default::default(),
            uid_factory: InstanceUidFactory,
            entitlement,
            rng: Rng::default(),
        }
    }

    /// Replaces the entitlement predicate.
    pub fn set_entitlement(&mut self, entitlement: EntitlementFn) {
        self.entitlement = entitlement;
    }

    /// Stores a definition under its key, indexing it by category. An existing
    /// definition with the same key is overwritten with a warning, not an
    /// error, because hot-reloading module definitions is expected.
    pub fn register(&mut self, descriptor: ModuleDescriptor, ctor: ModuleCtorFn) {
        let key = descriptor.key.clone();
        if let Some(prior) = self.definitions.get(&key) {
            eprintln!("WARNING: overwriting module definition '{key}'");
            if let Some(keys) = self.by_category.get_mut(&prior.descriptor.category) {
                keys.remove(&key);
            }
        }
        self.by_category
            .entry(descriptor.category)
            .or_default()
            .insert(key.clone());
        self.definitions
            .insert(key, ModuleDefinition { descriptor, ctor });
    }

    /// Returns the descriptor registered under the given key.
    pub fn definition(&self, key: &ModuleKey) -> Option<&ModuleDescriptor> {
        self.definitions.get(key).map(|d| &d.descriptor)
    }

    /// Constructs a new instance of the named definition. `options` are merged
    /// over the definition's parameter defaults. Fails if the definition is
    /// unknown, if the tier check denies it, or if the module doesn't produce
    /// a valid graph.
    pub fn create_instance(
        &mut self,
        key: &ModuleKey,
        options: &FxHashMap<String, f64>,
        now: Millis,
    ) -> Result<InstanceUid, RegistryError> {
        let definition = self
            .definitions
            .get(key)
            .ok_or_else(|| RegistryError::DefinitionNotFound(key.clone()))?;
        let tier = definition.descriptor.tier;
        if !(self.entitlement)(tier) {
            return Err(RegistryError::TierDenied {
                key: key.clone(),
                tier,
                hint: "upgrade your plan to unlock premium modules".to_string(),
            });
        }

        let mut core: Box<dyn ModuleCore> = (definition.ctor)();
        let graph = core
            .create_graph()
            .map_err(|e| RegistryError::InitializationFault {
                key: key.clone(),
                reason: e.to_string(),
            })?;
        if !graph.is_valid() {
            return Err(RegistryError::InitializationFault {
                key: key.clone(),
                reason: format!(
                    "expected exactly one input and one output, got {} and {}",
                    graph.inputs.len(),
                    graph.outputs.len()
                ),
            });
        }

        let mut params = definition.descriptor.defaults.clone();
        params.extend(options.iter().map(|(k, v)| (k.clone(), *v)));

        let uid = self.uid_factory.mint(now, &mut self.rng);
        let mut instance =
            ModuleInstance::new_with(uid.clone(), key.clone(), params, graph, core);
        // Push the merged initial values through the core so it starts in the
        // state the parameter map claims.
        let initial: Vec<(String, f64)> = instance
            .params()
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        for (name, value) in initial {
            instance.set_param(&name, value);
        }
        self.instances.insert(uid.clone(), instance);
        Ok(uid)
    }

    /// Returns the specified instance.
    pub fn get_instance(&self, uid: &InstanceUid) -> Option<&ModuleInstance> {
        self.instances.get(uid)
    }

    /// Returns the specified instance, mutably.
    pub fn get_instance_mut(&mut self, uid: &InstanceUid) -> Option<&mut ModuleInstance> {
        self.instances.get_mut(uid)
    }

    /// Disposes the instance (releasing its connections and parameters) and
    /// forgets it. Returns false if the uid is unknown, which makes a second
    /// removal a harmless no-op rather than an error.
    pub fn remove_instance(&mut self, uid: &InstanceUid) -> bool {
        if let Some(mut instance) = self.instances.remove(uid) {
            instance.dispose();
            true
        } else {
            false
        }
    }

    /// All live instances. Order is undefined.
    pub fn list_instances(&self) -> impl Iterator<Item = &ModuleInstance> {
        self.instances.values()
    }

    #[allow(missing_docs)]
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// All definitions satisfying the filter, sorted by key for consistent
    /// display.
    pub fn list_modules(&self, filter: &ModuleFilter) -> Vec<&ModuleDescriptor> {
        let mut hits: Vec<&ModuleDescriptor> = if let Some(category) = filter.category {
            self.by_category
                .get(&category)
                .map(|keys| {
                    keys.iter()
                        .filter_map(|k| self.definition(k))
                        .filter(|d| filter.matches(d))
                        .collect()
                })
                .unwrap_or_default()
        } else {
            self.definitions
                .values()
                .map(|d| &d.descriptor)
                .filter(|d| filter.matches(d))
                .collect()
        };
        hits.sort_by(|a, b| a.key.cmp(&b.key));
        hits
    }

    /// Removes a definition, first disposing every live instance of it. The
    /// ordering (instances before definition) guarantees no orphaned
    /// instances. Returns the uids that were disposed, which is empty for an
    /// unknown key.
    pub fn unregister(&mut self, key: &ModuleKey) -> Vec<InstanceUid> {
        let uids: Vec<InstanceUid> = self
            .instances
            .values()
            .filter(|i| i.key() == key)
            .map(|i| i.uid().clone())
            .collect();
        for uid in &uids {
            self.remove_instance(uid);
        }
        if let Some(definition) = self.definitions.remove(key) {
            if let Some(keys) = self.by_category.get_mut(&definition.descriptor.category) {
                keys.remove(key);
            }
        }
        uids
    }

    /// Whether a definition exists for the key.
    pub fn is_registered(&self, key: &ModuleKey) -> bool {
        self.definitions.contains_key(key)
    }

    /// Forwards a parameter value to an instance. Returns false on unknown
    /// uid.
    pub fn set_param(&mut self, uid: &InstanceUid, name: &str, value: f64) -> bool {
        if let Some(instance) = self.instances.get_mut(uid) {
            instance.set_param(name, value);
            true
        } else {
            false
        }
    }

    /// Wires a connection from `source`'s output to the target input. Both
    /// endpoints must exist right now; liveness is not re-checked afterward,
    /// because the source owns the connection and disposal releases it.
    pub fn connect(
        &mut self,
        source: &InstanceUid,
        target: ConnectionTarget,
        output_channel: usize,
        input_channel: usize,
        now: Millis,
    ) -> anyhow::Result<()> {
        if let ConnectionTarget::Module(target_uid) = &target {
            if !self.instances.contains_key(target_uid) {
                return Err(anyhow!("connection target {target_uid} does not exist"));
            }
            let target_channels = self.instances[target_uid].graph().inputs[0].channels;
            if input_channel >= target_channels {
                return Err(anyhow!(
                    "input channel {input_channel} out of range for {target_uid}"
                ));
            }
        }
        let Some(instance) = self.instances.get_mut(source) else {
            return Err(anyhow!("connection source {source} does not exist"));
        };
        if output_channel >= instance.graph().outputs[0].channels {
            return Err(anyhow!(
                "output channel {output_channel} out of range for {source}"
            ));
        }
        instance.add_connection(target, output_channel, input_channel, now);
        Ok(())
    }

    /// Removes all of `source`'s connections to the given target. Returns how
    /// many were removed; 0 covers both "none matched" and "unknown source."
    pub fn disconnect(&mut self, source: &InstanceUid, target: &ConnectionTarget) -> usize {
        self.instances
            .get_mut(source)
            .map(|i| i.disconnect_target(target))
            .unwrap_or(0)
    }
}
