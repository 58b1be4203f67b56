// Copyright (c) 2024 Mike Tsao

use crate::{
    graph::{Connection, ConnectionTarget, ModuleGraph},
    traits::ModuleCore,
    types::{InstanceUid, Millis, ModuleKey, ParamName},
};
use rustc_hash::FxHashMap;

/// A live module: a boxed [ModuleCore] plus the bookkeeping the engine needs
/// to wire it into the signal graph and automate it. Lifecycle is
/// `unconnected → connected (0..N) → disposed`; after disposal the registry
/// forgets the instance, and the automation layer is told to forget its
/// parameters.
#[derive(Debug)]
pub struct ModuleInstance {
    uid: InstanceUid,
    key: ModuleKey,
    enabled: bool,
    bypassed: bool,
    connections: Vec<Connection>,
    params: FxHashMap<String, f64>,
    graph: ModuleGraph,
    core: Box<dyn ModuleCore>,
}
impl ModuleInstance {
    pub(crate) fn new_with(
        uid: InstanceUid,
        key: ModuleKey,
        params: FxHashMap<String, f64>,
        graph: ModuleGraph,
        core: Box<dyn ModuleCore>,
    ) -> Self {
        Self {
            uid,
            key,
            enabled: true,
            bypassed: false,
            connections: Vec::default(),
            params,
            graph,
            core,
        }
    }

    #[allow(missing_docs)]
    pub fn uid(&self) -> &InstanceUid {
        &self.uid
    }

    #[allow(missing_docs)]
    pub fn key(&self) -> &ModuleKey {
        &self.key
    }

    #[allow(missing_docs)]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[allow(missing_docs)]
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    #[allow(missing_docs)]
    pub fn is_bypassed(&self) -> bool {
        self.bypassed
    }

    #[allow(missing_docs)]
    pub fn set_bypassed(&mut self, bypassed: bool) {
        self.bypassed = bypassed;
    }

    /// The module's connection points.
    pub fn graph(&self) -> &ModuleGraph {
        &self.graph
    }

    /// The module's current parameter values.
    pub fn params(&self) -> &FxHashMap<String, f64> {
        &self.params
    }

    /// The value of one parameter, if the module has it.
    pub fn param_value(&self, name: &str) -> Option<f64> {
        self.params.get(name).copied()
    }

    /// Applies a parameter value to the module core and records it.
    pub fn set_param(&mut self, name: &str, value: f64) {
        self.params.insert(name.to_string(), value);
        self.core.set_param(name, value);
    }

    /// The store-namespaced name of one of this module's parameters.
    pub fn qualified_param_name(&self, param: &str) -> ParamName {
        ParamName(format!("{}.{}", self.uid, param))
    }

    /// The store-namespaced names of all of this module's parameters.
    pub fn qualified_param_names(&self) -> Vec<ParamName> {
        self.params
            .keys()
            .map(|k| self.qualified_param_name(k))
            .collect()
    }

    /// This module's outgoing connections, in creation order.
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub(crate) fn add_connection(
        &mut self,
        target: ConnectionTarget,
        output_channel: usize,
        input_channel: usize,
        created_at: Millis,
    ) {
        self.connections.push(Connection {
            target,
            output_channel,
            input_channel,
            created_at,
        });
    }

    /// Removes every outgoing connection matching the target. Returns how many
    /// were removed.
    pub fn disconnect_target(&mut self, target: &ConnectionTarget) -> usize {
        let before = self.connections.len();
        self.connections.retain(|c| c.target != *target);
        before - self.connections.len()
    }

    /// Releases connections and parameters, and lets the core clean up. The
    /// registry calls this exactly once, but the operation itself is harmless
    /// to repeat.
    pub(crate) fn dispose(&mut self) {
        self.connections.clear();
        self.params.clear();
        self.core.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::PortSpec;

    #[derive(Debug, Default)]
    struct NullCore {
        disposed: bool,
        last_param: Option<(String, f64)>,
    }
    impl ModuleCore for NullCore {
        fn create_graph(&mut self) -> anyhow::Result<ModuleGraph> {
            Ok(ModuleGraph::mono_in_out())
        }

        fn set_param(&mut self, name: &str, value: f64) {
            self.last_param = Some((name.to_string(), value));
        }

        fn dispose(&mut self) {
            self.disposed = true;
        }
    }

    fn make_instance(uid: &str) -> ModuleInstance {
        let mut params = FxHashMap::default();
        params.insert("cutoff".to_string(), 0.5);
        ModuleInstance::new_with(
            InstanceUid::from(uid),
            ModuleKey::from("test-filter"),
            params,
            ModuleGraph::mono_in_out(),
            Box::new(NullCore::default()),
        )
    }

    #[test]
    fn set_param_reaches_core_and_map() {
        let mut instance = make_instance("m1-aaaaaa");
        instance.set_param("cutoff", 0.75);
        assert_eq!(instance.param_value("cutoff"), Some(0.75));
    }

    #[test]
    fn qualified_names_follow_convention() {
        let instance = make_instance("m1-aaaaaa");
        assert_eq!(
            instance.qualified_param_name("cutoff"),
            ParamName::from("m1-aaaaaa.cutoff")
        );
    }

    #[test]
    fn dispose_releases_connections_and_params() {
        let mut instance = make_instance("m1-aaaaaa");
        instance.add_connection(
            ConnectionTarget::External("main-out".to_string()),
            0,
            0,
            Millis(10.0),
        );
        assert_eq!(instance.connections().len(), 1);

        instance.dispose();
        assert!(
            instance.connections().is_empty(),
            "dispose must release all connections"
        );
        assert!(
            instance.params().is_empty(),
            "dispose must clear the parameter map"
        );
    }

    #[test]
    fn disconnect_removes_only_matching_target() {
        let mut instance = make_instance("m1-aaaaaa");
        let keep = ConnectionTarget::Module(InstanceUid::from("m2-bbbbbb"));
        let drop = ConnectionTarget::External("main-out".to_string());
        instance.add_connection(keep.clone(), 0, 0, Millis(1.0));
        instance.add_connection(drop.clone(), 0, 1, Millis(2.0));

        assert_eq!(instance.disconnect_target(&drop), 1);
        assert_eq!(instance.connections().len(), 1);
        assert_eq!(instance.connections()[0].target, keep);
    }

    #[test]
    fn port_specs_cover_channel_counts() {
        assert_eq!(PortSpec::mono("in").channels, 1);
        assert_eq!(PortSpec::stereo("out").channels, 2);
    }
}
