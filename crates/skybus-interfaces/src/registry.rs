//! Registry of installed interfaces and the introspection encoding.

use crate::interface::Interface;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// Thread-safe set of interfaces installed on a device, keyed by name.
///
/// Shared between the device layer (which installs interfaces) and the
/// transport session (which advertises them during the handshake).
#[derive(Debug, Default)]
pub struct InterfaceRegistry {
    interfaces: DashMap<String, Arc<Interface>>,
}

impl InterfaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install an interface, replacing any previous one under the same name.
    ///
    /// Returns the replaced interface, if any.
    pub fn register(&self, interface: Interface) -> Option<Arc<Interface>> {
        let name = interface.name().to_string();
        let replaced = self.interfaces.insert(name.clone(), Arc::new(interface));
        if replaced.is_some() {
            debug!(interface = %name, "replaced installed interface");
        }
        replaced
    }

    /// Remove an interface by name.
    pub fn unregister(&self, name: &str) -> Option<Arc<Interface>> {
        self.interfaces.remove(name).map(|(_, interface)| interface)
    }

    /// Look up an installed interface.
    pub fn get(&self, name: &str) -> Option<Arc<Interface>> {
        self.interfaces.get(name).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.interfaces.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.interfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }

    /// Installed interface names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.interfaces.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Introspection line advertising the installed set.
    ///
    /// One `name:major:minor` entry per interface, joined by `;` and sorted
    /// by name so the same set always encodes to the same string. Empty when
    /// nothing is installed.
    pub fn introspection_string(&self) -> String {
        let mut entries: Vec<String> = self
            .interfaces
            .iter()
            .map(|entry| {
                let interface = entry.value();
                format!(
                    "{}:{}:{}",
                    interface.name(),
                    interface.version_major(),
                    interface.version_minor()
                )
            })
            .collect();
        entries.sort();
        entries.join(";")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{PropertyStore, StoreError};
    use crate::types::DataValue;

    struct NullStore;

    impl PropertyStore for NullStore {
        fn put(&self, _key: &str, _value: &DataValue) -> Result<(), StoreError> {
            Ok(())
        }
        fn get(&self, _key: &str) -> Result<Option<DataValue>, StoreError> {
            Ok(None)
        }
        fn delete(&self, _key: &str) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn interface(name: &str, major: i32, minor: i32) -> Interface {
        let json = format!(
            r#"{{
                "interface_name": "{name}",
                "version_major": {major},
                "version_minor": {minor},
                "type": "datastream",
                "ownership": "device",
                "mappings": [{{"endpoint": "/value", "type": "double"}}]
            }}"#
        );
        Interface::from_json(&json, std::sync::Arc::new(NullStore)).unwrap()
    }

    #[test]
    fn empty_registry_encodes_to_empty_string() {
        let registry = InterfaceRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.introspection_string(), "");
    }

    #[test]
    fn introspection_is_sorted_by_name() {
        let registry = InterfaceRegistry::new();
        registry.register(interface("org.example.Zeta", 1, 2));
        registry.register(interface("org.example.Alpha", 0, 3));
        assert_eq!(
            registry.introspection_string(),
            "org.example.Alpha:0:3;org.example.Zeta:1:2"
        );
    }

    #[test]
    fn register_replaces_same_name() {
        let registry = InterfaceRegistry::new();
        assert!(registry.register(interface("org.example.A", 0, 1)).is_none());
        let replaced = registry.register(interface("org.example.A", 1, 0)).unwrap();
        assert_eq!(replaced.version_major(), 0);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.introspection_string(), "org.example.A:1:0");
    }

    #[test]
    fn unregister_removes_from_introspection() {
        let registry = InterfaceRegistry::new();
        registry.register(interface("org.example.A", 0, 1));
        registry.register(interface("org.example.B", 0, 1));
        assert!(registry.unregister("org.example.A").is_some());
        assert!(registry.unregister("org.example.A").is_none());
        assert_eq!(registry.introspection_string(), "org.example.B:0:1");
    }
}
