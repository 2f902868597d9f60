//! Interface construction, path resolution and payload validation.

use crate::descriptor::{
    Aggregation, InterfaceDescriptor, InterfaceType, MappingDescriptor, Ownership,
};
use crate::error::{InterfaceError, ValueError};
use crate::mapping::EndpointMapping;
use crate::store::PropertyStore;
use crate::types::{DataValue, Reliability};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Behavioural family of an interface.
///
/// The family is fixed by the descriptor's (type, ownership, aggregation)
/// triple. Properties never aggregate, so six families exist; the seventh and
/// eighth combinations are rejected at construction time. Property families
/// carry the storage handle used to persist reported values.
#[derive(Clone)]
pub enum InterfaceKind {
    DeviceProperty { storage: Arc<dyn PropertyStore> },
    ServerProperty { storage: Arc<dyn PropertyStore> },
    DeviceDatastreamIndividual,
    ServerDatastreamIndividual,
    DeviceDatastreamObject { explicit_timestamp: bool },
    ServerDatastreamObject { explicit_timestamp: bool },
}

impl fmt::Debug for InterfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterfaceKind::DeviceProperty { .. } => f.write_str("DeviceProperty"),
            InterfaceKind::ServerProperty { .. } => f.write_str("ServerProperty"),
            InterfaceKind::DeviceDatastreamIndividual => f.write_str("DeviceDatastreamIndividual"),
            InterfaceKind::ServerDatastreamIndividual => f.write_str("ServerDatastreamIndividual"),
            InterfaceKind::DeviceDatastreamObject { explicit_timestamp } => f
                .debug_struct("DeviceDatastreamObject")
                .field("explicit_timestamp", explicit_timestamp)
                .finish(),
            InterfaceKind::ServerDatastreamObject { explicit_timestamp } => f
                .debug_struct("ServerDatastreamObject")
                .field("explicit_timestamp", explicit_timestamp)
                .finish(),
        }
    }
}

/// A versioned, validated interface ready for publish-side checks.
#[derive(Debug, Clone)]
pub struct Interface {
    name: String,
    version_major: i32,
    version_minor: i32,
    kind: InterfaceKind,
    mappings: Vec<EndpointMapping>,
}

impl Interface {
    /// Build an interface from descriptor JSON.
    ///
    /// `storage` is only retained by property interfaces; datastreams ignore
    /// it, which keeps construction a pure function of its two inputs.
    pub fn from_json(text: &str, storage: Arc<dyn PropertyStore>) -> Result<Self, InterfaceError> {
        let descriptor = InterfaceDescriptor::from_json(text)?;
        Self::from_descriptor(&descriptor, storage)
    }

    /// Build an interface from a parsed descriptor.
    pub fn from_descriptor(
        descriptor: &InterfaceDescriptor,
        storage: Arc<dyn PropertyStore>,
    ) -> Result<Self, InterfaceError> {
        if descriptor.interface_name.is_empty() {
            return Err(InterfaceError::InvalidDescriptor(
                "interface_name is empty".to_string(),
            ));
        }
        if descriptor.version_major == 0 && descriptor.version_minor == 0 {
            return Err(InterfaceError::InvalidDescriptor(format!(
                "{}: version_major and version_minor cannot both be 0",
                descriptor.interface_name
            )));
        }

        let triple = (
            descriptor.interface_type,
            descriptor.ownership,
            descriptor.aggregation,
        );
        let kind = match triple {
            (InterfaceType::Properties, Ownership::Device, Aggregation::Individual) => {
                InterfaceKind::DeviceProperty { storage }
            }
            (InterfaceType::Properties, Ownership::Server, Aggregation::Individual) => {
                InterfaceKind::ServerProperty { storage }
            }
            (InterfaceType::Properties, _, Aggregation::Object) => {
                return Err(InterfaceError::InvalidDescriptor(format!(
                    "{}: properties interfaces cannot use object aggregation",
                    descriptor.interface_name
                )));
            }
            (InterfaceType::Datastream, Ownership::Device, Aggregation::Individual) => {
                InterfaceKind::DeviceDatastreamIndividual
            }
            (InterfaceType::Datastream, Ownership::Server, Aggregation::Individual) => {
                InterfaceKind::ServerDatastreamIndividual
            }
            (InterfaceType::Datastream, Ownership::Device, Aggregation::Object) => {
                InterfaceKind::DeviceDatastreamObject {
                    explicit_timestamp: aggregate_explicit_timestamp(&descriptor.mappings),
                }
            }
            (InterfaceType::Datastream, Ownership::Server, Aggregation::Object) => {
                InterfaceKind::ServerDatastreamObject {
                    explicit_timestamp: aggregate_explicit_timestamp(&descriptor.mappings),
                }
            }
        };

        let is_property = descriptor.interface_type == InterfaceType::Properties;
        let mut mappings = Vec::with_capacity(descriptor.mappings.len());
        for entry in &descriptor.mappings {
            if !entry.endpoint.starts_with('/') {
                return Err(InterfaceError::InvalidDescriptor(format!(
                    "{}: endpoint {:?} must start with /",
                    descriptor.interface_name, entry.endpoint
                )));
            }
            let mapping = if is_property {
                EndpointMapping::for_property(entry)
            } else {
                EndpointMapping::for_datastream(entry)
            };
            mappings.push(mapping);
        }

        for (index, mapping) in mappings.iter().enumerate() {
            for other in &mappings[index + 1..] {
                if mapping.overlaps(other) {
                    warn!(
                        interface = %descriptor.interface_name,
                        first = %mapping.endpoint(),
                        second = %other.endpoint(),
                        "ambiguous endpoints: some paths match both templates"
                    );
                }
            }
        }

        Ok(Self {
            name: descriptor.interface_name.clone(),
            version_major: descriptor.version_major,
            version_minor: descriptor.version_minor,
            kind,
            mappings,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version_major(&self) -> i32 {
        self.version_major
    }

    pub fn version_minor(&self) -> i32 {
        self.version_minor
    }

    pub fn kind(&self) -> &InterfaceKind {
        &self.kind
    }

    /// Mappings in descriptor order.
    pub fn mappings(&self) -> &[EndpointMapping] {
        &self.mappings
    }

    pub fn ownership(&self) -> Ownership {
        match self.kind {
            InterfaceKind::DeviceProperty { .. }
            | InterfaceKind::DeviceDatastreamIndividual
            | InterfaceKind::DeviceDatastreamObject { .. } => Ownership::Device,
            InterfaceKind::ServerProperty { .. }
            | InterfaceKind::ServerDatastreamIndividual
            | InterfaceKind::ServerDatastreamObject { .. } => Ownership::Server,
        }
    }

    pub fn interface_type(&self) -> InterfaceType {
        match self.kind {
            InterfaceKind::DeviceProperty { .. } | InterfaceKind::ServerProperty { .. } => {
                InterfaceType::Properties
            }
            _ => InterfaceType::Datastream,
        }
    }

    pub fn aggregation(&self) -> Aggregation {
        match self.kind {
            InterfaceKind::DeviceDatastreamObject { .. }
            | InterfaceKind::ServerDatastreamObject { .. } => Aggregation::Object,
            _ => Aggregation::Individual,
        }
    }

    pub fn is_property(&self) -> bool {
        self.interface_type() == InterfaceType::Properties
    }

    /// Storage handle, present on property interfaces only.
    pub fn property_store(&self) -> Option<&Arc<dyn PropertyStore>> {
        match &self.kind {
            InterfaceKind::DeviceProperty { storage } | InterfaceKind::ServerProperty { storage } => {
                Some(storage)
            }
            _ => None,
        }
    }

    /// Find the mapping matching `path`.
    ///
    /// Templates are tried in descriptor order and the first match wins, so
    /// resolution is deterministic even when templates overlap.
    pub fn mapping_for(&self, path: &str) -> Result<&EndpointMapping, InterfaceError> {
        self.mappings
            .iter()
            .find(|mapping| mapping.matches(path))
            .ok_or_else(|| InterfaceError::MappingNotFound {
                interface: self.name.clone(),
                path: path.to_string(),
            })
    }

    /// Validate an individual value against the mapping matched by `path`.
    ///
    /// Returns the matched mapping so callers can read its delivery policy
    /// without resolving twice.
    pub fn validate(
        &self,
        path: &str,
        value: &DataValue,
        timestamp: Option<&DateTime<Utc>>,
    ) -> Result<&EndpointMapping, InterfaceError> {
        let mapping = self.mapping_for(path)?;
        mapping.validate(path, value, timestamp)?;
        Ok(mapping)
    }

    /// Validate an aggregate publish rooted at `base_path`.
    ///
    /// Each entry key names one extra path segment under the base; every
    /// entry must resolve to a mapping and type-check. The timestamp rule is
    /// owned by the aggregate as a whole, not by individual entries. Returns
    /// the delivery policy for the aggregate, taken from the interface's
    /// first mapping.
    pub fn validate_object(
        &self,
        base_path: &str,
        values: &HashMap<String, DataValue>,
        timestamp: Option<&DateTime<Utc>>,
    ) -> Result<Reliability, InterfaceError> {
        if values.is_empty() {
            return Err(InterfaceError::InvalidValue {
                path: base_path.to_string(),
                reason: ValueError::EmptyObject,
            });
        }
        let explicit = match &self.kind {
            InterfaceKind::DeviceDatastreamObject { explicit_timestamp }
            | InterfaceKind::ServerDatastreamObject { explicit_timestamp } => *explicit_timestamp,
            _ => false,
        };
        if explicit && timestamp.is_none() {
            return Err(InterfaceError::InvalidValue {
                path: base_path.to_string(),
                reason: ValueError::TimestampRequired,
            });
        }
        let base = base_path.trim_end_matches('/');
        for (key, value) in values {
            let path = format!("{base}/{key}");
            let mapping = self.mapping_for(&path)?;
            mapping.validate_value(&path, value)?;
        }
        Ok(self
            .mappings
            .first()
            .map(|mapping| mapping.reliability())
            .unwrap_or_default())
    }
}

/// Aggregate interfaces adopt the flag of the first mapping that declares it.
fn aggregate_explicit_timestamp(mappings: &[MappingDescriptor]) -> bool {
    mappings
        .iter()
        .find_map(|mapping| mapping.explicit_timestamp)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;

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

    fn storage() -> Arc<dyn PropertyStore> {
        Arc::new(NullStore)
    }

    fn datastream(aggregation: &str, mappings: &str) -> Interface {
        let json = format!(
            r#"{{
                "interface_name": "org.example.Test",
                "version_major": 0,
                "version_minor": 1,
                "type": "datastream",
                "ownership": "device",
                "aggregation": "{aggregation}",
                "mappings": {mappings}
            }}"#
        );
        Interface::from_json(&json, storage()).unwrap()
    }

    #[test]
    fn first_matching_template_wins() {
        let interface = datastream(
            "individual",
            r#"[
                {"endpoint": "/kitchen/value", "type": "double"},
                {"endpoint": "/%{room}/value", "type": "integer"}
            ]"#,
        );
        let fixed = interface.mapping_for("/kitchen/value").unwrap();
        assert_eq!(fixed.endpoint(), "/kitchen/value");
        let parametric = interface.mapping_for("/bedroom/value").unwrap();
        assert_eq!(parametric.endpoint(), "/%{room}/value");
    }

    #[test]
    fn unmatched_paths_name_interface_and_path() {
        let interface = datastream("individual", r#"[{"endpoint": "/value", "type": "double"}]"#);
        let err = interface.mapping_for("/other").unwrap_err();
        assert_eq!(
            err,
            InterfaceError::MappingNotFound {
                interface: "org.example.Test".to_string(),
                path: "/other".to_string(),
            }
        );
    }

    #[test]
    fn validate_reports_expected_and_actual_types() {
        let interface = datastream("individual", r#"[{"endpoint": "/value", "type": "double"}]"#);
        let err = interface
            .validate("/value", &DataValue::from(3_i32), None)
            .unwrap_err();
        assert_eq!(
            err,
            InterfaceError::InvalidValue {
                path: "/value".to_string(),
                reason: ValueError::TypeMismatch {
                    expected: crate::types::MappingType::Double,
                    actual: crate::types::MappingType::Integer,
                },
            }
        );
    }

    #[test]
    fn aggregate_timestamp_comes_from_first_declaring_mapping() {
        let interface = datastream(
            "object",
            r#"[
                {"endpoint": "/group/a", "type": "double"},
                {"endpoint": "/group/b", "type": "double", "explicit_timestamp": true}
            ]"#,
        );
        match interface.kind() {
            InterfaceKind::DeviceDatastreamObject { explicit_timestamp } => {
                assert!(*explicit_timestamp)
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn aggregate_without_declarations_defaults_to_false() {
        let interface = datastream("object", r#"[{"endpoint": "/group/a", "type": "double"}]"#);
        match interface.kind() {
            InterfaceKind::DeviceDatastreamObject { explicit_timestamp } => {
                assert!(!explicit_timestamp)
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn validate_object_checks_every_entry() {
        let interface = datastream(
            "object",
            r#"[
                {"endpoint": "/group/a", "type": "double"},
                {"endpoint": "/group/b", "type": "string"}
            ]"#,
        );
        let mut values = HashMap::new();
        values.insert("a".to_string(), DataValue::from(1.0));
        values.insert("b".to_string(), DataValue::from("ok"));
        assert!(interface.validate_object("/group", &values, None).is_ok());

        values.insert("c".to_string(), DataValue::from(2.0));
        let err = interface.validate_object("/group", &values, None).unwrap_err();
        assert!(matches!(err, InterfaceError::MappingNotFound { .. }));
    }

    #[test]
    fn validate_object_rejects_empty_payloads() {
        let interface = datastream("object", r#"[{"endpoint": "/group/a", "type": "double"}]"#);
        let err = interface
            .validate_object("/group", &HashMap::new(), None)
            .unwrap_err();
        assert_eq!(
            err,
            InterfaceError::InvalidValue {
                path: "/group".to_string(),
                reason: ValueError::EmptyObject,
            }
        );
    }
}
