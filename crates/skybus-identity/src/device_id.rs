//! Stable device identity derivation.

use uuid::Uuid;

/// Derive a device id from a namespace and a hardware identifier.
///
/// The id is a name-based UUID (version 5) over the namespace and the
/// hardware id bytes. The same pair always yields the same id, so a
/// re-provisioned device keeps its identity as long as its hardware
/// identifier (typically a MAC address or serial number) is stable.
pub fn derive_device_id(namespace: Uuid, hardware_id: &str) -> String {
    Uuid::new_v5(&namespace, hardware_id.as_bytes()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_inputs_same_id() {
        let ns = Uuid::parse_str("f79ad91f-c638-4889-ae74-9d001a3b4cf8").unwrap();
        let a = derive_device_id(ns, "00:11:22:33:44:55");
        let b = derive_device_id(ns, "00:11:22:33:44:55");
        assert_eq!(a, b);
    }

    #[test]
    fn id_depends_on_both_inputs() {
        let ns = Uuid::parse_str("f79ad91f-c638-4889-ae74-9d001a3b4cf8").unwrap();
        let other_ns = Uuid::parse_str("b068931c-c450-342b-a3f5-b3d276ea4297").unwrap();
        let base = derive_device_id(ns, "00:11:22:33:44:55");
        assert_ne!(base, derive_device_id(ns, "00:11:22:33:44:56"));
        assert_ne!(base, derive_device_id(other_ns, "00:11:22:33:44:55"));
    }

    #[test]
    fn id_parses_back_as_a_uuid() {
        let ns = Uuid::parse_str("f79ad91f-c638-4889-ae74-9d001a3b4cf8").unwrap();
        let id = derive_device_id(ns, "device-007");
        assert!(Uuid::parse_str(&id).is_ok());
    }
}
