//! Persistence seam for property interfaces.
//!
//! The registry never reads or writes storage itself. Property interfaces
//! only carry the handle so the device layer can persist a reported value
//! next to the publish that reported it, and drop it again on unset. Backends
//! decide durability; an in-memory map and an on-disk store are equally valid.

use crate::types::DataValue;
use thiserror::Error;

/// Error raised by a property store backend.
#[derive(Debug, Clone, Error)]
#[error("property store: {0}")]
pub struct StoreError(pub String);

/// Key/value storage for the last sent value of each property path.
///
/// Keys are `<interface name><path>`, e.g. `org.example.Props/enabled`.
pub trait PropertyStore: Send + Sync {
    /// Persist the last sent value for `key`, replacing any previous one.
    fn put(&self, key: &str, value: &DataValue) -> Result<(), StoreError>;

    /// Last persisted value for `key`.
    fn get(&self, key: &str) -> Result<Option<DataValue>, StoreError>;

    /// Forget `key`. Unknown keys are not an error.
    fn delete(&self, key: &str) -> Result<(), StoreError>;
}
