//! In-memory property store.

use skybus_interfaces::{DataValue, PropertyStore, StoreError};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Keeps property values for the lifetime of the process.
///
/// This is the default store a device is built with. Deployments that need
/// values to survive restarts plug in their own [`PropertyStore`] instead.
#[derive(Debug, Default)]
pub struct MemoryPropertyStore {
    values: Mutex<HashMap<String, DataValue>>,
}

impl MemoryPropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, DataValue>>, StoreError> {
        self.values
            .lock()
            .map_err(|_| StoreError("property store lock poisoned".to_string()))
    }
}

impl PropertyStore for MemoryPropertyStore {
    fn put(&self, key: &str, value: &DataValue) -> Result<(), StoreError> {
        self.lock()?.insert(key.to_string(), value.clone());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<DataValue>, StoreError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_delete() {
        let store = MemoryPropertyStore::new();
        let key = "org.example.Props/enabled";
        assert_eq!(store.get(key).unwrap(), None);

        store.put(key, &DataValue::from(true)).unwrap();
        assert_eq!(store.get(key).unwrap(), Some(DataValue::from(true)));

        store.put(key, &DataValue::from(false)).unwrap();
        assert_eq!(store.get(key).unwrap(), Some(DataValue::from(false)));

        store.delete(key).unwrap();
        assert_eq!(store.get(key).unwrap(), None);
        store.delete(key).unwrap();
    }
}
