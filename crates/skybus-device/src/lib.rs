//! Device-side entry point: one [`Device`] handle tying together the
//! interface registry, the MQTT session and the credential store.
//!
//! Typical lifecycle: build a device, provision a certificate through a
//! [`PairingService`], register interface descriptors, connect, then stream
//! datastream values and set or unset properties. The handle clones cheaply
//! and is safe to share across tasks.

pub mod device;
pub mod error;
pub mod pairing;
pub mod property;

pub use device::{Device, DeviceBuilder};
pub use error::DeviceError;
pub use pairing::PairingService;
pub use property::MemoryPropertyStore;

// Re-export the pieces callers need alongside the facade.
pub use skybus_identity::derive_device_id;
pub use skybus_interfaces::{
    DataValue, Interface, InterfaceDescriptor, InterfaceRegistry, PropertyStore,
};
pub use skybus_transport::SessionState;
