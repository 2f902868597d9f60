//! The device facade.

use crate::error::DeviceError;
use crate::pairing::PairingService;
use crate::property::MemoryPropertyStore;
use chrono::{DateTime, Utc};
use skybus_identity::{certificate_to_pem, generate_csr, import_certificate, CryptoStore};
use skybus_interfaces::{
    DataValue, Interface, InterfaceDescriptor, InterfaceKind, InterfaceRegistry, PropertyStore,
};
use skybus_transport::{ConnectionConfig, LinkFactory, Session, SessionState};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

/// A device: its identity, its installed interfaces and one shared session.
///
/// Cloning is cheap and every clone talks to the same session. Session
/// access goes through one mutex, so concurrent publishes from different
/// tasks serialize behind the connect handshake instead of racing it.
#[derive(Clone)]
pub struct Device {
    realm: String,
    device_id: String,
    registry: Arc<InterfaceRegistry>,
    session: Arc<Mutex<Session>>,
    crypto: CryptoStore,
    property_store: Arc<dyn PropertyStore>,
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("realm", &self.realm)
            .field("device_id", &self.device_id)
            .finish_non_exhaustive()
    }
}

impl Device {
    pub fn builder() -> DeviceBuilder {
        DeviceBuilder::default()
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn registry(&self) -> &Arc<InterfaceRegistry> {
        &self.registry
    }

    pub fn crypto_store(&self) -> &CryptoStore {
        &self.crypto
    }

    /// Install an interface from descriptor JSON.
    ///
    /// On a ready session the refreshed introspection is pushed right away;
    /// otherwise the next handshake advertises it.
    pub async fn register_interface(&self, descriptor_json: &str) -> Result<(), DeviceError> {
        let interface = Interface::from_json(descriptor_json, self.property_store.clone())?;
        self.install(interface).await
    }

    /// Install an interface from an already parsed descriptor.
    pub async fn register_interface_descriptor(
        &self,
        descriptor: &InterfaceDescriptor,
    ) -> Result<(), DeviceError> {
        let interface = Interface::from_descriptor(descriptor, self.property_store.clone())?;
        self.install(interface).await
    }

    async fn install(&self, interface: Interface) -> Result<(), DeviceError> {
        let name = interface.name().to_string();
        self.registry.register(interface);
        debug!(interface = %name, "interface installed");
        let mut session = self.session.lock().await;
        if session.state() == SessionState::Ready {
            session.send_introspection().await?;
        }
        Ok(())
    }

    /// Remove an installed interface.
    pub async fn unregister_interface(&self, name: &str) -> Result<(), DeviceError> {
        if self.registry.unregister(name).is_none() {
            return Err(DeviceError::InterfaceNotRegistered(name.to_string()));
        }
        let mut session = self.session.lock().await;
        if session.state() == SessionState::Ready {
            session.send_introspection().await?;
        }
        Ok(())
    }

    /// Make sure an issued certificate is available, provisioning one
    /// through `pairing` on first need.
    ///
    /// An existing certificate short-circuits without touching the pairing
    /// service. Fresh material applies to links opened after this call.
    pub async fn ensure_certificate(
        &self,
        pairing: &dyn PairingService,
    ) -> Result<(), DeviceError> {
        if self.crypto.has_certificate() {
            debug!("device certificate already present");
            return Ok(());
        }
        let key = self.crypto.device_key()?;
        let csr = generate_csr(&key, &self.realm, &self.device_id)?;
        let issued = pairing.exchange_csr(&csr).await?;
        let certificate = import_certificate(&issued)?;
        let pem = certificate_to_pem(&certificate);
        self.crypto.store_certificate(&pem)?;
        let key_pem = self.crypto.device_key_pem()?;
        self.session.lock().await.set_client_tls(pem, key_pem);
        info!("device certificate provisioned");
        Ok(())
    }

    /// Connect and run the session handshake.
    pub async fn connect(&self) -> Result<(), DeviceError> {
        self.session.lock().await.connect().await?;
        Ok(())
    }

    /// Close the connection. Safe to call when already disconnected.
    pub async fn disconnect(&self) {
        self.session.lock().await.disconnect().await;
    }

    pub async fn is_connected(&self) -> bool {
        self.session.lock().await.is_connected()
    }

    pub async fn session_state(&self) -> SessionState {
        self.session.lock().await.state()
    }

    /// Send one value on an individual device-owned datastream.
    pub async fn stream(
        &self,
        interface_name: &str,
        path: &str,
        value: impl Into<DataValue>,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<(), DeviceError> {
        let interface = self.lookup(interface_name)?;
        expect_kind(&interface, "stream", |kind| {
            matches!(kind, InterfaceKind::DeviceDatastreamIndividual)
        })?;
        let value = value.into();
        self.session
            .lock()
            .await
            .publish(&interface, path, &value, timestamp)
            .await?;
        Ok(())
    }

    /// Send one aggregate on a device-owned object datastream.
    pub async fn stream_object(
        &self,
        interface_name: &str,
        base_path: &str,
        values: HashMap<String, DataValue>,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<(), DeviceError> {
        let interface = self.lookup(interface_name)?;
        expect_kind(&interface, "stream_object", |kind| {
            matches!(kind, InterfaceKind::DeviceDatastreamObject { .. })
        })?;
        self.session
            .lock()
            .await
            .publish_object(&interface, base_path, &values, timestamp)
            .await?;
        Ok(())
    }

    /// Set a device-owned property: publish the value, then persist it.
    pub async fn set_property(
        &self,
        interface_name: &str,
        path: &str,
        value: impl Into<DataValue>,
    ) -> Result<(), DeviceError> {
        let interface = self.lookup(interface_name)?;
        expect_kind(&interface, "set_property", |kind| {
            matches!(kind, InterfaceKind::DeviceProperty { .. })
        })?;
        let value = value.into();
        self.session
            .lock()
            .await
            .publish(&interface, path, &value, None)
            .await?;
        if let Some(store) = interface.property_store() {
            store.put(&property_key(interface.name(), path), &value)?;
        }
        Ok(())
    }

    /// Unset a device-owned property: publish the zero-byte marker, then
    /// drop the persisted value.
    pub async fn unset_property(
        &self,
        interface_name: &str,
        path: &str,
    ) -> Result<(), DeviceError> {
        let interface = self.lookup(interface_name)?;
        expect_kind(&interface, "unset_property", |kind| {
            matches!(kind, InterfaceKind::DeviceProperty { .. })
        })?;
        self.session
            .lock()
            .await
            .publish_unset(&interface, path)
            .await?;
        if let Some(store) = interface.property_store() {
            store.delete(&property_key(interface.name(), path))?;
        }
        Ok(())
    }

    /// Last persisted value for a property path, if any.
    pub fn property(
        &self,
        interface_name: &str,
        path: &str,
    ) -> Result<Option<DataValue>, DeviceError> {
        let interface = self.lookup(interface_name)?;
        expect_kind(&interface, "property", |kind| {
            matches!(
                kind,
                InterfaceKind::DeviceProperty { .. } | InterfaceKind::ServerProperty { .. }
            )
        })?;
        match interface.property_store() {
            Some(store) => Ok(store.get(&property_key(interface.name(), path))?),
            None => Ok(None),
        }
    }

    fn lookup(&self, name: &str) -> Result<Arc<Interface>, DeviceError> {
        self.registry
            .get(name)
            .ok_or_else(|| DeviceError::InterfaceNotRegistered(name.to_string()))
    }
}

fn expect_kind(
    interface: &Interface,
    operation: &'static str,
    accepts: fn(&InterfaceKind) -> bool,
) -> Result<(), DeviceError> {
    if accepts(interface.kind()) {
        Ok(())
    } else {
        Err(DeviceError::UnsupportedOperation {
            interface: interface.name().to_string(),
            operation,
        })
    }
}

fn property_key(interface: &str, path: &str) -> String {
    format!("{interface}{path}")
}

/// Builder for [`Device`].
#[derive(Default)]
pub struct DeviceBuilder {
    realm: Option<String>,
    device_id: Option<String>,
    hardware_id: Option<(Uuid, String)>,
    broker_url: Option<String>,
    store_dir: Option<PathBuf>,
    keep_alive: Option<Duration>,
    credentials: Option<(String, String)>,
    ca_certificate_pem: Option<String>,
    property_store: Option<Arc<dyn PropertyStore>>,
    link_factory: Option<Box<dyn LinkFactory>>,
}

impl DeviceBuilder {
    pub fn with_realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = Some(realm.into());
        self
    }

    /// Use an explicit device id.
    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    /// Derive the device id from a namespace and a hardware identifier;
    /// ignored when an explicit id is also given.
    pub fn with_device_id_from_hardware(
        mut self,
        namespace: Uuid,
        hardware_id: impl Into<String>,
    ) -> Self {
        self.hardware_id = Some((namespace, hardware_id.into()));
        self
    }

    pub fn with_broker_url(mut self, broker_url: impl Into<String>) -> Self {
        self.broker_url = Some(broker_url.into());
        self
    }

    /// Root directory for credentials; the device keeps its material under
    /// `<dir>/<device id>/crypto`.
    pub fn with_store_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.store_dir = Some(dir.into());
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = Some(keep_alive);
        self
    }

    /// Username/password pair for brokers that use password auth.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    /// CA bundle (PEM) trusted instead of the system roots.
    pub fn with_ca_certificate(mut self, ca_pem: impl Into<String>) -> Self {
        self.ca_certificate_pem = Some(ca_pem.into());
        self
    }

    /// Storage backend for property values; defaults to an in-memory store.
    pub fn with_property_store(mut self, store: Arc<dyn PropertyStore>) -> Self {
        self.property_store = Some(store);
        self
    }

    /// Replace the MQTT link with a custom one. Mostly a test seam.
    pub fn with_link_factory(mut self, factory: Box<dyn LinkFactory>) -> Self {
        self.link_factory = Some(factory);
        self
    }

    /// Assemble the device.
    ///
    /// Requires a realm, a broker URL, a store directory and either an
    /// explicit device id or a hardware id to derive one from. When the
    /// store already holds an issued certificate it becomes the session's
    /// TLS client material immediately.
    pub fn build(self) -> Result<Device, DeviceError> {
        let realm = self
            .realm
            .ok_or_else(|| DeviceError::Config("realm is required".into()))?;
        let broker_url = self
            .broker_url
            .ok_or_else(|| DeviceError::Config("broker url is required".into()))?;
        let store_dir = self
            .store_dir
            .ok_or_else(|| DeviceError::Config("store directory is required".into()))?;
        let device_id = match (self.device_id, self.hardware_id) {
            (Some(id), _) => id,
            (None, Some((namespace, hardware))) => {
                skybus_identity::derive_device_id(namespace, &hardware)
            }
            (None, None) => {
                return Err(DeviceError::Config(
                    "device id or hardware id is required".into(),
                ));
            }
        };

        let crypto = CryptoStore::open(store_dir.join(&device_id).join("crypto"))?;
        let mut connection = ConnectionConfig::new(&broker_url, &realm, &device_id)?;
        if let Some(keep_alive) = self.keep_alive {
            connection = connection.with_keep_alive(keep_alive);
        }
        if let Some((username, password)) = self.credentials {
            connection = connection.with_credentials(username, password);
        }
        if let Some(ca) = self.ca_certificate_pem {
            connection = connection.with_ca_certificate(ca);
        }
        if let Some(certificate) = crypto.certificate_pem()? {
            connection = connection.with_client_tls(certificate, crypto.device_key_pem()?);
        }

        let registry = Arc::new(InterfaceRegistry::new());
        let session = match self.link_factory {
            Some(factory) => Session::with_link_factory(connection, registry.clone(), factory),
            None => Session::new(connection, registry.clone()),
        };
        let property_store = self
            .property_store
            .unwrap_or_else(|| Arc::new(MemoryPropertyStore::new()));

        info!(realm = %realm, device_id = %device_id, "device assembled");
        Ok(Device {
            realm,
            device_id,
            registry,
            session: Arc::new(Mutex::new(session)),
            crypto,
            property_store,
        })
    }
}
