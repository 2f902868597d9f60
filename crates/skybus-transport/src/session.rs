//! The connection state machine.
//!
//! A session owns one link at a time and walks it through the lifecycle:
//! open the connection, run the handshake (introspection, then the cache
//! purge request), and only then allow application publishes. The handshake
//! runs once per connection; if its publishes fail the link stays open and
//! the next `connect` retries the whole handshake, never half of it.

use crate::config::ConnectionConfig;
use crate::error::TransportError;
use crate::link::{LinkFactory, TransportLink};
use crate::mqtt::MqttLinkFactory;
use chrono::{DateTime, Utc};
use rumqttc::QoS;
use serde_json::json;
use skybus_interfaces::{encode_timestamp, DataValue, Interface, InterfaceRegistry, Reliability};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No usable link.
    Disconnected,
    /// A link is being opened.
    Connecting,
    /// The link is open but the handshake has not completed.
    HandshakePending,
    /// Handshake done; application publishes are allowed.
    Ready,
}

/// Map a mapping's delivery guarantee onto MQTT delivery.
pub fn qos_for(reliability: Reliability) -> QoS {
    match reliability {
        Reliability::Unreliable => QoS::AtMostOnce,
        Reliability::Guaranteed => QoS::AtLeastOnce,
        Reliability::Unique => QoS::ExactlyOnce,
    }
}

/// One device's connection to the platform.
///
/// Methods take `&mut self`; callers that share a session across tasks wrap
/// it in a mutex, which serializes publishes against the handshake without
/// the session holding any lock of its own.
pub struct Session {
    config: ConnectionConfig,
    registry: Arc<InterfaceRegistry>,
    factory: Box<dyn LinkFactory>,
    link: Option<Box<dyn TransportLink>>,
    state: SessionState,
}

impl Session {
    /// Session over the default MQTT link.
    pub fn new(config: ConnectionConfig, registry: Arc<InterfaceRegistry>) -> Self {
        Self::with_link_factory(config, registry, Box::new(MqttLinkFactory))
    }

    /// Session over a caller-supplied link factory.
    pub fn with_link_factory(
        config: ConnectionConfig,
        registry: Arc<InterfaceRegistry>,
        factory: Box<dyn LinkFactory>,
    ) -> Self {
        Self {
            config,
            registry,
            factory,
            link: None,
            state: SessionState::Disconnected,
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Swap in refreshed TLS client material for future links.
    ///
    /// A link already open keeps its old material until recreated.
    pub fn set_client_tls(
        &mut self,
        certificate_pem: impl Into<String>,
        key_pem: impl Into<String>,
    ) {
        self.config.set_client_tls(certificate_pem, key_pem);
    }

    /// Effective state. A session whose link died reports `Disconnected`
    /// no matter what the last transition said.
    pub fn state(&self) -> SessionState {
        match self.state {
            SessionState::Disconnected => SessionState::Disconnected,
            state if self.is_connected() => state,
            _ => SessionState::Disconnected,
        }
    }

    /// Whether the underlying link is open, handshake or not.
    pub fn is_connected(&self) -> bool {
        self.link.as_ref().is_some_and(|link| link.is_connected())
    }

    /// Bring the session to [`SessionState::Ready`].
    ///
    /// A session that is already `Ready` on a live link returns without any
    /// wire traffic. A live link whose handshake never completed redoes the
    /// whole handshake. Otherwise a fresh link is opened first. A failed
    /// handshake leaves the link open and the state at `HandshakePending`.
    pub async fn connect(&mut self) -> Result<(), TransportError> {
        if self.is_connected() {
            if self.state == SessionState::Ready {
                debug!("already connected, nothing to do");
                return Ok(());
            }
            self.handshake().await?;
            self.state = SessionState::Ready;
            return Ok(());
        }

        self.state = SessionState::Connecting;
        let mut link = self.factory.create(&self.config);
        if let Err(err) = link.connect().await {
            self.state = SessionState::Disconnected;
            self.link = None;
            return Err(err);
        }
        info!(client_id = %self.config.client_id(), "transport connected");
        self.link = Some(link);
        self.state = SessionState::HandshakePending;
        self.handshake().await?;
        self.state = SessionState::Ready;
        Ok(())
    }

    /// Close the link and return to [`SessionState::Disconnected`].
    ///
    /// Safe in any state; close failures are logged rather than returned
    /// because the session abandons the link either way.
    pub async fn disconnect(&mut self) {
        if let Some(mut link) = self.link.take() {
            if link.is_connected() {
                if let Err(err) = link.disconnect().await {
                    warn!(error = %err, "link close failed");
                }
            }
            info!("transport disconnected");
        }
        self.state = SessionState::Disconnected;
    }

    /// Publish one value on an individual mapping.
    ///
    /// Validation happens before any wire traffic. Delivery uses the QoS
    /// mapped from the mapping's reliability; nothing is ever retained.
    pub async fn publish(
        &mut self,
        interface: &Interface,
        path: &str,
        value: &DataValue,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<(), TransportError> {
        let mapping = interface.validate(path, value, timestamp.as_ref())?;
        let qos = qos_for(mapping.reliability());
        let payload = individual_payload(value, timestamp.as_ref())?;
        let topic = self.data_topic(interface, path);
        self.publish_ready(&topic, qos, payload).await
    }

    /// Publish an aggregate object rooted at `base_path`.
    pub async fn publish_object(
        &mut self,
        interface: &Interface,
        base_path: &str,
        values: &HashMap<String, DataValue>,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<(), TransportError> {
        let reliability = interface.validate_object(base_path, values, timestamp.as_ref())?;
        let payload = object_payload(values, timestamp.as_ref())?;
        let topic = self.data_topic(interface, base_path);
        self.publish_ready(&topic, qos_for(reliability), payload).await
    }

    /// Publish the zero-byte unset marker for a property path.
    ///
    /// The path must still resolve to a mapping; unsetting an unknown path
    /// is rejected like any other publish.
    pub async fn publish_unset(
        &mut self,
        interface: &Interface,
        path: &str,
    ) -> Result<(), TransportError> {
        let mapping = interface.mapping_for(path)?;
        let qos = qos_for(mapping.reliability());
        let topic = self.data_topic(interface, path);
        self.publish_ready(&topic, qos, Vec::new()).await
    }

    /// Re-advertise the installed interfaces on a live session.
    ///
    /// Used after the installed set changes while connected; the session
    /// state is untouched.
    pub async fn send_introspection(&mut self) -> Result<(), TransportError> {
        let introspection = self.registry.introspection_string();
        debug!(%introspection, "refreshing introspection");
        let topic = self.config.client_id();
        self.publish_ready(&topic, QoS::ExactlyOnce, introspection.into_bytes())
            .await
    }

    /// Advertise the installed interfaces, then ask the platform to drop its
    /// cached view of this device. Both control publishes use exactly-once
    /// delivery and no retain.
    async fn handshake(&mut self) -> Result<(), TransportError> {
        let root = self.config.client_id();
        let introspection = self.registry.introspection_string();
        let link = self.link.as_mut().ok_or(TransportError::NotConnected)?;
        debug!(%introspection, "sending introspection");
        link.publish(&root, QoS::ExactlyOnce, false, introspection.into_bytes())
            .await?;
        link.publish(
            &format!("{root}/control/emptyCache"),
            QoS::ExactlyOnce,
            false,
            b"1".to_vec(),
        )
        .await?;
        info!("session handshake complete");
        Ok(())
    }

    /// State gate shared by every application publish.
    async fn publish_ready(
        &mut self,
        topic: &str,
        qos: QoS,
        payload: Vec<u8>,
    ) -> Result<(), TransportError> {
        match self.state {
            SessionState::Ready => {}
            SessionState::Connecting | SessionState::HandshakePending => {
                return Err(TransportError::NotReady);
            }
            SessionState::Disconnected => return Err(TransportError::NotConnected),
        }
        let link = self.link.as_mut().ok_or(TransportError::NotConnected)?;
        if !link.is_connected() {
            self.state = SessionState::Disconnected;
            return Err(TransportError::NotConnected);
        }
        link.publish(topic, qos, false, payload).await
    }

    fn data_topic(&self, interface: &Interface, path: &str) -> String {
        format!("{}/{}{}", self.config.client_id(), interface.name(), path)
    }
}

/// Wire encoding of an individual value: `{"v": ...}`, plus `"t"` when a
/// timestamp accompanies it.
fn individual_payload(
    value: &DataValue,
    timestamp: Option<&DateTime<Utc>>,
) -> Result<Vec<u8>, TransportError> {
    let mut body = serde_json::Map::new();
    body.insert("v".to_string(), value.to_json());
    if let Some(at) = timestamp {
        body.insert("t".to_string(), json!(encode_timestamp(at)));
    }
    Ok(serde_json::to_vec(&serde_json::Value::Object(body))?)
}

/// Wire encoding of an aggregate: `{"v": {key: value, ...}}`, plus `"t"`.
fn object_payload(
    values: &HashMap<String, DataValue>,
    timestamp: Option<&DateTime<Utc>>,
) -> Result<Vec<u8>, TransportError> {
    let mut object = serde_json::Map::new();
    for (key, value) in values {
        object.insert(key.clone(), value.to_json());
    }
    let mut body = serde_json::Map::new();
    body.insert("v".to_string(), serde_json::Value::Object(object));
    if let Some(at) = timestamp {
        body.insert("t".to_string(), json!(encode_timestamp(at)));
    }
    Ok(serde_json::to_vec(&serde_json::Value::Object(body))?)
}
