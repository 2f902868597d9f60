//! Link abstraction over the concrete MQTT client.

use crate::config::ConnectionConfig;
use crate::error::TransportError;
use async_trait::async_trait;
use rumqttc::QoS;

/// One logical connection to the broker.
///
/// A link is single-shot: once its connection drops it is discarded and the
/// session asks its factory for a fresh one. Keeping the session separate
/// from the link keeps the state machine testable without a broker.
#[async_trait]
pub trait TransportLink: Send {
    /// Open the connection and wait until the broker accepts it.
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Publish one message.
    async fn publish(
        &mut self,
        topic: &str,
        qos: QoS,
        retain: bool,
        payload: Vec<u8>,
    ) -> Result<(), TransportError>;

    /// Close the connection. Tolerant of a connection already gone.
    async fn disconnect(&mut self) -> Result<(), TransportError>;

    /// Whether the connection is currently believed open.
    fn is_connected(&self) -> bool;
}

/// Produces fresh links for a session.
pub trait LinkFactory: Send + Sync {
    fn create(&self, config: &ConnectionConfig) -> Box<dyn TransportLink>;
}
