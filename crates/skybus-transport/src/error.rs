//! Transport errors.

use rumqttc::ConnectReturnCode;
use skybus_interfaces::InterfaceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    /// The broker answered the connect with a refusal code.
    #[error("connection refused by broker: {0:?}")]
    ConnectionRefused(ConnectReturnCode),
    /// A request to the local MQTT client failed.
    #[error("mqtt client error: {0}")]
    Client(#[from] rumqttc::ClientError),
    /// The network connection failed or dropped.
    #[error("mqtt connection error: {0}")]
    Connection(#[from] rumqttc::ConnectionError),
    /// No open link.
    #[error("transport is not connected")]
    NotConnected,
    /// The link is open but the session handshake has not completed.
    #[error("session handshake has not completed")]
    NotReady,
    /// The broker endpoint could not be parsed or used.
    #[error("invalid broker endpoint: {0}")]
    Endpoint(String),
    /// TLS material could not be assembled.
    #[error("tls configuration: {0}")]
    Tls(String),
    /// A payload could not be encoded.
    #[error("payload encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
    /// Validation rejected the publish before any wire traffic.
    #[error(transparent)]
    Validation(#[from] InterfaceError),
}
