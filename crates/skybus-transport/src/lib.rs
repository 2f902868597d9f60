//! Transport session for SkyBus devices.
//!
//! The session is a small state machine over one MQTT link: connect, run the
//! handshake (advertise installed interfaces, then ask the platform to drop
//! its cached view), and only then let application data flow. Validation
//! always runs before wire traffic, and the QoS of every data publish is
//! derived from the mapping it targets.
//!
//! The concrete MQTT client sits behind [`link::TransportLink`], so the state
//! machine is exercised in tests with an in-memory link and in production
//! with the rumqttc-backed one from [`mqtt`].

pub mod config;
pub mod error;
pub mod link;
pub mod mqtt;
pub mod session;

pub use config::ConnectionConfig;
pub use error::TransportError;
pub use link::{LinkFactory, TransportLink};
pub use mqtt::{MqttLink, MqttLinkFactory};
pub use session::{qos_for, Session, SessionState};
