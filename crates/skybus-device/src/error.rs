//! Device-level errors.

use skybus_identity::IdentityError;
use skybus_interfaces::{InterfaceError, StoreError};
use skybus_transport::TransportError;
use thiserror::Error;

/// Union of everything that can go wrong at the device facade.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The builder was missing or given unusable settings.
    #[error("device configuration: {0}")]
    Config(String),
    /// An operation referenced an interface that is not installed.
    #[error("interface {0} is not registered")]
    InterfaceNotRegistered(String),
    /// The interface exists but its family does not allow the operation.
    #[error("interface {interface} does not support {operation}")]
    UnsupportedOperation {
        interface: String,
        operation: &'static str,
    },
    /// The pairing service failed to provision a certificate.
    #[error("pairing: {0}")]
    Pairing(String),
    #[error(transparent)]
    Interface(#[from] InterfaceError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
}
