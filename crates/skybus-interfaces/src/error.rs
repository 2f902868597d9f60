//! Errors raised while parsing descriptors or validating payloads.

use crate::types::MappingType;
use thiserror::Error;

/// Reason a payload value was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// The value's type does not match the mapping's declared type.
    #[error("{expected} expected, {actual} found")]
    TypeMismatch {
        expected: MappingType,
        actual: MappingType,
    },
    /// A double carried NaN or an infinity.
    #[error("value must be finite")]
    NotFinite,
    /// The mapping declares explicit timestamps and none was supplied.
    #[error("an explicit timestamp is required")]
    TimestampRequired,
    /// An aggregate publish carried no entries.
    #[error("aggregate carries no values")]
    EmptyObject,
}

/// Errors from descriptor parsing, path resolution and payload validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterfaceError {
    /// Descriptor text was empty, unparseable or semantically impossible.
    #[error("invalid interface descriptor: {0}")]
    InvalidDescriptor(String),
    /// No endpoint of the interface matches the path.
    #[error("no mapping on {interface} matches path {path}")]
    MappingNotFound { interface: String, path: String },
    /// A payload value does not fit the matched mapping.
    #[error("invalid value for {path}: {reason}")]
    InvalidValue { path: String, reason: ValueError },
}
