//! Serde model for interface descriptor JSON.
//!
//! Descriptors are the portable contract format: a name, a two-part version,
//! the (type, ownership, aggregation) triple and an ordered list of endpoint
//! mappings. Parsing is tolerant of fields this crate does not model; the
//! semantic checks live in [`crate::interface::Interface::from_descriptor`].

use crate::error::InterfaceError;
use crate::types::{MappingType, Reliability, Retention};
use serde::{Deserialize, Serialize};

/// Whether an interface carries persistent properties or a stream of events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceType {
    Properties,
    Datastream,
}

/// Which side of the link produces values on an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ownership {
    Device,
    Server,
}

/// How datastream values are published: one path at a time or as one object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    #[default]
    Individual,
    Object,
}

/// Parsed form of one descriptor mapping entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingDescriptor {
    /// Endpoint template, absolute and `/`-separated. Segments written
    /// `%{name}` are parametric and match any single path segment.
    pub endpoint: String,
    #[serde(rename = "type")]
    pub mapping_type: MappingType,
    #[serde(default)]
    pub reliability: Reliability,
    #[serde(default)]
    pub retention: Retention,
    /// Seconds before an unsent retained value lapses; 0 means never.
    #[serde(default)]
    pub expiry: u64,
    /// `None` when the descriptor does not declare the flag.
    #[serde(default)]
    pub explicit_timestamp: Option<bool>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub doc: Option<String>,
}

/// Parsed form of a whole interface descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceDescriptor {
    pub interface_name: String,
    pub version_major: i32,
    pub version_minor: i32,
    #[serde(rename = "type")]
    pub interface_type: InterfaceType,
    pub ownership: Ownership,
    #[serde(default)]
    pub aggregation: Aggregation,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub doc: Option<String>,
    #[serde(default)]
    pub mappings: Vec<MappingDescriptor>,
}

impl InterfaceDescriptor {
    /// Parse descriptor JSON.
    ///
    /// Empty input and malformed JSON both fail with
    /// [`InterfaceError::InvalidDescriptor`]; unknown fields are ignored.
    pub fn from_json(text: &str) -> Result<Self, InterfaceError> {
        if text.trim().is_empty() {
            return Err(InterfaceError::InvalidDescriptor(
                "descriptor is empty".to_string(),
            ));
        }
        serde_json::from_str(text).map_err(|err| InterfaceError::InvalidDescriptor(err.to_string()))
    }
}
