//! Endpoint templates and per-mapping payload validation.

use crate::descriptor::MappingDescriptor;
use crate::error::{InterfaceError, ValueError};
use crate::types::{DataValue, MappingType, Reliability, Retention};
use chrono::{DateTime, Utc};

/// One endpoint of an interface with its declared type and delivery policy.
#[derive(Debug, Clone)]
pub struct EndpointMapping {
    endpoint: String,
    mapping_type: MappingType,
    reliability: Reliability,
    retention: Retention,
    expiry: u64,
    explicit_timestamp: bool,
}

impl EndpointMapping {
    /// Build a datastream mapping, honouring the descriptor's delivery policy.
    pub(crate) fn for_datastream(descriptor: &MappingDescriptor) -> Self {
        Self {
            endpoint: descriptor.endpoint.clone(),
            mapping_type: descriptor.mapping_type,
            reliability: descriptor.reliability,
            retention: descriptor.retention,
            expiry: descriptor.expiry,
            explicit_timestamp: descriptor.explicit_timestamp.unwrap_or(false),
        }
    }

    /// Build a property mapping.
    ///
    /// Properties always use the default delivery policy; any datastream
    /// fields present in the descriptor entry are ignored.
    pub(crate) fn for_property(descriptor: &MappingDescriptor) -> Self {
        Self {
            endpoint: descriptor.endpoint.clone(),
            mapping_type: descriptor.mapping_type,
            reliability: Reliability::default(),
            retention: Retention::default(),
            expiry: 0,
            explicit_timestamp: false,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn mapping_type(&self) -> MappingType {
        self.mapping_type
    }

    pub fn reliability(&self) -> Reliability {
        self.reliability
    }

    pub fn retention(&self) -> Retention {
        self.retention
    }

    pub fn expiry(&self) -> u64 {
        self.expiry
    }

    pub fn explicit_timestamp(&self) -> bool {
        self.explicit_timestamp
    }

    /// Whether `path` matches this endpoint template.
    ///
    /// Both sides are split on `/`; segment counts must agree and every
    /// non-parametric template segment must equal its path segment exactly.
    pub fn matches(&self, path: &str) -> bool {
        let template: Vec<&str> = self.endpoint.split('/').collect();
        let candidate: Vec<&str> = path.split('/').collect();
        if template.len() != candidate.len() {
            return false;
        }
        template
            .iter()
            .zip(&candidate)
            .all(|(segment, value)| segment.contains("%{") || segment == value)
    }

    /// Whether some concrete path could match both templates.
    pub fn overlaps(&self, other: &EndpointMapping) -> bool {
        let ours: Vec<&str> = self.endpoint.split('/').collect();
        let theirs: Vec<&str> = other.endpoint.split('/').collect();
        ours.len() == theirs.len()
            && ours
                .iter()
                .zip(&theirs)
                .all(|(a, b)| a.contains("%{") || b.contains("%{") || a == b)
    }

    /// Check the value's type against the declared type.
    ///
    /// Types must be equal: scalars never satisfy array mappings and doubles
    /// must be finite.
    pub fn validate_value(&self, path: &str, value: &DataValue) -> Result<(), InterfaceError> {
        let actual = value.mapping_type();
        if actual != self.mapping_type {
            return Err(InterfaceError::InvalidValue {
                path: path.to_string(),
                reason: ValueError::TypeMismatch {
                    expected: self.mapping_type,
                    actual,
                },
            });
        }
        if !value.is_finite() {
            return Err(InterfaceError::InvalidValue {
                path: path.to_string(),
                reason: ValueError::NotFinite,
            });
        }
        Ok(())
    }

    /// Check a value and its timestamp for an individual publish.
    pub fn validate(
        &self,
        path: &str,
        value: &DataValue,
        timestamp: Option<&DateTime<Utc>>,
    ) -> Result<(), InterfaceError> {
        self.validate_value(path, value)?;
        if self.explicit_timestamp && timestamp.is_none() {
            return Err(InterfaceError::InvalidValue {
                path: path.to_string(),
                reason: ValueError::TimestampRequired,
            });
        }
        Ok(())
    }
}
