//! Value model for interface payloads.
//!
//! Every mapping declares one of fourteen wire types: seven scalars and their
//! array counterparts. [`DataValue`] is the owned in-memory form of a payload
//! travelling over a mapping, and [`MappingType`] names the declared type.
//! Scalar and array types never cross-match: an `integerarray` mapping rejects
//! a lone `integer` and vice versa.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire type declared by a mapping descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingType {
    String,
    Integer,
    Double,
    LongInteger,
    Boolean,
    BinaryBlob,
    DateTime,
    StringArray,
    IntegerArray,
    DoubleArray,
    LongIntegerArray,
    BooleanArray,
    BinaryBlobArray,
    DateTimeArray,
}

impl MappingType {
    /// Descriptor spelling of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            MappingType::String => "string",
            MappingType::Integer => "integer",
            MappingType::Double => "double",
            MappingType::LongInteger => "longinteger",
            MappingType::Boolean => "boolean",
            MappingType::BinaryBlob => "binaryblob",
            MappingType::DateTime => "datetime",
            MappingType::StringArray => "stringarray",
            MappingType::IntegerArray => "integerarray",
            MappingType::DoubleArray => "doublearray",
            MappingType::LongIntegerArray => "longintegerarray",
            MappingType::BooleanArray => "booleanarray",
            MappingType::BinaryBlobArray => "binaryblobarray",
            MappingType::DateTimeArray => "datetimearray",
        }
    }
}

impl fmt::Display for MappingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery guarantee requested by a datastream mapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reliability {
    /// Fire and forget.
    #[default]
    Unreliable,
    /// Delivered at least once.
    Guaranteed,
    /// Delivered exactly once.
    Unique,
}

/// What happens to datastream values that cannot be sent right away.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Retention {
    #[default]
    Discard,
    Volatile,
    Stored,
}

/// Owned payload value for a single mapping or one entry of an aggregate.
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    String(String),
    Integer(i32),
    Double(f64),
    LongInteger(i64),
    Boolean(bool),
    BinaryBlob(Vec<u8>),
    DateTime(DateTime<Utc>),
    StringArray(Vec<String>),
    IntegerArray(Vec<i32>),
    DoubleArray(Vec<f64>),
    LongIntegerArray(Vec<i64>),
    BooleanArray(Vec<bool>),
    BinaryBlobArray(Vec<Vec<u8>>),
    DateTimeArray(Vec<DateTime<Utc>>),
}

impl DataValue {
    /// Wire type this value carries.
    pub fn mapping_type(&self) -> MappingType {
        match self {
            DataValue::String(_) => MappingType::String,
            DataValue::Integer(_) => MappingType::Integer,
            DataValue::Double(_) => MappingType::Double,
            DataValue::LongInteger(_) => MappingType::LongInteger,
            DataValue::Boolean(_) => MappingType::Boolean,
            DataValue::BinaryBlob(_) => MappingType::BinaryBlob,
            DataValue::DateTime(_) => MappingType::DateTime,
            DataValue::StringArray(_) => MappingType::StringArray,
            DataValue::IntegerArray(_) => MappingType::IntegerArray,
            DataValue::DoubleArray(_) => MappingType::DoubleArray,
            DataValue::LongIntegerArray(_) => MappingType::LongIntegerArray,
            DataValue::BooleanArray(_) => MappingType::BooleanArray,
            DataValue::BinaryBlobArray(_) => MappingType::BinaryBlobArray,
            DataValue::DateTimeArray(_) => MappingType::DateTimeArray,
        }
    }

    /// Whether every floating point element is finite.
    ///
    /// Non-double values are trivially finite.
    pub fn is_finite(&self) -> bool {
        match self {
            DataValue::Double(v) => v.is_finite(),
            DataValue::DoubleArray(vs) => vs.iter().all(|v| v.is_finite()),
            _ => true,
        }
    }

    /// JSON form used in wire payloads.
    ///
    /// Binary blobs become base64 strings, timestamps RFC 3339 strings, and
    /// everything else the natural JSON scalar or array.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            DataValue::String(v) => Value::String(v.clone()),
            DataValue::Integer(v) => Value::from(*v),
            DataValue::Double(v) => Value::from(*v),
            DataValue::LongInteger(v) => Value::from(*v),
            DataValue::Boolean(v) => Value::from(*v),
            DataValue::BinaryBlob(v) => Value::String(BASE64.encode(v)),
            DataValue::DateTime(v) => Value::String(encode_timestamp(v)),
            DataValue::StringArray(vs) => vs.iter().cloned().map(Value::String).collect(),
            DataValue::IntegerArray(vs) => vs.iter().copied().map(Value::from).collect(),
            DataValue::DoubleArray(vs) => vs.iter().copied().map(Value::from).collect(),
            DataValue::LongIntegerArray(vs) => vs.iter().copied().map(Value::from).collect(),
            DataValue::BooleanArray(vs) => vs.iter().copied().map(Value::from).collect(),
            DataValue::BinaryBlobArray(vs) => {
                vs.iter().map(|v| Value::String(BASE64.encode(v))).collect()
            }
            DataValue::DateTimeArray(vs) => {
                vs.iter().map(|v| Value::String(encode_timestamp(v))).collect()
            }
        }
    }
}

/// RFC 3339 encoding used for timestamps everywhere on the wire.
pub fn encode_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl From<&str> for DataValue {
    fn from(v: &str) -> Self {
        DataValue::String(v.to_string())
    }
}

impl From<String> for DataValue {
    fn from(v: String) -> Self {
        DataValue::String(v)
    }
}

impl From<i32> for DataValue {
    fn from(v: i32) -> Self {
        DataValue::Integer(v)
    }
}

impl From<f64> for DataValue {
    fn from(v: f64) -> Self {
        DataValue::Double(v)
    }
}

impl From<i64> for DataValue {
    fn from(v: i64) -> Self {
        DataValue::LongInteger(v)
    }
}

impl From<bool> for DataValue {
    fn from(v: bool) -> Self {
        DataValue::Boolean(v)
    }
}

impl From<Vec<u8>> for DataValue {
    fn from(v: Vec<u8>) -> Self {
        DataValue::BinaryBlob(v)
    }
}

impl From<DateTime<Utc>> for DataValue {
    fn from(v: DateTime<Utc>) -> Self {
        DataValue::DateTime(v)
    }
}

impl From<Vec<String>> for DataValue {
    fn from(v: Vec<String>) -> Self {
        DataValue::StringArray(v)
    }
}

impl From<Vec<i32>> for DataValue {
    fn from(v: Vec<i32>) -> Self {
        DataValue::IntegerArray(v)
    }
}

impl From<Vec<f64>> for DataValue {
    fn from(v: Vec<f64>) -> Self {
        DataValue::DoubleArray(v)
    }
}

impl From<Vec<i64>> for DataValue {
    fn from(v: Vec<i64>) -> Self {
        DataValue::LongIntegerArray(v)
    }
}

impl From<Vec<bool>> for DataValue {
    fn from(v: Vec<bool>) -> Self {
        DataValue::BooleanArray(v)
    }
}

impl From<Vec<Vec<u8>>> for DataValue {
    fn from(v: Vec<Vec<u8>>) -> Self {
        DataValue::BinaryBlobArray(v)
    }
}

impl From<Vec<DateTime<Utc>>> for DataValue {
    fn from(v: Vec<DateTime<Utc>>) -> Self {
        DataValue::DateTimeArray(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn mapping_type_descriptor_spelling() {
        assert_eq!(
            serde_json::to_string(&MappingType::LongInteger).unwrap(),
            "\"longinteger\""
        );
        assert_eq!(
            serde_json::to_string(&MappingType::BinaryBlobArray).unwrap(),
            "\"binaryblobarray\""
        );
        let parsed: MappingType = serde_json::from_str("\"datetimearray\"").unwrap();
        assert_eq!(parsed, MappingType::DateTimeArray);
        assert_eq!(MappingType::DoubleArray.to_string(), "doublearray");
    }

    #[test]
    fn scalar_and_array_types_are_distinct() {
        assert_ne!(
            DataValue::from(3_i32).mapping_type(),
            DataValue::from(vec![3_i32]).mapping_type()
        );
        assert_eq!(DataValue::from(vec![3_i32]).mapping_type(), MappingType::IntegerArray);
    }

    #[test]
    fn finite_check_only_applies_to_doubles() {
        assert!(DataValue::from(1.5).is_finite());
        assert!(!DataValue::from(f64::NAN).is_finite());
        assert!(!DataValue::from(vec![1.0, f64::INFINITY]).is_finite());
        assert!(DataValue::from("nan").is_finite());
    }

    #[test]
    fn binary_blobs_encode_as_base64() {
        let value = DataValue::from(vec![0xde_u8, 0xad, 0xbe, 0xef]);
        assert_eq!(value.to_json(), serde_json::json!("3q2+7w=="));
    }

    #[test]
    fn timestamps_encode_as_rfc3339() {
        let at = Utc.with_ymd_and_hms(2024, 5, 17, 8, 30, 0).unwrap();
        let value = DataValue::from(at);
        assert_eq!(value.to_json(), serde_json::json!("2024-05-17T08:30:00.000Z"));
    }

    #[test]
    fn default_delivery_policy() {
        assert_eq!(Reliability::default(), Reliability::Unreliable);
        assert_eq!(Retention::default(), Retention::Discard);
    }
}
