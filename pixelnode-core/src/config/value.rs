//! Parameter values
//!
//! A parameter holds one of four kinds of value. The kind is fixed when the
//! parameter is registered and every later update must supply the same kind.

use heapless::String;
use pixelnode_record::{RecordValue, MAX_VALUE_LEN};
use serde::{Serialize, Serializer};

use super::error::ConfigError;

/// Owned parameter value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Signed 32-bit integer
    Int(i32),
    /// UTF-8 string of at most [`MAX_VALUE_LEN`] bytes
    Str(String<MAX_VALUE_LEN>),
    /// Boolean
    Bool(bool),
    /// Null
    Null,
}

/// The kind of a [`Value`], without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ValueKind {
    Int,
    Str,
    Bool,
    Null,
}

impl Value {
    /// Build a string value, failing if it exceeds [`MAX_VALUE_LEN`]
    pub fn str(s: &str) -> Result<Self, ConfigError> {
        String::try_from(s)
            .map(Value::Str)
            .map_err(|_| ConfigError::ValueTooLong)
    }

    /// The kind of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Int(_) => ValueKind::Int,
            Value::Str(_) => ValueKind::Str,
            Value::Bool(_) => ValueKind::Bool,
            Value::Null => ValueKind::Null,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Borrow as a flash record value
    pub fn as_record(&self) -> RecordValue<'_> {
        match self {
            Value::Int(v) => RecordValue::Int(*v),
            Value::Str(s) => RecordValue::Str(s.as_str()),
            Value::Bool(b) => RecordValue::Bool(*b),
            Value::Null => RecordValue::Null,
        }
    }

    /// Copy a decoded flash record value
    pub fn from_record(value: RecordValue<'_>) -> Result<Self, ConfigError> {
        match value {
            RecordValue::Int(v) => Ok(Value::Int(v)),
            RecordValue::Str(s) => Value::str(s),
            RecordValue::Bool(b) => Ok(Value::Bool(b)),
            RecordValue::Null => Ok(Value::Null),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<RecordValue<'_>> for ValueKind {
    fn from(value: RecordValue<'_>) -> Self {
        match value {
            RecordValue::Int(_) => ValueKind::Int,
            RecordValue::Str(_) => ValueKind::Str,
            RecordValue::Bool(_) => ValueKind::Bool,
            RecordValue::Null => ValueKind::Null,
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Int(v) => serializer.serialize_i32(*v),
            Value::Str(s) => serializer.serialize_str(s.as_str()),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Null => serializer.serialize_unit(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_str_length_limit() {
        let long = "x".repeat(MAX_VALUE_LEN);
        assert!(Value::str(&long).is_ok());

        let too_long = "x".repeat(MAX_VALUE_LEN + 1);
        assert_eq!(Value::str(&too_long), Err(ConfigError::ValueTooLong));
    }

    #[test]
    fn test_kind() {
        assert_eq!(Value::Int(3).kind(), ValueKind::Int);
        assert_eq!(Value::str("a").unwrap().kind(), ValueKind::Str);
        assert_eq!(Value::Bool(true).kind(), ValueKind::Bool);
        assert_eq!(Value::Null.kind(), ValueKind::Null);
        assert_eq!(ValueKind::from(RecordValue::Str("a")), ValueKind::Str);
    }

    #[test]
    fn test_record_conversion() {
        let value = Value::str("hall").unwrap();
        assert_eq!(value.as_record(), RecordValue::Str("hall"));
        assert_eq!(Value::from_record(RecordValue::Int(-5)), Ok(Value::Int(-5)));
        assert_eq!(Value::from_record(RecordValue::Null), Ok(Value::Null));
    }

    #[test]
    fn test_json_types() {
        let mut buf = [0u8; 32];
        let n = serde_json_core::to_slice(&Value::Bool(false), &mut buf).unwrap();
        assert_eq!(&buf[..n], b"false");
        let n = serde_json_core::to_slice(&Value::Int(-12), &mut buf).unwrap();
        assert_eq!(&buf[..n], b"-12");
        let n = serde_json_core::to_slice(&Value::str("x").unwrap(), &mut buf).unwrap();
        assert_eq!(&buf[..n], b"\"x\"");
        let n = serde_json_core::to_slice(&Value::Null, &mut buf).unwrap();
        assert_eq!(&buf[..n], b"null");
    }
}
