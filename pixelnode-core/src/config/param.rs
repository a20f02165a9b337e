//! Parameter table
//!
//! Parameters live in registration order in a fixed-capacity table and are
//! looked up by name. Registration order is also the order in which they
//! are persisted and reported.

use heapless::{String, Vec};
use pixelnode_record::MAX_NAME_LEN;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use super::error::ConfigError;
use super::value::{Value, ValueKind};

/// Maximum number of registered parameters
pub const MAX_PARAMS: usize = 48;

/// Returned by a validator that rejects a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rejected;

/// Pure value check run at registration, update and load
pub type Validator = fn(name: &str, value: &Value) -> Result<(), Rejected>;

/// One registered parameter
#[derive(Debug, Clone)]
pub struct Param {
    pub(crate) name: String<MAX_NAME_LEN>,
    pub(crate) value: Value,
    pub(crate) validator: Option<Validator>,
    /// Index into the store's group table
    pub(crate) group: Option<u8>,
}

impl Param {
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn kind(&self) -> ValueKind {
        self.value.kind()
    }

    /// Run the validator, if any, against `value`
    pub(crate) fn validate(&self, value: &Value) -> Result<(), ConfigError> {
        match self.validator {
            Some(check) => check(self.name(), value).map_err(|_| ConfigError::ValidationFailed),
            None => Ok(()),
        }
    }
}

/// Check the parameter naming rules
///
/// Names are 1 to 32 bytes, do not start with `_` (reserved for internal
/// fields) and contain no spaces.
pub fn validate_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return Err(ConfigError::InvalidName);
    }
    if name.starts_with('_') || name.contains(' ') {
        return Err(ConfigError::InvalidName);
    }
    Ok(())
}

/// Registered parameters, in registration order
#[derive(Debug, Default)]
pub struct ParamTable {
    params: Vec<Param, MAX_PARAMS>,
}

impl ParamTable {
    pub const fn new() -> Self {
        Self { params: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Index of the parameter called `name`
    pub fn position(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.name.as_str() == name)
    }

    pub fn param(&self, name: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.name.as_str() == name)
    }

    /// Current value of `name`
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.param(name).map(Param::value)
    }

    /// Integer value of `name`, `None` if missing or not an integer
    pub fn int(&self, name: &str) -> Option<i32> {
        self.get(name).and_then(Value::as_int)
    }

    /// String value of `name`, `None` if missing or not a string
    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Boolean value of `name`, `None` if missing or not a boolean
    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Param> {
        self.params.iter()
    }

    pub(crate) fn at(&self, index: usize) -> &Param {
        &self.params[index]
    }

    /// Check `value` against the parameter at `index`, kind first
    ///
    /// Returns the parameter's group.
    pub(crate) fn check(&self, index: usize, value: &Value) -> Result<Option<u8>, ConfigError> {
        let param = self.at(index);
        if param.kind() != value.kind() {
            warn!("update rejected, type mismatch for {=str}", param.name());
            return Err(ConfigError::TypeMismatch);
        }
        if let Err(e) = param.validate(value) {
            warn!("update rejected, invalid value for {=str}", param.name());
            return Err(e);
        }
        Ok(param.group)
    }

    pub(crate) fn set(&mut self, index: usize, value: Value) {
        self.params[index].value = value;
    }

    pub(crate) fn push(&mut self, param: Param) -> Result<(), ConfigError> {
        self.params
            .push(param)
            .map_err(|_| ConfigError::TooManyParams)
    }
}

impl Serialize for ParamTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.params.len()))?;
        for param in &self.params {
            map.serialize_entry(param.name(), param.value())?;
        }
        map.end()
    }
}
