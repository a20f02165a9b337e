//! JSON snapshot and batch update
//!
//! The snapshot is one object of `name: value` pairs in registration order.
//! An update body is an object of the same shape holding any subset of the
//! registered names.
//!
//! Each value is parsed as the kind its parameter was registered with:
//! a JSON value of another kind fails with [`ConfigError::TypeMismatch`],
//! and a non-integral number for an integer parameter fails with
//! [`ConfigError::UnsupportedType`]. Escaped strings are stored unescaped.

use core::cell::Cell;
use core::fmt;

use embedded_storage::nor_flash::NorFlash;
use heapless::Vec;
use pixelnode_record::MAX_VALUE_LEN;
use serde::de::{self, DeserializeSeed, Deserializer, MapAccess, Visitor};

use super::error::ConfigError;
use super::param::{ParamTable, MAX_PARAMS};
use super::store::{ConfigStore, GroupMask};
use super::value::{Value, ValueKind};
use crate::resource::{write_message, ErrorResponse, Resource};

/// Store error raised from inside the parser
type Failure = Cell<Option<ConfigError>>;

/// Record `err` and turn it into a parser error
fn raise<E: de::Error>(failure: &Failure, err: ConfigError) -> E {
    failure.set(Some(err));
    E::custom(err.message())
}

/// Validated changes, in body order
pub(super) struct Batch {
    pub(super) entries: Vec<(usize, Value), MAX_PARAMS>,
    pub(super) mask: GroupMask,
}

/// Resolves a key to its parameter index
struct KeySeed<'t> {
    params: &'t ParamTable,
}

impl<'de> DeserializeSeed<'de> for KeySeed<'_> {
    type Value = Option<usize>;

    fn deserialize<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
        d.deserialize_str(self)
    }
}

impl<'de> Visitor<'de> for KeySeed<'_> {
    type Value = Option<usize>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a parameter name")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        let index = self.params.position(v);
        if index.is_none() {
            warn!("update rejected, unknown param {=str}", v);
        }
        Ok(index)
    }
}

/// Parses one value as `kind`
struct ValueSeed<'t> {
    kind: ValueKind,
    failure: &'t Failure,
}

impl<'de> DeserializeSeed<'de> for ValueSeed<'_> {
    type Value = Value;

    fn deserialize<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
        match self.kind {
            // Read as a float so fractions are told apart from bad syntax
            ValueKind::Int => d.deserialize_f64(self),
            ValueKind::Str => d.deserialize_str(self),
            ValueKind::Bool => d.deserialize_bool(self),
            ValueKind::Null => d.deserialize_unit(self),
        }
    }
}

impl<'de> Visitor<'de> for ValueSeed<'_> {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a parameter value")
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        let int = v as i32;
        if f64::from(int) == v {
            Ok(Value::Int(int))
        } else {
            Err(raise(self.failure, ConfigError::UnsupportedType))
        }
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Value::str(v).map_err(|e| raise(self.failure, e))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(Value::Null)
    }
}

/// Parses the request object, checking each entry against its parameter
struct BatchSeed<'t> {
    params: &'t ParamTable,
    failure: &'t Failure,
}

impl<'de> DeserializeSeed<'de> for BatchSeed<'_> {
    type Value = Batch;

    fn deserialize<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
        d.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for BatchSeed<'_> {
    type Value = Batch;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an object of parameters")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut batch = Batch {
            entries: Vec::new(),
            mask: 0,
        };

        while let Some(index) = map.next_key_seed(KeySeed {
            params: self.params,
        })? {
            let Some(index) = index else {
                return Err(raise(self.failure, ConfigError::UnknownParam));
            };
            let kind = self.params.at(index).kind();
            let value = map
                .next_value_seed(ValueSeed {
                    kind,
                    failure: self.failure,
                })
                .map_err(|e| {
                    if self.failure.get().is_none() {
                        self.failure.set(Some(ConfigError::TypeMismatch));
                    }
                    e
                })?;

            if let Some(group) = self
                .params
                .check(index, &value)
                .map_err(|e| raise::<A::Error>(self.failure, e))?
            {
                batch.mask |= 1 << group;
            }
            batch
                .entries
                .push((index, value))
                .map_err(|_| raise::<A::Error>(self.failure, ConfigError::TooManyParams))?;
        }
        Ok(batch)
    }
}

/// Parse a request body into validated changes
///
/// Syntax errors are reported as [`ConfigError::InvalidJson`]; errors about
/// a specific entry keep their own kind.
pub(super) fn parse_batch(body: &[u8], params: &ParamTable) -> Result<Batch, ConfigError> {
    let failure = Failure::new(None);
    let mut unescaped = [0u8; MAX_VALUE_LEN + 1];
    let mut de = serde_json_core::de::Deserializer::new(body, Some(&mut unescaped));

    BatchSeed {
        params,
        failure: &failure,
    }
    .deserialize(&mut de)
    .and_then(|batch| de.end().map(|_| batch))
    .map_err(|_| failure.get().unwrap_or(ConfigError::InvalidJson))
}

impl<'a, F: NorFlash> ConfigStore<'a, F> {
    /// Write the JSON snapshot of every parameter into `out`
    ///
    /// Returns the number of bytes written.
    pub fn write_json(&self, out: &mut [u8]) -> Result<usize, ConfigError> {
        serde_json_core::to_slice(self.params(), out).map_err(|_| ConfigError::OutputTooSmall)
    }

    /// Parse a JSON object and apply it as one [`ConfigStore::update`] batch
    pub fn update_json(&mut self, body: &[u8]) -> Result<(), ConfigError> {
        let batch = parse_batch(body, self.params())?;
        self.commit(
            batch.mask,
            batch.entries.iter().map(|(index, value)| (value, *index)),
        )
    }
}

impl<'a, F: NorFlash> Resource for ConfigStore<'a, F> {
    fn get(&mut self, out: &mut [u8]) -> Result<usize, ErrorResponse> {
        Ok(self.write_json(out)?)
    }

    fn post(&mut self, body: &[u8], out: &mut [u8]) -> Result<usize, ErrorResponse> {
        self.update_json(body)?;
        write_message("config updated", out)
    }
}
