//! Persistent device configuration
//!
//! Parameters are registered by the peripherals that own them, restored
//! from flash once at boot and changed only through validated batches.
//! See [`store`] for the batch and notification rules and
//! `pixelnode-record` for the on-flash layout.

pub mod error;
mod json;
pub mod param;
pub mod store;
pub mod value;

pub use error::ConfigError;
pub use param::{validate_name, Param, ParamTable, Rejected, Validator, MAX_PARAMS};
pub use store::{Callback, ConfigStore, LoadReport, MAX_GROUPS};
pub use value::{Value, ValueKind};
