//! Configuration store errors

use pixelnode_hal::FlashError;
use pixelnode_record::RecordError;

use crate::resource::ErrorResponse;

/// Errors returned by the parameter store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Name is empty, too long, starts with `_` or contains a space
    InvalidName,
    /// A parameter with this name is already registered
    DuplicateName,
    /// Validator rejected the value
    ValidationFailed,
    /// No parameter with this name
    UnknownParam,
    /// Value kind differs from the registered kind
    TypeMismatch,
    /// Group has no callback to attach to
    UnknownGroup,
    /// Group already has a callback
    GroupConflict,
    /// Parameter table is full
    TooManyParams,
    /// Group table is full
    TooManyGroups,
    /// String value too long
    ValueTooLong,
    /// Value is not an integer, string, boolean or null
    UnsupportedType,
    /// Request body is not a JSON object
    InvalidJson,
    /// Output buffer too small for the JSON snapshot
    OutputTooSmall,
    /// Serialized parameters exceed the region budget
    StoreTooLarge,
    /// Stored records are malformed
    StoreCorrupt,
    /// Flash operation failed
    Flash(FlashError),
}

impl From<FlashError> for ConfigError {
    fn from(err: FlashError) -> Self {
        ConfigError::Flash(err)
    }
}

impl From<RecordError> for ConfigError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::NameTooLong => ConfigError::InvalidName,
            RecordError::ValueTooLong => ConfigError::ValueTooLong,
            RecordError::BufferTooSmall | RecordError::RegionFull => ConfigError::StoreTooLarge,
            RecordError::Corrupt | RecordError::UnknownType | RecordError::Truncated => {
                ConfigError::StoreCorrupt
            }
        }
    }
}

impl ConfigError {
    /// Human readable message
    pub fn message(&self) -> &'static str {
        match self {
            ConfigError::InvalidName => "invalid parameter name",
            ConfigError::DuplicateName => "parameter already exists",
            ConfigError::ValidationFailed => "invalid value",
            ConfigError::UnknownParam => "no such parameter",
            ConfigError::TypeMismatch => "invalid value type",
            ConfigError::UnknownGroup => "no such group",
            ConfigError::GroupConflict => "group already has a callback",
            ConfigError::TooManyParams => "too many parameters",
            ConfigError::TooManyGroups => "too many groups",
            ConfigError::ValueTooLong => "value too long",
            ConfigError::UnsupportedType => "unsupported value type",
            ConfigError::InvalidJson => "malformed request",
            ConfigError::OutputTooSmall => "response too large",
            ConfigError::StoreTooLarge => "config is too large",
            ConfigError::StoreCorrupt => "malformed config",
            ConfigError::Flash(_) => "flash error",
        }
    }

    /// HTTP-style status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            ConfigError::UnknownParam | ConfigError::UnknownGroup => 404,
            ConfigError::TooManyParams | ConfigError::TooManyGroups | ConfigError::StoreTooLarge => {
                413
            }
            ConfigError::OutputTooSmall | ConfigError::StoreCorrupt | ConfigError::Flash(_) => 500,
            _ => 400,
        }
    }
}

impl From<ConfigError> for ErrorResponse {
    fn from(err: ConfigError) -> Self {
        ErrorResponse::new(err.message(), err.status_code())
    }
}
