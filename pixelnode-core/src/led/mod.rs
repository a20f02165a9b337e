//! Addressable LED strip
//!
//! - [`expr`] - Pixel range and color expressions
//! - [`buffer`] - Frame buffer in strip byte order
//! - [`engine`] - Instant sets and stepped fades
//! - [`controller`] - Strip parameters, request handling and status
//!   publishing

pub mod buffer;
pub mod controller;
pub mod engine;
pub mod expr;

pub use buffer::{PixelBuffer, MAX_CHANNELS, MAX_FRAME_LEN, MAX_PIXELS};
pub use controller::{register_params, Action, LedRequest, LedResource, StripController};
pub use engine::{FadeOutcome, FadeStep, LedEngine, SharedEngine, Targets, MAX_EXPRS};
pub use expr::{parse_color, parse_range, Color, ExprError, PixelRange};

use pixelnode_hal::StripError;

use crate::config::ConfigError;
use crate::resource::ErrorResponse;

/// LED engine and controller errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LedError {
    /// Bad range or color expression
    Expr(ExprError),
    /// Pixel count outside 1 to [`MAX_PIXELS`]
    InvalidCount,
    /// Channel count other than 3 or 4
    InvalidChannels,
    /// Malformed request body
    InvalidRequest,
    /// No such action
    UnknownEffect,
    /// Strip transfer failed
    Strip(StripError),
    /// Parameter access failed
    Config(ConfigError),
}

impl From<ExprError> for LedError {
    fn from(e: ExprError) -> Self {
        LedError::Expr(e)
    }
}

impl From<StripError> for LedError {
    fn from(e: StripError) -> Self {
        LedError::Strip(e)
    }
}

impl From<ConfigError> for LedError {
    fn from(e: ConfigError) -> Self {
        LedError::Config(e)
    }
}

impl From<LedError> for ErrorResponse {
    fn from(err: LedError) -> Self {
        match err {
            LedError::Expr(ExprError::InvalidRange) => ErrorResponse::new("invalid range", 400),
            LedError::Expr(ExprError::InvalidColor) => ErrorResponse::new("invalid color", 400),
            LedError::InvalidCount => ErrorResponse::new("invalid pixel count", 400),
            LedError::InvalidChannels => ErrorResponse::new("invalid channel count", 400),
            LedError::InvalidRequest => ErrorResponse::new("malformed request", 400),
            LedError::UnknownEffect => ErrorResponse::new("no such effect", 404),
            LedError::Strip(_) => ErrorResponse::new("strip write failed", 500),
            LedError::Config(e) => e.into(),
        }
    }
}
