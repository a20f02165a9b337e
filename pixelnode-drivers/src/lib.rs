//! Peripheral drivers
//!
//! Concrete peripherals built on the `pixelnode-core` task contract. Each
//! one registers the parameters it owns and implements
//! [`Peripheral`](pixelnode_core::task::Peripheral) so it can run under
//! [`supervise`](pixelnode_core::task::supervise):
//!
//! - [`button::SetupButton`] - Setup mode and factory reset button
//! - [`status::StatusIndicator`] - Configured / unconfigured status LED
//! - [`ambient::AmbientSensor`] - Analog light sensor
//! - [`binary::BinarySensor`] - GPIO level sensor
//! - [`relay::Relay`] - Relay output
//! - [`wifi::WifiSetup`] - WiFi station parameters

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

#[macro_use]
mod log;

pub mod ambient;
pub mod binary;
pub mod button;
pub mod device;
pub mod relay;
pub mod status;
pub mod wifi;

pub use ambient::AmbientSensor;
pub use binary::BinarySensor;
pub use button::{ButtonAction, ButtonMonitor, SetupButton};
pub use relay::Relay;
pub use status::StatusIndicator;
pub use wifi::{AccessPoint, Station, WifiSetup};

/// Format a decimal number into a short payload
pub(crate) fn decimal(value: i32) -> heapless::String<12> {
    use core::fmt::Write;

    let mut out = heapless::String::new();
    // i32::MIN is 11 bytes
    let _ = write!(out, "{}", value);
    out
}
