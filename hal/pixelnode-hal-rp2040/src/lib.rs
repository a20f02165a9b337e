//! RP2040 HAL for Pixelnode controllers
//!
//! Implements the `pixelnode-hal` traits on top of `embassy-rp`:
//!
//! - [`flash`] - Config region placement in the on-board QSPI flash
//! - [`gpio`] - Output/input wrappers and edge mirroring for interrupt
//!   driven inputs
//! - [`adc`] - Blocking ADC channel
//! - [`strip`] - PIO-driven WS2812 / SK6812 output
//! - [`clock`] - `embassy-time` clock
//! - [`system`] - Core reset

#![no_std]

pub mod adc;
pub mod clock;
pub mod flash;
pub mod gpio;
pub mod strip;
pub mod system;

pub use adc::BoardAdc;
pub use clock::EmbassyClock;
pub use flash::{board_flash, board_id, config_region, BoardFlash, CONFIG_OFFSET};
pub use gpio::{BoardOutput, PinLevel};
pub use strip::PioStrip;
pub use system::BoardReset;
