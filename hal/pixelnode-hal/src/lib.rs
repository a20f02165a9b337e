//! Pixelnode Hardware Abstraction Layer
//!
//! This crate defines the hardware traits the board-agnostic crates are
//! written against. Chip-specific HALs implement them, and host tests
//! implement them with in-memory doubles.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  pixelnode-core / pixelnode-drivers          │
//! └─────────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────────┐
//! │  pixelnode-hal (this crate - traits)         │
//! └─────────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ pixelnode-hal-│       │  host test    │
//! │    rp2040     │       │   doubles     │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`gpio::OutputPin`], [`gpio::InputPin`] - Digital I/O
//! - [`analog::AnalogInput`] - Single ADC channel
//! - [`strip::PixelStrip`] - Addressable LED strip output
//! - [`flash::ConfigRegion`] - One erase block of raw NOR flash
//! - [`clock::Clock`] - Millisecond time and async sleep
//! - [`system::SystemReset`] - Device restart

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod analog;
pub mod clock;
pub mod flash;
pub mod gpio;
pub mod strip;
pub mod system;

// In-memory doubles for host tests
#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export key traits at crate root for convenience
pub use analog::{AnalogError, AnalogInput};
pub use clock::{elapsed_ms, Clock};
pub use flash::{ConfigRegion, FlashError, BLOCK_SIZE};
pub use gpio::{InputPin, OutputPin};
pub use strip::{PixelStrip, StripError};
pub use system::SystemReset;
