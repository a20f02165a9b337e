//! Board-agnostic core logic for Pixelnode controllers
//!
//! This crate contains everything that does not depend on a specific chip:
//!
//! - Persistent parameter store over one raw flash block, with validators
//!   and grouped change callbacks ([`config`])
//! - REST resource and publish/subscribe contracts the network layers
//!   plug into ([`resource`], [`pubsub`])
//! - Cooperative task supervision: cancellation, ISR hand-off and the
//!   supervised peripheral loop ([`task`])
//! - Addressable LED animation engine and strip controller ([`led`])

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

#[macro_use]
mod log;

pub mod access;
pub mod config;
pub mod led;
pub mod pubsub;
pub mod resource;
pub mod task;

pub use access::ConfigAccess;
pub use config::{ConfigError, ConfigStore, ParamTable, Value};
pub use resource::{ErrorResponse, Resource};
