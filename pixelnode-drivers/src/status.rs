//! Status indicator LED
//!
//! Blinks while the device is unconfigured and stays on once it is.

use pixelnode_core::access::ConfigAccess;
use pixelnode_core::task::{Peripheral, TaskError, Wake};
use pixelnode_hal::OutputPin;

use crate::device::PARAM_CONFIGURED;

/// Blink half-period while unconfigured
pub const BLINK_INTERVAL_MS: u32 = 300;

/// Re-check period once configured
pub const CHECK_INTERVAL_MS: u32 = 1000;

pub struct StatusIndicator<O, A> {
    led: O,
    config: A,
}

impl<O: OutputPin, A: ConfigAccess> StatusIndicator<O, A> {
    pub fn new(led: O, config: A) -> Self {
        Self { led, config }
    }

    pub fn led(&self) -> &O {
        &self.led
    }
}

impl<O: OutputPin, A: ConfigAccess> Peripheral for StatusIndicator<O, A> {
    fn name(&self) -> &'static str {
        "status led"
    }

    fn step(&mut self, _now_ms: u32) -> Result<Wake, TaskError> {
        if self.config.bool(PARAM_CONFIGURED).unwrap_or(false) {
            self.led.set_high();
            Ok(Wake::After(CHECK_INTERVAL_MS))
        } else {
            self.led.toggle();
            Ok(Wake::After(BLINK_INTERVAL_MS))
        }
    }

    fn shutdown(&mut self) {
        self.led.set_low();
    }
}
