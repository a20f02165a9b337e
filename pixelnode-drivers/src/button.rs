//! Setup button
//!
//! One button drives provisioning:
//!
//! - short press: clear `configured`, which brings the setup access point
//!   back up
//! - hold for [`LONG_PRESS_MS`]: erase the parameter store and restart
//!
//! The interrupt handler only fires the task's [`IsrLatch`]. The task reads
//! the pin level at each step, so missed or merged edges do not matter:
//! only "still pressed" time and "was released" are tracked.

use pixelnode_core::access::ConfigAccess;
use pixelnode_core::config::Value;
use pixelnode_core::task::{IsrLatch, Peripheral, TaskError, Wake};
use pixelnode_hal::{elapsed_ms, InputPin, SystemReset};

use crate::device::PARAM_CONFIGURED;
use crate::wifi::AccessPoint;

/// Hold time that triggers a factory reset
pub const LONG_PRESS_MS: u32 = 5000;

/// Poll period of the button task
pub const CHECK_INTERVAL_MS: u32 = 1000;

/// Setup button configuration
#[derive(Debug, Clone, Copy)]
pub struct SetupButtonConfig {
    /// Hold time for a factory reset
    pub long_press_ms: u32,
    /// Poll period while idle
    pub check_interval_ms: u32,
    /// Pin reads low while pressed
    pub active_low: bool,
}

impl Default for SetupButtonConfig {
    fn default() -> Self {
        Self {
            long_press_ms: LONG_PRESS_MS,
            check_interval_ms: CHECK_INTERVAL_MS,
            active_low: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonState {
    Idle,
    Pressed { since: u32 },
    Released { held_ms: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonAction {
    /// Short press: leave normal operation for setup mode
    EnterSetup,
    /// Long press: wipe the configuration and restart
    FactoryReset,
}

/// Press / long-press state machine
#[derive(Debug, Clone)]
pub struct ButtonMonitor {
    state: ButtonState,
    long_press_ms: u32,
}

impl ButtonMonitor {
    pub fn new(long_press_ms: u32) -> Self {
        Self {
            state: ButtonState::Idle,
            long_press_ms,
        }
    }

    pub fn state(&self) -> ButtonState {
        self.state
    }

    /// Feed the current pin level
    ///
    /// # Arguments
    /// * `pressed` - Button is down right now
    /// * `edge` - Time of the latest edge since the last call, if any
    /// * `now_ms` - Current time
    pub fn observe(&mut self, pressed: bool, edge: Option<u32>, now_ms: u32) {
        let at = edge.unwrap_or(now_ms);
        self.state = match (self.state, pressed) {
            (ButtonState::Idle, true) => ButtonState::Pressed { since: at },
            // Press and release both happened between two steps
            (ButtonState::Idle, false) if edge.is_some() => ButtonState::Released { held_ms: 0 },
            (ButtonState::Pressed { since }, false) => ButtonState::Released {
                held_ms: elapsed_ms(since, at),
            },
            (state, _) => state,
        };
    }

    /// Decide on an action at `now_ms`
    ///
    /// Returns to [`ButtonState::Idle`] whenever an action is reported.
    pub fn poll(&mut self, now_ms: u32) -> Option<ButtonAction> {
        let action = match self.state {
            ButtonState::Idle => None,
            ButtonState::Pressed { since } => {
                if elapsed_ms(since, now_ms) >= self.long_press_ms {
                    Some(ButtonAction::FactoryReset)
                } else {
                    None
                }
            }
            ButtonState::Released { held_ms } if held_ms >= self.long_press_ms => {
                Some(ButtonAction::FactoryReset)
            }
            ButtonState::Released { .. } => Some(ButtonAction::EnterSetup),
        };
        if action.is_some() {
            self.state = ButtonState::Idle;
        }
        action
    }
}

/// Setup button task
///
/// Also keeps the setup access point in line with `configured`: enabled
/// while unconfigured, disabled once configured.
pub struct SetupButton<'a, I, A, R, P> {
    pin: I,
    latch: &'a IsrLatch,
    config: A,
    reset: R,
    access_point: P,
    monitor: ButtonMonitor,
    settings: SetupButtonConfig,
}

impl<'a, I, A, R, P> SetupButton<'a, I, A, R, P>
where
    I: InputPin,
    A: ConfigAccess,
    R: SystemReset,
    P: AccessPoint,
{
    pub fn new(
        pin: I,
        latch: &'a IsrLatch,
        config: A,
        reset: R,
        access_point: P,
        settings: SetupButtonConfig,
    ) -> Self {
        Self {
            pin,
            latch,
            config,
            reset,
            access_point,
            monitor: ButtonMonitor::new(settings.long_press_ms),
            settings,
        }
    }

    pub fn monitor(&self) -> &ButtonMonitor {
        &self.monitor
    }

    pub fn access_point(&self) -> &P {
        &self.access_point
    }

    pub fn reset(&self) -> &R {
        &self.reset
    }

    fn is_pressed(&self) -> bool {
        self.pin.is_high() != self.settings.active_low
    }

    fn sync_access_point(&mut self) {
        let configured = self.config.bool(PARAM_CONFIGURED).unwrap_or(false);
        if self.access_point.is_enabled() == configured {
            info!("setup access point {=bool}", !configured);
            self.access_point.set_enabled(!configured);
        }
    }
}

impl<I, A, R, P> Peripheral for SetupButton<'_, I, A, R, P>
where
    I: InputPin,
    A: ConfigAccess,
    R: SystemReset,
    P: AccessPoint,
{
    fn name(&self) -> &'static str {
        "setup button"
    }

    fn step(&mut self, now_ms: u32) -> Result<Wake, TaskError> {
        let edge = self.latch.take();
        let pressed = self.is_pressed();
        self.monitor.observe(pressed, edge, now_ms);

        match self.monitor.poll(now_ms) {
            Some(ButtonAction::FactoryReset) => {
                warn!("button held, factory reset");
                self.config.erase()?;
                self.reset.reset();
                return Ok(Wake::Stop);
            }
            Some(ButtonAction::EnterSetup) => {
                info!("button pressed, entering setup mode");
                self.config.update(&[(PARAM_CONFIGURED, Value::Bool(false))])?;
            }
            None => {}
        }

        self.sync_access_point();
        Ok(Wake::After(self.settings.check_interval_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_press_enters_setup() {
        let mut m = ButtonMonitor::new(LONG_PRESS_MS);
        m.observe(true, Some(100), 120);
        assert_eq!(m.state(), ButtonState::Pressed { since: 100 });
        assert_eq!(m.poll(1000), None);

        m.observe(false, Some(1500), 2000);
        assert_eq!(m.state(), ButtonState::Released { held_ms: 1400 });
        assert_eq!(m.poll(2000), Some(ButtonAction::EnterSetup));
        assert_eq!(m.state(), ButtonState::Idle);
    }

    #[test]
    fn test_hold_fires_reset_while_pressed() {
        let mut m = ButtonMonitor::new(LONG_PRESS_MS);
        m.observe(true, Some(0), 0);
        m.observe(true, None, 4999);
        assert_eq!(m.poll(4999), None);
        m.observe(true, None, 5000);
        assert_eq!(m.poll(5000), Some(ButtonAction::FactoryReset));
    }

    #[test]
    fn test_long_release_between_polls_is_reset() {
        let mut m = ButtonMonitor::new(LONG_PRESS_MS);
        m.observe(true, Some(0), 0);
        m.observe(false, Some(6000), 6500);
        assert_eq!(m.poll(6500), Some(ButtonAction::FactoryReset));
    }

    #[test]
    fn test_merged_edges_count_as_release() {
        let mut m = ButtonMonitor::new(LONG_PRESS_MS);
        // Pressed and released between two polls
        m.observe(false, Some(300), 1000);
        assert_eq!(m.poll(1000), Some(ButtonAction::EnterSetup));

        // No edge and not pressed: nothing happened
        m.observe(false, None, 2000);
        assert_eq!(m.poll(2000), None);
    }

    #[test]
    fn test_missed_press_edge_uses_poll_time() {
        let mut m = ButtonMonitor::new(LONG_PRESS_MS);
        m.observe(true, None, 700);
        assert_eq!(m.state(), ButtonState::Pressed { since: 700 });
    }

    #[test]
    fn test_hold_across_timer_wrap() {
        let mut m = ButtonMonitor::new(LONG_PRESS_MS);
        m.observe(true, Some(u32::MAX - 1000), u32::MAX - 1000);
        assert_eq!(m.poll(2000), None);
        assert_eq!(m.poll(4000), Some(ButtonAction::FactoryReset));
    }
}
