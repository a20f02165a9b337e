//! GPIO wrappers
//!
//! Interrupt-driven inputs are split in two. An edge task owns the
//! [`Input`] and waits on it with [`mirror_edges`]; the peripheral that
//! interprets the level reads a [`PinLevel`] the edge task keeps current.

use core::sync::atomic::{AtomicBool, Ordering};

use embassy_rp::gpio::{Input, Output};
use pixelnode_hal::{InputPin, OutputPin};

/// Push-pull output
pub struct BoardOutput<'d>(Output<'d>);

impl<'d> BoardOutput<'d> {
    pub fn new(pin: Output<'d>) -> Self {
        Self(pin)
    }
}

impl OutputPin for BoardOutput<'_> {
    fn set_high(&mut self) {
        self.0.set_high();
    }

    fn set_low(&mut self) {
        self.0.set_low();
    }

    fn toggle(&mut self) {
        self.0.toggle();
    }

    fn is_set_high(&self) -> bool {
        self.0.is_set_high()
    }
}

/// Last level seen by an edge task
pub struct PinLevel(AtomicBool);

impl Default for PinLevel {
    fn default() -> Self {
        Self::new()
    }
}

impl PinLevel {
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    pub fn set(&self, high: bool) {
        self.0.store(high, Ordering::Release);
    }
}

impl InputPin for &PinLevel {
    fn is_high(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Keep `level` in step with `input` and call `on_edge` after each edge
///
/// Never returns; race it against the task that reads `level`.
pub async fn mirror_edges(input: &mut Input<'_>, level: &PinLevel, mut on_edge: impl FnMut()) {
    level.set(input.is_high());
    loop {
        input.wait_for_any_edge().await;
        level.set(input.is_high());
        on_edge();
    }
}
