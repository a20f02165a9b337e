//! In-memory hardware doubles
//!
//! Used by host tests across the workspace. [`MemFlash`] behaves like NOR
//! flash: erase sets bytes to 0xFF and programming can only clear bits.

use core::cell::{Cell, RefCell};
use core::future::{ready, Future};

use embedded_storage::nor_flash::{
    ErrorType, NorFlash, NorFlashError, NorFlashErrorKind, ReadNorFlash,
};
use heapless::Vec;

use crate::analog::{AnalogError, AnalogInput};
use crate::clock::Clock;
use crate::flash::BLOCK_SIZE;
use crate::gpio::{InputPin, OutputPin};
use crate::strip::{PixelStrip, StripError};
use crate::system::SystemReset;

/// Maximum number of logged flash operations
pub const OP_LOG_LEN: usize = 64;

/// A recorded flash operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashOp {
    Read { offset: u32, len: usize },
    Write { offset: u32, len: usize },
    Erase { offset: u32, len: usize },
}

/// Error returned by [`MemFlash`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemFlashError {
    /// Injected fault
    Fault,
    OutOfBounds,
    NotAligned,
}

impl NorFlashError for MemFlashError {
    fn kind(&self) -> NorFlashErrorKind {
        match self {
            MemFlashError::OutOfBounds => NorFlashErrorKind::OutOfBounds,
            MemFlashError::NotAligned => NorFlashErrorKind::NotAligned,
            MemFlashError::Fault => NorFlashErrorKind::Other,
        }
    }
}

/// RAM-backed NOR flash of `SIZE` bytes
///
/// Operations beyond [`OP_LOG_LEN`] still execute but are not logged.
pub struct MemFlash<const SIZE: usize> {
    pub buf: [u8; SIZE],
    /// Fail every operation once this many have been logged
    pub fail_after_operation: usize,
    operations: Vec<FlashOp, OP_LOG_LEN>,
}

impl<const SIZE: usize> Default for MemFlash<SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const SIZE: usize> MemFlash<SIZE> {
    /// Fully erased flash
    pub fn new() -> Self {
        Self {
            buf: [0xFF; SIZE],
            fail_after_operation: usize::MAX,
            operations: Vec::new(),
        }
    }

    /// Flash that starts failing after `count` operations
    pub fn new_with_fault(count: usize) -> Self {
        Self {
            fail_after_operation: count,
            ..Self::new()
        }
    }

    /// Logged operations, oldest first
    pub fn operations(&self) -> &[FlashOp] {
        &self.operations
    }

    /// Forget logged operations
    pub fn clear_operations(&mut self) {
        self.operations.clear();
    }

    /// Number of logged erase operations
    pub fn erases(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| matches!(op, FlashOp::Erase { .. }))
            .count()
    }

    /// Number of logged write operations
    pub fn writes(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| matches!(op, FlashOp::Write { .. }))
            .count()
    }

    fn record(&mut self, op: FlashOp) -> Result<(), MemFlashError> {
        if self.operations.len() >= self.fail_after_operation {
            return Err(MemFlashError::Fault);
        }
        let _ = self.operations.push(op);
        Ok(())
    }

    fn check(&self, offset: u32, len: usize) -> Result<usize, MemFlashError> {
        let start = offset as usize;
        if start + len > SIZE {
            return Err(MemFlashError::OutOfBounds);
        }
        Ok(start)
    }
}

impl<const SIZE: usize> ErrorType for MemFlash<SIZE> {
    type Error = MemFlashError;
}

impl<const SIZE: usize> ReadNorFlash for MemFlash<SIZE> {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let start = self.check(offset, bytes.len())?;
        self.record(FlashOp::Read {
            offset,
            len: bytes.len(),
        })?;
        bytes.copy_from_slice(&self.buf[start..start + bytes.len()]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        SIZE
    }
}

impl<const SIZE: usize> NorFlash for MemFlash<SIZE> {
    const WRITE_SIZE: usize = 4;
    const ERASE_SIZE: usize = BLOCK_SIZE;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        if from as usize % Self::ERASE_SIZE != 0 || to as usize % Self::ERASE_SIZE != 0 {
            return Err(MemFlashError::NotAligned);
        }
        let start = self.check(from, (to - from) as usize)?;
        self.record(FlashOp::Erase {
            offset: from,
            len: (to - from) as usize,
        })?;
        self.buf[start..to as usize].fill(0xFF);
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        if offset as usize % Self::WRITE_SIZE != 0 || bytes.len() % Self::WRITE_SIZE != 0 {
            return Err(MemFlashError::NotAligned);
        }
        let start = self.check(offset, bytes.len())?;
        self.record(FlashOp::Write {
            offset,
            len: bytes.len(),
        })?;
        // NOR programming only clears bits
        for (cell, &val) in self.buf[start..start + bytes.len()].iter_mut().zip(bytes) {
            *cell &= val;
        }
        Ok(())
    }
}

/// Output pin whose level is observable through a shared cell
pub struct MockOutput<'a> {
    level: &'a Cell<bool>,
}

impl<'a> MockOutput<'a> {
    pub fn new(level: &'a Cell<bool>) -> Self {
        Self { level }
    }
}

impl OutputPin for MockOutput<'_> {
    fn set_high(&mut self) {
        self.level.set(true);
    }

    fn set_low(&mut self) {
        self.level.set(false);
    }

    fn toggle(&mut self) {
        self.level.set(!self.level.get());
    }

    fn is_set_high(&self) -> bool {
        self.level.get()
    }
}

/// Input pin driven by a shared cell
pub struct MockInput<'a> {
    level: &'a Cell<bool>,
}

impl<'a> MockInput<'a> {
    pub fn new(level: &'a Cell<bool>) -> Self {
        Self { level }
    }
}

impl InputPin for MockInput<'_> {
    fn is_high(&self) -> bool {
        self.level.get()
    }
}

/// ADC channel returning the value of a shared cell
///
/// A value of `u16::MAX` simulates a conversion failure.
pub struct MockAnalog<'a> {
    value: &'a Cell<u16>,
}

impl<'a> MockAnalog<'a> {
    pub fn new(value: &'a Cell<u16>) -> Self {
        Self { value }
    }
}

impl AnalogInput for MockAnalog<'_> {
    fn read(&mut self) -> Result<u16, AnalogError> {
        match self.value.get() {
            u16::MAX => Err(AnalogError::Conversion),
            v => Ok(v),
        }
    }
}

/// Maximum frame size captured by [`MockStrip`]
pub const STRIP_CAPTURE_LEN: usize = 2000;

/// Strip that keeps the last frame written to it
#[derive(Default)]
pub struct MockStrip {
    pub last: Vec<u8, STRIP_CAPTURE_LEN>,
    pub frames: usize,
}

impl MockStrip {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PixelStrip for MockStrip {
    fn write(&mut self, data: &[u8]) -> Result<(), StripError> {
        self.last.clear();
        self.last
            .extend_from_slice(data)
            .map_err(|_| StripError::TooLong)?;
        self.frames += 1;
        Ok(())
    }
}

/// Maximum number of recorded sleeps
pub const SLEEP_LOG_LEN: usize = 64;

/// Clock that only moves when told to
///
/// Every sleep completes immediately and advances the time by the
/// requested amount, so async loops run to completion under `block_on`.
#[derive(Default)]
pub struct MockClock {
    now: Cell<u32>,
    sleeps: RefCell<Vec<u32, SLEEP_LOG_LEN>>,
}

impl MockClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(now_ms: u32) -> Self {
        let clock = Self::default();
        clock.now.set(now_ms);
        clock
    }

    pub fn advance(&self, ms: u32) {
        self.now.set(self.now.get().wrapping_add(ms));
    }

    /// Durations of all sleeps so far, oldest first (capped)
    pub fn sleeps(&self) -> Vec<u32, SLEEP_LOG_LEN> {
        self.sleeps.borrow().clone()
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u32 {
        self.now.get()
    }

    fn sleep_ms(&self, ms: u32) -> impl Future<Output = ()> {
        self.advance(ms);
        let _ = self.sleeps.borrow_mut().push(ms);
        ready(())
    }
}

/// Counts reset requests instead of restarting
#[derive(Default)]
pub struct MockReset {
    pub resets: usize,
}

impl SystemReset for MockReset {
    fn reset(&mut self) {
        self.resets += 1;
    }
}
