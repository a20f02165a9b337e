//! Supervised peripheral loop

use core::future::pending;

use embassy_futures::select::{select, select3};
use pixelnode_hal::{AnalogError, Clock, FlashError, StripError};

use super::cancel::CancelToken;
use super::latch::IsrLatch;
use crate::config::ConfigError;
use crate::led::LedError;
use crate::pubsub::PublishError;

/// First retry delay after a failed step
pub const BACKOFF_BASE_MS: u32 = 1000;

/// Longest retry delay after repeated failures
pub const BACKOFF_MAX_MS: u32 = 30_000;

/// Errors a peripheral step can report
///
/// Caught by [`supervise`], logged, and followed by a back-off sleep. They
/// never end the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TaskError {
    Config(ConfigError),
    Publish(PublishError),
    Strip(StripError),
    Analog(AnalogError),
    Flash(FlashError),
    Led(LedError),
}

impl From<ConfigError> for TaskError {
    fn from(e: ConfigError) -> Self {
        TaskError::Config(e)
    }
}

impl From<PublishError> for TaskError {
    fn from(e: PublishError) -> Self {
        TaskError::Publish(e)
    }
}

impl From<StripError> for TaskError {
    fn from(e: StripError) -> Self {
        TaskError::Strip(e)
    }
}

impl From<AnalogError> for TaskError {
    fn from(e: AnalogError) -> Self {
        TaskError::Analog(e)
    }
}

impl From<FlashError> for TaskError {
    fn from(e: FlashError) -> Self {
        TaskError::Flash(e)
    }
}

impl From<LedError> for TaskError {
    fn from(e: LedError) -> Self {
        TaskError::Led(e)
    }
}

/// When a peripheral wants its next step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Wake {
    /// After a delay, or earlier if the ISR latch fires
    After(u32),
    /// Only when the ISR latch fires
    OnInterrupt,
    /// Leave the loop
    Stop,
}

/// Why [`supervise`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Exit {
    /// The peripheral returned [`Wake::Stop`]
    Stopped,
    /// The cancel token was raised
    Cancelled,
}

/// A unit of recurring work owned by one peripheral
///
/// `step` must do a bounded amount of work and return; the loop only
/// observes cancellation between steps.
pub trait Peripheral {
    /// Short name used in log messages
    fn name(&self) -> &'static str;

    /// Run one step at `now_ms`
    fn step(&mut self, now_ms: u32) -> Result<Wake, TaskError>;

    /// Release outputs when the loop ends
    fn shutdown(&mut self) {}
}

/// Control side of a supervised task
#[derive(Clone, Copy)]
pub struct TaskHandle<'a> {
    cancel: &'a CancelToken,
    latch: Option<&'a IsrLatch>,
}

impl<'a> TaskHandle<'a> {
    pub fn new(cancel: &'a CancelToken) -> Self {
        Self {
            cancel,
            latch: None,
        }
    }

    /// Attach the latch the peripheral's interrupt handler fires
    pub fn with_latch(self, latch: &'a IsrLatch) -> Self {
        Self {
            latch: Some(latch),
            ..self
        }
    }

    pub fn latch(&self) -> Option<&'a IsrLatch> {
        self.latch
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stop the task: deregister the ISR, then cancel
    pub fn shutdown(&self) {
        if let Some(latch) = self.latch {
            latch.disarm();
        }
        self.cancel.cancel();
    }

    /// Wait for the requested wake-up, an edge or cancellation
    async fn suspend<C: Clock>(&self, wake: Wake, clock: &C) {
        let edge = async {
            match self.latch {
                Some(latch) => latch.triggered().await,
                None => pending::<()>().await,
            }
        };
        match wake {
            Wake::After(ms) => {
                select3(clock.sleep_ms(ms), edge, self.cancel.cancelled()).await;
            }
            Wake::OnInterrupt => {
                select(edge, self.cancel.cancelled()).await;
            }
            Wake::Stop => {}
        }
    }
}

/// Retry delay after `failures` consecutive failed steps
pub fn backoff_ms(failures: u32) -> u32 {
    let shift = failures.saturating_sub(1).min(5);
    BACKOFF_BASE_MS.saturating_mul(1 << shift).min(BACKOFF_MAX_MS)
}

/// Run `peripheral` until it stops or `handle` is cancelled
///
/// Arms the ISR latch on entry and disarms it on exit. A failed step is
/// logged and retried after [`backoff_ms`]; it never ends the loop.
///
/// # Arguments
/// * `peripheral` - The work to run
/// * `handle` - Cancel token and optional ISR latch
/// * `clock` - Time source for steps and sleeps
pub async fn supervise<P, C>(peripheral: &mut P, handle: TaskHandle<'_>, clock: &C) -> Exit
where
    P: Peripheral + ?Sized,
    C: Clock,
{
    let name = peripheral.name();
    info!("{=str} task started", name);

    if let Some(latch) = handle.latch {
        latch.arm();
    }

    let mut failures: u32 = 0;
    let exit = loop {
        if handle.is_cancelled() {
            break Exit::Cancelled;
        }

        let wake = match peripheral.step(clock.now_ms()) {
            Ok(wake) => {
                failures = 0;
                wake
            }
            Err(e) => {
                failures = failures.saturating_add(1);
                error!("{=str} step failed: {}", name, e);
                Wake::After(backoff_ms(failures))
            }
        };

        if wake == Wake::Stop {
            break Exit::Stopped;
        }
        handle.suspend(wake, clock).await;
    };

    if let Some(latch) = handle.latch {
        latch.disarm();
    }
    peripheral.shutdown();
    info!("{=str} task stopped", name);
    exit
}
