//! Cancellation primitives

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use portable_atomic::{AtomicBool, AtomicU32, Ordering};

/// Cooperative cancellation flag
///
/// Checked by a task at each suspension point. [`CancelToken::cancelled`]
/// resolves once the token is raised, so a sleeping task can race its
/// sleep against it.
pub struct CancelToken {
    cancelled: AtomicBool,
    wake: Signal<CriticalSectionRawMutex, ()>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub const fn new() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
            wake: Signal::new(),
        }
    }

    /// Raise the token
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.wake.signal(());
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Resolve once the token has been raised
    pub async fn cancelled(&self) {
        while !self.is_cancelled() {
            self.wake.wait().await;
        }
    }

    /// Lower the token so the owning task can be started again
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::Release);
        self.wake.reset();
    }
}

/// Generation counter invalidating stale continuations
///
/// A task records the generation when it starts; bumping the counter makes
/// every task holding an older value stop at its next check.
pub struct Generation(AtomicU32);

impl Default for Generation {
    fn default() -> Self {
        Self::new()
    }
}

impl Generation {
    pub const fn new() -> Self {
        Self(AtomicU32::new(0))
    }

    /// Start a new generation and return it
    pub fn bump(&self) -> u32 {
        self.0.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
    }

    pub fn current(&self) -> u32 {
        self.0.load(Ordering::Acquire)
    }

    pub fn is_current(&self, generation: u32) -> bool {
        self.current() == generation
    }
}
