//! Interrupt to task hand-off
//!
//! An interrupt handler calls [`IsrLatch::fire`], which only stores the
//! edge time, sets a flag and wakes the owning task. The task collects the
//! edge with [`IsrLatch::take`] at its next step.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use portable_atomic::{AtomicBool, AtomicU32, Ordering};

/// Edge latch shared between an ISR and one task
pub struct IsrLatch {
    armed: AtomicBool,
    pending: AtomicBool,
    edge_ms: AtomicU32,
    wake: Signal<CriticalSectionRawMutex, ()>,
}

impl Default for IsrLatch {
    fn default() -> Self {
        Self::new()
    }
}

impl IsrLatch {
    pub const fn new() -> Self {
        Self {
            armed: AtomicBool::new(false),
            pending: AtomicBool::new(false),
            edge_ms: AtomicU32::new(0),
            wake: Signal::new(),
        }
    }

    /// Start accepting edges
    pub fn arm(&self) {
        self.armed.store(true, Ordering::Release);
    }

    /// Stop accepting edges and drop any pending one
    pub fn disarm(&self) {
        self.armed.store(false, Ordering::Release);
        self.pending.store(false, Ordering::Release);
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    /// Record an edge at `now_ms`; called from interrupt context
    ///
    /// Returns `false` when the latch is disarmed and the edge was ignored.
    pub fn fire(&self, now_ms: u32) -> bool {
        if !self.is_armed() {
            return false;
        }
        self.edge_ms.store(now_ms, Ordering::Relaxed);
        self.pending.store(true, Ordering::Release);
        self.wake.signal(());
        true
    }

    /// Collect the latest edge time, if an edge is pending
    ///
    /// Several edges between two calls merge into the latest one.
    pub fn take(&self) -> Option<u32> {
        if self.pending.swap(false, Ordering::AcqRel) {
            Some(self.edge_ms.load(Ordering::Relaxed))
        } else {
            None
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Resolve once an edge is pending, without collecting it
    pub async fn triggered(&self) {
        while !self.is_pending() {
            self.wake.wait().await;
        }
    }
}
