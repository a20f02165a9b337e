//! Cooperative task supervision
//!
//! Every peripheral is a [`Peripheral`]: a `step` that does a bounded amount
//! of work and says when it wants to run again. [`supervise`] owns the loop
//! around it:
//!
//! ```text
//!            ┌──────────────┐  Ok(Wake)      ┌─────────────────────────┐
//!   start ──►│ step(now_ms) │───────────────►│ sleep / ISR / cancelled │──┐
//!            └──────────────┘                └─────────────────────────┘  │
//!                 ▲    │ Err(e)                                            │
//!                 │    └──► log, back off ─────────────────────────────────┤
//!                 └───────────────────────────────────────────────────────┘
//! ```
//!
//! Cancellation is cooperative: [`TaskHandle::shutdown`] disarms the ISR
//! latch first so no new wake-ups race the shutdown, then raises the
//! cancel token, which the loop observes at its next suspension point.

mod cancel;
mod latch;
mod supervisor;

pub use cancel::{CancelToken, Generation};
pub use latch::IsrLatch;
pub use supervisor::{
    backoff_ms, supervise, Exit, Peripheral, TaskError, TaskHandle, Wake, BACKOFF_BASE_MS,
    BACKOFF_MAX_MS,
};
