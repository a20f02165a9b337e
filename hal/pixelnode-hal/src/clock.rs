//! Monotonic time and async delays
//!
//! Peripheral loops never read a hardware timer directly. They ask a
//! [`Clock`] for the current millisecond count and for sleeps, so host
//! tests can drive time by hand.

use core::future::Future;

/// Millisecond clock with async sleep
pub trait Clock {
    /// Milliseconds since boot, wrapping at `u32::MAX`
    fn now_ms(&self) -> u32;

    /// Sleep for `ms` milliseconds
    fn sleep_ms(&self, ms: u32) -> impl Future<Output = ()>;
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }

    fn sleep_ms(&self, ms: u32) -> impl Future<Output = ()> {
        (**self).sleep_ms(ms)
    }
}

/// Milliseconds elapsed from `since` to `now`, tolerant of wrap-around
pub fn elapsed_ms(since: u32, now: u32) -> u32 {
    now.wrapping_sub(since)
}
