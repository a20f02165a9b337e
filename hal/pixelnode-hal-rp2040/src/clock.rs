//! `embassy-time` backed clock

use core::future::Future;

use embassy_time::{Instant, Timer};
use pixelnode_hal::Clock;

#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now_ms(&self) -> u32 {
        // Wraps after ~49 days; callers use elapsed_ms
        Instant::now().as_millis() as u32
    }

    fn sleep_ms(&self, ms: u32) -> impl Future<Output = ()> {
        Timer::after_millis(u64::from(ms))
    }
}
