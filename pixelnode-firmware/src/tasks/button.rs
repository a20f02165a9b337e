//! Setup button task
//!
//! Mirrors the button pin into a [`PinLevel`] and fires the button's
//! latch on every edge, while the supervised driver interprets presses.

use defmt::*;
use embassy_futures::select::{select, Either};
use embassy_rp::gpio::Input;
use pixelnode_core::task::{supervise, CancelToken, IsrLatch, TaskHandle};
use pixelnode_drivers::button::{SetupButton, SetupButtonConfig};
use pixelnode_hal::Clock;
use pixelnode_hal_rp2040::gpio::mirror_edges;
use pixelnode_hal_rp2040::{BoardReset, EmbassyClock, PinLevel};

use crate::board::Store;
use crate::radio::LoggedAccessPoint;

static LATCH: IsrLatch = IsrLatch::new();
static CANCEL: CancelToken = CancelToken::new();

#[embassy_executor::task]
pub async fn setup_button_task(mut input: Input<'static>, store: &'static Store) {
    let clock = EmbassyClock;
    let level = PinLevel::new();
    level.set(input.is_high());
    let mut button = SetupButton::new(
        &level,
        &LATCH,
        store,
        BoardReset,
        LoggedAccessPoint::default(),
        SetupButtonConfig::default(),
    );

    let handle = TaskHandle::new(&CANCEL).with_latch(&LATCH);
    let edges = mirror_edges(&mut input, &level, || {
        LATCH.fire(clock.now_ms());
    });
    if let Either::First(exit) = select(supervise(&mut button, handle, &clock), edges).await {
        info!("setup button task ended: {}", exit);
    }
}
