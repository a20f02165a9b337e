//! Status LED task

use embassy_rp::gpio::Output;
use pixelnode_core::task::{supervise, CancelToken, TaskHandle};
use pixelnode_drivers::StatusIndicator;
use pixelnode_hal_rp2040::{BoardOutput, EmbassyClock};

use crate::board::Store;

static CANCEL: CancelToken = CancelToken::new();

#[embassy_executor::task]
pub async fn status_led_task(led: Output<'static>, store: &'static Store) {
    let mut status = StatusIndicator::new(BoardOutput::new(led), store);
    supervise(&mut status, TaskHandle::new(&CANCEL), &EmbassyClock).await;
}
