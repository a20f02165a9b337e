//! LED strip tasks
//!
//! The controller is shared by three tasks: one drives fades frame by
//! frame, one resizes the buffer when the geometry parameters change and
//! one applies messages from the control topic.

use defmt::*;
use pixelnode_core::led::FadeOutcome;
use pixelnode_hal_rp2040::EmbassyClock;

use crate::board::Controller;
use crate::channels::{LED_CONTROL, LED_RECONFIGURE};

#[embassy_executor::task]
pub async fn led_fade_task(controller: &'static Controller) {
    info!("LED fade task started");
    let clock = EmbassyClock;
    loop {
        match controller.run_next_fade(&clock).await {
            Ok(FadeOutcome::Completed(color)) => debug!("fade completed at {=str}", color.to_hex().as_str()),
            Ok(_) => debug!("fade cancelled"),
            Err(e) => error!("fade failed: {}", e),
        }
    }
}

#[embassy_executor::task]
pub async fn led_reconfigure_task(controller: &'static Controller) {
    info!("LED reconfigure task started");
    loop {
        LED_RECONFIGURE.wait().await;
        match controller.reconfigure() {
            Ok(()) => info!("LED strip reconfigured"),
            Err(e) => error!("LED reconfigure failed: {}", e),
        }
    }
}

#[embassy_executor::task]
pub async fn led_control_task(controller: &'static Controller) {
    info!("LED control task started");
    loop {
        let message = LED_CONTROL.receive().await;
        if let Err(e) = controller.control(&message) {
            warn!("LED control message rejected: {}", e);
        }
    }
}
