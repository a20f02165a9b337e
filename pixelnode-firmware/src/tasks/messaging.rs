//! Messaging tasks
//!
//! The MQTT client is not part of this firmware. The drain task empties
//! the broker's outbound queue and logs each message where a client would
//! send it.

use defmt::*;

use crate::board::{Controller, BROKER};
use crate::channels::{on_led_control, TOPICS_CHANGED};

#[embassy_executor::task]
pub async fn publish_drain_task() {
    info!("Publish drain task started");
    loop {
        BROKER.wait().await;
        while let Some(message) = BROKER.pop() {
            info!(
                "publish {=str} ({=usize} bytes, retain={=bool})",
                message.topic.as_str(),
                message.payload.len(),
                message.retain
            );
        }
    }
}

/// Re-subscribe control handlers whenever a control topic changes
#[embassy_executor::task]
pub async fn topic_task(controller: &'static Controller) {
    info!("Topic task started");
    loop {
        if let Err(e) = controller.subscribe(&BROKER, &on_led_control) {
            error!("LED control subscription failed: {}", e);
        }
        TOPICS_CHANGED.wait().await;
    }
}
