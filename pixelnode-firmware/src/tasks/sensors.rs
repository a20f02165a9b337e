//! Sensor tasks

use defmt::*;
use embassy_futures::select::{select, Either};
use embassy_rp::gpio::Input;
use pixelnode_core::task::{supervise, CancelToken, IsrLatch, TaskHandle};
use pixelnode_drivers::{AmbientSensor, BinarySensor};
use pixelnode_hal::Clock;
use pixelnode_hal_rp2040::gpio::mirror_edges;
use pixelnode_hal_rp2040::{BoardAdc, EmbassyClock, PinLevel};

use crate::board::{Store, BINARY_TOPIC_PARAM, BROKER};

static AMBIENT_CANCEL: CancelToken = CancelToken::new();
static BINARY_CANCEL: CancelToken = CancelToken::new();
static BINARY_LATCH: IsrLatch = IsrLatch::new();

#[embassy_executor::task]
pub async fn ambient_task(adc: BoardAdc<'static>, store: &'static Store) {
    let mut sensor = AmbientSensor::new(adc, store, &BROKER);
    supervise(&mut sensor, TaskHandle::new(&AMBIENT_CANCEL), &EmbassyClock).await;
}

#[embassy_executor::task]
pub async fn binary_sensor_task(mut input: Input<'static>, store: &'static Store) {
    let clock = EmbassyClock;
    let level = PinLevel::new();
    level.set(input.is_high());
    let mut sensor = BinarySensor::new(&level, &BINARY_LATCH, store, &BROKER, BINARY_TOPIC_PARAM);

    let handle = TaskHandle::new(&BINARY_CANCEL).with_latch(&BINARY_LATCH);
    let edges = mirror_edges(&mut input, &level, || {
        BINARY_LATCH.fire(clock.now_ms());
    });
    if let Either::First(exit) = select(supervise(&mut sensor, handle, &clock), edges).await {
        info!("binary sensor task ended: {}", exit);
    }
}
