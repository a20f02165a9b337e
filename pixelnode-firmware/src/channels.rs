//! Inter-task communication channels
//!
//! Parameter group callbacks run inside the store's update path, so they
//! only raise one of these signals; the owning task does the work.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use heapless::Vec;
use pixelnode_core::config::ParamTable;

/// Longest LED control payload accepted from the broker
pub const CONTROL_PAYLOAD_LEN: usize = 256;

/// Queued LED control messages
const CONTROL_QUEUE_DEPTH: usize = 4;

/// Strip geometry changed
pub static LED_RECONFIGURE: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// A control topic name changed
pub static TOPICS_CHANGED: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// SSID or password changed
pub static WIFI_CREDENTIALS: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Radio mode changed
pub static WIFI_MODE: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Messages from the LED control topic
pub static LED_CONTROL: Channel<
    CriticalSectionRawMutex,
    Vec<u8, CONTROL_PAYLOAD_LEN>,
    CONTROL_QUEUE_DEPTH,
> = Channel::new();

pub fn on_led_geometry(_: &ParamTable) {
    LED_RECONFIGURE.signal(());
}

pub fn on_topics(_: &ParamTable) {
    TOPICS_CHANGED.signal(());
}

pub fn on_wifi_credentials(_: &ParamTable) {
    WIFI_CREDENTIALS.signal(());
}

pub fn on_wifi_mode(_: &ParamTable) {
    WIFI_MODE.signal(());
}

/// Broker handler for the LED control topic
pub fn on_led_control(payload: &[u8]) {
    match Vec::from_slice(payload) {
        Ok(message) => {
            if LED_CONTROL.try_send(message).is_err() {
                defmt::warn!("led control queue full, message dropped");
            }
        }
        Err(_) => defmt::warn!("led control payload too long"),
    }
}
