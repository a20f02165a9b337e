//! Board wiring and shared types
//!
//! Pin assignments for the Pico W LED controller board:
//!
//! | GPIO | Function                        |
//! |------|---------------------------------|
//! | 2    | Strip data (PIO0 SM0)           |
//! | 14   | Binary sensor input, pull-down  |
//! | 15   | Setup button, active low        |
//! | 16   | Status LED                      |
//! | 26   | Ambient light sensor (ADC0)     |

use core::cell::RefCell;

use embassy_rp::peripherals::PIO0;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use pixelnode_core::config::ConfigStore;
use pixelnode_core::led::{SharedEngine, StripController};
use pixelnode_core::pubsub::LocalBroker;
use pixelnode_hal_rp2040::{BoardFlash, PioStrip};

/// Prefix of the default hostname
pub const HOSTNAME_PREFIX: &str = "neopixel";

/// Parameter holding the binary sensor's topic
pub const BINARY_TOPIC_PARAM: &str = "mqtt_topic_sensor_binary";
pub const BINARY_TOPIC_DEFAULT: &str = "neopixel/sensor/binary";

pub type Store = Mutex<CriticalSectionRawMutex, RefCell<ConfigStore<'static, BoardFlash<'static>>>>;
pub type Strip = PioStrip<'static, PIO0, 0>;
pub type Engine = SharedEngine<CriticalSectionRawMutex, Strip>;
pub type Controller = StripController<'static, CriticalSectionRawMutex, Strip, Store, LocalBroker>;

/// Outbound and inbound messages, drained by the publish task
pub static BROKER: LocalBroker = LocalBroker::new();

/// Locally administered MAC derived from the flash unique ID
pub fn mac_from_id(id: [u8; 8]) -> [u8; 6] {
    [0x02, id[3], id[4], id[5], id[6], id[7]]
}
