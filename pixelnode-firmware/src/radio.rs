//! Radio stand-in
//!
//! The WiFi driver is not part of this firmware. These types record what
//! the setup logic asks of the radio and log it.

use defmt::*;
use pixelnode_drivers::wifi::{AccessPoint, Station, WifiMode};

pub struct LoggedStation {
    mac: [u8; 6],
    joined: bool,
}

impl LoggedStation {
    pub fn new(mac: [u8; 6]) -> Self {
        Self { mac, joined: false }
    }
}

impl Station for LoggedStation {
    fn connect(&mut self, ssid: &str, _password: &str) {
        info!("station join requested: {=str}", ssid);
        self.joined = true;
    }

    fn disconnect(&mut self) {
        info!("station disconnected");
        self.joined = false;
    }

    fn is_connected(&self) -> bool {
        self.joined
    }

    fn rssi(&self) -> Option<i16> {
        None
    }

    fn set_mode(&mut self, mode: WifiMode) {
        info!("radio mode {=str}", mode.as_str());
    }

    fn mac(&self) -> [u8; 6] {
        self.mac
    }
}

#[derive(Default)]
pub struct LoggedAccessPoint {
    enabled: bool,
}

impl AccessPoint for LoggedAccessPoint {
    fn set_enabled(&mut self, enabled: bool) {
        info!("setup access point enabled: {=bool}", enabled);
        self.enabled = enabled;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}
