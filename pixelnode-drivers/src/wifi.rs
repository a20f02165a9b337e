//! WiFi setup
//!
//! Owns the station credentials and radio mode parameters. The radio
//! itself sits behind [`Station`] and [`AccessPoint`]; group callbacks on
//! the parameters only signal the WiFi task, which then calls
//! [`WifiSetup::apply_credentials`] or [`WifiSetup::apply_mode`].

use core::fmt::Write;

use embedded_storage::nor_flash::NorFlash;
use heapless::String;
use pixelnode_core::access::ConfigAccess;
use pixelnode_core::config::{Callback, ConfigError, ConfigStore, Rejected, Value};
use pixelnode_core::resource::{ErrorResponse, Resource};
use serde::Serialize;

pub const PARAM_SSID: &str = "wifi_ssid";
pub const PARAM_PASSWORD: &str = "wifi_password";
pub const PARAM_MODE: &str = "wifi_mode";

/// Group shared by the station credentials
pub const WIFI_GROUP: &str = "wifi";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WifiMode {
    B,
    G,
    N,
}

impl WifiMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "802.11b" => Some(WifiMode::B),
            "802.11g" => Some(WifiMode::G),
            "802.11n" => Some(WifiMode::N),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WifiMode::B => "802.11b",
            WifiMode::G => "802.11g",
            WifiMode::N => "802.11n",
        }
    }
}

fn validate_mode(_name: &str, value: &Value) -> Result<(), Rejected> {
    match value.as_str().and_then(WifiMode::parse) {
        Some(_) => Ok(()),
        None => Err(Rejected),
    }
}

/// Station side of the radio
pub trait Station {
    /// Join `ssid`; returns once the attempt has been started
    fn connect(&mut self, ssid: &str, password: &str);

    /// Leave the current network and stay idle
    fn disconnect(&mut self);

    fn is_connected(&self) -> bool;

    /// Signal strength of the current link in dBm
    fn rssi(&self) -> Option<i16>;

    fn set_mode(&mut self, mode: WifiMode);

    fn mac(&self) -> [u8; 6];
}

/// Setup access point
pub trait AccessPoint {
    fn set_enabled(&mut self, enabled: bool);

    fn is_enabled(&self) -> bool;
}

/// Register the station parameters
///
/// # Arguments
/// * `store` - Store to register with
/// * `on_credentials` - Called once per batch touching SSID or password
/// * `on_mode` - Called when the radio mode changes
pub fn register_params<'a, F: NorFlash>(
    store: &mut ConfigStore<'a, F>,
    on_credentials: Callback<'a>,
    on_mode: Callback<'a>,
) -> Result<(), ConfigError> {
    store.add_param(
        PARAM_SSID,
        Value::str("")?,
        None,
        Some(on_credentials),
        Some(WIFI_GROUP),
    )?;
    store.add_param(PARAM_PASSWORD, Value::str("")?, None, None, Some(WIFI_GROUP))?;
    store.add_param(
        PARAM_MODE,
        Value::str(WifiMode::N.as_str())?,
        Some(validate_mode),
        Some(on_mode),
        None,
    )
}

/// Link quality in percent from an RSSI in dBm
pub fn rssi_to_quality(rssi: i16) -> u8 {
    match rssi {
        i16::MIN..=-100 => 0,
        -50..=i16::MAX => 100,
        _ => (2 * (rssi + 100)) as u8,
    }
}

/// `aa-bb-cc-dd-ee-ff`
pub fn format_mac(mac: [u8; 6]) -> String<17> {
    let mut out = String::new();
    for (i, byte) in mac.iter().enumerate() {
        if i > 0 {
            let _ = out.push('-');
        }
        let _ = write!(out, "{:02x}", byte);
    }
    out
}

#[derive(Serialize)]
struct WifiStatus<'s> {
    ssid: &'s str,
    mode: &'s str,
    connected: bool,
    quality: u8,
    mac: &'s str,
}

pub struct WifiSetup<A, S> {
    config: A,
    station: S,
}

impl<A: ConfigAccess, S: Station> WifiSetup<A, S> {
    pub fn new(config: A, station: S) -> Self {
        Self { config, station }
    }

    pub fn station(&self) -> &S {
        &self.station
    }

    /// Join the configured network, or go idle if no SSID is set
    pub fn apply_credentials(&mut self) {
        let station = &mut self.station;
        self.config.read(|params| {
            let ssid = params.str(PARAM_SSID).unwrap_or("");
            if ssid.is_empty() {
                info!("wifi station idle");
                station.disconnect();
            } else {
                info!("wifi joining {=str}", ssid);
                station.connect(ssid, params.str(PARAM_PASSWORD).unwrap_or(""));
            }
        });
    }

    /// Push the configured radio mode to the station
    pub fn apply_mode(&mut self) {
        let mode = self
            .config
            .read(|params| params.str(PARAM_MODE).and_then(WifiMode::parse))
            .unwrap_or(WifiMode::N);
        self.station.set_mode(mode);
    }

    pub fn quality(&self) -> u8 {
        match self.station.rssi() {
            Some(rssi) if self.station.is_connected() => rssi_to_quality(rssi),
            _ => 0,
        }
    }
}

impl<A: ConfigAccess, S: Station> Resource for WifiSetup<A, S> {
    fn get(&mut self, out: &mut [u8]) -> Result<usize, ErrorResponse> {
        let mac = format_mac(self.station.mac());
        let connected = self.station.is_connected();
        let quality = self.quality();
        self.config.read(|params| {
            let status = WifiStatus {
                ssid: params.str(PARAM_SSID).unwrap_or(""),
                mode: params.str(PARAM_MODE).unwrap_or(""),
                connected,
                quality,
                mac: &mac,
            };
            serde_json_core::to_slice(&status, out).map_err(|_| ErrorResponse::RESPONSE_TOO_LARGE)
        })
    }
}
