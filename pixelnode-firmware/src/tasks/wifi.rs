//! WiFi task

use defmt::*;
use embassy_futures::select::{select, Either};
use pixelnode_drivers::WifiSetup;

use crate::board::Store;
use crate::channels::{WIFI_CREDENTIALS, WIFI_MODE};
use crate::radio::LoggedStation;

#[embassy_executor::task]
pub async fn wifi_task(mut wifi: WifiSetup<&'static Store, LoggedStation>) {
    info!("WiFi task started");
    wifi.apply_mode();
    wifi.apply_credentials();
    loop {
        match select(WIFI_CREDENTIALS.wait(), WIFI_MODE.wait()).await {
            Either::First(()) => wifi.apply_credentials(),
            Either::Second(()) => wifi.apply_mode(),
        }
    }
}
