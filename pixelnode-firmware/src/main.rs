//! Pixelnode - WiFi LED strip / sensor controller firmware
//!
//! Main firmware binary for the Raspberry Pi Pico W. Boot registers every
//! parameter with the store, restores it from flash once, then hands the
//! store to the peripheral tasks.

#![no_std]
#![no_main]

use core::cell::RefCell;

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::adc::{Adc, Channel as AdcChannel};
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::peripherals::PIO0;
use embassy_rp::pio::Pio;
use embassy_sync::blocking_mutex::Mutex;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use pixelnode_core::config::{ConfigError, ConfigStore};
use pixelnode_core::led::controller::{PARAM_CHANNELS, PARAM_COUNT};
use pixelnode_core::led::{self, LedEngine, SharedEngine, StripController};
use pixelnode_drivers::{ambient, binary, device, wifi, WifiSetup};
use pixelnode_hal::FlashError;
use pixelnode_hal_rp2040::{board_flash, board_id, config_region, BoardAdc, BoardFlash, PioStrip};

use crate::board::{
    mac_from_id, Controller, Engine, Store, BINARY_TOPIC_DEFAULT, BINARY_TOPIC_PARAM, BROKER,
    HOSTNAME_PREFIX,
};
use crate::channels::{on_led_geometry, on_topics, on_wifi_credentials, on_wifi_mode};
use crate::radio::LoggedStation;

mod board;
mod channels;
mod radio;
mod tasks;

bind_interrupts!(struct Irqs {
    PIO0_IRQ_0 => embassy_rp::pio::InterruptHandler<PIO0>;
});

// Static cells for state shared by tasks (must live forever)
static STORE: StaticCell<Store> = StaticCell::new();
static ENGINE: StaticCell<Engine> = StaticCell::new();
static CONTROLLER: StaticCell<Controller> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Pixelnode firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let mut flash = board_flash(p.FLASH);
    let mac = match board_id(&mut flash) {
        Ok(id) => mac_from_id(id),
        Err(e) => {
            warn!("flash ID unavailable: {}", e);
            [0x02, 0, 0, 0, 0, 0]
        }
    };
    let hostname = device::default_hostname(HOSTNAME_PREFIX, mac);

    let store = match open_store(flash, &hostname) {
        Ok(store) => store,
        Err(e) => {
            // Config region constants are wrong for this board
            error!("config region unusable: {}", e);
            return;
        }
    };
    let store: &'static Store = STORE.init(Mutex::new(RefCell::new(store)));

    // Strip output on PIO0
    let Pio {
        mut common, sm0, ..
    } = Pio::new(p.PIO0, Irqs);
    let strip = PioStrip::new(&mut common, sm0, p.PIN_2);

    let (count, channels) = store.lock(|s| {
        let s = s.borrow();
        (s.int(PARAM_COUNT), s.int(PARAM_CHANNELS))
    });
    let count = count.and_then(|c| u16::try_from(c).ok()).unwrap_or(1);
    let channels = channels.and_then(|c| u8::try_from(c).ok()).unwrap_or(3);
    let led_controller = match LedEngine::new(strip, count, channels) {
        Ok(engine) => {
            let engine: &'static Engine = ENGINE.init(SharedEngine::new(engine));
            let controller: &'static Controller =
                CONTROLLER.init(StripController::new(engine, store, &BROKER));
            info!("LED strip initialized: {=u16} pixels", count);
            Some(controller)
        }
        Err(e) => {
            error!("LED strip not started: {}", e);
            None
        }
    };

    // Peripherals
    let button = Input::new(p.PIN_15, Pull::Up);
    let status_led = Output::new(p.PIN_16, Level::Low);
    let binary_input = Input::new(p.PIN_14, Pull::Down);
    let adc = Adc::new_blocking(p.ADC, Default::default());
    let light = AdcChannel::new_pin(p.PIN_26, Pull::None);
    let ambient_adc = BoardAdc::new(adc, light);
    let wifi_setup = WifiSetup::new(store, LoggedStation::new(mac));

    // Spawn tasks
    spawner.spawn(tasks::publish_drain_task()).unwrap();
    spawner.spawn(tasks::setup_button_task(button, store)).unwrap();
    spawner.spawn(tasks::status_led_task(status_led, store)).unwrap();
    spawner.spawn(tasks::ambient_task(ambient_adc, store)).unwrap();
    spawner
        .spawn(tasks::binary_sensor_task(binary_input, store))
        .unwrap();
    spawner.spawn(tasks::wifi_task(wifi_setup)).unwrap();
    if let Some(controller) = led_controller {
        spawner.spawn(tasks::led_fade_task(controller)).unwrap();
        spawner.spawn(tasks::led_reconfigure_task(controller)).unwrap();
        spawner.spawn(tasks::led_control_task(controller)).unwrap();
        spawner.spawn(tasks::topic_task(controller)).unwrap();
    }

    info!("All tasks spawned, firmware running");

    // Keeps the PIO common block alive
    loop {
        embassy_time::Timer::after_secs(60).await;
        trace!("Main loop heartbeat");
    }
}

/// Register every parameter and restore stored values
///
/// A corrupt region is erased so the next save starts clean; any other
/// load failure keeps the defaults.
fn open_store(
    flash: BoardFlash<'static>,
    hostname: &str,
) -> Result<ConfigStore<'static, BoardFlash<'static>>, FlashError> {
    let mut store = ConfigStore::new(config_region(flash)?, true);

    if let Err(e) = register_params(&mut store, hostname) {
        error!("parameter registration failed: {}", e);
    }

    match store.load() {
        Ok(report) => info!(
            "Loaded configuration from flash ({=usize} params)",
            report.loaded
        ),
        Err(ConfigError::StoreCorrupt) => {
            warn!("Stored configuration corrupt, erasing");
            if let Err(e) = store.erase() {
                error!("config erase failed: {}", e);
            }
        }
        Err(e) => warn!("Stored configuration not loaded, using defaults: {}", e),
    }
    Ok(store)
}

fn register_params(
    store: &mut ConfigStore<'static, BoardFlash<'static>>,
    hostname: &str,
) -> Result<(), ConfigError> {
    device::register_params(store, hostname)?;
    wifi::register_params(store, &on_wifi_credentials, &on_wifi_mode)?;
    led::register_params(store, &on_led_geometry, &on_topics)?;
    ambient::register_params(store)?;
    binary::register_params(store, BINARY_TOPIC_PARAM, BINARY_TOPIC_DEFAULT)
}
