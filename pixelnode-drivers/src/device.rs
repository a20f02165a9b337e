//! Device-wide parameters

use core::fmt::Write;

use embedded_storage::nor_flash::NorFlash;
use heapless::String;
use pixelnode_core::config::{ConfigError, ConfigStore, Value};

/// Set once the setup flow has finished
pub const PARAM_CONFIGURED: &str = "configured";

/// Network name of the device
pub const PARAM_HOSTNAME: &str = "hostname";

/// Register `configured` (false) and `hostname`
pub fn register_params<F: NorFlash>(
    store: &mut ConfigStore<'_, F>,
    hostname: &str,
) -> Result<(), ConfigError> {
    store.add_param(PARAM_CONFIGURED, Value::Bool(false), None, None, None)?;
    store.add_param(PARAM_HOSTNAME, Value::str(hostname)?, None, None, None)
}

/// `<prefix>_<last three MAC bytes in hex>`, e.g. `neopixel_a1b2c3`
pub fn default_hostname(prefix: &str, mac: [u8; 6]) -> String<32> {
    let mut name = String::new();
    // Prefixes longer than 25 bytes are cut short
    let _ = write!(name, "{}_{:02x}{:02x}{:02x}", prefix, mac[3], mac[4], mac[5]);
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixelnode_hal::mock::MemFlash;
    use pixelnode_hal::{ConfigRegion, BLOCK_SIZE};

    #[test]
    fn test_register_defaults() {
        let region = ConfigRegion::new(MemFlash::<BLOCK_SIZE>::new(), 0).unwrap();
        let mut store = ConfigStore::new(region, false);
        register_params(&mut store, "strip_000001").unwrap();

        assert_eq!(store.bool(PARAM_CONFIGURED), Some(false));
        assert_eq!(store.str(PARAM_HOSTNAME), Some("strip_000001"));
    }

    #[test]
    fn test_default_hostname() {
        let mac = [0x02, 0x00, 0x00, 0xa1, 0xb2, 0xc3];
        assert_eq!(default_hostname("neopixel", mac).as_str(), "neopixel_a1b2c3");
    }
}
