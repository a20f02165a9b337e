//! Config region placement
//!
//! The parameter store takes one 4 KiB block near the top of the 2 MiB
//! on-board flash. The blocks above it are left to the network stack's
//! own data.

use embassy_rp::flash::{Blocking, Flash, ERASE_SIZE};
use embassy_rp::peripherals::FLASH;
use embassy_rp::Peri;
use pixelnode_hal::{ConfigRegion, FlashError, BLOCK_SIZE};

/// On-board flash of the Pico W
pub const FLASH_SIZE: usize = 2 * 1024 * 1024;

/// Blocks between the config region and the end of flash, inclusive
pub const RESERVED_BLOCKS: usize = 19;

/// Byte offset of the config region
pub const CONFIG_OFFSET: u32 = (FLASH_SIZE - RESERVED_BLOCKS * BLOCK_SIZE) as u32;

const _: () = assert!(CONFIG_OFFSET as usize % ERASE_SIZE == 0);

pub type BoardFlash<'d> = Flash<'d, FLASH, Blocking, FLASH_SIZE>;

pub fn board_flash(flash: Peri<'_, FLASH>) -> BoardFlash<'_> {
    Flash::new_blocking(flash)
}

/// 64-bit unique ID of the flash chip
pub fn board_id(flash: &mut BoardFlash<'_>) -> Result<[u8; 8], FlashError> {
    let mut id = [0u8; 8];
    flash
        .blocking_unique_id(&mut id)
        .map_err(|_| FlashError::Flash)?;
    Ok(id)
}

/// Bind the config region in on-board flash
pub fn config_region(flash: BoardFlash<'_>) -> Result<ConfigRegion<BoardFlash<'_>>, FlashError> {
    ConfigRegion::new(flash, CONFIG_OFFSET)
}
