//! Raw NOR flash configuration region
//!
//! The configuration store lives in exactly one erase block of the
//! device's NOR flash. [`ConfigRegion`] binds any
//! [`embedded_storage::nor_flash::NorFlash`] implementation to that block
//! and exposes the three operations the store needs: read the whole block,
//! erase it, and program it from the start.

use embedded_storage::nor_flash::{NorFlash, NorFlashError, NorFlashErrorKind};

/// Size of the configuration region in bytes (one erase block)
pub const BLOCK_SIZE: usize = 4096;

/// Errors from configuration region operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashError {
    /// Underlying flash operation failed
    Flash,
    /// Region does not fit inside the device
    OutOfBounds,
    /// Offset or length violates the device's alignment rules
    Unaligned,
    /// Data longer than the region
    TooLarge,
}

impl FlashError {
    fn from_nor<E: NorFlashError>(err: E) -> Self {
        match err.kind() {
            NorFlashErrorKind::NotAligned => FlashError::Unaligned,
            NorFlashErrorKind::OutOfBounds => FlashError::OutOfBounds,
            _ => FlashError::Flash,
        }
    }
}

/// One erase block of NOR flash reserved for configuration records
pub struct ConfigRegion<F> {
    flash: F,
    offset: u32,
}

impl<F: NorFlash> ConfigRegion<F> {
    /// Bind the region at `offset` bytes from the start of `flash`
    ///
    /// The offset must be aligned to the device's erase size, and
    /// [`BLOCK_SIZE`] must be a whole number of erase units.
    pub fn new(flash: F, offset: u32) -> Result<Self, FlashError> {
        if offset as usize % F::ERASE_SIZE != 0 || BLOCK_SIZE % F::ERASE_SIZE != 0 {
            return Err(FlashError::Unaligned);
        }
        if offset as usize + BLOCK_SIZE > flash.capacity() {
            return Err(FlashError::OutOfBounds);
        }
        Ok(Self { flash, offset })
    }

    /// Byte offset of the region within the device
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Round `len` up to the device's write granularity
    pub fn write_len(len: usize) -> usize {
        len.div_ceil(F::WRITE_SIZE) * F::WRITE_SIZE
    }

    /// Read the start of the region into `buffer`
    pub fn read(&mut self, buffer: &mut [u8]) -> Result<(), FlashError> {
        if buffer.len() > BLOCK_SIZE {
            return Err(FlashError::TooLarge);
        }
        self.flash
            .read(self.offset, buffer)
            .map_err(FlashError::from_nor)
    }

    /// Erase the whole region to 0xFF
    pub fn erase(&mut self) -> Result<(), FlashError> {
        self.flash
            .erase(self.offset, self.offset + BLOCK_SIZE as u32)
            .map_err(FlashError::from_nor)
    }

    /// Program `data` at the start of the region
    ///
    /// The region must have been erased first. `data.len()` must be a
    /// multiple of the write size; see [`ConfigRegion::write_len`].
    pub fn write(&mut self, data: &[u8]) -> Result<(), FlashError> {
        if data.len() > BLOCK_SIZE {
            return Err(FlashError::TooLarge);
        }
        if data.len() % F::WRITE_SIZE != 0 {
            return Err(FlashError::Unaligned);
        }
        if data.is_empty() {
            return Ok(());
        }
        self.flash
            .write(self.offset, data)
            .map_err(FlashError::from_nor)
    }

    /// Release the underlying flash device
    pub fn into_inner(self) -> F {
        self.flash
    }

    /// Access the underlying flash device
    pub fn inner(&self) -> &F {
        &self.flash
    }
}
