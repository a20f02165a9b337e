//! Addressable LED strip output
//!
//! The strip receives the raw output buffer exactly as laid out by the
//! animation engine: 3 bytes (G, R, B) or 4 bytes (G, R, B, W) per pixel,
//! first pixel first.

/// Errors from a strip transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StripError {
    /// Frame longer than the driver can transfer
    TooLong,
    /// Transfer did not complete in time
    Timeout,
}

/// Addressable pixel strip (WS2812, SK6812 and compatible)
pub trait PixelStrip {
    /// Transfer one complete frame to the strip
    fn write(&mut self, data: &[u8]) -> Result<(), StripError>;
}

impl<T: PixelStrip + ?Sized> PixelStrip for &mut T {
    fn write(&mut self, data: &[u8]) -> Result<(), StripError> {
        (**self).write(data)
    }
}
