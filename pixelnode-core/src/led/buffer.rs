//! Pixel output buffer
//!
//! ```text
//! 3 channels:  | G R B | G R B | G R B | ...
//! 4 channels:  | G R B W | G R B W | ...
//!                pixel 1   pixel 2
//! ```

use heapless::Vec;

use super::expr::{Color, PixelRange};
use super::LedError;

/// Largest supported strip
pub const MAX_PIXELS: u16 = 500;

/// Bytes per pixel on a four-channel strip
pub const MAX_CHANNELS: u8 = 4;

/// Largest frame in bytes
pub const MAX_FRAME_LEN: usize = MAX_PIXELS as usize * MAX_CHANNELS as usize;

/// Frame buffer laid out exactly as the strip expects it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    data: Vec<u8, MAX_FRAME_LEN>,
    count: u16,
    channels: u8,
}

impl PixelBuffer {
    /// An all-black buffer
    ///
    /// # Arguments
    /// * `count` - Pixels, 1 to [`MAX_PIXELS`]
    /// * `channels` - 3 (GRB) or 4 (GRBW)
    pub fn new(count: u16, channels: u8) -> Result<Self, LedError> {
        if count == 0 || count > MAX_PIXELS {
            return Err(LedError::InvalidCount);
        }
        if channels != 3 && channels != 4 {
            return Err(LedError::InvalidChannels);
        }
        let mut data = Vec::new();
        data.resize(count as usize * channels as usize, 0)
            .map_err(|_| LedError::InvalidCount)?;
        Ok(Self {
            data,
            count,
            channels,
        })
    }

    pub fn count(&self) -> u16 {
        self.count
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Channel bytes of pixel `index` (0-based)
    pub fn pixel(&self, index: usize) -> &[u8] {
        let stride = self.channels as usize;
        &self.data[index * stride..(index + 1) * stride]
    }

    /// Color of pixel `index` (0-based)
    pub fn color(&self, index: usize) -> Color {
        Color::from_wire(self.pixel(index))
    }

    /// Byte offsets covered by `range`
    pub fn span(&self, range: PixelRange) -> core::ops::Range<usize> {
        let stride = self.channels as usize;
        range.start as usize * stride..range.end as usize * stride
    }

    /// Write `color` to every pixel in `range`
    pub fn fill(&mut self, range: PixelRange, color: Color) {
        let wire = color.wire();
        let stride = self.channels as usize;
        let span = self.span(range);
        for pixel in self.data[span].chunks_exact_mut(stride) {
            pixel.copy_from_slice(&wire[..stride]);
        }
    }

    pub(crate) fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Whether any channel of any pixel is lit
    pub fn is_lit(&self) -> bool {
        self.data.iter().any(|&b| b != 0)
    }
}
