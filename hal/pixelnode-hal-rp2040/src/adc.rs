//! ADC input
//!
//! The RP2040 ADC is 12 bit; readings are raw counts 0..=4095. Channels
//! ADC0..ADC3 are on GPIO26..GPIO29.

use embassy_rp::adc::{Adc, Blocking, Channel};
use pixelnode_hal::{AnalogError, AnalogInput};

/// One ADC channel with its own converter handle
pub struct BoardAdc<'d> {
    adc: Adc<'d, Blocking>,
    channel: Channel<'d>,
}

impl<'d> BoardAdc<'d> {
    pub fn new(adc: Adc<'d, Blocking>, channel: Channel<'d>) -> Self {
        Self { adc, channel }
    }
}

impl AnalogInput for BoardAdc<'_> {
    fn read(&mut self) -> Result<u16, AnalogError> {
        self.adc
            .blocking_read(&mut self.channel)
            .map_err(|_| AnalogError::Conversion)
    }
}
