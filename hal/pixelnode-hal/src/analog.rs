//! Analog input abstraction

/// Errors from an analog conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AnalogError {
    /// Conversion did not complete
    Conversion,
}

/// A single ADC channel
///
/// Readings are raw converter counts; scaling is left to the caller.
pub trait AnalogInput {
    /// Take one blocking reading
    fn read(&mut self) -> Result<u16, AnalogError>;
}
