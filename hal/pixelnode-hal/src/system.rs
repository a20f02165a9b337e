//! Whole-device control

/// Restart the device
pub trait SystemReset {
    /// Request a reset; on hardware this does not return
    fn reset(&mut self);
}
