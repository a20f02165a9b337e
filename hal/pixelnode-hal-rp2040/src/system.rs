//! Device restart

use cortex_m::peripheral::SCB;
use pixelnode_hal::SystemReset;

#[derive(Debug, Default)]
pub struct BoardReset;

impl SystemReset for BoardReset {
    fn reset(&mut self) {
        SCB::sys_reset()
    }
}
