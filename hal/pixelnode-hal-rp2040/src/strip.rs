//! PIO-driven WS2812 / SK6812 output
//!
//! One PIO state machine shifts the frame out MSB first at 800 kbit/s.
//! Bytes are pushed one per FIFO word with an 8-bit autopull threshold,
//! so frames of 3 and 4 bytes per pixel use the same program.
//!
//! Bit timing in PIO cycles:
//!
//! ```text
//!        T1 (2)   T2 (5)    T3 (3)
//! 1 bit: ‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾______
//! 0 bit: ‾‾‾‾‾‾___________________
//! ```

use embassy_rp::clocks::clk_sys_freq;
use embassy_rp::pio::{
    Common, Config, FifoJoin, Instance, PioPin, ShiftConfig, ShiftDirection, StateMachine,
};
use embassy_rp::Peri;
use embassy_time::{block_for, Duration};
use fixed::types::U24F8;
use pixelnode_hal::{PixelStrip, StripError};

const T1: u32 = 2;
const T2: u32 = 5;
const T3: u32 = 3;
const CYCLES_PER_BIT: u32 = T1 + T2 + T3;

/// Line rate in kbit/s
const BIT_RATE_KHZ: u32 = 800;

/// Low time that latches the frame into the pixels
const RESET_US: u64 = 300;

/// FIFO polls before a push is abandoned
const PUSH_SPIN_LIMIT: u32 = 100_000;

/// WS2812 output on one PIO state machine
pub struct PioStrip<'d, P: Instance, const S: usize> {
    sm: StateMachine<'d, P, S>,
}

impl<'d, P: Instance, const S: usize> PioStrip<'d, P, S> {
    /// Load the program into `common` and start `sm` driving `pin`
    pub fn new(
        common: &mut Common<'d, P>,
        mut sm: StateMachine<'d, P, S>,
        pin: Peri<'d, impl PioPin>,
    ) -> Self {
        let program = pio_proc::pio_asm!(
            ".side_set 1",
            ".wrap_target",
            "bitloop:",
            "    out x, 1        side 0 [2]",
            "    jmp !x do_zero  side 1 [1]",
            "    jmp bitloop     side 1 [4]",
            "do_zero:",
            "    nop             side 0 [4]",
            ".wrap",
        );

        let out_pin = common.make_pio_pin(pin);
        let loaded = common.load_program(&program.program);

        let mut cfg = Config::default();
        cfg.use_program(&loaded, &[&out_pin]);
        let clock_khz = U24F8::from_num(clk_sys_freq() / 1000);
        cfg.clock_divider = clock_khz / U24F8::from_num(BIT_RATE_KHZ * CYCLES_PER_BIT);
        cfg.fifo_join = FifoJoin::TxOnly;
        cfg.shift_out = ShiftConfig {
            auto_fill: true,
            threshold: 8,
            direction: ShiftDirection::Left,
        };

        sm.set_config(&cfg);
        sm.set_pin_dirs(embassy_rp::pio::Direction::Out, &[&out_pin]);
        sm.set_enable(true);

        Self { sm }
    }
}

impl<P: Instance, const S: usize> PixelStrip for PioStrip<'_, P, S> {
    fn write(&mut self, data: &[u8]) -> Result<(), StripError> {
        let tx = self.sm.tx();
        for &byte in data {
            let word = u32::from(byte) << 24;
            let mut spins = 0;
            while !tx.try_push(word) {
                spins += 1;
                if spins > PUSH_SPIN_LIMIT {
                    return Err(StripError::Timeout);
                }
            }
        }

        let mut spins = 0;
        while !tx.empty() {
            spins += 1;
            if spins > PUSH_SPIN_LIMIT {
                return Err(StripError::Timeout);
            }
        }
        block_for(Duration::from_micros(RESET_US));
        Ok(())
    }
}
