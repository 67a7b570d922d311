//! 8253/8254 PIT (Programmable Interval Timer), channel 0.
//!
//! Channel 0 drives IRQ 0. The kernel programs it once at boot as a
//! rate generator so the timer interrupt fires at a fixed frequency.

use crate::port::outb;

/// Input clock of the PIT in Hz.
pub const BASE_FREQUENCY: u32 = 1_193_182;

const CHANNEL0_DATA: u16 = 0x40;
const COMMAND: u16 = 0x43;

/// Channel 0, lobyte/hibyte access, mode 2 (rate generator), binary.
const CHANNEL0_RATE_GENERATOR: u8 = 0b0011_0100;

/// Reload value for an interrupt rate of `hz`, clamped to what the
/// 16-bit counter can express.
pub fn divisor(hz: u32) -> u16 {
    let raw = BASE_FREQUENCY / hz.max(1);
    raw.clamp(1, u16::MAX as u32) as u16
}

/// Program channel 0 to interrupt `hz` times per second.
pub fn set_frequency(hz: u32) {
    let [lo, hi] = divisor(hz).to_le_bytes();
    unsafe {
        outb(COMMAND, CHANNEL0_RATE_GENERATOR);
        outb(CHANNEL0_DATA, lo);
        outb(CHANNEL0_DATA, hi);
    }
}
