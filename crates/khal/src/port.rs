//! Byte-wide x86 port I/O.

use x86_64::instructions::port::Port;

/// Read a byte from an I/O port.
///
/// # Safety
/// Reading some ports has side effects on the device behind them.
#[inline]
pub unsafe fn inb(port: u16) -> u8 {
    unsafe { Port::<u8>::new(port).read() }
}

/// Write a byte to an I/O port.
///
/// # Safety
/// The caller must know what the device at `port` does with `value`.
#[inline]
pub unsafe fn outb(port: u16, value: u8) {
    unsafe { Port::<u8>::new(port).write(value) }
}

/// Short delay by writing to the unused POST diagnostic port.
/// Old 8259s need a pause between initialization words.
#[inline]
pub fn io_wait() {
    unsafe { outb(0x80, 0) }
}
