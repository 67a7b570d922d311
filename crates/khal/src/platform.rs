//! The capability interface between the kernel core and the machine.

use core::fmt;

use crate::display::Attr;

/// A user-memory access touched an address the platform cannot map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryFault {
    /// First address of the rejected access.
    pub addr: u64,
    /// Length of the rejected access in bytes.
    pub len: usize,
}

impl fmt::Display for MemoryFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bad user access at {:#x} (+{} bytes)", self.addr, self.len)
    }
}

/// Interrupt lines a legacy PIC pair exposes. Masking calls for lines at
/// or above this are ignored.
pub const IRQ_LINES: u8 = 16;

/// Machine capabilities the kernel calls but never implements.
///
/// IRQ numbers are controller lines (0 = timer, 1 = keyboard), not
/// interrupt vectors. All methods are invoked from inside the kernel's
/// trap path with interrupts disabled.
pub trait Platform {
    /// Unmask interrupt line `irq`.
    fn enable_irq(&mut self, irq: u8);

    /// Mask interrupt line `irq`.
    fn disable_irq(&mut self, irq: u8);

    /// Signal end-of-interrupt for `irq` so the controller can deliver
    /// the next one.
    fn acknowledge_irq(&mut self, irq: u8);

    /// Return one pending keyboard character, if any.
    fn poll_key(&mut self) -> Option<char>;

    /// Blank the text display.
    fn clear_screen(&mut self);

    /// Paint `text` at (`row`, `col`) using display attribute `attr`.
    fn paint(&mut self, row: usize, col: usize, attr: Attr, text: &str);

    /// Stop the machine. Does not return on real hardware.
    fn halt(&mut self);

    /// Copy `buf.len()` bytes starting at user address `addr` into `buf`.
    fn copy_from_user(&self, addr: u64, buf: &mut [u8]) -> Result<(), MemoryFault>;

    /// Copy `data` into user memory starting at `addr`.
    fn copy_to_user(&mut self, addr: u64, data: &[u8]) -> Result<(), MemoryFault>;
}
