//! The IBM PC platform: 8259 PIC, 8254 timer, polled PS/2 keyboard,
//! COM1 terminal.
//!
//! All processes share the kernel's identity-mapped address space, so a
//! "user" address is simply a pointer. Only the null page is rejected.

use x86_64::instructions::{hlt, interrupts};

use crate::display::{self, Attr};
use crate::platform::{MemoryFault, Platform};
use crate::{keyboard, pic, pit, serial};

/// Addresses below this are treated as null.
const NULL_PAGE_END: u64 = 0x1000;

/// Platform backed by real PC hardware.
pub struct PcPlatform {
    _private: (),
}

impl PcPlatform {
    /// Bring up the serial terminal, the keyboard decoder, the PIC and
    /// the timer at `timer_hz`. Every IRQ line is masked afterwards.
    ///
    /// # Safety
    /// Must be called once, with interrupts disabled, before any other
    /// code touches the PIC, the PIT or COM1.
    pub unsafe fn init(timer_hz: u32) -> Self {
        serial::init();
        keyboard::init();
        pic::remap();
        pit::set_frequency(timer_hz);
        Self { _private: () }
    }

    fn check(addr: u64, len: usize) -> Result<(), MemoryFault> {
        let fault = MemoryFault { addr, len };
        if addr < NULL_PAGE_END || addr.checked_add(len as u64).is_none() {
            return Err(fault);
        }
        Ok(())
    }
}

impl Platform for PcPlatform {
    fn enable_irq(&mut self, irq: u8) {
        pic::set_masked(irq, false);
    }

    fn disable_irq(&mut self, irq: u8) {
        pic::set_masked(irq, true);
    }

    fn acknowledge_irq(&mut self, irq: u8) {
        pic::end_of_interrupt(irq);
    }

    fn poll_key(&mut self) -> Option<char> {
        keyboard::poll()
    }

    fn clear_screen(&mut self) {
        serial::write_str(display::CLEAR_SCREEN);
    }

    fn paint(&mut self, row: usize, col: usize, attr: Attr, text: &str) {
        serial::with_port(|port| {
            let _ = display::write_painted(port, row, col, attr, text);
        });
    }

    fn halt(&mut self) {
        interrupts::disable();
        loop {
            hlt();
        }
    }

    fn copy_from_user(&self, addr: u64, buf: &mut [u8]) -> Result<(), MemoryFault> {
        Self::check(addr, buf.len())?;
        // SAFETY: single shared address space, range checked above.
        unsafe {
            core::ptr::copy_nonoverlapping(addr as *const u8, buf.as_mut_ptr(), buf.len());
        }
        Ok(())
    }

    fn copy_to_user(&mut self, addr: u64, data: &[u8]) -> Result<(), MemoryFault> {
        Self::check(addr, data.len())?;
        // SAFETY: as above.
        unsafe {
            core::ptr::copy_nonoverlapping(data.as_ptr(), addr as *mut u8, data.len());
        }
        Ok(())
    }
}
