//! Legacy 8259 PIC (Programmable Interrupt Controller) driver.
//!
//! The kernel drives all of its interrupts through the chained 8259 pair.
//! By default IRQ 0-7 land on vectors 0x08-0x0F, overlapping CPU
//! exceptions, so [`remap`] moves them to 0x20-0x2F before any line is
//! unmasked. The timer (IRQ 0) then arrives on vector 0x20.

use crate::platform::IRQ_LINES;
use crate::port::{inb, io_wait, outb};

/// I/O port addresses for the master PIC.
const PIC1_COMMAND: u16 = 0x20;
const PIC1_DATA: u16 = 0x21;

/// I/O port addresses for the slave PIC.
const PIC2_COMMAND: u16 = 0xA0;
const PIC2_DATA: u16 = 0xA1;

/// ICW1: begin initialization, ICW4 will follow.
const ICW1_INIT_ICW4: u8 = 0x11;
/// ICW4: 8086/88 mode.
const ICW4_8086: u8 = 0x01;
/// OCW2: non-specific end of interrupt.
const PIC_EOI: u8 = 0x20;

/// Vector of IRQ 0 after remapping.
pub const PIC1_OFFSET: u8 = 0x20;
/// Vector of IRQ 8 after remapping.
pub const PIC2_OFFSET: u8 = 0x28;

/// Master line the slave is cascaded on.
const CASCADE_IRQ: u8 = 2;

/// Remap both PICs to [`PIC1_OFFSET`]/[`PIC2_OFFSET`] and mask every line.
pub fn remap() {
    unsafe {
        outb(PIC1_COMMAND, ICW1_INIT_ICW4);
        io_wait();
        outb(PIC2_COMMAND, ICW1_INIT_ICW4);
        io_wait();

        outb(PIC1_DATA, PIC1_OFFSET);
        io_wait();
        outb(PIC2_DATA, PIC2_OFFSET);
        io_wait();

        outb(PIC1_DATA, 1 << CASCADE_IRQ);
        io_wait();
        outb(PIC2_DATA, CASCADE_IRQ);
        io_wait();

        outb(PIC1_DATA, ICW4_8086);
        io_wait();
        outb(PIC2_DATA, ICW4_8086);
        io_wait();

        outb(PIC1_DATA, 0xFF);
        outb(PIC2_DATA, 0xFF);
    }
}

/// Data port and bit index for `irq`, or `None` past the slave PIC.
fn line(irq: u8) -> Option<(u16, u8)> {
    match irq {
        0..8 => Some((PIC1_DATA, irq)),
        8..IRQ_LINES => Some((PIC2_DATA, irq - 8)),
        _ => None,
    }
}

/// New mask byte after masking or unmasking bit `bit`.
fn with_bit(mask: u8, bit: u8, masked: bool) -> u8 {
    if masked {
        mask | (1 << bit)
    } else {
        mask & !(1 << bit)
    }
}

/// Mask or unmask a single IRQ line. Unmasking a slave line also
/// unmasks the cascade on the master.
pub fn set_masked(irq: u8, masked: bool) {
    let Some((port, bit)) = line(irq) else {
        return;
    };
    unsafe {
        let mask = inb(port);
        outb(port, with_bit(mask, bit, masked));
        if irq >= 8 && !masked {
            let master = inb(PIC1_DATA);
            outb(PIC1_DATA, with_bit(master, CASCADE_IRQ, false));
        }
    }
}

/// Send end-of-interrupt for `irq`.
pub fn end_of_interrupt(irq: u8) {
    unsafe {
        if irq >= 8 {
            outb(PIC2_COMMAND, PIC_EOI);
        }
        outb(PIC1_COMMAND, PIC_EOI);
    }
}
