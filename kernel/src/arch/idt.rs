//! Interrupt Descriptor Table for x86_64.
//!
//! SliceOS routes only two vectors into the kernel, the timer and the
//! system call gate. Every other entry stays not-present, so a stray
//! exception escalates to a triple fault rather than running unknown code.

use core::mem::size_of;

use x86_64::VirtAddr;
use x86_64::instructions::tables::lidt;
use x86_64::structures::DescriptorTablePointer;

const IDT_ENTRIES: usize = 256;

/// Present, DPL 0, 64-bit interrupt gate (IF cleared on entry).
const INTERRUPT_GATE: u16 = 0b1000_1110_0000_0000;

/// One 16-byte gate descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C, packed)]
pub struct Gate {
    offset_low: u16,
    selector: u16,
    options: u16,
    offset_mid: u16,
    offset_high: u32,
    reserved: u32,
}

impl Gate {
    pub const fn missing() -> Self {
        Self {
            offset_low: 0,
            selector: 0,
            options: 0,
            offset_mid: 0,
            offset_high: 0,
            reserved: 0,
        }
    }

    /// Interrupt gate to `handler` in code segment `selector`.
    pub const fn interrupt(handler: u64, selector: u16) -> Self {
        Self {
            offset_low: handler as u16,
            selector,
            options: INTERRUPT_GATE,
            offset_mid: (handler >> 16) as u16,
            offset_high: (handler >> 32) as u32,
            reserved: 0,
        }
    }

    pub fn handler(&self) -> u64 {
        (self.offset_low as u64) | ((self.offset_mid as u64) << 16) | ((self.offset_high as u64) << 32)
    }

    pub fn is_present(&self) -> bool {
        self.options & (1 << 15) != 0
    }
}

#[repr(C, align(16))]
pub struct Idt {
    gates: [Gate; IDT_ENTRIES],
}

impl Idt {
    pub const fn new() -> Self {
        Self {
            gates: [Gate::missing(); IDT_ENTRIES],
        }
    }

    pub fn set(&mut self, vector: u8, gate: Gate) {
        self.gates[vector as usize] = gate;
    }

    pub fn gate(&self, vector: u8) -> &Gate {
        &self.gates[vector as usize]
    }

    /// Load this table with `lidt`.
    ///
    /// # Safety
    /// Every present gate must point at a valid trap entry stub.
    pub unsafe fn load(&'static self) {
        let pointer = DescriptorTablePointer {
            limit: (size_of::<Self>() - 1) as u16,
            base: VirtAddr::new(self as *const Self as u64),
        };
        unsafe { lidt(&pointer) };
    }
}

impl Default for Idt {
    fn default() -> Self {
        Self::new()
    }
}
