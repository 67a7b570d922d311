//! Saved execution context of a process.
//!
//! Every trap pushes a full register frame. The kernel copies it into the
//! interrupted process's PCB, works on the copy, and hands the entry stub
//! the frame of whichever process should run next.

use bitflags::bitflags;

/// Kernel code segment selector. Processes run in ring 0.
pub const KERNEL_CODE_SELECTOR: u64 = 0x08;
/// Kernel data/stack segment selector.
pub const KERNEL_DATA_SELECTOR: u64 = 0x10;

bitflags! {
    /// The subset of RFLAGS the kernel cares about.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RFlags: u64 {
        /// Bit 1 reads as one on every x86 CPU.
        const RESERVED_1 = 1 << 1;
        /// Maskable interrupts enabled.
        const INTERRUPT = 1 << 9;
    }
}

/// Register frame saved on every trap.
///
/// Layout must match the push order of the trap entry stub: general
/// registers in reverse, then the vector and error code, then the
/// five words the CPU pushes itself.
///
/// System calls use `rax` for the call number and the result, and
/// `rbx`/`rcx`/`rdx` for the three arguments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct TrapFrame {
    pub r15: u64,
    pub r14: u64,
    pub r13: u64,
    pub r12: u64,
    pub r11: u64,
    pub r10: u64,
    pub r9: u64,
    pub r8: u64,
    pub rbp: u64,
    pub rdi: u64,
    pub rsi: u64,
    pub rdx: u64,
    pub rcx: u64,
    pub rbx: u64,
    pub rax: u64,
    /// Interrupt vector that caused the trap.
    pub vector: u64,
    pub error_code: u64,
    pub rip: u64,
    pub cs: u64,
    pub rflags: u64,
    pub rsp: u64,
    pub ss: u64,
}

impl TrapFrame {
    /// Frame that starts execution at `entry` on a fresh stack whose
    /// highest address is `stack_top`, with interrupts enabled.
    pub fn new(entry: u64, stack_top: u64) -> Self {
        Self {
            rip: entry,
            cs: KERNEL_CODE_SELECTOR,
            ss: KERNEL_DATA_SELECTOR,
            rflags: (RFlags::RESERVED_1 | RFlags::INTERRUPT).bits(),
            // Entry sees the stack as if `call` had pushed a return address.
            rsp: stack_top - 8,
            ..Self::default()
        }
    }

    /// Decoded RFLAGS, ignoring bits the kernel does not model.
    pub fn flags(&self) -> RFlags {
        RFlags::from_bits_truncate(self.rflags)
    }

    /// System call number.
    #[inline]
    pub fn syscall_number(&self) -> u64 {
        self.rax
    }

    /// The three system call arguments.
    #[inline]
    pub fn syscall_args(&self) -> [u64; 3] {
        [self.rbx, self.rcx, self.rdx]
    }

    /// Store a system call result where the caller will read it.
    #[inline]
    pub fn set_return(&mut self, value: i64) {
        self.rax = value as u64;
    }

    /// Result previously stored with [`set_return`](Self::set_return).
    #[inline]
    pub fn return_value(&self) -> i64 {
        self.rax as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_frame_enables_interrupts() {
        let frame = TrapFrame::new(0x4000, 0x9000);
        assert!(frame.flags().contains(RFlags::INTERRUPT));
        assert_eq!(frame.rip, 0x4000);
        assert_eq!(frame.rsp, 0x8FF8);
        assert_eq!(frame.cs, KERNEL_CODE_SELECTOR);
    }

    #[test]
    fn negative_results_round_trip_through_rax() {
        let mut frame = TrapFrame::default();
        frame.set_return(-1);
        assert_eq!(frame.rax, u64::MAX);
        assert_eq!(frame.return_value(), -1);
    }
}
