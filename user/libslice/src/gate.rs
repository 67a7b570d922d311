//! The trap into the kernel.

#[cfg(target_arch = "x86_64")]
use core::arch::asm;

/// Something that can carry a system call into the kernel.
pub trait Gate {
	/// Trap with call `nr` and `args` in `rbx`, `rcx`, `rdx`; returns `rax`.
	///
	/// # Safety
	/// Pointer arguments must be valid for whatever the kernel reads or
	/// writes through them for call `nr`.
	unsafe fn call(&mut self, nr: u64, args: [u64; 3]) -> i64;
}

/// The real gate: software interrupt 0x80.
#[cfg(target_arch = "x86_64")]
#[derive(Debug, Clone, Copy, Default)]
pub struct Int80;

#[cfg(target_arch = "x86_64")]
impl Gate for Int80 {
	#[inline(always)]
	unsafe fn call(&mut self, nr: u64, args: [u64; 3]) -> i64 {
		let ret: u64;
		// LLVM reserves rbx, so the first argument is swapped in and out
		// around the trap.
		unsafe {
			asm!(
				"xchg {a0}, rbx",
				"int 0x80",
				"xchg {a0}, rbx",
				a0 = inout(reg) args[0] => _,
				inlateout("rax") nr => ret,
				in("rcx") args[1],
				in("rdx") args[2],
			);
		}
		ret as i64
	}
}
