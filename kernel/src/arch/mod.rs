// =============================================================================
// SliceOS: Architecture Glue
// =============================================================================
//
// Everything above this module is hardware-agnostic: the kernel sees the
// machine only through `khal::Platform` and sees a trap only as a
// `TrapFrame`. This module is where those two meet real x86_64 silicon.
//
//   idt.rs : the interrupt descriptor table (timer + syscall gates)
//   trap.rs: naked entry stubs, the kernel singleton, `start()` and
//            `start_with_programs()` for the stock `libslice` programs
//
// The trap path only builds for a freestanding target. Hosted builds
// (tests) get the table encoding and nothing that executes privileged
// instructions.
// =============================================================================

#[cfg(target_arch = "x86_64")]
pub mod idt;

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
pub mod trap;

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
pub use trap::{start, start_with_programs};
