//! Hardware Abstraction Layer.
//!
//! The kernel core never touches hardware directly. Everything it needs
//! from the machine (IRQ masking, keyboard input, text painting, access to
//! process memory) goes through the [`Platform`] trait defined here.
//!
//! Two implementations ship with this crate:
//! - [`sim::SimPlatform`]: a hosted model of the machine used by tests.
//! - [`pc::PcPlatform`]: the 8259 PIC / PS/2 / COM1 PC (x86_64 only).
#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod display;
pub mod platform;
pub mod sim;

#[cfg(target_arch = "x86_64")]
pub mod keyboard;
#[cfg(target_arch = "x86_64")]
pub mod pc;
#[cfg(target_arch = "x86_64")]
pub mod pic;
#[cfg(target_arch = "x86_64")]
pub mod pit;
#[cfg(target_arch = "x86_64")]
pub mod port;
#[cfg(target_arch = "x86_64")]
pub mod serial;

pub use display::Attr;
pub use platform::{IRQ_LINES, MemoryFault, Platform};
pub use sim::SimPlatform;

#[cfg(target_arch = "x86_64")]
pub use pc::PcPlatform;
#[cfg(target_arch = "x86_64")]
pub use serial::Serial;
