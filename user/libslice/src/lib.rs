//! libslice: the process side of the SliceOS system call interface.
//!
//! A process enters the kernel with `int 0x80`: call number in `rax`,
//! arguments in `rbx`, `rcx` and `rdx`, result back in `rax`. [`Sys`]
//! wraps each call in a typed method and [`Gate`] is the trap itself, so
//! the wrappers and the programs built on them also run on a development
//! host against a scripted gate.

#![cfg_attr(not(test), no_std)]

pub mod gate;
pub mod message;
pub mod nr;
pub mod programs;
pub mod sys;

#[cfg(target_arch = "x86_64")]
pub mod entry;

pub use gate::Gate;
#[cfg(target_arch = "x86_64")]
pub use gate::Int80;
pub use message::{MSG_SIZE, MSG_WIRE_SIZE, Message};
pub use programs::{Shared, WordRecord};
pub use sys::{Entry, NAME_BUF, Sys, SysError, SysResult};
