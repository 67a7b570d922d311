//! SliceOS kernel core.
//!
//! A single-core teaching kernel: fixed-capacity process table, round-robin
//! scheduling with a time slice, FIFO-fair kernel mutexes and mailbox IPC,
//! all reached from processes through a thirteen-call system call gate.
//!
//! The core is hardware-agnostic. [`Kernel`] is generic over
//! [`khal::Platform`]; tests run it on [`khal::SimPlatform`] and bare metal
//! runs it on the PC platform through [`arch`].
#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod arch;
pub mod config;
pub mod console;
pub mod error;
pub mod ipc;
pub mod kernel;
pub mod queue;
pub mod sync;
pub mod syscall;
pub mod task;
mod util;

pub use config::KernelConfig;
pub use console::{Command, Console};
pub use error::{KernelError, KernelResult};
pub use ipc::{MSG_WIRE_SIZE, Mailbox, MailboxTable, Message};
pub use kernel::Kernel;
pub use queue::SlotQueue;
pub use sync::{KernelMutex, MutexTable};
pub use task::{Pid, Process, ProcessState, ProcessTable, Program, Scheduler, Transition, TrapFrame};
