//! Task scheduler and process management.

pub mod clock;
pub mod context;
pub mod process;
pub mod scheduler;

pub use clock::Clock;
pub use context::{RFlags, TrapFrame};
pub use process::{Pid, Process, ProcessName, ProcessState, ProcessTable};
pub use scheduler::{Scheduler, Transition};

/// A program the kernel can start: a name and an entry address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Program {
    pub name: &'static str,
    pub entry: u64,
}

impl Program {
    pub const fn new(name: &'static str, entry: u64) -> Self {
        Self { name, entry }
    }
}
