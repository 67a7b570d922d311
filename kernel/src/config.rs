//! Kernel configuration.
//!
//! Capacities are compile-time constants: every table in the kernel is a
//! fixed array sized here. Values that only change behaviour, not layout,
//! live in [`KernelConfig`].

/// Maximum number of live processes (process table slots).
pub const PROC_MAX: usize = 24;

/// Process names are truncated to this many bytes.
pub const PROC_NAME_LEN: usize = 32;

/// Stack size of every process (8 KiB).
pub const PROC_STACK_SIZE: usize = 8192;

/// Default time slice in timer ticks.
pub const PROC_TIMESLICE: u64 = 5;

/// Capacity of every slot queue (run queue, free lists, wait queues).
/// Must exceed [`PROC_MAX`] so a wait queue can never overflow.
pub const QUEUE_SIZE: usize = 64;

/// Number of kernel mutexes.
pub const MUTEX_MAX: usize = 16;

/// Number of preallocated mailboxes.
pub const MBOX_MAX: usize = 10;

/// Messages each mailbox can buffer.
pub const MBOX_SIZE: usize = 64;

/// Opaque payload bytes carried by a message.
pub const MSG_SIZE: usize = 256;

/// Default timer frequency.
pub const TICKS_PER_SECOND: u64 = 100;

/// Timer IRQ line.
pub const TIMER_IRQ: u8 = 0;

/// Vector the timer IRQ is remapped to.
pub const TIMER_VECTOR: u64 = 0x20;

/// Software interrupt vector of the system call gate.
pub const SYSCALL_VECTOR: u64 = 0x80;

const _: () = assert!(QUEUE_SIZE > PROC_MAX);

/// Runtime-tunable kernel behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelConfig {
    /// Ticks a process may stay Active before it is preempted.
    pub time_slice: u64,
    /// Timer ticks per second; converts `sleep`/`get_time` seconds.
    pub ticks_per_second: u64,
    /// Whether the statistics panel is painted from boot.
    pub show_stats: bool,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            time_slice: PROC_TIMESLICE,
            ticks_per_second: TICKS_PER_SECOND,
            show_stats: true,
        }
    }
}
