//! Recoverable kernel errors.
//!
//! Anything here is reported back to the calling process as a negative
//! syscall result. Broken invariants are not errors; they panic.

use core::fmt;

use khal::MemoryFault;

/// Recoverable failure of a kernel operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// No free process table slot.
    TableFull,
    /// No free mutex id.
    NoFreeMutex,
    /// Mailbox buffer already holds its maximum message count.
    MailboxFull,
    /// Mutex id out of range or not allocated.
    InvalidMutex(u64),
    /// Mailbox id out of range.
    InvalidMailbox(u64),
    /// Caller does not own the mutex it tried to unlock.
    NotOwner,
    /// Mutex is locked or has pending acquirers.
    MutexHeld,
    /// User pointer was null or unmapped.
    BadAddress(u64),
    /// The call needs a current process and there is none.
    NoCurrentProcess,
    /// The idle process cannot be destroyed.
    IdleProcess,
}

impl KernelError {
    /// Value handed back to user code in place of a result.
    pub const fn sentinel(&self) -> i64 {
        -1
    }
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::TableFull => write!(f, "process table full"),
            KernelError::NoFreeMutex => write!(f, "no free mutex"),
            KernelError::MailboxFull => write!(f, "mailbox full"),
            KernelError::InvalidMutex(id) => write!(f, "invalid mutex id {}", id),
            KernelError::InvalidMailbox(id) => write!(f, "invalid mailbox id {}", id),
            KernelError::NotOwner => write!(f, "caller does not own the mutex"),
            KernelError::MutexHeld => write!(f, "mutex is held"),
            KernelError::BadAddress(addr) => write!(f, "bad user address {:#x}", addr),
            KernelError::NoCurrentProcess => write!(f, "no current process"),
            KernelError::IdleProcess => write!(f, "cannot exit the idle process"),
        }
    }
}

impl From<MemoryFault> for KernelError {
    fn from(fault: MemoryFault) -> Self {
        KernelError::BadAddress(fault.addr)
    }
}

/// Result type of fallible kernel operations.
pub type KernelResult<T> = Result<T, KernelError>;
