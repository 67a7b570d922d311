// =============================================================================
// SliceOS: Kernel Synchronization Primitives
// =============================================================================
//
// Synchronization offered to processes through system calls. The kernel
// itself needs no locks around its own tables: it runs on one core with
// interrupts disabled for the whole trap path, so each trap is already a
// critical section.
//
// Blocking is expressed through the scheduler. A process that cannot
// proceed is marked Waiting, parked on the primitive's wait queue and
// taken off the run queue; releasing the primitive puts it back.
// =============================================================================

pub mod mutex;

pub use mutex::{KernelMutex, MutexTable};
