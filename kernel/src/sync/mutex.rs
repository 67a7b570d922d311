//! Kernel mutexes with ownership hand-off.
//!
//! `lock_count` counts the holder plus every pending acquirer, so a
//! contended mutex with two waiters has a count of 3. Unlocking passes
//! ownership straight to the oldest waiter instead of letting the lock go
//! free, which keeps acquisition FIFO-fair.
//!
//! There is no reentrancy: an owner that locks again queues behind itself.

use crate::config::{MUTEX_MAX, QUEUE_SIZE};
use crate::error::{KernelError, KernelResult};
use crate::queue::SlotQueue;
use crate::task::{Pid, ProcessState, ProcessTable, Scheduler};

/// One mutex slot.
pub struct KernelMutex {
    pub allocated: bool,
    /// Holder plus pending acquirers. Zero exactly when `owner` is unset.
    pub lock_count: u64,
    pub owner: Option<Pid>,
    /// Blocked acquirers, oldest first.
    pub wait_queue: SlotQueue<Pid, QUEUE_SIZE>,
}

impl KernelMutex {
    fn new() -> Self {
        Self {
            allocated: false,
            lock_count: 0,
            owner: None,
            wait_queue: SlotQueue::new(),
        }
    }
}

/// The fixed pool of mutexes and the queue of free ids.
pub struct MutexTable {
    mutexes: [KernelMutex; MUTEX_MAX],
    free: SlotQueue<usize, QUEUE_SIZE>,
}

impl MutexTable {
    pub fn new() -> Self {
        let mut free = SlotQueue::new();
        for id in 0..MUTEX_MAX {
            if let Err(e) = free.push(id) {
                panic!("unable to initialize free mutex {}: {}", id, e);
            }
        }
        Self {
            mutexes: core::array::from_fn(|_| KernelMutex::new()),
            free,
        }
    }

    /// Index of the allocated mutex `id`.
    fn index(&self, id: u64) -> KernelResult<usize> {
        match usize::try_from(id) {
            Ok(idx) if idx < MUTEX_MAX && self.mutexes[idx].allocated => Ok(idx),
            _ => Err(KernelError::InvalidMutex(id)),
        }
    }

    /// Allocated mutex `id`, if any.
    pub fn get(&self, id: u64) -> Option<&KernelMutex> {
        self.index(id).ok().map(|idx| &self.mutexes[idx])
    }

    /// Allocated mutexes with their ids, in id order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &KernelMutex)> {
        self.mutexes.iter().enumerate().filter(|(_, m)| m.allocated)
    }

    /// Take a free mutex.
    pub fn alloc(&mut self) -> KernelResult<usize> {
        let Some(id) = self.free.pop() else {
            log::warn!("no mutexes available");
            return Err(KernelError::NoFreeMutex);
        };
        let mutex = &mut self.mutexes[id];
        *mutex = KernelMutex::new();
        mutex.allocated = true;
        log::debug!("allocated mutex {}", id);
        Ok(id)
    }

    /// Return mutex `id` to the pool. A mutex that is held, or has
    /// pending acquirers, cannot be freed.
    pub fn free(&mut self, id: u64) -> KernelResult<()> {
        let idx = self.index(id)?;
        if self.mutexes[idx].lock_count > 0 {
            log::warn!("mutex {} is locked and cannot be freed", id);
            return Err(KernelError::MutexHeld);
        }
        self.mutexes[idx] = KernelMutex::new();
        if let Err(e) = self.free.push(idx) {
            panic!("unable to release mutex {}: {}", id, e);
        }
        log::debug!("freed mutex {}", id);
        Ok(())
    }

    /// Lock mutex `id` on behalf of `caller`, the Active process.
    ///
    /// Returns the lock count before this call. A non-zero result means
    /// the caller was blocked: it is now Waiting, off the run queue, and
    /// no longer current.
    pub fn lock(
        &mut self,
        id: u64,
        caller: Pid,
        table: &mut ProcessTable,
        sched: &mut Scheduler,
    ) -> KernelResult<u64> {
        let idx = self.index(id)?;
        let mutex = &mut self.mutexes[idx];

        if mutex.lock_count == 0 {
            mutex.owner = Some(caller);
            mutex.lock_count = 1;
            return Ok(0);
        }

        if let Err(e) = mutex.wait_queue.push(caller) {
            panic!("unable to queue pid {} on mutex {}: {}", caller, id, e);
        }
        table.expect_mut(caller).state = ProcessState::Waiting;
        sched.remove(caller);
        if sched.current() == Some(caller) {
            sched.clear_current();
        }

        let previous = mutex.lock_count;
        mutex.lock_count += 1;
        log::debug!("pid {} blocked on mutex {} (count {})", caller, id, mutex.lock_count);
        Ok(previous)
    }

    /// Unlock mutex `id` on behalf of `caller`.
    ///
    /// If acquirers are pending, the oldest becomes owner and Running.
    /// Returns the resulting lock count.
    pub fn unlock(
        &mut self,
        id: u64,
        caller: Pid,
        table: &mut ProcessTable,
        sched: &mut Scheduler,
    ) -> KernelResult<u64> {
        let idx = self.index(id)?;
        let mutex = &mut self.mutexes[idx];

        if mutex.lock_count == 0 {
            return Ok(0);
        }
        if mutex.owner != Some(caller) {
            log::warn!("pid {} unlocking mutex {} owned by {:?}", caller, id, mutex.owner);
            return Err(KernelError::NotOwner);
        }

        mutex.lock_count -= 1;
        if mutex.lock_count == 0 {
            mutex.owner = None;
            return Ok(0);
        }

        let Some(next) = mutex.wait_queue.pop() else {
            panic!("mutex {} has lock count {} but no waiters", id, mutex.lock_count);
        };
        sched.add(table.expect_mut(next));
        mutex.owner = Some(next);
        log::debug!("mutex {} handed to pid {}", id, next);
        Ok(mutex.lock_count)
    }
}

impl Default for MutexTable {
    fn default() -> Self {
        Self::new()
    }
}
