//! Process management: PCBs and the fixed process table.
//!
//! The table is a fixed array of [`Process`] slots. Free slot indices sit
//! in a [`SlotQueue`]; creating a process takes one, destroying it puts it
//! back. Slots are reused, pids never are, so the rest of the kernel names
//! processes by [`Pid`] and looks the slot up when it needs one.

use alloc::boxed::Box;
use core::fmt;

use super::context::TrapFrame;
use super::scheduler::Scheduler;
use crate::config::{PROC_MAX, PROC_NAME_LEN, PROC_STACK_SIZE, QUEUE_SIZE};
use crate::error::{KernelError, KernelResult};
use crate::queue::SlotQueue;

// ── Process identifiers ─────────────────────────────────────────

/// Process identifier. Assigned in creation order, never reused.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pid(pub u32);

impl Pid {
    /// The idle process. Always exists, never exits.
    pub const IDLE: Pid = Pid(0);

    #[inline]
    pub fn is_idle(self) -> bool {
        self == Pid::IDLE
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

// ── Process state ───────────────────────────────────────────────

/// The possible states of a process table slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProcessState {
    /// Slot holds no process.
    #[default]
    Free,
    /// Ready; queued on the run queue (or idle waiting to be picked).
    Running,
    /// Currently executing. Exactly one process is Active.
    Active,
    /// Waiting for `wake_time`.
    Sleeping,
    /// Blocked on a mutex or mailbox wait queue.
    Waiting,
}

impl ProcessState {
    /// One-letter code shown in the statistics panel.
    pub fn letter(self) -> char {
        match self {
            ProcessState::Free => '-',
            ProcessState::Running => 'R',
            ProcessState::Active => 'A',
            ProcessState::Sleeping => 'S',
            ProcessState::Waiting => 'W',
        }
    }
}

// ── Names ───────────────────────────────────────────────────────

/// Fixed-capacity process name.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ProcessName {
    bytes: [u8; PROC_NAME_LEN],
    len: usize,
}

impl ProcessName {
    pub const fn empty() -> Self {
        Self {
            bytes: [0; PROC_NAME_LEN],
            len: 0,
        }
    }

    /// Copy `name`, truncated to [`PROC_NAME_LEN`] bytes on a character
    /// boundary.
    pub fn new(name: &str) -> Self {
        let mut len = name.len().min(PROC_NAME_LEN);
        while !name.is_char_boundary(len) {
            len -= 1;
        }
        let mut bytes = [0; PROC_NAME_LEN];
        bytes[..len].copy_from_slice(&name.as_bytes()[..len]);
        Self { bytes, len }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// The name as text; names read from process memory that are not
    /// valid UTF-8 show as `"?"`.
    pub fn as_str(&self) -> &str {
        core::str::from_utf8(self.as_bytes()).unwrap_or("?")
    }
}

impl fmt::Debug for ProcessName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl fmt::Display for ProcessName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Process stack ───────────────────────────────────────────────

/// An aligned process stack.
#[repr(C, align(16))]
pub struct ProcessStack {
    pub data: [u8; PROC_STACK_SIZE],
}

impl ProcessStack {
    /// Allocate a zeroed stack directly on the heap.
    fn allocate() -> Box<Self> {
        // Going through `alloc_zeroed` keeps the 8 KiB array off the
        // current stack, which is itself only a few KiB deep in a trap.
        let layout = core::alloc::Layout::new::<ProcessStack>();
        unsafe {
            let ptr = alloc::alloc::alloc_zeroed(layout) as *mut ProcessStack;
            if ptr.is_null() {
                alloc::alloc::handle_alloc_error(layout);
            }
            Box::from_raw(ptr)
        }
    }

    /// Top of the stack (stacks grow downward).
    pub fn top(&self) -> u64 {
        self.data.as_ptr() as u64 + PROC_STACK_SIZE as u64
    }

    pub fn clear(&mut self) {
        self.data.fill(0);
    }
}

// ── Process Control Block ───────────────────────────────────────

/// The Process Control Block: stores everything the kernel needs to
/// manage and schedule a single process.
pub struct Process {
    pub pid: Pid,
    pub state: ProcessState,
    pub name: ProcessName,
    /// Tick at which the process was created.
    pub start_time: u64,
    /// Ticks spent Active over the whole lifetime.
    pub cpu_time: u64,
    /// Ticks spent Active since last being scheduled.
    pub active_time: u64,
    /// Tick to wake at. Only meaningful while Sleeping.
    pub wake_time: u64,
    /// Where a blocked mailbox receive delivers its message.
    pub recv_dest: Option<u64>,
    /// Saved registers, restored when the process next runs.
    pub context: TrapFrame,
    pub stack: Box<ProcessStack>,
}

impl Process {
    fn vacant() -> Self {
        Self {
            pid: Pid::default(),
            state: ProcessState::Free,
            name: ProcessName::empty(),
            start_time: 0,
            cpu_time: 0,
            active_time: 0,
            wake_time: 0,
            recv_dest: None,
            context: TrapFrame::default(),
            stack: ProcessStack::allocate(),
        }
    }

    /// Zero the PCB and its stack, keeping the stack allocation.
    fn clear(&mut self) {
        self.pid = Pid::default();
        self.state = ProcessState::Free;
        self.name = ProcessName::empty();
        self.start_time = 0;
        self.cpu_time = 0;
        self.active_time = 0;
        self.wake_time = 0;
        self.recv_dest = None;
        self.context = TrapFrame::default();
        self.stack.clear();
    }

    #[inline]
    pub fn is_live(&self) -> bool {
        self.state != ProcessState::Free
    }
}

// ── Process table ───────────────────────────────────────────────

/// Fixed array of PCBs plus the queue of free slot indices.
pub struct ProcessTable {
    slots: [Process; PROC_MAX],
    free: SlotQueue<usize, QUEUE_SIZE>,
    next_pid: u32,
}

impl ProcessTable {
    pub fn new() -> Self {
        let mut free = SlotQueue::new();
        for slot in 0..PROC_MAX {
            if let Err(e) = free.push(slot) {
                panic!("unable to initialize free slot {}: {}", slot, e);
            }
        }
        Self {
            slots: core::array::from_fn(|_| Process::vacant()),
            free,
            next_pid: 0,
        }
    }

    /// Create a process that starts executing at `entry`.
    ///
    /// The new process is Running and queued on `sched`. Fails with
    /// [`KernelError::TableFull`] when every slot is taken.
    ///
    /// # Panics
    /// If `entry` is the null address.
    pub fn create(
        &mut self,
        entry: u64,
        name: &str,
        now: u64,
        sched: &mut Scheduler,
    ) -> KernelResult<Pid> {
        if entry == 0 {
            panic!("invalid entry point for process '{}'", name);
        }

        let Some(slot) = self.free.pop() else {
            log::warn!("unable to allocate a process entry for '{}'", name);
            return Err(KernelError::TableFull);
        };

        let pid = Pid(self.next_pid);
        self.next_pid += 1;

        let proc = &mut self.slots[slot];
        proc.clear();
        proc.pid = pid;
        proc.name = ProcessName::new(name);
        proc.start_time = now;
        proc.context = TrapFrame::new(entry, proc.stack.top());
        sched.add(proc);

        log::info!("created process '{}' (pid {}) in slot {}", proc.name, pid, slot);
        Ok(pid)
    }

    /// Destroy `pid`, returning its slot to the free queue.
    ///
    /// `None` (no process given) and the idle process are refused with a
    /// diagnostic and no state change.
    ///
    /// # Panics
    /// If `pid` is not in the table.
    pub fn destroy(&mut self, pid: Option<Pid>, sched: &mut Scheduler) -> KernelResult<()> {
        let Some(pid) = pid else {
            log::warn!("exit requested with no process");
            return Err(KernelError::NoCurrentProcess);
        };
        if pid.is_idle() {
            log::warn!("cannot exit the idle task");
            return Err(KernelError::IdleProcess);
        }
        let Some(slot) = self.find(pid) else {
            panic!("unable to exit process {}: not in the process table", pid);
        };

        sched.remove(pid);
        if sched.current() == Some(pid) {
            sched.clear_current();
        }

        let proc = &mut self.slots[slot];
        log::info!("exiting process '{}' (pid {}) in slot {}", proc.name, pid, slot);
        proc.clear();
        if let Err(e) = self.free.push(slot) {
            panic!("unable to release process entry {}: {}", slot, e);
        }
        Ok(())
    }

    /// Slot index of the live process `pid`.
    pub fn find(&self, pid: Pid) -> Option<usize> {
        self.slots.iter().position(|p| p.is_live() && p.pid == pid)
    }

    pub fn get(&self, pid: Pid) -> Option<&Process> {
        self.find(pid).map(|slot| &self.slots[slot])
    }

    pub fn get_mut(&mut self, pid: Pid) -> Option<&mut Process> {
        let slot = self.find(pid)?;
        Some(&mut self.slots[slot])
    }

    /// Like [`get_mut`](Self::get_mut), for pids the caller's invariants
    /// guarantee are live.
    ///
    /// # Panics
    /// If `pid` is not in the table.
    pub fn expect_mut(&mut self, pid: Pid) -> &mut Process {
        match self.get_mut(pid) {
            Some(proc) => proc,
            None => panic!("process {} missing from the process table", pid),
        }
    }

    /// Live processes with their slot index, in table order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Process)> {
        self.slots.iter().enumerate().filter(|(_, p)| p.is_live())
    }

    /// Mutable access to live processes, in table order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Process> {
        self.slots.iter_mut().filter(|p| p.is_live())
    }

    /// Number of live processes.
    pub fn len(&self) -> usize {
        PROC_MAX - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether every slot is in use.
    pub fn is_full(&self) -> bool {
        self.free.is_empty()
    }
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENTRY: u64 = 0x1000;

    fn table_with(names: &[&str]) -> (ProcessTable, Scheduler, Vec<Pid>) {
        let mut table = ProcessTable::new();
        let mut sched = Scheduler::new();
        let pids = names
            .iter()
            .map(|name| table.create(ENTRY, name, 0, &mut sched).unwrap())
            .collect();
        (table, sched, pids)
    }

    #[test]
    fn pids_increase_and_are_not_reused() {
        let (mut table, mut sched, pids) = table_with(&["idle", "a", "b"]);
        assert_eq!(pids, vec![Pid(0), Pid(1), Pid(2)]);

        table.destroy(Some(Pid(1)), &mut sched).unwrap();
        let again = table.create(ENTRY, "c", 7, &mut sched).unwrap();
        assert_eq!(again, Pid(3));
        assert_eq!(table.get(again).unwrap().start_time, 7);
        assert!(table.get(Pid(1)).is_none());
    }

    #[test]
    fn create_initializes_pcb_and_queues_it() {
        let (table, sched, pids) = table_with(&["idle", "worker"]);
        let proc = table.get(pids[1]).unwrap();
        assert_eq!(proc.state, ProcessState::Running);
        assert_eq!(proc.name.as_str(), "worker");
        assert_eq!((proc.cpu_time, proc.active_time), (0, 0));
        assert_eq!(proc.context.rip, ENTRY);
        assert_eq!(proc.context.rsp, proc.stack.top() - 8);
        assert!(sched.is_queued(pids[1]));
    }

    #[test]
    fn long_names_are_truncated() {
        let long = "a-process-name-that-is-much-longer-than-thirty-two";
        let name = ProcessName::new(long);
        assert_eq!(name.as_bytes().len(), PROC_NAME_LEN);
        assert_eq!(name.as_str(), &long[..PROC_NAME_LEN]);

        // 31 ASCII bytes then a two-byte character straddling the limit.
        let straddle = "0123456789012345678901234567890é";
        assert_eq!(ProcessName::new(straddle).as_str().len(), 31);
    }

    #[test]
    fn full_table_rejects_create() {
        let mut table = ProcessTable::new();
        let mut sched = Scheduler::new();
        for i in 0..PROC_MAX {
            table.create(ENTRY, "p", 0, &mut sched).unwrap_or_else(|e| panic!("{} at {}", e, i));
        }
        assert!(table.is_full());
        assert_eq!(table.create(ENTRY, "extra", 0, &mut sched), Err(KernelError::TableFull));
        assert_eq!(table.len(), PROC_MAX);
    }

    #[test]
    fn idle_and_absent_processes_are_not_destroyed() {
        let (mut table, mut sched, _) = table_with(&["idle"]);
        assert_eq!(table.destroy(Some(Pid::IDLE), &mut sched), Err(KernelError::IdleProcess));
        assert_eq!(table.destroy(None, &mut sched), Err(KernelError::NoCurrentProcess));
        assert!(table.get(Pid::IDLE).is_some());
    }

    #[test]
    fn destroy_clears_slot_and_stack() {
        let (mut table, mut sched, pids) = table_with(&["idle", "victim"]);
        let slot = table.find(pids[1]).unwrap();
        table.slots[slot].stack.data[100] = 0xAA;

        table.destroy(Some(pids[1]), &mut sched).unwrap();
        assert!(!sched.is_queued(pids[1]));
        assert_eq!(table.slots[slot].state, ProcessState::Free);
        assert!(table.slots[slot].stack.data.iter().all(|&b| b == 0));
        assert_eq!(table.len(), 1);
    }

    #[test]
    #[should_panic(expected = "not in the process table")]
    fn destroying_unknown_pid_is_fatal() {
        let (mut table, mut sched, _) = table_with(&["idle"]);
        let _ = table.destroy(Some(Pid(42)), &mut sched);
    }

    #[test]
    #[should_panic(expected = "invalid entry point")]
    fn null_entry_is_fatal() {
        let (mut table, mut sched, _) = table_with(&[]);
        let _ = table.create(0, "broken", 0, &mut sched);
    }
}
