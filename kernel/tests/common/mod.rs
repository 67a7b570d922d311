//! Test machine: a booted kernel on the simulated platform, driven only
//! through its trap entry point.

#![allow(dead_code)]

use khal::SimPlatform;
use khal::sim::SIM_MEMORY_BASE;
use sliceos_kernel::config::{SYSCALL_VECTOR, TIMER_VECTOR};
use sliceos_kernel::{Kernel, KernelConfig, Message, MSG_WIRE_SIZE, Pid, ProcessState, Program, TrapFrame};

pub const IDLE_ENTRY: u64 = 0x1000;

/// A user buffer private to slot `n`.
pub fn buffer(n: u64) -> u64 {
    SIM_MEMORY_BASE + 0x400 * (n + 1)
}

pub struct Machine {
    pub kernel: Kernel<SimPlatform>,
}

impl Machine {
    /// Boot with the statistics panel off.
    pub fn boot(programs: &[Program]) -> Self {
        let config = KernelConfig {
            show_stats: false,
            ..KernelConfig::default()
        };
        Self::boot_with(config, programs)
    }

    pub fn boot_with(config: KernelConfig, programs: &[Program]) -> Self {
        let mut kernel = Kernel::with_config(SimPlatform::default(), config);
        kernel.boot(IDLE_ENTRY, programs);
        let machine = Self { kernel };
        machine.assert_invariants();
        machine
    }

    pub fn current(&self) -> Pid {
        self.kernel.current().expect("a process is always active between traps")
    }

    pub fn state(&self, pid: Pid) -> Option<ProcessState> {
        self.kernel.processes().get(pid).map(|p| p.state)
    }

    /// One timer interrupt.
    pub fn tick(&mut self) {
        let frame = TrapFrame {
            vector: TIMER_VECTOR,
            ..*self.kernel.active_context()
        };
        self.kernel.trap(&frame);
        self.assert_invariants();
    }

    pub fn ticks(&mut self, n: u64) {
        for _ in 0..n {
            self.tick();
        }
    }

    /// Tick until `pid` is the Active process.
    pub fn run_until(&mut self, pid: Pid) {
        for _ in 0..10_000 {
            if self.current() == pid {
                return;
            }
            self.tick();
        }
        panic!("pid {} never became active", pid);
    }

    /// Trap into the kernel as the Active process. Returns the value left
    /// in the caller's saved `rax`, or `None` if the caller no longer exists.
    pub fn syscall(&mut self, nr: u64, args: [u64; 3]) -> Option<i64> {
        let caller = self.current();
        let frame = TrapFrame {
            vector: SYSCALL_VECTOR,
            rax: nr,
            rbx: args[0],
            rcx: args[1],
            rdx: args[2],
            ..*self.kernel.active_context()
        };
        self.kernel.trap(&frame);
        self.assert_invariants();
        self.kernel.context(caller).map(|f| f.return_value())
    }

    pub fn write(&mut self, addr: u64, data: &[u8]) {
        self.kernel.platform_mut().poke(addr, data).unwrap();
    }

    pub fn read(&self, addr: u64, len: usize) -> Vec<u8> {
        self.kernel.platform().peek(addr, len).unwrap()
    }

    pub fn read_message(&self, addr: u64) -> Message {
        let wire = self.read(addr, MSG_WIRE_SIZE);
        Message::from_bytes(wire.as_slice().try_into().unwrap())
    }

    /// Properties that hold whenever no trap is in progress.
    pub fn assert_invariants(&self) {
        let active: Vec<Pid> = self
            .kernel
            .processes()
            .iter()
            .filter(|(_, p)| p.state == ProcessState::Active)
            .map(|(_, p)| p.pid)
            .collect();
        assert_eq!(active, vec![self.current()], "exactly one Active process");

        let queued: Vec<Pid> = self.kernel.scheduler().run_queue().collect();
        for (i, pid) in queued.iter().enumerate() {
            assert!(!queued[i + 1..].contains(pid), "pid {} queued twice", pid);
            assert_eq!(self.state(*pid), Some(ProcessState::Running));
        }

        for (id, mutex) in self.kernel.mutexes().iter() {
            assert_eq!(
                mutex.lock_count == 0,
                mutex.owner.is_none(),
                "mutex {} owner/count mismatch",
                id
            );
        }
    }
}
