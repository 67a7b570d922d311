//! The kernel instance and its trap entry points.
//!
//! [`Kernel`] owns every core table plus the platform. There is no global
//! "current process": the scheduler inside the kernel value records it,
//! and every handler reaches it through `&mut self`. The trap entry stub
//! calls [`Kernel::trap`] once per interrupt or system call and resumes
//! whichever context it returns.

use khal::Platform;

use crate::config::{KernelConfig, SYSCALL_VECTOR, TIMER_IRQ, TIMER_VECTOR};
use crate::console::Console;
use crate::error::KernelResult;
use crate::ipc::MailboxTable;
use crate::sync::MutexTable;
use crate::task::{Clock, Pid, ProcessTable, Program, RFlags, Scheduler, Transition, TrapFrame};

pub struct Kernel<P: Platform> {
    pub(crate) platform: P,
    pub(crate) config: KernelConfig,
    pub(crate) clock: Clock,
    pub(crate) procs: ProcessTable,
    pub(crate) sched: Scheduler,
    pub(crate) mutexes: MutexTable,
    pub(crate) mailboxes: MailboxTable,
    pub(crate) console: Console,
}

impl<P: Platform> Kernel<P> {
    pub fn new(platform: P) -> Self {
        Self::with_config(platform, KernelConfig::default())
    }

    /// # Panics
    /// If `config.ticks_per_second` is zero; every seconds conversion
    /// divides by it.
    pub fn with_config(platform: P, config: KernelConfig) -> Self {
        assert!(config.ticks_per_second > 0, "ticks_per_second must be non-zero");
        log::info!("initializing kernel data structures");
        Self {
            platform,
            config,
            clock: Clock::new(),
            procs: ProcessTable::new(),
            sched: Scheduler::new(),
            mutexes: MutexTable::new(),
            mailboxes: MailboxTable::new(),
            console: Console::new(config.show_stats),
        }
    }

    // ── Inspection ──────────────────────────────────────────────

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// System time in ticks.
    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    /// The Active process.
    pub fn current(&self) -> Option<Pid> {
        self.sched.current()
    }

    pub fn processes(&self) -> &ProcessTable {
        &self.procs
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.sched
    }

    pub fn mutexes(&self) -> &MutexTable {
        &self.mutexes
    }

    pub fn mailboxes(&self) -> &MailboxTable {
        &self.mailboxes
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    /// Saved context of `pid`.
    pub fn context(&self, pid: Pid) -> Option<&TrapFrame> {
        self.procs.get(pid).map(|p| &p.context)
    }

    /// Saved context of the Active process; what the entry stub resumes.
    ///
    /// # Panics
    /// If no process is Active. After any scheduling pass one is.
    pub fn active_context(&self) -> &TrapFrame {
        let Some(pid) = self.sched.current() else {
            panic!("no active process to resume");
        };
        let Some(frame) = self.context(pid) else {
            panic!("active pid {} has no process", pid);
        };
        // Resuming with IF clear would stop the timer for good.
        debug_assert!(
            frame.flags().contains(RFlags::INTERRUPT),
            "pid {} would resume with interrupts disabled",
            pid
        );
        frame
    }

    // ── Lifecycle ───────────────────────────────────────────────

    /// Create the idle process and the startup `programs`, unmask the
    /// timer and choose the first process to run.
    ///
    /// Returns the pid the entry stub should resume first.
    pub fn boot(&mut self, idle_entry: u64, programs: &[Program]) -> Pid {
        let idle = match self.spawn(idle_entry, "idle task") {
            Ok(pid) => pid,
            Err(e) => panic!("unable to create the idle task: {}", e),
        };
        if !idle.is_idle() {
            panic!("idle task got pid {}; boot must run on a fresh kernel", idle);
        }

        for program in programs {
            if let Err(e) = self.spawn(program.entry, program.name) {
                log::warn!("unable to start '{}': {}", program.name, e);
            }
        }

        self.platform.enable_irq(TIMER_IRQ);
        log::info!("running the scheduler");
        self.schedule().next()
    }

    /// Create a process at `entry`. It starts Running on the run queue.
    pub fn spawn(&mut self, entry: u64, name: &str) -> KernelResult<Pid> {
        self.procs.create(entry, name, self.clock.now(), &mut self.sched)
    }

    /// Destroy `pid`; `None` and the idle process are refused.
    pub fn exit(&mut self, pid: Option<Pid>) -> KernelResult<()> {
        self.procs.destroy(pid, &mut self.sched)
    }

    /// Run one scheduling pass.
    pub fn schedule(&mut self) -> Transition {
        self.sched
            .run(&mut self.procs, self.clock.now(), self.config.time_slice)
    }

    // ── Trap handling ───────────────────────────────────────────

    /// Timer interrupt: advance system time, charge the Active process
    /// and acknowledge the IRQ.
    pub fn timer_tick(&mut self) {
        self.clock.tick();
        if let Some(pid) = self.sched.current() {
            let proc = self.procs.expect_mut(pid);
            proc.active_time += 1;
            proc.cpu_time += 1;
        }
        self.platform.acknowledge_irq(TIMER_IRQ);
    }

    /// System call trap: run the call described by the Active process's
    /// saved registers and store the result back into them.
    ///
    /// # Panics
    /// If no process is Active.
    pub fn syscall(&mut self) {
        let Some(caller) = self.sched.current() else {
            panic!("system call with no current process");
        };
        let frame = self.procs.expect_mut(caller).context;
        let rc = self.dispatch(frame.syscall_number(), frame.syscall_args());
        // The caller may have exited, or blocked and been rescheduled
        // away; it sees the result whenever it next runs.
        if let Some(proc) = self.procs.get_mut(caller) {
            proc.context.set_return(rc);
        }
    }

    /// Kernel entry for every trap.
    ///
    /// Saves `frame` as the interrupted process's context, handles the
    /// trap, services the operator console, repaints statistics and runs
    /// the scheduler. Returns the context to resume.
    ///
    /// # Panics
    /// On a vector that is neither the timer nor the system call gate.
    pub fn trap(&mut self, frame: &TrapFrame) -> &TrapFrame {
        if let Some(pid) = self.sched.current() {
            self.procs.expect_mut(pid).context = *frame;
        }

        match frame.vector {
            TIMER_VECTOR => self.timer_tick(),
            SYSCALL_VECTOR => self.syscall(),
            vector => panic!("unhandled trap vector {:#x}", vector),
        }

        if let Some(key) = self.platform.poll_key() {
            self.handle_key(key);
        }
        if self.console.show_stats() {
            self.paint_stats();
        }

        self.schedule();
        self.active_context()
    }
}
