//! Operator console: keyboard commands and the statistics panel.
//!
//! Keys are polled once per trap. Reserved keys:
//!
//! | Key | Action                                   |
//! |-----|------------------------------------------|
//! | `x` | destroy the Active process               |
//! | `s` | toggle the statistics panel              |
//! | `q` | halt the machine                         |
//!
//! Any other key may be bound to a [`Program`] with
//! [`Kernel::bind_key`]; pressing it starts a new instance.

use alloc::format;
use alloc::vec::Vec;

use khal::{Attr, Platform};

use crate::kernel::Kernel;
use crate::task::{ProcessState, Program};

const KEY_EXIT: char = 'x';
const KEY_STATS: char = 's';
const KEY_HALT: char = 'q';

/// Screen width in cells.
const COLS: usize = 80;

const PROC_HEADER: &str = "Entry    PID   State    Time   Command";
const MUTEX_HEADER: &str = "Mutex  Owner  Locks";
const DIVIDER_COLS: [usize; 2] = [48, 70];
const MUTEX_COL: usize = 50;
const TIME_COL: usize = 72;

/// What a keystroke asks the kernel to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ExitActive,
    ToggleStats,
    Halt,
    Spawn(Program),
}

pub struct Console {
    show_stats: bool,
    bindings: Vec<(char, Program)>,
}

impl Console {
    pub fn new(show_stats: bool) -> Self {
        Self {
            show_stats,
            bindings: Vec::new(),
        }
    }

    pub fn show_stats(&self) -> bool {
        self.show_stats
    }

    /// Bind `key` to start `program`, replacing an earlier binding.
    /// Returns `false` for a reserved key.
    pub fn bind(&mut self, key: char, program: Program) -> bool {
        if matches!(key, KEY_EXIT | KEY_STATS | KEY_HALT) {
            return false;
        }
        match self.bindings.iter_mut().find(|(k, _)| *k == key) {
            Some(binding) => binding.1 = program,
            None => self.bindings.push((key, program)),
        }
        true
    }

    /// The command for `key`, if it means anything.
    pub fn command(&self, key: char) -> Option<Command> {
        match key {
            KEY_EXIT => Some(Command::ExitActive),
            KEY_STATS => Some(Command::ToggleStats),
            KEY_HALT => Some(Command::Halt),
            _ => self
                .bindings
                .iter()
                .find(|(k, _)| *k == key)
                .map(|&(_, program)| Command::Spawn(program)),
        }
    }
}

fn state_attr(state: ProcessState) -> Attr {
    match state {
        ProcessState::Active => Attr::Active,
        ProcessState::Sleeping => Attr::Sleeping,
        ProcessState::Waiting => Attr::Waiting,
        _ => Attr::Default,
    }
}

impl<P: Platform> Kernel<P> {
    /// Bind a hotkey to start `program`. Returns `false` for a reserved key.
    pub fn bind_key(&mut self, key: char, program: Program) -> bool {
        self.console.bind(key, program)
    }

    /// Act on one operator keystroke.
    pub fn handle_key(&mut self, key: char) {
        let Some(command) = self.console.command(key) else {
            return;
        };
        match command {
            Command::ExitActive => {
                if let Err(e) = self.exit(self.sched.current()) {
                    log::warn!("[console] exit refused: {}", e);
                }
            }
            Command::ToggleStats => {
                self.console.show_stats = !self.console.show_stats;
                self.platform.clear_screen();
            }
            Command::Halt => {
                log::info!("[console] halt requested");
                self.platform.halt();
            }
            Command::Spawn(program) => match self.spawn(program.entry, program.name) {
                Ok(pid) => log::info!("[console] started '{}' as pid {}", program.name, pid),
                Err(e) => log::warn!("[console] unable to start '{}': {}", program.name, e),
            },
        }
    }

    /// Repaint the process and mutex tables and the system time.
    pub fn paint_stats(&mut self) {
        let Self {
            platform,
            procs,
            mutexes,
            clock,
            config,
            ..
        } = self;

        platform.paint(0, 0, Attr::Header, &format!("{:<width$}", PROC_HEADER, width = COLS));
        platform.paint(0, MUTEX_COL, Attr::Header, MUTEX_HEADER);
        platform.paint(0, TIME_COL, Attr::Header, "Sys Time");
        let seconds = clock.seconds(config.ticks_per_second);
        platform.paint(1, TIME_COL, Attr::Default, &format!("{:>8}", seconds));

        for (row, (slot, proc)) in procs.iter().enumerate() {
            let line = format!(
                "{:5}  {:5}  {:>4}  {:8}   {}",
                slot,
                proc.pid,
                proc.state.letter(),
                proc.cpu_time / config.ticks_per_second,
                proc.name.as_str(),
            );
            platform.paint(row + 1, 0, state_attr(proc.state), &line);
        }

        for (row, (id, mutex)) in mutexes.iter().enumerate() {
            let owner = mutex.owner.map_or(-1, |pid| i64::from(pid.0));
            let line = format!("{:5}  {:5}  {:5}", id, owner, mutex.lock_count);
            platform.paint(row + 1, MUTEX_COL, Attr::Default, &line);
        }

        let rows = procs.len().max(mutexes.iter().count()) + 1;
        for row in 0..rows {
            for col in DIVIDER_COLS {
                platform.paint(row, col, Attr::Header, "\u{2551}");
            }
        }
    }
}
