//! Kernel tick counter.
//!
//! Monotonically increasing counter incremented on every timer tick.
//! Used by `get_time`, `sleep`, process start times and message stamps.

/// System time in timer ticks since boot.
#[derive(Debug, Default, Clone, Copy)]
pub struct Clock {
    ticks: u64,
}

impl Clock {
    pub const fn new() -> Self {
        Self { ticks: 0 }
    }

    /// Called by the timer interrupt handler on every tick.
    #[inline]
    pub fn tick(&mut self) {
        self.ticks += 1;
    }

    /// Return the current tick count.
    #[inline]
    pub fn now(&self) -> u64 {
        self.ticks
    }

    /// Whole seconds since boot.
    #[inline]
    pub fn seconds(&self, ticks_per_second: u64) -> u64 {
        self.ticks / ticks_per_second
    }
}
