//! Round-robin scheduler with a fixed time slice.
//!
//! The run queue holds the pids of Running processes in FIFO order. At
//! most one process is Active; it is never on the run queue. The idle
//! process (pid 0) is what runs when the queue is empty, and it is never
//! requeued behind other work.

use super::process::{Pid, Process, ProcessState, ProcessTable};
use crate::config::QUEUE_SIZE;
use crate::queue::SlotQueue;

/// Outcome of one scheduling pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The Active process keeps the CPU.
    Continue(Pid),
    /// A different process was made Active. `from` is the process that
    /// was Active before the pass, if any was recorded.
    Switch { from: Option<Pid>, to: Pid },
}

impl Transition {
    /// The process that runs after this pass.
    pub fn next(&self) -> Pid {
        match *self {
            Transition::Continue(pid) => pid,
            Transition::Switch { to, .. } => to,
        }
    }
}

pub struct Scheduler {
    /// Ready queue (round-robin order).
    run_queue: SlotQueue<Pid, QUEUE_SIZE>,
    /// The Active process.
    current: Option<Pid>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            run_queue: SlotQueue::new(),
            current: None,
        }
    }

    /// The Active process, if one has been chosen.
    #[inline]
    pub fn current(&self) -> Option<Pid> {
        self.current
    }

    /// Forget the Active process so the next pass picks a new one.
    #[inline]
    pub fn clear_current(&mut self) {
        self.current = None;
    }

    /// Queued pids, head first.
    pub fn run_queue(&self) -> impl Iterator<Item = Pid> + '_ {
        self.run_queue.iter()
    }

    pub fn is_queued(&self, pid: Pid) -> bool {
        self.run_queue.contains(pid)
    }

    /// Append `proc` to the run queue and mark it Running.
    ///
    /// # Panics
    /// If the run queue is full. It is sized above the process table, so
    /// this only happens if a pid is queued twice.
    pub fn add(&mut self, proc: &mut Process) {
        debug_assert!(!self.run_queue.contains(proc.pid), "pid {} queued twice", proc.pid);
        if let Err(e) = self.run_queue.push(proc.pid) {
            panic!("unable to add pid {} to the run queue: {}", proc.pid, e);
        }
        proc.state = ProcessState::Running;
    }

    /// Take `pid` off the run queue, keeping everyone else in order.
    ///
    /// Cycles the whole queue exactly once so the original head comes
    /// back to the front. A pid that is not queued (the Active process,
    /// for instance) leaves the queue unchanged.
    pub fn remove(&mut self, pid: Pid) {
        for _ in 0..self.run_queue.len() {
            let Some(queued) = self.run_queue.pop() else {
                panic!("unable to dequeue from the run queue");
            };
            if queued == pid {
                continue;
            }
            if let Err(e) = self.run_queue.push(queued) {
                panic!("unable to requeue pid {}: {}", queued, e);
            }
        }
    }

    /// One scheduling pass at tick `now`.
    ///
    /// # Panics
    /// If no process can be made Active, which means the idle process
    /// is gone.
    pub fn run(&mut self, table: &mut ProcessTable, now: u64, time_slice: u64) -> Transition {
        let previous = self.current;

        // A handler may have blocked the Active process without clearing
        // the reference.
        if let Some(pid) = self.current {
            if table.get(pid).map(|p| p.state) != Some(ProcessState::Active) {
                self.current = None;
            }
        }

        // Time slice expiry.
        if let Some(pid) = self.current {
            let proc = table.expect_mut(pid);
            if proc.active_time >= time_slice {
                proc.active_time = 0;
                if pid.is_idle() {
                    proc.state = ProcessState::Running;
                } else {
                    self.add(proc);
                }
                self.current = None;
            }
        }

        // Wake sleepers, in table order.
        for proc in table.iter_mut() {
            if proc.state == ProcessState::Sleeping && proc.wake_time <= now {
                proc.wake_time = 0;
                proc.active_time = 0;
                log::debug!("waking pid {} at tick {}", proc.pid, now);
                self.add(proc);
            }
        }

        let next = match self.current {
            Some(pid) => pid,
            None => {
                let pid = self.run_queue.pop().unwrap_or(Pid::IDLE);
                let Some(proc) = table.get_mut(pid) else {
                    panic!("unable to schedule a process (pid {})", pid);
                };
                proc.state = ProcessState::Active;
                self.current = Some(pid);
                pid
            }
        };

        if previous == Some(next) {
            Transition::Continue(next)
        } else {
            log::trace!("switch {:?} -> {}", previous, next);
            Transition::Switch { from: previous, to: next }
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SLICE: u64 = 5;

    fn setup(n: usize) -> (ProcessTable, Scheduler, Vec<Pid>) {
        let mut table = ProcessTable::new();
        let mut sched = Scheduler::new();
        let pids = (0..n)
            .map(|i| table.create(0x1000, &format!("p{}", i), 0, &mut sched).unwrap())
            .collect();
        (table, sched, pids)
    }

    fn active(table: &ProcessTable) -> Vec<Pid> {
        table
            .iter()
            .filter(|(_, p)| p.state == ProcessState::Active)
            .map(|(_, p)| p.pid)
            .collect()
    }

    #[test]
    fn first_pass_picks_queue_head() {
        let (mut table, mut sched, _) = setup(3);
        let t = sched.run(&mut table, 0, SLICE);
        assert_eq!(t, Transition::Switch { from: None, to: Pid(0) });
        assert_eq!(active(&table), vec![Pid(0)]);
        assert_eq!(sched.run(&mut table, 1, SLICE), Transition::Continue(Pid(0)));
    }

    #[test]
    fn round_robin_advances_on_slice_expiry() {
        let (mut table, mut sched, _) = setup(3);
        sched.run(&mut table, 0, SLICE);
        // Idle runs first and is parked without requeue.
        table.expect_mut(Pid(0)).active_time = SLICE;
        assert_eq!(sched.run(&mut table, 5, SLICE).next(), Pid(1));
        assert_eq!(table.get(Pid(0)).unwrap().state, ProcessState::Running);
        assert!(!sched.is_queued(Pid(0)));

        table.expect_mut(Pid(1)).active_time = SLICE;
        assert_eq!(sched.run(&mut table, 10, SLICE).next(), Pid(2));
        assert_eq!(sched.run_queue().collect::<Vec<_>>(), vec![Pid(1)]);

        table.expect_mut(Pid(2)).active_time = SLICE;
        assert_eq!(sched.run(&mut table, 15, SLICE).next(), Pid(1));
        assert_eq!(sched.run_queue().collect::<Vec<_>>(), vec![Pid(2)]);
        assert_eq!(active(&table), vec![Pid(1)]);
    }

    #[test]
    fn lone_process_gets_a_fresh_slice() {
        let (mut table, mut sched, _) = setup(2);
        sched.run(&mut table, 0, SLICE);
        table.expect_mut(Pid(0)).active_time = SLICE;
        sched.run(&mut table, 5, SLICE);
        assert_eq!(sched.current(), Some(Pid(1)));

        table.expect_mut(Pid(1)).active_time = SLICE;
        let t = sched.run(&mut table, 10, SLICE);
        // Requeued at the tail, which is also the head: it runs again
        // with a fresh slice.
        assert_eq!(t, Transition::Continue(Pid(1)));
        assert_eq!(table.get(Pid(1)).unwrap().active_time, 0);
        assert_eq!(table.get(Pid(1)).unwrap().state, ProcessState::Active);
        assert_eq!(sched.run_queue().count(), 0);
    }

    #[test]
    fn empty_queue_falls_back_to_idle() {
        let (mut table, mut sched, _) = setup(2);
        sched.run(&mut table, 0, SLICE);
        table.expect_mut(Pid(0)).active_time = SLICE;
        sched.run(&mut table, 5, SLICE);
        // Pid 1 blocks; nothing else is ready.
        table.expect_mut(Pid(1)).state = ProcessState::Waiting;
        sched.clear_current();
        let t = sched.run(&mut table, 6, SLICE);
        assert_eq!(t.next(), Pid::IDLE);
        assert_eq!(active(&table), vec![Pid::IDLE]);
    }

    #[test]
    fn sleepers_wake_in_table_order() {
        let (mut table, mut sched, _) = setup(4);
        sched.run(&mut table, 0, SLICE);
        for pid in [Pid(1), Pid(2), Pid(3)] {
            sched.remove(pid);
            let proc = table.expect_mut(pid);
            proc.state = ProcessState::Sleeping;
            proc.wake_time = 20;
        }
        table.expect_mut(Pid(2)).wake_time = 50;

        sched.run(&mut table, 19, SLICE);
        assert_eq!(sched.run_queue().count(), 0);

        sched.run(&mut table, 20, SLICE);
        assert_eq!(sched.run_queue().collect::<Vec<_>>(), vec![Pid(1), Pid(3)]);
        assert_eq!(table.get(Pid(2)).unwrap().state, ProcessState::Sleeping);
        assert_eq!(table.get(Pid(3)).unwrap().wake_time, 0);
    }

    #[test]
    fn remove_preserves_order_of_others() {
        let (_, mut sched, _) = setup(5);
        sched.remove(Pid(2));
        assert_eq!(sched.run_queue().collect::<Vec<_>>(), vec![Pid(0), Pid(1), Pid(3), Pid(4)]);
        sched.remove(Pid(9));
        assert_eq!(sched.run_queue().count(), 4);
    }

    #[test]
    fn remove_at_either_end_keeps_the_rest_in_order() {
        let (_, mut sched, _) = setup(4);
        sched.remove(Pid(0));
        assert_eq!(sched.run_queue().collect::<Vec<_>>(), vec![Pid(1), Pid(2), Pid(3)]);
        sched.remove(Pid(3));
        assert_eq!(sched.run_queue().collect::<Vec<_>>(), vec![Pid(1), Pid(2)]);
    }

    #[test]
    fn stale_current_is_dropped() {
        let (mut table, mut sched, _) = setup(2);
        sched.run(&mut table, 0, SLICE);
        // Idle marked Sleeping behind the scheduler's back.
        table.expect_mut(Pid(0)).state = ProcessState::Sleeping;
        table.expect_mut(Pid(0)).wake_time = 100;
        assert_eq!(sched.run(&mut table, 1, SLICE).next(), Pid(1));
    }

    #[test]
    #[should_panic(expected = "unable to schedule")]
    fn no_idle_is_fatal() {
        let mut table = ProcessTable::new();
        let mut sched = Scheduler::new();
        sched.run(&mut table, 0, SLICE);
    }
}
