//! Process lifecycle and scheduling, driven through timer and syscall traps.

mod common;

use common::{IDLE_ENTRY, Machine, buffer};
use khal::Attr;
use sliceos_kernel::config::{PROC_MAX, TIMER_IRQ};
use sliceos_kernel::syscall::nr;
use sliceos_kernel::{KernelConfig, Pid, ProcessState, Program};

const A: Pid = Pid(1);
const B: Pid = Pid(2);

fn programs() -> [Program; 2] {
    [Program::new("alpha", 0x2000), Program::new("beta", 0x3000)]
}

#[test]
fn boot_runs_idle_first() {
    let machine = Machine::boot(&programs());
    assert_eq!(machine.current(), Pid::IDLE);
    assert_eq!(machine.kernel.active_context().rip, IDLE_ENTRY);
    assert_eq!(machine.kernel.scheduler().run_queue().collect::<Vec<_>>(), [A, B]);
    assert!(machine.kernel.platform().irq_enabled(TIMER_IRQ));
}

#[test]
fn round_robin_rotates_every_slice() {
    let mut machine = Machine::boot(&programs());
    machine.ticks(5);
    assert_eq!(machine.current(), A);
    assert_eq!(machine.state(Pid::IDLE), Some(ProcessState::Running));

    machine.ticks(5);
    assert_eq!(machine.current(), B);
    assert_eq!(machine.kernel.active_context().rip, 0x3000);

    machine.ticks(5);
    assert_eq!(machine.current(), A);
    assert_eq!(machine.kernel.processes().get(A).unwrap().cpu_time, 5);
    assert_eq!(machine.kernel.processes().get(B).unwrap().cpu_time, 5);
    assert_eq!(machine.kernel.scheduler().run_queue().collect::<Vec<_>>(), [B]);
}

#[test]
fn lone_process_keeps_running_after_its_slice() {
    let mut machine = Machine::boot(&programs()[..1]);
    machine.run_until(A);
    machine.ticks(5);
    assert_eq!(machine.current(), A);
    let alpha = machine.kernel.processes().get(A).unwrap();
    assert_eq!(alpha.active_time, 0);
    assert_eq!(alpha.cpu_time, 5);
    assert_eq!(machine.state(Pid::IDLE), Some(ProcessState::Running));
}

#[test]
fn yield_passes_the_cpu() {
    let mut machine = Machine::boot(&programs());
    machine.run_until(A);
    assert_eq!(machine.syscall(nr::PROC_YIELD, [0; 3]), Some(0));
    assert_eq!(machine.current(), B);
    assert_eq!(machine.kernel.scheduler().run_queue().collect::<Vec<_>>(), [A]);
}

#[test]
fn sleeper_wakes_at_its_deadline() {
    let mut machine = Machine::boot(&programs()[..1]);
    machine.run_until(A);
    let slept_at = machine.kernel.now();
    assert_eq!(machine.syscall(nr::PROC_SLEEP, [1, 0, 0]), Some(0));
    assert_eq!(machine.state(A), Some(ProcessState::Sleeping));
    assert_eq!(machine.current(), Pid::IDLE);

    while machine.kernel.now() < slept_at + 99 {
        machine.tick();
    }
    assert_eq!(machine.state(A), Some(ProcessState::Sleeping));
    machine.tick();
    assert_ne!(machine.state(A), Some(ProcessState::Sleeping));
    machine.run_until(A);
}

#[test]
fn endless_sleep_stays_asleep() {
    let mut machine = Machine::boot(&programs()[..1]);
    machine.run_until(A);
    assert_eq!(machine.syscall(nr::PROC_SLEEP, [u64::MAX, 0, 0]), Some(0));
    machine.ticks(500);
    assert_eq!(machine.state(A), Some(ProcessState::Sleeping));
    assert_eq!(machine.current(), Pid::IDLE);
}

#[test]
fn time_is_reported_in_seconds() {
    let mut machine = Machine::boot(&[]);
    machine.ticks(250);
    assert_eq!(machine.syscall(nr::SYS_GET_TIME, [0; 3]), Some(2));
}

#[test]
fn exec_starts_a_named_child() {
    let mut machine = Machine::boot(&programs()[..1]);
    machine.run_until(A);
    machine.write(buffer(1), b"child\0");
    assert_eq!(machine.syscall(nr::PROC_EXEC, [buffer(1), 0x4000, 0]), Some(2));

    machine.run_until(Pid(2));
    assert_eq!(machine.syscall(nr::PROC_GET_PID, [0; 3]), Some(2));
    assert_eq!(machine.syscall(nr::PROC_GET_NAME, [buffer(2), 0, 0]), Some(0));
    assert_eq!(machine.read(buffer(2), 6), b"child\0");
}

#[test]
fn full_table_rejects_creation() {
    let mut machine = Machine::boot(&[]);
    machine.write(buffer(0), b"filler\0");
    for expected in 1..PROC_MAX as i64 {
        assert_eq!(machine.syscall(nr::PROC_EXEC, [buffer(0), 0x2000, 0]), Some(expected));
    }
    assert!(machine.kernel.processes().is_full());
    assert_eq!(machine.syscall(nr::PROC_EXEC, [buffer(0), 0x2000, 0]), Some(-1));
    assert_eq!(machine.kernel.processes().len(), PROC_MAX);
}

#[test]
fn exit_frees_the_slot_without_reusing_the_pid() {
    let mut machine = Machine::boot(&programs()[..1]);
    machine.run_until(A);
    assert_eq!(machine.syscall(nr::PROC_EXIT, [0; 3]), None);
    assert_eq!(machine.current(), Pid::IDLE);
    assert_eq!(machine.kernel.processes().len(), 1);

    machine.write(buffer(0), b"again\0");
    assert_eq!(machine.syscall(nr::PROC_EXEC, [buffer(0), 0x2000, 0]), Some(2));
}

#[test]
fn idle_cannot_exit() {
    let mut machine = Machine::boot(&[]);
    assert_eq!(machine.syscall(nr::PROC_EXIT, [0; 3]), Some(-1));
    assert_eq!(machine.current(), Pid::IDLE);
}

#[test]
fn operator_keys_control_processes() {
    let mut machine = Machine::boot(&programs()[..1]);
    machine.kernel.bind_key('n', Program::new("newbie", 0x5000));
    machine.run_until(A);

    machine.kernel.platform_mut().push_key('x');
    machine.tick();
    assert_eq!(machine.state(A), None);
    assert_eq!(machine.current(), Pid::IDLE);

    machine.kernel.platform_mut().push_key('n');
    machine.tick();
    assert_eq!(machine.state(B), Some(ProcessState::Running));
    assert_eq!(machine.kernel.processes().get(B).unwrap().name.as_str(), "newbie");

    machine.kernel.platform_mut().push_key('q');
    machine.tick();
    assert!(machine.kernel.platform().is_halted());
}

#[test]
fn statistics_repaint_on_every_trap() {
    let config = KernelConfig::default();
    assert!(config.show_stats);
    let mut machine = Machine::boot_with(config, &programs());
    machine.ticks(5);

    let screen = machine.kernel.platform();
    assert!(screen.row_text(1).contains("idle task"));
    assert!(screen.row_text(2).contains("alpha"));
    assert!(screen.row_text(3).contains("beta"));
    // Painted during the trap, before the pass that activated alpha.
    assert_eq!(screen.attr_at(1, 0), Attr::Active);

    machine.kernel.platform_mut().push_key('s');
    machine.tick();
    assert!(!machine.kernel.console().show_stats());
    assert_eq!(machine.kernel.platform().clear_count(), 1);
}
