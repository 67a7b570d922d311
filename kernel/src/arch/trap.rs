//! Bare-metal trap entry and the kernel singleton.
//!
//! Both routed vectors share one path: the stub pushes a [`TrapFrame`] on
//! the interrupted stack, calls [`kernel_trap`] with a pointer to it, then
//! switches `rsp` to whichever frame comes back and pops it. Resuming a
//! different process is therefore just returning a different frame.

use core::arch::naked_asm;

use khal::PcPlatform;
use log::LevelFilter;
use spin::{Mutex, Once};

use super::idt::{Gate, Idt};
use crate::config::{SYSCALL_VECTOR, TICKS_PER_SECOND, TIMER_VECTOR};
use crate::kernel::Kernel;
use crate::task::context::KERNEL_CODE_SELECTOR;
use crate::task::{Program, TrapFrame};

static KERNEL: Mutex<Option<Kernel<PcPlatform>>> = Mutex::new(None);
static IDT: Once<Idt> = Once::new();

/// Pop a full [`TrapFrame`] starting at `rsp` and return from the trap.
macro_rules! restore_frame {
    () => {
        concat!(
            "pop r15\n", "pop r14\n", "pop r13\n", "pop r12\n",
            "pop r11\n", "pop r10\n", "pop r9\n", "pop r8\n",
            "pop rbp\n", "pop rdi\n", "pop rsi\n", "pop rdx\n",
            "pop rcx\n", "pop rbx\n", "pop rax\n",
            // vector and error code
            "add rsp, 16\n",
            "iretq\n",
        )
    };
}

/// Save registers below the CPU-pushed frame and enter the kernel.
macro_rules! trap_stub {
    ($name:ident, $vector:expr) => {
        #[unsafe(naked)]
        unsafe extern "C" fn $name() {
            naked_asm!(
                "push 0",
                "push {vector}",
                "push rax", "push rbx", "push rcx", "push rdx",
                "push rsi", "push rdi", "push rbp",
                "push r8", "push r9", "push r10", "push r11",
                "push r12", "push r13", "push r14", "push r15",
                "mov rdi, rsp",
                "call {trap}",
                "mov rsp, rax",
                restore_frame!(),
                vector = const $vector,
                trap = sym kernel_trap,
            );
        }
    };
}

trap_stub!(timer_entry, TIMER_VECTOR);
trap_stub!(syscall_entry, SYSCALL_VECTOR);

/// Switch to `frame` and resume it.
#[unsafe(naked)]
unsafe extern "C" fn resume(frame: *const TrapFrame) -> ! {
    naked_asm!("mov rsp, rdi", restore_frame!());
}

extern "C" fn kernel_trap(frame: *const TrapFrame) -> *const TrapFrame {
    let mut guard = KERNEL.lock();
    let Some(kernel) = guard.as_mut() else {
        panic!("trap before the kernel was started");
    };
    // SAFETY: the stub passes the frame it has just pushed.
    let frame = unsafe { &*frame };
    kernel.trap(frame) as *const TrapFrame
}

/// Body of the idle process.
extern "C" fn idle_loop() -> ! {
    loop {
        x86_64::instructions::hlt();
    }
}

/// Bring up the machine, boot the kernel with `programs` and `hotkeys`,
/// and resume the first process.
///
/// # Safety
/// Must be called once, from the boot stack, with interrupts disabled,
/// after a GDT with a 64-bit code segment at `KERNEL_CODE_SELECTOR` is
/// loaded and the global allocator is ready.
pub unsafe fn start(programs: &[Program], hotkeys: &[(char, Program)]) -> ! {
    klog::init(LevelFilter::Info);
    log::info!("SliceOS starting");

    let platform = unsafe { PcPlatform::init(TICKS_PER_SECOND as u32) };

    let idt = IDT.call_once(|| {
        let mut idt = Idt::new();
        let selector = KERNEL_CODE_SELECTOR as u16;
        idt.set(TIMER_VECTOR as u8, Gate::interrupt(timer_entry as usize as u64, selector));
        idt.set(SYSCALL_VECTOR as u8, Gate::interrupt(syscall_entry as usize as u64, selector));
        idt
    });
    // SAFETY: both present gates point at the stubs above.
    unsafe { idt.load() };

    let mut kernel = Kernel::new(platform);
    for &(key, program) in hotkeys {
        if !kernel.bind_key(key, program) {
            log::warn!("key '{}' is reserved; '{}' not bound", key, program.name);
        }
    }
    kernel.boot(idle_loop as usize as u64, programs);

    let frame = {
        let mut guard = KERNEL.lock();
        let kernel = guard.insert(kernel);
        kernel.active_context() as *const TrapFrame
    };
    // SAFETY: the frame lives inside KERNEL, which is never dropped.
    unsafe { resume(frame) }
}

/// [`start`] with the stock `libslice` programs: `init` at boot, and the
/// `n`, `p` and `c` keys bound to the test, producer and consumer programs.
///
/// # Safety
/// As for [`start`].
pub unsafe fn start_with_programs() -> ! {
    let program = |name: &'static str, entry: libslice::Entry| Program::new(name, entry as usize as u64);
    let startup = [program("init", libslice::entry::init)];
    let hotkeys = [
        ('n', program("test", libslice::entry::test)),
        ('p', program("producer", libslice::entry::producer)),
        ('c', program("consumer", libslice::entry::consumer)),
    ];
    unsafe { start(&startup, &hotkeys) }
}
