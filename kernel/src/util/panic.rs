// =============================================================================
// SliceOS: Kernel Panic Handler
// =============================================================================
//
// Every broken kernel invariant ends here: a process missing from the
// table, a full wait queue, an unknown syscall number, a trap on a vector
// nobody routed. None of these can be reported to a process, because the
// kernel's own bookkeeping is no longer trustworthy.
//
// WHAT WE DO:
//   1. Print the message and location to COM1
//   2. Disable interrupts and halt
//
// The serial port is the one output that does not depend on the kernel
// tables, so the message goes there directly rather than through the
// statistics display.
// =============================================================================

use core::panic::PanicInfo;

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    klog::println!();
    klog::println!("==========================================================");
    klog::println!("  KERNEL PANIC: SliceOS");
    klog::println!("==========================================================");

    match info.location() {
        Some(location) => klog::println!("  Location: {}:{}", location.file(), location.line()),
        None => klog::println!("  Location: <unknown>"),
    }
    klog::println!("  Message: {}", info.message());

    klog::println!("==========================================================");
    klog::println!("  System halted.");
    klog::println!("==========================================================");

    x86_64::instructions::interrupts::disable();
    loop {
        x86_64::instructions::hlt();
    }
}
