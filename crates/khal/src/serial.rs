//! Serial port (COM1 UART 16550) driver.
//!
//! COM1 carries both the kernel log and, on the PC platform, the painted
//! statistics panel. Output is polled; the UART's own interrupt stays off.

use core::fmt;
use spin::Mutex;

use crate::port::{inb, outb};

/// COM1 base port address
const COM1_PORT: u16 = 0x3F8;

/// Register offsets from the base port.
const DATA: u16 = 0;
const INT_ENABLE: u16 = 1;
const FIFO_CTRL: u16 = 2;
const LINE_CTRL: u16 = 3;
const MODEM_CTRL: u16 = 4;
const LINE_STATUS: u16 = 5;

/// Line status: transmit holding register empty.
const LSR_THR_EMPTY: u8 = 0x20;

/// Register writes that bring the UART to 115200 baud, 8N1, FIFOs on.
const INIT_SEQUENCE: [(u16, u8); 7] = [
    (INT_ENABLE, 0x00), // No UART interrupts
    (LINE_CTRL, 0x80),  // DLAB on
    (DATA, 0x01),       // Divisor low byte (115200)
    (INT_ENABLE, 0x00), // Divisor high byte
    (LINE_CTRL, 0x03),  // 8N1, DLAB off
    (FIFO_CTRL, 0xC7),  // Enable and clear FIFOs, 14-byte threshold
    (MODEM_CTRL, 0x0B), // DTR, RTS, OUT2
];

/// Serial port driver for COM1
pub struct Serial {
    initialized: bool,
}

impl Serial {
    const fn new() -> Self {
        Self { initialized: false }
    }

    /// Program the UART. Safe to call more than once.
    pub fn init(&mut self) {
        for (offset, value) in INIT_SEQUENCE {
            unsafe { outb(COM1_PORT + offset, value) };
        }
        self.initialized = true;
    }

    fn transmit_empty() -> bool {
        unsafe { inb(COM1_PORT + LINE_STATUS) & LSR_THR_EMPTY != 0 }
    }

    /// Write a byte, spinning until the transmitter is free.
    pub fn write_byte(&self, byte: u8) {
        if !self.initialized {
            return;
        }
        while !Self::transmit_empty() {
            core::hint::spin_loop();
        }
        unsafe { outb(COM1_PORT + DATA, byte) };
    }
}

impl fmt::Write for Serial {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            self.write_byte(byte);
        }
        Ok(())
    }
}

/// Global serial port instance (COM1)
static SERIAL: Mutex<Serial> = Mutex::new(Serial::new());

/// Initialize the global serial port
pub fn init() {
    SERIAL.lock().init();
}

/// Write a string to the serial port
pub fn write_str(s: &str) {
    use fmt::Write;
    let _ = SERIAL.lock().write_str(s);
}

/// Write formatted arguments to the serial port
pub fn write_fmt(args: fmt::Arguments) -> fmt::Result {
    use fmt::Write;
    SERIAL.lock().write_fmt(args)
}

/// Run `f` with the locked serial port as a [`fmt::Write`] sink, so a
/// multi-part record is not interleaved with other output.
pub fn with_port<R>(f: impl FnOnce(&mut Serial) -> R) -> R {
    f(&mut SERIAL.lock())
}
