//! Kernel logging subsystem.
//!
//! Kernel code logs through the `log` facade (`log::info!` and friends).
//! This crate provides the backend: a [`log::Log`] implementation that
//! writes one coloured line per record to the COM1 serial port.
#![cfg_attr(not(test), no_std)]

use core::fmt;
use log::Level;
#[cfg(target_arch = "x86_64")]
use log::LevelFilter;

/// Fixed-width label for a level.
pub fn label(level: Level) -> &'static str {
    match level {
        Level::Trace => "TRACE",
        Level::Debug => "DEBUG",
        Level::Info => " INFO",
        Level::Warn => " WARN",
        Level::Error => "ERROR",
    }
}

/// ANSI colour for a level.
pub fn color(level: Level) -> &'static str {
    match level {
        Level::Trace => "\x1b[90m", // Gray
        Level::Debug => "\x1b[36m", // Cyan
        Level::Info => "\x1b[32m",  // Green
        Level::Warn => "\x1b[33m",  // Yellow
        Level::Error => "\x1b[31m", // Red
    }
}

/// Render one log line: `[LEVEL] target: message`.
pub fn format_record<W: fmt::Write>(
    out: &mut W,
    level: Level,
    target: &str,
    args: fmt::Arguments,
) -> fmt::Result {
    write!(out, "{}[{}]\x1b[0m {}: {}\n", color(level), label(level), target, args)
}

#[cfg(target_arch = "x86_64")]
mod serial_logger {
    use log::{Log, Metadata, Record};

    pub struct SerialLogger;

    impl Log for SerialLogger {
        fn enabled(&self, metadata: &Metadata) -> bool {
            metadata.level() <= log::max_level()
        }

        fn log(&self, record: &Record) {
            if !self.enabled(record.metadata()) {
                return;
            }
            khal::serial::with_port(|port| {
                let _ = super::format_record(port, record.level(), record.target(), *record.args());
            });
        }

        fn flush(&self) {}
    }

    pub static LOGGER: SerialLogger = SerialLogger;
}

#[cfg(target_arch = "x86_64")]
static INIT: spin::Once<()> = spin::Once::new();

/// Initialize the serial port and install the kernel logger.
///
/// The logger is installed once; later calls only change `max_level`.
#[cfg(target_arch = "x86_64")]
pub fn init(max_level: LevelFilter) {
    INIT.call_once(|| {
        khal::serial::init();
        let _ = log::set_logger(&serial_logger::LOGGER);
    });
    log::set_max_level(max_level);
}

/// Print to serial without a level prefix. Used where the logger itself
/// may be unusable, e.g. from the panic handler.
#[cfg(target_arch = "x86_64")]
pub fn print(args: fmt::Arguments) {
    let _ = khal::serial::write_fmt(args);
}

/// Print without newline
#[cfg(target_arch = "x86_64")]
#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => {
        $crate::print(format_args!($($arg)*))
    };
}

/// Print with newline
#[cfg(target_arch = "x86_64")]
#[macro_export]
macro_rules! println {
    () => ($crate::print!("\n"));
    ($($arg:tt)*) => {{
        $crate::print(format_args!($($arg)*));
        $crate::print(format_args!("\n"));
    }};
}
