//! Text display attributes and ANSI terminal encoding.
//!
//! The kernel paints its statistics panel with abstract [`Attr`]s. A
//! serial terminal understands ANSI escape sequences, so the PC platform
//! turns each paint call into a cursor move followed by a colour change.

use core::fmt;

/// Display attribute of a painted span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Attr {
    /// Plain text.
    #[default]
    Default,
    /// Column headers.
    Header,
    /// The process currently executing.
    Active,
    /// A process waiting for its wake-up tick.
    Sleeping,
    /// A process blocked on a mutex or mailbox.
    Waiting,
}

impl Attr {
    /// ANSI SGR sequence selecting this attribute's colours.
    pub fn sgr(&self) -> &'static str {
        match self {
            Attr::Default => "\x1b[37;40m",  // White on black
            Attr::Header => "\x1b[30;46m",   // Black on cyan
            Attr::Active => "\x1b[97;42m",   // White on green
            Attr::Sleeping => "\x1b[33;40m", // Yellow on black
            Attr::Waiting => "\x1b[36;40m",  // Cyan on black
        }
    }
}

/// Reset all character attributes.
pub const SGR_RESET: &str = "\x1b[0m";

/// Erase the terminal and home the cursor.
pub const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Write `text` at zero-based (`row`, `col`) using `attr`.
pub fn write_painted<W: fmt::Write>(
    out: &mut W,
    row: usize,
    col: usize,
    attr: Attr,
    text: &str,
) -> fmt::Result {
    // ANSI cursor positions are one-based.
    write!(out, "\x1b[{};{}H{}{}{}", row + 1, col + 1, attr.sgr(), text, SGR_RESET)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn painted_span_moves_cursor_then_colours() {
        let mut out = String::new();
        write_painted(&mut out, 0, 50, Attr::Header, "Mutex").unwrap();
        assert_eq!(out, "\x1b[1;51H\x1b[30;46mMutex\x1b[0m");
    }

    #[test]
    fn default_attr_is_plain() {
        assert_eq!(Attr::default(), Attr::Default);
    }
}
