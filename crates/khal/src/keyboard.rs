//! Polled PS/2 keyboard.
//!
//! The kernel only wants one character per trap for its operator console,
//! so the controller is polled instead of interrupt driven. Scancodes are
//! decoded with the `pc-keyboard` state machine (set 1, US 104-key).

use crate::port::inb;
use pc_keyboard::{layouts, DecodedKey, HandleControl, Keyboard, ScancodeSet1};
use spin::Mutex;

/// Data port: scancodes are read here.
const PS2_DATA: u16 = 0x60;
/// Status port.
const PS2_STATUS: u16 = 0x64;
/// Status bit: output buffer holds a byte for us.
const STATUS_OUTPUT_FULL: u8 = 0x01;

static KEYBOARD: Mutex<Option<Keyboard<layouts::Us104Key, ScancodeSet1>>> = Mutex::new(None);

/// Set up the decoder. Must run before [`poll`].
pub fn init() {
    let kb = Keyboard::new(
        ScancodeSet1::new(),
        layouts::Us104Key,
        HandleControl::MapLettersToUnicode,
    );
    *KEYBOARD.lock() = Some(kb);
}

/// Feed one scancode through the decoder, returning a character on key
/// press. Releases, modifiers and non-printing keys yield `None`.
pub fn decode(scancode: u8) -> Option<char> {
    let mut guard = KEYBOARD.lock();
    let kb = guard.as_mut()?;
    let event = kb.add_byte(scancode).ok()??;
    match kb.process_keyevent(event)? {
        DecodedKey::Unicode(ch) => Some(ch),
        DecodedKey::RawKey(_) => None,
    }
}

/// Return a pending character if the controller has one.
pub fn poll() -> Option<char> {
    let status = unsafe { inb(PS2_STATUS) };
    if status & STATUS_OUTPUT_FULL == 0 {
        return None;
    }
    let scancode = unsafe { inb(PS2_DATA) };
    decode(scancode)
}
