//! Hosted machine model.
//!
//! `SimPlatform` stands in for the PC when the kernel runs on a
//! development host: process memory is a flat byte array, the keyboard is
//! a queue the test pushes into, and the display is an 80x25 grid of
//! character cells that can be read back.

use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use crate::display::Attr;
use crate::platform::{IRQ_LINES, MemoryFault, Platform};

/// Lowest valid simulated address. Address 0 always faults.
pub const SIM_MEMORY_BASE: u64 = 0x1000;

/// Text display width in cells.
pub const SCREEN_COLS: usize = 80;
/// Text display height in cells.
pub const SCREEN_ROWS: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    attr: Attr,
}

const BLANK: Cell = Cell { ch: ' ', attr: Attr::Default };

/// Simulated platform used by host-side tests.
pub struct SimPlatform {
    memory: Vec<u8>,
    /// Bit N set means IRQ N is masked.
    irq_mask: u16,
    acknowledged: Vec<u8>,
    keys: VecDeque<char>,
    screen: Vec<Cell>,
    clears: usize,
    halted: bool,
}

impl SimPlatform {
    /// A machine with `memory_size` bytes of process memory starting at
    /// [`SIM_MEMORY_BASE`]. All IRQs start masked.
    pub fn new(memory_size: usize) -> Self {
        Self {
            memory: vec![0; memory_size],
            irq_mask: 0xFFFF,
            acknowledged: Vec::new(),
            keys: VecDeque::new(),
            screen: vec![BLANK; SCREEN_COLS * SCREEN_ROWS],
            clears: 0,
            halted: false,
        }
    }

    fn range(&self, addr: u64, len: usize) -> Result<core::ops::Range<usize>, MemoryFault> {
        let fault = MemoryFault { addr, len };
        let start = addr.checked_sub(SIM_MEMORY_BASE).ok_or(fault)? as usize;
        let end = start.checked_add(len).ok_or(fault)?;
        if end > self.memory.len() {
            return Err(fault);
        }
        Ok(start..end)
    }

    /// Queue a keystroke for the next [`Platform::poll_key`].
    pub fn push_key(&mut self, ch: char) {
        self.keys.push_back(ch);
    }

    /// Whether `irq` is currently unmasked.
    pub fn irq_enabled(&self, irq: u8) -> bool {
        irq_bit(irq).is_some_and(|bit| self.irq_mask & bit == 0)
    }

    /// Every IRQ acknowledged so far, oldest first.
    pub fn acknowledged(&self) -> &[u8] {
        &self.acknowledged
    }

    /// Number of times the screen was cleared.
    pub fn clear_count(&self) -> usize {
        self.clears
    }

    /// Whether [`Platform::halt`] was called.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Characters on `row`, with trailing blanks removed.
    pub fn row_text(&self, row: usize) -> String {
        let start = row * SCREEN_COLS;
        let text: String = self.screen[start..start + SCREEN_COLS]
            .iter()
            .map(|cell| cell.ch)
            .collect();
        String::from(text.trim_end())
    }

    /// Attribute of the cell at (`row`, `col`).
    pub fn attr_at(&self, row: usize, col: usize) -> Attr {
        self.screen[row * SCREEN_COLS + col].attr
    }

    /// Test helper: read `len` bytes of process memory.
    pub fn peek(&self, addr: u64, len: usize) -> Result<Vec<u8>, MemoryFault> {
        let range = self.range(addr, len)?;
        Ok(self.memory[range].to_vec())
    }

    /// Test helper: write bytes into process memory.
    pub fn poke(&mut self, addr: u64, data: &[u8]) -> Result<(), MemoryFault> {
        let range = self.range(addr, data.len())?;
        self.memory[range].copy_from_slice(data);
        Ok(())
    }
}

impl Default for SimPlatform {
    fn default() -> Self {
        Self::new(64 * 1024)
    }
}

/// Mask bit for `irq`, if the line exists.
fn irq_bit(irq: u8) -> Option<u16> {
    (irq < IRQ_LINES).then(|| 1 << irq)
}

impl Platform for SimPlatform {
    fn enable_irq(&mut self, irq: u8) {
        if let Some(bit) = irq_bit(irq) {
            self.irq_mask &= !bit;
        }
    }

    fn disable_irq(&mut self, irq: u8) {
        if let Some(bit) = irq_bit(irq) {
            self.irq_mask |= bit;
        }
    }

    fn acknowledge_irq(&mut self, irq: u8) {
        self.acknowledged.push(irq);
    }

    fn poll_key(&mut self) -> Option<char> {
        self.keys.pop_front()
    }

    fn clear_screen(&mut self) {
        self.screen.fill(BLANK);
        self.clears += 1;
    }

    fn paint(&mut self, row: usize, col: usize, attr: Attr, text: &str) {
        if row >= SCREEN_ROWS {
            return;
        }
        let line = &mut self.screen[row * SCREEN_COLS..(row + 1) * SCREEN_COLS];
        for (cell, ch) in line.iter_mut().skip(col).zip(text.chars()) {
            *cell = Cell { ch, attr };
        }
    }

    fn halt(&mut self) {
        self.halted = true;
    }

    fn copy_from_user(&self, addr: u64, buf: &mut [u8]) -> Result<(), MemoryFault> {
        let range = self.range(addr, buf.len())?;
        buf.copy_from_slice(&self.memory[range]);
        Ok(())
    }

    fn copy_to_user(&mut self, addr: u64, data: &[u8]) -> Result<(), MemoryFault> {
        self.poke(addr, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_and_out_of_range_accesses_fault() {
        let mut sim = SimPlatform::new(16);
        let mut buf = [0u8; 4];
        assert!(sim.copy_from_user(0, &mut buf).is_err());
        assert!(sim.copy_to_user(SIM_MEMORY_BASE + 14, &[1, 2, 3]).is_err());
        assert!(sim.copy_to_user(SIM_MEMORY_BASE + 12, &[1, 2, 3, 4]).is_ok());
        sim.copy_from_user(SIM_MEMORY_BASE + 12, &mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3, 4]);
    }

    #[test]
    fn irqs_start_masked() {
        let mut sim = SimPlatform::default();
        assert!(!sim.irq_enabled(0));
        sim.enable_irq(0);
        assert!(sim.irq_enabled(0));
        sim.disable_irq(0);
        assert!(!sim.irq_enabled(0));
    }

    #[test]
    fn lines_past_the_controller_are_ignored() {
        let mut sim = SimPlatform::default();
        sim.enable_irq(15);
        sim.enable_irq(16);
        sim.enable_irq(200);
        assert!(sim.irq_enabled(15));
        assert!(!sim.irq_enabled(16));
        assert!(!sim.irq_enabled(200));
    }

    #[test]
    fn paint_clips_at_right_edge() {
        let mut sim = SimPlatform::default();
        sim.paint(2, 76, Attr::Active, "abcdef");
        assert_eq!(sim.row_text(2).trim_start(), "abcd");
        assert_eq!(sim.attr_at(2, 79), Attr::Active);
        sim.clear_screen();
        assert_eq!(sim.row_text(2), "");
        assert_eq!(sim.clear_count(), 1);
    }

    #[test]
    fn keys_are_delivered_in_order() {
        let mut sim = SimPlatform::default();
        sim.push_key('n');
        sim.push_key('s');
        assert_eq!(sim.poll_key(), Some('n'));
        assert_eq!(sim.poll_key(), Some('s'));
        assert_eq!(sim.poll_key(), None);
    }
}
