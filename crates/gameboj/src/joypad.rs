use std::any::Any;

use crate::address_map::REG_P1;
use crate::bus::{Component, Interrupt, InterruptLine};
use crate::register_file::Bit;

/// Row selection bits of P1. A row is selected when its bit is written 0.
const SELECT_DIRECTIONS: u8 = 1 << 4;
const SELECT_BUTTONS: u8 = 1 << 5;
const SELECT_MASK: u8 = SELECT_DIRECTIONS | SELECT_BUTTONS;
const LINES_MASK: u8 = 0x0F;

/// The eight buttons. The first four form the direction row, the last
/// four the button row; within a row, a key's position is its P1 line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    Right,
    Left,
    Up,
    Down,
    A,
    B,
    Select,
    Start,
}

impl Key {
    pub const ALL: [Key; 8] = [
        Key::Right,
        Key::Left,
        Key::Up,
        Key::Down,
        Key::A,
        Key::B,
        Key::Select,
        Key::Start,
    ];

    fn row(self) -> usize {
        self as usize / 4
    }
}

impl Bit for Key {
    fn index(self) -> u32 {
        self as u32 % 4
    }
}

/// Keypad matrix behind register P1 (`0xFF00`).
///
/// Software selects a row through bits 4 and 5 and reads the state of its
/// four keys in bits 0 to 3, all active low. A line of the selected rows
/// going low, either because a key is pressed or because a row with a
/// held key gets selected, requests the JOYPAD interrupt.
pub struct Joypad {
    /// P1 bits 4 and 5 as last written.
    select: u8,
    /// Pressed keys of each row, active high.
    rows: [u8; 2],
    interrupts: InterruptLine,
}

impl Joypad {
    pub fn new(interrupts: InterruptLine) -> Self {
        Self {
            select: SELECT_MASK,
            rows: [0; 2],
            interrupts,
        }
    }

    pub fn key_pressed(&mut self, key: Key) {
        let before = self.active_lines();
        self.rows[key.row()] |= key.mask();
        self.signal_new_lines(before);
    }

    pub fn key_released(&mut self, key: Key) {
        self.rows[key.row()] &= !key.mask();
    }

    pub fn is_pressed(&self, key: Key) -> bool {
        self.rows[key.row()] & key.mask() != 0
    }

    /// Lines pulled low by pressed keys of the selected rows, active high.
    fn active_lines(&self) -> u8 {
        let mut lines = 0;
        if self.select & SELECT_DIRECTIONS == 0 {
            lines |= self.rows[0];
        }
        if self.select & SELECT_BUTTONS == 0 {
            lines |= self.rows[1];
        }
        lines
    }

    fn signal_new_lines(&self, before: u8) {
        if self.active_lines() & !before != 0 {
            self.interrupts.request(Interrupt::Joypad);
        }
    }
}

impl Component for Joypad {
    fn read(&self, address: u16) -> Option<u8> {
        (address == REG_P1).then(|| 0xC0 | self.select | (!self.active_lines() & LINES_MASK))
    }

    fn write(&mut self, address: u16, data: u8) {
        if address == REG_P1 {
            let before = self.active_lines();
            self.select = data & SELECT_MASK;
            self.signal_new_lines(before);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
