use std::cell::Cell;
use std::rc::Rc;

use crate::address_map::INTERRUPTS;
use crate::register_file::Bit;

/// The five interrupt lines, in priority order (lowest bit wins).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Interrupt {
    VBlank = 0,
    LcdStat = 1,
    Timer = 2,
    Serial = 3,
    Joypad = 4,
}

impl Interrupt {
    pub const ALL: [Interrupt; 5] = [
        Interrupt::VBlank,
        Interrupt::LcdStat,
        Interrupt::Timer,
        Interrupt::Serial,
        Interrupt::Joypad,
    ];

    /// Bits of IE/IF that correspond to an interrupt line.
    pub const LINES_MASK: u8 = 0x1F;

    /// Highest-priority interrupt among the set bits of `pending`.
    pub fn highest_priority(pending: u8) -> Option<Interrupt> {
        let pending = pending & Self::LINES_MASK;
        if pending == 0 {
            return None;
        }
        Some(Self::ALL[pending.trailing_zeros() as usize])
    }

    /// Handler address.
    pub fn vector(self) -> u16 {
        INTERRUPTS[self as usize]
    }
}

impl Bit for Interrupt {
    fn index(self) -> u32 {
        self as u32
    }
}

/// Shared handle to the interrupt-flag register (IF).
///
/// The CPU owns the register and maps it at `0xFF0F`; the timer, the
/// display controller and the joypad keep a clone to raise requests. All
/// clones refer to the same byte.
#[derive(Clone, Debug, Default)]
pub struct InterruptLine {
    flags: Rc<Cell<u8>>,
}

impl InterruptLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self, interrupt: Interrupt) {
        self.flags.set(self.flags.get() | interrupt.mask());
    }

    pub fn clear(&self, interrupt: Interrupt) {
        self.flags.set(self.flags.get() & !interrupt.mask());
    }

    pub fn is_requested(&self, interrupt: Interrupt) -> bool {
        self.flags.get() & interrupt.mask() != 0
    }

    pub fn flags(&self) -> u8 {
        self.flags.get()
    }

    pub fn set_flags(&self, value: u8) {
        self.flags.set(value);
    }
}
