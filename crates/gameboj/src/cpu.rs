//! Sharp LR35902 CPU.
//!
//! The CPU runs one instruction (or one interrupt entry) whenever the
//! machine cycle reaches `next_non_idle_cycle`, then schedules its next
//! action after the instruction's cost. HALT parks the schedule at
//! `u64::MAX` until an enabled interrupt becomes pending.

pub mod alu;
mod exec;
mod helpers;
mod interrupts;
pub mod opcode;

use std::any::Any;

use anyhow::Result;

use crate::address_map::{
    in_range, HIGH_RAM_END, HIGH_RAM_SIZE, HIGH_RAM_START, REG_IE, REG_IF,
};
use crate::bus::{BusView, Component, Interrupt, InterruptLine};
use crate::memory::Ram;
use crate::register_file::{Register, RegisterFile};

pub use alu::Flag;

/// 8-bit registers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reg {
    A,
    F,
    B,
    C,
    D,
    E,
    H,
    L,
}

impl Register for Reg {
    const COUNT: usize = 8;

    fn index(self) -> usize {
        self as usize
    }
}

/// Register pairs, high register first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reg16 {
    AF,
    BC,
    DE,
    HL,
}

impl Reg16 {
    fn pair(self) -> (Reg, Reg) {
        match self {
            Reg16::AF => (Reg::A, Reg::F),
            Reg16::BC => (Reg::B, Reg::C),
            Reg16::DE => (Reg::D, Reg::E),
            Reg16::HL => (Reg::H, Reg::L),
        }
    }
}

/// Copy of the programmer-visible CPU state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CpuState {
    pub pc: u16,
    pub sp: u16,
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    pub ime: bool,
    pub ie: u8,
    pub if_: u8,
}

/// The CPU also answers IE (`0xFFFF`), IF (`0xFF0F`) and high RAM
/// (`0xFF80..0xFFFF`) on the bus.
pub struct Cpu {
    regs: RegisterFile<Reg>,
    pc: u16,
    sp: u16,
    /// Interrupt master enable, set by EI and RETI, cleared by DI and on
    /// interrupt entry.
    ime: bool,
    /// Interrupt enable register (IE).
    ie: u8,
    /// Shared interrupt request register (IF).
    interrupts: InterruptLine,
    high_ram: Ram,
    /// Cycle of the next instruction or interrupt entry; `u64::MAX` while
    /// halted.
    next_non_idle_cycle: u64,
}

impl Cpu {
    /// A CPU in its power-on state (every register zero) whose IF register
    /// is shared through `interrupts`.
    pub fn new(interrupts: InterruptLine) -> Self {
        Self {
            regs: RegisterFile::new(),
            pc: 0,
            sp: 0,
            ime: false,
            ie: 0,
            interrupts,
            high_ram: Ram::new(HIGH_RAM_SIZE),
            next_non_idle_cycle: 0,
        }
    }

    /// Registers as left by the DMG boot program when it hands over to the
    /// cartridge at `0x0100`.
    pub fn set_post_boot_state(&mut self) {
        self.set_reg16(Reg16::AF, 0x01B0);
        self.set_reg16(Reg16::BC, 0x0013);
        self.set_reg16(Reg16::DE, 0x00D8);
        self.set_reg16(Reg16::HL, 0x014D);
        self.sp = 0xFFFE;
        self.pc = 0x0100;
    }

    pub fn state(&self) -> CpuState {
        CpuState {
            pc: self.pc,
            sp: self.sp,
            a: self.regs.get(Reg::A),
            f: self.regs.get(Reg::F),
            b: self.regs.get(Reg::B),
            c: self.regs.get(Reg::C),
            d: self.regs.get(Reg::D),
            e: self.regs.get(Reg::E),
            h: self.regs.get(Reg::H),
            l: self.regs.get(Reg::L),
            ime: self.ime,
            ie: self.ie,
            if_: self.interrupts.flags(),
        }
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn sp(&self) -> u16 {
        self.sp
    }

    pub fn reg(&self, r: Reg) -> u8 {
        self.regs.get(r)
    }

    pub fn next_non_idle_cycle(&self) -> u64 {
        self.next_non_idle_cycle
    }

    /// Whether the CPU is halted, waiting for an interrupt.
    pub fn is_halted(&self) -> bool {
        self.next_non_idle_cycle == u64::MAX
    }

    pub fn request_interrupt(&self, interrupt: Interrupt) {
        self.interrupts.request(interrupt);
    }
}

impl Component for Cpu {
    fn read(&self, address: u16) -> Option<u8> {
        match address {
            REG_IE => Some(self.ie),
            REG_IF => Some(self.interrupts.flags()),
            _ if in_range(address, HIGH_RAM_START, HIGH_RAM_END) => {
                Some(self.high_ram.read((address - HIGH_RAM_START) as usize))
            }
            _ => None,
        }
    }

    fn write(&mut self, address: u16, data: u8) {
        match address {
            REG_IE => self.ie = data,
            REG_IF => self.interrupts.set_flags(data),
            _ if in_range(address, HIGH_RAM_START, HIGH_RAM_END) => {
                self.high_ram.write((address - HIGH_RAM_START) as usize, data)
            }
            _ => {}
        }
    }

    fn cycle(&mut self, cycle: u64, bus: &mut BusView<'_>) -> Result<()> {
        debug_assert!(
            cycle <= self.next_non_idle_cycle,
            "cycle {cycle} is past the CPU schedule {}",
            self.next_non_idle_cycle
        );
        if self.is_halted() && self.pending_interrupts() != 0 {
            log::debug!("CPU leaves HALT at cycle {cycle}");
            self.next_non_idle_cycle = cycle;
        }
        if cycle == self.next_non_idle_cycle {
            self.really_cycle(bus)?;
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests;
