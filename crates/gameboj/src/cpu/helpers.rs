use gameboj_common::bits;

use super::alu::{self, Flag, RotDir};
use super::opcode::Opcode;
use super::{Cpu, Reg, Reg16};
use crate::bus::BusView;

/// Registers selected by a 3-bit field; 6 stands for `(HL)` and is decoded
/// by dedicated instruction families.
const REG_FIELD: [Option<Reg>; 8] = [
    Some(Reg::B),
    Some(Reg::C),
    Some(Reg::D),
    Some(Reg::E),
    Some(Reg::H),
    Some(Reg::L),
    None,
    Some(Reg::A),
];

const REG16_FIELD: [Reg16; 4] = [Reg16::BC, Reg16::DE, Reg16::HL, Reg16::AF];

/// Where an instruction takes each flag from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum FlagSrc {
    /// Forced to 0.
    V0,
    /// Forced to 1.
    V1,
    /// Taken from the ALU result.
    Alu,
    /// Left as it was in F.
    Cpu,
}

impl Cpu {
    // Bus access

    pub(super) fn read8(&self, bus: &BusView<'_>, address: u16) -> u8 {
        bus.read(self, address)
    }

    pub(super) fn read8_at_hl(&self, bus: &BusView<'_>) -> u8 {
        self.read8(bus, self.reg16(Reg16::HL))
    }

    pub(super) fn read8_after_opcode(&self, bus: &BusView<'_>) -> u8 {
        self.read8(bus, self.pc.wrapping_add(1))
    }

    pub(super) fn read16(&self, bus: &BusView<'_>, address: u16) -> u16 {
        let low = self.read8(bus, address);
        let high = self.read8(bus, address.wrapping_add(1));
        u16::from_le_bytes([low, high])
    }

    pub(super) fn read16_after_opcode(&self, bus: &BusView<'_>) -> u16 {
        self.read16(bus, self.pc.wrapping_add(1))
    }

    /// Signed immediate following the opcode, sign-extended to 16 bits.
    pub(super) fn signed_after_opcode(&self, bus: &BusView<'_>) -> u16 {
        bits::sign_extend8(self.read8_after_opcode(bus) as u32) as u16
    }

    pub(super) fn write8(&mut self, bus: &mut BusView<'_>, address: u16, value: u8) {
        bus.write(self, address, value);
    }

    pub(super) fn write8_at_hl(&mut self, bus: &mut BusView<'_>, value: u8) {
        let hl = self.reg16(Reg16::HL);
        self.write8(bus, hl, value);
    }

    pub(super) fn write16(&mut self, bus: &mut BusView<'_>, address: u16, value: u16) {
        let [low, high] = value.to_le_bytes();
        self.write8(bus, address, low);
        self.write8(bus, address.wrapping_add(1), high);
    }

    pub(super) fn push16(&mut self, bus: &mut BusView<'_>, value: u16) {
        self.sp = self.sp.wrapping_sub(2);
        let sp = self.sp;
        self.write16(bus, sp, value);
    }

    pub(super) fn pop16(&mut self, bus: &BusView<'_>) -> u16 {
        let value = self.read16(bus, self.sp);
        self.sp = self.sp.wrapping_add(2);
        value
    }

    // Registers

    pub fn reg16(&self, r: Reg16) -> u16 {
        let (high, low) = r.pair();
        u16::from_be_bytes([self.regs.get(high), self.regs.get(low)])
    }

    /// Store `value` in a register pair; the low nibble of F always reads 0.
    pub(super) fn set_reg16(&mut self, r: Reg16, value: u16) {
        let (high, low) = r.pair();
        let [h, mut l] = value.to_be_bytes();
        if r == Reg16::AF {
            l &= 0xF0;
        }
        self.regs.set(high, h);
        self.regs.set(low, l);
    }

    /// Like [`Cpu::reg16`], with AF standing for SP.
    pub(super) fn reg16_sp(&self, r: Reg16) -> u16 {
        match r {
            Reg16::AF => self.sp,
            _ => self.reg16(r),
        }
    }

    /// Like [`Cpu::set_reg16`], with AF standing for SP.
    pub(super) fn set_reg16_sp(&mut self, r: Reg16, value: u16) {
        match r {
            Reg16::AF => self.sp = value,
            _ => self.set_reg16(r, value),
        }
    }

    // Encoding fields

    pub(super) fn extract_reg(opcode: &Opcode, start_bit: u32) -> Reg {
        let field = bits::extract(opcode.encoding as u32, start_bit, 3) as usize;
        REG_FIELD[field].unwrap_or_else(|| {
            panic!(
                "{} (0x{:02X}) has no register in bits {start_bit}..{}",
                opcode.mnemonic,
                opcode.encoding,
                start_bit + 3
            )
        })
    }

    pub(super) fn extract_reg16(opcode: &Opcode) -> Reg16 {
        REG16_FIELD[bits::extract(opcode.encoding as u32, 4, 2) as usize]
    }

    /// Bit index in bits 3..6 of the encoding.
    pub(super) fn bit_index(opcode: &Opcode) -> u32 {
        bits::extract(opcode.encoding as u32, 3, 3)
    }

    pub(super) fn rotate_dir(opcode: &Opcode) -> RotDir {
        if bits::test(opcode.encoding as u32, 3) {
            RotDir::Right
        } else {
            RotDir::Left
        }
    }

    /// Bit 3 of the encoding selects the carry-using variant (ADC, SBC).
    pub(super) fn carry_in(&self, opcode: &Opcode) -> bool {
        self.flag(Flag::C) && bits::test(opcode.encoding as u32, 3)
    }

    /// Condition in bits 3..5: NZ, Z, NC, C.
    pub(super) fn condition(&self, opcode: &Opcode) -> bool {
        match bits::extract(opcode.encoding as u32, 3, 2) {
            0 => !self.flag(Flag::Z),
            1 => self.flag(Flag::Z),
            2 => !self.flag(Flag::C),
            _ => self.flag(Flag::C),
        }
    }

    // Flags

    pub(super) fn flag(&self, flag: Flag) -> bool {
        self.regs.test_bit(Reg::F, flag)
    }

    pub(super) fn set_reg_from_alu(&mut self, r: Reg, vf: u32) {
        self.regs.set(r, alu::unpack_value(vf) as u8);
    }

    pub(super) fn set_flags(&mut self, vf: u32) {
        self.regs.set(Reg::F, alu::unpack_flags(vf));
    }

    pub(super) fn set_reg_flags(&mut self, r: Reg, vf: u32) {
        self.set_reg_from_alu(r, vf);
        self.set_flags(vf);
    }

    pub(super) fn write8_at_hl_and_set_flags(&mut self, bus: &mut BusView<'_>, vf: u32) {
        self.write8_at_hl(bus, alu::unpack_value(vf) as u8);
        self.set_flags(vf);
    }

    /// Recompute F, taking each of Z, N, H and C from its own source.
    pub(super) fn combine_alu_flags(&mut self, vf: u32, z: FlagSrc, n: FlagSrc, h: FlagSrc, c: FlagSrc) {
        let mask_of = |src: FlagSrc| alu::mask_znhc(z == src, n == src, h == src, c == src);
        let f = (mask_of(FlagSrc::Alu) & alu::unpack_flags(vf))
            | (mask_of(FlagSrc::Cpu) & self.regs.get(Reg::F))
            | mask_of(FlagSrc::V1);
        self.regs.set(Reg::F, f);
    }
}
