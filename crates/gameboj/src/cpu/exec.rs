use anyhow::{bail, Result};
use gameboj_common::bits;

use super::alu;
use super::helpers::FlagSrc;
use super::opcode::{Family, Opcode, DIRECT, PREFIX, PREFIXED};
use super::{Cpu, Reg, Reg16};
use crate::address_map::{REGS_START, RESETS};
use crate::bus::BusView;

impl Cpu {
    /// Take a pending interrupt or execute the instruction at PC.
    pub(super) fn really_cycle(&mut self, bus: &mut BusView<'_>) -> Result<()> {
        if self.service_interrupt(bus) {
            return Ok(());
        }

        let encoding = self.read8(bus, self.pc);
        let opcode = if encoding == PREFIX {
            let prefixed = self.read8(bus, self.pc.wrapping_add(1));
            PREFIXED[prefixed as usize]
        } else {
            DIRECT[encoding as usize]
        };

        match opcode {
            Some(opcode) => self.dispatch(&opcode, bus),
            None => bail!(
                "illegal opcode 0x{:02X} at PC=0x{:04X}",
                encoding,
                self.pc
            ),
        }
    }

    fn dispatch(&mut self, opcode: &Opcode, bus: &mut BusView<'_>) -> Result<()> {
        let mut next_pc = self.pc.wrapping_add(opcode.total_bytes as u16);
        self.next_non_idle_cycle += opcode.cycles as u64;

        match opcode.family {
            Family::Nop => {}

            // Loads
            Family::LdR8HlR => {
                let value = self.read8_at_hl(bus);
                self.regs.set(Self::extract_reg(opcode, 3), value);
            }
            Family::LdAHlRu => {
                let value = self.read8_at_hl(bus);
                self.regs.set(Reg::A, value);
                self.step_hl(opcode);
            }
            Family::LdAN8R => {
                let address = REGS_START + self.read8_after_opcode(bus) as u16;
                let value = self.read8(bus, address);
                self.regs.set(Reg::A, value);
            }
            Family::LdACR => {
                let value = self.read8(bus, REGS_START + self.regs.get(Reg::C) as u16);
                self.regs.set(Reg::A, value);
            }
            Family::LdAN16R => {
                let value = self.read8(bus, self.read16_after_opcode(bus));
                self.regs.set(Reg::A, value);
            }
            Family::LdABcR => {
                let value = self.read8(bus, self.reg16(Reg16::BC));
                self.regs.set(Reg::A, value);
            }
            Family::LdADeR => {
                let value = self.read8(bus, self.reg16(Reg16::DE));
                self.regs.set(Reg::A, value);
            }
            Family::LdR8N8 => {
                let value = self.read8_after_opcode(bus);
                self.regs.set(Self::extract_reg(opcode, 3), value);
            }
            Family::LdR16SpN16 => {
                let value = self.read16_after_opcode(bus);
                self.set_reg16_sp(Self::extract_reg16(opcode), value);
            }
            Family::PopR16 => {
                let value = self.pop16(bus);
                self.set_reg16(Self::extract_reg16(opcode), value);
            }
            Family::LdHlRR8 => {
                let value = self.regs.get(Self::extract_reg(opcode, 0));
                self.write8_at_hl(bus, value);
            }
            Family::LdHlRuA => {
                let value = self.regs.get(Reg::A);
                self.write8_at_hl(bus, value);
                self.step_hl(opcode);
            }
            Family::LdN8RA => {
                let address = REGS_START + self.read8_after_opcode(bus) as u16;
                let value = self.regs.get(Reg::A);
                self.write8(bus, address, value);
            }
            Family::LdCRA => {
                let address = REGS_START + self.regs.get(Reg::C) as u16;
                let value = self.regs.get(Reg::A);
                self.write8(bus, address, value);
            }
            Family::LdN16RA => {
                let address = self.read16_after_opcode(bus);
                let value = self.regs.get(Reg::A);
                self.write8(bus, address, value);
            }
            Family::LdBcRA => {
                let address = self.reg16(Reg16::BC);
                let value = self.regs.get(Reg::A);
                self.write8(bus, address, value);
            }
            Family::LdDeRA => {
                let address = self.reg16(Reg16::DE);
                let value = self.regs.get(Reg::A);
                self.write8(bus, address, value);
            }
            Family::LdHlRN8 => {
                let value = self.read8_after_opcode(bus);
                self.write8_at_hl(bus, value);
            }
            Family::LdN16RSp => {
                let address = self.read16_after_opcode(bus);
                let sp = self.sp;
                self.write16(bus, address, sp);
            }
            Family::LdR8R8 => {
                let value = self.regs.get(Self::extract_reg(opcode, 0));
                self.regs.set(Self::extract_reg(opcode, 3), value);
            }
            Family::LdSpHl => {
                self.sp = self.reg16(Reg16::HL);
            }
            Family::PushR16 => {
                let value = self.reg16(Self::extract_reg16(opcode));
                self.push16(bus, value);
            }

            // Addition
            Family::AddAR8 => {
                let r = self.regs.get(Self::extract_reg(opcode, 0));
                self.set_reg_flags(Reg::A, alu::add(self.regs.get(Reg::A), r, self.carry_in(opcode)));
            }
            Family::AddAN8 => {
                let n = self.read8_after_opcode(bus);
                self.set_reg_flags(Reg::A, alu::add(self.regs.get(Reg::A), n, self.carry_in(opcode)));
            }
            Family::AddAHlR => {
                let v = self.read8_at_hl(bus);
                self.set_reg_flags(Reg::A, alu::add(self.regs.get(Reg::A), v, self.carry_in(opcode)));
            }
            Family::IncR8 => {
                let r = Self::extract_reg(opcode, 3);
                let vf = alu::add(self.regs.get(r), 1, false);
                self.set_reg_from_alu(r, vf);
                self.combine_alu_flags(vf, FlagSrc::Alu, FlagSrc::V0, FlagSrc::Alu, FlagSrc::Cpu);
            }
            Family::IncHlR => {
                let vf = alu::add(self.read8_at_hl(bus), 1, false);
                self.write8_at_hl(bus, alu::unpack_value(vf) as u8);
                self.combine_alu_flags(vf, FlagSrc::Alu, FlagSrc::V0, FlagSrc::Alu, FlagSrc::Cpu);
            }
            Family::IncR16Sp => {
                let r = Self::extract_reg16(opcode);
                self.set_reg16_sp(r, self.reg16_sp(r).wrapping_add(1));
            }
            Family::AddHlR16Sp => {
                let r = self.reg16_sp(Self::extract_reg16(opcode));
                let vf = alu::add16h(self.reg16(Reg16::HL), r);
                self.set_reg16(Reg16::HL, alu::unpack_value(vf));
                self.combine_alu_flags(vf, FlagSrc::Cpu, FlagSrc::V0, FlagSrc::Alu, FlagSrc::Alu);
            }
            Family::LdHlSpS8 => {
                let vf = alu::add16l(self.sp, self.signed_after_opcode(bus));
                let target = if bits::test(opcode.encoding as u32, 4) {
                    Reg16::HL
                } else {
                    Reg16::AF
                };
                self.set_reg16_sp(target, alu::unpack_value(vf));
                self.set_flags(vf);
            }

            // Subtraction and comparison
            Family::SubAR8 => {
                let r = self.regs.get(Self::extract_reg(opcode, 0));
                self.set_reg_flags(Reg::A, alu::sub(self.regs.get(Reg::A), r, self.carry_in(opcode)));
            }
            Family::SubAN8 => {
                let n = self.read8_after_opcode(bus);
                self.set_reg_flags(Reg::A, alu::sub(self.regs.get(Reg::A), n, self.carry_in(opcode)));
            }
            Family::SubAHlR => {
                let v = self.read8_at_hl(bus);
                self.set_reg_flags(Reg::A, alu::sub(self.regs.get(Reg::A), v, self.carry_in(opcode)));
            }
            Family::DecR8 => {
                let r = Self::extract_reg(opcode, 3);
                let vf = alu::sub(self.regs.get(r), 1, false);
                self.set_reg_from_alu(r, vf);
                self.combine_alu_flags(vf, FlagSrc::Alu, FlagSrc::V1, FlagSrc::Alu, FlagSrc::Cpu);
            }
            Family::DecHlR => {
                let vf = alu::sub(self.read8_at_hl(bus), 1, false);
                self.write8_at_hl(bus, alu::unpack_value(vf) as u8);
                self.combine_alu_flags(vf, FlagSrc::Alu, FlagSrc::V1, FlagSrc::Alu, FlagSrc::Cpu);
            }
            Family::CpAR8 => {
                let r = self.regs.get(Self::extract_reg(opcode, 0));
                self.set_flags(alu::sub(self.regs.get(Reg::A), r, false));
            }
            Family::CpAN8 => {
                let n = self.read8_after_opcode(bus);
                self.set_flags(alu::sub(self.regs.get(Reg::A), n, false));
            }
            Family::CpAHlR => {
                let v = self.read8_at_hl(bus);
                self.set_flags(alu::sub(self.regs.get(Reg::A), v, false));
            }
            Family::DecR16Sp => {
                let r = Self::extract_reg16(opcode);
                self.set_reg16_sp(r, self.reg16_sp(r).wrapping_sub(1));
            }

            // Logic
            Family::AndAR8 => {
                let r = self.regs.get(Self::extract_reg(opcode, 0));
                self.set_reg_flags(Reg::A, alu::and(self.regs.get(Reg::A), r));
            }
            Family::AndAN8 => {
                let n = self.read8_after_opcode(bus);
                self.set_reg_flags(Reg::A, alu::and(self.regs.get(Reg::A), n));
            }
            Family::AndAHlR => {
                let v = self.read8_at_hl(bus);
                self.set_reg_flags(Reg::A, alu::and(self.regs.get(Reg::A), v));
            }
            Family::OrAR8 => {
                let r = self.regs.get(Self::extract_reg(opcode, 0));
                self.set_reg_flags(Reg::A, alu::or(self.regs.get(Reg::A), r));
            }
            Family::OrAN8 => {
                let n = self.read8_after_opcode(bus);
                self.set_reg_flags(Reg::A, alu::or(self.regs.get(Reg::A), n));
            }
            Family::OrAHlR => {
                let v = self.read8_at_hl(bus);
                self.set_reg_flags(Reg::A, alu::or(self.regs.get(Reg::A), v));
            }
            Family::XorAR8 => {
                let r = self.regs.get(Self::extract_reg(opcode, 0));
                self.set_reg_flags(Reg::A, alu::xor(self.regs.get(Reg::A), r));
            }
            Family::XorAN8 => {
                let n = self.read8_after_opcode(bus);
                self.set_reg_flags(Reg::A, alu::xor(self.regs.get(Reg::A), n));
            }
            Family::XorAHlR => {
                let v = self.read8_at_hl(bus);
                self.set_reg_flags(Reg::A, alu::xor(self.regs.get(Reg::A), v));
            }
            Family::Cpl => {
                self.regs.set(Reg::A, !self.regs.get(Reg::A));
                self.combine_alu_flags(0, FlagSrc::Cpu, FlagSrc::V1, FlagSrc::V1, FlagSrc::Cpu);
            }

            // Rotations and shifts
            Family::RotCA => {
                let vf = alu::rotate(Self::rotate_dir(opcode), self.regs.get(Reg::A));
                self.set_reg_from_alu(Reg::A, vf);
                self.combine_alu_flags(vf, FlagSrc::V0, FlagSrc::V0, FlagSrc::V0, FlagSrc::Alu);
            }
            Family::RotA => {
                let vf = alu::rotate_through_carry(
                    Self::rotate_dir(opcode),
                    self.regs.get(Reg::A),
                    self.flag(alu::Flag::C),
                );
                self.set_reg_from_alu(Reg::A, vf);
                self.combine_alu_flags(vf, FlagSrc::V0, FlagSrc::V0, FlagSrc::V0, FlagSrc::Alu);
            }
            Family::RotCR8 => {
                let r = Self::extract_reg(opcode, 0);
                self.set_reg_flags(r, alu::rotate(Self::rotate_dir(opcode), self.regs.get(r)));
            }
            Family::RotR8 => {
                let r = Self::extract_reg(opcode, 0);
                let vf = alu::rotate_through_carry(
                    Self::rotate_dir(opcode),
                    self.regs.get(r),
                    self.flag(alu::Flag::C),
                );
                self.set_reg_flags(r, vf);
            }
            Family::RotCHlR => {
                let vf = alu::rotate(Self::rotate_dir(opcode), self.read8_at_hl(bus));
                self.write8_at_hl_and_set_flags(bus, vf);
            }
            Family::RotHlR => {
                let vf = alu::rotate_through_carry(
                    Self::rotate_dir(opcode),
                    self.read8_at_hl(bus),
                    self.flag(alu::Flag::C),
                );
                self.write8_at_hl_and_set_flags(bus, vf);
            }
            Family::SwapR8 => {
                let r = Self::extract_reg(opcode, 0);
                self.set_reg_flags(r, alu::swap(self.regs.get(r)));
            }
            Family::SwapHlR => {
                let vf = alu::swap(self.read8_at_hl(bus));
                self.write8_at_hl_and_set_flags(bus, vf);
            }
            Family::SlaR8 => {
                let r = Self::extract_reg(opcode, 0);
                self.set_reg_flags(r, alu::shift_left(self.regs.get(r)));
            }
            Family::SraR8 => {
                let r = Self::extract_reg(opcode, 0);
                self.set_reg_flags(r, alu::shift_right_a(self.regs.get(r)));
            }
            Family::SrlR8 => {
                let r = Self::extract_reg(opcode, 0);
                self.set_reg_flags(r, alu::shift_right_l(self.regs.get(r)));
            }
            Family::SlaHlR => {
                let vf = alu::shift_left(self.read8_at_hl(bus));
                self.write8_at_hl_and_set_flags(bus, vf);
            }
            Family::SraHlR => {
                let vf = alu::shift_right_a(self.read8_at_hl(bus));
                self.write8_at_hl_and_set_flags(bus, vf);
            }
            Family::SrlHlR => {
                let vf = alu::shift_right_l(self.read8_at_hl(bus));
                self.write8_at_hl_and_set_flags(bus, vf);
            }

            // Single bits
            Family::BitU3R8 => {
                let v = self.regs.get(Self::extract_reg(opcode, 0));
                let vf = alu::test_bit(v, Self::bit_index(opcode));
                self.combine_alu_flags(vf, FlagSrc::Alu, FlagSrc::V0, FlagSrc::V1, FlagSrc::Cpu);
            }
            Family::BitU3HlR => {
                let vf = alu::test_bit(self.read8_at_hl(bus), Self::bit_index(opcode));
                self.combine_alu_flags(vf, FlagSrc::Alu, FlagSrc::V0, FlagSrc::V1, FlagSrc::Cpu);
            }
            Family::ChgU3R8 => {
                let r = Self::extract_reg(opcode, 0);
                let value = self.change_bit(opcode, self.regs.get(r));
                self.regs.set(r, value);
            }
            Family::ChgU3HlR => {
                let value = self.change_bit(opcode, self.read8_at_hl(bus));
                self.write8_at_hl(bus, value);
            }

            // Miscellaneous arithmetic
            Family::Daa => {
                let vf = alu::bcd_adjust(
                    self.regs.get(Reg::A),
                    self.flag(alu::Flag::N),
                    self.flag(alu::Flag::H),
                    self.flag(alu::Flag::C),
                );
                self.set_reg_from_alu(Reg::A, vf);
                self.combine_alu_flags(vf, FlagSrc::Alu, FlagSrc::Cpu, FlagSrc::V0, FlagSrc::Alu);
            }
            Family::Sccf => {
                let complement = bits::test(opcode.encoding as u32, 3);
                let carry = if !(self.flag(alu::Flag::C) && complement) {
                    FlagSrc::V1
                } else {
                    FlagSrc::V0
                };
                self.combine_alu_flags(0, FlagSrc::Cpu, FlagSrc::V0, FlagSrc::V0, carry);
            }

            // Jumps
            Family::JpHl => {
                next_pc = self.reg16(Reg16::HL);
            }
            Family::JpN16 => {
                next_pc = self.read16_after_opcode(bus);
            }
            Family::JpCcN16 => {
                if self.condition(opcode) {
                    next_pc = self.read16_after_opcode(bus);
                    self.next_non_idle_cycle += opcode.additional_cycles as u64;
                }
            }
            Family::JrE8 => {
                next_pc = next_pc.wrapping_add(self.signed_after_opcode(bus));
            }
            Family::JrCcE8 => {
                if self.condition(opcode) {
                    next_pc = next_pc.wrapping_add(self.signed_after_opcode(bus));
                    self.next_non_idle_cycle += opcode.additional_cycles as u64;
                }
            }

            // Calls and returns
            Family::CallN16 => {
                self.push16(bus, next_pc);
                next_pc = self.read16_after_opcode(bus);
            }
            Family::CallCcN16 => {
                if self.condition(opcode) {
                    self.push16(bus, next_pc);
                    next_pc = self.read16_after_opcode(bus);
                    self.next_non_idle_cycle += opcode.additional_cycles as u64;
                }
            }
            Family::RstU3 => {
                self.push16(bus, next_pc);
                next_pc = RESETS[Self::bit_index(opcode) as usize];
            }
            Family::Ret => {
                next_pc = self.pop16(bus);
            }
            Family::RetCc => {
                if self.condition(opcode) {
                    next_pc = self.pop16(bus);
                    self.next_non_idle_cycle += opcode.additional_cycles as u64;
                }
            }

            // Interrupts
            Family::Edi => {
                self.ime = bits::test(opcode.encoding as u32, 3);
            }
            Family::Reti => {
                self.ime = true;
                next_pc = self.pop16(bus);
            }

            // Miscellaneous control
            Family::Halt => {
                self.next_non_idle_cycle = u64::MAX;
            }
            Family::Stop => {
                bail!("STOP instruction at PC=0x{:04X} is not supported", self.pc);
            }
        }

        self.pc = next_pc;
        Ok(())
    }

    /// HL+1 for the HLI forms (bit 4 clear), HL-1 for the HLD forms.
    fn step_hl(&mut self, opcode: &Opcode) {
        let hl = self.reg16(Reg16::HL);
        let next = if bits::test(opcode.encoding as u32, 4) {
            hl.wrapping_sub(1)
        } else {
            hl.wrapping_add(1)
        };
        self.set_reg16(Reg16::HL, next);
    }

    /// SET (bit 6 set) or RES the bit selected by the encoding.
    fn change_bit(&self, opcode: &Opcode, value: u8) -> u8 {
        let set = bits::test(opcode.encoding as u32, 6);
        bits::set(value as u32, Self::bit_index(opcode), set) as u8
    }
}
