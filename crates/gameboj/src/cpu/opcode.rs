//! Instruction descriptors and the two decode tables.
//!
//! Each table is built once from a declarative list of bit patterns. A
//! pattern is eight characters, most significant bit first: `0`/`1` must
//! match exactly, any other character is a field filled in by the
//! encoding (register, condition, bit index...). Rows are tried in order,
//! so the `(HL)` forms and special encodings are listed before the
//! general pattern they overlap with.

use lazy_static::lazy_static;

/// Byte that introduces the prefixed instruction space.
pub const PREFIX: u8 = 0xCB;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    Direct,
    Prefixed,
}

/// Instruction families; every encoding of a family executes the same way
/// and takes its operands from the encoding's bit fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Family {
    Nop,
    LdR8HlR,
    LdAHlRu,
    LdAN8R,
    LdACR,
    LdAN16R,
    LdABcR,
    LdADeR,
    LdR8N8,
    LdR16SpN16,
    PopR16,
    LdHlRR8,
    LdHlRuA,
    LdN8RA,
    LdCRA,
    LdN16RA,
    LdBcRA,
    LdDeRA,
    LdHlRN8,
    LdN16RSp,
    LdR8R8,
    LdSpHl,
    PushR16,
    AddAR8,
    AddAN8,
    AddAHlR,
    IncR8,
    IncHlR,
    IncR16Sp,
    AddHlR16Sp,
    LdHlSpS8,
    SubAR8,
    SubAN8,
    SubAHlR,
    DecR8,
    DecHlR,
    CpAR8,
    CpAN8,
    CpAHlR,
    DecR16Sp,
    AndAN8,
    AndAR8,
    AndAHlR,
    OrAR8,
    OrAN8,
    OrAHlR,
    XorAR8,
    XorAN8,
    XorAHlR,
    Cpl,
    RotCA,
    RotA,
    RotCR8,
    RotR8,
    RotCHlR,
    RotHlR,
    SwapR8,
    SwapHlR,
    SlaR8,
    SraR8,
    SrlR8,
    SlaHlR,
    SraHlR,
    SrlHlR,
    BitU3R8,
    BitU3HlR,
    ChgU3R8,
    ChgU3HlR,
    Daa,
    Sccf,
    JpHl,
    JpN16,
    JpCcN16,
    JrE8,
    JrCcE8,
    CallN16,
    CallCcN16,
    RstU3,
    Ret,
    RetCc,
    Edi,
    Reti,
    Halt,
    Stop,
}

/// A decoded instruction.
///
/// Cycle counts are in machine cycles. `additional_cycles` is only
/// charged by conditional instructions whose condition holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Opcode {
    pub kind: Kind,
    pub family: Family,
    pub encoding: u8,
    pub mnemonic: &'static str,
    pub total_bytes: u8,
    pub cycles: u8,
    pub additional_cycles: u8,
}

struct Row {
    pattern: &'static str,
    family: Family,
    mnemonic: &'static str,
    bytes: u8,
    cycles: u8,
    additional: u8,
}

macro_rules! row {
    ($pattern:literal, $family:ident, $mnemonic:literal, $bytes:literal, $cycles:literal) => {
        row!($pattern, $family, $mnemonic, $bytes, $cycles, 0)
    };
    ($pattern:literal, $family:ident, $mnemonic:literal, $bytes:literal, $cycles:literal, $additional:literal) => {
        Row {
            pattern: $pattern,
            family: Family::$family,
            mnemonic: $mnemonic,
            bytes: $bytes,
            cycles: $cycles,
            additional: $additional,
        }
    };
}

const DIRECT_ROWS: &[Row] = &[
    row!("00000000", Nop, "NOP", 1, 1),
    row!("00010000", Stop, "STOP", 2, 1),
    row!("01110110", Halt, "HALT", 1, 1),
    // 16-bit loads and arithmetic
    row!("00001000", LdN16RSp, "LD (n16),SP", 3, 5),
    row!("00rr0001", LdR16SpN16, "LD r16,n16", 3, 3),
    row!("00rr0011", IncR16Sp, "INC r16", 1, 2),
    row!("00rr1011", DecR16Sp, "DEC r16", 1, 2),
    row!("00rr1001", AddHlR16Sp, "ADD HL,r16", 1, 2),
    row!("11rr0001", PopR16, "POP r16", 1, 3),
    row!("11rr0101", PushR16, "PUSH r16", 1, 4),
    row!("11111001", LdSpHl, "LD SP,HL", 1, 2),
    row!("11101000", LdHlSpS8, "ADD SP,e8", 2, 4),
    row!("11111000", LdHlSpS8, "LD HL,SP+e8", 2, 3),
    // Indirect loads through register pairs
    row!("00000010", LdBcRA, "LD (BC),A", 1, 2),
    row!("00010010", LdDeRA, "LD (DE),A", 1, 2),
    row!("001u0010", LdHlRuA, "LD (HLI/HLD),A", 1, 2),
    row!("00001010", LdABcR, "LD A,(BC)", 1, 2),
    row!("00011010", LdADeR, "LD A,(DE)", 1, 2),
    row!("001u1010", LdAHlRu, "LD A,(HLI/HLD)", 1, 2),
    // 8-bit increments, decrements and immediate loads
    row!("00110100", IncHlR, "INC (HL)", 1, 3),
    row!("00rrr100", IncR8, "INC r8", 1, 1),
    row!("00110101", DecHlR, "DEC (HL)", 1, 3),
    row!("00rrr101", DecR8, "DEC r8", 1, 1),
    row!("00110110", LdHlRN8, "LD (HL),n8", 2, 3),
    row!("00rrr110", LdR8N8, "LD r8,n8", 2, 2),
    // Accumulator rotations and miscellaneous arithmetic
    row!("0000d111", RotCA, "RLCA/RRCA", 1, 1),
    row!("0001d111", RotA, "RLA/RRA", 1, 1),
    row!("00100111", Daa, "DAA", 1, 1),
    row!("00101111", Cpl, "CPL", 1, 1),
    row!("0011c111", Sccf, "SCF/CCF", 1, 1),
    // Relative jumps
    row!("00011000", JrE8, "JR e8", 2, 3),
    row!("001cc000", JrCcE8, "JR cc,e8", 2, 2, 1),
    // Register to register loads
    row!("01110sss", LdHlRR8, "LD (HL),r8", 1, 2),
    row!("01ddd110", LdR8HlR, "LD r8,(HL)", 1, 2),
    row!("01dddsss", LdR8R8, "LD r8,r8", 1, 1),
    // Accumulator arithmetic and logic
    row!("1000c110", AddAHlR, "ADD/ADC A,(HL)", 1, 2),
    row!("1000csss", AddAR8, "ADD/ADC A,r8", 1, 1),
    row!("1001c110", SubAHlR, "SUB/SBC A,(HL)", 1, 2),
    row!("1001csss", SubAR8, "SUB/SBC A,r8", 1, 1),
    row!("10100110", AndAHlR, "AND A,(HL)", 1, 2),
    row!("10100sss", AndAR8, "AND A,r8", 1, 1),
    row!("10101110", XorAHlR, "XOR A,(HL)", 1, 2),
    row!("10101sss", XorAR8, "XOR A,r8", 1, 1),
    row!("10110110", OrAHlR, "OR A,(HL)", 1, 2),
    row!("10110sss", OrAR8, "OR A,r8", 1, 1),
    row!("10111110", CpAHlR, "CP A,(HL)", 1, 2),
    row!("10111sss", CpAR8, "CP A,r8", 1, 1),
    row!("1100c110", AddAN8, "ADD/ADC A,n8", 2, 2),
    row!("1101c110", SubAN8, "SUB/SBC A,n8", 2, 2),
    row!("11100110", AndAN8, "AND A,n8", 2, 2),
    row!("11101110", XorAN8, "XOR A,n8", 2, 2),
    row!("11110110", OrAN8, "OR A,n8", 2, 2),
    row!("11111110", CpAN8, "CP A,n8", 2, 2),
    // High page and absolute accumulator loads
    row!("11100000", LdN8RA, "LDH (n8),A", 2, 3),
    row!("11110000", LdAN8R, "LDH A,(n8)", 2, 3),
    row!("11100010", LdCRA, "LD (C),A", 1, 2),
    row!("11110010", LdACR, "LD A,(C)", 1, 2),
    row!("11101010", LdN16RA, "LD (n16),A", 3, 4),
    row!("11111010", LdAN16R, "LD A,(n16)", 3, 4),
    // Control flow
    row!("11101001", JpHl, "JP HL", 1, 1),
    row!("11000011", JpN16, "JP n16", 3, 4),
    row!("110cc010", JpCcN16, "JP cc,n16", 3, 3, 1),
    row!("11001101", CallN16, "CALL n16", 3, 6),
    row!("110cc100", CallCcN16, "CALL cc,n16", 3, 3, 3),
    row!("11nnn111", RstU3, "RST n", 1, 4),
    row!("11001001", Ret, "RET", 1, 4),
    row!("110cc000", RetCc, "RET cc", 1, 2, 3),
    row!("11011001", Reti, "RETI", 1, 4),
    row!("1111e011", Edi, "DI/EI", 1, 1),
];

const PREFIXED_ROWS: &[Row] = &[
    row!("0000d110", RotCHlR, "RLC/RRC (HL)", 2, 4),
    row!("0000dsss", RotCR8, "RLC/RRC r8", 2, 2),
    row!("0001d110", RotHlR, "RL/RR (HL)", 2, 4),
    row!("0001dsss", RotR8, "RL/RR r8", 2, 2),
    row!("00100110", SlaHlR, "SLA (HL)", 2, 4),
    row!("00100sss", SlaR8, "SLA r8", 2, 2),
    row!("00101110", SraHlR, "SRA (HL)", 2, 4),
    row!("00101sss", SraR8, "SRA r8", 2, 2),
    row!("00110110", SwapHlR, "SWAP (HL)", 2, 4),
    row!("00110sss", SwapR8, "SWAP r8", 2, 2),
    row!("00111110", SrlHlR, "SRL (HL)", 2, 4),
    row!("00111sss", SrlR8, "SRL r8", 2, 2),
    row!("01bbb110", BitU3HlR, "BIT u3,(HL)", 2, 3),
    row!("01bbbsss", BitU3R8, "BIT u3,r8", 2, 2),
    row!("1sbbb110", ChgU3HlR, "RES/SET u3,(HL)", 2, 4),
    row!("1sbbbsss", ChgU3R8, "RES/SET u3,r8", 2, 2),
];

lazy_static! {
    /// Single-byte encodings; unassigned encodings are `None`.
    pub static ref DIRECT: Vec<Option<Opcode>> = build_table(Kind::Direct, DIRECT_ROWS);
    /// Encodings following the `0xCB` prefix.
    pub static ref PREFIXED: Vec<Option<Opcode>> = build_table(Kind::Prefixed, PREFIXED_ROWS);
}

/// `(mask, value)` such that `encoding & mask == value` matches `pattern`.
fn compile(pattern: &str) -> (u8, u8) {
    debug_assert_eq!(pattern.len(), 8, "pattern {pattern} is not 8 bits");
    pattern
        .bytes()
        .fold((0u8, 0u8), |(mask, value), c| match c {
            b'0' => ((mask << 1) | 1, value << 1),
            b'1' => ((mask << 1) | 1, (value << 1) | 1),
            _ => (mask << 1, value << 1),
        })
}

fn build_table(kind: Kind, rows: &[Row]) -> Vec<Option<Opcode>> {
    let compiled: Vec<(u8, u8, &Row)> = rows
        .iter()
        .map(|row| {
            let (mask, value) = compile(row.pattern);
            (mask, value, row)
        })
        .collect();

    (0..=u8::MAX)
        .map(|encoding| {
            compiled
                .iter()
                .find(|(mask, value, _)| encoding & mask == *value)
                .filter(|_| !(kind == Kind::Direct && encoding == PREFIX))
                .map(|(_, _, row)| Opcode {
                    kind,
                    family: row.family,
                    encoding,
                    mnemonic: row.mnemonic,
                    total_bytes: row.bytes,
                    cycles: row.cycles,
                    additional_cycles: row.additional,
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn direct(encoding: u8) -> Opcode {
        DIRECT[encoding as usize].unwrap()
    }

    fn prefixed(encoding: u8) -> Opcode {
        PREFIXED[encoding as usize].unwrap()
    }

    #[test]
    fn overlapping_patterns_resolve_to_specific_rows() {
        assert_eq!(direct(0x76).family, Family::Halt);
        assert_eq!(direct(0x70).family, Family::LdHlRR8);
        assert_eq!(direct(0x7E).family, Family::LdR8HlR);
        assert_eq!(direct(0x78).family, Family::LdR8R8);
        assert_eq!(direct(0x34).family, Family::IncHlR);
        assert_eq!(direct(0x3C).family, Family::IncR8);
        assert_eq!(direct(0x8E).family, Family::AddAHlR);
        assert_eq!(direct(0x88).family, Family::AddAR8);
        assert_eq!(prefixed(0x46).family, Family::BitU3HlR);
        assert_eq!(prefixed(0xFE).family, Family::ChgU3HlR);
    }

    #[test]
    fn unassigned_encodings_are_absent() {
        for encoding in [0xCB, 0xD3, 0xDB, 0xDD, 0xE3, 0xE4, 0xEB, 0xEC, 0xED, 0xF4, 0xFC, 0xFD] {
            assert!(DIRECT[encoding].is_none(), "0x{encoding:02X}");
        }
        let assigned = DIRECT.iter().filter(|o| o.is_some()).count();
        assert_eq!(assigned, 256 - 12);
        assert!(PREFIXED.iter().all(Option::is_some));
    }

    #[test]
    fn cycle_costs() {
        let jp_cc = direct(0xC2);
        assert_eq!((jp_cc.total_bytes, jp_cc.cycles, jp_cc.additional_cycles), (3, 3, 1));
        let call = direct(0xCD);
        assert_eq!((call.total_bytes, call.cycles), (3, 6));
        assert_eq!(direct(0xE8).cycles, 4);
        assert_eq!(direct(0xF8).cycles, 3);
        assert_eq!(prefixed(0x11).cycles, 2);
        assert_eq!(prefixed(0x16).cycles, 4);
        assert_eq!(direct(0xFF).family, Family::RstU3);
    }
}
