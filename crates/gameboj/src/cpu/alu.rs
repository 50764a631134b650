//! Arithmetic and logic unit.
//!
//! Every operation is a pure function returning a packed `u32`: the low
//! byte holds the flags in F-register layout (bits 0-3 unused, then C, H,
//! N, Z) and bits 8-23 hold the result. [`unpack_value`] and
//! [`unpack_flags`] split a packed value back apart.

use gameboj_common::bits;

use crate::register_file::Bit;

/// Bits of the F register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flag {
    Unused0 = 0,
    Unused1 = 1,
    Unused2 = 2,
    Unused3 = 3,
    C = 4,
    H = 5,
    N = 6,
    Z = 7,
}

impl Bit for Flag {
    fn index(self) -> u32 {
        self as u32
    }
}

/// Direction of a rotation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RotDir {
    Left,
    Right,
}

impl RotDir {
    fn distance(self) -> i32 {
        match self {
            RotDir::Left => 1,
            RotDir::Right => -1,
        }
    }
}

/// F-register byte with the given flags set.
pub fn mask_znhc(z: bool, n: bool, h: bool, c: bool) -> u8 {
    let mut flags = 0;
    for (set, flag) in [(z, Flag::Z), (n, Flag::N), (h, Flag::H), (c, Flag::C)] {
        if set {
            flags |= flag.mask();
        }
    }
    flags
}

#[inline]
fn pack(value: u32, z: bool, n: bool, h: bool, c: bool) -> u32 {
    debug_assert!(value <= 0xFFFF);
    (value << 8) | mask_znhc(z, n, h, c) as u32
}

pub fn unpack_value(vf: u32) -> u16 {
    bits::extract(vf, 8, 16) as u16
}

pub fn unpack_flags(vf: u32) -> u8 {
    bits::clip(8, vf) as u8
}

/// `l + r + c0` on 8 bits.
pub fn add(l: u8, r: u8, c0: bool) -> u32 {
    let c = c0 as u32;
    let (l, r) = (l as u32, r as u32);
    let sum = l + r + c;
    let result = bits::clip(8, sum);
    let h = bits::clip(4, l) + bits::clip(4, r) + c > 0xF;
    pack(result, result == 0, false, h, sum > 0xFF)
}

/// 16-bit addition whose H and C flags come from the low byte (bits 3 and 7).
pub fn add16l(l: u16, r: u16) -> u32 {
    let (l, r) = (l as u32, r as u32);
    let result = bits::clip(16, l + r);
    let h = bits::clip(4, l) + bits::clip(4, r) > 0xF;
    let c = bits::clip(8, l) + bits::clip(8, r) > 0xFF;
    pack(result, false, false, h, c)
}

/// 16-bit addition whose H and C flags come from the high byte (bits 11 and 15).
pub fn add16h(l: u16, r: u16) -> u32 {
    let (l, r) = (l as u32, r as u32);
    let sum = l + r;
    let h = bits::clip(12, l) + bits::clip(12, r) > 0xFFF;
    pack(bits::clip(16, sum), false, false, h, sum > 0xFFFF)
}

/// `l - r - b0` on 8 bits.
pub fn sub(l: u8, r: u8, b0: bool) -> u32 {
    let b = b0 as u32;
    let (l, r) = (l as u32, r as u32);
    let result = bits::clip(8, l.wrapping_sub(r).wrapping_sub(b));
    let h = bits::clip(4, l) < bits::clip(4, r) + b;
    pack(result, result == 0, true, h, l < r + b)
}

/// Decimal adjustment of `v` after a BCD addition (`n` clear) or
/// subtraction (`n` set).
pub fn bcd_adjust(v: u8, n: bool, h: bool, c: bool) -> u32 {
    let v = v as u32;
    let fix_l = h || (!n && bits::clip(4, v) > 9);
    let fix_h = c || (!n && v > 0x99);
    let fix = 0x60 * fix_h as u32 + 0x06 * fix_l as u32;
    let adjusted = if n {
        v.wrapping_sub(fix)
    } else {
        v + fix
    };
    let result = bits::clip(8, adjusted);
    pack(result, result == 0, n, false, fix_h)
}

pub fn and(l: u8, r: u8) -> u32 {
    let result = (l & r) as u32;
    pack(result, result == 0, false, true, false)
}

pub fn or(l: u8, r: u8) -> u32 {
    let result = (l | r) as u32;
    pack(result, result == 0, false, false, false)
}

pub fn xor(l: u8, r: u8) -> u32 {
    let result = (l ^ r) as u32;
    pack(result, result == 0, false, false, false)
}

pub fn shift_left(v: u8) -> u32 {
    let result = bits::clip(8, (v as u32) << 1);
    pack(result, result == 0, false, false, v & 0x80 != 0)
}

/// Arithmetic right shift: bit 7 is preserved.
pub fn shift_right_a(v: u8) -> u32 {
    let result = ((v >> 1) | (v & 0x80)) as u32;
    pack(result, result == 0, false, false, v & 0x01 != 0)
}

/// Logical right shift: bit 7 becomes 0.
pub fn shift_right_l(v: u8) -> u32 {
    let result = (v >> 1) as u32;
    pack(result, result == 0, false, false, v & 0x01 != 0)
}

/// 8-bit rotation; C receives the bit that wrapped around.
pub fn rotate(dir: RotDir, v: u8) -> u32 {
    let result = bits::rotate(8, v as u32, dir.distance());
    let c = match dir {
        RotDir::Left => v & 0x80 != 0,
        RotDir::Right => v & 0x01 != 0,
    };
    pack(result, result == 0, false, false, c)
}

/// 9-bit rotation of the carry followed by `v`.
pub fn rotate_through_carry(dir: RotDir, v: u8, c: bool) -> u32 {
    let nine = ((c as u32) << 8) | v as u32;
    let rotated = bits::rotate(9, nine, dir.distance());
    let result = bits::clip(8, rotated);
    pack(result, result == 0, false, false, bits::test(rotated, 8))
}

/// Exchange the two nibbles of `v`.
pub fn swap(v: u8) -> u32 {
    let result = bits::rotate(8, v as u32, 4);
    pack(result, result == 0, false, false, false)
}

/// Test bit `index` of `v`: Z set when the bit is clear, H always set.
pub fn test_bit(v: u8, index: u32) -> u32 {
    assert!(index < 8, "bit index {index} out of byte");
    pack(0, !bits::test(v as u32, index), false, true, false)
}
