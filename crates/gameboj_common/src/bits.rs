//! Fixed-width bit manipulation on `u32` words.
//!
//! Bit indices count from the least significant bit. Every helper checks
//! its preconditions and panics on misuse; callers are expected to pass
//! values that already fit the documented width.

/// Largest index accepted for a bit inside a word.
const WORD_BITS: u32 = u32::BITS;

/// Mask with only bit `index` set.
#[inline]
pub fn mask(index: u32) -> u32 {
    assert!(index < WORD_BITS, "bit index {index} out of range");
    1 << index
}

/// Whether bit `index` of `bits` is set.
#[inline]
pub fn test(bits: u32, index: u32) -> bool {
    bits & mask(index) != 0
}

/// `bits` with bit `index` forced to `value`.
#[inline]
pub fn set(bits: u32, index: u32, value: bool) -> u32 {
    if value {
        bits | mask(index)
    } else {
        bits & !mask(index)
    }
}

/// Keep the `size` low bits of `bits`.
#[inline]
pub fn clip(size: u32, bits: u32) -> u32 {
    assert!(size <= WORD_BITS, "clip size {size} out of range");
    if size == WORD_BITS {
        bits
    } else {
        bits & ((1 << size) - 1)
    }
}

/// The `size` bits of `bits` starting at `start`, moved down to bit 0.
#[inline]
pub fn extract(bits: u32, start: u32, size: u32) -> u32 {
    assert!(
        start.checked_add(size).is_some_and(|end| end <= WORD_BITS),
        "extract range {start}+{size} out of range"
    );
    if start == WORD_BITS {
        return 0;
    }
    clip(size, bits >> start)
}

/// Rotate the `size` low bits of `bits` by `distance` (positive to the
/// left, negative to the right).
pub fn rotate(size: u32, bits: u32, distance: i32) -> u32 {
    assert!(size > 0 && size <= WORD_BITS, "rotate size {size} out of range");
    assert!(clip(size, bits) == bits, "value 0x{bits:X} wider than {size} bits");
    let shift = distance.rem_euclid(size as i32) as u32;
    if shift == 0 {
        return bits;
    }
    clip(size, (bits << shift) | (bits >> (size - shift)))
}

/// Sign-extend the byte `b` to 32 bits.
#[inline]
pub fn sign_extend8(b: u32) -> u32 {
    assert!(b <= 0xFF, "value 0x{b:X} is not a byte");
    b as u8 as i8 as i32 as u32
}

/// Mirror the bits of the byte `b` (bit 0 becomes bit 7).
#[inline]
pub fn reverse8(b: u32) -> u32 {
    assert!(b <= 0xFF, "value 0x{b:X} is not a byte");
    (b as u8).reverse_bits() as u32
}

/// Invert the bits of the byte `b`.
#[inline]
pub fn complement8(b: u32) -> u32 {
    assert!(b <= 0xFF, "value 0x{b:X} is not a byte");
    b ^ 0xFF
}

/// 16-bit word from its high and low bytes.
#[inline]
pub fn make16(high: u32, low: u32) -> u32 {
    assert!(high <= 0xFF && low <= 0xFF, "bytes out of range");
    (high << 8) | low
}
