use std::fmt;

const WORD: usize = u32::BITS as usize;

/// How bits outside of a vector are seen by an extraction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Extension {
    /// Everything outside `[0, size)` reads as zero.
    Zero,
    /// The vector repeats infinitely in both directions.
    Wrapped,
}

/// Immutable sequence of bits whose length is a positive multiple of 32.
///
/// Bit `i` lives in word `i / 32` at position `i % 32`. The display
/// pipeline stores one pixel plane per vector, pixel 0 being bit 0, so the
/// operations mirror what the renderer needs: boolean algebra between
/// planes, shifts to position a layer, and windowed extraction that either
/// zero-fills or wraps around (for scrolled backgrounds).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BitVector {
    words: Vec<u32>,
}

impl BitVector {
    /// All-zero vector of `size` bits.
    pub fn new(size: usize) -> Self {
        Self::filled(size, false)
    }

    /// Vector of `size` bits all equal to `value`.
    pub fn filled(size: usize, value: bool) -> Self {
        assert_valid_size(size);
        let word = if value { u32::MAX } else { 0 };
        Self {
            words: vec![word; size / WORD],
        }
    }

    pub fn size(&self) -> usize {
        self.words.len() * WORD
    }

    pub fn test_bit(&self, index: usize) -> bool {
        assert!(index < self.size(), "bit {index} out of vector of {}", self.size());
        self.words[index / WORD] & (1 << (index % WORD)) != 0
    }

    pub fn not(&self) -> Self {
        Self {
            words: self.words.iter().map(|w| !w).collect(),
        }
    }

    pub fn and(&self, other: &Self) -> Self {
        self.zip_with(other, |a, b| a & b)
    }

    pub fn or(&self, other: &Self) -> Self {
        self.zip_with(other, |a, b| a | b)
    }

    /// The `size` bits starting at `start` of the zero-extended vector.
    pub fn extract_zero_extended(&self, start: i32, size: usize) -> Self {
        self.extract(start, size, Extension::Zero)
    }

    /// The `size` bits starting at `start` of the infinitely repeated
    /// vector.
    pub fn extract_wrapped(&self, start: i32, size: usize) -> Self {
        self.extract(start, size, Extension::Wrapped)
    }

    /// Move every bit `distance` positions toward higher indices (negative
    /// distances move toward lower indices); vacated bits are zero.
    pub fn shift(&self, distance: i32) -> Self {
        self.extract_zero_extended(-distance, self.size())
    }

    fn zip_with(&self, other: &Self, op: impl Fn(u32, u32) -> u32) -> Self {
        assert_eq!(self.size(), other.size(), "bit vector sizes differ");
        Self {
            words: self
                .words
                .iter()
                .zip(&other.words)
                .map(|(&a, &b)| op(a, b))
                .collect(),
        }
    }

    fn extract(&self, start: i32, size: usize, extension: Extension) -> Self {
        assert_valid_size(size);
        let start = start as i64;
        let first = start.div_euclid(WORD as i64);
        let offset = start.rem_euclid(WORD as i64) as u32;
        let words = (0..(size / WORD) as i64)
            .map(|i| {
                let index = first + i;
                if offset == 0 {
                    self.word_at(index, extension)
                } else {
                    (self.word_at(index, extension) >> offset)
                        | (self.word_at(index + 1, extension) << (WORD as u32 - offset))
                }
            })
            .collect();
        Self { words }
    }

    fn word_at(&self, index: i64, extension: Extension) -> u32 {
        let len = self.words.len() as i64;
        match extension {
            Extension::Wrapped => self.words[index.rem_euclid(len) as usize],
            Extension::Zero if (0..len).contains(&index) => self.words[index as usize],
            Extension::Zero => 0,
        }
    }
}

impl fmt::Display for BitVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in (0..self.size()).rev() {
            f.write_str(if self.test_bit(i) { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl fmt::Debug for BitVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitVector({self})")
    }
}

/// Builds a [`BitVector`] one byte at a time; `build` consumes it.
#[derive(Clone, Debug)]
pub struct BitVectorBuilder {
    words: Vec<u32>,
}

impl BitVectorBuilder {
    pub fn new(size: usize) -> Self {
        assert_valid_size(size);
        Self {
            words: vec![0; size / WORD],
        }
    }

    /// Set byte `index` (bits `8 * index .. 8 * index + 8`) to `value`.
    pub fn set_byte(&mut self, index: usize, value: u8) -> &mut Self {
        assert!(
            index < self.words.len() * 4,
            "byte {index} out of vector of {} bytes",
            self.words.len() * 4
        );
        let lane = (index % 4) * 8;
        let word = &mut self.words[index / 4];
        *word = (*word & !(0xFF << lane)) | ((value as u32) << lane);
        self
    }

    pub fn build(self) -> BitVector {
        BitVector { words: self.words }
    }
}

fn assert_valid_size(size: usize) {
    assert!(
        size > 0 && size % WORD == 0,
        "bit vector size {size} is not a positive multiple of {WORD}"
    );
}

#[cfg(test)]
mod tests;
