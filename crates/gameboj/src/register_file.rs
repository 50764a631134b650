use std::marker::PhantomData;

/// An enumerated register usable as an index into a [`RegisterFile`].
pub trait Register: Copy {
    /// Number of registers in the enumeration.
    const COUNT: usize;

    fn index(self) -> usize;
}

/// A named bit inside an 8-bit register.
pub trait Bit: Copy {
    fn index(self) -> u32;

    #[inline]
    fn mask(self) -> u8 {
        1 << self.index()
    }
}

/// Fixed bank of 8-bit registers addressed by the enumeration `R`.
#[derive(Clone, Debug)]
pub struct RegisterFile<R: Register> {
    regs: Vec<u8>,
    _marker: PhantomData<R>,
}

impl<R: Register> RegisterFile<R> {
    pub fn new() -> Self {
        Self {
            regs: vec![0; R::COUNT],
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn get(&self, reg: R) -> u8 {
        self.regs[reg.index()]
    }

    #[inline]
    pub fn set(&mut self, reg: R, value: u8) {
        self.regs[reg.index()] = value;
    }

    #[inline]
    pub fn test_bit(&self, reg: R, bit: impl Bit) -> bool {
        self.get(reg) & bit.mask() != 0
    }

    #[inline]
    pub fn set_bit(&mut self, reg: R, bit: impl Bit, value: bool) {
        let current = self.get(reg);
        let next = if value {
            current | bit.mask()
        } else {
            current & !bit.mask()
        };
        self.set(reg, next);
    }
}

impl<R: Register> Default for RegisterFile<R> {
    fn default() -> Self {
        Self::new()
    }
}
