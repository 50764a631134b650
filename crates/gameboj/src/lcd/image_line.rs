use gameboj_common::{BitVector, BitVectorBuilder};

/// Palette that maps every colour to itself.
const IDENTITY_PALETTE: u8 = 0b11_10_01_00;

/// One line of pixels stored as three bit planes.
///
/// Pixel `i` has colour `(msb[i] << 1) | lsb[i]` and is drawn over the
/// layers below it when `opacity[i]` is set.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LcdImageLine {
    msb: BitVector,
    lsb: BitVector,
    opacity: BitVector,
}

impl LcdImageLine {
    pub fn new(msb: BitVector, lsb: BitVector, opacity: BitVector) -> Self {
        assert!(
            msb.size() == lsb.size() && lsb.size() == opacity.size(),
            "bit planes of different sizes"
        );
        Self { msb, lsb, opacity }
    }

    /// Fully transparent line of colour 0.
    pub fn transparent(size: usize) -> Self {
        LcdImageLineBuilder::new(size).build()
    }

    pub fn size(&self) -> usize {
        self.msb.size()
    }

    pub fn msb(&self) -> &BitVector {
        &self.msb
    }

    pub fn lsb(&self) -> &BitVector {
        &self.lsb
    }

    pub fn opacity(&self) -> &BitVector {
        &self.opacity
    }

    /// Colour index of pixel `x`.
    pub fn color(&self, x: usize) -> u8 {
        (u8::from(self.msb.test_bit(x)) << 1) | u8::from(self.lsb.test_bit(x))
    }

    pub fn shift(&self, distance: i32) -> Self {
        self.map_planes(|v| v.shift(distance))
    }

    pub fn extract_wrapped(&self, start: i32, size: usize) -> Self {
        self.map_planes(|v| v.extract_wrapped(start, size))
    }

    /// Recolour every pixel: colour `c` becomes bits `2c..2c+2` of `palette`.
    /// Opacity is unchanged.
    pub fn map_colors(&self, palette: u8) -> Self {
        if palette == IDENTITY_PALETTE {
            return self.clone();
        }

        let size = self.size();
        let (not_msb, not_lsb) = (self.msb.not(), self.lsb.not());
        let masks = [
            not_msb.and(&not_lsb),
            not_msb.and(&self.lsb),
            self.msb.and(&not_lsb),
            self.msb.and(&self.lsb),
        ];

        let mut msb = BitVector::new(size);
        let mut lsb = BitVector::new(size);
        for (color, mask) in masks.iter().enumerate() {
            let target = palette >> (2 * color);
            if target & 0b01 != 0 {
                lsb = lsb.or(mask);
            }
            if target & 0b10 != 0 {
                msb = msb.or(mask);
            }
        }
        Self::new(msb, lsb, self.opacity.clone())
    }

    /// Draw `above` over this line wherever `above` is opaque.
    pub fn below(&self, above: &Self) -> Self {
        self.below_with(above, above.opacity())
    }

    /// Draw `above` over this line wherever `opacity` is set. The result is
    /// opaque where either this line or `opacity` is.
    pub fn below_with(&self, above: &Self, opacity: &BitVector) -> Self {
        assert_eq!(self.size(), above.size(), "lines of different sizes");
        let keep = opacity.not();
        let mix = |mine: &BitVector, theirs: &BitVector| theirs.and(opacity).or(&mine.and(&keep));
        Self::new(
            mix(&self.msb, &above.msb),
            mix(&self.lsb, &above.lsb),
            self.opacity.or(opacity),
        )
    }

    /// Pixels `[0, index)` of this line followed by pixels `[index, size)`
    /// of `other`.
    pub fn join(&self, other: &Self, index: usize) -> Self {
        assert_eq!(self.size(), other.size(), "lines of different sizes");
        assert!(index <= self.size(), "join index {index} out of line");
        let left = BitVector::filled(self.size(), true)
            .shift(index as i32)
            .not();
        let right = left.not();
        let mix = |mine: &BitVector, theirs: &BitVector| mine.and(&left).or(&theirs.and(&right));
        Self::new(
            mix(&self.msb, &other.msb),
            mix(&self.lsb, &other.lsb),
            mix(&self.opacity, &other.opacity),
        )
    }

    fn map_planes(&self, f: impl Fn(&BitVector) -> BitVector) -> Self {
        Self::new(f(&self.msb), f(&self.lsb), f(&self.opacity))
    }
}

/// Byte-wise builder for an [`LcdImageLine`]. Pixels with a non-zero
/// colour are opaque.
#[derive(Clone, Debug)]
pub struct LcdImageLineBuilder {
    msb: BitVectorBuilder,
    lsb: BitVectorBuilder,
}

impl LcdImageLineBuilder {
    pub fn new(size: usize) -> Self {
        Self {
            msb: BitVectorBuilder::new(size),
            lsb: BitVectorBuilder::new(size),
        }
    }

    /// Set pixels `8 * index .. 8 * index + 8` from one byte per plane.
    pub fn set_bytes(&mut self, index: usize, msb: u8, lsb: u8) -> &mut Self {
        self.msb.set_byte(index, msb);
        self.lsb.set_byte(index, lsb);
        self
    }

    pub fn build(self) -> LcdImageLine {
        let msb = self.msb.build();
        let lsb = self.lsb.build();
        let opacity = msb.or(&lsb);
        LcdImageLine::new(msb, lsb, opacity)
    }
}
