use super::image_line::LcdImageLine;

/// A complete frame: `height` lines of `width` pixels.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LcdImage {
    width: usize,
    height: usize,
    lines: Vec<LcdImageLine>,
}

impl LcdImage {
    pub fn new(width: usize, height: usize, lines: Vec<LcdImageLine>) -> Self {
        assert!(width > 0 && height > 0, "empty image {width}x{height}");
        assert_eq!(lines.len(), height, "wrong number of lines");
        assert!(
            lines.iter().all(|l| l.size() == width),
            "line width differs from image width {width}"
        );
        Self {
            width,
            height,
            lines,
        }
    }

    /// Image whose every pixel is transparent colour 0.
    pub fn blank(width: usize, height: usize) -> Self {
        LcdImageBuilder::new(width, height).build()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn line(&self, y: usize) -> &LcdImageLine {
        &self.lines[y]
    }

    /// Colour index (0..=3) of pixel `(x, y)`.
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.lines[y].color(x)
    }
}

#[derive(Clone, Debug)]
pub struct LcdImageBuilder {
    width: usize,
    height: usize,
    lines: Vec<LcdImageLine>,
}

impl LcdImageBuilder {
    pub fn new(width: usize, height: usize) -> Self {
        assert!(width > 0 && height > 0, "empty image {width}x{height}");
        Self {
            width,
            height,
            lines: vec![LcdImageLine::transparent(width); height],
        }
    }

    pub fn set_line(&mut self, y: usize, line: LcdImageLine) -> &mut Self {
        assert_eq!(line.size(), self.width, "line width differs from image width");
        self.lines[y] = line;
        self
    }

    pub fn build(self) -> LcdImage {
        LcdImage::new(self.width, self.height, self.lines)
    }
}
