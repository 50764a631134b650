use std::cell::RefCell;
use std::rc::Rc;

/// A RAM array reachable through several controllers at once, such as
/// work RAM and its echo region.
pub type SharedRam = Rc<RefCell<Ram>>;

/// Zero-initialised read/write memory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ram {
    data: Box<[u8]>,
}

impl Ram {
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0; size].into_boxed_slice(),
        }
    }

    pub fn shared(size: usize) -> SharedRam {
        Rc::new(RefCell::new(Self::new(size)))
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn read(&self, index: usize) -> u8 {
        assert!(index < self.data.len(), "RAM index 0x{index:X} out of bounds");
        self.data[index]
    }

    pub fn write(&mut self, index: usize, value: u8) {
        assert!(index < self.data.len(), "RAM index 0x{index:X} out of bounds");
        self.data[index] = value;
    }
}
