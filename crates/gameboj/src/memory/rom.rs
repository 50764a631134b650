/// Read-only memory holding a private copy of its contents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rom {
    data: Box<[u8]>,
}

impl Rom {
    pub fn new(data: &[u8]) -> Self {
        Self { data: data.into() }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn read(&self, index: usize) -> u8 {
        assert!(index < self.data.len(), "ROM index 0x{index:X} out of bounds");
        self.data[index]
    }
}
