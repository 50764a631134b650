use std::any::Any;

use crate::bus::Component;

use super::SharedRam;

/// Maps the addresses `[start, end)` onto the beginning of a RAM.
pub struct RamController {
    ram: SharedRam,
    start: u16,
    end: u32,
}

impl RamController {
    pub fn new(ram: SharedRam, start: u16, end: u32) -> Self {
        assert!(start as u32 <= end, "controller range 0x{start:04X}..0x{end:04X} is reversed");
        assert!(end <= 0x1_0000, "controller end 0x{end:X} beyond the address space");
        let size = ram.borrow().size();
        assert!(
            (end - start as u32) as usize <= size,
            "controller range 0x{start:04X}..0x{end:04X} larger than RAM of {size} bytes"
        );
        Self { ram, start, end }
    }

    /// Map the whole RAM starting at `start`.
    pub fn with_start(ram: SharedRam, start: u16) -> Self {
        let end = start as u32 + ram.borrow().size() as u32;
        Self::new(ram, start, end)
    }

    fn offset(&self, address: u16) -> Option<usize> {
        let address = address as u32;
        (self.start as u32..self.end)
            .contains(&address)
            .then(|| (address - self.start as u32) as usize)
    }
}

impl Component for RamController {
    fn read(&self, address: u16) -> Option<u8> {
        self.offset(address).map(|i| self.ram.borrow().read(i))
    }

    fn write(&mut self, address: u16, data: u8) {
        if let Some(i) = self.offset(address) {
            self.ram.borrow_mut().write(i, data);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
