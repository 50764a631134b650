use std::any::Any;

use anyhow::{ensure, Result};

use crate::address_map::ROM_END;
use crate::bus::Component;
use crate::memory::Rom;

/// Size of a cartridge without bank controller.
pub const MBC0_ROM_SIZE: usize = ROM_END as usize;

/// Cartridge without bank controller: 32 KiB of ROM mapped at
/// `0x0000..0x8000`, writes ignored.
pub struct Mbc0 {
    rom: Rom,
}

impl Mbc0 {
    pub fn new(rom: Rom) -> Result<Self> {
        ensure!(
            rom.size() == MBC0_ROM_SIZE,
            "ROM must be {MBC0_ROM_SIZE} bytes, got {}",
            rom.size()
        );
        Ok(Self { rom })
    }
}

impl Component for Mbc0 {
    fn read(&self, address: u16) -> Option<u8> {
        (address < ROM_END).then(|| self.rom.read(address as usize))
    }

    fn write(&mut self, _address: u16, _data: u8) {}

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
