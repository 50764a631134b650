use std::any::Any;

use anyhow::{ensure, Result};

use crate::address_map::{BOOT_ROM_END, BOOT_ROM_SIZE, BOOT_ROM_START, REG_BOOT_ROM_DISABLE};
use crate::bus::Component;
use crate::cartridge::Cartridge;

use super::Rom;

/// Overlays the 256-byte boot program on the start of the cartridge ROM.
///
/// The overlay stays until software writes any value to `0xFF50`; after
/// that every access goes straight to the cartridge.
pub struct BootRomController {
    boot_rom: Rom,
    cartridge: Cartridge,
    active: bool,
}

impl BootRomController {
    pub fn new(boot_image: &[u8], cartridge: Cartridge) -> Result<Self> {
        ensure!(
            boot_image.len() == BOOT_ROM_SIZE,
            "boot ROM must be {BOOT_ROM_SIZE} bytes, got {}",
            boot_image.len()
        );
        Ok(Self {
            boot_rom: Rom::new(boot_image),
            cartridge,
            active: true,
        })
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn cartridge(&self) -> &Cartridge {
        &self.cartridge
    }
}

impl Component for BootRomController {
    fn read(&self, address: u16) -> Option<u8> {
        if self.active && (BOOT_ROM_START..BOOT_ROM_END).contains(&address) {
            return Some(self.boot_rom.read((address - BOOT_ROM_START) as usize));
        }
        self.cartridge.read(address)
    }

    fn write(&mut self, address: u16, data: u8) {
        if address == REG_BOOT_ROM_DISABLE && self.active {
            log::debug!("boot ROM disabled");
            self.active = false;
        }
        self.cartridge.write(address, data);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
