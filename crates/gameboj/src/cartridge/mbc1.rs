use std::any::Any;

use crate::address_map::{in_range, EXTERNAL_RAM_END, EXTERNAL_RAM_START};
use crate::bus::Component;
use crate::memory::{Ram, Rom};

/// Value whose low nibble enables external RAM.
const RAM_ENABLE: u8 = 0x0A;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BankingMode {
    /// The two-bit register only extends the switchable ROM bank.
    Rom,
    /// The two-bit register also selects the RAM bank and the bank seen
    /// at `0x0000..0x4000`.
    Ram,
}

/// MBC1 bank controller.
///
/// Register writes land in the ROM area:
/// - `0x0000..0x2000`: RAM enable (low nibble `0xA`),
/// - `0x2000..0x4000`: low five bits of the ROM bank (0 selects 1),
/// - `0x4000..0x6000`: two-bit RAM bank / upper ROM bank register,
/// - `0x6000..0x8000`: banking mode.
///
/// Bank numbers wrap around the actual ROM and RAM sizes.
pub struct Mbc1 {
    rom: Rom,
    /// External RAM; empty when the cartridge has none.
    ram: Ram,
    ram_enabled: bool,
    mode: BankingMode,
    /// Bits 0..5 of the switchable ROM bank, never 0.
    rom_bank_low5: u8,
    /// Two-bit register shared by the RAM bank and ROM bank bits 5..7.
    bank_high2: u8,
    /// Wraps ROM offsets to the image size rounded up to a power of two.
    rom_mask: usize,
    /// Same for RAM offsets.
    ram_mask: usize,
}

impl Mbc1 {
    pub fn new(rom: Rom, ram_size: usize) -> Self {
        let rom_mask = rom.size().next_power_of_two().saturating_sub(1);
        let ram_mask = ram_size.next_power_of_two().saturating_sub(1);
        Self {
            rom,
            ram: Ram::new(ram_size),
            ram_enabled: false,
            mode: BankingMode::Rom,
            rom_bank_low5: 1,
            bank_high2: 0,
            rom_mask,
            ram_mask,
        }
    }

    /// Upper bank bits as seen by the fixed ROM area and by RAM.
    fn upper_bits(&self) -> usize {
        match self.mode {
            BankingMode::Rom => 0,
            BankingMode::Ram => self.bank_high2 as usize,
        }
    }

    fn rom_index(&self, high2: usize, low5: usize, address: u16) -> usize {
        ((high2 << 19) | (low5 << 14) | (address as usize & 0x3FFF)) & self.rom_mask
    }

    fn ram_index(&self, address: u16) -> usize {
        ((self.upper_bits() << 13) | (address as usize & 0x1FFF)) & self.ram_mask
    }

    fn ram_accessible(&self) -> bool {
        self.ram_enabled && self.ram.size() > 0
    }

    fn read_rom(&self, index: usize) -> u8 {
        if index < self.rom.size() {
            self.rom.read(index)
        } else {
            0xFF
        }
    }
}

impl Component for Mbc1 {
    fn read(&self, address: u16) -> Option<u8> {
        match address {
            0x0000..=0x3FFF => Some(self.read_rom(self.rom_index(self.upper_bits(), 0, address))),
            0x4000..=0x7FFF => Some(self.read_rom(self.rom_index(
                self.bank_high2 as usize,
                self.rom_bank_low5 as usize,
                address,
            ))),
            _ if in_range(address, EXTERNAL_RAM_START, EXTERNAL_RAM_END) => {
                if self.ram_accessible() {
                    let index = self.ram_index(address);
                    Some(if index < self.ram.size() { self.ram.read(index) } else { 0xFF })
                } else {
                    Some(0xFF)
                }
            }
            _ => None,
        }
    }

    fn write(&mut self, address: u16, data: u8) {
        match address {
            0x0000..=0x1FFF => {
                self.ram_enabled = data & 0x0F == RAM_ENABLE;
            }
            0x2000..=0x3FFF => {
                self.rom_bank_low5 = (data & 0x1F).max(1);
                log::debug!("MBC1 ROM bank low bits 0x{:02X}", self.rom_bank_low5);
            }
            0x4000..=0x5FFF => {
                self.bank_high2 = data & 0x03;
            }
            0x6000..=0x7FFF => {
                self.mode = if data & 0x01 != 0 {
                    BankingMode::Ram
                } else {
                    BankingMode::Rom
                };
            }
            _ if in_range(address, EXTERNAL_RAM_START, EXTERNAL_RAM_END) => {
                if self.ram_accessible() {
                    let index = self.ram_index(address);
                    if index < self.ram.size() {
                        self.ram.write(index, data);
                    }
                }
            }
            _ => {}
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
