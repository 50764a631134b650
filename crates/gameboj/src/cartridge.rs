//! Cartridge ROM and its memory bank controller.

mod mbc0;
mod mbc1;

use std::any::Any;

use anyhow::{bail, ensure, Context, Result};

use crate::bus::Component;
use crate::memory::Rom;

pub use mbc0::Mbc0;
pub use mbc1::Mbc1;

const TITLE_START: usize = 0x134;
const TITLE_END: usize = 0x144;
const CARTRIDGE_TYPE: usize = 0x147;
const RAM_SIZE: usize = 0x149;

/// External RAM sizes indexed by the header's RAM size code.
const RAM_SIZES: [usize; 4] = [0, 2048, 8192, 32768];

/// A cartridge together with the bank controller its header asks for.
pub enum Cartridge {
    Mbc0(Mbc0),
    Mbc1(Mbc1),
}

impl Cartridge {
    /// Build a cartridge from a raw ROM image.
    ///
    /// The header byte at `0x147` selects the controller (0 for a plain
    /// 32 KiB ROM, 1 to 3 for MBC1) and the byte at `0x149` the size of
    /// the external RAM.
    pub fn from_image(image: &[u8]) -> Result<Self> {
        ensure!(
            image.len() > RAM_SIZE,
            "cartridge image of {} bytes is too short to hold a header",
            image.len()
        );

        let kind = image[CARTRIDGE_TYPE];
        let ram_code = image[RAM_SIZE];
        let rom = Rom::new(image);

        let cartridge = match kind {
            0 => Cartridge::Mbc0(Mbc0::new(rom).context("invalid MBC0 cartridge")?),
            1..=3 => {
                let ram_size = *RAM_SIZES
                    .get(ram_code as usize)
                    .with_context(|| format!("unsupported RAM size code 0x{ram_code:02X}"))?;
                Cartridge::Mbc1(Mbc1::new(rom, ram_size))
            }
            _ => bail!("unsupported cartridge type 0x{kind:02X}"),
        };

        log::info!(
            "loaded cartridge \"{}\" (type 0x{:02X}, {} bytes)",
            title(image),
            kind,
            image.len()
        );
        Ok(cartridge)
    }

    fn component(&self) -> &dyn Component {
        match self {
            Cartridge::Mbc0(m) => m,
            Cartridge::Mbc1(m) => m,
        }
    }

    fn component_mut(&mut self) -> &mut dyn Component {
        match self {
            Cartridge::Mbc0(m) => m,
            Cartridge::Mbc1(m) => m,
        }
    }
}

impl Component for Cartridge {
    fn read(&self, address: u16) -> Option<u8> {
        self.component().read(address)
    }

    fn write(&mut self, address: u16, data: u8) {
        self.component_mut().write(address, data);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn title(image: &[u8]) -> String {
    let end = TITLE_END.min(image.len());
    image
        .get(TITLE_START..end)
        .unwrap_or_default()
        .iter()
        .take_while(|&&b| b != 0)
        .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '?' })
        .collect()
}
