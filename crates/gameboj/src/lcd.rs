//! Display controller.
//!
//! Timing is derived from the number of cycles elapsed since the display
//! was switched on: each line lasts 114 cycles, split into OAM search
//! (mode 2, 20 cycles), transfer (mode 3, 43 cycles) and horizontal blank
//! (mode 0, 51 cycles); lines 144 to 153 form the vertical blank (mode 1).
//! A line is rendered in one go when its transfer phase starts.

mod image;
mod image_line;

use std::any::Any;
use std::mem;

use anyhow::Result;
use bitflags::bitflags;
use gameboj_common::bits;

use crate::address_map::{
    in_range, BG_DISPLAY_DATA, OAM_END, OAM_RAM_SIZE, OAM_START, REGS_LCDC_END, REGS_LCDC_START,
    TILE_SOURCE, VIDEO_RAM_END, VIDEO_RAM_SIZE, VIDEO_RAM_START,
};
use crate::bus::{BusView, Component, Interrupt, InterruptLine};
use crate::memory::Ram;
use crate::register_file::{Register, RegisterFile};
use crate::{SCREEN_HEIGHT, SCREEN_WIDTH};

pub use image::{LcdImage, LcdImageBuilder};
pub use image_line::{LcdImageLine, LcdImageLineBuilder};

const MODE2_CYCLES: u64 = 20;
const MODE3_CYCLES: u64 = 43;
const MODE0_CYCLES: u64 = 51;
const LINE_CYCLES: u64 = MODE2_CYCLES + MODE3_CYCLES + MODE0_CYCLES;
const LINES_PER_FRAME: u64 = 154;

const TILE_SIZE: usize = 8;
const TILE_BYTES: u16 = 16;
const BG_TILES: usize = 32;
const WIN_TILES: usize = SCREEN_WIDTH / TILE_SIZE;
const WX_OFFSET: u8 = 7;

const SPRITE_COUNT: usize = 40;
const SPRITE_BYTES: usize = 4;
const MAX_SPRITES_PER_LINE: usize = 10;
const SPRITE_X_OFFSET: i32 = 8;
const SPRITE_Y_OFFSET: i32 = 16;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Lcdc: u8 {
        const BG = 1 << 0;
        const OBJ = 1 << 1;
        const OBJ_SIZE = 1 << 2;
        const BG_AREA = 1 << 3;
        const TILE_SOURCE = 1 << 4;
        const WIN = 1 << 5;
        const WIN_AREA = 1 << 6;
        const LCD_STATUS = 1 << 7;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Stat: u8 {
        const MODE = 0b11;
        const LYC_EQ_LY = 1 << 2;
        const INT_MODE0 = 1 << 3;
        const INT_MODE1 = 1 << 4;
        const INT_MODE2 = 1 << 5;
        const INT_LYC = 1 << 6;
    }
}

bitflags! {
    /// Byte 3 of an OAM entry.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct SpriteAttributes: u8 {
        const PALETTE = 1 << 4;
        const FLIP_H = 1 << 5;
        const FLIP_V = 1 << 6;
        const BEHIND_BG = 1 << 7;
    }
}

/// Registers mapped at `0xFF40..0xFF4C`, in address order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LcdReg {
    Lcdc,
    Stat,
    Scy,
    Scx,
    Ly,
    Lyc,
    Dma,
    Bgp,
    Obp0,
    Obp1,
    Wy,
    Wx,
}

impl LcdReg {
    const ALL: [LcdReg; 12] = [
        LcdReg::Lcdc,
        LcdReg::Stat,
        LcdReg::Scy,
        LcdReg::Scx,
        LcdReg::Ly,
        LcdReg::Lyc,
        LcdReg::Dma,
        LcdReg::Bgp,
        LcdReg::Obp0,
        LcdReg::Obp1,
        LcdReg::Wy,
        LcdReg::Wx,
    ];

    fn at(address: u16) -> Self {
        Self::ALL[usize::from(address - REGS_LCDC_START)]
    }
}

impl Register for LcdReg {
    const COUNT: usize = 12;

    fn index(self) -> usize {
        self as usize
    }
}

/// Value of the two low STAT bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    HBlank = 0,
    VBlank = 1,
    OamSearch = 2,
    Transfer = 3,
}

impl Mode {
    fn interrupt_source(self) -> Option<Stat> {
        match self {
            Mode::HBlank => Some(Stat::INT_MODE0),
            Mode::VBlank => Some(Stat::INT_MODE1),
            Mode::OamSearch => Some(Stat::INT_MODE2),
            Mode::Transfer => None,
        }
    }
}

pub struct LcdController {
    regs: RegisterFile<LcdReg>,
    video_ram: Ram,
    oam: Ram,
    interrupts: InterruptLine,
    /// Cycle at which the display was last switched on; line and mode are
    /// derived from the cycles elapsed since.
    lcd_on_cycle: u64,
    /// Next cycle with work to do, `u64::MAX` while the display is off.
    next_non_idle_cycle: u64,
    /// Frame being drawn, published at the start of VBLANK.
    next_image: LcdImageBuilder,
    current_image: LcdImage,
    /// Window line to draw next; only advances on lines showing the window.
    win_y: u8,
    /// Next OAM byte to copy; equal to the OAM size when no DMA is running.
    dma_index: usize,
}

impl LcdController {
    pub fn new(interrupts: InterruptLine) -> Self {
        Self {
            regs: RegisterFile::new(),
            video_ram: Ram::new(VIDEO_RAM_SIZE),
            oam: Ram::new(OAM_RAM_SIZE),
            interrupts,
            lcd_on_cycle: 0,
            next_non_idle_cycle: u64::MAX,
            next_image: LcdImageBuilder::new(SCREEN_WIDTH, SCREEN_HEIGHT),
            current_image: LcdImage::blank(SCREEN_WIDTH, SCREEN_HEIGHT),
            win_y: 0,
            dma_index: OAM_RAM_SIZE,
        }
    }

    /// Last completed frame; blank until the first vertical blank.
    pub fn current_image(&self) -> &LcdImage {
        &self.current_image
    }

    pub fn reg(&self, reg: LcdReg) -> u8 {
        self.regs.get(reg)
    }

    pub fn mode(&self) -> Mode {
        match (self.stat() & Stat::MODE).bits() {
            1 => Mode::VBlank,
            2 => Mode::OamSearch,
            3 => Mode::Transfer,
            _ => Mode::HBlank,
        }
    }

    pub fn is_on(&self) -> bool {
        self.lcdc().contains(Lcdc::LCD_STATUS)
    }

    fn lcdc(&self) -> Lcdc {
        Lcdc::from_bits_retain(self.regs.get(LcdReg::Lcdc))
    }

    fn stat(&self) -> Stat {
        Stat::from_bits_retain(self.regs.get(LcdReg::Stat))
    }

    fn set_stat(&mut self, stat: Stat) {
        self.regs.set(LcdReg::Stat, stat.bits());
    }

    fn really_cycle(&mut self, cycle: u64) {
        let elapsed = cycle - self.lcd_on_cycle;
        let line = ((elapsed / LINE_CYCLES) % LINES_PER_FRAME) as usize;
        let position = elapsed % LINE_CYCLES;

        if line < SCREEN_HEIGHT {
            match position {
                0 => {
                    if line == 0 {
                        self.next_image = LcdImageBuilder::new(SCREEN_WIDTH, SCREEN_HEIGHT);
                        self.win_y = 0;
                    }
                    self.set_ly(line as u8);
                    self.set_mode(Mode::OamSearch);
                    self.next_non_idle_cycle += MODE2_CYCLES;
                }
                MODE2_CYCLES => {
                    self.set_mode(Mode::Transfer);
                    let rendered = self.compute_line(line as u8);
                    self.next_image.set_line(line, rendered);
                    self.next_non_idle_cycle += MODE3_CYCLES;
                }
                _ => {
                    self.set_mode(Mode::HBlank);
                    self.next_non_idle_cycle += MODE0_CYCLES;
                }
            }
        } else {
            self.set_ly(line as u8);
            if line == SCREEN_HEIGHT {
                self.set_mode(Mode::VBlank);
                let fresh = LcdImageBuilder::new(SCREEN_WIDTH, SCREEN_HEIGHT);
                self.current_image = mem::replace(&mut self.next_image, fresh).build();
                self.interrupts.request(Interrupt::VBlank);
            }
            self.next_non_idle_cycle += LINE_CYCLES;
        }
    }

    fn set_mode(&mut self, mode: Mode) {
        let mut stat = self.stat() & !Stat::MODE;
        stat |= Stat::from_bits_retain(mode as u8);
        self.set_stat(stat);
        if mode.interrupt_source().is_some_and(|s| stat.contains(s)) {
            self.interrupts.request(Interrupt::LcdStat);
        }
    }

    fn set_ly(&mut self, value: u8) {
        self.regs.set(LcdReg::Ly, value);
        self.update_coincidence();
    }

    fn update_coincidence(&mut self) {
        let mut stat = self.stat();
        let was_equal = stat.contains(Stat::LYC_EQ_LY);
        let equal = self.regs.get(LcdReg::Ly) == self.regs.get(LcdReg::Lyc);
        stat.set(Stat::LYC_EQ_LY, equal);
        self.set_stat(stat);
        if equal && !was_equal && stat.contains(Stat::INT_LYC) {
            self.interrupts.request(Interrupt::LcdStat);
        }
    }

    fn switch_off(&mut self) {
        log::debug!("LCD off at LY={}", self.regs.get(LcdReg::Ly));
        self.set_mode(Mode::HBlank);
        self.set_ly(0);
        self.next_non_idle_cycle = u64::MAX;
    }

    fn video_byte(&self, address: u16) -> u8 {
        self.video_ram.read(usize::from(address - VIDEO_RAM_START))
    }

    /// Render screen line `y` from the background, the window and the
    /// sprites.
    fn compute_line(&mut self, y: u8) -> LcdImageLine {
        let lcdc = self.lcdc();
        let bgp = self.regs.get(LcdReg::Bgp);

        let mut line = if lcdc.contains(Lcdc::BG) {
            let bg_y = y.wrapping_add(self.regs.get(LcdReg::Scy));
            let map = BG_DISPLAY_DATA[usize::from(lcdc.contains(Lcdc::BG_AREA))];
            self.tiles_line(BG_TILES, map, bg_y)
                .extract_wrapped(i32::from(self.regs.get(LcdReg::Scx)), SCREEN_WIDTH)
                .map_colors(bgp)
        } else {
            LcdImageLine::transparent(SCREEN_WIDTH)
        };

        let wx = usize::from(self.regs.get(LcdReg::Wx).saturating_sub(WX_OFFSET));
        if lcdc.contains(Lcdc::WIN) && wx < SCREEN_WIDTH && self.regs.get(LcdReg::Wy) <= y {
            let map = BG_DISPLAY_DATA[usize::from(lcdc.contains(Lcdc::WIN_AREA))];
            let window = self
                .tiles_line(WIN_TILES, map, self.win_y)
                .shift(wx as i32)
                .map_colors(bgp);
            line = line.join(&window, wx);
            self.win_y = self.win_y.wrapping_add(1);
        }

        if lcdc.contains(Lcdc::OBJ) {
            let mut behind = LcdImageLine::transparent(SCREEN_WIDTH);
            let mut front = LcdImageLine::transparent(SCREEN_WIDTH);
            for index in self.sprites_intersecting(y) {
                let (sprite, attributes) = self.sprite_line(index, y);
                if attributes.contains(SpriteAttributes::BEHIND_BG) {
                    behind = sprite.below(&behind);
                } else {
                    front = sprite.below(&front);
                }
            }
            // Behind-background sprites only show through transparent pixels.
            let visible_behind = behind.opacity().and(&line.opacity().not());
            line = line.below_with(&behind, &visible_behind).below(&front);
        }

        line
    }

    /// Line `y` of a row of `tiles` tiles read from the tile map at `map`.
    fn tiles_line(&self, tiles: usize, map: u16, y: u8) -> LcdImageLine {
        let unsigned_indices = self.lcdc().contains(Lcdc::TILE_SOURCE);
        let source = TILE_SOURCE[usize::from(unsigned_indices)];
        let tile_row = bits::extract(u32::from(y), 3, 5) as u16;
        let row_in_tile = bits::clip(3, u32::from(y)) as u16;

        let mut builder = LcdImageLineBuilder::new(tiles * TILE_SIZE);
        for column in 0..tiles {
            let map_entry = map + tile_row * BG_TILES as u16 + column as u16;
            let mut tile = self.video_byte(map_entry);
            if !unsigned_indices {
                tile = tile.wrapping_add(0x80);
            }
            let address = source + u16::from(tile) * TILE_BYTES + row_in_tile * 2;
            let lsb = reverse(self.video_byte(address));
            let msb = reverse(self.video_byte(address + 1));
            builder.set_bytes(column, msb, lsb);
        }
        builder.build()
    }

    fn sprite_height(&self) -> i32 {
        if self.lcdc().contains(Lcdc::OBJ_SIZE) {
            16
        } else {
            8
        }
    }

    /// Indices of the first ten sprites covering screen line `y`, ordered
    /// by x coordinate then by OAM index.
    fn sprites_intersecting(&self, y: u8) -> Vec<usize> {
        let height = self.sprite_height();
        let y = i32::from(y);
        let mut found: Vec<(u8, usize)> = (0..SPRITE_COUNT)
            .filter(|&i| {
                let top = i32::from(self.oam.read(i * SPRITE_BYTES)) - SPRITE_Y_OFFSET;
                top <= y && y < top + height
            })
            .take(MAX_SPRITES_PER_LINE)
            .map(|i| (self.oam.read(i * SPRITE_BYTES + 1), i))
            .collect();
        found.sort_unstable();
        found.into_iter().map(|(_, i)| i).collect()
    }

    fn sprite_line(&self, index: usize, y: u8) -> (LcdImageLine, SpriteAttributes) {
        let entry = index * SPRITE_BYTES;
        let top = i32::from(self.oam.read(entry)) - SPRITE_Y_OFFSET;
        let left = i32::from(self.oam.read(entry + 1)) - SPRITE_X_OFFSET;
        let mut tile = self.oam.read(entry + 2);
        let attributes = SpriteAttributes::from_bits_truncate(self.oam.read(entry + 3));

        let height = self.sprite_height();
        if height == 16 {
            tile &= 0xFE;
        }
        let mut row = i32::from(y) - top;
        if attributes.contains(SpriteAttributes::FLIP_V) {
            row = height - 1 - row;
        }

        let address = TILE_SOURCE[1] + u16::from(tile) * TILE_BYTES + row as u16 * 2;
        let (mut lsb, mut msb) = (self.video_byte(address), self.video_byte(address + 1));
        if !attributes.contains(SpriteAttributes::FLIP_H) {
            lsb = reverse(lsb);
            msb = reverse(msb);
        }
        let palette = if attributes.contains(SpriteAttributes::PALETTE) {
            self.regs.get(LcdReg::Obp1)
        } else {
            self.regs.get(LcdReg::Obp0)
        };

        let mut builder = LcdImageLineBuilder::new(SCREEN_WIDTH);
        builder.set_bytes(0, msb, lsb);
        let line = builder.build().shift(left).map_colors(palette);
        (line, attributes)
    }
}

/// Tile bytes store the leftmost pixel in bit 7; line bit vectors store it
/// in bit 0.
fn reverse(b: u8) -> u8 {
    bits::reverse8(u32::from(b)) as u8
}

impl Component for LcdController {
    fn read(&self, address: u16) -> Option<u8> {
        match address {
            _ if in_range(address, VIDEO_RAM_START, VIDEO_RAM_END) => {
                Some(self.video_byte(address))
            }
            _ if in_range(address, OAM_START, OAM_END) => {
                Some(self.oam.read(usize::from(address - OAM_START)))
            }
            _ if in_range(address, REGS_LCDC_START, REGS_LCDC_END) => {
                Some(self.regs.get(LcdReg::at(address)))
            }
            _ => None,
        }
    }

    fn write(&mut self, address: u16, data: u8) {
        if in_range(address, VIDEO_RAM_START, VIDEO_RAM_END) {
            self.video_ram
                .write(usize::from(address - VIDEO_RAM_START), data);
        } else if in_range(address, OAM_START, OAM_END) {
            self.oam.write(usize::from(address - OAM_START), data);
        } else if in_range(address, REGS_LCDC_START, REGS_LCDC_END) {
            match LcdReg::at(address) {
                LcdReg::Lcdc => {
                    let was_on = self.is_on();
                    self.regs.set(LcdReg::Lcdc, data);
                    if was_on && !self.is_on() {
                        self.switch_off();
                    }
                }
                LcdReg::Stat => {
                    let read_only = self.stat() & (Stat::MODE | Stat::LYC_EQ_LY);
                    let writable = Stat::from_bits_retain(data) - (Stat::MODE | Stat::LYC_EQ_LY);
                    self.set_stat(read_only | writable);
                }
                LcdReg::Ly => {}
                LcdReg::Lyc => {
                    self.regs.set(LcdReg::Lyc, data);
                    self.update_coincidence();
                }
                LcdReg::Dma => {
                    log::debug!("OAM DMA from 0x{:02X}00", data);
                    self.regs.set(LcdReg::Dma, data);
                    self.dma_index = 0;
                }
                reg => self.regs.set(reg, data),
            }
        }
    }

    fn cycle(&mut self, cycle: u64, bus: &mut BusView<'_>) -> Result<()> {
        if self.next_non_idle_cycle == u64::MAX && self.is_on() {
            log::debug!("LCD on at cycle {cycle}");
            self.lcd_on_cycle = cycle;
            self.next_non_idle_cycle = cycle;
        }

        if self.dma_index < OAM_RAM_SIZE {
            let source = bits::make16(
                u32::from(self.regs.get(LcdReg::Dma)),
                self.dma_index as u32,
            ) as u16;
            let data = bus.read(&*self, source);
            self.oam.write(self.dma_index, data);
            self.dma_index += 1;
        }

        if cycle == self.next_non_idle_cycle {
            self.really_cycle(cycle);
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
