//! The whole console: components wired to one bus and stepped in lock
//! step.

mod config;

use std::rc::Rc;

use anyhow::{ensure, Context, Result};

use crate::address_map::{
    ECHO_RAM_END, ECHO_RAM_START, REG_BGP, REG_LCDC, WORK_RAM_END, WORK_RAM_SIZE,
    WORK_RAM_START,
};
use crate::bus::{Bus, Handle, InterruptLine};
use crate::cartridge::Cartridge;
use crate::cpu::Cpu;
use crate::joypad::{Joypad, Key};
use crate::lcd::{LcdController, LcdImage};
use crate::memory::{BootRomController, Ram, RamController};
use crate::timer::Timer;

pub use config::GameBoyConfig;

/// Machine cycles per emulated second.
pub const CYCLES_PER_SECOND: u64 = 1 << 20;
/// Duration of one machine cycle in nanoseconds.
pub const CYCLE_DURATION_NANOS: f64 = 1e9 / CYCLES_PER_SECOND as f64;

const POST_BOOT_LCDC: u8 = 0x91;
const POST_BOOT_BGP: u8 = 0xFC;

/// Where the cartridge sits on the bus.
#[derive(Clone, Copy, Debug)]
enum CartridgeSlot {
    Direct(Handle<Cartridge>),
    BehindBootRom(Handle<BootRomController>),
}

pub struct GameBoy {
    bus: Bus,
    cycles: u64,
    cartridge: CartridgeSlot,
    timer: Handle<Timer>,
    cpu: Handle<Cpu>,
    lcd: Handle<LcdController>,
    joypad: Handle<Joypad>,
}

impl GameBoy {
    /// A machine that starts executing the cartridge at address 0 with
    /// every register cleared.
    pub fn new(cartridge: Cartridge) -> Self {
        let mut bus = Bus::new();
        attach_work_ram(&mut bus);
        let slot = CartridgeSlot::Direct(bus.attach(cartridge));
        Self::attach_devices(bus, slot)
    }

    pub fn with_config(cartridge: Cartridge, config: GameBoyConfig) -> Result<Self> {
        let GameBoyConfig {
            boot_rom,
            skip_boot,
        } = config;

        let Some(boot_rom) = boot_rom else {
            let mut gameboy = Self::new(cartridge);
            if skip_boot {
                gameboy.apply_post_boot_state();
            }
            return Ok(gameboy);
        };

        ensure!(!skip_boot, "cannot skip the boot program when one is supplied");
        let controller = BootRomController::new(&boot_rom, cartridge).context("invalid boot ROM")?;
        let mut bus = Bus::new();
        attach_work_ram(&mut bus);
        let slot = CartridgeSlot::BehindBootRom(bus.attach(controller));
        Ok(Self::attach_devices(bus, slot))
    }

    /// Attach everything that follows the cartridge.
    fn attach_devices(mut bus: Bus, cartridge: CartridgeSlot) -> Self {
        let interrupts = InterruptLine::new();
        let timer = bus.attach(Timer::new(interrupts.clone()));
        let cpu = bus.attach(Cpu::new(interrupts.clone()));
        let lcd = bus.attach(LcdController::new(interrupts.clone()));
        let joypad = bus.attach(Joypad::new(interrupts));
        log::info!("machine assembled with {} components", bus.len());
        Self {
            bus,
            cycles: 0,
            cartridge,
            timer,
            cpu,
            lcd,
            joypad,
        }
    }

    fn apply_post_boot_state(&mut self) {
        self.bus.get_mut(self.cpu).set_post_boot_state();
        self.bus.write(REG_LCDC, POST_BOOT_LCDC);
        self.bus.write(REG_BGP, POST_BOOT_BGP);
    }

    /// Advance every component up to, but not including, cycle `target`.
    ///
    /// Within a cycle the timer runs first, then the display controller,
    /// then the CPU. An error raised by the CPU stops the run; the failing
    /// cycle is not counted.
    pub fn run_until(&mut self, target: u64) -> Result<()> {
        assert!(
            target >= self.cycles,
            "cannot run back to cycle {target} from cycle {}",
            self.cycles
        );
        while self.cycles < target {
            self.bus.cycle(self.timer, self.cycles)?;
            self.bus.cycle(self.lcd, self.cycles)?;
            self.bus.cycle(self.cpu, self.cycles)?;
            self.cycles += 1;
        }
        Ok(())
    }

    /// Number of cycles simulated so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut Bus {
        &mut self.bus
    }

    pub fn cpu(&self) -> &Cpu {
        self.bus.get(self.cpu)
    }

    pub fn timer(&self) -> &Timer {
        self.bus.get(self.timer)
    }

    pub fn lcd_controller(&self) -> &LcdController {
        self.bus.get(self.lcd)
    }

    pub fn joypad(&self) -> &Joypad {
        self.bus.get(self.joypad)
    }

    pub fn cartridge(&self) -> &Cartridge {
        match self.cartridge {
            CartridgeSlot::Direct(handle) => self.bus.get(handle),
            CartridgeSlot::BehindBootRom(handle) => self.bus.get(handle).cartridge(),
        }
    }

    pub fn is_boot_rom_active(&self) -> bool {
        match self.cartridge {
            CartridgeSlot::Direct(_) => false,
            CartridgeSlot::BehindBootRom(handle) => self.bus.get(handle).is_active(),
        }
    }

    pub fn key_pressed(&mut self, key: Key) {
        self.bus.get_mut(self.joypad).key_pressed(key);
    }

    pub fn key_released(&mut self, key: Key) {
        self.bus.get_mut(self.joypad).key_released(key);
    }

    /// Last frame completed by the display controller.
    pub fn current_image(&self) -> &LcdImage {
        self.lcd_controller().current_image()
    }
}

/// Attach work RAM and the echo region that mirrors it.
fn attach_work_ram(bus: &mut Bus) {
    let work_ram = Ram::shared(WORK_RAM_SIZE);
    bus.attach(RamController::new(
        Rc::clone(&work_ram),
        WORK_RAM_START,
        u32::from(WORK_RAM_END),
    ));
    bus.attach(RamController::new(
        work_ram,
        ECHO_RAM_START,
        u32::from(ECHO_RAM_END),
    ));
}
