//! Cycle-accurate emulation core for the original Game Boy (DMG).
//!
//! The machine advances one machine cycle (four clock ticks) at a time.
//! Every hardware unit is a [`Component`] attached to a shared [`Bus`];
//! the [`GameBoy`] owns the bus, wires the components together and steps
//! the timer, the display controller and the CPU in that order.

pub mod address_map;
pub mod bus;
pub mod cartridge;
pub mod cpu;
pub mod joypad;
pub mod lcd;
pub mod machine;
pub mod memory;
pub mod register_file;
pub mod timer;

pub use bus::{Bus, BusView, Component, Handle, Interrupt, InterruptLine};
pub use cartridge::Cartridge;
pub use cpu::Cpu;
pub use joypad::{Joypad, Key};
pub use lcd::{LcdController, LcdImage, LcdImageLine};
pub use machine::{GameBoy, GameBoyConfig};
pub use timer::Timer;

/// Visible screen width in pixels.
pub const SCREEN_WIDTH: usize = 160;
/// Visible screen height in pixels.
pub const SCREEN_HEIGHT: usize = 144;

#[cfg(test)]
pub(crate) fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
