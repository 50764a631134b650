//! Memory arrays and the controllers that map them onto the bus.

mod boot_rom;
mod ram;
mod ram_controller;
mod rom;

pub use boot_rom::BootRomController;
pub use ram::{Ram, SharedRam};
pub use ram_controller::RamController;
pub use rom::Rom;
