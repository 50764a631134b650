use typed_builder::TypedBuilder;

/// How a [`GameBoy`](super::GameBoy) starts up.
#[derive(Clone, Debug, Default, TypedBuilder)]
pub struct GameBoyConfig {
    /// 256-byte boot program mapped over the start of the cartridge until
    /// software writes to `0xFF50`.
    #[builder(default, setter(strip_option))]
    pub boot_rom: Option<Vec<u8>>,
    /// Start directly at the cartridge entry point with the registers the
    /// boot program would have left. Needs `boot_rom` to be unset.
    #[builder(default)]
    pub skip_boot: bool,
}
