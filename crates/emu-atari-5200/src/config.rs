//! Atari 5200 system configuration.

/// BIOS image and options for one 5200.
#[derive(Debug, Clone)]
pub struct Atari5200Config {
    /// 2K BIOS, mapped at `$F800`.
    pub bios: Vec<u8>,
    /// Report PAL through GTIA. Timing stays NTSC.
    pub pal: bool,
    pub sample_rate: u32,
}

impl Default for Atari5200Config {
    fn default() -> Self {
        Self {
            bios: Vec::new(),
            pal: false,
            sample_rate: 44_100,
        }
    }
}
