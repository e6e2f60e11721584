//! Intellivision system configuration.

use gi_ay_3_8900::{LatchGroup, LatchPolicy};

/// System ROMs and options for one Intellivision.
#[derive(Debug, Clone)]
pub struct IntellivisionConfig {
    /// Executive ROM, 4K big-endian words.
    pub exec: Vec<u8>,
    /// Graphics ROM, 2K bytes.
    pub grom: Vec<u8>,
    /// ECS ROM, 12K big-endian words. Needed when the ECS is attached.
    pub ecs_rom: Option<Vec<u8>>,
    /// Intellivoice allophone ROM. Only its presence is recorded.
    pub voice_rom: Option<Vec<u8>>,
    /// Force the ECS on or off; `None` follows the cartridge.
    pub ecs: Option<bool>,
    /// Force the Intellivoice on or off; `None` follows the cartridge.
    pub intellivoice: Option<bool>,
    pub sample_rate: u32,
    /// STIC register groups whose latch timing differs from the default.
    pub latch_overrides: Vec<(LatchGroup, LatchPolicy)>,
}

impl Default for IntellivisionConfig {
    fn default() -> Self {
        Self {
            exec: Vec::new(),
            grom: Vec::new(),
            ecs_rom: None,
            voice_rom: None,
            ecs: None,
            intellivoice: None,
            sample_rate: 44_100,
            latch_overrides: Vec::new(),
        }
    }
}
