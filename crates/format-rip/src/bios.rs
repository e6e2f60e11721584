//! System ROM images the machines need besides the cartridge.

use emu_core::crc32;

use crate::LoadError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bios {
    /// Intellivision Executive ROM, 4K words at `$1000`.
    Exec,
    /// Intellivision graphics ROM, 2K bytes at `$3000`.
    Grom,
    /// ECS ROM, 12K words in three 4K windows.
    Ecs,
    /// Intellivoice allophone ROM. Only its presence matters.
    Intellivoice,
    /// Atari 5200 BIOS, 2K bytes at `$F800`.
    Atari5200,
}

impl Bios {
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Exec => "exec.bin",
            Self::Grom => "grom.bin",
            Self::Ecs => "ecs.bin",
            Self::Intellivoice => "ivoice.bin",
            Self::Atari5200 => "5200.rom",
        }
    }

    /// Image size in bytes.
    #[must_use]
    pub const fn size(self) -> Option<usize> {
        match self {
            Self::Exec => Some(0x2000),
            Self::Grom => Some(0x800),
            Self::Ecs => Some(0x6000),
            Self::Intellivoice => None,
            Self::Atari5200 => Some(0x800),
        }
    }

    /// CRC-32 of a good dump.
    #[must_use]
    pub const fn crc32(self) -> Option<u32> {
        match self {
            Self::Exec => Some(0xCBCE_86F7),
            Self::Grom => Some(0x683A_4158),
            Self::Ecs => Some(0xEA79_0A06),
            Self::Intellivoice => None,
            Self::Atari5200 => Some(0x4248_D3E3),
        }
    }
}

/// Check a BIOS image's size, and with `strict` its CRC-32.
pub fn verify_bios(bios: Bios, data: &[u8], strict: bool) -> Result<(), LoadError> {
    if let Some(len) = bios.size() {
        if data.len() < len {
            return Err(LoadError::TruncatedData {
                needed: len,
                available: data.len(),
            });
        }
    }
    if strict {
        if let Some(expected) = bios.crc32() {
            let actual = crc32(data);
            if actual != expected {
                return Err(LoadError::ChecksumMismatch { expected, actual });
            }
        }
    }
    Ok(())
}
