//! System ROM lookup.

use std::fs;
use std::io;
use std::path::Path;

use format_rip::{Bios, LoadError, verify_bios};

/// BIOS images for both machines. Missing images stay `None` until a
/// cartridge needs them.
#[derive(Debug, Clone, Default)]
pub struct SystemRoms {
    pub exec: Option<Vec<u8>>,
    pub grom: Option<Vec<u8>>,
    pub ecs: Option<Vec<u8>>,
    pub intellivoice: Option<Vec<u8>>,
    pub atari5200: Option<Vec<u8>>,
}

impl SystemRoms {
    /// Read every image found under `dir` by its usual file name.
    pub fn from_dir(dir: &Path) -> Result<Self, LoadError> {
        let read = |bios: Bios| -> Result<Option<Vec<u8>>, LoadError> {
            let path = dir.join(bios.file_name());
            match fs::read(&path) {
                Ok(data) => {
                    log::debug!("read {} ({} bytes)", path.display(), data.len());
                    Ok(Some(data))
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            }
        };
        Ok(Self {
            exec: read(Bios::Exec)?,
            grom: read(Bios::Grom)?,
            ecs: read(Bios::Ecs)?,
            intellivoice: read(Bios::Intellivoice)?,
            atari5200: read(Bios::Atari5200)?,
        })
    }

    #[must_use]
    pub fn get(&self, bios: Bios) -> Option<&[u8]> {
        match bios {
            Bios::Exec => self.exec.as_deref(),
            Bios::Grom => self.grom.as_deref(),
            Bios::Ecs => self.ecs.as_deref(),
            Bios::Intellivoice => self.intellivoice.as_deref(),
            Bios::Atari5200 => self.atari5200.as_deref(),
        }
    }

    /// A checked copy of an image the machine cannot run without.
    pub(crate) fn require(&self, bios: Bios, strict: bool) -> Result<Vec<u8>, LoadError> {
        let data = self.get(bios).ok_or_else(|| {
            LoadError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", bios.file_name()),
            ))
        })?;
        verify_bios(bios, data, strict)?;
        Ok(data.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_image_is_reported_by_name() {
        let roms = SystemRoms::default();
        let err = roms.require(Bios::Grom, false).expect_err("missing");
        assert!(err.to_string().contains("grom.bin"));
    }

    #[test]
    fn short_image_is_rejected() {
        let roms = SystemRoms {
            atari5200: Some(vec![0; 0x400]),
            ..SystemRoms::default()
        };
        assert!(matches!(
            roms.require(Bios::Atari5200, false),
            Err(LoadError::TruncatedData {
                needed: 0x800,
                available: 0x400
            })
        ));
    }

    #[test]
    fn empty_directory_yields_nothing() {
        let dir = std::env::temp_dir().join(format!("emu-session-roms-{}", std::process::id()));
        fs::create_dir_all(&dir).expect("temp dir");
        let roms = SystemRoms::from_dir(&dir).expect("readable");
        assert!(roms.get(Bios::Exec).is_none());
        assert!(roms.get(Bios::Atari5200).is_none());
        let _ = fs::remove_dir_all(&dir);
    }
}
