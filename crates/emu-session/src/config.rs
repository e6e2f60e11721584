//! Session configuration.
//!
//! Read from a JSON file or from the flat `name = value` options a
//! frontend exposes, and resolved once when a game is loaded.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use gi_ay_3_8900::{LatchGroup, LatchPolicy};
use serde::de::value::{Error as ValueError, StrDeserializer};
use serde::de::{DeserializeOwned, IntoDeserializer};
use serde::{Deserialize, Serialize};

use crate::EmulatorError;

/// Preferred video timing standard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoStandard {
    #[default]
    Ntsc,
    Pal,
}

/// STIC register groups whose latch timing differs from immediate.
pub type LatchOverrides = HashMap<LatchGroup, LatchPolicy>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Known-cartridge overrides table.
    pub known_carts_path: Option<PathBuf>,
    pub video_standard: VideoStandard,
    pub sample_rate: u32,
    /// Directory holding `exec.bin`, `grom.bin`, `ecs.bin`, `ivoice.bin`
    /// and `5200.rom`.
    pub bios_dir: PathBuf,
    /// Reject BIOS images whose CRC-32 is not the known good dump.
    pub verify_bios: bool,
    /// Force the ECS on or off; `None` follows the cartridge.
    pub ecs: Option<bool>,
    /// Force the Intellivoice on or off; `None` follows the cartridge.
    pub intellivoice: Option<bool>,
    pub latch_policy: LatchOverrides,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            known_carts_path: None,
            video_standard: VideoStandard::Ntsc,
            sample_rate: 44_100,
            bios_dir: PathBuf::from("bios"),
            verify_bios: false,
            ecs: None,
            intellivoice: None,
            latch_policy: LatchOverrides::new(),
        }
    }
}

fn parse_name<T: DeserializeOwned>(name: &str) -> Option<T> {
    let de: StrDeserializer<'_, ValueError> = name.into_deserializer();
    T::deserialize(de).ok()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

/// `auto` leaves the choice to the cartridge.
fn parse_tristate(value: &str) -> Option<Option<bool>> {
    if value == "auto" {
        Some(None)
    } else {
        parse_bool(value).map(Some)
    }
}

impl Config {
    pub fn from_json(text: &str) -> Result<Self, EmulatorError> {
        serde_json::from_str(text).map_err(|e| EmulatorError::Config(e.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self, EmulatorError> {
        let text = fs::read_to_string(path)
            .map_err(|e| EmulatorError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json(&text)
    }

    /// Apply named options over the defaults. Unknown names and values
    /// that do not parse are logged and skipped.
    #[must_use]
    pub fn from_options(options: &[(String, String)]) -> Self {
        let mut config = Self::default();
        for (name, value) in options {
            if !config.apply_option(name, value.trim()) {
                log::warn!("ignoring option {name} = {value:?}");
            }
        }
        config
    }

    fn apply_option(&mut self, name: &str, value: &str) -> bool {
        match name {
            "known_carts_path" => self.known_carts_path = Some(PathBuf::from(value)),
            "video_standard" => match parse_name(value) {
                Some(standard) => self.video_standard = standard,
                None => return false,
            },
            "sample_rate" => match value.parse() {
                Ok(rate) if rate > 0 => self.sample_rate = rate,
                _ => return false,
            },
            "bios_dir" => self.bios_dir = PathBuf::from(value),
            "verify_bios" => match parse_bool(value) {
                Some(on) => self.verify_bios = on,
                None => return false,
            },
            "ecs" => match parse_tristate(value) {
                Some(setting) => self.ecs = setting,
                None => return false,
            },
            "intellivoice" => match parse_tristate(value) {
                Some(setting) => self.intellivoice = setting,
                None => return false,
            },
            _ => {
                let Some(group) = name.strip_prefix("latch.") else {
                    return false;
                };
                match (parse_name(group), parse_name(value)) {
                    (Some(group), Some(policy)) => {
                        self.latch_policy.insert(group, policy);
                    }
                    _ => return false,
                }
            }
        }
        true
    }

    /// Latch overrides in a stable order.
    pub(crate) fn latch_overrides(&self) -> Vec<(LatchGroup, LatchPolicy)> {
        LatchGroup::ALL
            .into_iter()
            .filter_map(|group| self.latch_policy.get(&group).map(|&policy| (group, policy)))
            .collect()
    }
}
