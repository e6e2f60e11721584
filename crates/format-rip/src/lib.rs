//! Cartridge loader for the Intellivision and the Atari 5200.
//!
//! [`load`] recognises three containers by their leading bytes:
//!
//! - zip archives (`PK\x03\x04`): the first entry with a cartridge
//!   extension is decompressed and loaded as below.
//! - RIP containers (`RIPX`): versioned records, each carrying its own
//!   CRC-32. See [`RipBuilder`] for the layout.
//! - anything else is a raw dump, whose system comes from the [`Hint`].
//!
//! The CRC-32 of the unpacked image is looked up in a [`KnownCarts`]
//! table; a match replaces the format's defaults with the table's
//! segment layout, banking scheme and peripherals. For a RIP container
//! the table's `seg=` offsets index its ROM records concatenated in
//! file order.

mod bios;
mod error;
mod known;
mod legacy;
mod ripx;

use std::io::{Cursor, Read};
use std::path::Path;

use emu_core::{SystemKind, crc32};

pub use bios::{Bios, verify_bios};
pub use error::LoadError;
pub use known::{KnownCart, KnownCarts, SegmentSpec};
pub use ripx::{MAGIC as RIP_MAGIC, RipBuilder, VERSION as RIP_VERSION};

const ZIP_MAGIC: &[u8; 4] = b"PK\x03\x04";

/// Extensions recognised inside archives and on raw dumps.
const INTELLIVISION_EXTENSIONS: [&str; 4] = ["int", "itv", "bin", "rom"];
const ATARI_EXTENSIONS: [&str; 1] = ["a52"];

/// Controller the cartridge expects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InputDevice {
    #[default]
    HandController,
    EcsKeyboard,
    Joypad,
    TrakBall,
}

impl InputDevice {
    pub(crate) fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::HandController),
            1 => Some(Self::EcsKeyboard),
            2 => Some(Self::Joypad),
            3 => Some(Self::TrakBall),
            _ => None,
        }
    }

    pub(crate) fn code(self) -> u8 {
        match self {
            Self::HandController => 0,
            Self::EcsKeyboard => 1,
            Self::Joypad => 2,
            Self::TrakBall => 3,
        }
    }

    pub(crate) fn from_name(name: &str) -> Option<Self> {
        match name {
            "hand" => Some(Self::HandController),
            "keyboard" => Some(Self::EcsKeyboard),
            "joypad" => Some(Self::Joypad),
            "trakball" => Some(Self::TrakBall),
            _ => None,
        }
    }
}

/// Atari 5200 cartridge wiring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mapping {
    /// Image ends at `$BFFF`; 4K and 8K images repeat through `$8000-$BFFF`.
    #[default]
    Linear,
    /// One 16K chip visible at `$4000` and `$8000`.
    OneChip,
    /// Two 8K chips, each mirrored once.
    TwoChip,
    /// Two banked 4K windows at `$4000` and `$5000` plus 8K fixed.
    BountyBob,
}

impl Mapping {
    pub(crate) fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Linear),
            1 => Some(Self::OneChip),
            2 => Some(Self::TwoChip),
            3 => Some(Self::BountyBob),
            _ => None,
        }
    }

    pub(crate) fn code(self) -> u8 {
        match self {
            Self::Linear => 0,
            Self::OneChip => 1,
            Self::TwoChip => 2,
            Self::BountyBob => 3,
        }
    }

    pub(crate) fn from_name(name: &str) -> Option<Self> {
        match name {
            "linear" => Some(Self::Linear),
            "one-chip" => Some(Self::OneChip),
            "two-chip" => Some(Self::TwoChip),
            "bounty-bob" => Some(Self::BountyBob),
            _ => None,
        }
    }
}

/// A block of ROM placed at `address`. Banked segments share an address
/// and differ by `page`. Bytes for the 5200 are widened to `u16`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub address: u16,
    pub page: Option<u16>,
    pub data: Vec<u16>,
}

impl Segment {
    #[must_use]
    pub fn new(address: u16, data: Vec<u16>) -> Self {
        Self {
            address,
            page: None,
            data,
        }
    }
}

/// Extra RAM on the cartridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RamRegion {
    pub address: u16,
    pub len: u16,
    pub width: u8,
}

/// Add-on hardware the cartridge needs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Peripherals {
    pub ecs: bool,
    pub intellivoice: bool,
}

/// A cartridge ready to be wired into a machine.
#[derive(Debug, Clone)]
pub struct LoadedProgram {
    pub system: SystemKind,
    pub title: Option<String>,
    pub year: Option<u16>,
    /// CRC-32 of the unpacked image, used for the known-cartridge lookup.
    pub crc32: u32,
    pub segments: Vec<Segment>,
    pub ram: Vec<RamRegion>,
    pub peripherals: Peripherals,
    pub input: InputDevice,
    pub mapping: Mapping,
}

/// What the caller knows about an image besides its bytes.
#[derive(Debug, Clone, Default)]
pub struct Hint {
    /// Lower-case file extension without the dot.
    pub extension: Option<String>,
    pub system: Option<SystemKind>,
}

impl Hint {
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        Self {
            extension: path
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_ascii_lowercase),
            system: None,
        }
    }

    #[must_use]
    pub fn system(system: SystemKind) -> Self {
        Self {
            extension: None,
            system: Some(system),
        }
    }

    fn resolve_system(&self) -> Option<SystemKind> {
        self.system.or_else(|| {
            let ext = self.extension.as_deref()?;
            if ATARI_EXTENSIONS.contains(&ext) {
                Some(SystemKind::Atari5200)
            } else if INTELLIVISION_EXTENSIONS.contains(&ext) {
                Some(SystemKind::Intellivision)
            } else {
                None
            }
        })
    }
}

fn is_cartridge_name(name: &str) -> Option<String> {
    let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    let known = ext == "rip"
        || INTELLIVISION_EXTENSIONS.contains(&ext.as_str())
        || ATARI_EXTENSIONS.contains(&ext.as_str());
    known.then_some(ext)
}

/// Decompress the first cartridge entry of a zip archive.
fn unzip(bytes: &[u8]) -> Result<(String, Vec<u8>), LoadError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(ext) = is_cartridge_name(entry.name()) else {
            continue;
        };
        let name = entry.name().to_owned();
        let mut data = Vec::new();
        // zip verifies the entry CRC when the stream ends.
        entry
            .read_to_end(&mut data)
            .map_err(|e| LoadError::CorruptImage(format!("{name}: {e}")))?;
        log::debug!("extracted {name} ({} bytes)", data.len());
        return Ok((ext, data));
    }
    Err(LoadError::UnsupportedFormat(
        "archive holds no cartridge image".into(),
    ))
}

/// Carve a raw image into segments following `seg=` options.
fn place(raw: &[u16], specs: &[SegmentSpec]) -> Result<Vec<Segment>, LoadError> {
    specs
        .iter()
        .map(|spec| {
            let end = spec.offset + spec.len;
            if end > raw.len() {
                return Err(LoadError::TruncatedData {
                    needed: end,
                    available: raw.len(),
                });
            }
            Ok(Segment {
                address: spec.address,
                page: spec.page,
                data: raw[spec.offset..end].to_vec(),
            })
        })
        .collect()
}

fn load_raw(
    bytes: &[u8],
    system: SystemKind,
    known: Option<&KnownCart>,
) -> Result<(Vec<Segment>, Mapping), LoadError> {
    let specs = known.map(|k| k.segments.as_slice()).unwrap_or_default();
    match system {
        SystemKind::Intellivision => {
            let words = legacy::words_from_be(bytes)?;
            let segments = if specs.is_empty() {
                legacy::intellivision_layout(&words)?
            } else {
                place(&words, specs)?
            };
            Ok((segments, Mapping::Linear))
        }
        SystemKind::Atari5200 => {
            let mapping = known
                .and_then(|k| k.mapping)
                .unwrap_or_else(|| legacy::default_mapping(bytes.len()));
            let segments = if specs.is_empty() {
                legacy::atari_layout(bytes, mapping)?
            } else {
                let widened: Vec<u16> = bytes.iter().map(|&b| u16::from(b)).collect();
                place(&widened, specs)?
            };
            Ok((segments, mapping))
        }
    }
}

/// Lay a container's ROM out again for a known cartridge.
fn relayout(program: &mut LoadedProgram, cart: &KnownCart) -> Result<(), LoadError> {
    if cart.segments.is_empty() && cart.mapping.is_none() {
        return Ok(());
    }
    let flat: Vec<u16> = program
        .segments
        .iter()
        .flat_map(|s| s.data.iter().copied())
        .collect();
    if !cart.segments.is_empty() {
        program.segments = place(&flat, &cart.segments)?;
    } else if program.system == SystemKind::Atari5200 {
        let bytes: Vec<u8> = flat.iter().map(|&w| w as u8).collect();
        program.segments = legacy::atari_layout(&bytes, program.mapping)?;
    }
    Ok(())
}

/// Load a cartridge image.
pub fn load(bytes: &[u8], hint: &Hint, known: &KnownCarts) -> Result<LoadedProgram, LoadError> {
    if bytes.starts_with(ZIP_MAGIC) {
        let (ext, inner) = unzip(bytes)?;
        let inner_hint = Hint {
            extension: Some(ext),
            system: hint.system,
        };
        return load(&inner, &inner_hint, known);
    }

    let crc = crc32(bytes);
    let entry = known.lookup(crc);

    let container = bytes.starts_with(ripx::MAGIC);
    let mut program = if container {
        let image = ripx::parse(bytes)?;
        LoadedProgram {
            system: image.system,
            title: image.title,
            year: image.year,
            crc32: crc,
            segments: image.segments,
            ram: image.ram,
            peripherals: image.peripherals,
            input: image.input.unwrap_or(default_input(image.system)),
            mapping: image.mapping,
        }
    } else {
        let system = entry
            .map(|k| k.system)
            .or_else(|| hint.resolve_system())
            .ok_or_else(|| {
                LoadError::UnsupportedFormat(format!(
                    "cannot tell the system of a raw image with extension {:?}",
                    hint.extension
                ))
            })?;
        if bytes.is_empty() {
            return Err(LoadError::TruncatedData {
                needed: 1,
                available: 0,
            });
        }
        let (segments, mapping) = load_raw(bytes, system, entry)?;
        LoadedProgram {
            system,
            title: None,
            year: None,
            crc32: crc,
            segments,
            ram: Vec::new(),
            peripherals: Peripherals::default(),
            input: default_input(system),
            mapping,
        }
    };

    match entry {
        Some(cart) if cart.system != program.system => {
            log::warn!(
                "known cartridge {crc:08X} is listed for {:?}, image is {:?}; ignoring entry",
                cart.system,
                program.system
            );
        }
        Some(cart) => {
            log::info!("known cartridge {crc:08X}: {}", cart.title);
            if let Some(mapping) = cart.mapping {
                program.mapping = mapping;
            }
            if container {
                relayout(&mut program, cart)?;
            }
            program.title = Some(cart.title.clone());
            program.peripherals = Peripherals {
                ecs: cart.ecs,
                intellivoice: cart.intellivoice,
            };
            if let Some(input) = cart.input {
                program.input = input;
            }
        }
        None => {}
    }

    log::info!(
        "loaded {:?} cartridge {:08X}: {} segments",
        program.system,
        program.crc32,
        program.segments.len()
    );
    Ok(program)
}

/// Load a cartridge image from disk, taking the hint from its extension.
pub fn load_file(path: &Path, known: &KnownCarts) -> Result<LoadedProgram, LoadError> {
    let bytes = std::fs::read(path)?;
    load(&bytes, &Hint::from_path(path), known)
}

fn default_input(system: SystemKind) -> InputDevice {
    match system {
        SystemKind::Intellivision => InputDevice::HandController,
        SystemKind::Atari5200 => InputDevice::Joypad,
    }
}
