//! Known-cartridge table.
//!
//! One entry per line:
//!
//! ```text
//! # crc32   system  title                 options
//! 1A2B3C4D  intv    "Space Armada"        seg=5000:0000:1000 voice
//! 0BADF00D  5200    "Bounty Bob"          mapping=bounty-bob
//! ```
//!
//! Options:
//!
//! - `seg=ADDR:OFFSET:LEN[:PAGE]` (hex, repeatable): place `LEN` units of
//!   the raw image starting at `OFFSET` at `ADDR`, optionally as a banked
//!   page. Units are words for Intellivision and bytes for the 5200.
//! - `ecs`, `voice`: the cartridge needs the ECS or the Intellivoice. A
//!   matching entry replaces the image's own peripheral flags, so an
//!   entry without them turns both off.
//! - `input=hand|keyboard|joypad|trakball`
//! - `mapping=linear|one-chip|two-chip|bounty-bob` (5200 only)

use std::collections::HashMap;
use std::path::Path;

use emu_core::SystemKind;

use crate::{InputDevice, LoadError, Mapping};

/// One `seg=` placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentSpec {
    pub address: u16,
    pub offset: usize,
    pub len: usize,
    pub page: Option<u16>,
}

/// Overrides for one cartridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownCart {
    pub crc32: u32,
    pub system: SystemKind,
    pub title: String,
    pub segments: Vec<SegmentSpec>,
    pub ecs: bool,
    pub intellivoice: bool,
    pub input: Option<InputDevice>,
    pub mapping: Option<Mapping>,
}

/// Parsed known-cartridge table, keyed by image CRC-32.
#[derive(Debug, Clone, Default)]
pub struct KnownCarts {
    entries: HashMap<u32, KnownCart>,
}

fn split_fields(line: &str) -> Result<Vec<String>, String> {
    let mut fields = Vec::new();
    let mut chars = line.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '"' {
            chars.next();
            let mut field = String::new();
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some(ch) => field.push(ch),
                    None => return Err("unterminated quote".into()),
                }
            }
            fields.push(field);
        } else {
            let mut field = String::new();
            while let Some(&ch) = chars.peek() {
                if ch.is_whitespace() {
                    break;
                }
                field.push(ch);
                chars.next();
            }
            fields.push(field);
        }
    }
    Ok(fields)
}

fn hex(text: &str) -> Result<u32, String> {
    u32::from_str_radix(text, 16).map_err(|_| format!("bad hex number {text:?}"))
}

fn parse_segment(value: &str) -> Result<SegmentSpec, String> {
    let parts: Vec<&str> = value.split(':').collect();
    if !(3..=4).contains(&parts.len()) {
        return Err(format!("seg needs ADDR:OFFSET:LEN[:PAGE], got {value:?}"));
    }
    let address = u16::try_from(hex(parts[0])?).map_err(|_| "seg address out of range")?;
    let page = match parts.get(3) {
        Some(p) => Some(u16::try_from(hex(p)?).map_err(|_| "seg page out of range")?),
        None => None,
    };
    Ok(SegmentSpec {
        address,
        offset: hex(parts[1])? as usize,
        len: hex(parts[2])? as usize,
        page,
    })
}

fn parse_line(fields: &[String]) -> Result<KnownCart, String> {
    let [crc, system, title, options @ ..] = fields else {
        return Err("expected <crc32> <system> \"<title>\"".into());
    };
    let system = match system.to_ascii_lowercase().as_str() {
        "intv" | "intellivision" => SystemKind::Intellivision,
        "5200" | "a5200" => SystemKind::Atari5200,
        other => return Err(format!("unknown system {other:?}")),
    };
    let mut cart = KnownCart {
        crc32: hex(crc)?,
        system,
        title: title.clone(),
        segments: Vec::new(),
        ecs: false,
        intellivoice: false,
        input: None,
        mapping: None,
    };
    for option in options {
        match option.split_once('=') {
            Some(("seg", value)) => cart.segments.push(parse_segment(value)?),
            Some(("input", value)) => {
                cart.input = Some(
                    InputDevice::from_name(value)
                        .ok_or_else(|| format!("unknown input {value:?}"))?,
                );
            }
            Some(("mapping", value)) => {
                cart.mapping = Some(
                    Mapping::from_name(value)
                        .ok_or_else(|| format!("unknown mapping {value:?}"))?,
                );
            }
            None if option == "ecs" => cart.ecs = true,
            None if option == "voice" => cart.intellivoice = true,
            _ => return Err(format!("unknown option {option:?}")),
        }
    }
    Ok(cart)
}

impl KnownCarts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(text: &str) -> Result<Self, LoadError> {
        let mut table = Self::new();
        for (index, raw) in text.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }
            let fields = split_fields(line).and_then(|fields| parse_line(&fields));
            match fields {
                Ok(cart) => table.insert(cart),
                Err(message) => {
                    return Err(LoadError::KnownCarts {
                        line: index + 1,
                        message,
                    });
                }
            }
        }
        log::info!("known-cartridge table: {} entries", table.len());
        Ok(table)
    }

    pub fn from_file(path: &Path) -> Result<Self, LoadError> {
        Self::parse(&std::fs::read_to_string(path)?)
    }

    pub fn insert(&mut self, cart: KnownCart) {
        self.entries.insert(cart.crc32, cart);
    }

    #[must_use]
    pub fn lookup(&self, crc32: u32) -> Option<&KnownCart> {
        self.entries.get(&crc32)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = r#"
# comment line
1A2B3C4D  intv  "Space Game"  seg=5000:0:2000 seg=D000:2000:1000 voice   # trailing
0badf00d  5200  "Banked"      mapping=bounty-bob input=joypad
00000001  intv  "Paged"       seg=E000:0:1000:1 ecs input=keyboard
"#;

    #[test]
    fn parses_entries_and_options() {
        let table = KnownCarts::parse(TABLE).expect("valid table");
        assert_eq!(table.len(), 3);

        let space = table.lookup(0x1A2B_3C4D).expect("present");
        assert_eq!(space.title, "Space Game");
        assert!(space.intellivoice);
        assert_eq!(space.segments.len(), 2);
        assert_eq!(
            space.segments[1],
            SegmentSpec {
                address: 0xD000,
                offset: 0x2000,
                len: 0x1000,
                page: None
            }
        );

        let banked = table.lookup(0x0BAD_F00D).expect("present");
        assert_eq!(banked.system, SystemKind::Atari5200);
        assert_eq!(banked.mapping, Some(Mapping::BountyBob));
        assert_eq!(banked.input, Some(InputDevice::Joypad));

        let paged = table.lookup(1).expect("present");
        assert!(paged.ecs);
        assert_eq!(paged.segments[0].page, Some(1));
        assert_eq!(paged.input, Some(InputDevice::EcsKeyboard));
    }

    #[test]
    fn reports_line_of_bad_entry() {
        let err = KnownCarts::parse("\n12345678 intv \"Ok\"\nzz intv \"Bad\"\n")
            .expect_err("bad crc");
        assert!(matches!(err, LoadError::KnownCarts { line: 3, .. }));
    }

    #[test]
    fn rejects_unknown_options() {
        assert!(KnownCarts::parse("1 intv \"X\" turbo").is_err());
        assert!(KnownCarts::parse("1 intv \"X").is_err());
        assert!(KnownCarts::parse("1 c64 \"X\"").is_err());
    }
}
