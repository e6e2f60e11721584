//! RIP container.
//!
//! ```text
//! "RIPX"  magic
//! u16     version (little-endian)
//! u16     record count
//! records:
//!   [u8; 4] tag
//!   u32     payload length
//!   u32     CRC-32 of the payload
//!   payload
//! ```
//!
//! | Tag  | Payload                                                         |
//! |------|-----------------------------------------------------------------|
//! | SYST | system tag (1 Intellivision, 2 Atari 5200)                      |
//! | NAME | UTF-8 title                                                     |
//! | YEAR | u16                                                             |
//! | PRPH | flags (bit 0 ECS, bit 1 Intellivoice), input device             |
//! | ROMS | u16 address, u8 page (0xFF unbanked), u8 width (8/16), data     |
//! | RAMS | u16 address, u16 length, u8 width                               |
//! | BANK | mapping (0 linear, 1 one-chip, 2 two-chip, 3 Bounty Bob)        |
//!
//! Multi-byte fields are little-endian except 16-bit ROM data, which is
//! big-endian like a raw Intellivision dump.

use emu_core::{SystemKind, crc32};

use crate::{InputDevice, LoadError, Mapping, Peripherals, RamRegion, Segment};

pub const MAGIC: &[u8; 4] = b"RIPX";
pub const VERSION: u16 = 1;

const NO_PAGE: u8 = 0xFF;

/// What a RIP container declares, before known-cartridge overrides.
#[derive(Debug, Clone)]
pub(crate) struct RipImage {
    pub system: SystemKind,
    pub title: Option<String>,
    pub year: Option<u16>,
    pub peripherals: Peripherals,
    pub input: Option<InputDevice>,
    pub mapping: Mapping,
    pub segments: Vec<Segment>,
    pub ram: Vec<RamRegion>,
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], LoadError> {
        let end = self.pos + n;
        if end > self.data.len() {
            return Err(LoadError::TruncatedData {
                needed: end,
                available: self.data.len(),
            });
        }
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u16(&mut self) -> Result<u16, LoadError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, LoadError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }
}

fn corrupt(tag: &[u8; 4], what: &str) -> LoadError {
    LoadError::CorruptImage(format!("{} record: {what}", String::from_utf8_lossy(tag)))
}

fn short(tag: &[u8; 4], payload: &[u8], needed: usize) -> Result<(), LoadError> {
    if payload.len() < needed {
        Err(corrupt(tag, "payload too short"))
    } else {
        Ok(())
    }
}

pub(crate) fn parse(bytes: &[u8]) -> Result<RipImage, LoadError> {
    let mut r = Reader {
        data: bytes,
        pos: 0,
    };
    if r.take(4)? != MAGIC {
        return Err(LoadError::UnsupportedFormat("missing RIPX magic".into()));
    }
    let version = r.u16()?;
    if version != VERSION {
        return Err(LoadError::UnsupportedFormat(format!(
            "RIPX version {version} (expected {VERSION})"
        )));
    }
    let count = r.u16()?;

    let mut system = None;
    let mut image = RipImage {
        system: SystemKind::Intellivision,
        title: None,
        year: None,
        peripherals: Peripherals::default(),
        input: None,
        mapping: Mapping::Linear,
        segments: Vec::new(),
        ram: Vec::new(),
    };

    for _ in 0..count {
        let mut tag = [0u8; 4];
        tag.copy_from_slice(r.take(4)?);
        let len = r.u32()? as usize;
        let expected = r.u32()?;
        let payload = r.take(len)?;
        let actual = crc32(payload);
        if actual != expected {
            return Err(corrupt(
                &tag,
                &format!("CRC {actual:08X} does not match declared {expected:08X}"),
            ));
        }

        match &tag {
            b"SYST" => {
                short(&tag, payload, 1)?;
                system = Some(
                    SystemKind::from_tag(payload[0])
                        .ok_or_else(|| corrupt(&tag, "unknown system"))?,
                );
            }
            b"NAME" => {
                let title = std::str::from_utf8(payload)
                    .map_err(|_| corrupt(&tag, "title is not UTF-8"))?;
                image.title = Some(title.to_owned());
            }
            b"YEAR" => {
                short(&tag, payload, 2)?;
                image.year = Some(u16::from_le_bytes([payload[0], payload[1]]));
            }
            b"PRPH" => {
                short(&tag, payload, 2)?;
                image.peripherals = Peripherals {
                    ecs: payload[0] & 0x01 != 0,
                    intellivoice: payload[0] & 0x02 != 0,
                };
                image.input = Some(
                    InputDevice::from_code(payload[1])
                        .ok_or_else(|| corrupt(&tag, "unknown input device"))?,
                );
            }
            b"ROMS" => {
                short(&tag, payload, 4)?;
                let address = u16::from_le_bytes([payload[0], payload[1]]);
                let page = (payload[2] != NO_PAGE).then_some(u16::from(payload[2]));
                let body = &payload[4..];
                let data = match payload[3] {
                    8 => body.iter().map(|&b| u16::from(b)).collect(),
                    16 => {
                        if body.len() % 2 != 0 {
                            return Err(corrupt(&tag, "odd length for 16-bit data"));
                        }
                        crate::legacy::words_from_be(body)?
                    }
                    _ => return Err(corrupt(&tag, "data width must be 8 or 16")),
                };
                image.segments.push(Segment {
                    address,
                    page,
                    data,
                });
            }
            b"RAMS" => {
                short(&tag, payload, 5)?;
                image.ram.push(RamRegion {
                    address: u16::from_le_bytes([payload[0], payload[1]]),
                    len: u16::from_le_bytes([payload[2], payload[3]]),
                    width: payload[4],
                });
            }
            b"BANK" => {
                short(&tag, payload, 1)?;
                image.mapping = Mapping::from_code(payload[0])
                    .ok_or_else(|| corrupt(&tag, "unknown mapping"))?;
            }
            _ => log::debug!(
                "skipping unknown RIPX record {}",
                String::from_utf8_lossy(&tag)
            ),
        }
    }

    image.system =
        system.ok_or_else(|| LoadError::CorruptImage("RIPX image has no SYST record".into()))?;
    if image.segments.is_empty() {
        return Err(LoadError::CorruptImage("RIPX image has no ROMS record".into()));
    }
    Ok(image)
}

/// Assembles a RIP container.
#[derive(Debug, Clone)]
pub struct RipBuilder {
    records: Vec<([u8; 4], Vec<u8>)>,
}

impl RipBuilder {
    #[must_use]
    pub fn new(system: SystemKind) -> Self {
        Self {
            records: vec![(*b"SYST", vec![system.tag()])],
        }
    }

    #[must_use]
    pub fn title(mut self, title: &str) -> Self {
        self.records.push((*b"NAME", title.as_bytes().to_vec()));
        self
    }

    #[must_use]
    pub fn year(mut self, year: u16) -> Self {
        self.records.push((*b"YEAR", year.to_le_bytes().to_vec()));
        self
    }

    #[must_use]
    pub fn peripherals(mut self, peripherals: Peripherals, input: InputDevice) -> Self {
        let flags = u8::from(peripherals.ecs) | (u8::from(peripherals.intellivoice) << 1);
        self.records.push((*b"PRPH", vec![flags, input.code()]));
        self
    }

    /// 16-bit ROM segment.
    #[must_use]
    pub fn rom_words(mut self, address: u16, page: Option<u8>, words: &[u16]) -> Self {
        let mut payload = Self::rom_header(address, page, 16);
        for w in words {
            payload.extend_from_slice(&w.to_be_bytes());
        }
        self.records.push((*b"ROMS", payload));
        self
    }

    /// 8-bit ROM segment.
    #[must_use]
    pub fn rom_bytes(mut self, address: u16, page: Option<u8>, bytes: &[u8]) -> Self {
        let mut payload = Self::rom_header(address, page, 8);
        payload.extend_from_slice(bytes);
        self.records.push((*b"ROMS", payload));
        self
    }

    #[must_use]
    pub fn ram(mut self, region: RamRegion) -> Self {
        let mut payload = region.address.to_le_bytes().to_vec();
        payload.extend_from_slice(&region.len.to_le_bytes());
        payload.push(region.width);
        self.records.push((*b"RAMS", payload));
        self
    }

    #[must_use]
    pub fn mapping(mut self, mapping: Mapping) -> Self {
        self.records.push((*b"BANK", vec![mapping.code()]));
        self
    }

    fn rom_header(address: u16, page: Option<u8>, width: u8) -> Vec<u8> {
        let [lo, hi] = address.to_le_bytes();
        vec![lo, hi, page.unwrap_or(NO_PAGE), width]
    }

    #[must_use]
    pub fn build(&self) -> Vec<u8> {
        let mut out = MAGIC.to_vec();
        out.extend_from_slice(&VERSION.to_le_bytes());
        out.extend_from_slice(&(self.records.len() as u16).to_le_bytes());
        for (tag, payload) in &self.records {
            out.extend_from_slice(tag);
            out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
            out.extend_from_slice(&crc32(payload).to_le_bytes());
            out.extend_from_slice(payload);
        }
        out
    }
}
