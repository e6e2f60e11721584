//! Save-state blob layout.
//!
//! | Field     | Size | Notes                                   |
//! |-----------|------|-----------------------------------------|
//! | magic     | 4    | `EMST`                                  |
//! | version   | 2    | little-endian                           |
//! | system    | 1    | [`SystemKind::tag`]                     |
//! | sections  | ...  | `[len: u32 LE][payload]`, fixed order   |
//! | crc32     | 4    | over every preceding byte, LE           |
//!
//! Sections come from [`Machine::save_state`](emu_core::Machine) in the
//! order cpu, memory, video, audio, peripherals, driver.

use emu_core::{SystemKind, crc32};

use crate::StateError;

pub const STATE_MAGIC: &[u8; 4] = b"EMST";
pub const STATE_VERSION: u16 = 1;

const HEADER_LEN: usize = 7;
const CRC_LEN: usize = 4;

pub fn encode(system: SystemKind, sections: &[Vec<u8>]) -> Vec<u8> {
    let body: usize = sections.iter().map(|s| 4 + s.len()).sum();
    let mut out = Vec::with_capacity(HEADER_LEN + body + CRC_LEN);
    out.extend_from_slice(STATE_MAGIC);
    out.extend_from_slice(&STATE_VERSION.to_le_bytes());
    out.push(system.tag());
    for section in sections {
        out.extend_from_slice(&(section.len() as u32).to_le_bytes());
        out.extend_from_slice(section);
    }
    let crc = crc32(&out);
    out.extend_from_slice(&crc.to_le_bytes());
    out
}

/// Split a blob into its system and section payloads.
pub fn decode(blob: &[u8]) -> Result<(SystemKind, Vec<&[u8]>), StateError> {
    if blob.len() < HEADER_LEN + CRC_LEN || &blob[..4] != STATE_MAGIC {
        return Err(StateError::CorruptSnapshot("not a save state".into()));
    }
    let version = u16::from_le_bytes([blob[4], blob[5]]);
    if version != STATE_VERSION {
        return Err(StateError::VersionMismatch {
            expected: STATE_VERSION,
            found: version,
        });
    }

    let (body, trailer) = blob.split_at(blob.len() - CRC_LEN);
    let stored = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    let actual = crc32(body);
    if stored != actual {
        return Err(StateError::CorruptSnapshot(format!(
            "checksum {actual:#010X}, stored {stored:#010X}"
        )));
    }

    let system = SystemKind::from_tag(blob[6])
        .ok_or_else(|| StateError::CorruptSnapshot(format!("unknown system tag {}", blob[6])))?;

    let mut sections = Vec::new();
    let mut rest = &body[HEADER_LEN..];
    while !rest.is_empty() {
        if rest.len() < 4 {
            return Err(StateError::CorruptSnapshot("truncated section header".into()));
        }
        let len = u32::from_le_bytes([rest[0], rest[1], rest[2], rest[3]]) as usize;
        let Some(payload) = rest.get(4..4 + len) else {
            return Err(StateError::CorruptSnapshot(format!(
                "section {} claims {len} bytes, {} left",
                sections.len(),
                rest.len() - 4
            )));
        };
        sections.push(payload);
        rest = &rest[4 + len..];
    }
    Ok((system, sections))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        encode(SystemKind::Atari5200, &[vec![1, 2, 3], Vec::new(), vec![9]])
    }

    #[test]
    fn header_and_sections_decode() {
        let blob = sample();
        assert_eq!(&blob[..4], b"EMST");
        let (system, sections) = decode(&blob).expect("decode");
        assert_eq!(system, SystemKind::Atari5200);
        assert_eq!(sections, vec![&[1u8, 2, 3][..], &[][..], &[9][..]]);
    }

    #[test]
    fn flipped_byte_fails_checksum() {
        let mut blob = sample();
        blob[12] ^= 0x40;
        assert!(matches!(decode(&blob), Err(StateError::CorruptSnapshot(_))));
    }

    #[test]
    fn other_version_is_rejected_before_checksum() {
        let mut blob = sample();
        blob[4] = 7;
        assert!(matches!(
            decode(&blob),
            Err(StateError::VersionMismatch {
                expected: 1,
                found: 7
            })
        ));
    }

    #[test]
    fn oversized_section_length_is_corrupt() {
        let mut blob = encode(SystemKind::Intellivision, &[vec![0; 4]]);
        blob[7] = 0xFF;
        let len = blob.len();
        let crc = crc32(&blob[..len - 4]);
        blob[len - 4..].copy_from_slice(&crc.to_le_bytes());
        assert!(matches!(decode(&blob), Err(StateError::CorruptSnapshot(_))));
    }

    #[test]
    fn short_input_is_not_a_state() {
        assert!(matches!(
            decode(b"EMST"),
            Err(StateError::CorruptSnapshot(_))
        ));
    }
}
