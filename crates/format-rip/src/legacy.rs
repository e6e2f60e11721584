//! Raw cartridge dumps with no container.
//!
//! Intellivision dumps are big-endian 16-bit words laid out in the
//! standard segment order. Atari 5200 dumps are plain bytes whose layout
//! follows from the image size, or from the known-cartridge table.

use crate::{LoadError, Mapping, Segment};

/// Intellivision default layout: `(address, words)` filled in order.
const INTV_DEFAULT: [(u16, usize); 4] = [
    (0x5000, 0x2000),
    (0xD000, 0x1000),
    (0xF000, 0x1000),
    (0x9000, 0x3000),
];

/// Decode big-endian 16-bit words.
pub(crate) fn words_from_be(bytes: &[u8]) -> Result<Vec<u16>, LoadError> {
    if bytes.len() % 2 != 0 {
        return Err(LoadError::TruncatedData {
            needed: bytes.len() + 1,
            available: bytes.len(),
        });
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect())
}

pub(crate) fn intellivision_layout(words: &[u16]) -> Result<Vec<Segment>, LoadError> {
    let capacity: usize = INTV_DEFAULT.iter().map(|&(_, len)| len).sum();
    if words.len() > capacity {
        return Err(LoadError::UnsupportedFormat(format!(
            "{} words does not fit the default Intellivision layout",
            words.len()
        )));
    }
    let mut segments = Vec::new();
    let mut rest = words;
    for &(address, len) in &INTV_DEFAULT {
        if rest.is_empty() {
            break;
        }
        let take = len.min(rest.len());
        segments.push(Segment::new(address, rest[..take].to_vec()));
        rest = &rest[take..];
    }
    Ok(segments)
}

/// Mapping implied by a 5200 image size when nothing else says otherwise.
pub(crate) fn default_mapping(len: usize) -> Mapping {
    match len {
        0xA000 => Mapping::BountyBob,
        0x4000 => Mapping::OneChip,
        _ => Mapping::Linear,
    }
}

fn widen(bytes: &[u8]) -> Vec<u16> {
    bytes.iter().map(|&b| u16::from(b)).collect()
}

fn need(bytes: &[u8], needed: usize) -> Result<(), LoadError> {
    if bytes.len() < needed {
        Err(LoadError::TruncatedData {
            needed,
            available: bytes.len(),
        })
    } else {
        Ok(())
    }
}

/// Place a 5200 image in the `$4000-$BFFF` cartridge window.
pub(crate) fn atari_layout(bytes: &[u8], mapping: Mapping) -> Result<Vec<Segment>, LoadError> {
    match mapping {
        Mapping::Linear => {
            let len = bytes.len();
            if len == 0 || len > 0x8000 {
                return Err(LoadError::UnsupportedFormat(format!(
                    "{len} bytes does not fit the 5200 cartridge window"
                )));
            }
            // Small power-of-two images repeat through $8000-$BFFF.
            if len <= 0x2000 && 0x4000 % len == 0 {
                return Ok((0..0x4000 / len)
                    .map(|i| Segment::new((0x8000 + i * len) as u16, widen(bytes)))
                    .collect());
            }
            Ok(vec![Segment::new((0xC000 - len) as u16, widen(bytes))])
        }
        Mapping::OneChip => {
            need(bytes, 0x4000)?;
            let chip = widen(&bytes[..0x4000]);
            Ok(vec![
                Segment::new(0x4000, chip.clone()),
                Segment::new(0x8000, chip),
            ])
        }
        Mapping::TwoChip => {
            need(bytes, 0x4000)?;
            let low = widen(&bytes[..0x2000]);
            let high = widen(&bytes[0x2000..0x4000]);
            Ok(vec![
                Segment::new(0x4000, low.clone()),
                Segment::new(0x6000, low),
                Segment::new(0x8000, high.clone()),
                Segment::new(0xA000, high),
            ])
        }
        Mapping::BountyBob => {
            need(bytes, 0xA000)?;
            let mut segments = Vec::new();
            for (window, base) in [(0x4000u16, 0usize), (0x5000, 0x4000)] {
                for page in 0..4u16 {
                    let start = base + usize::from(page) * 0x1000;
                    segments.push(Segment {
                        address: window,
                        page: Some(page),
                        data: widen(&bytes[start..start + 0x1000]),
                    });
                }
            }
            let fixed = widen(&bytes[0x8000..0xA000]);
            segments.push(Segment::new(0x8000, fixed.clone()));
            segments.push(Segment::new(0xA000, fixed));
            Ok(segments)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn odd_length_word_image_is_truncated() {
        assert!(matches!(
            words_from_be(&[1, 2, 3]),
            Err(LoadError::TruncatedData {
                needed: 4,
                available: 3
            })
        ));
    }

    #[test]
    fn intellivision_fills_standard_segments_in_order() {
        let words = vec![0x1234; 0x2800];
        let segments = intellivision_layout(&words).expect("fits");
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].address, 0x5000);
        assert_eq!(segments[0].data.len(), 0x2000);
        assert_eq!(segments[1].address, 0xD000);
        assert_eq!(segments[1].data.len(), 0x800);
    }

    #[test]
    fn oversized_intellivision_image_is_rejected() {
        assert!(intellivision_layout(&vec![0; 0x7001]).is_err());
    }

    #[test]
    fn small_5200_image_mirrors_through_upper_window() {
        let segments = atari_layout(&[0xEA; 0x1000], Mapping::Linear).expect("fits");
        let addresses: Vec<u16> = segments.iter().map(|s| s.address).collect();
        assert_eq!(addresses, [0x8000, 0x9000, 0xA000, 0xB000]);
    }

    #[test]
    fn full_5200_image_starts_at_4000() {
        let segments = atari_layout(&[0; 0x8000], Mapping::Linear).expect("fits");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].address, 0x4000);
    }

    #[test]
    fn two_chip_splits_halves() {
        let mut image = vec![0x11; 0x2000];
        image.extend(vec![0x22; 0x2000]);
        let segments = atari_layout(&image, Mapping::TwoChip).expect("fits");
        assert_eq!(segments[1].address, 0x6000);
        assert_eq!(segments[1].data[0], 0x11);
        assert_eq!(segments[2].address, 0x8000);
        assert_eq!(segments[2].data[0], 0x22);
    }

    #[test]
    fn bounty_bob_has_two_banked_windows() {
        let segments = atari_layout(&vec![0; 0xA000], Mapping::BountyBob).expect("fits");
        let banked = segments.iter().filter(|s| s.page.is_some()).count();
        assert_eq!(banked, 8);
        assert!(
            segments
                .iter()
                .any(|s| s.address == 0x5000 && s.page == Some(3))
        );
        assert_eq!(default_mapping(0xA000), Mapping::BountyBob);
    }
}
