//! Playfield mode decoding: screen bytes to GTIA playfield codes.

use atari_gtia::{FIRST_VISIBLE_CLOCK, pf};
use emu_core::Bus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Kind {
    /// Modes 2 and 3: 40 hi-res characters.
    TextHires,
    /// Modes 4 and 5: four-colour characters.
    TextMulti,
    /// Modes 6 and 7: single-colour wide characters.
    TextWide,
    /// One bit per pixel, `clocks` colour clocks wide.
    Map1 { clocks: usize },
    /// Two bits per pixel.
    Map2 { clocks: usize },
    /// Mode F: hi-res map, or GTIA nibbles.
    MapHires,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ModeInfo {
    pub scanlines: u8,
    pub clocks_per_byte: usize,
    pub kind: Kind,
    /// Character rows are shown twice (modes 5 and 7).
    pub double_height: bool,
}

const fn info(scanlines: u8, clocks_per_byte: usize, kind: Kind, double_height: bool) -> ModeInfo {
    ModeInfo {
        scanlines,
        clocks_per_byte,
        kind,
        double_height,
    }
}

pub(crate) fn mode_info(mode: u8) -> Option<ModeInfo> {
    let found = match mode {
        0x2 => info(8, 4, Kind::TextHires, false),
        0x3 => info(10, 4, Kind::TextHires, false),
        0x4 => info(8, 4, Kind::TextMulti, false),
        0x5 => info(16, 4, Kind::TextMulti, true),
        0x6 => info(8, 8, Kind::TextWide, false),
        0x7 => info(16, 8, Kind::TextWide, true),
        0x8 => info(8, 16, Kind::Map2 { clocks: 4 }, false),
        0x9 => info(4, 16, Kind::Map1 { clocks: 2 }, false),
        0xA => info(4, 8, Kind::Map2 { clocks: 2 }, false),
        0xB => info(2, 8, Kind::Map1 { clocks: 1 }, false),
        0xC => info(1, 8, Kind::Map1 { clocks: 1 }, false),
        0xD => info(2, 4, Kind::Map2 { clocks: 1 }, false),
        0xE => info(1, 4, Kind::Map2 { clocks: 1 }, false),
        0xF => info(1, 4, Kind::MapHires, false),
        _ => return None,
    };
    Some(found)
}

/// What one scanline of a mode line needs to be drawn.
pub(crate) struct Line<'a> {
    pub mode: u8,
    pub info: ModeInfo,
    pub row: u8,
    pub data: &'a [u8],
    /// Colour clock where `data[0]` starts.
    pub start_clock: usize,
    /// Visible playfield, colour clocks `[left, right)`.
    pub window: (usize, usize),
    pub chbase: u8,
    pub chactl: u8,
    pub gtia_mode: bool,
}

/// Writes playfield codes for hi-res pixels inside the window.
struct Painter<'o> {
    out: &'o mut [u8],
    window: (usize, usize),
}

impl Painter<'_> {
    /// Paint hi-res pixel `px`, counted from colour clock 0.
    fn hires(&mut self, px: usize, code: u8) {
        let clock = px / 2;
        if clock < self.window.0 || clock >= self.window.1 || clock < FIRST_VISIBLE_CLOCK {
            return;
        }
        if let Some(slot) = self.out.get_mut(px - FIRST_VISIBLE_CLOCK * 2) {
            *slot = code;
        }
    }

    fn clocks(&mut self, clock: usize, count: usize, code: u8) {
        for c in clock..clock + count {
            self.hires(c * 2, code);
            self.hires(c * 2 + 1, code);
        }
    }
}

const TWO_BIT: [u8; 4] = [pf::BAK, pf::PF0, pf::PF1, pf::PF2];

/// Decode one scanline into `out`. Returns the number of character
/// generator bytes fetched.
pub(crate) fn render<B: Bus>(line: &Line<'_>, mem: &mut B, out: &mut [u8]) -> u64 {
    let mut paint = Painter {
        out,
        window: line.window,
    };
    let cpb = line.info.clocks_per_byte;
    let mut row = if line.info.double_height {
        line.row / 2
    } else {
        line.row
    };
    let glyph_rows = if line.info.double_height {
        line.info.scanlines / 2
    } else {
        line.info.scanlines
    };
    if line.chactl & 0x04 != 0 {
        row = glyph_rows.saturating_sub(1).saturating_sub(row);
    }

    match line.info.kind {
        Kind::TextHires => {
            let base = u16::from(line.chbase & 0xFC) << 8;
            for (i, &ch) in line.data.iter().enumerate() {
                let r = if line.mode == 0x3 {
                    descender_row(ch, row)
                } else {
                    Some(row)
                };
                let mut bits = match r {
                    Some(r) => mem.read(base + u16::from(ch & 0x7F) * 8 + u16::from(r)),
                    None => 0,
                };
                if ch & 0x80 != 0 {
                    if line.chactl & 0x01 != 0 {
                        bits = 0;
                    }
                    if line.chactl & 0x02 != 0 {
                        bits = !bits;
                    }
                }
                let px0 = (line.start_clock + i * cpb) * 2;
                for b in 0..8 {
                    let code = if bits & (0x80 >> b) != 0 { pf::HIRES } else { pf::PF2 };
                    paint.hires(px0 + b, code);
                }
            }
            line.data.len() as u64
        }
        Kind::TextMulti => {
            let base = u16::from(line.chbase & 0xFC) << 8;
            for (i, &ch) in line.data.iter().enumerate() {
                let bits = mem.read(base + u16::from(ch & 0x7F) * 8 + u16::from(row & 7));
                let clock0 = line.start_clock + i * cpb;
                for p in 0..4 {
                    let v = (bits >> (6 - p * 2)) & 3;
                    let code = if v == 3 && ch & 0x80 != 0 {
                        pf::PF3
                    } else {
                        TWO_BIT[usize::from(v)]
                    };
                    paint.clocks(clock0 + p, 1, code);
                }
            }
            line.data.len() as u64
        }
        Kind::TextWide => {
            let base = u16::from(line.chbase & 0xFE) << 8;
            for (i, &ch) in line.data.iter().enumerate() {
                let bits = mem.read(base + u16::from(ch & 0x3F) * 8 + u16::from(row & 7));
                let color = [pf::PF0, pf::PF1, pf::PF2, pf::PF3][usize::from(ch >> 6)];
                let clock0 = line.start_clock + i * cpb;
                for b in 0..8 {
                    let code = if bits & (0x80 >> b) != 0 { color } else { pf::BAK };
                    paint.clocks(clock0 + b, 1, code);
                }
            }
            line.data.len() as u64
        }
        Kind::Map1 { clocks } => {
            for (i, &byte) in line.data.iter().enumerate() {
                let clock0 = line.start_clock + i * cpb;
                for b in 0..8 {
                    let code = if byte & (0x80 >> b) != 0 { pf::PF0 } else { pf::BAK };
                    paint.clocks(clock0 + b * clocks, clocks, code);
                }
            }
            0
        }
        Kind::Map2 { clocks } => {
            for (i, &byte) in line.data.iter().enumerate() {
                let clock0 = line.start_clock + i * cpb;
                for p in 0..4 {
                    let v = (byte >> (6 - p * 2)) & 3;
                    paint.clocks(clock0 + p * clocks, clocks, TWO_BIT[usize::from(v)]);
                }
            }
            0
        }
        Kind::MapHires => {
            for (i, &byte) in line.data.iter().enumerate() {
                let clock0 = line.start_clock + i * cpb;
                if line.gtia_mode {
                    paint.clocks(clock0, 2, pf::NIBBLE | (byte >> 4));
                    paint.clocks(clock0 + 2, 2, pf::NIBBLE | (byte & 0x0F));
                } else {
                    for b in 0..8 {
                        let code = if byte & (0x80 >> b) != 0 { pf::HIRES } else { pf::PF2 };
                        paint.hires(clock0 * 2 + b, code);
                    }
                }
            }
            0
        }
    }
}

/// Mode 3 glyph row: lower-case characters drop by two lines.
fn descender_row(ch: u8, row: u8) -> Option<u8> {
    let lower = ch & 0x60 == 0x60;
    match (lower, row) {
        (false, 0..=7) => Some(row),
        (true, 2..=9) => Some(row - 2),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_per_normal_line() {
        for (mode, bytes) in [(2, 40), (6, 20), (8, 10), (9, 10), (0xA, 20), (0xC, 20), (0xE, 40), (0xF, 40)] {
            let info = mode_info(mode).map(|i| 160 / i.clocks_per_byte);
            assert_eq!(info, Some(bytes), "mode {mode:X}");
        }
        assert!(mode_info(0).is_none());
        assert!(mode_info(1).is_none());
    }

    #[test]
    fn descenders_shift_down() {
        assert_eq!(descender_row(0x41, 0), Some(0));
        assert_eq!(descender_row(0x41, 8), None);
        assert_eq!(descender_row(0x61, 0), None);
        assert_eq!(descender_row(0x61, 9), Some(7));
    }
}
