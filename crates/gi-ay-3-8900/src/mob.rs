//! Movable object decode and rasterisation.
//!
//! A MOB is rebuilt from its three registers once per frame, as a bitmap
//! in framebuffer coordinates (one pixel per STIC X unit, two lines per
//! STIC Y unit).

#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]

/// Framebuffer lines per bitmap row for each YSIZE setting.
const LINES_PER_ROW: [i32; 4] = [1, 2, 4, 8];

#[derive(Debug, Clone)]
pub(crate) struct Mob {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub interact: bool,
    pub visible: bool,
    /// Drawn behind background foreground pixels.
    pub behind: bool,
    pub color: usize,
    pixels: Vec<bool>,
}

impl Mob {
    /// Build MOB from its X, Y and A registers. `gram` and `grom` hold one
    /// byte per word, eight words per card.
    pub fn decode(
        x_reg: u16,
        y_reg: u16,
        a_reg: u16,
        grom: &[u16],
        gram: &[u16],
        h_delay: i32,
        v_delay: i32,
    ) -> Self {
        let xsize = x_reg & 0x0400 != 0;
        let yres = y_reg & 0x0080 != 0;
        let ysize = ((y_reg >> 8) & 3) as usize;
        let xflip = y_reg & 0x0400 != 0;
        let yflip = y_reg & 0x0800 != 0;
        let from_gram = a_reg & 0x0800 != 0;

        let mut card = if from_gram {
            usize::from((a_reg >> 3) & 0x3F)
        } else {
            usize::from((a_reg >> 3) & 0xFF)
        };
        if yres {
            card &= !1;
        }

        let rows: i32 = if yres { 16 } else { 8 };
        let lines_per_row = LINES_PER_ROW[ysize];
        let px_per_bit: i32 = if xsize { 2 } else { 1 };
        let width = 8 * px_per_bit;
        let height = rows * lines_per_row;

        let mut pixels = vec![false; (width * height) as usize];
        for row in 0..rows {
            let src_row = if yflip { rows - 1 - row } else { row } as usize;
            let index = card + src_row / 8;
            let bits = if from_gram {
                gram.get((index & 0x3F) * 8 + src_row % 8)
            } else {
                grom.get((index & 0xFF) * 8 + src_row % 8)
            }
            .copied()
            .unwrap_or(0);

            for col in 0..8 {
                let mask = if xflip { 1 << col } else { 0x80 >> col };
                if bits & mask == 0 {
                    continue;
                }
                for dy in 0..lines_per_row {
                    for dx in 0..px_per_bit {
                        let px = col * px_per_bit + dx;
                        let py = row * lines_per_row + dy;
                        pixels[(py * width + px) as usize] = true;
                    }
                }
            }
        }

        Self {
            x: i32::from(x_reg & 0xFF) + h_delay,
            y: (i32::from(y_reg & 0x7F) + v_delay) * 2,
            width,
            height,
            interact: x_reg & 0x0100 != 0,
            visible: x_reg & 0x0200 != 0,
            behind: a_reg & 0x2000 != 0,
            color: usize::from((a_reg & 7) | ((a_reg >> 9) & 8)),
            pixels,
        }
    }

    /// Whether the MOB covers framebuffer pixel `(fx, fy)`.
    pub fn covers(&self, fx: i32, fy: i32) -> bool {
        let px = fx - self.x;
        let py = fy - self.y;
        px >= 0
            && py >= 0
            && px < self.width
            && py < self.height
            && self.pixels[(py * self.width + px) as usize]
    }

    /// Pixels set, in framebuffer coordinates.
    pub fn points(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.pixels
            .iter()
            .enumerate()
            .filter(|(_, set)| **set)
            .map(|(i, _)| {
                let i = i as i32;
                (self.x + i % self.width, self.y + i / self.width)
            })
    }
}
