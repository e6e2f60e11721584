//! NTSC 256-colour palette.
//!
//! Colour bytes carry hue in bits 7-4 and luminance in bits 3-0. Hue 0 is
//! grey; hues 1-15 step round the colour wheel starting at gold.

#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]

use std::f64::consts::PI;
use std::sync::OnceLock;

const SATURATION: f64 = 0.2;
/// Phase of hue 1, radians.
const HUE_START: f64 = -0.25 * PI;

static PALETTE: OnceLock<[u32; 256]> = OnceLock::new();

/// The palette, built on first use.
pub fn ntsc_palette() -> &'static [u32; 256] {
    PALETTE.get_or_init(build)
}

fn build() -> [u32; 256] {
    let mut table = [0u32; 256];
    for (index, entry) in table.iter_mut().enumerate() {
        let hue = index >> 4;
        let lum = index & 0x0F;
        let y = 0.05 + 0.9 * lum as f64 / 15.0;
        let (i, q) = if hue == 0 {
            (0.0, 0.0)
        } else {
            let angle = HUE_START + (hue - 1) as f64 * 2.0 * PI / 15.0;
            (SATURATION * angle.cos(), SATURATION * angle.sin())
        };
        let r = y + 0.956 * i + 0.621 * q;
        let g = y - 0.272 * i - 0.647 * q;
        let b = y - 1.106 * i + 1.703 * q;
        let channel = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u32;
        *entry = 0xFF00_0000 | channel(r) << 16 | channel(g) << 8 | channel(b);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hue_zero_is_grey_ramp() {
        let p = ntsc_palette();
        let mut last = 0;
        for lum in 0..16 {
            let c = p[lum];
            let (r, g, b) = ((c >> 16) & 0xFF, (c >> 8) & 0xFF, c & 0xFF);
            assert!(r == g && g == b);
            assert!(r >= last);
            last = r;
        }
    }

    #[test]
    fn all_opaque() {
        assert!(ntsc_palette().iter().all(|c| c >> 24 == 0xFF));
    }
}
