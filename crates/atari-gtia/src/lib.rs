//! Atari GTIA (CTIA successor): colour generation, players and missiles,
//! priority and collision detection.
//!
//! ANTIC hands GTIA one scanline of playfield codes (see [`pf`]) at a
//! time; GTIA overlays players and missiles, resolves priority and writes
//! ARGB pixels into its framebuffer. Registers take effect on the next
//! line rendered.

mod gtia;
mod palette;

pub use gtia::{FB_HEIGHT, FB_WIDTH, FIRST_VISIBLE_CLOCK, FIRST_VISIBLE_LINE, Gtia};
pub use palette::ntsc_palette;

/// Playfield codes ANTIC emits, one per hi-res pixel (half colour clock).
pub mod pf {
    pub const BAK: u8 = 0;
    pub const PF0: u8 = 1;
    pub const PF1: u8 = 2;
    pub const PF2: u8 = 3;
    pub const PF3: u8 = 4;
    /// Hi-res "on" pixel: PF2 hue with PF1 luminance.
    pub const HIRES: u8 = 5;
    /// GTIA-mode pixel; the low nibble carries the data.
    pub const NIBBLE: u8 = 0x10;
}
