//! Atari ANTIC (Alphanumeric Television Interface Controller).
//!
//! ANTIC walks a display list in memory, fetches screen and character data
//! by DMA, and hands each scanline to GTIA as playfield codes. It also
//! fetches player/missile graphics, steals CPU cycles for its DMA, raises
//! display-list and vertical-blank NMIs, and implements WSYNC.
//!
//! # Register map (16 registers, mirrored)
//!
//! | Reg | Write   | Read   |
//! |-----|---------|--------|
//! | $00 | DMACTL  | -      |
//! | $01 | CHACTL  | -      |
//! | $02 | DLISTL  | -      |
//! | $03 | DLISTH  | -      |
//! | $04 | HSCROL  | -      |
//! | $05 | VSCROL  | -      |
//! | $07 | PMBASE  | -      |
//! | $09 | CHBASE  | -      |
//! | $0A | WSYNC   | -      |
//! | $0B | -       | VCOUNT |
//! | $0C | -       | PENH   |
//! | $0D | -       | PENV   |
//! | $0E | NMIEN   | -      |
//! | $0F | NMIRES  | NMIST  |
//!
//! # Timing
//! 114 machine cycles per scanline, 262 scanlines. Display-list
//! processing covers scanlines 8-247; the VBI fires at scanline 248.

mod antic;
mod modes;

pub use antic::{
    Antic, CYCLES_PER_FRAME, CYCLES_PER_LINE, FIRST_DISPLAY_LINE, LINES_PER_FRAME, VBLANK_LINE,
};
