//! General Instrument AY-3-8900 STIC (Standard Television Interface Chip).
//!
//! The STIC owns the Intellivision display: a 20×12 grid of 8×8 cards
//! fetched from BACKTAB, drawn from the 2 KiB GROM or the 512-word GRAM,
//! plus eight movable objects (MOBs) with hardware collision detection.
//!
//! ## Register map (`$00-$3F`)
//!
//! | Address   | Register                                   |
//! |-----------|--------------------------------------------|
//! | `$00-$07` | MOB X: position, INTR, VISB, XSIZE         |
//! | `$08-$0F` | MOB Y: position, YRES, YSIZE, XFLIP, YFLIP |
//! | `$10-$17` | MOB A: colour, card, GRAM, PRIO            |
//! | `$18-$1F` | MOB collisions (sticky)                    |
//! | `$20`     | Display enable (write during vblank)       |
//! | `$21`     | Mode: read = colour stack, write = FG/BG   |
//! | `$28-$2B` | Colour stack                               |
//! | `$2C`     | Border colour                              |
//! | `$30/$31` | Horizontal / vertical delay                |
//! | `$32`     | Border extension (bit 0 left, bit 1 top)   |
//!
//! ## Timing
//! 57 CPU cycles per line, 262 lines per frame. Each frame starts with
//! 70 lines of vertical blank (interrupt asserted, bus open to the CPU),
//! then 12 card rows of 16 lines each. While the display is enabled the
//! STIC takes the bus at the start of each card row and its registers,
//! GROM and GRAM read as open bus.

mod mob;
mod palette;
mod stic;

pub use palette::PALETTE;
pub use stic::{
    CYCLES_PER_FRAME, CYCLES_PER_LINE, FB_HEIGHT, FB_WIDTH, LatchGroup, LatchPolicy, STIC_IRQ,
    Stic,
};
