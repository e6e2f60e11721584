//! Atari 5200 SuperSystem.
//!
//! Wires the 6502C, ANTIC, GTIA and POKEY into a
//! [`Machine`](emu_core::Machine) with 16K of RAM, the 2K BIOS and a
//! 32K cartridge window, including the banked Bounty Bob layout.

mod atari5200;
mod bus;
mod config;
mod joypad;

pub use atari5200::{Atari5200, CPU_HZ};
pub use bus::{A5200Bus, BIOS_SIZE, Memory};
pub use config::Atari5200Config;
pub use joypad::{Joypad, POT_CENTRE, POT_HIGH, POT_LOW, buttons, keypad_code};
