//! Emulator session for the Intellivision and Atari 5200.
//!
//! [`Emulator`] owns one machine at a time and walks it through
//! `Uninitialized → Loaded → Running ⇄ Paused`, ending in `Faulted` after
//! a core fault or `TornDown` when the frontend is done. It loads
//! cartridges through `format-rip`, reads BIOS images from the configured
//! directory, and writes save states as a checksummed `EMST` blob.
//!
//! The caller serialises every call; nothing here is shared between
//! threads.

#[cfg(feature = "capture")]
pub mod capture;
mod config;
mod emulator;
mod error;
mod roms;
mod snapshot;

pub use config::{Config, LatchOverrides, VideoStandard};
pub use emulator::{Emulator, FrameOutput, State};
pub use error::{EmulatorError, StateError};
pub use roms::SystemRoms;
pub use snapshot::{STATE_MAGIC, STATE_VERSION};
