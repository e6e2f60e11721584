//! MOS 6502 processor core.
//!
//! The core executes one instruction per [`Mos6502::step`] and reports the
//! cycles it took, including page-cross and branch penalties. The Atari
//! 5200's 6502C ("SALLY") is a stock NMOS 6502 with an extra HALT input;
//! bus halts are modelled outside the core as stolen cycles.

mod cpu;
pub mod flags;
mod registers;

pub use cpu::Mos6502;
pub use flags::Status;
pub use registers::Registers;
