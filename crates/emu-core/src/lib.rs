//! Core traits and types for cycle-driven console emulation.
//!
//! Every machine in this workspace counts time in CPU cycles. Chips that
//! run from a different crystal derive their own rate through a
//! [`ClockDivider`], so a frame always costs the same integer number of
//! cycles and two runs from the same state produce the same output.

mod audio;
mod bus;
mod clock;
mod cpu;
mod crc32;
mod error;
mod machine;
mod memory;
mod memory_map;
mod observable;
mod processor_bus;
mod snapshot;

pub use audio::{AudioMixer, AudioOutputLine};
pub use bus::{Bus, SimpleBus, SimpleWordBus, WordBus};
pub use clock::ClockDivider;
pub use cpu::{Cpu, Interrupt};
pub use crc32::crc32;
pub use error::CoreFault;
pub use machine::{InputState, Machine, SystemKind};
pub use memory::{BankTrigger, Ram, Rom, RomBanker};
pub use memory_map::{Decoded, MemoryMap};
pub use observable::{Observable, Value};
pub use processor_bus::{IrqSource, ProcessorBus};
pub use snapshot::{SnapshotError, StateReader, StateWriter};
