//! Faults raised while running emulated hardware.

use thiserror::Error;

/// An unrecoverable condition inside a processor or bus.
///
/// A fault stops the machine; the orchestrator moves to its faulted state
/// and refuses to run further frames.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreFault {
    #[error("illegal opcode {opcode:#06X} at {pc:#06X}")]
    IllegalOpcode { pc: u16, opcode: u16 },
    #[error("bus configuration: {0}")]
    BusConfiguration(String),
    #[error("processor halted at {pc:#06X}")]
    Halted { pc: u16 },
}
