//! Session-level errors.

use std::io;

use emu_core::{CoreFault, SnapshotError, SystemKind};
use format_rip::LoadError;
use thiserror::Error;

use crate::State;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("save state version {found}, expected {expected}")]
    VersionMismatch { expected: u16, found: u16 },
    #[error("corrupt save state: {0}")]
    CorruptSnapshot(String),
    #[error("save state is for {found:?}, running {expected:?}")]
    SystemMismatch {
        expected: SystemKind,
        found: SystemKind,
    },
    #[error("save state I/O: {0}")]
    Io(#[from] io::Error),
}

impl From<SnapshotError> for StateError {
    fn from(err: SnapshotError) -> Self {
        Self::CorruptSnapshot(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum EmulatorError {
    #[error("load failed: {0}")]
    LoadFailed(#[from] LoadError),
    #[error("core fault: {0}")]
    Fault(#[from] CoreFault),
    #[error(transparent)]
    State(#[from] StateError),
    #[error("configuration: {0}")]
    Config(String),
    #[error("cannot {action} while {from:?}")]
    InvalidTransition { from: State, action: &'static str },
}
