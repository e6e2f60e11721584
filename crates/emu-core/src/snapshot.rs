//! Length-prefixed MessagePack sections for save states.
//!
//! A machine writes its state as a fixed sequence of sections (processor,
//! memory, video, audio, peripherals, driver). Each section is one serde
//! value encoded with `rmp-serde`; the outer file format lives with the
//! orchestrator.

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("encoding state: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("decoding state: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
    #[error("state section {0} is missing")]
    MissingSection(usize),
    #[error("state does not match this machine: {0}")]
    Mismatch(String),
}

/// Collects encoded sections in write order.
#[derive(Debug, Default)]
pub struct StateWriter {
    sections: Vec<Vec<u8>>,
}

impl StateWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn section<T: Serialize>(&mut self, value: &T) -> Result<(), SnapshotError> {
        self.sections.push(rmp_serde::to_vec_named(value)?);
        Ok(())
    }

    #[must_use]
    pub fn into_sections(self) -> Vec<Vec<u8>> {
        self.sections
    }
}

/// Hands encoded sections back in the order they were written.
#[derive(Debug)]
pub struct StateReader<'a> {
    sections: Vec<&'a [u8]>,
    next: usize,
}

impl<'a> StateReader<'a> {
    #[must_use]
    pub fn new(sections: Vec<&'a [u8]>) -> Self {
        Self { sections, next: 0 }
    }

    pub fn section<T: DeserializeOwned>(&mut self) -> Result<T, SnapshotError> {
        let bytes = self
            .sections
            .get(self.next)
            .ok_or(SnapshotError::MissingSection(self.next))?;
        self.next += 1;
        Ok(rmp_serde::from_slice(bytes)?)
    }
}
