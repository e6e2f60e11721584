//! The interface every console driver exposes to the orchestrator.

use serde::{Deserialize, Serialize};

use crate::{CoreFault, Observable, SnapshotError, StateReader, StateWriter};

/// Which console a driver emulates. The tag is stored in save states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SystemKind {
    Intellivision,
    Atari5200,
}

impl SystemKind {
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::Intellivision => 1,
            Self::Atari5200 => 2,
        }
    }

    #[must_use]
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::Intellivision),
            2 => Some(Self::Atari5200),
            _ => None,
        }
    }
}

/// State of one input device at a frame boundary.
///
/// Button bit assignments are defined by each driver. `analog` carries
/// stick deflection from -128 (left/up) to 127 (right/down).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputState {
    pub buttons: u64,
    pub analog: Option<(i8, i8)>,
}

impl InputState {
    #[must_use]
    pub const fn buttons(buttons: u64) -> Self {
        Self {
            buttons,
            analog: None,
        }
    }

    #[must_use]
    pub const fn is_pressed(&self, mask: u64) -> bool {
        self.buttons & mask != 0
    }
}

/// A complete console.
pub trait Machine: Observable {
    fn system(&self) -> SystemKind;

    /// Run until the video chip signals the end of a frame.
    fn run_frame(&mut self) -> Result<(), CoreFault>;

    /// Hardware reset. Cartridge and BIOS contents are kept.
    fn reset(&mut self);

    /// ARGB32 pixels, `framebuffer_width() * framebuffer_height()` long.
    fn framebuffer(&self) -> &[u32];
    fn framebuffer_width(&self) -> usize;
    fn framebuffer_height(&self) -> usize;

    /// Drain mixed host-rate audio produced since the last call.
    fn take_audio(&mut self) -> Vec<i16>;

    /// Buffer new input for `device`; applied at the next frame start.
    fn set_input(&mut self, device: usize, state: InputState);

    fn frame_count(&self) -> u64;

    /// Write processor, memory, video, audio, peripheral and driver
    /// sections, in that order.
    fn save_state(&self, out: &mut StateWriter) -> Result<(), SnapshotError>;

    fn load_state(&mut self, input: &mut StateReader<'_>) -> Result<(), SnapshotError>;
}
