//! Hand controllers and the ECS keyboard.
//!
//! A hand controller drives one PSG port with an active-low code: each
//! keypad key, action button and disc direction closes a fixed set of
//! lines, and pressing several at once ORs them together.

use emu_core::InputState;
use serde::{Deserialize, Serialize};

/// Button bits of [`InputState::buttons`] for a hand controller.
pub mod buttons {
    pub const KEY_1: u64 = 1 << 0;
    pub const KEY_2: u64 = 1 << 1;
    pub const KEY_3: u64 = 1 << 2;
    pub const KEY_4: u64 = 1 << 3;
    pub const KEY_5: u64 = 1 << 4;
    pub const KEY_6: u64 = 1 << 5;
    pub const KEY_7: u64 = 1 << 6;
    pub const KEY_8: u64 = 1 << 7;
    pub const KEY_9: u64 = 1 << 8;
    pub const KEY_CLEAR: u64 = 1 << 9;
    pub const KEY_0: u64 = 1 << 10;
    pub const KEY_ENTER: u64 = 1 << 11;
    pub const ACTION_TOP: u64 = 1 << 12;
    pub const ACTION_LEFT: u64 = 1 << 13;
    pub const ACTION_RIGHT: u64 = 1 << 14;
    pub const DISC_UP: u64 = 1 << 16;
    pub const DISC_DOWN: u64 = 1 << 17;
    pub const DISC_LEFT: u64 = 1 << 18;
    pub const DISC_RIGHT: u64 = 1 << 19;
}

/// Keypad codes in button-bit order: 1-9, Clear, 0, Enter.
const KEYPAD: [u8; 12] = [
    0x81, 0x41, 0x21, 0x82, 0x42, 0x22, 0x84, 0x44, 0x24, 0x88, 0x48, 0x28,
];

/// Action buttons: top, lower left, lower right.
const ACTIONS: [u8; 3] = [0xA0, 0x60, 0xC0];

/// Disc codes for 16 directions, counter-clockwise from east.
const DISC: [u8; 16] = [
    0x02, 0x06, 0x16, 0x14, 0x04, 0x0C, 0x1C, 0x18, 0x08, 0x09, 0x19, 0x11, 0x01, 0x03, 0x13,
    0x12,
];

/// Analog deflection below this reads as centred.
const DEAD_ZONE: f64 = 32.0;

fn disc_direction(state: &InputState) -> Option<usize> {
    if let Some((x, y)) = state.analog {
        let (x, y) = (f64::from(x), -f64::from(y));
        if x.hypot(y) < DEAD_ZONE {
            return None;
        }
        let sector = (y.atan2(x).to_degrees() + 360.0 + 11.25) / 22.5;
        return Some(sector as usize % 16);
    }

    let up = state.is_pressed(buttons::DISC_UP);
    let down = state.is_pressed(buttons::DISC_DOWN);
    let left = state.is_pressed(buttons::DISC_LEFT);
    let right = state.is_pressed(buttons::DISC_RIGHT);
    match (up, down, left, right) {
        (false, false, false, true) => Some(0),
        (true, false, false, true) => Some(2),
        (true, false, false, false) => Some(4),
        (true, false, true, false) => Some(6),
        (false, false, true, false) => Some(8),
        (false, true, true, false) => Some(10),
        (false, true, false, false) => Some(12),
        (false, true, false, true) => Some(14),
        _ => None,
    }
}

/// Active-high line code for a hand controller. The PSG port reads its
/// complement.
#[must_use]
pub fn controller_code(state: &InputState) -> u8 {
    let mut code = 0;
    for (i, &key) in KEYPAD.iter().enumerate() {
        if state.is_pressed(1 << i) {
            code |= key;
        }
    }
    for (i, &action) in ACTIONS.iter().enumerate() {
        if state.is_pressed(buttons::ACTION_TOP << i) {
            code |= action;
        }
    }
    if let Some(dir) = disc_direction(state) {
        code |= DISC[dir];
    }
    code
}

/// ECS keyboard: an 8×8 matrix. Key `n` sits in column `n / 8`, row
/// `n % 8`; [`InputState::buttons`] bit `n` holds it down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyboard {
    keys: u64,
}

impl Keyboard {
    pub fn set(&mut self, state: &InputState) {
        self.keys = state.buttons;
    }

    /// Row lines seen with the active-low column strobe `columns`.
    #[must_use]
    pub fn rows(&self, columns: u8) -> u8 {
        let mut rows = 0xFF;
        for col in 0..8 {
            if columns & (1 << col) != 0 {
                continue;
            }
            let column_keys = (self.keys >> (col * 8)) as u8;
            rows &= !column_keys;
        }
        rows
    }
}
