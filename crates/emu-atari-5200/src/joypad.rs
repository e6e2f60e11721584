//! 5200 joypads.
//!
//! Each joypad has an analog stick read through two POKEY pot counters,
//! a 12-key keypad plus Start/Pause/Reset scanned by POKEY, a bottom fire
//! button on a GTIA trigger and a top fire button on SKSTAT. POKEY only
//! sees the keypad of the joypad selected by CONSOL bits 0-1.

use emu_core::InputState;
use serde::{Deserialize, Serialize};

/// Button bits of [`InputState::buttons`] for a joypad.
pub mod buttons {
    pub const KEY_0: u64 = 1 << 0;
    pub const KEY_1: u64 = 1 << 1;
    pub const KEY_2: u64 = 1 << 2;
    pub const KEY_3: u64 = 1 << 3;
    pub const KEY_4: u64 = 1 << 4;
    pub const KEY_5: u64 = 1 << 5;
    pub const KEY_6: u64 = 1 << 6;
    pub const KEY_7: u64 = 1 << 7;
    pub const KEY_8: u64 = 1 << 8;
    pub const KEY_9: u64 = 1 << 9;
    pub const KEY_STAR: u64 = 1 << 10;
    pub const KEY_HASH: u64 = 1 << 11;
    pub const START: u64 = 1 << 12;
    pub const PAUSE: u64 = 1 << 13;
    pub const RESET: u64 = 1 << 14;
    pub const FIRE_BOTTOM: u64 = 1 << 16;
    pub const FIRE_TOP: u64 = 1 << 17;
    pub const STICK_UP: u64 = 1 << 20;
    pub const STICK_DOWN: u64 = 1 << 21;
    pub const STICK_LEFT: u64 = 1 << 22;
    pub const STICK_RIGHT: u64 = 1 << 23;
}

/// Scan position of each key; KBCODE reports it shifted left by one.
const KEYPAD: [(u64, u8); 15] = [
    (buttons::KEY_HASH, 1),
    (buttons::KEY_0, 2),
    (buttons::KEY_STAR, 3),
    (buttons::RESET, 4),
    (buttons::KEY_9, 5),
    (buttons::KEY_8, 6),
    (buttons::KEY_7, 7),
    (buttons::PAUSE, 8),
    (buttons::KEY_6, 9),
    (buttons::KEY_5, 10),
    (buttons::KEY_4, 11),
    (buttons::START, 12),
    (buttons::KEY_3, 13),
    (buttons::KEY_2, 14),
    (buttons::KEY_1, 15),
];

pub const POT_CENTRE: u8 = 114;
pub const POT_LOW: u8 = 1;
pub const POT_HIGH: u8 = 227;

fn axis(analog: Option<i8>, low: bool, high: bool) -> u8 {
    if let Some(v) = analog {
        let pot = i32::from(POT_CENTRE) + i32::from(v) * i32::from(POT_CENTRE) / 128;
        return pot.clamp(i32::from(POT_LOW), i32::from(POT_HIGH)) as u8;
    }
    match (low, high) {
        (true, false) => POT_LOW,
        (false, true) => POT_HIGH,
        _ => POT_CENTRE,
    }
}

/// The lines one joypad drives, derived from its [`InputState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Joypad {
    pub key: Option<u8>,
    pub fire_bottom: bool,
    pub fire_top: bool,
    pub pots: (u8, u8),
}

impl Default for Joypad {
    fn default() -> Self {
        Self {
            key: None,
            fire_bottom: false,
            fire_top: false,
            pots: (POT_CENTRE, POT_CENTRE),
        }
    }
}

impl Joypad {
    #[must_use]
    pub fn from_input(state: &InputState) -> Self {
        let (x, y) = state.analog.unzip();
        Self {
            key: keypad_code(state),
            fire_bottom: state.is_pressed(buttons::FIRE_BOTTOM),
            fire_top: state.is_pressed(buttons::FIRE_TOP),
            pots: (
                axis(
                    x,
                    state.is_pressed(buttons::STICK_LEFT),
                    state.is_pressed(buttons::STICK_RIGHT),
                ),
                axis(
                    y,
                    state.is_pressed(buttons::STICK_UP),
                    state.is_pressed(buttons::STICK_DOWN),
                ),
            ),
        }
    }
}

/// KBCODE for the held key. With several held, the lowest scan
/// position wins.
#[must_use]
pub fn keypad_code(state: &InputState) -> Option<u8> {
    KEYPAD
        .iter()
        .find(|&&(mask, _)| state.is_pressed(mask))
        .map(|&(_, index)| index << 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keypad_codes_follow_scan_order() {
        assert_eq!(keypad_code(&InputState::buttons(buttons::KEY_1)), Some(0x1E));
        assert_eq!(keypad_code(&InputState::buttons(buttons::START)), Some(0x18));
        assert_eq!(keypad_code(&InputState::buttons(buttons::KEY_HASH)), Some(0x02));
        assert_eq!(
            keypad_code(&InputState::buttons(buttons::KEY_1 | buttons::KEY_0)),
            Some(0x04)
        );
        assert_eq!(keypad_code(&InputState::default()), None);
    }

    #[test]
    fn analog_stick_spans_pot_range() {
        let pad = Joypad::from_input(&InputState {
            buttons: 0,
            analog: Some((-128, 127)),
        });
        assert_eq!(pad.pots, (POT_LOW, 227));
        let centred = Joypad::from_input(&InputState {
            buttons: 0,
            analog: Some((0, 0)),
        });
        assert_eq!(centred.pots, (POT_CENTRE, POT_CENTRE));
    }

    #[test]
    fn digital_stick_uses_extremes() {
        let pad = Joypad::from_input(&InputState::buttons(
            buttons::STICK_LEFT | buttons::STICK_DOWN | buttons::FIRE_TOP,
        ));
        assert_eq!(pad.pots, (POT_LOW, POT_HIGH));
        assert!(pad.fire_top);
        assert!(!pad.fire_bottom);
    }
}
