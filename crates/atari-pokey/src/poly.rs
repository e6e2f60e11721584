//! POKEY polynomial counters.
//!
//! Four LFSRs (4, 5, 9 and 17 bits) step once per machine cycle and are
//! shared by all channels. RANDOM reads the high byte of the 17-bit (or
//! 9-bit) counter.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Polys {
    poly4: u32,
    poly5: u32,
    poly9: u32,
    poly17: u32,
}

impl Default for Polys {
    fn default() -> Self {
        Self {
            poly4: 0xF,
            poly5: 0x1F,
            poly9: 0x1FF,
            poly17: 0x1_FFFF,
        }
    }
}

/// Shift `value` left, feeding in the XOR of bits `a` and `b`.
const fn step(value: u32, bits: u32, a: u32, b: u32) -> u32 {
    let feedback = ((value >> a) ^ (value >> b)) & 1;
    ((value << 1) | feedback) & ((1 << bits) - 1)
}

impl Polys {
    pub fn clock(&mut self) {
        self.poly4 = step(self.poly4, 4, 3, 2);
        self.poly5 = step(self.poly5, 5, 4, 2);
        self.poly9 = step(self.poly9, 9, 8, 4);
        self.poly17 = step(self.poly17, 17, 16, 13);
    }

    pub fn bit4(&self) -> bool {
        self.poly4 & 1 != 0
    }

    pub fn bit5(&self) -> bool {
        self.poly5 & 1 != 0
    }

    /// Output of the long counter: 9-bit when `short` is set.
    pub fn bit_long(&self, short: bool) -> bool {
        if short {
            self.poly9 & 1 != 0
        } else {
            self.poly17 & 1 != 0
        }
    }

    pub fn random(&self, short: bool) -> u8 {
        if short {
            (self.poly9 & 0xFF) as u8
        } else {
            (self.poly17 >> 9) as u8
        }
    }
}
