//! Processor status register (P) and its flag bits.

use serde::{Deserialize, Serialize};

/// Carry (inverted borrow for subtraction).
pub const C: u8 = 0x01;

/// Result was zero.
pub const Z: u8 = 0x02;

/// IRQ disable.
pub const I: u8 = 0x04;

/// BCD arithmetic for ADC/SBC.
pub const D: u8 = 0x08;

/// Only exists in pushed copies of P: set by BRK/PHP, clear for IRQ/NMI.
pub const B: u8 = 0x10;

/// Always reads as 1.
pub const U: u8 = 0x20;

/// Signed overflow.
pub const V: u8 = 0x40;

/// Bit 7 of the result.
pub const N: u8 = 0x80;

/// Processor status register.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status(pub u8);

impl Status {
    #[must_use]
    pub const fn new() -> Self {
        Self(U)
    }

    /// Status as pulled by PLP/RTI: B does not exist in the register.
    #[must_use]
    pub const fn from_byte(value: u8) -> Self {
        Self((value | U) & !B)
    }

    /// Value pushed by BRK and PHP (break and unused both set).
    #[must_use]
    pub const fn to_byte_brk(self) -> u8 {
        self.0 | U | B
    }

    /// Value pushed by IRQ and NMI entry (unused set, break clear).
    #[must_use]
    pub const fn to_byte_irq(self) -> u8 {
        (self.0 | U) & !B
    }

    #[must_use]
    pub const fn carry(self) -> u8 {
        self.0 & C
    }

    #[must_use]
    pub const fn is_set(self, flag: u8) -> bool {
        self.0 & flag != 0
    }

    pub fn set(&mut self, flag: u8) {
        self.0 |= flag;
    }

    pub fn clear(&mut self, flag: u8) {
        self.0 &= !flag;
    }

    pub fn set_if(&mut self, flag: u8, condition: bool) {
        if condition {
            self.set(flag);
        } else {
            self.clear(flag);
        }
    }

    /// N and Z from a result byte.
    pub fn update_nz(&mut self, value: u8) {
        self.set_if(N, value & 0x80 != 0);
        self.set_if(Z, value == 0);
    }
}
