//! CP1610 register file and status flags.

use serde::{Deserialize, Serialize};

/// Register set: R0-R7 plus the status flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    pub r: [u16; 8],
    pub s: bool,
    pub z: bool,
    pub o: bool,
    pub c: bool,
    /// Interrupts enabled.
    pub i: bool,
    /// SDBD prefix active for the next instruction.
    pub d: bool,
}

impl Registers {
    /// Stack pointer.
    pub const SP: usize = 6;
    /// Program counter.
    pub const PC: usize = 7;

    #[must_use]
    pub const fn pc(&self) -> u16 {
        self.r[Self::PC]
    }

    /// S, Z, O, C packed into a nibble (S in bit 3).
    #[must_use]
    pub fn status_nibble(&self) -> u16 {
        (u16::from(self.s) << 3) | (u16::from(self.z) << 2) | (u16::from(self.o) << 1) | u16::from(self.c)
    }

    pub fn set_status_nibble(&mut self, nibble: u16) {
        self.s = nibble & 0x8 != 0;
        self.z = nibble & 0x4 != 0;
        self.o = nibble & 0x2 != 0;
        self.c = nibble & 0x1 != 0;
    }

    /// Sign and zero from a 16-bit result.
    pub fn update_sz(&mut self, value: u16) {
        self.s = value & 0x8000 != 0;
        self.z = value == 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nibble_round_trip() {
        let mut regs = Registers::default();
        regs.set_status_nibble(0b1010);
        assert!(regs.s && !regs.z && regs.o && !regs.c);
        assert_eq!(regs.status_nibble(), 0b1010);
    }
}
