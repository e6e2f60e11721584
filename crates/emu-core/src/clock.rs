//! Integer clock dividers.

use serde::{Deserialize, Serialize};

/// Converts cycles of one clock into ticks of a slower or faster one.
///
/// The remainder is carried between calls, so feeding the divider in any
/// chunking produces the same total number of output ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockDivider {
    input_hz: u64,
    output_hz: u64,
    remainder: u64,
}

impl ClockDivider {
    #[must_use]
    pub const fn new(input_hz: u64, output_hz: u64) -> Self {
        Self {
            input_hz,
            output_hz,
            remainder: 0,
        }
    }

    /// Feed `cycles` input cycles and return the number of output ticks.
    pub fn advance(&mut self, cycles: u64) -> u64 {
        let total = self.remainder + cycles * self.output_hz;
        self.remainder = total % self.input_hz;
        total / self.input_hz
    }

    #[must_use]
    pub const fn output_hz(&self) -> u64 {
        self.output_hz
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn divider_is_chunking_independent() {
        let mut one = ClockDivider::new(894_886, 10_000);
        let mut many = ClockDivider::new(894_886, 10_000);
        let a = one.advance(894_886);
        let mut b = 0;
        for _ in 0..894_886 / 7 {
            b += many.advance(7);
        }
        b += many.advance(894_886 % 7);
        assert_eq!(a, 10_000);
        assert_eq!(b, 10_000);
    }
}
