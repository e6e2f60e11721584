//! Interrupt and bus-ownership signalling between chips and a processor.
//!
//! Chips never touch the processor directly. They assert or release a
//! named interrupt source, pulse NMI, or request the bus for a number of
//! cycles; the machine then calls [`ProcessorBus::deliver`] before each
//! instruction and [`ProcessorBus::take_stall`] to account for stolen
//! cycles.

use serde::{Deserialize, Serialize};

use crate::{Cpu, Interrupt};

/// A maskable interrupt source, identified by its bit in the request mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrqSource(pub u8);

impl IrqSource {
    const fn bit(self) -> u32 {
        1 << (self.0 & 31)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorBus {
    irq_sources: u32,
    irq_delivered: bool,
    nmi_latched: bool,
    stall: u64,
}

impl ProcessorBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assert_irq(&mut self, source: IrqSource) {
        self.irq_sources |= source.bit();
    }

    pub fn release_irq(&mut self, source: IrqSource) {
        self.irq_sources &= !source.bit();
    }

    #[must_use]
    pub fn irq_asserted(&self) -> bool {
        self.irq_sources != 0
    }

    #[must_use]
    pub fn is_asserted(&self, source: IrqSource) -> bool {
        self.irq_sources & source.bit() != 0
    }

    /// Latch a non-maskable interrupt edge.
    pub fn pulse_nmi(&mut self) {
        self.nmi_latched = true;
    }

    pub fn take_nmi(&mut self) -> bool {
        std::mem::take(&mut self.nmi_latched)
    }

    /// Take the bus away from the processor for `cycles` cycles.
    pub fn request_bus(&mut self, cycles: u64) {
        self.stall += cycles;
    }

    /// Cycles the processor must sit out before its next instruction.
    pub fn take_stall(&mut self) -> u64 {
        std::mem::take(&mut self.stall)
    }

    /// Forward pending signals to the processor. The maskable line is
    /// delivered on its edges: raised when the first source asserts,
    /// withdrawn when the last one releases.
    pub fn deliver<C: Cpu>(&mut self, cpu: &mut C) {
        if self.take_nmi() {
            cpu.raise_interrupt(Interrupt::Nmi);
        }
        let level = self.irq_asserted();
        if level != self.irq_delivered {
            if level {
                cpu.raise_interrupt(Interrupt::Irq);
            } else {
                cpu.clear_interrupt(Interrupt::Irq);
            }
            self.irq_delivered = level;
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sources_combine() {
        let mut bus = ProcessorBus::new();
        let a = IrqSource(0);
        let b = IrqSource(3);
        bus.assert_irq(a);
        bus.assert_irq(b);
        bus.release_irq(a);
        assert!(bus.irq_asserted());
        assert!(bus.is_asserted(b));
        bus.release_irq(b);
        assert!(!bus.irq_asserted());
    }

    #[test]
    fn nmi_and_stall_are_consumed() {
        let mut bus = ProcessorBus::new();
        bus.pulse_nmi();
        bus.request_bus(10);
        bus.request_bus(4);
        assert!(bus.take_nmi());
        assert!(!bus.take_nmi());
        assert_eq!(bus.take_stall(), 14);
        assert_eq!(bus.take_stall(), 0);
    }
}
