//! Processor core trait.

/// Interrupt inputs a processor can receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// Non-maskable, edge triggered.
    Nmi,
    /// Maskable request (CP1610 INTRM, 6502 IRQ).
    Irq,
}

/// A processor core.
///
/// Execution itself (`step`, `reset`) is inherent on each core because
/// the cores disagree on bus width: the 6502 steps over a byte [`Bus`],
/// the CP1610 over a [`WordBus`]. Both return the cycles an instruction
/// consumed or a [`CoreFault`]. This trait carries what the rest of the
/// machine needs regardless of width: interrupt delivery and inspection.
///
/// [`Bus`]: crate::Bus
/// [`WordBus`]: crate::WordBus
/// [`CoreFault`]: crate::CoreFault
pub trait Cpu {
    /// The type used for register inspection.
    type Registers;

    /// Record a pending interrupt. Maskable requests are held until the
    /// processor can accept them.
    fn raise_interrupt(&mut self, kind: Interrupt);

    /// Withdraw a level-triggered request that has not been taken.
    fn clear_interrupt(&mut self, kind: Interrupt);

    /// Returns the current program counter.
    fn pc(&self) -> u16;

    /// Returns a snapshot of all registers for inspection.
    fn registers(&self) -> Self::Registers;

    /// Returns true if the processor executed a halt or jam instruction.
    fn is_halted(&self) -> bool;

    /// Total cycles executed since power-on.
    fn cycles(&self) -> u64;
}
