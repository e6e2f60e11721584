//! General Instrument CP1610 processor core.
//!
//! The CP1610 is a 16-bit processor with eight general registers (R6 is
//! the stack pointer, R7 the program counter) whose instructions are
//! 10-bit "decles". Instruction streams come from ROMs that only store the
//! low ten bits of each word; data may use all sixteen.
//!
//! | Flag | Meaning                                   |
//! |------|-------------------------------------------|
//! | S    | Sign (bit 15, bit 7 after right shifts)   |
//! | Z    | Zero                                      |
//! | O    | Signed overflow                           |
//! | C    | Carry (no borrow, for subtraction)        |
//! | I    | Interrupts enabled (EIS/DIS)              |
//! | D    | Double-byte data for the next instruction |

mod cpu;
mod registers;

pub use cpu::Cp1610;
pub use registers::Registers;
