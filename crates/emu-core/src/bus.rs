//! Memory and I/O bus interfaces.
//!
//! Two widths exist: the 6502 family moves bytes, the CP1610 moves 16-bit
//! words (of which ROMs usually only store the low ten bits).

/// Byte-wide memory and I/O bus.
///
/// Components access memory and peripherals through this trait. The bus
/// handles address decoding and routing to the appropriate device.
pub trait Bus {
    /// Read a byte from the given address.
    fn read(&mut self, address: u16) -> u8;

    /// Write a byte to the given address.
    fn write(&mut self, address: u16, value: u8);
}

/// Word-wide bus used by 16-bit processors.
pub trait WordBus {
    /// Read a word from the given address.
    fn read(&mut self, address: u16) -> u16;

    /// Write a word to the given address.
    fn write(&mut self, address: u16, value: u16);
}

/// Flat 64 KiB RAM bus for processor tests.
pub struct SimpleBus {
    memory: Vec<u8>,
}

impl SimpleBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            memory: vec![0; 0x1_0000],
        }
    }

    /// Copy `data` into memory starting at `address`, wrapping at the top.
    pub fn load(&mut self, address: u16, data: &[u8]) {
        for (i, &byte) in data.iter().enumerate() {
            self.memory[address.wrapping_add(i as u16) as usize] = byte;
        }
    }

    #[must_use]
    pub fn peek(&self, address: u16) -> u8 {
        self.memory[address as usize]
    }
}

impl Default for SimpleBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for SimpleBus {
    fn read(&mut self, address: u16) -> u8 {
        self.memory[address as usize]
    }

    fn write(&mut self, address: u16, value: u8) {
        self.memory[address as usize] = value;
    }
}

/// Flat 64 Ki-word RAM bus for processor tests.
pub struct SimpleWordBus {
    memory: Vec<u16>,
}

impl SimpleWordBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            memory: vec![0; 0x1_0000],
        }
    }

    pub fn load(&mut self, address: u16, data: &[u16]) {
        for (i, &word) in data.iter().enumerate() {
            self.memory[address.wrapping_add(i as u16) as usize] = word;
        }
    }

    #[must_use]
    pub fn peek(&self, address: u16) -> u16 {
        self.memory[address as usize]
    }
}

impl Default for SimpleWordBus {
    fn default() -> Self {
        Self::new()
    }
}

impl WordBus for SimpleWordBus {
    fn read(&mut self, address: u16) -> u16 {
        self.memory[address as usize]
    }

    fn write(&mut self, address: u16, value: u16) {
        self.memory[address as usize] = value;
    }
}
