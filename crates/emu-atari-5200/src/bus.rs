//! Atari 5200 address decoding.
//!
//! | Range           | Device                              |
//! |-----------------|-------------------------------------|
//! | `$0000-$3FFF`   | RAM, 16K                            |
//! | `$4000-$BFFF`   | Cartridge                           |
//! | `$C000-$CFFF`   | GTIA (32 registers, mirrored)       |
//! | `$D400-$D5FF`   | ANTIC (16 registers, mirrored)      |
//! | `$E800-$EFFF`   | POKEY (16 registers, mirrored)      |
//! | `$F800-$FFFF`   | BIOS                                |
//!
//! ANTIC fetches through [`Memory`] alone, so DMA never touches chip
//! registers.

use atari_antic::Antic;
use atari_gtia::Gtia;
use atari_pokey::Pokey;
use emu_core::{BankTrigger, Bus, CoreFault, MemoryMap, ProcessorBus, Ram, Rom, RomBanker};
use format_rip::{LoadedProgram, Mapping};
use serde::{Deserialize, Serialize};

use crate::joypad::Joypad;

const OPEN_BUS: u8 = 0xFF;
const WINDOW: u16 = 0x1000;
const RAM_SIZE: usize = 0x4000;
pub const BIOS_SIZE: usize = 0x800;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Region {
    Ram,
    Bios,
    Rom(usize),
    Bank(usize),
    CartRam(usize),
}

/// RAM, cartridge and BIOS: everything ANTIC can fetch from.
pub struct Memory {
    map: MemoryMap<Region>,
    ram: Ram,
    bios: Rom,
    roms: Vec<Rom>,
    banks: Vec<RomBanker>,
    cart_ram: Vec<Ram>,
}

#[derive(Serialize, Deserialize)]
pub(crate) struct MemoryState {
    ram: Ram,
    cart_ram: Vec<Ram>,
    pages: Vec<Option<u16>>,
}

impl Memory {
    fn new(bios: &[u8], program: &LoadedProgram) -> Result<Self, CoreFault> {
        if bios.len() != BIOS_SIZE {
            return Err(CoreFault::BusConfiguration(format!(
                "BIOS is {} bytes, expected {BIOS_SIZE}",
                bios.len()
            )));
        }
        let mut memory = Self {
            map: MemoryMap::new(),
            ram: Ram::new(RAM_SIZE, 8),
            bios: Rom::from_bytes(bios),
            roms: Vec::new(),
            banks: Vec::new(),
            cart_ram: Vec::new(),
        };
        memory.map.map(0x0000, 0x3FFF, Region::Ram)?;
        memory.map.map(0xF800, 0xFFFF, Region::Bios)?;

        for segment in program.segments.iter().filter(|s| !s.data.is_empty()) {
            let end = usize::from(segment.address) + segment.data.len() - 1;
            if segment.address < 0x4000 || end > 0xBFFF {
                return Err(CoreFault::BusConfiguration(format!(
                    "segment {:#06X}-{end:#06X} is outside the cartridge window",
                    segment.address
                )));
            }
            let data = Rom::new(segment.data.clone());
            match (segment.page, program.mapping) {
                (Some(page), Mapping::BountyBob) => memory.add_page(segment.address, page, data)?,
                (Some(_), mapping) => {
                    return Err(CoreFault::BusConfiguration(format!(
                        "paged segment at {:#06X} on a {mapping:?} cartridge",
                        segment.address
                    )));
                }
                (None, _) => {
                    memory.map.map(
                        segment.address,
                        end as u16,
                        Region::Rom(memory.roms.len()),
                    )?;
                    memory.roms.push(data);
                }
            }
        }

        for region in &program.ram {
            memory.map.map_len(
                region.address,
                usize::from(region.len),
                Region::CartRam(memory.cart_ram.len()),
            )?;
            memory
                .cart_ram
                .push(Ram::new(usize::from(region.len), region.width));
        }
        Ok(memory)
    }

    /// Bounty Bob 4K windows switch on any access to their last
    /// `$xFF6-$xFF9`.
    fn add_page(&mut self, address: u16, page: u16, rom: Rom) -> Result<(), CoreFault> {
        let base = address & !(WINDOW - 1);
        if address != base {
            return Err(CoreFault::BusConfiguration(format!(
                "paged segment at {address:#06X} is not window aligned"
            )));
        }
        let index = match self.map.decode(base).map(|d| d.device) {
            Some(Region::Bank(i)) => i,
            _ => {
                self.map
                    .map(base, base + (WINDOW - 1), Region::Bank(self.banks.len()))?;
                self.banks.push(RomBanker::new(BankTrigger::Access {
                    first: 0xFF6,
                    count: 4,
                }));
                self.banks.len() - 1
            }
        };
        self.banks[index].add_page(page, rom);
        Ok(())
    }

    /// Read without side effects.
    #[must_use]
    pub fn peek(&self, address: u16) -> u8 {
        let Some(decoded) = self.map.decode(address) else {
            return OPEN_BUS;
        };
        let offset = decoded.offset;
        let value = match decoded.device {
            Region::Ram => Some(self.ram.read(offset)),
            Region::Bios => self.bios.read(offset),
            Region::Rom(i) => self.roms[i].read(offset),
            Region::Bank(i) => self.banks[i].peek(offset),
            Region::CartRam(i) => Some(self.cart_ram[i].read(offset)),
        };
        value.map_or(OPEN_BUS, |v| v as u8)
    }

    #[must_use]
    pub fn pages(&self) -> Vec<Option<u16>> {
        self.banks.iter().map(RomBanker::active_page).collect()
    }

    fn reset(&mut self) {
        self.ram.clear();
        for ram in &mut self.cart_ram {
            ram.clear();
        }
        for bank in &mut self.banks {
            bank.select_page(0);
        }
    }

    pub(crate) fn state(&self) -> MemoryState {
        MemoryState {
            ram: self.ram.clone(),
            cart_ram: self.cart_ram.clone(),
            pages: self.pages(),
        }
    }

    pub(crate) fn restore(&mut self, state: MemoryState) -> Result<(), String> {
        if state.cart_ram.len() != self.cart_ram.len() || state.pages.len() != self.banks.len() {
            return Err("cartridge memory layout differs".into());
        }
        self.ram = state.ram;
        self.cart_ram = state.cart_ram;
        for (bank, page) in self.banks.iter_mut().zip(state.pages) {
            bank.select_page(page.unwrap_or(u16::MAX));
        }
        Ok(())
    }
}

impl Bus for Memory {
    fn read(&mut self, address: u16) -> u8 {
        match self.map.decode(address) {
            Some(decoded) => match decoded.device {
                Region::Bank(i) => self.banks[i]
                    .read(decoded.offset)
                    .map_or(OPEN_BUS, |v| v as u8),
                _ => self.peek(address),
            },
            None => {
                log::trace!("unmapped read {address:#06X}");
                OPEN_BUS
            }
        }
    }

    fn write(&mut self, address: u16, value: u8) {
        let Some(decoded) = self.map.decode(address) else {
            log::trace!("unmapped write {value:#04X} to {address:#06X}");
            return;
        };
        let offset = decoded.offset;
        match decoded.device {
            Region::Ram => self.ram.write(offset, u16::from(value)),
            Region::CartRam(i) => self.cart_ram[i].write(offset, u16::from(value)),
            Region::Bank(i) => self.banks[i].write(offset, u16::from(value)),
            Region::Bios | Region::Rom(_) => {
                log::trace!("write {value:#04X} to ROM at {address:#06X}");
            }
        }
    }
}

/// Everything the 6502 can address.
pub struct A5200Bus {
    pub processor: ProcessorBus,
    pub antic: Antic,
    pub gtia: Gtia,
    pub pokey: Pokey,
    pub memory: Memory,
    pub(crate) pads: [Joypad; 4],
}

impl A5200Bus {
    pub(crate) fn new(
        bios: &[u8],
        gtia: Gtia,
        pokey: Pokey,
        program: &LoadedProgram,
    ) -> Result<Self, CoreFault> {
        Ok(Self {
            processor: ProcessorBus::new(),
            antic: Antic::new(),
            gtia,
            pokey,
            memory: Memory::new(bios, program)?,
            pads: [Joypad::default(); 4],
        })
    }

    /// Drive every joypad's lines and route the CONSOL-selected keypad
    /// into POKEY.
    pub(crate) fn set_pads(&mut self, pads: [Joypad; 4]) {
        self.pads = pads;
        for (n, pad) in pads.iter().enumerate() {
            self.gtia.set_trigger(n, pad.fire_bottom);
            self.pokey.set_pot(n * 2, pad.pots.0);
            self.pokey.set_pot(n * 2 + 1, pad.pots.1);
        }
        self.select_keypad();
    }

    fn select_keypad(&mut self) {
        let pad = self.pads[usize::from(self.gtia.consol() & 3)];
        self.pokey.set_key(pad.key);
        self.pokey.set_top_button(pad.fire_top);
    }

    /// Advance ANTIC and POKEY by `cycles` machine cycles.
    pub(crate) fn advance(&mut self, cycles: u64) {
        self.antic
            .advance(cycles, &mut self.processor, &mut self.memory, &mut self.gtia);
        self.pokey.advance(cycles, &mut self.processor);
    }

    pub(crate) fn reset(&mut self) {
        self.processor.reset();
        self.antic.reset();
        self.gtia.reset();
        self.pokey.reset();
        self.memory.reset();
        self.select_keypad();
    }

    /// Read without side effects, for debugging.
    #[must_use]
    pub fn peek(&self, address: u16) -> u8 {
        match address {
            0xC000..=0xCFFF => self.gtia.read(address),
            0xD400..=0xD5FF => self.antic.read(address),
            0xE800..=0xEFFF => OPEN_BUS,
            _ => self.memory.peek(address),
        }
    }
}

impl Bus for A5200Bus {
    fn read(&mut self, address: u16) -> u8 {
        match address {
            0xC000..=0xCFFF => self.gtia.read(address),
            0xD400..=0xD5FF => self.antic.read(address),
            0xE800..=0xEFFF => self.pokey.read(address),
            _ => self.memory.read(address),
        }
    }

    fn write(&mut self, address: u16, value: u8) {
        match address {
            0xC000..=0xCFFF => {
                self.gtia.write(address, value);
                if address & 0x1F == 0x1F {
                    self.select_keypad();
                }
            }
            0xD400..=0xD5FF => self.antic.write(address, value),
            0xE800..=0xEFFF => self.pokey.write(address, value),
            _ => self.memory.write(address, value),
        }
    }
}
