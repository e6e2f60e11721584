//! Intellivision address decoding.
//!
//! | Range           | Device                                    |
//! |-----------------|-------------------------------------------|
//! | `$0000-$003F`   | STIC registers                            |
//! | `$0080-$0081`   | Intellivoice (SP0256)                     |
//! | `$00F0-$00FF`   | ECS PSG                                   |
//! | `$0100-$01EF`   | Scratchpad RAM, 8-bit                     |
//! | `$01F0-$01FF`   | PSG                                       |
//! | `$0200-$02EF`   | BACKTAB (system RAM, read by the STIC)    |
//! | `$02F0-$035F`   | System RAM, 16-bit                        |
//! | `$1000-$1FFF`   | Executive ROM                             |
//! | `$2000-$2FFF`   | ECS ROM (paged)                           |
//! | `$3000-$37FF`   | GROM                                      |
//! | `$3800-$3FFF`   | GRAM (512 words, mirrored)                |
//! | `$4000-$47FF`   | ECS RAM, 8-bit                            |
//! | `$7000-$7FFF`   | ECS ROM (paged)                           |
//! | `$E000-$EFFF`   | ECS ROM (paged)                           |
//!
//! Cartridge segments fill the rest. A 4K window with paged ROM switches
//! page on a write of `$xA5p` to `$xFFF`, where `x` is the window's top
//! nibble and `p` the page.

use emu_core::{
    BankTrigger, CoreFault, MemoryMap, ProcessorBus, Ram, Rom, RomBanker, WordBus,
};
use format_rip::{LoadedProgram, Segment};
use gi_ay_3_8900::Stic;
use gi_ay_3_8914::{Ay3_8914, Port};
use gi_sp0256::Sp0256;
use serde::{Deserialize, Serialize};

use crate::input::Keyboard;

const OPEN_BUS: u16 = 0xFFFF;
const WINDOW: u16 = 0x1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Device {
    Stic,
    Voice,
    EcsPsg,
    Scratch,
    Psg,
    Backtab,
    SystemRam,
    Exec,
    Grom,
    Gram,
    EcsRam,
    Rom(usize),
    Bank(usize),
    CartRam(usize),
}

/// The second PSG, its RAM and the keyboard it scans.
#[derive(Clone, Serialize, Deserialize)]
pub struct Ecs {
    pub psg: Ay3_8914,
    pub ram: Ram,
    pub keyboard: Keyboard,
}

/// Mutable memory contents, in save-state order.
#[derive(Serialize, Deserialize)]
pub(crate) struct MemoryState {
    scratch: Ram,
    system_ram: Ram,
    ecs_ram: Option<Ram>,
    cart_ram: Vec<Ram>,
    pages: Vec<Option<u16>>,
}

/// Everything the CP1610 can address.
pub struct IntvBus {
    map: MemoryMap<Device>,
    pub processor: ProcessorBus,
    pub stic: Stic,
    pub psg: Ay3_8914,
    pub ecs: Option<Ecs>,
    pub voice: Option<Sp0256>,
    scratch: Ram,
    system_ram: Ram,
    exec: Rom,
    roms: Vec<Rom>,
    banks: Vec<RomBanker>,
    cart_ram: Vec<Ram>,
}

/// Split a segment into the 4K windows it covers.
fn windows(segment: &Segment) -> Vec<(u16, Vec<u16>)> {
    let mut out = Vec::new();
    let mut address = u32::from(segment.address);
    let mut rest = segment.data.as_slice();
    while !rest.is_empty() {
        let room = (u32::from(WINDOW) - address % u32::from(WINDOW)) as usize;
        let take = room.min(rest.len());
        out.push((address as u16, rest[..take].to_vec()));
        address += take as u32;
        rest = &rest[take..];
    }
    out
}

impl IntvBus {
    pub(crate) fn new(
        exec: Rom,
        stic: Stic,
        psg: Ay3_8914,
        ecs: Option<(Ecs, Rom)>,
        voice: Option<Sp0256>,
        program: &LoadedProgram,
    ) -> Result<Self, CoreFault> {
        let mut bus = Self {
            map: MemoryMap::new(),
            processor: ProcessorBus::new(),
            stic,
            psg,
            ecs: None,
            voice,
            scratch: Ram::new(0xF0, 8),
            system_ram: Ram::new(0x70, 16),
            exec,
            roms: Vec::new(),
            banks: Vec::new(),
            cart_ram: Vec::new(),
        };

        let map = &mut bus.map;
        map.map(0x0000, 0x003F, Device::Stic)?;
        map.map(0x0100, 0x01EF, Device::Scratch)?;
        map.map(0x01F0, 0x01FF, Device::Psg)?;
        map.map(0x0200, 0x02EF, Device::Backtab)?;
        map.map(0x02F0, 0x035F, Device::SystemRam)?;
        map.map(0x1000, 0x1FFF, Device::Exec)?;
        map.map(0x3000, 0x37FF, Device::Grom)?;
        map.map(0x3800, 0x3FFF, Device::Gram)?;
        if bus.voice.is_some() {
            bus.map.map(0x0080, 0x0081, Device::Voice)?;
        }

        if let Some((ecs, rom)) = ecs {
            bus.map.map(0x00F0, 0x00FF, Device::EcsPsg)?;
            bus.map.map(0x4000, 0x47FF, Device::EcsRam)?;
            // ecs.bin holds the $2000 window, then $7000, then $E000.
            let data = rom.data();
            for (i, (address, page)) in [(0x2000u16, 1u16), (0x7000, 0), (0xE000, 1)]
                .into_iter()
                .enumerate()
            {
                let start = (i * usize::from(WINDOW)).min(data.len());
                let end = (start + usize::from(WINDOW)).min(data.len());
                bus.add_page(address, page, data[start..end].to_vec())?;
            }
            bus.ecs = Some(ecs);
        }

        for segment in program.segments.iter().filter(|s| !s.data.is_empty()) {
            match segment.page {
                Some(page) => {
                    for (address, data) in windows(segment) {
                        bus.add_page(address, page, data)?;
                    }
                }
                None => {
                    bus.map.map_len(
                        segment.address,
                        segment.data.len(),
                        Device::Rom(bus.roms.len()),
                    )?;
                    bus.roms.push(Rom::new(segment.data.clone()));
                }
            }
        }

        for region in &program.ram {
            bus.map.map_len(
                region.address,
                usize::from(region.len),
                Device::CartRam(bus.cart_ram.len()),
            )?;
            bus.cart_ram
                .push(Ram::new(usize::from(region.len), region.width));
        }

        Ok(bus)
    }

    /// Add `page` to the paged window holding `address`, creating the
    /// window on first use.
    fn add_page(&mut self, address: u16, page: u16, data: Vec<u16>) -> Result<(), CoreFault> {
        let base = address & !(WINDOW - 1);
        let index = match self.map.decode(base).map(|d| d.device) {
            Some(Device::Bank(i)) => i,
            _ => {
                self.map
                    .map(base, base + (WINDOW - 1), Device::Bank(self.banks.len()))?;
                self.banks.push(RomBanker::new(BankTrigger::Write {
                    offset: WINDOW - 1,
                    mask: 0xFFF0,
                    value: (base & 0xF000) | 0x0A50,
                    page_mask: 0x000F,
                }));
                self.banks.len() - 1
            }
        };
        // Segments that start inside the window keep their offset.
        let mut cells = vec![OPEN_BUS; usize::from(address - base)];
        cells.extend(data);
        self.banks[index].add_page(page, Rom::new(cells));
        Ok(())
    }

    /// Route ECS keyboard rows onto PSG port B when port A strobes columns.
    fn scan_keyboard(&mut self) {
        if let Some(ecs) = &mut self.ecs {
            let enables = ecs.psg.read(8);
            if enables & 0x40 != 0 && enables & 0x80 == 0 {
                let columns = ecs.psg.read(14) as u8;
                ecs.psg.set_port_input(Port::B, ecs.keyboard.rows(columns));
            }
        }
    }

    /// Advance every chip by `cycles` CPU cycles.
    pub(crate) fn advance(&mut self, cycles: u64) {
        self.stic.advance(cycles, &mut self.processor);
        self.psg.advance(cycles);
        if let Some(ecs) = &mut self.ecs {
            ecs.psg.advance(cycles);
        }
        if let Some(voice) = &mut self.voice {
            voice.advance(cycles);
        }
    }

    pub(crate) fn reset(&mut self) {
        self.processor.reset();
        self.stic.reset();
        self.psg.reset();
        self.scratch.clear();
        self.system_ram.clear();
        for ram in &mut self.cart_ram {
            ram.clear();
        }
        if let Some(ecs) = &mut self.ecs {
            ecs.psg.reset();
            ecs.ram.clear();
        }
        if let Some(voice) = &mut self.voice {
            voice.reset();
        }
        for bank in &mut self.banks {
            bank.select_page(0);
            if bank.active_page().is_none() {
                // Windows without a page 0 (ECS $2000/$E000) start on page 1.
                bank.select_page(1);
            }
        }
    }

    /// Read without side effects, for debugging.
    #[must_use]
    pub fn peek(&self, address: u16) -> u16 {
        let Some(decoded) = self.map.decode(address) else {
            return OPEN_BUS;
        };
        let offset = decoded.offset;
        match decoded.device {
            Device::Scratch => self.scratch.read(offset),
            Device::Backtab => self.stic.read_backtab(offset),
            Device::SystemRam => self.system_ram.read(offset),
            Device::Exec => self.exec.read(offset).unwrap_or(OPEN_BUS),
            Device::Grom => self.stic.read_grom(offset),
            Device::Gram => self.stic.read_gram(offset),
            Device::EcsRam => self.ecs.as_ref().map_or(OPEN_BUS, |e| e.ram.read(offset)),
            Device::Rom(i) => self.roms[i].read(offset).unwrap_or(OPEN_BUS),
            Device::CartRam(i) => self.cart_ram[i].read(offset),
            Device::Psg => self.psg.read(offset),
            Device::Voice => self.voice.as_ref().map_or(OPEN_BUS, |v| v.read(offset)),
            Device::Bank(i) => self.banks[i].peek(offset).unwrap_or(OPEN_BUS),
            Device::Stic | Device::EcsPsg => OPEN_BUS,
        }
    }

    /// Active page of every paged window, in creation order.
    #[must_use]
    pub fn pages(&self) -> Vec<Option<u16>> {
        self.banks.iter().map(RomBanker::active_page).collect()
    }

    pub(crate) fn memory_state(&self) -> MemoryState {
        MemoryState {
            scratch: self.scratch.clone(),
            system_ram: self.system_ram.clone(),
            ecs_ram: self.ecs.as_ref().map(|e| e.ram.clone()),
            cart_ram: self.cart_ram.clone(),
            pages: self.pages(),
        }
    }

    pub(crate) fn restore_memory(&mut self, state: MemoryState) -> Result<(), String> {
        if state.cart_ram.len() != self.cart_ram.len() || state.pages.len() != self.banks.len() {
            return Err("cartridge memory layout differs".into());
        }
        self.scratch = state.scratch;
        self.system_ram = state.system_ram;
        self.cart_ram = state.cart_ram;
        if let (Some(ecs), Some(ram)) = (&mut self.ecs, state.ecs_ram) {
            ecs.ram = ram;
        }
        for (bank, page) in self.banks.iter_mut().zip(state.pages) {
            // No page number matches u16::MAX, which leaves the window unmapped.
            bank.select_page(page.unwrap_or(u16::MAX));
        }
        Ok(())
    }
}

impl WordBus for IntvBus {
    fn read(&mut self, address: u16) -> u16 {
        let Some(decoded) = self.map.decode(address) else {
            log::trace!("unmapped read {address:#06X}");
            return OPEN_BUS;
        };
        let offset = decoded.offset;
        match decoded.device {
            Device::Stic => self.stic.read(offset),
            Device::EcsPsg => {
                if offset & 0x0F == 15 {
                    self.scan_keyboard();
                }
                self.ecs.as_ref().map_or(OPEN_BUS, |e| e.psg.read(offset))
            }
            Device::Bank(i) => self.banks[i].read(offset).unwrap_or(OPEN_BUS),
            _ => self.peek(address),
        }
    }

    fn write(&mut self, address: u16, value: u16) {
        let Some(decoded) = self.map.decode(address) else {
            log::trace!("unmapped write {value:#06X} to {address:#06X}");
            return;
        };
        let offset = decoded.offset;
        match decoded.device {
            Device::Stic => self.stic.write(offset, value),
            Device::Voice => {
                if let Some(voice) = &mut self.voice {
                    voice.write(offset, value);
                }
            }
            Device::EcsPsg => {
                if let Some(ecs) = &mut self.ecs {
                    ecs.psg.write(offset, value);
                }
            }
            Device::Scratch => self.scratch.write(offset, value),
            Device::Psg => self.psg.write(offset, value),
            Device::Backtab => self.stic.write_backtab(offset, value),
            Device::SystemRam => self.system_ram.write(offset, value),
            Device::Gram => self.stic.write_gram(offset, value),
            Device::EcsRam => {
                if let Some(ecs) = &mut self.ecs {
                    ecs.ram.write(offset, value);
                }
            }
            Device::Bank(i) => self.banks[i].write(offset, value),
            Device::CartRam(i) => self.cart_ram[i].write(offset, value),
            Device::Exec | Device::Grom | Device::Rom(_) => {
                log::trace!("write {value:#06X} to ROM at {address:#06X}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CPU_HZ, PSG_HZ};
    use format_rip::RamRegion;
    use emu_core::SystemKind;

    fn program(segments: Vec<Segment>) -> LoadedProgram {
        LoadedProgram {
            system: SystemKind::Intellivision,
            title: None,
            year: None,
            crc32: 0,
            segments,
            ram: Vec::new(),
            peripherals: Default::default(),
            input: Default::default(),
            mapping: Default::default(),
        }
    }

    #[test]
    fn every_address_has_one_owner() {
        let ecs = Ecs {
            psg: Ay3_8914::new(CPU_HZ, PSG_HZ, 44_100),
            ram: Ram::new(0x800, 8),
            keyboard: Keyboard::default(),
        };
        let bus = IntvBus::new(
            Rom::new(vec![0; 0x1000]),
            Stic::new(),
            Ay3_8914::new(CPU_HZ, PSG_HZ, 44_100),
            Some((ecs, Rom::new(vec![0; 0x3000]))),
            Some(Sp0256::new(CPU_HZ, 44_100)),
            &program(vec![Segment::new(0x5000, vec![0; 0x2000])]),
        )
        .expect("bus");

        let owned: Vec<_> = bus
            .map
            .coverage()
            .into_iter()
            .filter_map(|(start, end, device)| device.map(|d| (start, end, d)))
            .collect();
        assert_eq!(
            owned,
            vec![
                (0x0000, 0x003F, Device::Stic),
                (0x0080, 0x0081, Device::Voice),
                (0x00F0, 0x00FF, Device::EcsPsg),
                (0x0100, 0x01EF, Device::Scratch),
                (0x01F0, 0x01FF, Device::Psg),
                (0x0200, 0x02EF, Device::Backtab),
                (0x02F0, 0x035F, Device::SystemRam),
                (0x1000, 0x1FFF, Device::Exec),
                (0x2000, 0x2FFF, Device::Bank(0)),
                (0x3000, 0x37FF, Device::Grom),
                (0x3800, 0x3FFF, Device::Gram),
                (0x4000, 0x47FF, Device::EcsRam),
                (0x5000, 0x6FFF, Device::Rom(0)),
                (0x7000, 0x7FFF, Device::Bank(1)),
                (0xE000, 0xEFFF, Device::Bank(2)),
            ]
        );
    }

    #[test]
    fn overlapping_cartridge_is_a_configuration_fault() {
        let result = IntvBus::new(
            Rom::new(vec![0; 0x1000]),
            Stic::new(),
            Ay3_8914::new(CPU_HZ, PSG_HZ, 44_100),
            None,
            None,
            &program(vec![Segment::new(0x0F00, vec![0; 0x200])]),
        );
        assert!(matches!(result, Err(CoreFault::BusConfiguration(_))));
    }

    #[test]
    fn cartridge_ram_past_the_top_is_a_configuration_fault() {
        let mut cart = program(vec![Segment::new(0x5000, vec![0; 0x100])]);
        cart.ram.push(RamRegion {
            address: 0xFF00,
            len: 0x200,
            width: 8,
        });
        let result = IntvBus::new(
            Rom::new(vec![0; 0x1000]),
            Stic::new(),
            Ay3_8914::new(CPU_HZ, PSG_HZ, 44_100),
            None,
            None,
            &cart,
        );
        assert!(matches!(result, Err(CoreFault::BusConfiguration(_))));
    }
}
