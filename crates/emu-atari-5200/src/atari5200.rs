//! Top-level Atari 5200 system.
//!
//! The 6502C runs at 1.789772 MHz, the same clock ANTIC and POKEY count
//! in. A frame is 262 ANTIC lines of 114 cycles.

use atari_antic::Antic;
use atari_gtia::{FB_HEIGHT, FB_WIDTH, Gtia};
use atari_pokey::Pokey;
use emu_core::{
    AudioMixer, CoreFault, Cpu, InputState, Machine, Observable, ProcessorBus, SnapshotError,
    StateReader, StateWriter, SystemKind, Value,
};
use format_rip::LoadedProgram;
use mos_6502::Mos6502;
use serde::{Deserialize, Serialize};

use crate::bus::{A5200Bus, MemoryState};
use crate::config::Atari5200Config;
use crate::joypad::Joypad;

pub const CPU_HZ: u64 = 1_789_772;
const PADS: usize = 4;

#[derive(Serialize, Deserialize)]
struct VideoState {
    antic: Antic,
    gtia: Gtia,
}

#[derive(Serialize, Deserialize)]
struct PeripheralState {
    processor: ProcessorBus,
    pads: [Joypad; PADS],
}

#[derive(Serialize, Deserialize)]
struct DriverState {
    frame_count: u64,
    inputs: [InputState; PADS],
}

/// Atari 5200 SuperSystem with four joypad ports.
pub struct Atari5200 {
    cpu: Mos6502,
    bus: A5200Bus,
    mixer: AudioMixer,
    pending: [Option<InputState>; PADS],
    inputs: [InputState; PADS],
    frame_count: u64,
}

impl Atari5200 {
    /// Wire a machine around `program` and run the reset sequence.
    ///
    /// # Errors
    ///
    /// Fails if the cartridge is for another system, the BIOS is not 2K,
    /// cartridge segments fall outside `$4000-$BFFF`, or paged segments
    /// come with a mapping other than Bounty Bob.
    pub fn new(config: &Atari5200Config, program: &LoadedProgram) -> Result<Self, CoreFault> {
        if program.system != SystemKind::Atari5200 {
            return Err(CoreFault::BusConfiguration(format!(
                "{:?} cartridge in an Atari 5200",
                program.system
            )));
        }
        let bus = A5200Bus::new(
            &config.bios,
            Gtia::new(config.pal),
            Pokey::new(CPU_HZ, u64::from(config.sample_rate)),
            program,
        )?;
        log::info!(
            "Atari 5200: {} ({:?} mapping)",
            program.title.as_deref().unwrap_or("untitled"),
            program.mapping
        );

        let mut machine = Self {
            cpu: Mos6502::new(),
            bus,
            mixer: AudioMixer::new(),
            pending: [None; PADS],
            inputs: [InputState::default(); PADS],
            frame_count: 0,
        };
        machine.cpu.reset(&mut machine.bus);
        Ok(machine)
    }

    #[must_use]
    pub fn cpu(&self) -> &Mos6502 {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Mos6502 {
        &mut self.cpu
    }

    #[must_use]
    pub fn bus(&self) -> &A5200Bus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut A5200Bus {
        &mut self.bus
    }

    fn apply_input(&mut self) {
        for (slot, current) in self.pending.iter_mut().zip(&mut self.inputs) {
            if let Some(state) = slot.take() {
                *current = state;
            }
        }
        self.bus.set_pads(self.inputs.map(|state| Joypad::from_input(&state)));
    }
}

impl Machine for Atari5200 {
    fn system(&self) -> SystemKind {
        SystemKind::Atari5200
    }

    fn run_frame(&mut self) -> Result<(), CoreFault> {
        self.apply_input();
        loop {
            let stall = self.bus.processor.take_stall();
            if stall > 0 {
                self.cpu.stall(stall);
                self.bus.advance(stall);
            } else {
                self.bus.processor.deliver(&mut self.cpu);
                let cycles = self.cpu.step(&mut self.bus).inspect_err(|fault| {
                    log::error!("6502 fault: {fault}");
                })?;
                self.bus.advance(u64::from(cycles));
            }
            if self.bus.antic.take_frame_ready() {
                break;
            }
        }
        self.frame_count += 1;
        self.mixer.mix(&mut [self.bus.pokey.output_mut()]);
        Ok(())
    }

    fn reset(&mut self) {
        self.bus.reset();
        self.cpu.reset(&mut self.bus);
        self.mixer = AudioMixer::new();
        self.pending = [None; PADS];
    }

    fn framebuffer(&self) -> &[u32] {
        self.bus.gtia.framebuffer()
    }

    fn framebuffer_width(&self) -> usize {
        FB_WIDTH
    }

    fn framebuffer_height(&self) -> usize {
        FB_HEIGHT
    }

    fn take_audio(&mut self) -> Vec<i16> {
        self.mixer.take_buffer()
    }

    fn set_input(&mut self, device: usize, state: InputState) {
        match self.pending.get_mut(device) {
            Some(slot) => *slot = Some(state),
            None => log::warn!("Atari 5200 has no joypad port {device}"),
        }
    }

    fn frame_count(&self) -> u64 {
        self.frame_count
    }

    fn save_state(&self, out: &mut StateWriter) -> Result<(), SnapshotError> {
        out.section(&self.cpu)?;
        out.section(&self.bus.memory.state())?;
        out.section(&VideoState {
            antic: self.bus.antic.clone(),
            gtia: self.bus.gtia.clone(),
        })?;
        out.section(&self.bus.pokey)?;
        out.section(&PeripheralState {
            processor: self.bus.processor.clone(),
            pads: self.bus.pads,
        })?;
        out.section(&DriverState {
            frame_count: self.frame_count,
            inputs: self.inputs,
        })?;
        log::debug!("Atari 5200 state saved at frame {}", self.frame_count);
        Ok(())
    }

    fn load_state(&mut self, input: &mut StateReader<'_>) -> Result<(), SnapshotError> {
        let cpu: Mos6502 = input.section()?;
        let memory: MemoryState = input.section()?;
        let video: VideoState = input.section()?;
        let pokey: Pokey = input.section()?;
        let peripherals: PeripheralState = input.section()?;
        let driver: DriverState = input.section()?;

        self.bus
            .memory
            .restore(memory)
            .map_err(SnapshotError::Mismatch)?;
        self.cpu = cpu;
        self.bus.antic = video.antic;
        self.bus.gtia = video.gtia;
        self.bus.pokey = pokey;
        self.bus.processor = peripherals.processor;
        self.bus.pads = peripherals.pads;
        self.frame_count = driver.frame_count;
        self.inputs = driver.inputs;
        self.pending = [None; PADS];
        self.mixer = AudioMixer::new();
        log::debug!("Atari 5200 state restored at frame {}", self.frame_count);
        Ok(())
    }
}

impl Observable for Atari5200 {
    fn query(&self, path: &str) -> Option<Value> {
        if let Some(rest) = path.strip_prefix("cpu.") {
            self.cpu.query(rest)
        } else if let Some(rest) = path.strip_prefix("antic.") {
            self.bus.antic.query(rest)
        } else if let Some(rest) = path.strip_prefix("gtia.") {
            self.bus.gtia.query(rest)
        } else if let Some(rest) = path.strip_prefix("pokey.") {
            self.bus.pokey.query(rest)
        } else if let Some(rest) = path.strip_prefix("memory.") {
            let addr = if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix('$'))
            {
                u16::from_str_radix(hex, 16).ok()
            } else {
                rest.parse().ok()
            };
            addr.map(|a| Value::U8(self.bus.peek(a)))
        } else {
            match path {
                "frame_count" => Some(self.frame_count.into()),
                "cycles" => Some(self.cpu.cycles().into()),
                "pages" => Some(Value::List(
                    self.bus
                        .memory
                        .pages()
                        .into_iter()
                        .map(|p| p.map_or(Value::Text("none".into()), Value::U16))
                        .collect(),
                )),
                _ => None,
            }
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "cpu.<6502_paths>",
            "antic.<antic_paths>",
            "gtia.<gtia_paths>",
            "pokey.<pokey_paths>",
            "memory.<address>",
            "frame_count",
            "cycles",
            "pages",
        ]
    }
}
