//! Top-level Intellivision system.
//!
//! Colour burst 3.579545 MHz. The CP1610 runs at a quarter of it
//! (894,886 Hz) and the PSGs at half. A frame is one STIC frame,
//! 14,934 CPU cycles.

use emu_core::{
    AudioMixer, AudioOutputLine, CoreFault, Cpu, InputState, Machine, Observable, ProcessorBus,
    Ram, Rom, SnapshotError, StateReader, StateWriter, SystemKind, Value,
};
use format_rip::LoadedProgram;
use gi_ay_3_8900::{FB_HEIGHT, FB_WIDTH, Stic};
use gi_ay_3_8914::{Ay3_8914, Port};
use gi_cp1610::Cp1610;
use gi_sp0256::Sp0256;
use serde::{Deserialize, Serialize};

use crate::bus::{Ecs, IntvBus, MemoryState};
use crate::config::IntellivisionConfig;
use crate::input::{Keyboard, controller_code};

pub const CPU_HZ: u64 = 894_886;
pub const PSG_HZ: u64 = 1_789_772;

/// Input devices, as numbered for [`Machine::set_input`].
pub const LEFT_CONTROLLER: usize = 0;
pub const RIGHT_CONTROLLER: usize = 1;
pub const ECS_KEYBOARD: usize = 2;
const DEVICES: usize = 3;

#[derive(Serialize, Deserialize)]
struct AudioState {
    psg: Ay3_8914,
    ecs_psg: Option<Ay3_8914>,
}

#[derive(Serialize, Deserialize)]
struct PeripheralState {
    processor: ProcessorBus,
    voice: Option<Sp0256>,
    keyboard: Option<Keyboard>,
}

#[derive(Serialize, Deserialize)]
struct DriverState {
    frame_count: u64,
    inputs: [InputState; DEVICES],
}

fn words(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect()
}

/// Mattel Intellivision with optional ECS and Intellivoice.
pub struct Intellivision {
    cpu: Cp1610,
    bus: IntvBus,
    mixer: AudioMixer,
    /// Input received since the last frame started.
    pending: [Option<InputState>; DEVICES],
    inputs: [InputState; DEVICES],
    frame_count: u64,
}

impl Intellivision {
    /// Wire a machine around `program`.
    ///
    /// # Errors
    ///
    /// Fails if the cartridge is for another system, if it needs the ECS
    /// and no ECS ROM is configured, or if its segments collide with
    /// system memory.
    pub fn new(config: &IntellivisionConfig, program: &LoadedProgram) -> Result<Self, CoreFault> {
        if program.system != SystemKind::Intellivision {
            return Err(CoreFault::BusConfiguration(format!(
                "{:?} cartridge in an Intellivision",
                program.system
            )));
        }
        let host_hz = u64::from(config.sample_rate);

        let mut stic = Stic::new();
        stic.load_grom(&config.grom);
        for &(group, policy) in &config.latch_overrides {
            stic.set_latch_policy(group, policy);
        }

        let ecs = if config.ecs.unwrap_or(program.peripherals.ecs) {
            let rom = config.ecs_rom.as_deref().ok_or_else(|| {
                CoreFault::BusConfiguration("ECS attached without an ECS ROM".into())
            })?;
            Some((
                Ecs {
                    psg: Ay3_8914::new(CPU_HZ, PSG_HZ, host_hz),
                    ram: Ram::new(0x800, 8),
                    keyboard: Keyboard::default(),
                },
                Rom::new(words(rom)),
            ))
        } else {
            None
        };

        let voice = config
            .intellivoice
            .unwrap_or(program.peripherals.intellivoice)
            .then(|| {
                let mut voice = Sp0256::new(CPU_HZ, host_hz);
                if let Some(rom) = &config.voice_rom {
                    voice.attach_rom(rom);
                }
                voice
            });

        let bus = IntvBus::new(
            Rom::new(words(&config.exec)),
            stic,
            Ay3_8914::new(CPU_HZ, PSG_HZ, host_hz),
            ecs,
            voice,
            program,
        )?;
        log::info!(
            "Intellivision: {} (ECS {}, Intellivoice {})",
            program.title.as_deref().unwrap_or("untitled"),
            bus.ecs.is_some(),
            bus.voice.is_some()
        );

        Ok(Self {
            cpu: Cp1610::new(),
            bus,
            mixer: AudioMixer::new(),
            pending: [None; DEVICES],
            inputs: [InputState::default(); DEVICES],
            frame_count: 0,
        })
    }

    #[must_use]
    pub fn cpu(&self) -> &Cp1610 {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cp1610 {
        &mut self.cpu
    }

    #[must_use]
    pub fn bus(&self) -> &IntvBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut IntvBus {
        &mut self.bus
    }

    fn apply_input(&mut self) {
        for (slot, current) in self.pending.iter_mut().zip(&mut self.inputs) {
            if let Some(state) = slot.take() {
                *current = state;
            }
        }
        // Ports idle high; a pressed line pulls low.
        let left = controller_code(&self.inputs[LEFT_CONTROLLER]);
        let right = controller_code(&self.inputs[RIGHT_CONTROLLER]);
        self.bus.psg.set_port_input(Port::B, !left);
        self.bus.psg.set_port_input(Port::A, !right);
        if let Some(ecs) = &mut self.bus.ecs {
            ecs.keyboard.set(&self.inputs[ECS_KEYBOARD]);
        }
    }

    fn mix_audio(&mut self) {
        let bus = &mut self.bus;
        let mut lines: Vec<&mut AudioOutputLine> = vec![bus.psg.output_mut()];
        if let Some(ecs) = &mut bus.ecs {
            lines.push(ecs.psg.output_mut());
        }
        if let Some(voice) = &mut bus.voice {
            lines.push(voice.output_mut());
        }
        self.mixer.mix(&mut lines);
    }
}

impl Machine for Intellivision {
    fn system(&self) -> SystemKind {
        SystemKind::Intellivision
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
                    log::error!("CP1610 fault: {fault}");
                })?;
                self.bus.advance(u64::from(cycles));
            }
            if self.bus.stic.take_frame_ready() {
                break;
            }
        }
        self.frame_count += 1;
        self.mix_audio();
        Ok(())
    }

    fn reset(&mut self) {
        self.cpu.reset();
        self.bus.reset();
        self.mixer = AudioMixer::new();
        self.pending = [None; DEVICES];
    }

    fn framebuffer(&self) -> &[u32] {
        self.bus.stic.framebuffer()
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
            None => log::warn!("Intellivision has no input device {device}"),
        }
    }

    fn frame_count(&self) -> u64 {
        self.frame_count
    }

    fn save_state(&self, out: &mut StateWriter) -> Result<(), SnapshotError> {
        out.section(&self.cpu)?;
        out.section(&self.bus.memory_state())?;
        out.section(&self.bus.stic)?;
        out.section(&AudioState {
            psg: self.bus.psg.clone(),
            ecs_psg: self.bus.ecs.as_ref().map(|e| e.psg.clone()),
        })?;
        out.section(&PeripheralState {
            processor: self.bus.processor.clone(),
            voice: self.bus.voice.clone(),
            keyboard: self.bus.ecs.as_ref().map(|e| e.keyboard),
        })?;
        out.section(&DriverState {
            frame_count: self.frame_count,
            inputs: self.inputs,
        })?;
        log::debug!("Intellivision state saved at frame {}", self.frame_count);
        Ok(())
    }

    fn load_state(&mut self, input: &mut StateReader<'_>) -> Result<(), SnapshotError> {
        let cpu: Cp1610 = input.section()?;
        let memory: MemoryState = input.section()?;
        let stic: Stic = input.section()?;
        let audio: AudioState = input.section()?;
        let peripherals: PeripheralState = input.section()?;
        let driver: DriverState = input.section()?;

        if audio.ecs_psg.is_some() != self.bus.ecs.is_some()
            || peripherals.voice.is_some() != self.bus.voice.is_some()
        {
            return Err(SnapshotError::Mismatch(
                "ECS or Intellivoice configuration differs".into(),
            ));
        }
        self.bus
            .restore_memory(memory)
            .map_err(SnapshotError::Mismatch)?;

        self.cpu = cpu;
        self.bus.stic.restore(stic);
        self.bus.psg = audio.psg;
        if let (Some(ecs), Some(psg)) = (&mut self.bus.ecs, audio.ecs_psg) {
            ecs.psg = psg;
            ecs.keyboard = peripherals.keyboard.unwrap_or_default();
        }
        self.bus.voice = peripherals.voice;
        self.bus.processor = peripherals.processor;
        self.frame_count = driver.frame_count;
        self.inputs = driver.inputs;
        self.pending = [None; DEVICES];
        self.mixer = AudioMixer::new();
        log::debug!("Intellivision state restored at frame {}", self.frame_count);
        Ok(())
    }
}

impl Observable for Intellivision {
    fn query(&self, path: &str) -> Option<Value> {
        if let Some(rest) = path.strip_prefix("cpu.") {
            self.cpu.query(rest)
        } else if let Some(rest) = path.strip_prefix("stic.") {
            self.bus.stic.query(rest)
        } else if let Some(rest) = path.strip_prefix("psg.") {
            self.bus.psg.query(rest)
        } else if let Some(rest) = path.strip_prefix("ecs_psg.") {
            self.bus.ecs.as_ref()?.psg.query(rest)
        } else if let Some(rest) = path.strip_prefix("voice.") {
            self.bus.voice.as_ref()?.query(rest)
        } else if let Some(rest) = path.strip_prefix("memory.") {
            let addr = if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix('$'))
            {
                u16::from_str_radix(hex, 16).ok()
            } else {
                rest.parse().ok()
            };
            addr.map(|a| Value::U16(self.bus.peek(a)))
        } else {
            match path {
                "frame_count" => Some(self.frame_count.into()),
                "cycles" => Some(self.cpu.cycles().into()),
                "ecs" => Some(self.bus.ecs.is_some().into()),
                "intellivoice" => Some(self.bus.voice.is_some().into()),
                _ => None,
            }
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "cpu.<cp1610_paths>",
            "stic.<stic_paths>",
            "psg.<psg_paths>",
            "ecs_psg.<psg_paths>",
            "voice.<sp0256_paths>",
            "memory.<address>",
            "frame_count",
            "cycles",
            "ecs",
            "intellivoice",
        ]
    }
}
