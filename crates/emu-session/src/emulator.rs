//! Session lifecycle around one machine.

use std::fs;
use std::path::Path;

use emu_atari_5200::{Atari5200, Atari5200Config};
use emu_core::{InputState, Machine, Observable, StateReader, StateWriter, SystemKind, Value};
use emu_intellivision::{Intellivision, IntellivisionConfig};
use format_rip::{Bios, Hint, KnownCarts, LoadedProgram};

use crate::config::{Config, VideoStandard};
use crate::error::{EmulatorError, StateError};
use crate::roms::SystemRoms;
use crate::snapshot;

/// Where a session is in its lifecycle.
///
/// `Faulted` and `TornDown` are terminal: only `tear_down` leaves
/// `Faulted`, and nothing leaves `TornDown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Uninitialized,
    Loaded,
    Running,
    Paused,
    Faulted,
    TornDown,
}

/// One emulated frame.
#[derive(Debug)]
pub struct FrameOutput<'a> {
    /// ARGB32 pixels, row-major.
    pub pixels: &'a [u32],
    pub width: usize,
    pub height: usize,
    /// Mono samples at the configured host rate.
    pub audio: Vec<i16>,
    pub frame: u64,
}

const LIVE: [State; 3] = [State::Loaded, State::Running, State::Paused];

pub struct Emulator {
    config: Config,
    known: KnownCarts,
    roms: Option<SystemRoms>,
    state: State,
    machine: Option<Box<dyn Machine>>,
    title: Option<String>,
}

impl Emulator {
    /// Create an idle session. Reads the known-cartridge table if the
    /// configuration names one.
    pub fn new(config: Config) -> Result<Self, EmulatorError> {
        let known = match &config.known_carts_path {
            Some(path) => KnownCarts::from_file(path)?,
            None => KnownCarts::new(),
        };
        Ok(Self {
            config,
            known,
            roms: None,
            state: State::Uninitialized,
            machine: None,
            title: None,
        })
    }

    /// Replace the known-cartridge table.
    #[must_use]
    pub fn with_known_carts(mut self, known: KnownCarts) -> Self {
        self.known = known;
        self
    }

    /// Use these system ROMs instead of reading `bios_dir`.
    #[must_use]
    pub fn with_system_roms(mut self, roms: SystemRoms) -> Self {
        self.roms = Some(roms);
        self
    }

    #[must_use]
    pub fn state(&self) -> State {
        self.state
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn system(&self) -> Option<SystemKind> {
        self.machine.as_ref().map(|m| m.system())
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    #[must_use]
    pub fn machine(&self) -> Option<&dyn Machine> {
        self.machine.as_deref()
    }

    fn invalid(&self, action: &'static str) -> EmulatorError {
        EmulatorError::InvalidTransition {
            from: self.state,
            action,
        }
    }

    fn require(&self, allowed: &[State], action: &'static str) -> Result<(), EmulatorError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(self.invalid(action))
        }
    }

    fn live_machine(&self, action: &'static str) -> Result<&dyn Machine, EmulatorError> {
        self.require(&LIVE, action)?;
        self.machine.as_deref().ok_or_else(|| self.invalid(action))
    }

    fn live_machine_mut(&mut self, action: &'static str) -> Result<&mut dyn Machine, EmulatorError> {
        self.require(&LIVE, action)?;
        let from = self.state;
        match self.machine.as_deref_mut() {
            Some(machine) => Ok(machine),
            None => Err(EmulatorError::InvalidTransition { from, action }),
        }
    }

    /// Load a cartridge file. The extension picks the system for raw dumps.
    pub fn load_game(&mut self, path: &Path) -> Result<(), EmulatorError> {
        self.require(&[State::Uninitialized], "load a game")?;
        let program = format_rip::load_file(path, &self.known)?;
        self.install(&program)
    }

    /// Load a cartridge image already in memory.
    pub fn load_game_bytes(&mut self, bytes: &[u8], hint: &Hint) -> Result<(), EmulatorError> {
        self.require(&[State::Uninitialized], "load a game")?;
        let program = format_rip::load(bytes, hint, &self.known)?;
        self.install(&program)
    }

    fn install(&mut self, program: &LoadedProgram) -> Result<(), EmulatorError> {
        let machine = match &self.roms {
            Some(roms) => self.build(program, roms)?,
            None => {
                let roms = SystemRoms::from_dir(&self.config.bios_dir)?;
                self.build(program, &roms)?
            }
        };
        log::info!(
            "loaded {} for {:?}",
            program.title.as_deref().unwrap_or("untitled cartridge"),
            program.system
        );
        self.title.clone_from(&program.title);
        self.machine = Some(machine);
        self.state = State::Loaded;
        Ok(())
    }

    fn build(
        &self,
        program: &LoadedProgram,
        roms: &SystemRoms,
    ) -> Result<Box<dyn Machine>, EmulatorError> {
        let strict = self.config.verify_bios;
        let pal = self.config.video_standard == VideoStandard::Pal;
        match program.system {
            SystemKind::Intellivision => {
                let wants_ecs = self.config.ecs.unwrap_or(program.peripherals.ecs);
                let ecs_rom = if wants_ecs {
                    Some(roms.require(Bios::Ecs, strict)?)
                } else {
                    None
                };
                if pal {
                    log::warn!("Intellivision runs NTSC timing only");
                }
                let config = IntellivisionConfig {
                    exec: roms.require(Bios::Exec, strict)?,
                    grom: roms.require(Bios::Grom, strict)?,
                    ecs_rom,
                    voice_rom: roms.get(Bios::Intellivoice).map(<[u8]>::to_vec),
                    ecs: self.config.ecs,
                    intellivoice: self.config.intellivoice,
                    sample_rate: self.config.sample_rate,
                    latch_overrides: self.config.latch_overrides(),
                };
                Ok(Box::new(Intellivision::new(&config, program)?))
            }
            SystemKind::Atari5200 => {
                let config = Atari5200Config {
                    bios: roms.require(Bios::Atari5200, strict)?,
                    pal,
                    sample_rate: self.config.sample_rate,
                };
                Ok(Box::new(Atari5200::new(&config, program)?))
            }
        }
    }

    pub fn start(&mut self) -> Result<(), EmulatorError> {
        self.require(&[State::Loaded], "start")?;
        self.state = State::Running;
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), EmulatorError> {
        self.require(&[State::Running], "pause")?;
        self.state = State::Paused;
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), EmulatorError> {
        self.require(&[State::Paused], "resume")?;
        self.state = State::Running;
        Ok(())
    }

    /// Drop the machine. Valid from any state but `TornDown`.
    pub fn tear_down(&mut self) -> Result<(), EmulatorError> {
        if self.state == State::TornDown {
            return Err(self.invalid("tear down"));
        }
        self.machine = None;
        self.title = None;
        self.state = State::TornDown;
        log::debug!("session torn down");
        Ok(())
    }

    /// Run one frame. A core fault ends the session in `Faulted`.
    pub fn run_frame(&mut self) -> Result<FrameOutput<'_>, EmulatorError> {
        const ACTION: &str = "run a frame";
        self.require(&[State::Running], ACTION)?;
        let from = self.state;
        let Some(machine) = self.machine.as_deref_mut() else {
            return Err(EmulatorError::InvalidTransition {
                from,
                action: ACTION,
            });
        };
        if let Err(fault) = machine.run_frame() {
            self.state = State::Faulted;
            return Err(fault.into());
        }
        let audio = machine.take_audio();
        Ok(FrameOutput {
            pixels: machine.framebuffer(),
            width: machine.framebuffer_width(),
            height: machine.framebuffer_height(),
            audio,
            frame: machine.frame_count(),
        })
    }

    /// Input is held by the machine and applied at the next frame.
    pub fn set_input(&mut self, device: usize, input: InputState) -> Result<(), EmulatorError> {
        self.live_machine_mut("set input")?.set_input(device, input);
        Ok(())
    }

    pub fn reset(&mut self) -> Result<(), EmulatorError> {
        self.live_machine_mut("reset")?.reset();
        log::info!("machine reset");
        Ok(())
    }

    pub fn save_state_bytes(&self) -> Result<Vec<u8>, EmulatorError> {
        let machine = self.live_machine("save state")?;
        let mut writer = StateWriter::new();
        machine
            .save_state(&mut writer)
            .map_err(StateError::from)?;
        let blob = snapshot::encode(machine.system(), &writer.into_sections());
        log::debug!("saved state at frame {} ({} bytes)", machine.frame_count(), blob.len());
        Ok(blob)
    }

    /// Restore a blob made by [`Self::save_state_bytes`]. The machine is
    /// untouched when the blob is rejected.
    pub fn load_state_bytes(&mut self, blob: &[u8]) -> Result<(), EmulatorError> {
        let machine = self.live_machine_mut("load state")?;
        let (system, sections) = snapshot::decode(blob)?;
        if system != machine.system() {
            return Err(StateError::SystemMismatch {
                expected: machine.system(),
                found: system,
            }
            .into());
        }
        let mut reader = StateReader::new(sections);
        machine
            .load_state(&mut reader)
            .map_err(StateError::from)?;
        log::debug!("restored state at frame {}", machine.frame_count());
        Ok(())
    }

    pub fn save_state(&self, path: &Path) -> Result<(), EmulatorError> {
        let blob = self.save_state_bytes()?;
        fs::write(path, blob).map_err(StateError::Io)?;
        Ok(())
    }

    pub fn load_state(&mut self, path: &Path) -> Result<(), EmulatorError> {
        self.live_machine("load state")?;
        let blob = fs::read(path).map_err(StateError::Io)?;
        self.load_state_bytes(&blob)
    }

    /// Observable lookup on the loaded machine, e.g. `cpu.pc`.
    #[must_use]
    pub fn query(&self, path: &str) -> Option<Value> {
        self.machine.as_ref()?.query(path)
    }
}
