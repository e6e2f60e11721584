//! General Instrument SP0256-AL2 speech processor, as fitted in the
//! Intellivoice.
//!
//! The CPU writes an allophone address (ALD) to `$0080`; the chip speaks
//! it at 10 kHz through a six-stage resonator cascade driven by a pitch
//! pulse train, noise, or both. Reading `$0080` returns LRQ in bit 15
//! (set while a segment is playing). Writing `$0081` with bit 10 set
//! resets the chip.
//!
//! A new ALD cuts off the segment in progress.

#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]

mod allophones;
mod filter;

pub use allophones::{ALLOPHONES, Allophone, Excitation};

use emu_core::{AudioOutputLine, ClockDivider, Observable, Value};
use serde::{Deserialize, Serialize};

use crate::filter::Cascade;

/// Synthesis rate in Hz.
pub const SAMPLE_RATE: u32 = 10_000;

/// Pitch period in samples (about 120 Hz).
const PITCH_PERIOD: u32 = 83;
/// Samples spent ramping amplitude in and out.
const RAMP: u32 = 50;
/// Fraction of a stop spent in closure, out of 8.
const CLOSURE_EIGHTHS: u32 = 5;
const OUTPUT_GAIN: f64 = 6000.0;

/// The allophone currently being spoken.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Segment {
    index: u8,
    position: u32,
    length: u32,
}

/// SP0256-AL2 speech processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sp0256 {
    segment: Option<Segment>,
    filter: Cascade,
    pitch_phase: u32,
    lfsr: u32,
    has_rom: bool,
    divider: ClockDivider,
    output: AudioOutputLine,
}

impl Sp0256 {
    #[must_use]
    pub fn new(cpu_hz: u64, host_hz: u64) -> Self {
        Self {
            segment: None,
            filter: Cascade::new(),
            pitch_phase: 0,
            lfsr: 1,
            has_rom: false,
            divider: ClockDivider::new(cpu_hz, u64::from(SAMPLE_RATE)),
            output: AudioOutputLine::new(u64::from(SAMPLE_RATE), host_hz),
        }
    }

    /// Accept an external allophone ROM image. Only its presence is
    /// recorded; synthesis always uses the built-in tables.
    pub fn attach_rom(&mut self, image: &[u8]) {
        self.has_rom = !image.is_empty();
        log::debug!("SP0256: allophone ROM attached ({} bytes)", image.len());
    }

    #[must_use]
    pub fn has_rom(&self) -> bool {
        self.has_rom
    }

    pub fn reset(&mut self) {
        self.segment = None;
        self.filter = Cascade::new();
        self.pitch_phase = 0;
        self.lfsr = 1;
        self.output.clear();
    }

    #[must_use]
    pub fn speaking(&self) -> bool {
        self.segment.is_some()
    }

    /// Read from `$0080` + `offset`.
    #[must_use]
    pub fn read(&self, offset: u16) -> u16 {
        match offset & 1 {
            0 if self.speaking() => 0x8000,
            _ => 0x0000,
        }
    }

    /// Write to `$0080` + `offset`.
    pub fn write(&mut self, offset: u16, value: u16) {
        if offset & 1 == 0 {
            self.load_allophone(value as u8 & 0x3F);
        } else if value & 0x0400 != 0 {
            self.reset();
        }
    }

    fn load_allophone(&mut self, index: u8) {
        let allophone = &ALLOPHONES[usize::from(index)];
        log::trace!("SP0256: ALD {index:#04X} {}", allophone.name);
        self.segment = Some(Segment {
            index,
            position: 0,
            length: u32::from(allophone.duration_ms) * SAMPLE_RATE / 1000,
        });
        self.pitch_phase = 0;
        self.filter.tune(allophone.start);
    }

    /// Advance by `cycles` CPU cycles.
    pub fn advance(&mut self, cycles: u64) {
        for _ in 0..self.divider.advance(cycles) {
            let sample = self.synthesize();
            self.output.push(sample);
        }
    }

    fn synthesize(&mut self) -> i16 {
        let Some(seg) = &mut self.segment else {
            return 0;
        };
        let allophone = &ALLOPHONES[usize::from(seg.index)];
        let position = seg.position;
        let length = seg.length.max(1);
        seg.position += 1;
        if seg.position >= seg.length {
            self.segment = None;
        }

        // Retune once per millisecond.
        if position % 10 == 0 {
            let mut formants = [0; 3];
            for (i, f) in formants.iter_mut().enumerate() {
                let start = i64::from(allophone.start[i]);
                let end = i64::from(allophone.end[i]);
                *f = (start + (end - start) * i64::from(position) / i64::from(length)) as u16;
            }
            self.filter.tune(formants);
        }

        let voiced = self.pulse();
        let noise = self.noise();
        let excitation = match allophone.excitation {
            Excitation::Silence => 0.0,
            Excitation::Voiced => voiced,
            Excitation::Noise => noise * 0.5,
            Excitation::Mixed => voiced * 0.6 + noise * 0.3,
            Excitation::Stop(voiced_stop) => {
                if position * 8 < length * CLOSURE_EIGHTHS {
                    0.0
                } else if voiced_stop {
                    voiced * 0.6 + noise * 0.4
                } else {
                    noise * 0.6
                }
            }
        };

        let ramp = position.min(length - 1 - position.min(length - 1)).min(RAMP);
        let gain = f64::from(ramp) / f64::from(RAMP);
        let y = self.filter.process(excitation * gain) * OUTPUT_GAIN;
        y.clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16
    }

    fn pulse(&mut self) -> f64 {
        let phase = self.pitch_phase;
        self.pitch_phase = (self.pitch_phase + 1) % PITCH_PERIOD;
        if phase == 0 { 8.0 } else { -8.0 / f64::from(PITCH_PERIOD - 1) }
    }

    fn noise(&mut self) -> f64 {
        let bit = (self.lfsr ^ (self.lfsr >> 3)) & 1;
        self.lfsr = (self.lfsr >> 1) | (bit << 16);
        if self.lfsr & 1 != 0 { 1.0 } else { -1.0 }
    }

    pub fn output_mut(&mut self) -> &mut AudioOutputLine {
        &mut self.output
    }
}

impl Observable for Sp0256 {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "speaking" => Some(self.speaking().into()),
            "allophone" => Some(
                self.segment
                    .as_ref()
                    .map_or("", |s| ALLOPHONES[usize::from(s.index)].name)
                    .into(),
            ),
            "remaining" => Some(Value::U32(
                self.segment
                    .as_ref()
                    .map_or(0, |s| s.length - s.position),
            )),
            "rom" => Some(self.has_rom.into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &["speaking", "allophone", "remaining", "rom"]
    }
}
