//! General Instrument AY-3-8914 Programmable Sound Generator.
//!
//! The 8914 is the 8910 with a shuffled register file and a two-bit
//! envelope mode per channel. Three square-wave tone generators, a shared
//! noise generator and a shared envelope generator feed one mono output.
//! The two I/O ports read the Intellivision hand controllers.
//!
//! # Register map (`$01F0-$01FF`)
//!
//! | Reg | Name              | Bits |
//! |-----|-------------------|------|
//! | R0  | A period low      | 7-0  |
//! | R1  | B period low      | 7-0  |
//! | R2  | C period low      | 7-0  |
//! | R3  | Envelope low      | 7-0  |
//! | R4  | A period high     | 3-0  |
//! | R5  | B period high     | 3-0  |
//! | R6  | C period high     | 3-0  |
//! | R7  | Envelope high     | 7-0  |
//! | R8  | Enables (active low: tone 2-0, noise 5-3, port dir 7-6) | 7-0 |
//! | R9  | Noise period      | 4-0  |
//! | R10 | Envelope shape    | 3-0  |
//! | R11 | A volume / mode   | 5-0  |
//! | R12 | B volume / mode   | 5-0  |
//! | R13 | C volume / mode   | 5-0  |
//! | R14 | Port A            | 7-0  |
//! | R15 | Port B            | 7-0  |
//!
//! Volume bits 5-4 select the source: `00` fixed, `01` envelope,
//! `10` envelope / 2, `11` envelope / 4.

#![allow(clippy::cast_possible_truncation)]

use emu_core::{AudioOutputLine, ClockDivider, Observable, Value};
use serde::{Deserialize, Serialize};

/// Read-back mask per register. Unused bits read as 0.
const REG_MASK: [u8; 16] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0x0F, 0x0F, 0x0F, 0xFF, 0xFF, 0x1F, 0x0F, 0x3F, 0x3F, 0x3F, 0xFF, 0xFF,
];

/// Logarithmic DAC levels, scaled so three channels fit in `i16`.
const VOLUME_TABLE: [i32; 16] = [
    0, 112, 168, 238, 346, 506, 694, 1121, 1385, 2168, 2889, 3685, 4722, 5945, 7224, 8191,
];

/// Square wave with a 12-bit period.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ToneGenerator {
    period: u16,
    counter: u16,
    output: bool,
}

impl ToneGenerator {
    fn clock(&mut self) {
        self.counter = self.counter.saturating_sub(1);
        if self.counter == 0 {
            self.counter = self.period.max(1);
            self.output = !self.output;
        }
    }
}

/// 17-bit LFSR with a 5-bit period. The counter runs at half the tone
/// rate, so the register shifts once every `2 * period` ticks.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct NoiseGenerator {
    period: u8,
    counter: u8,
    prescale: bool,
    lfsr: u32,
    output: bool,
}

impl Default for NoiseGenerator {
    fn default() -> Self {
        Self {
            period: 0,
            counter: 0,
            prescale: false,
            lfsr: 1,
            output: false,
        }
    }
}

impl NoiseGenerator {
    fn clock(&mut self) {
        self.prescale = !self.prescale;
        if self.prescale {
            return;
        }
        self.counter = self.counter.saturating_sub(1);
        if self.counter == 0 {
            self.counter = self.period.max(1);
            let feedback = ((self.lfsr ^ (self.lfsr >> 3)) & 1) ^ 1;
            self.lfsr = (self.lfsr >> 1) | (feedback << 16);
            self.output = self.lfsr & 1 != 0;
        }
    }
}

/// 16-step envelope with a 16-bit period and the continue/attack/
/// alternate/hold shape bits.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct EnvelopeGenerator {
    period: u16,
    counter: u16,
    step: u8,
    holding: bool,
    attack: bool,
    shape: u8,
}

impl EnvelopeGenerator {
    fn clock(&mut self) {
        if self.holding {
            return;
        }
        self.counter = self.counter.saturating_sub(1);
        if self.counter == 0 {
            self.counter = self.period.max(1);
            self.step_envelope();
        }
    }

    fn step_envelope(&mut self) {
        self.step += 1;
        if self.step < 16 {
            return;
        }

        let cont = self.shape & 0x08 != 0;
        let alt = self.shape & 0x02 != 0;
        let hold = self.shape & 0x01 != 0;

        if !cont {
            self.holding = true;
            self.step = 15;
            self.attack = false;
        } else if hold {
            self.holding = true;
            self.step = 15;
            if alt {
                self.attack = !self.attack;
            }
        } else {
            if alt {
                self.attack = !self.attack;
            }
            self.step = 0;
        }
    }

    /// Restart with a new shape (writing R10).
    fn restart(&mut self, shape: u8) {
        self.shape = shape & 0x0F;
        self.step = 0;
        self.counter = self.period.max(1);
        self.holding = false;
        self.attack = shape & 0x04 != 0;
    }

    /// Current level, 0-15.
    fn level(&self) -> u8 {
        if self.attack { self.step } else { 15 - self.step }
    }
}

/// The two 8-bit I/O ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Port {
    A,
    B,
}

/// AY-3-8914 Programmable Sound Generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ay3_8914 {
    regs: [u8; 16],
    tone: [ToneGenerator; 3],
    noise: NoiseGenerator,
    envelope: EnvelopeGenerator,
    /// Envelope runs at half the tone rate.
    envelope_phase: bool,
    /// Values driven onto the ports from outside (controllers, keyboard).
    port_input: [u8; 2],
    divider: ClockDivider,
    output: AudioOutputLine,
}

impl Ay3_8914 {
    /// `cpu_hz` is the rate `advance` is called in, `chip_hz` the PSG input
    /// clock and `host_hz` the output sample rate.
    #[must_use]
    pub fn new(cpu_hz: u64, chip_hz: u64, host_hz: u64) -> Self {
        let tick_hz = chip_hz / 8;
        Self {
            regs: [0; 16],
            tone: Default::default(),
            noise: NoiseGenerator::default(),
            envelope: EnvelopeGenerator::default(),
            envelope_phase: false,
            port_input: [0xFF; 2],
            divider: ClockDivider::new(cpu_hz, tick_hz),
            output: AudioOutputLine::new(tick_hz, host_hz),
        }
    }

    pub fn reset(&mut self) {
        self.regs = [0; 16];
        self.tone = Default::default();
        self.noise = NoiseGenerator::default();
        self.envelope = EnvelopeGenerator::default();
        self.envelope_phase = false;
        self.output.clear();
    }

    /// Drive an input port. Ports are active-low: idle lines read `0xFF`.
    pub fn set_port_input(&mut self, port: Port, value: u8) {
        self.port_input[port as usize] = value;
    }

    #[must_use]
    pub fn read(&self, reg: u16) -> u16 {
        let reg = usize::from(reg & 0x0F);
        let value = match reg {
            14 if self.regs[8] & 0x40 == 0 => self.port_input[0],
            15 if self.regs[8] & 0x80 == 0 => self.port_input[1],
            _ => self.regs[reg],
        };
        u16::from(value & REG_MASK[reg])
    }

    pub fn write(&mut self, reg: u16, value: u16) {
        let reg = usize::from(reg & 0x0F);
        let value = (value as u8) & REG_MASK[reg];
        self.regs[reg] = value;

        match reg {
            0..=2 | 4..=6 => {
                let ch = reg % 4;
                self.tone[ch].period =
                    u16::from(self.regs[ch]) | (u16::from(self.regs[ch + 4]) << 8);
            }
            3 | 7 => {
                self.envelope.period = u16::from(self.regs[3]) | (u16::from(self.regs[7]) << 8);
            }
            9 => self.noise.period = value,
            10 => self.envelope.restart(value),
            _ => {}
        }
    }

    /// Advance by `cycles` CPU cycles.
    pub fn advance(&mut self, cycles: u64) {
        for _ in 0..self.divider.advance(cycles) {
            self.tick();
        }
    }

    fn tick(&mut self) {
        for tone in &mut self.tone {
            tone.clock();
        }
        self.noise.clock();
        self.envelope_phase = !self.envelope_phase;
        if !self.envelope_phase {
            self.envelope.clock();
        }
        let sample = self.mix();
        self.output.push(sample);
    }

    fn mix(&self) -> i16 {
        let enables = self.regs[8];
        let mut sum = 0i32;
        for ch in 0..3 {
            let tone_on = self.tone[ch].output || enables & (1 << ch) != 0;
            let noise_on = self.noise.output || enables & (1 << (ch + 3)) != 0;

            let vol = self.regs[11 + ch];
            let level = match vol >> 4 {
                0 => vol & 0x0F,
                mode => self.envelope.level() >> (mode - 1),
            };
            let amplitude = VOLUME_TABLE[usize::from(level)];
            // Centre each channel around zero.
            sum += if tone_on && noise_on {
                amplitude / 2
            } else {
                -amplitude / 2
            };
        }
        sum as i16
    }

    /// The resampled output, for the mixer.
    pub fn output_mut(&mut self) -> &mut AudioOutputLine {
        &mut self.output
    }

    /// Tone period of channel `ch` (0-2).
    #[must_use]
    pub fn tone_period(&self, ch: usize) -> u16 {
        self.tone[ch].period
    }

    #[must_use]
    pub fn envelope_period(&self) -> u16 {
        self.envelope.period
    }
}

impl Observable for Ay3_8914 {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "tone_a.period" => Some(self.tone[0].period.into()),
            "tone_b.period" => Some(self.tone[1].period.into()),
            "tone_c.period" => Some(self.tone[2].period.into()),
            "noise.period" => Some(self.noise.period.into()),
            "envelope.period" => Some(self.envelope.period.into()),
            "envelope.shape" => Some(self.envelope.shape.into()),
            "envelope.level" => Some(self.envelope.level().into()),
            "enables" => Some(self.regs[8].into()),
            "registers" => Some(Value::List(self.regs.iter().map(|&r| r.into()).collect())),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "tone_a.period",
            "tone_b.period",
            "tone_c.period",
            "noise.period",
            "envelope.period",
            "envelope.shape",
            "envelope.level",
            "enables",
            "registers",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CPU_HZ: u64 = 894_886;
    const PSG_HZ: u64 = 1_789_773;
    const HOST_HZ: u64 = 48_000;

    fn psg() -> Ay3_8914 {
        Ay3_8914::new(CPU_HZ, PSG_HZ, HOST_HZ)
    }

    fn run(psg: &mut Ay3_8914, cycles: u64) -> Vec<i16> {
        psg.advance(cycles);
        let out = psg.output_mut();
        let samples = out.samples().to_vec();
        out.consume(samples.len());
        samples
    }

    #[test]
    fn read_back_masks_unused_bits() {
        let mut psg = psg();
        let cases = [
            (0, 0xFF),
            (4, 0x0F),
            (7, 0xFF),
            (9, 0x1F),
            (10, 0x0F),
            (11, 0x3F),
        ];
        for (reg, expected) in cases {
            psg.write(reg, 0xFFFF);
            assert_eq!(psg.read(reg), expected, "R{reg}");
        }
    }

    #[test]
    fn periods_combine_low_and_high() {
        let mut psg = psg();
        psg.write(1, 0x34);
        psg.write(5, 0x12);
        assert_eq!(psg.tone_period(1), 0x234);
        psg.write(3, 0xCD);
        psg.write(7, 0xAB);
        assert_eq!(psg.envelope_period(), 0xABCD);
    }

    #[test]
    fn ports_read_input_when_direction_is_input() {
        let mut psg = psg();
        psg.set_port_input(Port::A, 0x7E);
        psg.set_port_input(Port::B, 0x3C);
        assert_eq!(psg.read(14), 0x7E);
        assert_eq!(psg.read(15), 0x3C);

        psg.write(8, 0x40);
        psg.write(14, 0x55);
        assert_eq!(psg.read(14), 0x55);
    }

    #[test]
    fn produces_host_rate_samples() {
        let mut psg = psg();
        let samples = run(&mut psg, CPU_HZ / 10);
        assert!((4_799..=4_801).contains(&samples.len()));
    }

    #[test]
    fn tone_produces_square_wave() {
        let mut psg = psg();
        psg.write(0, 200);
        psg.write(8, 0x3E);
        psg.write(11, 0x0F);
        let samples = run(&mut psg, CPU_HZ / 20);
        assert!(samples.iter().any(|&s| s > 3000));
        assert!(samples.iter().any(|&s| s < -3000));
    }

    #[test]
    fn tone_frequency_follows_period() {
        for period in [50u16, 200, 1000] {
            let mut psg = psg();
            psg.write(0, period & 0xFF);
            psg.write(4, period >> 8);
            psg.write(8, 0x3E);
            psg.write(11, 0x0F);
            let samples = run(&mut psg, CPU_HZ);
            let crossings = samples
                .windows(2)
                .filter(|w| (w[0] < 0) != (w[1] < 0))
                .count();
            let measured = crossings as f64 / 2.0;
            let expected = PSG_HZ as f64 / (16.0 * f64::from(period));
            assert!(
                (measured - expected).abs() < 2.0,
                "period {period}: {measured} Hz, expected {expected:.1} Hz"
            );
        }
    }

    #[test]
    fn noise_shifts_once_per_two_periods() {
        for (period, expected) in [(1u16, 400), (4, 100), (31, 13)] {
            let mut psg = psg();
            psg.write(9, period);
            let mut last = psg.noise.lfsr;
            let mut shifts = 0;
            for _ in 0..800 {
                psg.tick();
                if psg.noise.lfsr != last {
                    shifts += 1;
                    last = psg.noise.lfsr;
                }
            }
            assert_eq!(shifts, expected, "period {period}");
        }
    }

    #[test]
    fn silent_channels_hold_level() {
        let mut psg = psg();
        psg.write(8, 0x3F);
        let samples = run(&mut psg, CPU_HZ / 50);
        assert!(samples.iter().all(|&s| s == 0));
    }

    #[test]
    fn envelope_mode_scales_level() {
        let mut psg = psg();
        psg.write(10, 0x0D); // continue + attack + hold: ramps up then holds at 15
        psg.write(3, 1);
        psg.run_envelope_to_hold();
        psg.write(8, 0x3F);
        psg.write(11, 0x10);
        assert_eq!(psg.mix(), (VOLUME_TABLE[15] / 2) as i16);
        psg.write(11, 0x20);
        assert_eq!(psg.mix(), (VOLUME_TABLE[7] / 2) as i16);
        psg.write(11, 0x30);
        assert_eq!(psg.mix(), (VOLUME_TABLE[3] / 2) as i16);
    }

    #[test]
    fn one_shot_decay_ends_silent() {
        let mut psg = psg();
        psg.write(10, 0x00);
        psg.write(3, 1);
        psg.run_envelope_to_hold();
        assert_eq!(psg.envelope.level(), 0);
    }

    #[test]
    fn noise_is_deterministic() {
        let mut a = psg();
        let mut b = psg();
        for p in [&mut a, &mut b] {
            p.write(9, 7);
            p.write(8, 0x37);
            p.write(11, 0x0F);
        }
        assert_eq!(run(&mut a, 20_000), run(&mut b, 20_000));
    }

    impl Ay3_8914 {
        fn run_envelope_to_hold(&mut self) {
            for _ in 0..64 {
                self.tick();
            }
            assert!(self.envelope.holding);
        }
    }
}
