//! Atari POKEY (C012294): four audio channels, polynomial noise, timers,
//! keypad scanning and paddle (pot) counters.
//!
//! # Register map (16 registers, mirrored)
//!
//! | Reg | Write    | Read    |
//! |-----|----------|---------|
//! | $00-$07 | AUDF1/AUDC1 .. AUDF4/AUDC4 | POT0-POT7 |
//! | $08 | AUDCTL   | ALLPOT  |
//! | $09 | STIMER   | KBCODE  |
//! | $0A | SKRES    | RANDOM  |
//! | $0B | POTGO    | -       |
//! | $0D | SEROUT   | SERIN   |
//! | $0E | IRQEN    | IRQST   |
//! | $0F | SKCTL    | SKSTAT  |
//!
//! # AUDCTL
//!
//! | Bit | Meaning |
//! |-----|---------|
//! | 7 | 9-bit poly instead of 17-bit |
//! | 6 | Channel 1 clocked at 1.79 MHz |
//! | 5 | Channel 3 clocked at 1.79 MHz |
//! | 4 | Join channels 1+2 (16-bit) |
//! | 3 | Join channels 3+4 (16-bit) |
//! | 2 | High-pass channel 1 by channel 3 |
//! | 1 | High-pass channel 2 by channel 4 |
//! | 0 | 15 kHz base clock instead of 64 kHz |

#![allow(clippy::cast_possible_truncation)]

mod poly;

use emu_core::{AudioOutputLine, IrqSource, Observable, ProcessorBus, Value};
use serde::{Deserialize, Serialize};

use crate::poly::Polys;

/// Interrupt source POKEY drives on the processor's IRQ line.
pub const POKEY_IRQ: IrqSource = IrqSource(1);

/// Machine cycles per pot counter step (one scanline).
pub const POT_STEP_CYCLES: u32 = 114;
/// Highest pot count.
pub const POT_MAX: u8 = 228;

const BASE_64K: u32 = 28;
const BASE_15K: u32 = 114;

/// Output scale per volume step; four channels at 15 stay inside `i16`.
const VOLUME_SCALE: i32 = 511;

// IRQEN / IRQST bits
const IRQ_TIMER1: u8 = 0x01;
const IRQ_TIMER2: u8 = 0x02;
const IRQ_TIMER4: u8 = 0x04;
const IRQ_KEY: u8 = 0x40;
const IRQ_BREAK: u8 = 0x80;

/// Atari POKEY.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pokey {
    audf: [u8; 4],
    audc: [u8; 4],
    audctl: u8,
    counter: [u32; 4],
    output: [bool; 4],
    /// High-pass flip-flops for channels 1 and 2.
    high_pass: [bool; 2],
    base_counter: u32,
    polys: Polys,

    irqen: u8,
    irq_pending: u8,
    skctl: u8,

    // Keypad
    kbcode: u8,
    key_down: bool,
    top_button: bool,

    // Pots
    pot_input: [u8; 8],
    pot_count: u8,
    pot_cycles: u32,
    allpot: u8,

    audio: AudioOutputLine,
}

impl Pokey {
    /// `cpu_hz` is the machine clock POKEY runs from.
    #[must_use]
    pub fn new(cpu_hz: u64, host_hz: u64) -> Self {
        Self {
            audf: [0; 4],
            audc: [0; 4],
            audctl: 0,
            counter: [1; 4],
            output: [false; 4],
            high_pass: [false; 2],
            base_counter: BASE_64K,
            polys: Polys::default(),
            irqen: 0,
            irq_pending: 0,
            skctl: 0,
            kbcode: 0xFF,
            key_down: false,
            top_button: false,
            pot_input: [POT_MAX / 2; 8],
            pot_count: 0,
            pot_cycles: 0,
            allpot: 0,
            audio: AudioOutputLine::new(cpu_hz, host_hz),
        }
    }

    pub fn reset(&mut self) {
        let pots = self.pot_input;
        let mut audio = self.audio.clone();
        audio.clear();
        *self = Self {
            pot_input: pots,
            audio,
            ..Self::new(1, 1)
        };
    }

    // Register file

    pub fn read(&mut self, addr: u16) -> u8 {
        match addr & 0x0F {
            reg @ 0x00..=0x07 => {
                let pot = usize::from(reg);
                if self.allpot & (1 << pot) != 0 {
                    self.pot_count
                } else {
                    self.pot_input[pot]
                }
            }
            0x08 => self.allpot,
            0x09 => self.kbcode,
            0x0A => {
                if self.skctl & 0x03 == 0 {
                    0xFF
                } else {
                    self.polys.random(self.audctl & 0x80 != 0)
                }
            }
            0x0E => !self.irq_pending,
            0x0F => self.skstat(),
            _ => 0xFF,
        }
    }

    pub fn write(&mut self, addr: u16, value: u8) {
        match addr & 0x0F {
            reg @ 0x00..=0x07 => {
                let ch = usize::from(reg >> 1);
                if reg & 1 == 0 {
                    self.audf[ch] = value;
                } else {
                    self.audc[ch] = value;
                }
            }
            0x08 => self.audctl = value,
            0x09 => self.restart_timers(),
            0x0B => self.start_pot_scan(),
            0x0E => {
                self.irqen = value;
                self.irq_pending &= value;
            }
            0x0F => {
                self.skctl = value;
                if value & 0x03 == 0 {
                    self.polys = Polys::default();
                }
            }
            // SKRES and SEROUT: no serial port on the consoles served here.
            _ => {}
        }
    }

    fn skstat(&self) -> u8 {
        let mut v = 0xFF;
        if self.key_down {
            v &= !0x04;
        }
        if self.top_button {
            v &= !0x08;
        }
        v
    }

    // Inputs

    /// Set the keypad key held down, as a keyboard code. A new key raises
    /// the keyboard interrupt when it is enabled and scanning is on.
    pub fn set_key(&mut self, code: Option<u8>) {
        match code {
            Some(code) => {
                let new_press = !self.key_down || self.kbcode != code;
                self.kbcode = code;
                self.key_down = true;
                if new_press && self.skctl & 0x02 != 0 {
                    self.irq_pending |= IRQ_KEY & self.irqen;
                }
            }
            None => self.key_down = false,
        }
    }

    /// Raise the BREAK interrupt (the 5200 wires it to the keypad `*`
    /// row on some controllers).
    pub fn press_break(&mut self) {
        self.irq_pending |= IRQ_BREAK & self.irqen;
    }

    /// Second fire button, read through SKSTAT bit 3.
    pub fn set_top_button(&mut self, pressed: bool) {
        self.top_button = pressed;
    }

    pub fn set_pot(&mut self, pot: usize, value: u8) {
        if let Some(p) = self.pot_input.get_mut(pot) {
            *p = value.min(POT_MAX);
        }
    }

    fn start_pot_scan(&mut self) {
        self.pot_count = 0;
        self.pot_cycles = 0;
        self.allpot = 0xFF;
        if self.skctl & 0x04 != 0 {
            // Fast scan completes within a couple of cycles.
            self.allpot = 0;
        }
    }

    fn clock_pots(&mut self) {
        if self.allpot == 0 {
            return;
        }
        self.pot_cycles += 1;
        if self.pot_cycles < POT_STEP_CYCLES {
            return;
        }
        self.pot_cycles = 0;
        self.pot_count = self.pot_count.saturating_add(1);
        for (i, &target) in self.pot_input.iter().enumerate() {
            if self.pot_count >= target || self.pot_count >= POT_MAX {
                self.allpot &= !(1 << i);
            }
        }
    }

    // Audio and timers

    fn restart_timers(&mut self) {
        for ch in 0..4 {
            self.counter[ch] = self.reload_value(ch);
        }
        self.output = [false; 4];
    }

    fn reload_value(&self, ch: usize) -> u32 {
        let fast1 = self.audctl & 0x40 != 0;
        let fast3 = self.audctl & 0x20 != 0;
        let join12 = self.audctl & 0x10 != 0;
        let join34 = self.audctl & 0x08 != 0;
        let audf = u32::from(self.audf[ch]);
        match ch {
            1 if join12 => {
                ((audf << 8) | u32::from(self.audf[0])) + if fast1 { 7 } else { 1 }
            }
            3 if join34 => {
                ((audf << 8) | u32::from(self.audf[2])) + if fast3 { 7 } else { 1 }
            }
            0 if fast1 => audf + 4,
            2 if fast3 => audf + 4,
            _ => audf + 1,
        }
    }

    /// Count channel `ch` down; true on underflow.
    fn count(&mut self, ch: usize) -> bool {
        self.counter[ch] = self.counter[ch].saturating_sub(1);
        if self.counter[ch] == 0 {
            self.counter[ch] = self.reload_value(ch);
            true
        } else {
            false
        }
    }

    fn underflow(&mut self, ch: usize) {
        let audc = self.audc[ch];
        if audc & 0x80 != 0 || self.polys.bit5() {
            self.output[ch] = if audc & 0x20 != 0 {
                !self.output[ch]
            } else if audc & 0x40 != 0 {
                self.polys.bit4()
            } else {
                self.polys.bit_long(self.audctl & 0x80 != 0)
            };
        }
        match ch {
            0 => self.irq_pending |= IRQ_TIMER1 & self.irqen,
            1 => self.irq_pending |= IRQ_TIMER2 & self.irqen,
            2 => self.high_pass[0] = self.output[0],
            _ => {
                self.high_pass[1] = self.output[1];
                self.irq_pending |= IRQ_TIMER4 & self.irqen;
            }
        }
    }

    fn clock(&mut self) {
        if self.skctl & 0x03 != 0 {
            self.polys.clock();
        }

        self.base_counter -= 1;
        let base = self.base_counter == 0;
        if base {
            self.base_counter = if self.audctl & 0x01 != 0 {
                BASE_15K
            } else {
                BASE_64K
            };
        }

        let clock1 = base || self.audctl & 0x40 != 0;
        let clock3 = base || self.audctl & 0x20 != 0;
        if self.audctl & 0x10 != 0 {
            if clock1 && self.count(1) {
                self.underflow(1);
            }
        } else {
            if clock1 && self.count(0) {
                self.underflow(0);
            }
            if base && self.count(1) {
                self.underflow(1);
            }
        }
        if self.audctl & 0x08 != 0 {
            if clock3 && self.count(3) {
                self.underflow(3);
            }
        } else {
            if clock3 && self.count(2) {
                self.underflow(2);
            }
            if base && self.count(3) {
                self.underflow(3);
            }
        }

        self.clock_pots();
        let sample = self.mix();
        self.audio.push(sample);
    }

    fn mix(&self) -> i16 {
        let mut sum = 0i32;
        for ch in 0..4 {
            let audc = self.audc[ch];
            let mut high = self.output[ch];
            if ch < 2 && self.audctl & (0x04 >> ch) != 0 {
                high ^= self.high_pass[ch];
            }
            if audc & 0x10 != 0 || high {
                sum += i32::from(audc & 0x0F);
            }
        }
        (sum * VOLUME_SCALE) as i16
    }

    /// Advance by `cycles` machine cycles and update the IRQ line.
    pub fn advance(&mut self, cycles: u64, bus: &mut ProcessorBus) {
        for _ in 0..cycles {
            self.clock();
        }
        if self.irq_pending != 0 {
            bus.assert_irq(POKEY_IRQ);
        } else {
            bus.release_irq(POKEY_IRQ);
        }
    }

    pub fn output_mut(&mut self) -> &mut AudioOutputLine {
        &mut self.audio
    }
}

impl Observable for Pokey {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "audf" => Some(Value::List(self.audf.iter().map(|&v| v.into()).collect())),
            "audc" => Some(Value::List(self.audc.iter().map(|&v| v.into()).collect())),
            "audctl" => Some(self.audctl.into()),
            "irqen" => Some(self.irqen.into()),
            "irqst" => Some((!self.irq_pending).into()),
            "skctl" => Some(self.skctl.into()),
            "kbcode" => Some(self.kbcode.into()),
            "allpot" => Some(self.allpot.into()),
            "pots" => Some(Value::List(
                self.pot_input.iter().map(|&v| v.into()).collect(),
            )),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "audf", "audc", "audctl", "irqen", "irqst", "skctl", "kbcode", "allpot", "pots",
        ]
    }
}
