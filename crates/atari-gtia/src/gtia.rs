//! GTIA register file and scanline compositor.

#![allow(clippy::cast_possible_truncation)]

use emu_core::{Observable, Value};
use serde::{Deserialize, Serialize};

use crate::palette::ntsc_palette;
use crate::pf;

/// Framebuffer: 192 colour clocks at two pixels each, 240 lines.
pub const FB_WIDTH: usize = 384;
pub const FB_HEIGHT: usize = 240;
/// Colour clock shown at framebuffer column 0.
pub const FIRST_VISIBLE_CLOCK: usize = 32;
/// Scanline shown at framebuffer row 0.
pub const FIRST_VISIBLE_LINE: u16 = 8;

// Write registers
const HPOSP0: u8 = 0x00;
const HPOSM0: u8 = 0x04;
const SIZEP0: u8 = 0x08;
const SIZEM: u8 = 0x0C;
const GRAFP0: u8 = 0x0D;
const GRAFM: u8 = 0x11;
const COLPM0: u8 = 0x12;
const COLPF0: u8 = 0x16;
const COLBK: u8 = 0x1A;
const PRIOR: u8 = 0x1B;
const VDELAY: u8 = 0x1C;
const GRACTL: u8 = 0x1D;
const HITCLR: u8 = 0x1E;
const CONSOL: u8 = 0x1F;

/// Priority layers, top first, for each PRIOR setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layer {
    Player(usize),
    Playfield(usize),
}

use Layer::{Player as P, Playfield as F};

const PRIORITY_PLAYERS: [Layer; 8] = [P(0), P(1), P(2), P(3), F(0), F(1), F(2), F(3)];
const PRIORITY_SPLIT: [Layer; 8] = [P(0), P(1), F(0), F(1), F(2), F(3), P(2), P(3)];
const PRIORITY_PLAYFIELD: [Layer; 8] = [F(0), F(1), F(2), F(3), P(0), P(1), P(2), P(3)];
const PRIORITY_MIXED: [Layer; 8] = [F(0), F(1), P(0), P(1), P(2), P(3), F(2), F(3)];

/// Atari GTIA.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gtia {
    hposp: [u8; 4],
    hposm: [u8; 4],
    sizep: [u8; 4],
    sizem: u8,
    grafp: [u8; 4],
    grafm: u8,
    colpm: [u8; 4],
    colpf: [u8; 4],
    colbk: u8,
    prior: u8,
    vdelay: u8,
    gractl: u8,
    consol: u8,

    // Collisions, one bit per playfield or player
    m_pf: [u8; 4],
    p_pf: [u8; 4],
    m_pl: [u8; 4],
    p_pl: [u8; 4],

    triggers: [bool; 4],
    latched_triggers: [bool; 4],
    pal: bool,

    #[serde(skip, default = "blank_framebuffer")]
    framebuffer: Vec<u32>,
}

fn blank_framebuffer() -> Vec<u32> {
    vec![0xFF00_0000; FB_WIDTH * FB_HEIGHT]
}

impl Default for Gtia {
    fn default() -> Self {
        Self::new(false)
    }
}

impl Gtia {
    #[must_use]
    pub fn new(pal: bool) -> Self {
        Self {
            hposp: [0; 4],
            hposm: [0; 4],
            sizep: [0; 4],
            sizem: 0,
            grafp: [0; 4],
            grafm: 0,
            colpm: [0; 4],
            colpf: [0; 4],
            colbk: 0,
            prior: 0,
            vdelay: 0,
            gractl: 0,
            consol: 0,
            m_pf: [0; 4],
            p_pf: [0; 4],
            m_pl: [0; 4],
            p_pl: [0; 4],
            triggers: [false; 4],
            latched_triggers: [false; 4],
            pal,
            framebuffer: blank_framebuffer(),
        }
    }

    pub fn reset(&mut self) {
        let triggers = self.triggers;
        *self = Self::new(self.pal);
        self.triggers = triggers;
    }

    pub fn read(&self, addr: u16) -> u8 {
        let reg = (addr & 0x1F) as usize;
        match reg {
            0x00..=0x03 => self.m_pf[reg],
            0x04..=0x07 => self.p_pf[reg - 4],
            0x08..=0x0B => self.m_pl[reg - 8],
            0x0C..=0x0F => self.p_pl[reg - 12],
            0x10..=0x13 => {
                let n = reg - 0x10;
                let pressed = self.triggers[n] || self.latched_triggers[n];
                u8::from(!pressed)
            }
            0x14 => {
                if self.pal {
                    0x01
                } else {
                    0x0F
                }
            }
            _ => 0x0F,
        }
    }

    pub fn write(&mut self, addr: u16, value: u8) {
        let reg = (addr & 0x1F) as u8;
        match reg {
            0x00..=0x03 => self.hposp[usize::from(reg - HPOSP0)] = value,
            0x04..=0x07 => self.hposm[usize::from(reg - HPOSM0)] = value,
            0x08..=0x0B => self.sizep[usize::from(reg - SIZEP0)] = value,
            SIZEM => self.sizem = value,
            0x0D..=0x10 => self.grafp[usize::from(reg - GRAFP0)] = value,
            GRAFM => self.grafm = value,
            0x12..=0x15 => self.colpm[usize::from(reg - COLPM0)] = value,
            0x16..=0x19 => self.colpf[usize::from(reg - COLPF0)] = value,
            COLBK => self.colbk = value,
            PRIOR => self.prior = value,
            VDELAY => self.vdelay = value,
            GRACTL => {
                self.gractl = value;
                if value & 0x04 == 0 {
                    self.latched_triggers = [false; 4];
                }
            }
            HITCLR => {
                self.m_pf = [0; 4];
                self.p_pf = [0; 4];
                self.m_pl = [0; 4];
                self.p_pl = [0; 4];
            }
            CONSOL => self.consol = value,
            _ => {}
        }
    }

    /// Low bits of the last CONSOL write. The 5200 uses them to pick the
    /// controller whose keypad POKEY scans.
    #[must_use]
    pub fn consol(&self) -> u8 {
        self.consol
    }

    pub fn set_trigger(&mut self, n: usize, pressed: bool) {
        if let Some(t) = self.triggers.get_mut(n) {
            *t = pressed;
            if pressed && self.gractl & 0x04 != 0 {
                self.latched_triggers[n] = true;
            }
        }
    }

    /// GTIA mode select lives in PRIOR bits 7-6; ANTIC needs it to decode
    /// mode F lines.
    #[must_use]
    pub fn prior(&self) -> u8 {
        self.prior
    }

    #[must_use]
    pub fn gractl(&self) -> u8 {
        self.gractl
    }

    /// Player graphics from ANTIC DMA. With VDELAY set for the player only
    /// even lines update it.
    pub fn dma_player(&mut self, n: usize, value: u8, line: u16) {
        if self.gractl & 0x02 == 0 {
            return;
        }
        if self.vdelay & (0x10 << n) != 0 && line & 1 != 0 {
            return;
        }
        self.grafp[n] = value;
    }

    /// Missile graphics from ANTIC DMA.
    pub fn dma_missiles(&mut self, value: u8, line: u16) {
        if self.gractl & 0x01 == 0 {
            return;
        }
        let mut graf = self.grafm;
        for m in 0..4 {
            if self.vdelay & (1 << m) != 0 && line & 1 != 0 {
                continue;
            }
            let mask = 3 << (m * 2);
            graf = (graf & !mask) | (value & mask);
        }
        self.grafm = graf;
    }

    #[must_use]
    pub fn framebuffer(&self) -> &[u32] {
        &self.framebuffer
    }

    /// Colour of a register byte. Luminance bit 0 is only honoured in
    /// GTIA mode 9.
    fn rgb(color: u8) -> u32 {
        ntsc_palette()[usize::from(color & 0xFE)]
    }

    /// Fill framebuffer row `y` with the background colour.
    pub fn blank_line(&mut self, y: usize) {
        if y >= FB_HEIGHT {
            return;
        }
        let color = Self::rgb(self.colbk);
        self.framebuffer[y * FB_WIDTH..(y + 1) * FB_WIDTH].fill(color);
    }

    fn player_covers(&self, n: usize, clock: usize) -> bool {
        let hpos = usize::from(self.hposp[n]);
        let width = match self.sizep[n] & 3 {
            1 => 2,
            3 => 4,
            _ => 1,
        };
        if clock < hpos {
            return false;
        }
        let bit = (clock - hpos) / width;
        bit < 8 && self.grafp[n] & (0x80 >> bit) != 0
    }

    fn missile_covers(&self, n: usize, clock: usize) -> bool {
        let hpos = usize::from(self.hposm[n]);
        let width = match (self.sizem >> (n * 2)) & 3 {
            1 => 2,
            3 => 4,
            _ => 1,
        };
        if clock < hpos {
            return false;
        }
        let bit = (clock - hpos) / width;
        let bits = (self.grafm >> (n * 2)) & 3;
        bit < 2 && bits & (2 >> bit) != 0
    }

    /// Composite one scanline of playfield codes (`FB_WIDTH` entries) into
    /// framebuffer row `y`, updating collisions.
    pub fn render_line(&mut self, y: usize, line: &[u8]) {
        if y >= FB_HEIGHT {
            return;
        }
        let gtia_mode = self.prior >> 6;
        let order = match self.prior & 0x0F {
            2 => &PRIORITY_SPLIT,
            4 => &PRIORITY_PLAYFIELD,
            8 => &PRIORITY_MIXED,
            _ => &PRIORITY_PLAYERS,
        };
        let fifth = self.prior & 0x10 != 0;
        let multicolor = self.prior & 0x20 != 0;

        for x in 0..FB_WIDTH {
            let code = line.get(x).copied().unwrap_or(pf::BAK);
            let clock = FIRST_VISIBLE_CLOCK + x / 2;

            let mut players = [false; 4];
            let mut missiles = [false; 4];
            for n in 0..4 {
                players[n] = self.player_covers(n, clock);
                missiles[n] = self.missile_covers(n, clock);
            }

            // Playfield index for priority and collisions.
            let playfield = match code {
                pf::PF0 => Some(0),
                pf::PF1 => Some(1),
                pf::PF2 | pf::HIRES => Some(2),
                pf::PF3 => Some(3),
                _ => None,
            };

            for n in 0..4 {
                if players[n] {
                    if let Some(p) = playfield {
                        self.p_pf[n] |= 1 << p;
                    }
                    for j in (0..4).filter(|&j| j != n && players[j]) {
                        self.p_pl[n] |= 1 << j;
                    }
                }
                if missiles[n] {
                    if let Some(p) = playfield {
                        self.m_pf[n] |= 1 << p;
                    }
                    for j in (0..4).filter(|&j| players[j]) {
                        self.m_pl[n] |= 1 << j;
                    }
                }
            }

            let mut player_layer = players;
            let mut pf3_missile = false;
            for n in 0..4 {
                if missiles[n] {
                    if fifth {
                        pf3_missile = true;
                    } else {
                        player_layer[n] = true;
                    }
                }
            }

            let top = order.iter().find(|layer| match **layer {
                Layer::Player(n) => player_layer[n],
                Layer::Playfield(3) => playfield == Some(3) || pf3_missile,
                Layer::Playfield(p) => playfield == Some(p) && gtia_mode == 0,
            });

            let color = match top {
                Some(Layer::Player(n)) => {
                    let n = *n;
                    let pair = n ^ 1;
                    if multicolor && player_layer[pair] {
                        self.colpm[n] | self.colpm[pair]
                    } else {
                        self.colpm[n]
                    }
                }
                Some(Layer::Playfield(2)) if code == pf::HIRES => {
                    (self.colpf[2] & 0xF0) | (self.colpf[1] & 0x0E)
                }
                Some(Layer::Playfield(p)) => self.colpf[*p],
                None if code & pf::NIBBLE != 0 => {
                    let nibble = code & 0x0F;
                    let color = match gtia_mode {
                        1 => (self.colbk & 0xF0) | nibble,
                        2 => match nibble {
                            0..=3 => self.colpm[usize::from(nibble)],
                            4..=7 => self.colpf[usize::from(nibble - 4)],
                            _ => self.colbk,
                        },
                        _ => (nibble << 4) | (self.colbk & 0x0F),
                    };
                    self.framebuffer[y * FB_WIDTH + x] =
                        ntsc_palette()[usize::from(if gtia_mode == 1 { color } else { color & 0xFE })];
                    continue;
                }
                None => self.colbk,
            };
            self.framebuffer[y * FB_WIDTH + x] = Self::rgb(color);
        }
    }
}

impl Observable for Gtia {
    fn query(&self, path: &str) -> Option<Value> {
        let list = |v: &[u8; 4]| Value::List(v.iter().map(|&b| b.into()).collect());
        match path {
            "hposp" => Some(list(&self.hposp)),
            "hposm" => Some(list(&self.hposm)),
            "grafp" => Some(list(&self.grafp)),
            "grafm" => Some(self.grafm.into()),
            "colpm" => Some(list(&self.colpm)),
            "colpf" => Some(list(&self.colpf)),
            "colbk" => Some(self.colbk.into()),
            "prior" => Some(self.prior.into()),
            "gractl" => Some(self.gractl.into()),
            "collisions.p_pf" => Some(list(&self.p_pf)),
            "collisions.p_pl" => Some(list(&self.p_pl)),
            "collisions.m_pf" => Some(list(&self.m_pf)),
            "collisions.m_pl" => Some(list(&self.m_pl)),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "hposp",
            "hposm",
            "grafp",
            "grafm",
            "colpm",
            "colpf",
            "colbk",
            "prior",
            "gractl",
            "collisions.p_pf",
            "collisions.p_pl",
            "collisions.m_pf",
            "collisions.m_pl",
        ]
    }
}
