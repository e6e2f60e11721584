//! Display-list engine, DMA and NMI generation.

#![allow(clippy::cast_possible_truncation)]

use atari_gtia::{FB_WIDTH, Gtia, pf};
use emu_core::{Bus, Observable, ProcessorBus, Value};
use serde::{Deserialize, Serialize};

use crate::modes::{self, Line};

pub const CYCLES_PER_LINE: u64 = 114;
pub const LINES_PER_FRAME: u16 = 262;
pub const CYCLES_PER_FRAME: u64 = CYCLES_PER_LINE * LINES_PER_FRAME as u64;
pub const FIRST_DISPLAY_LINE: u16 = 8;
pub const VBLANK_LINE: u16 = 248;

/// Cycle within the line where a WSYNC-halted CPU resumes.
const WSYNC_RESUME: u64 = 105;
/// DRAM refresh cycles taken every line.
const REFRESH_CYCLES: u64 = 9;

const NMI_DLI: u8 = 0x80;
const NMI_VBI: u8 = 0x40;

/// Atari ANTIC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Antic {
    dmactl: u8,
    chactl: u8,
    dlist: u16,
    hscrol: u8,
    vscrol: u8,
    pmbase: u8,
    chbase: u8,
    nmien: u8,
    nmist: u8,

    line: u16,
    cycle: u64,
    started: bool,

    // Current mode line
    ir: u8,
    row: u8,
    rows_left: u8,
    prev_vscrol: bool,
    jvb_wait: bool,
    memscan: u16,
    line_data: Vec<u8>,

    wsync: bool,
    frame: u64,
    frame_ready: bool,

    #[serde(skip, default = "blank_codes")]
    codes: Vec<u8>,
}

fn blank_codes() -> Vec<u8> {
    vec![pf::BAK; FB_WIDTH]
}

impl Default for Antic {
    fn default() -> Self {
        Self::new()
    }
}

/// Advance a counter that only carries within its low `bits` bits.
fn bump(value: u16, mask: u16) -> u16 {
    (value & !mask) | (value.wrapping_add(1) & mask)
}

impl Antic {
    #[must_use]
    pub fn new() -> Self {
        Self {
            dmactl: 0,
            chactl: 0,
            dlist: 0,
            hscrol: 0,
            vscrol: 0,
            pmbase: 0,
            chbase: 0,
            nmien: 0,
            nmist: 0,
            line: 0,
            cycle: 0,
            started: false,
            ir: 0,
            row: 0,
            rows_left: 0,
            prev_vscrol: false,
            jvb_wait: false,
            memscan: 0,
            line_data: Vec::new(),
            wsync: false,
            frame: 0,
            frame_ready: false,
            codes: blank_codes(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    #[must_use]
    pub fn line(&self) -> u16 {
        self.line
    }

    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn take_frame_ready(&mut self) -> bool {
        std::mem::take(&mut self.frame_ready)
    }

    // Registers

    #[must_use]
    pub fn read(&self, addr: u16) -> u8 {
        match addr & 0x0F {
            0x0B => (self.line >> 1) as u8,
            0x0C | 0x0D => 0,
            0x0F => self.nmist | 0x1F,
            _ => 0xFF,
        }
    }

    pub fn write(&mut self, addr: u16, value: u8) {
        match addr & 0x0F {
            0x00 => self.dmactl = value & 0x3F,
            0x01 => self.chactl = value & 0x07,
            0x02 => self.dlist = (self.dlist & 0xFF00) | u16::from(value),
            0x03 => self.dlist = (self.dlist & 0x00FF) | (u16::from(value) << 8),
            0x04 => self.hscrol = value & 0x0F,
            0x05 => self.vscrol = value & 0x0F,
            0x07 => self.pmbase = value,
            0x09 => self.chbase = value,
            0x0A => self.wsync = true,
            0x0E => self.nmien = value & 0xC0,
            0x0F => self.nmist = 0,
            _ => {}
        }
    }

    // Timing

    /// Advance by `cycles` machine cycles. `mem` is ANTIC's DMA view of
    /// the address space.
    pub fn advance<B: Bus>(
        &mut self,
        cycles: u64,
        bus: &mut ProcessorBus,
        mem: &mut B,
        gtia: &mut Gtia,
    ) {
        if !self.started {
            self.started = true;
            self.start_line(bus, mem, gtia);
        }

        let mut remaining = cycles;
        while remaining > 0 {
            let step = (CYCLES_PER_LINE - self.cycle).min(remaining);
            self.cycle += step;
            remaining -= step;
            if self.cycle == CYCLES_PER_LINE {
                self.cycle = 0;
                self.line += 1;
                if self.line == LINES_PER_FRAME {
                    self.line = 0;
                    self.frame += 1;
                    self.frame_ready = true;
                }
                self.start_line(bus, mem, gtia);
            }
        }

        if self.wsync {
            self.wsync = false;
            let stall = if self.cycle < WSYNC_RESUME {
                WSYNC_RESUME - self.cycle
            } else {
                CYCLES_PER_LINE - self.cycle + WSYNC_RESUME
            };
            bus.request_bus(stall);
        }
    }

    fn start_line<B: Bus>(&mut self, bus: &mut ProcessorBus, mem: &mut B, gtia: &mut Gtia) {
        let mut stolen = REFRESH_CYCLES;

        if self.line == 0 {
            self.rows_left = 0;
            self.prev_vscrol = false;
            self.jvb_wait = false;
        }
        if self.line == VBLANK_LINE {
            self.nmist |= NMI_VBI;
            if self.nmien & NMI_VBI != 0 {
                bus.pulse_nmi();
            }
        }
        if (FIRST_DISPLAY_LINE..VBLANK_LINE).contains(&self.line) {
            stolen += self.player_missile_dma(mem, gtia);
            stolen += self.display_line(bus, mem, gtia);
        }

        bus.request_bus(stolen);
    }

    fn player_missile_dma<B: Bus>(&mut self, mem: &mut B, gtia: &mut Gtia) -> u64 {
        let players = self.dmactl & 0x08 != 0;
        let missiles = self.dmactl & 0x0C != 0;
        if !players && !missiles {
            return 0;
        }
        let line = self.line;
        let (base, index, missile_off, player_off, player_stride) = if self.dmactl & 0x10 != 0 {
            (u16::from(self.pmbase & 0xF8) << 8, line, 0x300, 0x400, 0x100)
        } else {
            (u16::from(self.pmbase & 0xFC) << 8, line / 2, 0x180, 0x200, 0x80)
        };

        let mut stolen = 0;
        if missiles {
            let value = mem.read(base + missile_off + index);
            gtia.dma_missiles(value, line);
            stolen += 1;
        }
        if players {
            for n in 0..4u16 {
                let value = mem.read(base + player_off + n * player_stride + index);
                gtia.dma_player(usize::from(n), value, line);
            }
            stolen += 4;
        }
        stolen
    }

    fn fetch_dl<B: Bus>(&mut self, mem: &mut B) -> u8 {
        let value = mem.read(self.dlist);
        self.dlist = bump(self.dlist, 0x03FF);
        value
    }

    /// Playfield window in colour clocks for a DMACTL width.
    fn window(width: u8) -> (usize, usize) {
        match width {
            1 => (64, 192),
            2 => (48, 208),
            _ => (32, 224),
        }
    }

    fn display_line<B: Bus>(&mut self, bus: &mut ProcessorBus, mem: &mut B, gtia: &mut Gtia) -> u64 {
        let y = usize::from(self.line - FIRST_DISPLAY_LINE);
        self.codes.fill(pf::BAK);

        let width = self.dmactl & 0x03;
        if width == 0 || self.dmactl & 0x20 == 0 || self.jvb_wait {
            gtia.render_line(y, &self.codes);
            return 0;
        }

        let mut stolen = 0;
        if self.rows_left == 0 {
            stolen += self.next_instruction(mem, width);
        }

        let mode = self.ir & 0x0F;
        if let Some(info) = modes::mode_info(mode) {
            let hscrolled = self.ir & 0x10 != 0;
            let display = Self::window(width);
            let start_clock = if hscrolled {
                Self::window((width + 1).min(3)).0 + usize::from(self.hscrol)
            } else {
                display.0
            };
            let line = Line {
                mode,
                info,
                row: self.row,
                data: &self.line_data,
                start_clock,
                window: display,
                chbase: self.chbase,
                chactl: self.chactl,
                gtia_mode: gtia.prior() >> 6 != 0,
            };
            stolen += modes::render(&line, mem, &mut self.codes);
        }
        gtia.render_line(y, &self.codes);

        self.rows_left -= 1;
        self.row += 1;
        if self.rows_left == 0 && self.ir & 0x80 != 0 {
            self.nmist |= NMI_DLI;
            if self.nmien & NMI_DLI != 0 {
                bus.pulse_nmi();
            }
        }
        stolen
    }

    /// Fetch and decode the next display-list instruction. Returns cycles
    /// stolen for the fetch and the screen data.
    fn next_instruction<B: Bus>(&mut self, mem: &mut B, width: u8) -> u64 {
        let ir = self.fetch_dl(mem);
        self.ir = ir;
        self.row = 0;
        let mut stolen = 1;

        match ir & 0x0F {
            0x0 => {
                self.rows_left = ((ir >> 4) & 7) + 1;
                self.prev_vscrol = false;
            }
            0x1 => {
                let lo = self.fetch_dl(mem);
                let hi = self.fetch_dl(mem);
                self.dlist = u16::from_le_bytes([lo, hi]);
                self.jvb_wait = ir & 0x40 != 0;
                log::trace!(
                    "ANTIC {} to ${:04X} at line {}",
                    if self.jvb_wait { "JVB" } else { "JMP" },
                    self.dlist,
                    self.line
                );
                self.rows_left = 1;
                self.prev_vscrol = false;
                stolen += 2;
            }
            mode => {
                if ir & 0x40 != 0 {
                    let lo = self.fetch_dl(mem);
                    let hi = self.fetch_dl(mem);
                    self.memscan = u16::from_le_bytes([lo, hi]);
                    stolen += 2;
                }
                let Some(info) = modes::mode_info(mode) else {
                    return stolen;
                };

                let vscrolled = ir & 0x20 != 0;
                let last = info.scanlines - 1;
                let first_row = if vscrolled && !self.prev_vscrol {
                    self.vscrol.min(last)
                } else {
                    0
                };
                let last_row = if !vscrolled && self.prev_vscrol {
                    self.vscrol.min(last)
                } else {
                    last
                };
                self.prev_vscrol = vscrolled;
                self.row = first_row;
                self.rows_left = last_row.saturating_sub(first_row) + 1;

                let fetch_width = if ir & 0x10 != 0 {
                    (width + 1).min(3)
                } else {
                    width
                };
                let (left, right) = Self::window(fetch_width);
                let bytes = (right - left) / info.clocks_per_byte;
                self.line_data.clear();
                for _ in 0..bytes {
                    self.line_data.push(mem.read(self.memscan));
                    self.memscan = bump(self.memscan, 0x0FFF);
                }
                stolen += bytes as u64;
            }
        }
        stolen
    }
}

impl Observable for Antic {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "line" => Some(self.line.into()),
            "cycle" => Some(self.cycle.into()),
            "frame" => Some(self.frame.into()),
            "vcount" => Some(self.read(0x0B).into()),
            "dmactl" => Some(self.dmactl.into()),
            "chactl" => Some(self.chactl.into()),
            "dlist" => Some(self.dlist.into()),
            "memscan" => Some(self.memscan.into()),
            "mode" => Some((self.ir & 0x0F).into()),
            "nmien" => Some(self.nmien.into()),
            "nmist" => Some(self.nmist.into()),
            "hscrol" => Some(self.hscrol.into()),
            "vscrol" => Some(self.vscrol.into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "line", "cycle", "frame", "vcount", "dmactl", "chactl", "dlist", "memscan", "mode",
            "nmien", "nmist", "hscrol", "vscrol",
        ]
    }
}
