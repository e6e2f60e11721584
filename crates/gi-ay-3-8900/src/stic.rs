//! STIC register file, frame timing and renderer.

#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::struct_excessive_bools
)]

use emu_core::{IrqSource, Observable, ProcessorBus, Value};
use serde::{Deserialize, Serialize};

use crate::mob::Mob;
use crate::palette::PALETTE;

/// Framebuffer dimensions.
pub const FB_WIDTH: usize = 176;
pub const FB_HEIGHT: usize = 224;

pub const CYCLES_PER_LINE: u64 = 57;
pub const LINES_PER_FRAME: u64 = 262;
pub const CYCLES_PER_FRAME: u64 = CYCLES_PER_LINE * LINES_PER_FRAME;

/// Interrupt source the STIC raises at the start of vertical blank.
pub const STIC_IRQ: IrqSource = IrqSource(0);

const VBLANK_CYCLES: u64 = 70 * CYCLES_PER_LINE;
const ROW_CYCLES: u64 = 16 * CYCLES_PER_LINE;
/// Cycles the CPU loses at each card row while the display is enabled.
const ROW_FETCH_CYCLES: u64 = 110;

const CARD_COLUMNS: usize = 20;
const CARD_ROWS: usize = 12;
const BACKTAB_LEN: usize = CARD_COLUMNS * CARD_ROWS;
const GRAM_LEN: usize = 512;
const GROM_LEN: usize = 2048;

// Playfield bounds in framebuffer coordinates.
const PLAY_LEFT: i32 = 8;
const PLAY_RIGHT: i32 = 168;
const PLAY_TOP: i32 = 16;
const PLAY_BOTTOM: i32 = 208;

const REG_DISPLAY_ENABLE: u16 = 0x20;
const REG_MODE: u16 = 0x21;
const REG_BORDER: usize = 0x2C;
const REG_H_DELAY: usize = 0x30;
const REG_V_DELAY: usize = 0x31;
const REG_BORDER_EXT: usize = 0x32;

/// Register groups that can be latched independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LatchGroup {
    MobPosition,
    MobAttributes,
    ColorStack,
    Border,
    Delay,
    Mode,
}

impl LatchGroup {
    pub const ALL: [LatchGroup; 6] = [
        LatchGroup::MobPosition,
        LatchGroup::MobAttributes,
        LatchGroup::ColorStack,
        LatchGroup::Border,
        LatchGroup::Delay,
        LatchGroup::Mode,
    ];

    const fn index(self) -> usize {
        self as usize
    }

    fn of_register(reg: usize) -> Option<Self> {
        match reg {
            0x00..=0x0F => Some(LatchGroup::MobPosition),
            0x10..=0x17 => Some(LatchGroup::MobAttributes),
            0x28..=0x2B => Some(LatchGroup::ColorStack),
            REG_BORDER | REG_BORDER_EXT => Some(LatchGroup::Border),
            REG_H_DELAY | REG_V_DELAY => Some(LatchGroup::Delay),
            _ => None,
        }
    }
}

/// When a register write becomes visible to the renderer.
///
/// Registers are latched as vertical blank begins. The CPU can only
/// reach them before active display closes the bus, so the policy decides
/// whether writes from this frame's vblank handler show in this frame or
/// the next.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LatchPolicy {
    /// The renderer sees the register as it is when it draws.
    #[default]
    Immediate,
    /// The renderer sees the value latched when vblank began.
    NextFrame,
}

/// AY-3-8900 Standard Television Interface Chip.
#[derive(Clone, Serialize, Deserialize)]
pub struct Stic {
    regs: Vec<u16>,
    latched: Vec<u16>,
    policies: [LatchPolicy; 6],
    fgbg: bool,
    latched_fgbg: bool,

    display_armed: bool,
    display_enabled: bool,
    /// Active display with the bus closed to the CPU.
    in_active: bool,

    backtab: Vec<u16>,
    gram: Vec<u16>,
    #[serde(skip)]
    grom: Vec<u16>,

    // Frame position
    cycle: u64,
    started: bool,
    stack_index: usize,
    frame: u64,
    frame_ready: bool,

    #[serde(skip, default = "blank_framebuffer")]
    framebuffer: Vec<u32>,
    /// Background foreground pixels, for MOB priority and collisions.
    #[serde(skip, default = "blank_mask")]
    fg_mask: Vec<bool>,
}

fn blank_framebuffer() -> Vec<u32> {
    vec![PALETTE[0]; FB_WIDTH * FB_HEIGHT]
}

fn blank_mask() -> Vec<bool> {
    vec![false; FB_WIDTH * FB_HEIGHT]
}

impl Default for Stic {
    fn default() -> Self {
        Self::new()
    }
}

impl Stic {
    #[must_use]
    pub fn new() -> Self {
        Self {
            regs: vec![0; 64],
            latched: vec![0; 64],
            policies: [LatchPolicy::Immediate; 6],
            fgbg: false,
            latched_fgbg: false,
            display_armed: false,
            display_enabled: false,
            in_active: false,
            backtab: vec![0; BACKTAB_LEN],
            gram: vec![0; GRAM_LEN],
            grom: vec![0; GROM_LEN],
            cycle: 0,
            started: false,
            stack_index: 0,
            frame: 0,
            frame_ready: false,
            framebuffer: blank_framebuffer(),
            fg_mask: blank_mask(),
        }
    }

    /// Return to power-on state. GROM and latch policies are kept.
    pub fn reset(&mut self) {
        let grom = std::mem::take(&mut self.grom);
        let policies = self.policies;
        *self = Self::new();
        self.grom = grom;
        self.policies = policies;
    }

    /// Install the character ROM, one byte per card row.
    pub fn load_grom(&mut self, data: &[u8]) {
        for (dst, &byte) in self.grom.iter_mut().zip(data) {
            *dst = u16::from(byte);
        }
    }

    pub fn set_latch_policy(&mut self, group: LatchGroup, policy: LatchPolicy) {
        self.policies[group.index()] = policy;
    }

    #[must_use]
    pub fn latch_policy(&self, group: LatchGroup) -> LatchPolicy {
        self.policies[group.index()]
    }

    /// Whether the CPU is locked out of registers, GROM and GRAM.
    #[must_use]
    pub fn bus_closed(&self) -> bool {
        self.in_active
    }

    #[must_use]
    pub fn display_enabled(&self) -> bool {
        self.display_enabled
    }

    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    #[must_use]
    pub fn framebuffer(&self) -> &[u32] {
        &self.framebuffer
    }

    /// True once per completed frame.
    pub fn take_frame_ready(&mut self) -> bool {
        std::mem::take(&mut self.frame_ready)
    }

    // Register file

    pub fn read(&mut self, addr: u16) -> u16 {
        let addr = addr & 0x3F;
        if self.in_active {
            return 0xFFFF;
        }
        let v = self.regs[usize::from(addr)];
        match addr {
            0x00..=0x07 => 0x3800 | v,
            0x08..=0x0F => 0x3000 | v,
            0x10..=0x17 => 0xC000 | v,
            0x18..=0x1F => 0xFC00 | v,
            REG_MODE => {
                self.fgbg = false;
                0xFFFF
            }
            0x28..=0x2C => 0xFFF0 | v,
            0x30 | 0x31 => 0xFFF8 | v,
            0x32 => 0xFFFC | v,
            _ => 0xFFFF,
        }
    }

    pub fn write(&mut self, addr: u16, value: u16) {
        let addr = addr & 0x3F;
        if self.in_active {
            return;
        }
        let mask = match addr {
            0x00..=0x07 => 0x07FF,
            0x08..=0x0F => 0x0FFF,
            0x10..=0x17 => 0x3FFF,
            0x18..=0x1F => 0x03FF,
            REG_DISPLAY_ENABLE => {
                self.display_armed = true;
                return;
            }
            REG_MODE => {
                self.fgbg = true;
                return;
            }
            0x28..=0x2C => 0x000F,
            0x30 | 0x31 => 0x0007,
            0x32 => 0x0003,
            _ => {
                log::trace!("STIC: write {value:#06X} to reserved register {addr:#04X}");
                return;
            }
        };
        self.regs[usize::from(addr)] = value & mask;
    }

    // Card memories

    #[must_use]
    pub fn read_grom(&self, offset: u16) -> u16 {
        if self.in_active {
            return 0xFFFF;
        }
        self.grom[usize::from(offset) & (GROM_LEN - 1)]
    }

    #[must_use]
    pub fn read_gram(&self, offset: u16) -> u16 {
        if self.in_active {
            return 0xFFFF;
        }
        self.gram[usize::from(offset) & (GRAM_LEN - 1)]
    }

    pub fn write_gram(&mut self, offset: u16, value: u16) {
        if !self.in_active {
            self.gram[usize::from(offset) & (GRAM_LEN - 1)] = value & 0xFF;
        }
    }

    /// BACKTAB is ordinary system RAM and always CPU-accessible.
    #[must_use]
    pub fn read_backtab(&self, offset: u16) -> u16 {
        self.backtab
            .get(usize::from(offset))
            .copied()
            .unwrap_or(0xFFFF)
    }

    pub fn write_backtab(&mut self, offset: u16, value: u16) {
        if let Some(cell) = self.backtab.get_mut(usize::from(offset)) {
            *cell = value;
        }
    }

    // Timing

    /// Advance by `cycles` CPU cycles, signalling interrupts and bus
    /// requests on `bus`.
    pub fn advance(&mut self, cycles: u64, bus: &mut ProcessorBus) {
        if !self.started {
            self.started = true;
            self.start_frame(bus);
        }

        let mut remaining = cycles;
        while remaining > 0 {
            let target = self.next_event();
            let step = (target - self.cycle).min(remaining);
            self.cycle += step;
            remaining -= step;
            if self.cycle != target {
                break;
            }

            if target == CYCLES_PER_FRAME {
                self.finish_frame();
                self.cycle = 0;
                self.start_frame(bus);
            } else {
                if target == VBLANK_CYCLES {
                    self.start_display(bus);
                }
                let row = ((target - VBLANK_CYCLES) / ROW_CYCLES) as usize;
                if self.display_enabled {
                    bus.request_bus(ROW_FETCH_CYCLES);
                    self.render_row(row);
                }
            }
        }
    }

    fn next_event(&self) -> u64 {
        if self.cycle < VBLANK_CYCLES {
            return VBLANK_CYCLES;
        }
        let row = (self.cycle - VBLANK_CYCLES) / ROW_CYCLES + 1;
        if row < CARD_ROWS as u64 {
            VBLANK_CYCLES + row * ROW_CYCLES
        } else {
            CYCLES_PER_FRAME
        }
    }

    fn start_frame(&mut self, bus: &mut ProcessorBus) {
        bus.assert_irq(STIC_IRQ);
        self.in_active = false;
        self.display_armed = false;
        self.latched.copy_from_slice(&self.regs);
        self.latched_fgbg = self.fgbg;
    }

    fn start_display(&mut self, bus: &mut ProcessorBus) {
        bus.release_irq(STIC_IRQ);
        if self.display_armed != self.display_enabled {
            log::debug!(
                "STIC: display {} at frame {}",
                if self.display_armed { "enabled" } else { "disabled" },
                self.frame
            );
        }
        self.display_enabled = self.display_armed;
        self.stack_index = 0;
        self.fg_mask.fill(false);
        if self.display_enabled {
            let border = PALETTE[usize::from(self.effective(REG_BORDER))];
            self.framebuffer.fill(border);
            self.in_active = true;
        }
    }

    fn finish_frame(&mut self) {
        if self.display_enabled {
            self.composite_mobs();
            self.paint_border_extension();
        } else {
            let border = PALETTE[usize::from(self.effective(REG_BORDER))];
            self.framebuffer.fill(border);
        }
        self.in_active = false;
        self.frame += 1;
        self.frame_ready = true;
    }

    // Rendering

    fn effective(&self, reg: usize) -> u16 {
        match LatchGroup::of_register(reg).map(|g| self.policies[g.index()]) {
            Some(LatchPolicy::Immediate) | None => self.regs[reg],
            Some(LatchPolicy::NextFrame) => self.latched[reg],
        }
    }

    fn effective_fgbg(&self) -> bool {
        match self.policies[LatchGroup::Mode.index()] {
            LatchPolicy::Immediate => self.fgbg,
            LatchPolicy::NextFrame => self.latched_fgbg,
        }
    }

    fn delays(&self) -> (i32, i32) {
        (
            i32::from(self.effective(REG_H_DELAY)),
            i32::from(self.effective(REG_V_DELAY)),
        )
    }

    fn render_row(&mut self, row: usize) {
        let fgbg = self.effective_fgbg();
        let (h, v) = self.delays();

        for col in 0..CARD_COLUMNS {
            let word = self.backtab[row * CARD_COLUMNS + col];
            let origin_x = PLAY_LEFT + h + (col * 8) as i32;
            let origin_y = PLAY_TOP + 2 * (v + (row * 8) as i32);

            if !fgbg && word & 0x1800 == 0x1000 {
                self.draw_colored_squares(word, origin_x, origin_y);
                continue;
            }

            let (fg, bg, from_gram, card) = if fgbg {
                let bg = ((word >> 9) & 3) | ((word >> 11) & 4) | ((word >> 9) & 8);
                (word & 7, bg, word & 0x0800 != 0, (word >> 3) & 0x3F)
            } else {
                if word & 0x2000 != 0 {
                    self.stack_index = (self.stack_index + 1) & 3;
                }
                let bg = self.effective(0x28 + self.stack_index);
                let from_gram = word & 0x0800 != 0;
                let card = if from_gram {
                    (word >> 3) & 0x3F
                } else {
                    (word >> 3) & 0xFF
                };
                ((word & 7) | ((word >> 9) & 8), bg, from_gram, card)
            };

            for py in 0..8 {
                let index = usize::from(card) * 8 + py;
                let bits = if from_gram {
                    self.gram[index]
                } else {
                    self.grom[index]
                };
                for px in 0..8 {
                    let set = bits & (0x80 >> px) != 0;
                    let color = if set { fg } else { bg };
                    self.put_card_pixel(origin_x + px, origin_y + 2 * py as i32, color, set);
                }
            }
        }
    }

    fn draw_colored_squares(&mut self, word: u16, origin_x: i32, origin_y: i32) {
        let stack = self.effective(0x28 + self.stack_index);
        let quadrants = [
            word & 7,
            (word >> 3) & 7,
            (word >> 6) & 7,
            ((word >> 9) & 3) | ((word >> 11) & 4),
        ];
        for (q, &c) in quadrants.iter().enumerate() {
            let qx = origin_x + (q as i32 & 1) * 4;
            let qy = origin_y + (q as i32 >> 1) * 8;
            let (color, foreground) = if c == 7 { (stack, false) } else { (c, true) };
            for py in 0..4 {
                for px in 0..4 {
                    self.put_card_pixel(qx + px, qy + 2 * py, color, foreground);
                }
            }
        }
    }

    /// Plot one card pixel (two framebuffer lines), clipped to the playfield.
    fn put_card_pixel(&mut self, x: i32, y: i32, color: u16, foreground: bool) {
        if x >= PLAY_RIGHT {
            return;
        }
        for line in [y, y + 1] {
            if line >= PLAY_BOTTOM {
                continue;
            }
            let idx = line as usize * FB_WIDTH + x as usize;
            self.framebuffer[idx] = PALETTE[usize::from(color)];
            self.fg_mask[idx] = foreground;
        }
    }

    fn in_border(&self, x: i32, y: i32) -> bool {
        let ext = self.effective(REG_BORDER_EXT);
        let left = if ext & 1 != 0 { PLAY_LEFT + 8 } else { PLAY_LEFT };
        let top = if ext & 2 != 0 { PLAY_TOP + 16 } else { PLAY_TOP };
        x < left || x >= PLAY_RIGHT || y < top || y >= PLAY_BOTTOM
    }

    fn composite_mobs(&mut self) {
        let (h, v) = self.delays();
        let mobs: Vec<Mob> = (0..8)
            .map(|i| {
                Mob::decode(
                    self.effective(i),
                    self.effective(0x08 + i),
                    self.effective(0x10 + i),
                    &self.grom,
                    &self.gram,
                    h,
                    v,
                )
            })
            .collect();

        let mut hits = [0u16; 8];
        for (i, mob) in mobs.iter().enumerate() {
            if !mob.interact {
                continue;
            }
            for (x, y) in mob.points() {
                if on_screen(x, y) {
                    if self.in_border(x, y) {
                        hits[i] |= 0x200;
                    } else if self.fg_mask[y as usize * FB_WIDTH + x as usize] {
                        hits[i] |= 0x100;
                    }
                }
                for (j, other) in mobs.iter().enumerate() {
                    if j != i && other.interact && other.covers(x, y) {
                        hits[i] |= 1 << j;
                    }
                }
            }
        }
        for (i, bits) in hits.iter().enumerate() {
            self.regs[0x18 + i] |= bits;
        }

        for mob in mobs.iter().rev() {
            if !mob.visible {
                continue;
            }
            let color = PALETTE[mob.color];
            for (x, y) in mob.points() {
                if !on_screen(x, y) || self.in_border(x, y) {
                    continue;
                }
                let idx = y as usize * FB_WIDTH + x as usize;
                if mob.behind && self.fg_mask[idx] {
                    continue;
                }
                self.framebuffer[idx] = color;
            }
        }
    }

    fn paint_border_extension(&mut self) {
        let ext = self.effective(REG_BORDER_EXT);
        if ext == 0 {
            return;
        }
        let border = PALETTE[usize::from(self.effective(REG_BORDER))];
        for y in PLAY_TOP..PLAY_BOTTOM {
            for x in PLAY_LEFT..PLAY_RIGHT {
                if self.in_border(x, y) {
                    self.framebuffer[y as usize * FB_WIDTH + x as usize] = border;
                }
            }
        }
    }

    /// Replace state with a snapshot, keeping GROM and the current picture.
    pub fn restore(&mut self, saved: Stic) {
        let grom = std::mem::take(&mut self.grom);
        let framebuffer = std::mem::take(&mut self.framebuffer);
        *self = saved;
        self.grom = grom;
        self.framebuffer = framebuffer;
    }
}

fn on_screen(x: i32, y: i32) -> bool {
    x >= 0 && y >= 0 && (x as usize) < FB_WIDTH && (y as usize) < FB_HEIGHT
}

impl Observable for Stic {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "frame" => Some(self.frame.into()),
            "cycle" => Some(self.cycle.into()),
            "display_enabled" => Some(self.display_enabled.into()),
            "display_armed" => Some(self.display_armed.into()),
            "bus_closed" => Some(self.in_active.into()),
            "mode" => Some(if self.fgbg { "fgbg" } else { "color_stack" }.into()),
            "border" => Some(self.regs[REG_BORDER].into()),
            "border_ext" => Some(self.regs[REG_BORDER_EXT].into()),
            "h_delay" => Some(self.regs[REG_H_DELAY].into()),
            "v_delay" => Some(self.regs[REG_V_DELAY].into()),
            "color_stack" => Some(Value::List(
                self.regs[0x28..0x2C].iter().map(|&c| c.into()).collect(),
            )),
            "collisions" => Some(Value::List(
                self.regs[0x18..0x20].iter().map(|&c| c.into()).collect(),
            )),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "frame",
            "cycle",
            "display_enabled",
            "display_armed",
            "bus_closed",
            "mode",
            "border",
            "border_ext",
            "h_delay",
            "v_delay",
            "color_stack",
            "collisions",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_length() {
        assert_eq!(CYCLES_PER_FRAME, 14_934);
        assert_eq!(VBLANK_CYCLES + CARD_ROWS as u64 * ROW_CYCLES, CYCLES_PER_FRAME);
    }

    #[test]
    fn reserved_registers_read_open() {
        let mut stic = Stic::new();
        stic.write(0x22, 0x1234);
        assert_eq!(stic.read(0x22), 0xFFFF);
        assert_eq!(stic.read(0x3F), 0xFFFF);
    }

    #[test]
    fn mode_register_switches() {
        let mut stic = Stic::new();
        stic.write(0x21, 0);
        assert_eq!(stic.query("mode"), Some(Value::Text("fgbg".into())));
        stic.read(0x21);
        assert_eq!(stic.query("mode"), Some(Value::Text("color_stack".into())));
    }

    #[test]
    fn reset_keeps_grom() {
        let mut stic = Stic::new();
        stic.load_grom(&[0xAA]);
        stic.write(0x2C, 3);
        stic.reset();
        assert_eq!(stic.read_grom(0), 0xAA);
        assert_eq!(stic.read(0x2C), 0xFFF0);
    }
}
