//! 6502 instruction execution.
//!
//! Each call to [`Mos6502::step`] either services a pending interrupt or
//! fetches, decodes and executes one instruction, returning its cycle
//! count. Read-modify-write instructions perform the hardware's dummy
//! write of the unmodified value, which matters for memory-mapped chip
//! registers.
//!
//! | Vector  | Use        |
//! |---------|------------|
//! | `$FFFA` | NMI        |
//! | `$FFFC` | Reset      |
//! | `$FFFE` | IRQ / BRK  |

use emu_core::{Bus, CoreFault, Cpu, Interrupt, Observable, Value};
use serde::{Deserialize, Serialize};

use crate::flags::{C, D, I, N, V, Z};
use crate::{Registers, Status};

const NMI_VECTOR: u16 = 0xFFFA;
const RESET_VECTOR: u16 = 0xFFFC;
const IRQ_VECTOR: u16 = 0xFFFE;

/// Operand addressing modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    IndirectX,
    IndirectY,
}

/// The MOS 6502 CPU.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mos6502 {
    pub regs: Registers,
    /// NMI edge seen, not yet serviced.
    nmi_pending: bool,
    /// IRQ input level.
    irq_line: bool,
    /// A JAM opcode locked the processor.
    jammed: bool,
    total_cycles: u64,
}

impl Default for Mos6502 {
    fn default() -> Self {
        Self::new()
    }
}

impl Mos6502 {
    #[must_use]
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            nmi_pending: false,
            irq_line: false,
            jammed: false,
            total_cycles: 0,
        }
    }

    /// Execute one instruction or interrupt entry.
    pub fn step<B: Bus>(&mut self, bus: &mut B) -> Result<u32, CoreFault> {
        if self.jammed {
            return Err(CoreFault::Halted { pc: self.regs.pc });
        }

        let cycles = if self.nmi_pending {
            self.nmi_pending = false;
            self.enter_interrupt(bus, NMI_VECTOR)
        } else if self.irq_line && !self.regs.p.is_set(I) {
            self.enter_interrupt(bus, IRQ_VECTOR)
        } else {
            let pc = self.regs.pc;
            let opcode = self.fetch(bus);
            match self.execute(bus, opcode) {
                Some(cycles) => cycles,
                None => {
                    self.regs.pc = pc;
                    if is_jam(opcode) {
                        self.jammed = true;
                    }
                    return Err(CoreFault::IllegalOpcode {
                        pc,
                        opcode: u16::from(opcode),
                    });
                }
            }
        };

        self.total_cycles += u64::from(cycles);
        Ok(cycles)
    }

    /// Reset: registers to power-on values, PC from `$FFFC`.
    pub fn reset<B: Bus>(&mut self, bus: &mut B) {
        self.regs = Registers::new();
        self.nmi_pending = false;
        self.irq_line = false;
        self.jammed = false;
        self.regs.pc = Self::read_word(bus, RESET_VECTOR);
        self.total_cycles += 7;
    }

    /// Burn cycles while the bus belongs to someone else (ANTIC DMA,
    /// WSYNC).
    pub fn stall(&mut self, cycles: u64) {
        self.total_cycles += cycles;
    }

    // ========================================================================
    // Bus helpers
    // ========================================================================

    fn fetch<B: Bus>(&mut self, bus: &mut B) -> u8 {
        let value = bus.read(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        value
    }

    fn fetch_word<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let lo = self.fetch(bus);
        let hi = self.fetch(bus);
        u16::from_le_bytes([lo, hi])
    }

    fn read_word<B: Bus>(bus: &mut B, addr: u16) -> u16 {
        let lo = bus.read(addr);
        let hi = bus.read(addr.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    /// Pointer read that wraps within the zero page.
    fn read_zp_word<B: Bus>(bus: &mut B, zp: u8) -> u16 {
        let lo = bus.read(u16::from(zp));
        let hi = bus.read(u16::from(zp.wrapping_add(1)));
        u16::from_le_bytes([lo, hi])
    }

    fn push<B: Bus>(&mut self, bus: &mut B, value: u8) {
        let addr = self.regs.push();
        bus.write(addr, value);
    }

    fn pop<B: Bus>(&mut self, bus: &mut B) -> u8 {
        let addr = self.regs.pop();
        bus.read(addr)
    }

    fn push_word<B: Bus>(&mut self, bus: &mut B, value: u16) {
        self.push(bus, (value >> 8) as u8);
        self.push(bus, value as u8);
    }

    fn pop_word<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let lo = self.pop(bus);
        let hi = self.pop(bus);
        u16::from_le_bytes([lo, hi])
    }

    /// Resolve the effective address; the flag reports a page crossing
    /// for the indexed modes that pay a cycle for it.
    fn address<B: Bus>(&mut self, bus: &mut B, mode: Mode) -> (u16, bool) {
        match mode {
            Mode::Immediate => {
                let addr = self.regs.pc;
                self.regs.pc = self.regs.pc.wrapping_add(1);
                (addr, false)
            }
            Mode::ZeroPage => (u16::from(self.fetch(bus)), false),
            Mode::ZeroPageX => (u16::from(self.fetch(bus).wrapping_add(self.regs.x)), false),
            Mode::ZeroPageY => (u16::from(self.fetch(bus).wrapping_add(self.regs.y)), false),
            Mode::Absolute => (self.fetch_word(bus), false),
            Mode::AbsoluteX => {
                let base = self.fetch_word(bus);
                let addr = base.wrapping_add(u16::from(self.regs.x));
                (addr, crosses_page(base, addr))
            }
            Mode::AbsoluteY => {
                let base = self.fetch_word(bus);
                let addr = base.wrapping_add(u16::from(self.regs.y));
                (addr, crosses_page(base, addr))
            }
            Mode::IndirectX => {
                let zp = self.fetch(bus).wrapping_add(self.regs.x);
                (Self::read_zp_word(bus, zp), false)
            }
            Mode::IndirectY => {
                let zp = self.fetch(bus);
                let base = Self::read_zp_word(bus, zp);
                let addr = base.wrapping_add(u16::from(self.regs.y));
                (addr, crosses_page(base, addr))
            }
        }
    }

    /// Read an operand and apply `op`; indexed reads pay one cycle on a
    /// page crossing.
    fn load<B: Bus>(&mut self, bus: &mut B, mode: Mode, op: fn(&mut Self, u8), cycles: u32) -> u32 {
        let (addr, crossed) = self.address(bus, mode);
        let value = bus.read(addr);
        op(self, value);
        cycles + u32::from(crossed)
    }

    fn store<B: Bus>(&mut self, bus: &mut B, mode: Mode, value: u8, cycles: u32) -> u32 {
        let (addr, _) = self.address(bus, mode);
        bus.write(addr, value);
        cycles
    }

    fn modify<B: Bus>(
        &mut self,
        bus: &mut B,
        mode: Mode,
        op: fn(&mut Self, u8) -> u8,
        cycles: u32,
    ) -> u32 {
        let (addr, _) = self.address(bus, mode);
        let value = bus.read(addr);
        bus.write(addr, value);
        let result = op(self, value);
        bus.write(addr, result);
        cycles
    }

    fn branch<B: Bus>(&mut self, bus: &mut B, taken: bool) -> u32 {
        let offset = self.fetch(bus) as i8;
        if !taken {
            return 2;
        }
        let from = self.regs.pc;
        self.regs.pc = from.wrapping_add(offset as i16 as u16);
        if crosses_page(from, self.regs.pc) { 4 } else { 3 }
    }

    fn enter_interrupt<B: Bus>(&mut self, bus: &mut B, vector: u16) -> u32 {
        self.push_word(bus, self.regs.pc);
        self.push(bus, self.regs.p.to_byte_irq());
        self.regs.p.set(I);
        self.regs.pc = Self::read_word(bus, vector);
        7
    }

    // ========================================================================
    // Decode
    // ========================================================================

    /// Execute `opcode`; `None` for JAM and the unstable undocumented
    /// opcodes.
    fn execute<B: Bus>(&mut self, bus: &mut B, opcode: u8) -> Option<u32> {
        use Mode::{
            Absolute as Abs, AbsoluteX as Abx, AbsoluteY as Aby, Immediate as Imm,
            IndirectX as Izx, IndirectY as Izy, ZeroPage as Zp, ZeroPageX as Zpx,
            ZeroPageY as Zpy,
        };

        let cycles = match opcode {
            // Loads
            0xA9 => self.load(bus, Imm, Self::do_lda, 2),
            0xA5 => self.load(bus, Zp, Self::do_lda, 3),
            0xB5 => self.load(bus, Zpx, Self::do_lda, 4),
            0xAD => self.load(bus, Abs, Self::do_lda, 4),
            0xBD => self.load(bus, Abx, Self::do_lda, 4),
            0xB9 => self.load(bus, Aby, Self::do_lda, 4),
            0xA1 => self.load(bus, Izx, Self::do_lda, 6),
            0xB1 => self.load(bus, Izy, Self::do_lda, 5),
            0xA2 => self.load(bus, Imm, Self::do_ldx, 2),
            0xA6 => self.load(bus, Zp, Self::do_ldx, 3),
            0xB6 => self.load(bus, Zpy, Self::do_ldx, 4),
            0xAE => self.load(bus, Abs, Self::do_ldx, 4),
            0xBE => self.load(bus, Aby, Self::do_ldx, 4),
            0xA0 => self.load(bus, Imm, Self::do_ldy, 2),
            0xA4 => self.load(bus, Zp, Self::do_ldy, 3),
            0xB4 => self.load(bus, Zpx, Self::do_ldy, 4),
            0xAC => self.load(bus, Abs, Self::do_ldy, 4),
            0xBC => self.load(bus, Abx, Self::do_ldy, 4),

            // Stores
            0x85 => self.store(bus, Zp, self.regs.a, 3),
            0x95 => self.store(bus, Zpx, self.regs.a, 4),
            0x8D => self.store(bus, Abs, self.regs.a, 4),
            0x9D => self.store(bus, Abx, self.regs.a, 5),
            0x99 => self.store(bus, Aby, self.regs.a, 5),
            0x81 => self.store(bus, Izx, self.regs.a, 6),
            0x91 => self.store(bus, Izy, self.regs.a, 6),
            0x86 => self.store(bus, Zp, self.regs.x, 3),
            0x96 => self.store(bus, Zpy, self.regs.x, 4),
            0x8E => self.store(bus, Abs, self.regs.x, 4),
            0x84 => self.store(bus, Zp, self.regs.y, 3),
            0x94 => self.store(bus, Zpx, self.regs.y, 4),
            0x8C => self.store(bus, Abs, self.regs.y, 4),

            // Logic and arithmetic
            0x09 => self.load(bus, Imm, Self::do_ora, 2),
            0x05 => self.load(bus, Zp, Self::do_ora, 3),
            0x15 => self.load(bus, Zpx, Self::do_ora, 4),
            0x0D => self.load(bus, Abs, Self::do_ora, 4),
            0x1D => self.load(bus, Abx, Self::do_ora, 4),
            0x19 => self.load(bus, Aby, Self::do_ora, 4),
            0x01 => self.load(bus, Izx, Self::do_ora, 6),
            0x11 => self.load(bus, Izy, Self::do_ora, 5),
            0x29 => self.load(bus, Imm, Self::do_and, 2),
            0x25 => self.load(bus, Zp, Self::do_and, 3),
            0x35 => self.load(bus, Zpx, Self::do_and, 4),
            0x2D => self.load(bus, Abs, Self::do_and, 4),
            0x3D => self.load(bus, Abx, Self::do_and, 4),
            0x39 => self.load(bus, Aby, Self::do_and, 4),
            0x21 => self.load(bus, Izx, Self::do_and, 6),
            0x31 => self.load(bus, Izy, Self::do_and, 5),
            0x49 => self.load(bus, Imm, Self::do_eor, 2),
            0x45 => self.load(bus, Zp, Self::do_eor, 3),
            0x55 => self.load(bus, Zpx, Self::do_eor, 4),
            0x4D => self.load(bus, Abs, Self::do_eor, 4),
            0x5D => self.load(bus, Abx, Self::do_eor, 4),
            0x59 => self.load(bus, Aby, Self::do_eor, 4),
            0x41 => self.load(bus, Izx, Self::do_eor, 6),
            0x51 => self.load(bus, Izy, Self::do_eor, 5),
            0x69 => self.load(bus, Imm, Self::do_adc, 2),
            0x65 => self.load(bus, Zp, Self::do_adc, 3),
            0x75 => self.load(bus, Zpx, Self::do_adc, 4),
            0x6D => self.load(bus, Abs, Self::do_adc, 4),
            0x7D => self.load(bus, Abx, Self::do_adc, 4),
            0x79 => self.load(bus, Aby, Self::do_adc, 4),
            0x61 => self.load(bus, Izx, Self::do_adc, 6),
            0x71 => self.load(bus, Izy, Self::do_adc, 5),
            0xE9 | 0xEB => self.load(bus, Imm, Self::do_sbc, 2),
            0xE5 => self.load(bus, Zp, Self::do_sbc, 3),
            0xF5 => self.load(bus, Zpx, Self::do_sbc, 4),
            0xED => self.load(bus, Abs, Self::do_sbc, 4),
            0xFD => self.load(bus, Abx, Self::do_sbc, 4),
            0xF9 => self.load(bus, Aby, Self::do_sbc, 4),
            0xE1 => self.load(bus, Izx, Self::do_sbc, 6),
            0xF1 => self.load(bus, Izy, Self::do_sbc, 5),
            0xC9 => self.load(bus, Imm, Self::do_cmp, 2),
            0xC5 => self.load(bus, Zp, Self::do_cmp, 3),
            0xD5 => self.load(bus, Zpx, Self::do_cmp, 4),
            0xCD => self.load(bus, Abs, Self::do_cmp, 4),
            0xDD => self.load(bus, Abx, Self::do_cmp, 4),
            0xD9 => self.load(bus, Aby, Self::do_cmp, 4),
            0xC1 => self.load(bus, Izx, Self::do_cmp, 6),
            0xD1 => self.load(bus, Izy, Self::do_cmp, 5),
            0xE0 => self.load(bus, Imm, Self::do_cpx, 2),
            0xE4 => self.load(bus, Zp, Self::do_cpx, 3),
            0xEC => self.load(bus, Abs, Self::do_cpx, 4),
            0xC0 => self.load(bus, Imm, Self::do_cpy, 2),
            0xC4 => self.load(bus, Zp, Self::do_cpy, 3),
            0xCC => self.load(bus, Abs, Self::do_cpy, 4),
            0x24 => self.load(bus, Zp, Self::do_bit, 3),
            0x2C => self.load(bus, Abs, Self::do_bit, 4),

            // Shifts and increments
            0x0A => {
                self.regs.a = self.do_asl(self.regs.a);
                2
            }
            0x06 => self.modify(bus, Zp, Self::do_asl, 5),
            0x16 => self.modify(bus, Zpx, Self::do_asl, 6),
            0x0E => self.modify(bus, Abs, Self::do_asl, 6),
            0x1E => self.modify(bus, Abx, Self::do_asl, 7),
            0x4A => {
                self.regs.a = self.do_lsr(self.regs.a);
                2
            }
            0x46 => self.modify(bus, Zp, Self::do_lsr, 5),
            0x56 => self.modify(bus, Zpx, Self::do_lsr, 6),
            0x4E => self.modify(bus, Abs, Self::do_lsr, 6),
            0x5E => self.modify(bus, Abx, Self::do_lsr, 7),
            0x2A => {
                self.regs.a = self.do_rol(self.regs.a);
                2
            }
            0x26 => self.modify(bus, Zp, Self::do_rol, 5),
            0x36 => self.modify(bus, Zpx, Self::do_rol, 6),
            0x2E => self.modify(bus, Abs, Self::do_rol, 6),
            0x3E => self.modify(bus, Abx, Self::do_rol, 7),
            0x6A => {
                self.regs.a = self.do_ror(self.regs.a);
                2
            }
            0x66 => self.modify(bus, Zp, Self::do_ror, 5),
            0x76 => self.modify(bus, Zpx, Self::do_ror, 6),
            0x6E => self.modify(bus, Abs, Self::do_ror, 6),
            0x7E => self.modify(bus, Abx, Self::do_ror, 7),
            0xE6 => self.modify(bus, Zp, Self::do_inc, 5),
            0xF6 => self.modify(bus, Zpx, Self::do_inc, 6),
            0xEE => self.modify(bus, Abs, Self::do_inc, 6),
            0xFE => self.modify(bus, Abx, Self::do_inc, 7),
            0xC6 => self.modify(bus, Zp, Self::do_dec, 5),
            0xD6 => self.modify(bus, Zpx, Self::do_dec, 6),
            0xCE => self.modify(bus, Abs, Self::do_dec, 6),
            0xDE => self.modify(bus, Abx, Self::do_dec, 7),

            // Register transfers and steps
            0xAA => {
                self.regs.x = self.regs.a;
                self.regs.p.update_nz(self.regs.x);
                2
            }
            0x8A => {
                self.regs.a = self.regs.x;
                self.regs.p.update_nz(self.regs.a);
                2
            }
            0xA8 => {
                self.regs.y = self.regs.a;
                self.regs.p.update_nz(self.regs.y);
                2
            }
            0x98 => {
                self.regs.a = self.regs.y;
                self.regs.p.update_nz(self.regs.a);
                2
            }
            0xBA => {
                self.regs.x = self.regs.s;
                self.regs.p.update_nz(self.regs.x);
                2
            }
            0x9A => {
                self.regs.s = self.regs.x;
                2
            }
            0xE8 => {
                self.regs.x = self.do_inc(self.regs.x);
                2
            }
            0xCA => {
                self.regs.x = self.do_dec(self.regs.x);
                2
            }
            0xC8 => {
                self.regs.y = self.do_inc(self.regs.y);
                2
            }
            0x88 => {
                self.regs.y = self.do_dec(self.regs.y);
                2
            }

            // Flags
            0x18 => self.flag(C, false),
            0x38 => self.flag(C, true),
            0x58 => self.flag(I, false),
            0x78 => self.flag(I, true),
            0xD8 => self.flag(D, false),
            0xF8 => self.flag(D, true),
            0xB8 => self.flag(V, false),

            // Stack
            0x48 => {
                self.push(bus, self.regs.a);
                3
            }
            0x08 => {
                self.push(bus, self.regs.p.to_byte_brk());
                3
            }
            0x68 => {
                let value = self.pop(bus);
                self.do_lda(value);
                4
            }
            0x28 => {
                let value = self.pop(bus);
                self.regs.p = Status::from_byte(value);
                4
            }

            // Flow control
            0x4C => {
                self.regs.pc = self.fetch_word(bus);
                3
            }
            0x6C => {
                let ptr = self.fetch_word(bus);
                // The high byte is fetched without carrying into the page.
                let lo = bus.read(ptr);
                let hi = bus.read((ptr & 0xFF00) | (ptr.wrapping_add(1) & 0x00FF));
                self.regs.pc = u16::from_le_bytes([lo, hi]);
                5
            }
            0x20 => {
                let target = self.fetch_word(bus);
                self.push_word(bus, self.regs.pc.wrapping_sub(1));
                self.regs.pc = target;
                6
            }
            0x60 => {
                self.regs.pc = self.pop_word(bus).wrapping_add(1);
                6
            }
            0x40 => {
                let status = self.pop(bus);
                self.regs.p = Status::from_byte(status);
                self.regs.pc = self.pop_word(bus);
                6
            }
            0x00 => {
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.push_word(bus, self.regs.pc);
                self.push(bus, self.regs.p.to_byte_brk());
                self.regs.p.set(I);
                self.regs.pc = Self::read_word(bus, IRQ_VECTOR);
                7
            }
            0x10 => self.branch(bus, !self.regs.p.is_set(N)),
            0x30 => self.branch(bus, self.regs.p.is_set(N)),
            0x50 => self.branch(bus, !self.regs.p.is_set(V)),
            0x70 => self.branch(bus, self.regs.p.is_set(V)),
            0x90 => self.branch(bus, !self.regs.p.is_set(C)),
            0xB0 => self.branch(bus, self.regs.p.is_set(C)),
            0xD0 => self.branch(bus, !self.regs.p.is_set(Z)),
            0xF0 => self.branch(bus, self.regs.p.is_set(Z)),

            // NOP, documented and undocumented
            0xEA | 0x1A | 0x3A | 0x5A | 0x7A | 0xDA | 0xFA => 2,
            0x80 | 0x82 | 0x89 | 0xC2 | 0xE2 => self.load(bus, Imm, Self::do_nop, 2),
            0x04 | 0x44 | 0x64 => self.load(bus, Zp, Self::do_nop, 3),
            0x14 | 0x34 | 0x54 | 0x74 | 0xD4 | 0xF4 => self.load(bus, Zpx, Self::do_nop, 4),
            0x0C => self.load(bus, Abs, Self::do_nop, 4),
            0x1C | 0x3C | 0x5C | 0x7C | 0xDC | 0xFC => self.load(bus, Abx, Self::do_nop, 4),

            // Stable undocumented combinations
            0xA7 => self.load(bus, Zp, Self::do_lax, 3),
            0xB7 => self.load(bus, Zpy, Self::do_lax, 4),
            0xAF => self.load(bus, Abs, Self::do_lax, 4),
            0xBF => self.load(bus, Aby, Self::do_lax, 4),
            0xA3 => self.load(bus, Izx, Self::do_lax, 6),
            0xB3 => self.load(bus, Izy, Self::do_lax, 5),
            0x87 => self.store(bus, Zp, self.regs.a & self.regs.x, 3),
            0x97 => self.store(bus, Zpy, self.regs.a & self.regs.x, 4),
            0x8F => self.store(bus, Abs, self.regs.a & self.regs.x, 4),
            0x83 => self.store(bus, Izx, self.regs.a & self.regs.x, 6),
            0x0B | 0x2B => self.load(bus, Imm, Self::do_anc, 2),
            0x4B => self.load(bus, Imm, Self::do_alr, 2),
            0x6B => self.load(bus, Imm, Self::do_arr, 2),
            0xCB => self.load(bus, Imm, Self::do_sbx, 2),

            0x07 => self.modify(bus, Zp, Self::do_slo, 5),
            0x17 => self.modify(bus, Zpx, Self::do_slo, 6),
            0x0F => self.modify(bus, Abs, Self::do_slo, 6),
            0x1F => self.modify(bus, Abx, Self::do_slo, 7),
            0x1B => self.modify(bus, Aby, Self::do_slo, 7),
            0x03 => self.modify(bus, Izx, Self::do_slo, 8),
            0x13 => self.modify(bus, Izy, Self::do_slo, 8),
            0x27 => self.modify(bus, Zp, Self::do_rla, 5),
            0x37 => self.modify(bus, Zpx, Self::do_rla, 6),
            0x2F => self.modify(bus, Abs, Self::do_rla, 6),
            0x3F => self.modify(bus, Abx, Self::do_rla, 7),
            0x3B => self.modify(bus, Aby, Self::do_rla, 7),
            0x23 => self.modify(bus, Izx, Self::do_rla, 8),
            0x33 => self.modify(bus, Izy, Self::do_rla, 8),
            0x47 => self.modify(bus, Zp, Self::do_sre, 5),
            0x57 => self.modify(bus, Zpx, Self::do_sre, 6),
            0x4F => self.modify(bus, Abs, Self::do_sre, 6),
            0x5F => self.modify(bus, Abx, Self::do_sre, 7),
            0x5B => self.modify(bus, Aby, Self::do_sre, 7),
            0x43 => self.modify(bus, Izx, Self::do_sre, 8),
            0x53 => self.modify(bus, Izy, Self::do_sre, 8),
            0x67 => self.modify(bus, Zp, Self::do_rra, 5),
            0x77 => self.modify(bus, Zpx, Self::do_rra, 6),
            0x6F => self.modify(bus, Abs, Self::do_rra, 6),
            0x7F => self.modify(bus, Abx, Self::do_rra, 7),
            0x7B => self.modify(bus, Aby, Self::do_rra, 7),
            0x63 => self.modify(bus, Izx, Self::do_rra, 8),
            0x73 => self.modify(bus, Izy, Self::do_rra, 8),
            0xC7 => self.modify(bus, Zp, Self::do_dcp, 5),
            0xD7 => self.modify(bus, Zpx, Self::do_dcp, 6),
            0xCF => self.modify(bus, Abs, Self::do_dcp, 6),
            0xDF => self.modify(bus, Abx, Self::do_dcp, 7),
            0xDB => self.modify(bus, Aby, Self::do_dcp, 7),
            0xC3 => self.modify(bus, Izx, Self::do_dcp, 8),
            0xD3 => self.modify(bus, Izy, Self::do_dcp, 8),
            0xE7 => self.modify(bus, Zp, Self::do_isc, 5),
            0xF7 => self.modify(bus, Zpx, Self::do_isc, 6),
            0xEF => self.modify(bus, Abs, Self::do_isc, 6),
            0xFF => self.modify(bus, Abx, Self::do_isc, 7),
            0xFB => self.modify(bus, Aby, Self::do_isc, 7),
            0xE3 => self.modify(bus, Izx, Self::do_isc, 8),
            0xF3 => self.modify(bus, Izy, Self::do_isc, 8),

            // JAM and the unstable group (XAA, LXA, AHX, SHX, SHY, TAS, LAS)
            _ => return None,
        };
        Some(cycles)
    }

    fn flag(&mut self, flag: u8, value: bool) -> u32 {
        self.regs.p.set_if(flag, value);
        2
    }

    // ========================================================================
    // ALU
    // ========================================================================

    fn do_nop(&mut self, _val: u8) {}

    fn do_lda(&mut self, val: u8) {
        self.regs.a = val;
        self.regs.p.update_nz(val);
    }

    fn do_ldx(&mut self, val: u8) {
        self.regs.x = val;
        self.regs.p.update_nz(val);
    }

    fn do_ldy(&mut self, val: u8) {
        self.regs.y = val;
        self.regs.p.update_nz(val);
    }

    fn do_lax(&mut self, val: u8) {
        self.regs.a = val;
        self.regs.x = val;
        self.regs.p.update_nz(val);
    }

    fn do_ora(&mut self, val: u8) {
        self.regs.a |= val;
        self.regs.p.update_nz(self.regs.a);
    }

    fn do_and(&mut self, val: u8) {
        self.regs.a &= val;
        self.regs.p.update_nz(self.regs.a);
    }

    fn do_eor(&mut self, val: u8) {
        self.regs.a ^= val;
        self.regs.p.update_nz(self.regs.a);
    }

    fn do_adc(&mut self, val: u8) {
        if self.regs.p.is_set(D) {
            self.do_adc_decimal(val);
        } else {
            self.do_adc_binary(val);
        }
    }

    fn do_adc_binary(&mut self, val: u8) {
        let a = self.regs.a;
        let sum = u16::from(a) + u16::from(val) + u16::from(self.regs.p.carry());
        let result = sum as u8;
        self.regs.p.set_if(C, sum > 0xFF);
        self.regs
            .p
            .set_if(V, (a ^ result) & (val ^ result) & 0x80 != 0);
        self.regs.a = result;
        self.regs.p.update_nz(result);
    }

    /// NMOS decimal add: Z comes from the binary sum, N and V from the
    /// intermediate high nibble.
    fn do_adc_decimal(&mut self, val: u8) {
        let a = self.regs.a;
        let carry = self.regs.p.carry();

        let mut lo = (a & 0x0F) + (val & 0x0F) + carry;
        if lo > 9 {
            lo += 6;
        }
        let mut hi = (a >> 4) + (val >> 4) + u8::from(lo > 0x0F);

        let binary = a.wrapping_add(val).wrapping_add(carry);
        self.regs.p.set_if(Z, binary == 0);
        self.regs.p.set_if(N, hi & 0x08 != 0);
        let partial = hi << 4;
        self.regs
            .p
            .set_if(V, (a ^ partial) & (val ^ partial) & 0x80 != 0 && (a ^ val) & 0x80 == 0);

        if hi > 9 {
            hi += 6;
        }
        self.regs.p.set_if(C, hi > 0x0F);
        self.regs.a = (hi << 4) | (lo & 0x0F);
    }

    fn do_sbc(&mut self, val: u8) {
        if self.regs.p.is_set(D) {
            self.do_sbc_decimal(val);
        } else {
            self.do_adc_binary(!val);
        }
    }

    /// NMOS decimal subtract: every flag follows the binary result.
    fn do_sbc_decimal(&mut self, val: u8) {
        let a = self.regs.a;
        let borrow = i16::from(1 - self.regs.p.carry());

        let binary = i16::from(a) - i16::from(val) - borrow;
        self.regs.p.set_if(C, binary >= 0);
        self.regs.p.set_if(Z, binary as u8 == 0);
        self.regs.p.set_if(N, binary & 0x80 != 0);
        self.regs.p.set_if(
            V,
            (i16::from(a) ^ binary) & (i16::from(a) ^ i16::from(val)) & 0x80 != 0,
        );

        let mut lo = i16::from(a & 0x0F) - i16::from(val & 0x0F) - borrow;
        let mut hi = i16::from(a >> 4) - i16::from(val >> 4);
        if lo < 0 {
            lo -= 6;
            hi -= 1;
        }
        if hi < 0 {
            hi -= 6;
        }
        self.regs.a = ((hi << 4) as u8) | ((lo & 0x0F) as u8);
    }

    fn compare(&mut self, register: u8, val: u8) {
        self.regs.p.set_if(C, register >= val);
        self.regs.p.update_nz(register.wrapping_sub(val));
    }

    fn do_cmp(&mut self, val: u8) {
        self.compare(self.regs.a, val);
    }

    fn do_cpx(&mut self, val: u8) {
        self.compare(self.regs.x, val);
    }

    fn do_cpy(&mut self, val: u8) {
        self.compare(self.regs.y, val);
    }

    fn do_bit(&mut self, val: u8) {
        self.regs.p.set_if(Z, self.regs.a & val == 0);
        self.regs.p.set_if(N, val & 0x80 != 0);
        self.regs.p.set_if(V, val & 0x40 != 0);
    }

    fn do_asl(&mut self, val: u8) -> u8 {
        self.regs.p.set_if(C, val & 0x80 != 0);
        let result = val << 1;
        self.regs.p.update_nz(result);
        result
    }

    fn do_lsr(&mut self, val: u8) -> u8 {
        self.regs.p.set_if(C, val & 0x01 != 0);
        let result = val >> 1;
        self.regs.p.update_nz(result);
        result
    }

    fn do_rol(&mut self, val: u8) -> u8 {
        let carry = self.regs.p.carry();
        self.regs.p.set_if(C, val & 0x80 != 0);
        let result = (val << 1) | carry;
        self.regs.p.update_nz(result);
        result
    }

    fn do_ror(&mut self, val: u8) -> u8 {
        let carry = self.regs.p.carry() << 7;
        self.regs.p.set_if(C, val & 0x01 != 0);
        let result = (val >> 1) | carry;
        self.regs.p.update_nz(result);
        result
    }

    fn do_inc(&mut self, val: u8) -> u8 {
        let result = val.wrapping_add(1);
        self.regs.p.update_nz(result);
        result
    }

    fn do_dec(&mut self, val: u8) -> u8 {
        let result = val.wrapping_sub(1);
        self.regs.p.update_nz(result);
        result
    }

    fn do_slo(&mut self, val: u8) -> u8 {
        let result = self.do_asl(val);
        self.do_ora(result);
        result
    }

    fn do_rla(&mut self, val: u8) -> u8 {
        let result = self.do_rol(val);
        self.do_and(result);
        result
    }

    fn do_sre(&mut self, val: u8) -> u8 {
        let result = self.do_lsr(val);
        self.do_eor(result);
        result
    }

    fn do_rra(&mut self, val: u8) -> u8 {
        let result = self.do_ror(val);
        self.do_adc(result);
        result
    }

    fn do_dcp(&mut self, val: u8) -> u8 {
        let result = val.wrapping_sub(1);
        self.do_cmp(result);
        result
    }

    fn do_isc(&mut self, val: u8) -> u8 {
        let result = val.wrapping_add(1);
        self.do_sbc(result);
        result
    }

    fn do_anc(&mut self, val: u8) {
        self.do_and(val);
        let negative = self.regs.p.is_set(N);
        self.regs.p.set_if(C, negative);
    }

    fn do_alr(&mut self, val: u8) {
        self.regs.a &= val;
        self.regs.a = self.do_lsr(self.regs.a);
    }

    /// AND then ROR A; C from bit 6, V from bit 6 xor bit 5 (binary mode).
    fn do_arr(&mut self, val: u8) {
        let anded = self.regs.a & val;
        let result = (anded >> 1) | (self.regs.p.carry() << 7);
        self.regs.a = result;
        self.regs.p.update_nz(result);
        self.regs.p.set_if(C, result & 0x40 != 0);
        self.regs
            .p
            .set_if(V, ((result >> 6) ^ (result >> 5)) & 1 != 0);
    }

    fn do_sbx(&mut self, val: u8) {
        let source = self.regs.a & self.regs.x;
        self.regs.p.set_if(C, source >= val);
        self.regs.x = source.wrapping_sub(val);
        self.regs.p.update_nz(self.regs.x);
    }
}

fn crosses_page(a: u16, b: u16) -> bool {
    a & 0xFF00 != b & 0xFF00
}

fn is_jam(opcode: u8) -> bool {
    matches!(
        opcode,
        0x02 | 0x12 | 0x22 | 0x32 | 0x42 | 0x52 | 0x62 | 0x72 | 0x92 | 0xB2 | 0xD2 | 0xF2
    )
}

impl Cpu for Mos6502 {
    type Registers = Registers;

    fn raise_interrupt(&mut self, kind: Interrupt) {
        match kind {
            Interrupt::Nmi => self.nmi_pending = true,
            Interrupt::Irq => self.irq_line = true,
        }
    }

    fn clear_interrupt(&mut self, kind: Interrupt) {
        match kind {
            Interrupt::Nmi => self.nmi_pending = false,
            Interrupt::Irq => self.irq_line = false,
        }
    }

    fn pc(&self) -> u16 {
        self.regs.pc
    }

    fn registers(&self) -> Registers {
        self.regs
    }

    fn is_halted(&self) -> bool {
        self.jammed
    }

    fn cycles(&self) -> u64 {
        self.total_cycles
    }
}

impl Observable for Mos6502 {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "pc" => Some(self.regs.pc.into()),
            "a" => Some(self.regs.a.into()),
            "x" => Some(self.regs.x.into()),
            "y" => Some(self.regs.y.into()),
            "s" | "sp" => Some(self.regs.s.into()),
            "p" | "status" => Some(self.regs.p.0.into()),
            "flags.c" => Some(self.regs.p.is_set(C).into()),
            "flags.z" => Some(self.regs.p.is_set(Z).into()),
            "flags.i" => Some(self.regs.p.is_set(I).into()),
            "flags.d" => Some(self.regs.p.is_set(D).into()),
            "flags.v" => Some(self.regs.p.is_set(V).into()),
            "flags.n" => Some(self.regs.p.is_set(N).into()),
            "cycles" => Some(self.total_cycles.into()),
            "irq_line" => Some(self.irq_line.into()),
            "jammed" => Some(self.jammed.into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "pc", "a", "x", "y", "s", "p", "flags.c", "flags.z", "flags.i", "flags.d", "flags.v",
            "flags.n", "cycles", "irq_line", "jammed",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emu_core::SimpleBus;

    fn run(program: &[u8]) -> (Mos6502, SimpleBus) {
        let mut bus = SimpleBus::new();
        bus.load(0x0200, program);
        let mut cpu = Mos6502::new();
        cpu.regs.pc = 0x0200;
        (cpu, bus)
    }

    #[test]
    fn lda_immediate() {
        let (mut cpu, mut bus) = run(&[0xA9, 0x42]);
        assert_eq!(cpu.step(&mut bus), Ok(2));
        assert_eq!(cpu.regs.a, 0x42);
        assert_eq!(cpu.regs.pc, 0x0202);
    }

    #[test]
    fn absolute_x_page_cross_costs_a_cycle() {
        let (mut cpu, mut bus) = run(&[0xBD, 0xFF, 0x10, 0xBD, 0x00, 0x10]);
        cpu.regs.x = 1;
        assert_eq!(cpu.step(&mut bus), Ok(5));
        assert_eq!(cpu.step(&mut bus), Ok(4));
    }

    #[test]
    fn store_never_pays_page_penalty() {
        let (mut cpu, mut bus) = run(&[0x9D, 0xFF, 0x10]);
        cpu.regs.x = 1;
        cpu.regs.a = 0x77;
        assert_eq!(cpu.step(&mut bus), Ok(5));
        assert_eq!(bus.peek(0x1100), 0x77);
    }

    #[test]
    fn decimal_adc() {
        // SED; CLC; LDA #$19; ADC #$28
        let (mut cpu, mut bus) = run(&[0xF8, 0x18, 0xA9, 0x19, 0x69, 0x28]);
        for _ in 0..4 {
            cpu.step(&mut bus).unwrap();
        }
        assert_eq!(cpu.regs.a, 0x47);
        assert!(!cpu.regs.p.is_set(C));
    }

    #[test]
    fn decimal_sbc_borrows() {
        // SED; SEC; LDA #$10; SBC #$01
        let (mut cpu, mut bus) = run(&[0xF8, 0x38, 0xA9, 0x10, 0xE9, 0x01]);
        for _ in 0..4 {
            cpu.step(&mut bus).unwrap();
        }
        assert_eq!(cpu.regs.a, 0x09);
        assert!(cpu.regs.p.is_set(C));
    }

    #[test]
    fn jam_faults_then_halts() {
        let (mut cpu, mut bus) = run(&[0x02]);
        assert_eq!(
            cpu.step(&mut bus),
            Err(CoreFault::IllegalOpcode {
                pc: 0x0200,
                opcode: 0x02
            })
        );
        assert!(cpu.jammed);
        assert_eq!(cpu.step(&mut bus), Err(CoreFault::Halted { pc: 0x0200 }));
    }

    #[test]
    fn unstable_opcode_faults_without_jamming() {
        let (mut cpu, mut bus) = run(&[0x8B, 0x00]);
        assert!(matches!(
            cpu.step(&mut bus),
            Err(CoreFault::IllegalOpcode { opcode: 0x8B, .. })
        ));
        assert!(!cpu.jammed);
    }
}
