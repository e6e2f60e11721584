//! CP1610 instruction execution.
//!
//! Opcode map (10-bit decle):
//!
//! | Range         | Group                                              |
//! |---------------|----------------------------------------------------|
//! | `$000-$007`   | HLT SDBD EIS DIS J/JSR TCI CLRC SETC               |
//! | `$008-$03F`   | INCR DECR COMR NEGR ADCR GSWD NOP SIN RSWD         |
//! | `$040-$07F`   | SWAP SLL RLC SLLC SLR SAR RRC SARC (1 or 2 bits)   |
//! | `$080-$1FF`   | MOVR ADDR SUBR CMPR ANDR XORR (register to reg.)   |
//! | `$200-$23F`   | Conditional branches, BEXT                         |
//! | `$240-$3FF`   | MVO MVI ADD SUB CMP AND XOR through memory         |
//!
//! Memory operand modes (bits 3-5): 0 direct (address follows),
//! 1-3 indirect through R1-R3, 4-5 indirect with post-increment,
//! 6 stack (pre-decrement read, post-increment write), 7 immediate.

use emu_core::{CoreFault, Cpu, Interrupt, Observable, Value, WordBus};
use serde::{Deserialize, Serialize};

use crate::Registers;

/// Intellivision Exec entry point.
pub const DEFAULT_RESET_VECTOR: u16 = 0x1000;
/// Intellivision interrupt service entry point.
pub const DEFAULT_INTERRUPT_VECTOR: u16 = 0x1004;

const INTERRUPT_CYCLES: u32 = 12;

/// The CP1610 CPU.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cp1610 {
    pub regs: Registers,
    /// Whether the previous instruction allows an interrupt to be taken
    /// before the next one.
    interruptible: bool,
    intrm_pending: bool,
    nmi_pending: bool,
    halted: bool,
    /// External branch conditions asserted for BEXT (bit per condition).
    external_conditions: u16,
    reset_vector: u16,
    interrupt_vector: u16,
    total_cycles: u64,
}

impl Default for Cp1610 {
    fn default() -> Self {
        Self::new()
    }
}

impl Cp1610 {
    #[must_use]
    pub fn new() -> Self {
        Self::with_vectors(DEFAULT_RESET_VECTOR, DEFAULT_INTERRUPT_VECTOR)
    }

    #[must_use]
    pub fn with_vectors(reset_vector: u16, interrupt_vector: u16) -> Self {
        let mut cpu = Self {
            regs: Registers::default(),
            interruptible: true,
            intrm_pending: false,
            nmi_pending: false,
            halted: false,
            external_conditions: 0,
            reset_vector,
            interrupt_vector,
            total_cycles: 0,
        };
        cpu.reset();
        cpu
    }

    /// Clear registers and flags and jump to the reset vector.
    pub fn reset(&mut self) {
        self.regs = Registers::default();
        self.regs.r[Registers::PC] = self.reset_vector;
        self.interruptible = true;
        self.intrm_pending = false;
        self.nmi_pending = false;
        self.halted = false;
    }

    /// Assert or release an external branch condition tested by BEXT.
    pub fn set_external_condition(&mut self, condition: u8, asserted: bool) {
        let bit = 1u16 << (condition & 0xF);
        if asserted {
            self.external_conditions |= bit;
        } else {
            self.external_conditions &= !bit;
        }
    }

    /// Account for cycles the STIC held the bus.
    pub fn stall(&mut self, cycles: u64) {
        self.total_cycles += cycles;
    }

    /// Execute one instruction or interrupt entry.
    pub fn step<B: WordBus>(&mut self, bus: &mut B) -> Result<u32, CoreFault> {
        if self.halted {
            return Err(CoreFault::Halted { pc: self.regs.pc() });
        }

        if self.interruptible
            && (self.nmi_pending || (self.intrm_pending && self.regs.i))
        {
            if self.nmi_pending {
                self.nmi_pending = false;
            } else {
                self.intrm_pending = false;
            }
            let return_address = self.regs.pc();
            self.push(bus, return_address);
            self.regs.r[Registers::PC] = self.interrupt_vector;
            self.total_cycles += u64::from(INTERRUPT_CYCLES);
            return Ok(INTERRUPT_CYCLES);
        }

        let pc = self.regs.pc();
        let opcode = self.fetch(bus);
        let double = self.regs.d;
        let (cycles, interruptible) = match self.execute(bus, opcode, double) {
            Ok(result) => result,
            Err(fault) => {
                self.regs.r[Registers::PC] = pc;
                return Err(match fault {
                    CoreFault::IllegalOpcode { opcode, .. } => {
                        CoreFault::IllegalOpcode { pc, opcode }
                    }
                    other => other,
                });
            }
        };
        if opcode != 0x001 {
            self.regs.d = false;
        }
        self.interruptible = interruptible;
        self.total_cycles += u64::from(cycles);
        Ok(cycles)
    }

    // ========================================================================
    // Bus helpers
    // ========================================================================

    fn fetch<B: WordBus>(&mut self, bus: &mut B) -> u16 {
        let pc = self.regs.pc();
        self.regs.r[Registers::PC] = pc.wrapping_add(1);
        bus.read(pc) & 0x3FF
    }

    /// Write at R6, then increment it.
    fn push<B: WordBus>(&mut self, bus: &mut B, value: u16) {
        let sp = self.regs.r[Registers::SP];
        bus.write(sp, value);
        self.regs.r[Registers::SP] = sp.wrapping_add(1);
    }

    /// Read one operand through mode `mode`, honouring SDBD.
    fn read_operand<B: WordBus>(&mut self, bus: &mut B, mode: usize, double: bool) -> u16 {
        match mode {
            0 => {
                let addr = self.fetch_address(bus);
                bus.read(addr)
            }
            1..=3 => {
                let addr = self.regs.r[mode];
                if double {
                    let lo = bus.read(addr) & 0xFF;
                    let hi = bus.read(addr) & 0xFF;
                    (hi << 8) | lo
                } else {
                    bus.read(addr)
                }
            }
            6 => {
                let mut take = || {
                    let sp = self.regs.r[Registers::SP].wrapping_sub(1);
                    self.regs.r[Registers::SP] = sp;
                    bus.read(sp)
                };
                if double {
                    let lo = take() & 0xFF;
                    let hi = take() & 0xFF;
                    (hi << 8) | lo
                } else {
                    take()
                }
            }
            _ => {
                let mut take = || {
                    let addr = self.regs.r[mode];
                    self.regs.r[mode] = addr.wrapping_add(1);
                    bus.read(addr)
                };
                if double {
                    let lo = take() & 0xFF;
                    let hi = take() & 0xFF;
                    (hi << 8) | lo
                } else {
                    take()
                }
            }
        }
    }

    fn write_operand<B: WordBus>(&mut self, bus: &mut B, mode: usize, value: u16) {
        match mode {
            0 => {
                let addr = self.fetch_address(bus);
                bus.write(addr, value);
            }
            1..=3 => bus.write(self.regs.r[mode], value),
            _ => {
                // R4, R5, R6 (push) and R7 (MVOI) all post-increment.
                let addr = self.regs.r[mode];
                self.regs.r[mode] = addr.wrapping_add(1);
                bus.write(addr, value);
            }
        }
    }

    /// Direct addresses are full 16-bit words in the instruction stream.
    fn fetch_address<B: WordBus>(&mut self, bus: &mut B) -> u16 {
        let pc = self.regs.pc();
        self.regs.r[Registers::PC] = pc.wrapping_add(1);
        bus.read(pc)
    }

    // ========================================================================
    // Decode
    // ========================================================================

    /// Execute `opcode`, returning its cycles and whether an interrupt may
    /// be taken before the next instruction.
    fn execute<B: WordBus>(
        &mut self,
        bus: &mut B,
        opcode: u16,
        double: bool,
    ) -> Result<(u32, bool), CoreFault> {
        let reg = (opcode & 7) as usize;
        Ok(match opcode {
            0x000 => {
                self.halted = true;
                (4, true)
            }
            0x001 => {
                self.regs.d = true;
                (4, false)
            }
            0x002 => {
                self.regs.i = true;
                (4, false)
            }
            0x003 => {
                self.regs.i = false;
                (4, false)
            }
            0x004 => self.jump(bus)?,
            // TCI drives a pin the Intellivision leaves unconnected.
            0x005 => (4, false),
            0x006 => {
                self.regs.c = false;
                (4, false)
            }
            0x007 => {
                self.regs.c = true;
                (4, false)
            }
            0x008..=0x00F => {
                let result = self.regs.r[reg].wrapping_add(1);
                self.regs.update_sz(result);
                (self.write_register(reg, result), true)
            }
            0x010..=0x017 => {
                let result = self.regs.r[reg].wrapping_sub(1);
                self.regs.update_sz(result);
                (self.write_register(reg, result), true)
            }
            0x018..=0x01F => {
                let result = !self.regs.r[reg];
                self.regs.update_sz(result);
                (self.write_register(reg, result), true)
            }
            0x020..=0x027 => {
                let result = self.sub(0, self.regs.r[reg]);
                (self.write_register(reg, result), true)
            }
            0x028..=0x02F => {
                let carry = u16::from(self.regs.c);
                let result = self.add(self.regs.r[reg], 0, carry);
                (self.write_register(reg, result), true)
            }
            0x030..=0x033 => {
                let nibble = self.regs.status_nibble();
                self.regs.r[(opcode & 3) as usize] = (nibble << 12) | (nibble << 4);
                (6, false)
            }
            0x034 | 0x035 => (6, true),
            // SIN pulses the PCIT pin; nothing listens on the Intellivision.
            0x036 | 0x037 => (6, true),
            0x038..=0x03F => {
                self.regs.set_status_nibble(self.regs.r[reg] >> 4);
                (6, true)
            }
            0x040..=0x07F => (self.shift(opcode), false),
            0x080..=0x1FF => (self.register_op(opcode), true),
            0x200..=0x23F => (self.branch(bus, opcode), true),
            _ => self.memory_op(bus, opcode, double),
        })
    }

    /// Store a register-to-register result; writes to R6/R7 cost a cycle.
    fn write_register(&mut self, reg: usize, value: u16) -> u32 {
        self.regs.r[reg] = value;
        if reg >= Registers::SP { 7 } else { 6 }
    }

    /// J, JE, JD, JSR, JSRE, JSRD.
    fn jump<B: WordBus>(&mut self, bus: &mut B) -> Result<(u32, bool), CoreFault> {
        let first = self.fetch(bus);
        let second = self.fetch(bus);
        let mode = first & 3;
        if mode == 3 {
            return Err(CoreFault::IllegalOpcode {
                pc: 0,
                opcode: 0x004,
            });
        }
        let link = (first >> 8) & 3;
        let target = ((first & 0xFC) << 8) | (second & 0x3FF);
        if link != 3 {
            self.regs.r[4 + link as usize] = self.regs.pc();
        }
        match mode {
            1 => self.regs.i = true,
            2 => self.regs.i = false,
            _ => {}
        }
        self.regs.r[Registers::PC] = target;
        Ok((12, true))
    }

    fn shift(&mut self, opcode: u16) -> u32 {
        let reg = (opcode & 3) as usize;
        let two = opcode & 4 != 0;
        let value = self.regs.r[reg];
        let (c, o) = (u16::from(self.regs.c), u16::from(self.regs.o));

        let result = match (opcode >> 3) & 7 {
            // SWAP
            0 => {
                let result = if two {
                    (value & 0xFF) | (value << 8)
                } else {
                    value.rotate_left(8)
                };
                self.regs.s = result & 0x80 != 0;
                self.regs.z = result == 0;
                result
            }
            // SLL
            1 => {
                let result = if two { value << 2 } else { value << 1 };
                self.regs.update_sz(result);
                result
            }
            // RLC
            2 => {
                let result = if two {
                    self.regs.o = value & 0x4000 != 0;
                    (value << 2) | (c << 1) | o
                } else {
                    (value << 1) | c
                };
                self.regs.c = value & 0x8000 != 0;
                self.regs.update_sz(result);
                result
            }
            // SLLC
            3 => {
                let result = if two {
                    self.regs.o = value & 0x4000 != 0;
                    value << 2
                } else {
                    value << 1
                };
                self.regs.c = value & 0x8000 != 0;
                self.regs.update_sz(result);
                result
            }
            // SLR
            4 => {
                let result = if two { value >> 2 } else { value >> 1 };
                self.update_sz_low(result);
                result
            }
            // SAR
            5 => {
                let result = ((value as i16) >> if two { 2 } else { 1 }) as u16;
                self.update_sz_low(result);
                result
            }
            // RRC
            6 => {
                let result = if two {
                    self.regs.o = value & 0x0002 != 0;
                    (value >> 2) | (c << 14) | (o << 15)
                } else {
                    (value >> 1) | (c << 15)
                };
                self.regs.c = value & 0x0001 != 0;
                self.update_sz_low(result);
                result
            }
            // SARC
            _ => {
                let result = if two {
                    self.regs.o = value & 0x0002 != 0;
                    ((value as i16) >> 2) as u16
                } else {
                    ((value as i16) >> 1) as u16
                };
                self.regs.c = value & 0x0001 != 0;
                self.update_sz_low(result);
                result
            }
        };
        self.regs.r[reg] = result;
        if two { 8 } else { 6 }
    }

    /// Right shifts take the sign from bit 7 of the result.
    fn update_sz_low(&mut self, result: u16) {
        self.regs.s = result & 0x80 != 0;
        self.regs.z = result == 0;
    }

    fn register_op(&mut self, opcode: u16) -> u32 {
        let src = ((opcode >> 3) & 7) as usize;
        let dst = (opcode & 7) as usize;
        let a = self.regs.r[src];
        let b = self.regs.r[dst];

        match (opcode >> 6) & 7 {
            // MOVR
            2 => {
                self.regs.update_sz(a);
                self.write_register(dst, a)
            }
            // ADDR
            3 => {
                let result = self.add(b, a, 0);
                self.write_register(dst, result)
            }
            // SUBR
            4 => {
                let result = self.sub(b, a);
                self.write_register(dst, result)
            }
            // CMPR
            5 => {
                self.sub(b, a);
                6
            }
            // ANDR
            6 => {
                let result = a & b;
                self.regs.update_sz(result);
                self.write_register(dst, result)
            }
            // XORR
            _ => {
                let result = a ^ b;
                self.regs.update_sz(result);
                self.write_register(dst, result)
            }
        }
    }

    fn branch<B: WordBus>(&mut self, bus: &mut B, opcode: u16) -> u32 {
        let displacement = self.fetch_address(bus);
        let condition = opcode & 0xF;

        let taken = if opcode & 0x10 != 0 {
            self.external_conditions & (1 << condition) != 0
        } else {
            let r = &self.regs;
            let met = match condition & 7 {
                0 => true,
                1 => r.c,
                2 => r.o,
                3 => !r.s,
                4 => r.z,
                5 => r.s != r.o,
                6 => r.z || r.s != r.o,
                _ => r.s != r.c,
            };
            met != (condition & 8 != 0)
        };

        if !taken {
            return 7;
        }
        let next = self.regs.pc();
        self.regs.r[Registers::PC] = if opcode & 0x20 != 0 {
            next.wrapping_sub(displacement).wrapping_sub(1)
        } else {
            next.wrapping_add(displacement)
        };
        9
    }

    fn memory_op<B: WordBus>(&mut self, bus: &mut B, opcode: u16, double: bool) -> (u32, bool) {
        let mode = ((opcode >> 3) & 7) as usize;
        let reg = (opcode & 7) as usize;
        let op = (opcode >> 6) & 7;

        // MVO
        if op == 1 {
            self.write_operand(bus, mode, self.regs.r[reg]);
            let cycles = if mode == 0 { 11 } else { 9 };
            return (cycles, false);
        }

        let value = self.read_operand(bus, mode, double);
        let target = self.regs.r[reg];
        match op {
            // MVI
            2 => self.regs.r[reg] = value,
            // ADD
            3 => self.regs.r[reg] = self.add(target, value, 0),
            // SUB
            4 => self.regs.r[reg] = self.sub(target, value),
            // CMP
            5 => {
                self.sub(target, value);
            }
            // AND
            6 => {
                let result = target & value;
                self.regs.update_sz(result);
                self.regs.r[reg] = result;
            }
            // XOR
            _ => {
                let result = target ^ value;
                self.regs.update_sz(result);
                self.regs.r[reg] = result;
            }
        }

        let mut cycles = match mode {
            0 => 10,
            6 => 11,
            _ => 8,
        };
        if double && mode != 0 {
            cycles += 2;
        }
        (cycles, true)
    }

    // ========================================================================
    // ALU
    // ========================================================================

    fn add(&mut self, a: u16, b: u16, carry: u16) -> u16 {
        let sum = u32::from(a) + u32::from(b) + u32::from(carry);
        let result = sum as u16;
        self.regs.c = sum > 0xFFFF;
        self.regs.o = (a ^ result) & (b ^ result) & 0x8000 != 0;
        self.regs.update_sz(result);
        result
    }

    /// `a - b` as `a + !b + 1`; C set when no borrow occurred.
    fn sub(&mut self, a: u16, b: u16) -> u16 {
        self.add(a, !b, 1)
    }
}

impl Cpu for Cp1610 {
    type Registers = Registers;

    /// INTRM is latched and consumed when the interrupt is taken.
    fn raise_interrupt(&mut self, kind: Interrupt) {
        match kind {
            Interrupt::Nmi => self.nmi_pending = true,
            Interrupt::Irq => self.intrm_pending = true,
        }
    }

    fn clear_interrupt(&mut self, kind: Interrupt) {
        match kind {
            Interrupt::Nmi => self.nmi_pending = false,
            Interrupt::Irq => self.intrm_pending = false,
        }
    }

    fn pc(&self) -> u16 {
        self.regs.pc()
    }

    fn registers(&self) -> Registers {
        self.regs
    }

    fn is_halted(&self) -> bool {
        self.halted
    }

    fn cycles(&self) -> u64 {
        self.total_cycles
    }
}

impl Observable for Cp1610 {
    fn query(&self, path: &str) -> Option<Value> {
        let r = &self.regs;
        match path {
            "r0" => Some(r.r[0].into()),
            "r1" => Some(r.r[1].into()),
            "r2" => Some(r.r[2].into()),
            "r3" => Some(r.r[3].into()),
            "r4" => Some(r.r[4].into()),
            "r5" => Some(r.r[5].into()),
            "r6" | "sp" => Some(r.r[6].into()),
            "r7" | "pc" => Some(r.r[7].into()),
            "flags.s" => Some(r.s.into()),
            "flags.z" => Some(r.z.into()),
            "flags.o" => Some(r.o.into()),
            "flags.c" => Some(r.c.into()),
            "flags.i" => Some(r.i.into()),
            "flags.d" => Some(r.d.into()),
            "intrm" => Some(self.intrm_pending.into()),
            "halted" => Some(self.halted.into()),
            "cycles" => Some(self.total_cycles.into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7", "flags.s", "flags.z", "flags.o",
            "flags.c", "flags.i", "flags.d", "intrm", "halted", "cycles",
        ]
    }
}
