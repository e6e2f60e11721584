//! Instruction-level behaviour of the 6502 core.

use emu_core::{Bus, Cpu, CoreFault, Interrupt, SimpleBus};
use mos_6502::{Mos6502, flags};

/// Load a program at $0200 and point PC at it.
fn setup_program(bus: &mut SimpleBus, cpu: &mut Mos6502, program: &[u8]) {
    bus.load(0x0200, program);
    cpu.regs.pc = 0x0200;
}

/// Run `count` instructions and return the total cycles.
fn run(cpu: &mut Mos6502, bus: &mut SimpleBus, count: usize) -> u32 {
    (0..count).map(|_| cpu.step(bus).expect("instruction faulted")).sum()
}

#[test]
fn test_stack_pha_pla() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();

    let program = [
        0xA9, 0x42, // LDA #$42
        0xA2, 0xFF, // LDX #$FF
        0x9A, // TXS
        0x48, // PHA
        0xA9, 0x00, // LDA #$00
        0x68, // PLA
    ];
    setup_program(&mut bus, &mut cpu, &program);
    run(&mut cpu, &mut bus, 6);

    assert_eq!(cpu.regs.a, 0x42, "PLA should restore A");
    assert_eq!(cpu.regs.s, 0xFF);
}

#[test]
fn test_php_plp_ignores_break_bit() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();

    let program = [
        0xA2, 0xFF, // LDX #$FF
        0x9A, // TXS
        0x38, // SEC
        0x08, // PHP
        0x18, // CLC
        0x28, // PLP
    ];
    setup_program(&mut bus, &mut cpu, &program);
    run(&mut cpu, &mut bus, 4);
    assert_eq!(bus.peek(0x01FF) & 0x30, 0x30, "PHP pushes B and U");
    run(&mut cpu, &mut bus, 2);

    assert!(cpu.regs.p.is_set(flags::C));
    assert!(!cpu.regs.p.is_set(flags::B));
}

#[test]
fn test_brk_stack_layout() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    bus.write(0xFFFE, 0x00);
    bus.write(0xFFFF, 0x03);

    let program = [
        0xA2, 0xFF, // LDX #$FF    @ $0200
        0x9A, // TXS         @ $0202
        0x58, // CLI         @ $0203
        0x00, // BRK         @ $0204
        0xEA, // padding     @ $0205
    ];
    setup_program(&mut bus, &mut cpu, &program);
    let cycles = run(&mut cpu, &mut bus, 4);

    assert_eq!(cycles, 2 + 2 + 2 + 7);
    assert_eq!(cpu.pc(), 0x0300);
    assert_eq!(cpu.regs.s, 0xFC);
    assert!(cpu.regs.p.is_set(flags::I));
    assert_eq!(bus.peek(0x01FF), 0x02);
    assert_eq!(bus.peek(0x01FE), 0x06, "return address skips the padding byte");
    assert_eq!(bus.peek(0x01FD) & 0x34, 0x30, "B and U set, I clear");
}

#[test]
fn test_jsr_rts_round_trip() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    bus.load(0x0300, &[0xE8, 0x60]); // INX; RTS

    let program = [
        0xA2, 0xFF, // LDX #$FF
        0x9A, // TXS
        0xA2, 0x00, // LDX #$00
        0x20, 0x00, 0x03, // JSR $0300
        0xE8, // INX
    ];
    setup_program(&mut bus, &mut cpu, &program);
    let cycles = run(&mut cpu, &mut bus, 7);

    assert_eq!(cpu.regs.x, 2);
    assert_eq!(cpu.pc(), 0x0209);
    assert_eq!(cycles, 2 + 2 + 2 + 6 + 2 + 6 + 2);
}

#[test]
fn test_jmp_indirect_page_wrap() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    bus.write(0x10FF, 0x34);
    bus.write(0x1000, 0x12);
    bus.write(0x1100, 0x99);

    setup_program(&mut bus, &mut cpu, &[0x6C, 0xFF, 0x10]);
    assert_eq!(cpu.step(&mut bus), Ok(5));
    assert_eq!(cpu.pc(), 0x1234);
}

#[test]
fn test_branch_cycles() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();

    // At $02F0: BNE +$20 crosses into $0312.
    bus.load(0x02F0, &[0xD0, 0x20]);
    cpu.regs.pc = 0x02F0;
    cpu.regs.p.clear(flags::Z);
    assert_eq!(cpu.step(&mut bus), Ok(4));
    assert_eq!(cpu.pc(), 0x0312);

    // Not taken.
    bus.load(0x0312, &[0xF0, 0x10]);
    assert_eq!(cpu.step(&mut bus), Ok(2));
    assert_eq!(cpu.pc(), 0x0314);

    // Taken backwards within the page.
    bus.load(0x0314, &[0xD0, 0xFC]);
    assert_eq!(cpu.step(&mut bus), Ok(3));
    assert_eq!(cpu.pc(), 0x0312);
}

#[test]
fn test_adc_overflow_flags() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    setup_program(&mut bus, &mut cpu, &[0x18, 0xA9, 0x7F, 0x69, 0x01]);
    run(&mut cpu, &mut bus, 3);

    assert_eq!(cpu.regs.a, 0x80);
    assert!(cpu.regs.p.is_set(flags::V));
    assert!(cpu.regs.p.is_set(flags::N));
    assert!(!cpu.regs.p.is_set(flags::C));
}

#[test]
fn test_sbc_borrow() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    setup_program(&mut bus, &mut cpu, &[0x38, 0xA9, 0x00, 0xE9, 0x01]);
    run(&mut cpu, &mut bus, 3);

    assert_eq!(cpu.regs.a, 0xFF);
    assert!(!cpu.regs.p.is_set(flags::C), "borrow clears carry");
}

#[test]
fn test_rmw_dummy_write() {
    /// Records every write so the double write of INC is visible.
    struct Recorder {
        inner: SimpleBus,
        writes: Vec<(u16, u8)>,
    }
    impl Bus for Recorder {
        fn read(&mut self, address: u16) -> u8 {
            self.inner.read(address)
        }
        fn write(&mut self, address: u16, value: u8) {
            self.writes.push((address, value));
            self.inner.write(address, value);
        }
    }

    let mut bus = Recorder {
        inner: SimpleBus::new(),
        writes: Vec::new(),
    };
    bus.inner.load(0x0200, &[0xEE, 0x00, 0xD4]);
    bus.inner.write(0xD400, 0x41);
    let mut cpu = Mos6502::new();
    cpu.regs.pc = 0x0200;

    assert_eq!(cpu.step(&mut bus), Ok(6));
    assert_eq!(bus.writes, vec![(0xD400, 0x41), (0xD400, 0x42)]);
}

#[test]
fn test_illegal_lax_and_sax() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    bus.write(0x0010, 0xF0);
    setup_program(
        &mut bus,
        &mut cpu,
        &[
            0xA7, 0x10, // LAX $10
            0xA9, 0x3C, // LDA #$3C
            0x87, 0x20, // SAX $20
        ],
    );
    run(&mut cpu, &mut bus, 3);

    assert_eq!(cpu.regs.x, 0xF0);
    assert_eq!(bus.peek(0x0020), 0x30);
}

#[test]
fn test_illegal_dcp_and_isc() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    bus.write(0x0010, 0x43);
    bus.write(0x0011, 0x00);
    setup_program(
        &mut bus,
        &mut cpu,
        &[
            0xA9, 0x42, // LDA #$42
            0xC7, 0x10, // DCP $10 -> $42, compare equal
            0x38, // SEC
            0xE7, 0x11, // ISC $11 -> $01, A = $42 - $01
        ],
    );
    run(&mut cpu, &mut bus, 2);
    assert_eq!(bus.peek(0x0010), 0x42);
    assert!(cpu.regs.p.is_set(flags::Z));
    assert!(cpu.regs.p.is_set(flags::C));

    run(&mut cpu, &mut bus, 2);
    assert_eq!(bus.peek(0x0011), 0x01);
    assert_eq!(cpu.regs.a, 0x41);
}

#[test]
fn test_illegal_sbx() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    setup_program(
        &mut bus,
        &mut cpu,
        &[0xA9, 0x0F, 0xA2, 0x3C, 0xCB, 0x02],
    );
    run(&mut cpu, &mut bus, 3);
    assert_eq!(cpu.regs.x, 0x0A);
    assert!(cpu.regs.p.is_set(flags::C));
}

#[test]
fn test_nop_abs_x_page_penalty() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    setup_program(&mut bus, &mut cpu, &[0x1C, 0xFF, 0x12]);
    cpu.regs.x = 1;
    assert_eq!(cpu.step(&mut bus), Ok(5));
}

#[test]
fn test_every_jam_opcode_faults() {
    for opcode in [0x02u8, 0x12, 0x22, 0x32, 0x42, 0x52, 0x62, 0x72, 0x92, 0xB2, 0xD2, 0xF2] {
        let mut bus = SimpleBus::new();
        let mut cpu = Mos6502::new();
        setup_program(&mut bus, &mut cpu, &[opcode]);
        assert_eq!(
            cpu.step(&mut bus),
            Err(CoreFault::IllegalOpcode {
                pc: 0x0200,
                opcode: u16::from(opcode)
            })
        );
        assert!(cpu.is_halted());
    }
}

#[test]
fn test_irq_respects_i_flag() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    bus.write(0xFFFE, 0x00);
    bus.write(0xFFFF, 0x04);
    setup_program(&mut bus, &mut cpu, &[0xEA, 0x58, 0xEA]);
    cpu.regs.s = 0xFF;

    cpu.raise_interrupt(Interrupt::Irq);
    assert_eq!(cpu.step(&mut bus), Ok(2), "I set after reset: NOP runs");
    assert_eq!(cpu.step(&mut bus), Ok(2), "CLI");
    assert_eq!(cpu.step(&mut bus), Ok(7), "IRQ taken");
    assert_eq!(cpu.pc(), 0x0400);
    assert_eq!(bus.peek(0x01FD) & 0x10, 0, "B clear in pushed status");

    // Level held: the handler runs with I set, so no re-entry.
    bus.write(0x0400, 0xEA);
    assert_eq!(cpu.step(&mut bus), Ok(2));
}

#[test]
fn test_nmi_beats_irq() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    bus.load(0xFFFA, &[0x00, 0x05, 0x00, 0x00, 0x00, 0x04]);
    setup_program(&mut bus, &mut cpu, &[0x58]);
    cpu.step(&mut bus).unwrap();

    cpu.raise_interrupt(Interrupt::Irq);
    cpu.raise_interrupt(Interrupt::Nmi);
    cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.pc(), 0x0500);
}

#[test]
fn test_reset_loads_vector() {
    let mut bus = SimpleBus::new();
    bus.load(0xFFFC, &[0x00, 0xF8]);
    let mut cpu = Mos6502::new();
    cpu.reset(&mut bus);
    assert_eq!(cpu.pc(), 0xF800);
    assert!(cpu.regs.p.is_set(flags::I));
    assert_eq!(cpu.regs.s, 0xFD);
}
