//! POKEY timers, keypad, pots and audio output.

use atari_pokey::{POKEY_IRQ, POT_MAX, POT_STEP_CYCLES, Pokey};
use emu_core::ProcessorBus;

const CPU_HZ: u64 = 1_789_790;

fn pokey() -> (Pokey, ProcessorBus) {
    (Pokey::new(CPU_HZ, 48_000), ProcessorBus::new())
}

fn drain(pokey: &mut Pokey) -> Vec<i16> {
    let out = pokey.output_mut();
    let samples = out.samples().to_vec();
    out.consume(samples.len());
    samples
}

#[test]
fn timer1_interrupt_at_64khz() {
    let (mut p, mut bus) = pokey();
    p.write(0x0E, 0x01);
    p.write(0x00, 9);
    p.write(0x09, 0);
    p.advance(279, &mut bus);
    assert!(!bus.is_asserted(POKEY_IRQ));
    p.advance(1, &mut bus);
    assert!(bus.is_asserted(POKEY_IRQ));
    assert_eq!(p.read(0x0E), 0xFE);

    p.write(0x0E, 0x00);
    p.advance(1, &mut bus);
    assert!(!bus.is_asserted(POKEY_IRQ));
    assert_eq!(p.read(0x0E), 0xFF);
}

#[test]
fn fast_clock_divides_by_audf_plus_four() {
    let (mut p, mut bus) = pokey();
    p.write(0x08, 0x40);
    p.write(0x0E, 0x01);
    p.write(0x00, 0);
    p.write(0x09, 0);
    p.advance(3, &mut bus);
    assert!(!bus.is_asserted(POKEY_IRQ));
    p.advance(1, &mut bus);
    assert!(bus.is_asserted(POKEY_IRQ));
}

#[test]
fn joined_channels_count_sixteen_bits() {
    let (mut p, mut bus) = pokey();
    p.write(0x08, 0x50);
    p.write(0x0E, 0x02);
    p.write(0x00, 0x10);
    p.write(0x02, 0x01);
    p.write(0x09, 0);
    p.advance(0x0110 + 6, &mut bus);
    assert!(!bus.is_asserted(POKEY_IRQ));
    p.advance(1, &mut bus);
    assert!(bus.is_asserted(POKEY_IRQ));
}

#[test]
fn keypad_sets_kbcode_and_interrupts() {
    let (mut p, mut bus) = pokey();
    p.write(0x0F, 0x02);
    p.write(0x0E, 0x40);
    p.set_key(Some(0x1E));
    p.advance(1, &mut bus);
    assert!(bus.is_asserted(POKEY_IRQ));
    assert_eq!(p.read(0x09), 0x1E);
    assert_eq!(p.read(0x0F) & 0x04, 0);

    p.set_key(None);
    assert_eq!(p.read(0x0F) & 0x04, 0x04);
}

#[test]
fn keypad_ignored_without_scanning() {
    let (mut p, mut bus) = pokey();
    p.write(0x0E, 0x40);
    p.set_key(Some(0x1E));
    p.advance(1, &mut bus);
    assert!(!bus.is_asserted(POKEY_IRQ));
}

#[test]
fn top_button_clears_skstat_bit3() {
    let (mut p, _) = pokey();
    p.set_top_button(true);
    assert_eq!(p.read(0x0F) & 0x08, 0);
    p.set_top_button(false);
    assert_eq!(p.read(0x0F) & 0x08, 0x08);
}

#[test]
fn pot_scan_counts_per_line() {
    let (mut p, mut bus) = pokey();
    p.set_pot(0, 10);
    p.set_pot(1, POT_MAX);
    p.write(0x0B, 0);
    assert_eq!(p.read(0x08), 0xFF);

    p.advance(u64::from(POT_STEP_CYCLES) * 10, &mut bus);
    let allpot = p.read(0x08);
    assert_eq!(allpot & 0x01, 0);
    assert_eq!(allpot & 0x02, 0x02);
    assert_eq!(p.read(0x00), 10);
    assert_eq!(p.read(0x01), 10);

    p.advance(u64::from(POT_STEP_CYCLES) * 218, &mut bus);
    assert_eq!(p.read(0x08), 0);
    assert_eq!(p.read(0x01), POT_MAX);
}

#[test]
fn random_needs_skctl() {
    let (mut p, mut bus) = pokey();
    assert_eq!(p.read(0x0A), 0xFF);
    p.write(0x0F, 0x03);
    let mut seen = Vec::new();
    for _ in 0..64 {
        p.advance(1, &mut bus);
        seen.push(p.read(0x0A));
    }
    assert!(seen.iter().any(|&r| r != seen[0]));
}

#[test]
fn volume_only_outputs_constant_level() {
    let (mut p, mut bus) = pokey();
    p.write(0x01, 0x1F);
    p.advance(2000, &mut bus);
    let samples = drain(&mut p);
    assert!(!samples.is_empty());
    assert!(samples.iter().all(|&s| s == 15 * 511));
}

#[test]
fn pure_tone_toggles() {
    let (mut p, mut bus) = pokey();
    p.write(0x00, 50);
    p.write(0x01, 0xAF);
    p.advance(20_000, &mut bus);
    let samples = drain(&mut p);
    assert!(samples.contains(&0));
    assert!(samples.contains(&(15 * 511)));
}
