//! STIC frame timing, rendering and collision behaviour.

use emu_core::{Observable, ProcessorBus, Value};
use gi_ay_3_8900::{
    CYCLES_PER_FRAME, CYCLES_PER_LINE, FB_WIDTH, LatchGroup, LatchPolicy, PALETTE, STIC_IRQ, Stic,
};

const VBLANK: u64 = 70 * CYCLES_PER_LINE;

fn pixel(stic: &Stic, x: usize, y: usize) -> u32 {
    stic.framebuffer()[y * FB_WIDTH + x]
}

/// Start the first frame and leave the STIC one cycle into vblank.
fn started() -> (Stic, ProcessorBus) {
    let mut stic = Stic::new();
    let mut bus = ProcessorBus::new();
    stic.advance(1, &mut bus);
    (stic, bus)
}

/// Run from one cycle into vblank to the end of the frame.
fn finish_frame(stic: &mut Stic, bus: &mut ProcessorBus) {
    stic.advance(CYCLES_PER_FRAME - 1, bus);
    assert!(stic.take_frame_ready());
}

#[test]
fn interrupt_covers_vblank() {
    let (mut stic, mut bus) = started();
    assert!(bus.is_asserted(STIC_IRQ));
    stic.advance(VBLANK - 2, &mut bus);
    assert!(bus.is_asserted(STIC_IRQ));
    stic.advance(1, &mut bus);
    assert!(!bus.is_asserted(STIC_IRQ));
    stic.advance(CYCLES_PER_FRAME - VBLANK, &mut bus);
    assert!(bus.is_asserted(STIC_IRQ));
}

#[test]
fn disabled_display_blanks_to_border() {
    let (mut stic, mut bus) = started();
    stic.write(0x2C, 2);
    finish_frame(&mut stic, &mut bus);
    assert!(!stic.display_enabled());
    assert!(stic.framebuffer().iter().all(|&p| p == PALETTE[2]));
    assert_eq!(bus.take_stall(), 0);
}

#[test]
fn enabled_display_closes_bus_and_steals_cycles() {
    let (mut stic, mut bus) = started();
    stic.write(0x20, 0);
    stic.advance(VBLANK - 1, &mut bus);
    assert!(stic.display_enabled());
    assert!(stic.bus_closed());
    assert_eq!(stic.read(0x2C), 0xFFFF);
    assert_eq!(bus.take_stall(), 110);

    stic.advance(CYCLES_PER_FRAME - VBLANK, &mut bus);
    assert!(stic.take_frame_ready());
    assert!(!stic.bus_closed());
    assert_eq!(bus.take_stall(), 11 * 110);
}

#[test]
fn display_enable_must_be_rearmed() {
    let (mut stic, mut bus) = started();
    stic.write(0x20, 0);
    finish_frame(&mut stic, &mut bus);
    assert!(stic.display_enabled());

    stic.advance(VBLANK, &mut bus);
    assert!(!stic.display_enabled());
    assert!(!stic.bus_closed());
}

#[test]
fn card_memories_locked_during_active_display() {
    let (mut stic, mut bus) = started();
    stic.write_gram(0, 0x1FF);
    assert_eq!(stic.read_gram(0), 0xFF);
    stic.write(0x20, 0);
    stic.advance(VBLANK, &mut bus);

    stic.write_gram(0, 0x11);
    assert_eq!(stic.read_gram(0), 0xFFFF);
    assert_eq!(stic.read_grom(0), 0xFFFF);
    stic.write_backtab(5, 0x1234);
    assert_eq!(stic.read_backtab(5), 0x1234);

    stic.advance(CYCLES_PER_FRAME, &mut bus);
    assert_eq!(stic.read_gram(0), 0xFF);
}

#[test]
fn register_readback_masks() {
    let mut stic = Stic::new();
    let cases = [
        (0x00, 0xFFFF, 0x3FFF),
        (0x00, 0x0000, 0x3800),
        (0x08, 0xFFFF, 0x3FFF),
        (0x08, 0x0000, 0x3000),
        (0x10, 0xFFFF, 0xFFFF),
        (0x10, 0x0000, 0xC000),
        (0x18, 0x0000, 0xFC00),
        (0x28, 0x1234, 0xFFF4),
        (0x2C, 0x0000, 0xFFF0),
        (0x30, 0x0005, 0xFFFD),
        (0x31, 0xFFFF, 0xFFFF),
        (0x32, 0x0001, 0xFFFD),
    ];
    for (reg, value, expected) in cases {
        stic.write(reg, value);
        assert_eq!(stic.read(reg), expected, "register {reg:#04X}");
    }
}

#[test]
fn fgbg_card_rendering() {
    let (mut stic, mut bus) = started();
    stic.write_gram(0, 0xFF);
    // GRAM card 0, foreground blue, background red
    stic.write_backtab(0, 0x0C01);
    stic.write(0x21, 0);
    stic.write(0x20, 0);
    finish_frame(&mut stic, &mut bus);

    assert_eq!(pixel(&stic, 8, 16), PALETTE[1]);
    assert_eq!(pixel(&stic, 15, 17), PALETTE[1]);
    assert_eq!(pixel(&stic, 8, 18), PALETTE[2]);
    assert_eq!(pixel(&stic, 0, 0), PALETTE[0]);
}

#[test]
fn color_stack_advances_and_persists() {
    let (mut stic, mut bus) = started();
    stic.write(0x28, 3);
    stic.write(0x29, 5);
    stic.write_backtab(0, 0x0000);
    stic.write_backtab(1, 0x2000);
    stic.write_backtab(2, 0x0000);
    stic.write(0x20, 0);
    finish_frame(&mut stic, &mut bus);

    assert_eq!(pixel(&stic, 8, 16), PALETTE[3]);
    assert_eq!(pixel(&stic, 16, 16), PALETTE[5]);
    assert_eq!(pixel(&stic, 24, 16), PALETTE[5]);
    // Next row keeps the advanced stack colour
    assert_eq!(pixel(&stic, 8, 32), PALETTE[5]);
}

#[test]
fn colored_squares() {
    let (mut stic, mut bus) = started();
    stic.write(0x28, 6);
    stic.write_backtab(0, 0x31D1);
    stic.write(0x20, 0);
    finish_frame(&mut stic, &mut bus);

    assert_eq!(pixel(&stic, 8, 16), PALETTE[1]);
    assert_eq!(pixel(&stic, 12, 16), PALETTE[2]);
    assert_eq!(pixel(&stic, 8, 24), PALETTE[6]);
    assert_eq!(pixel(&stic, 12, 24), PALETTE[4]);
}

fn solid_gram_card(stic: &mut Stic) {
    for row in 0..8 {
        stic.write_gram(row, 0xFF);
    }
}

#[test]
fn mob_overlap_sets_symmetric_collisions() {
    let (mut stic, mut bus) = started();
    solid_gram_card(&mut stic);
    stic.write(0x00, 0x0300 | 20);
    stic.write(0x08, 10);
    stic.write(0x10, 0x0801);
    stic.write(0x01, 0x0300 | 24);
    stic.write(0x09, 10);
    stic.write(0x11, 0x0802);
    stic.write(0x20, 0);
    finish_frame(&mut stic, &mut bus);

    assert_eq!(stic.read(0x18), 0xFC02);
    assert_eq!(stic.read(0x19), 0xFC01);
    assert_eq!(pixel(&stic, 21, 20), PALETTE[1]);
    // MOB 0 draws over MOB 1
    assert_eq!(pixel(&stic, 26, 20), PALETTE[1]);
    assert_eq!(pixel(&stic, 30, 20), PALETTE[2]);
}

#[test]
fn collisions_are_sticky_until_written() {
    let (mut stic, mut bus) = started();
    solid_gram_card(&mut stic);
    stic.write(0x00, 0x0300 | 20);
    stic.write(0x08, 10);
    stic.write(0x01, 0x0300 | 24);
    stic.write(0x09, 10);
    stic.write(0x20, 0);
    finish_frame(&mut stic, &mut bus);
    assert_eq!(stic.read(0x18) & 0x3FF, 0x002);

    stic.write(0x01, 0x0300 | 100);
    stic.write(0x20, 0);
    stic.advance(CYCLES_PER_FRAME, &mut bus);
    assert_eq!(stic.read(0x18) & 0x3FF, 0x002);

    stic.write(0x18, 0);
    assert_eq!(stic.read(0x18), 0xFC00);
}

#[test]
fn border_and_background_collisions() {
    let (mut stic, mut bus) = started();
    solid_gram_card(&mut stic);
    // Foreground card at the top-left of the playfield
    stic.write_backtab(0, 0x0801);
    stic.write(0x00, 0x0100 | 4);
    stic.write(0x08, 8);
    stic.write(0x10, 0x0800);
    stic.write(0x20, 0);
    finish_frame(&mut stic, &mut bus);

    let bits = stic.read(0x18) & 0x3FF;
    assert_eq!(bits & 0x200, 0x200);
    assert_eq!(bits & 0x100, 0x100);
}

#[test]
fn non_interacting_mobs_never_collide() {
    let (mut stic, mut bus) = started();
    solid_gram_card(&mut stic);
    stic.write(0x00, 0x0200 | 20);
    stic.write(0x08, 10);
    stic.write(0x01, 0x0300 | 24);
    stic.write(0x09, 10);
    stic.write(0x20, 0);
    finish_frame(&mut stic, &mut bus);
    assert_eq!(stic.read(0x18), 0xFC00);
    assert_eq!(stic.read(0x19), 0xFC00);
}

#[test]
fn priority_mob_hides_behind_foreground() {
    let (mut stic, mut bus) = started();
    solid_gram_card(&mut stic);
    stic.write(0x21, 0);
    stic.write_backtab(0, 0x0801);
    stic.write(0x00, 0x0200 | 8);
    stic.write(0x08, 8);
    stic.write(0x10, 0x2802);
    stic.write(0x20, 0);
    finish_frame(&mut stic, &mut bus);
    assert_eq!(pixel(&stic, 8, 16), PALETTE[1]);
}

/// Run two frames with the display enabled. `first` and `second` stand in
/// for each frame's vblank handler; returns the STIC after the second.
fn two_frames(
    group: LatchGroup,
    policy: LatchPolicy,
    first: impl FnOnce(&mut Stic),
    second: impl FnOnce(&mut Stic),
) -> Stic {
    let (mut stic, mut bus) = started();
    stic.set_latch_policy(group, policy);
    first(&mut stic);
    stic.write(0x20, 0);
    finish_frame(&mut stic, &mut bus);

    stic.advance(1, &mut bus);
    second(&mut stic);
    stic.write(0x20, 0);
    finish_frame(&mut stic, &mut bus);
    assert!(stic.display_enabled());
    stic
}

#[test]
fn border_write_in_vblank_latches_per_policy() {
    let border = |policy| {
        let stic = two_frames(
            LatchGroup::Border,
            policy,
            |s| s.write(0x2C, 3),
            |s| s.write(0x2C, 5),
        );
        pixel(&stic, 0, 0)
    };
    assert_eq!(border(LatchPolicy::Immediate), PALETTE[5]);
    assert_eq!(border(LatchPolicy::NextFrame), PALETTE[3]);
}

#[test]
fn color_stack_write_in_vblank_latches_per_policy() {
    let background = |policy| {
        let stic = two_frames(
            LatchGroup::ColorStack,
            policy,
            |s| s.write(0x28, 3),
            |s| s.write(0x28, 6),
        );
        pixel(&stic, 8, 16)
    };
    assert_eq!(background(LatchPolicy::Immediate), PALETTE[6]);
    assert_eq!(background(LatchPolicy::NextFrame), PALETTE[3]);
}

#[test]
fn mob_move_in_vblank_latches_per_policy() {
    let place = |s: &mut Stic| {
        solid_gram_card(s);
        s.write(0x00, 0x0300 | 20);
        s.write(0x08, 10);
        s.write(0x10, 0x0801);
    };
    let moved = |s: &mut Stic| s.write(0x00, 0x0300 | 100);

    let stic = two_frames(LatchGroup::MobPosition, LatchPolicy::Immediate, place, moved);
    assert_eq!(pixel(&stic, 101, 20), PALETTE[1]);
    assert_eq!(pixel(&stic, 21, 20), PALETTE[0]);

    let stic = two_frames(LatchGroup::MobPosition, LatchPolicy::NextFrame, place, moved);
    assert_eq!(pixel(&stic, 21, 20), PALETTE[1]);
    assert_eq!(pixel(&stic, 101, 20), PALETTE[0]);
}

#[test]
fn disabled_display_border_latches_per_policy() {
    let border = |policy| {
        let (mut stic, mut bus) = started();
        stic.set_latch_policy(LatchGroup::Border, policy);
        stic.write(0x2C, 3);
        finish_frame(&mut stic, &mut bus);
        stic.advance(VBLANK, &mut bus);
        // Bus stays open all frame without a display-enable write.
        stic.write(0x2C, 5);
        stic.advance(CYCLES_PER_FRAME - VBLANK, &mut bus);
        assert!(stic.take_frame_ready());
        pixel(&stic, 0, 0)
    };
    assert_eq!(border(LatchPolicy::Immediate), PALETTE[5]);
    assert_eq!(border(LatchPolicy::NextFrame), PALETTE[3]);
}

#[test]
fn restore_keeps_grom() {
    let (mut stic, mut bus) = started();
    stic.load_grom(&[0x81]);
    stic.write(0x2C, 9);
    stic.advance(100, &mut bus);

    let blob = rmp_serde::to_vec_named(&stic).expect("encode");
    let saved: Stic = rmp_serde::from_slice(&blob).expect("decode");

    let mut other = Stic::new();
    other.load_grom(&[0x81]);
    other.restore(saved);
    assert_eq!(other.read(0x2C), 0xFFF9);
    assert_eq!(other.read_grom(0), 0x81);
    assert_eq!(other.query("cycle"), Some(Value::U64(101)));
}
