//! Display-list processing, DMA and interrupt timing.

use atari_antic::{Antic, CYCLES_PER_FRAME, CYCLES_PER_LINE, VBLANK_LINE};
use atari_gtia::{FB_WIDTH, Gtia, ntsc_palette};
use emu_core::{Observable, ProcessorBus, SimpleBus, Value};

struct Rig {
    antic: Antic,
    gtia: Gtia,
    bus: ProcessorBus,
    mem: SimpleBus,
}

impl Rig {
    fn new() -> Self {
        Self {
            antic: Antic::new(),
            gtia: Gtia::new(false),
            bus: ProcessorBus::new(),
            mem: SimpleBus::new(),
        }
    }

    fn run(&mut self, cycles: u64) {
        self.antic
            .advance(cycles, &mut self.bus, &mut self.mem, &mut self.gtia);
    }

    /// Eight blank lines, one mode 2 line from $2000, then JVB to $1000.
    fn text_screen(&mut self, ir: u8) {
        self.mem.load(0x1000, &[0x70, ir, 0x00, 0x20, 0x41, 0x00, 0x10]);
        self.mem.load(0x2000, &[0x01]);
        self.mem.load(0xE008, &[0xFF; 8]);
        self.antic.write(0x02, 0x00);
        self.antic.write(0x03, 0x10);
        self.antic.write(0x09, 0xE0);
        self.antic.write(0x00, 0x22);
        self.gtia.write(0x17, 0x0A);
        self.gtia.write(0x18, 0x94);
        self.gtia.write(0x1A, 0x00);
    }
}

fn color(c: u8) -> u32 {
    ntsc_palette()[usize::from(c & 0xFE)]
}

#[test]
fn vcount_reports_half_the_line() {
    let mut rig = Rig::new();
    rig.run(CYCLES_PER_LINE * 20 + 3);
    assert_eq!(rig.antic.read(0x0B), 10);
    assert_eq!(rig.antic.read(0x0C), 0);
}

#[test]
fn vbi_sets_status_and_pulses_nmi_when_enabled() {
    let mut rig = Rig::new();
    rig.antic.write(0x0E, 0x40);
    rig.run(CYCLES_PER_LINE * u64::from(VBLANK_LINE) - 1);
    assert!(!rig.bus.take_nmi());
    rig.run(1);
    assert!(rig.bus.take_nmi());
    assert_eq!(rig.antic.read(0x0F), 0x5F);

    rig.antic.write(0x0F, 0);
    assert_eq!(rig.antic.read(0x0F), 0x1F);
}

#[test]
fn masked_vbi_still_sets_status() {
    let mut rig = Rig::new();
    rig.run(CYCLES_PER_LINE * u64::from(VBLANK_LINE));
    assert!(!rig.bus.take_nmi());
    assert_eq!(rig.antic.read(0x0F) & 0x40, 0x40);
}

#[test]
fn wsync_stalls_to_end_of_line() {
    let mut rig = Rig::new();
    rig.run(10);
    rig.bus.take_stall();
    rig.antic.write(0x0A, 0);
    rig.run(0);
    assert_eq!(rig.bus.take_stall(), 95);

    // Past the resume point the wait runs into the next line.
    rig.run(100);
    rig.bus.take_stall();
    rig.antic.write(0x0A, 0);
    rig.run(0);
    assert_eq!(rig.bus.take_stall(), 4 + 105);
}

#[test]
fn refresh_steals_cycles_every_line() {
    let mut rig = Rig::new();
    rig.run(CYCLES_PER_LINE * 3);
    assert_eq!(rig.bus.take_stall(), 9 * 4);
}

#[test]
fn mode_2_line_renders_text() {
    let mut rig = Rig::new();
    rig.text_screen(0x42);
    rig.run(CYCLES_PER_LINE * 24);

    // Line 16 is framebuffer row 8. The first character starts at colour
    // clock 48, framebuffer column 32.
    let row = &rig.gtia.framebuffer()[8 * FB_WIDTH..9 * FB_WIDTH];
    assert_eq!(row[0], color(0x00));
    assert_eq!(row[32], color(0x9A));
    assert_eq!(row[39], color(0x9A));
    assert_eq!(row[40], color(0x94));

    // Blank instruction lines show only the background.
    let blank = &rig.gtia.framebuffer()[..FB_WIDTH];
    assert!(blank.iter().all(|&p| p == color(0x00)));
}

#[test]
fn mode_line_steals_screen_and_character_fetches() {
    let mut rig = Rig::new();
    rig.text_screen(0x42);
    rig.run(CYCLES_PER_LINE * 16 - 1);
    rig.bus.take_stall();

    // Instruction, LMS operand, 40 screen bytes and 40 glyph rows.
    rig.run(1);
    assert_eq!(rig.bus.take_stall(), 9 + 1 + 2 + 40 + 40);

    // Later rows only refetch glyph data.
    rig.run(CYCLES_PER_LINE);
    assert_eq!(rig.bus.take_stall(), 9 + 40);
}

#[test]
fn dli_fires_on_last_row_of_mode_line() {
    let mut rig = Rig::new();
    rig.text_screen(0xC2);
    rig.antic.write(0x0E, 0x80);
    rig.run(CYCLES_PER_LINE * 23 - 1);
    assert!(!rig.bus.take_nmi());
    rig.run(1);
    assert!(rig.bus.take_nmi());
    assert_eq!(rig.antic.read(0x0F) & 0x80, 0x80);
}

#[test]
fn jvb_waits_for_next_frame() {
    let mut rig = Rig::new();
    rig.text_screen(0x42);
    rig.run(CYCLES_PER_LINE * 30);
    assert_eq!(rig.antic.query("dlist"), Some(Value::U16(0x1000)));
    assert_eq!(rig.antic.query("memscan"), Some(Value::U16(0x2028)));

    rig.run(CYCLES_PER_FRAME - CYCLES_PER_LINE * 30);
    assert!(rig.antic.take_frame_ready());
    assert_eq!(rig.antic.frame(), 1);

    // Second frame walks the same list again.
    rig.run(CYCLES_PER_LINE * 17);
    assert_eq!(rig.antic.query("dlist"), Some(Value::U16(0x1004)));
}

#[test]
fn player_dma_feeds_gtia() {
    let mut rig = Rig::new();
    rig.mem.load(0x3408, &[0xAA]);
    rig.antic.write(0x07, 0x30);
    rig.antic.write(0x00, 0x1C);
    rig.gtia.write(0x1D, 0x02);
    rig.run(CYCLES_PER_LINE * 8);

    let Some(Value::List(grafp)) = rig.gtia.query("grafp") else {
        panic!("grafp missing");
    };
    assert_eq!(grafp[0], Value::U8(0xAA));
    // Eight refresh-only lines, then refresh plus one missile and four player fetches.
    assert_eq!(rig.bus.take_stall(), 8 * 9 + 9 + 5);
}
