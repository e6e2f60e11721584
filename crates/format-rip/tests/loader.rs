//! Container detection, known-cartridge overrides and corruption handling.

use std::io::{Cursor, Write};

use emu_core::{SystemKind, crc32};
use format_rip::{
    Hint, InputDevice, KnownCarts, LoadError, Mapping, Peripherals, RipBuilder, load,
};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

fn intv_words(count: usize) -> Vec<u8> {
    (0..count)
        .flat_map(|i| ((i as u16) & 0x3FF).to_be_bytes())
        .collect()
}

fn zipped(name: &str, data: &[u8], method: CompressionMethod) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file("readme.txt", SimpleFileOptions::default())
        .expect("start");
    writer.write_all(b"not a cartridge").expect("write");
    writer
        .start_file(name, SimpleFileOptions::default().compression_method(method))
        .expect("start");
    writer.write_all(data).expect("write");
    writer.finish().expect("finish").into_inner()
}

#[test]
fn raw_intellivision_dump_uses_default_layout() {
    let bytes = intv_words(0x2000);
    let program = load(&bytes, &Hint::system(SystemKind::Intellivision), &KnownCarts::new())
        .expect("loads");
    assert_eq!(program.system, SystemKind::Intellivision);
    assert_eq!(program.crc32, crc32(&bytes));
    assert_eq!(program.segments.len(), 1);
    assert_eq!(program.segments[0].address, 0x5000);
    assert_eq!(program.segments[0].data[3], 3);
    assert_eq!(program.input, InputDevice::HandController);
}

#[test]
fn raw_image_without_hint_is_unsupported() {
    let hint = Hint {
        extension: Some("xyz".into()),
        system: None,
    };
    assert!(matches!(
        load(&[0; 64], &hint, &KnownCarts::new()),
        Err(LoadError::UnsupportedFormat(_))
    ));
}

#[test]
fn extension_selects_5200() {
    let hint = Hint {
        extension: Some("a52".into()),
        system: None,
    };
    let program = load(&[0xEA; 0x8000], &hint, &KnownCarts::new()).expect("loads");
    assert_eq!(program.system, SystemKind::Atari5200);
    assert_eq!(program.segments[0].address, 0x4000);
    assert_eq!(program.input, InputDevice::Joypad);
}

#[test]
fn zip_archive_is_unpacked() {
    let inner = intv_words(0x100);
    let archive = zipped("Game.INT", &inner, CompressionMethod::Deflated);
    let program = load(&archive, &Hint::default(), &KnownCarts::new()).expect("loads");
    assert_eq!(program.system, SystemKind::Intellivision);
    assert_eq!(program.crc32, crc32(&inner));
    assert_eq!(program.segments[0].data.len(), 0x100);
}

#[test]
fn zip_with_corrupted_entry_is_corrupt_image() {
    let inner = vec![0x5A; 0x200];
    let mut archive = zipped("game.int", &inner, CompressionMethod::Stored);
    let at = archive
        .windows(8)
        .position(|w| w == [0x5A; 8])
        .expect("payload stored verbatim");
    archive[at + 100] ^= 0xFF;
    assert!(matches!(
        load(&archive, &Hint::default(), &KnownCarts::new()),
        Err(LoadError::CorruptImage(_))
    ));
}

#[test]
fn zip_without_cartridge_is_unsupported() {
    let archive = zipped("notes.doc", b"hello", CompressionMethod::Stored);
    assert!(matches!(
        load(&archive, &Hint::default(), &KnownCarts::new()),
        Err(LoadError::UnsupportedFormat(_))
    ));
}

#[test]
fn known_cart_overrides_layout_and_peripherals() {
    let bytes = intv_words(0x3000);
    let table = format!(
        "{:08X} intv \"Voice Game\" seg=5000:0:1000 seg=6000:1000:2000 voice\n",
        crc32(&bytes)
    );
    let known = KnownCarts::parse(&table).expect("table");
    let program = load(&bytes, &Hint::system(SystemKind::Intellivision), &known).expect("loads");
    assert_eq!(program.title.as_deref(), Some("Voice Game"));
    assert!(program.peripherals.intellivoice);
    assert_eq!(program.segments.len(), 2);
    assert_eq!(program.segments[1].address, 0x6000);
    assert_eq!(program.segments[1].data[0], 0x1000 & 0x3FF);
}

#[test]
fn known_cart_mapping_applies_to_5200_dump() {
    let bytes = vec![0x60; 0x4000];
    let table = format!("{:08x} 5200 \"Two\" mapping=two-chip\n", crc32(&bytes));
    let known = KnownCarts::parse(&table).expect("table");
    let program = load(&bytes, &Hint::default(), &known).expect("loads");
    assert_eq!(program.system, SystemKind::Atari5200);
    assert_eq!(program.mapping, Mapping::TwoChip);
    assert_eq!(program.segments.len(), 4);
}

#[test]
fn known_cart_segment_past_image_is_truncated() {
    let bytes = intv_words(0x10);
    let table = format!("{:08X} intv \"Short\" seg=5000:0:20\n", crc32(&bytes));
    let known = KnownCarts::parse(&table).expect("table");
    assert!(matches!(
        load(&bytes, &Hint::default(), &known),
        Err(LoadError::TruncatedData {
            needed: 0x20,
            available: 0x10
        })
    ));
}

#[test]
fn rip_container_declares_everything() {
    let image = RipBuilder::new(SystemKind::Atari5200)
        .title("Banked")
        .mapping(Mapping::BountyBob)
        .peripherals(Peripherals::default(), InputDevice::TrakBall)
        .rom_bytes(0x4000, Some(0), &[1; 0x1000])
        .rom_bytes(0x4000, Some(1), &[2; 0x1000])
        .rom_bytes(0xA000, None, &[3; 0x2000])
        .build();
    let program = load(&image, &Hint::default(), &KnownCarts::new()).expect("loads");
    assert_eq!(program.system, SystemKind::Atari5200);
    assert_eq!(program.mapping, Mapping::BountyBob);
    assert_eq!(program.input, InputDevice::TrakBall);
    assert_eq!(program.segments[1].page, Some(1));
    assert_eq!(program.segments[1].data[0], 2);
}

#[test]
fn known_cart_relays_rip_container() {
    let mut rom = vec![0x11; 0x2000];
    rom.extend(vec![0x22; 0x2000]);
    let image = RipBuilder::new(SystemKind::Atari5200)
        .rom_bytes(0x8000, None, &rom)
        .build();
    let table = format!(
        "{:08X} 5200 \"Two\" mapping=two-chip seg=4000:0:2000\n",
        crc32(&image)
    );
    let known = KnownCarts::parse(&table).expect("table");
    let program = load(&image, &Hint::default(), &known).expect("loads");
    assert_eq!(program.title.as_deref(), Some("Two"));
    assert_eq!(program.mapping, Mapping::TwoChip);
    assert_eq!(program.segments.len(), 1);
    assert_eq!(program.segments[0].address, 0x4000);
    assert_eq!(program.segments[0].page, None);
    assert_eq!(program.segments[0].data.len(), 0x2000);
}

#[test]
fn known_cart_mapping_splits_rip_rom() {
    let mut rom = vec![0x11; 0x2000];
    rom.extend(vec![0x22; 0x2000]);
    let image = RipBuilder::new(SystemKind::Atari5200)
        .rom_bytes(0x8000, None, &rom)
        .build();
    let table = format!("{:08X} 5200 \"Two\" mapping=two-chip\n", crc32(&image));
    let program = load(
        &image,
        &Hint::default(),
        &KnownCarts::parse(&table).expect("table"),
    )
    .expect("loads");
    let layout: Vec<(u16, u16)> = program
        .segments
        .iter()
        .map(|s| (s.address, s.data[0]))
        .collect();
    assert_eq!(
        layout,
        [(0x4000, 0x11), (0x6000, 0x11), (0x8000, 0x22), (0xA000, 0x22)]
    );
}

#[test]
fn known_cart_can_clear_rip_peripherals() {
    let image = RipBuilder::new(SystemKind::Intellivision)
        .peripherals(
            Peripherals {
                ecs: true,
                intellivoice: true,
            },
            InputDevice::EcsKeyboard,
        )
        .rom_words(0x5000, None, &[0x0004; 0x10])
        .build();
    let table = format!("{:08X} intv \"Plain\" input=hand\n", crc32(&image));
    let program = load(
        &image,
        &Hint::default(),
        &KnownCarts::parse(&table).expect("table"),
    )
    .expect("loads");
    assert_eq!(program.peripherals, Peripherals::default());
    assert_eq!(program.input, InputDevice::HandController);
    assert_eq!(program.segments[0].address, 0x5000);
}

#[test]
fn known_cart_for_other_system_is_ignored() {
    let image = RipBuilder::new(SystemKind::Intellivision)
        .rom_words(0x5000, None, &[0x0004; 0x10])
        .build();
    let table = format!("{:08X} 5200 \"Wrong\" mapping=one-chip\n", crc32(&image));
    let program = load(
        &image,
        &Hint::default(),
        &KnownCarts::parse(&table).expect("table"),
    )
    .expect("loads");
    assert_eq!(program.system, SystemKind::Intellivision);
    assert_eq!(program.title, None);
    assert_eq!(program.mapping, Mapping::Linear);
}

#[test]
fn rip_inside_zip_loads() {
    let image = RipBuilder::new(SystemKind::Intellivision)
        .rom_words(0x5000, None, &[0x02B8, 0x0001])
        .build();
    let archive = zipped("game.rip", &image, CompressionMethod::Deflated);
    let program = load(&archive, &Hint::default(), &KnownCarts::new()).expect("loads");
    assert_eq!(program.segments[0].data, [0x02B8, 0x0001]);
}
