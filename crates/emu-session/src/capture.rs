//! Headless capture: PNG screenshots and WAV audio.

#![allow(clippy::cast_possible_truncation)]

use std::error::Error;
use std::fs;
use std::io::BufWriter;
use std::path::Path;

use emu_core::Machine;

/// Save the machine's current framebuffer as a PNG file.
///
/// The framebuffer is ARGB32; alpha is written opaque.
pub fn save_screenshot(machine: &dyn Machine, path: &Path) -> Result<(), Box<dyn Error>> {
    write_png(
        machine.framebuffer(),
        machine.framebuffer_width(),
        machine.framebuffer_height(),
        path,
    )
}

/// Save a raw ARGB32 frame, e.g. the pixels of a `FrameOutput`.
pub fn write_png(
    pixels: &[u32],
    width: usize,
    height: usize,
    path: &Path,
) -> Result<(), Box<dyn Error>> {
    let file = fs::File::create(path)?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), width as u32, height as u32);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;

    let mut rgba = Vec::with_capacity(width * height * 4);
    for &pixel in pixels {
        rgba.extend_from_slice(&[
            (pixel >> 16) as u8,
            (pixel >> 8) as u8,
            pixel as u8,
            0xFF,
        ]);
    }
    writer.write_image_data(&rgba)?;
    Ok(())
}

/// Save mono 16-bit samples as a WAV file.
pub fn save_wav(samples: &[i16], sample_rate: u32, path: &Path) -> Result<(), Box<dyn Error>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    log::debug!("wrote {} samples to {}", samples.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("emu-session-{}-{name}", std::process::id()))
    }

    #[test]
    fn png_has_signature_and_size() {
        let path = temp("shot.png");
        write_png(&[0xFF10_2030; 6], 3, 2, &path).expect("written");
        let bytes = fs::read(&path).expect("readable");
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn wav_records_every_sample() {
        let path = temp("tone.wav");
        save_wav(&[0, 1000, -1000, 0], 44_100, &path).expect("written");
        let reader = hound::WavReader::open(&path).expect("readable");
        assert_eq!(reader.spec().sample_rate, 44_100);
        assert_eq!(reader.len(), 4);
        let _ = fs::remove_file(&path);
    }
}
