//! Audio output lines and the mixer that combines them.
//!
//! Each sound chip owns one [`AudioOutputLine`] and pushes one sample per
//! chip tick. The line averages the samples falling into each host sample
//! period (a box filter) using only integer arithmetic, so resampling is
//! bit-exact across runs. The [`AudioMixer`] sums the lines that have
//! samples ready and clamps the result to `i16`.

use serde::{Deserialize, Serialize};

/// Resampling buffer from one chip's native rate to the host rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioOutputLine {
    source_hz: u64,
    host_hz: u64,
    phase: u64,
    sum: i64,
    count: u32,
    last: i16,
    samples: Vec<i16>,
}

impl AudioOutputLine {
    #[must_use]
    pub fn new(source_hz: u64, host_hz: u64) -> Self {
        Self {
            source_hz: source_hz.max(1),
            host_hz: host_hz.max(1),
            phase: 0,
            sum: 0,
            count: 0,
            last: 0,
            samples: Vec::new(),
        }
    }

    /// Push one sample at the chip's native rate.
    pub fn push(&mut self, sample: i16) {
        self.sum += i64::from(sample);
        self.count += 1;
        self.phase += self.host_hz;
        while self.phase >= self.source_hz {
            self.phase -= self.source_hz;
            if self.count > 0 {
                self.last = (self.sum / i64::from(self.count)) as i16;
                self.sum = 0;
                self.count = 0;
            }
            self.samples.push(self.last);
        }
    }

    /// Host-rate samples ready to be mixed.
    #[must_use]
    pub fn available(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Drop the first `count` host samples.
    pub fn consume(&mut self, count: usize) {
        let count = count.min(self.samples.len());
        self.samples.drain(..count);
    }

    /// Change the host rate, discarding partial state.
    pub fn set_host_rate(&mut self, host_hz: u64) {
        self.host_hz = host_hz.max(1);
        self.phase = 0;
        self.sum = 0;
        self.count = 0;
        self.samples.clear();
    }

    pub fn clear(&mut self) {
        self.phase = 0;
        self.sum = 0;
        self.count = 0;
        self.last = 0;
        self.samples.clear();
    }
}

/// Sums output lines into the host sample stream.
#[derive(Debug, Clone, Default)]
pub struct AudioMixer {
    buffer: Vec<i16>,
}

impl AudioMixer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mix as many samples as every line has ready. Samples a line holds
    /// beyond that stay queued for the next call.
    pub fn mix(&mut self, lines: &mut [&mut AudioOutputLine]) {
        let Some(ready) = lines.iter().map(|l| l.available()).min() else {
            return;
        };
        self.buffer.reserve(ready);
        for i in 0..ready {
            let sum: i32 = lines.iter().map(|l| i32::from(l.samples[i])).sum();
            self.buffer
                .push(sum.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16);
        }
        for line in lines.iter_mut() {
            line.consume(ready);
        }
    }

    /// Drain the mixed samples.
    pub fn take_buffer(&mut self) -> Vec<i16> {
        std::mem::take(&mut self.buffer)
    }

    #[must_use]
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downsampling_averages() {
        let mut line = AudioOutputLine::new(4, 1);
        for s in [100, 200, 300, 400, 0, 0, 0, 0] {
            line.push(s);
        }
        assert_eq!(line.samples(), &[250, 0]);
    }

    #[test]
    fn upsampling_holds() {
        let mut line = AudioOutputLine::new(10_000, 44_100);
        line.push(500);
        assert_eq!(line.available(), 4);
        assert!(line.samples().iter().all(|&s| s == 500));
    }

    #[test]
    fn mixer_sums_and_clamps() {
        let mut a = AudioOutputLine::new(1, 1);
        let mut b = AudioOutputLine::new(1, 1);
        for _ in 0..3 {
            a.push(30_000);
        }
        for _ in 0..2 {
            b.push(10_000);
        }
        let mut mixer = AudioMixer::new();
        mixer.mix(&mut [&mut a, &mut b]);
        assert_eq!(mixer.take_buffer(), vec![i16::MAX, i16::MAX]);
        assert_eq!(a.available(), 1);
        assert_eq!(b.available(), 0);
    }

    #[test]
    fn one_second_yields_host_rate() {
        let mut line = AudioOutputLine::new(223_722, 44_100);
        for _ in 0..223_722 {
            line.push(1);
        }
        assert_eq!(line.available(), 44_100);
    }
}
