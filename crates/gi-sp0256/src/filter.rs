//! Two-pole digital resonators, cascaded six deep.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::SAMPLE_RATE;

/// Fixed upper formants with bandwidths (Hz).
const UPPER: [(u16, u16); 3] = [(3300, 250), (3750, 200), (4300, 300)];
/// Bandwidths for F1-F3.
const BANDWIDTH: [u16; 3] = [60, 90, 150];

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
struct Resonator {
    a: f64,
    b: f64,
    c: f64,
    y1: f64,
    y2: f64,
}

impl Resonator {
    fn tune(&mut self, freq: u16, bandwidth: u16) {
        let t = 1.0 / f64::from(SAMPLE_RATE);
        let r = (-PI * f64::from(bandwidth) * t).exp();
        self.c = -(r * r);
        self.b = 2.0 * r * (2.0 * PI * f64::from(freq) * t).cos();
        self.a = 1.0 - self.b - self.c;
    }

    fn process(&mut self, x: f64) -> f64 {
        let y = self.a * x + self.b * self.y1 + self.c * self.y2;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }
}

/// Six resonators in series: three moving formants and three fixed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cascade {
    stages: [Resonator; 6],
}

impl Cascade {
    pub fn new() -> Self {
        let mut cascade = Self::default();
        cascade.tune([500, 1500, 2500]);
        for (stage, &(f, bw)) in cascade.stages[3..].iter_mut().zip(&UPPER) {
            stage.tune(f, bw);
        }
        cascade
    }

    /// Retune the three moving formants.
    pub fn tune(&mut self, formants: [u16; 3]) {
        for ((stage, &f), &bw) in self.stages.iter_mut().zip(&formants).zip(&BANDWIDTH) {
            stage.tune(f, bw);
        }
    }

    pub fn process(&mut self, x: f64) -> f64 {
        self.stages.iter_mut().fold(x, |acc, s| s.process(acc))
    }

    pub fn clear(&mut self) {
        for s in &mut self.stages {
            s.y1 = 0.0;
            s.y2 = 0.0;
        }
    }
}
