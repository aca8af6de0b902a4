//! Colored noise sources.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Spectral color of a noise source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseColor {
    White,
    /// -3 dB/octave.
    Pink,
    /// -6 dB/octave.
    Brown,
}

/// A seeded noise generator with a start/stop lifecycle.
///
/// Produces silence until started. Pink uses Paul Kellet's economy
/// 3-pole filter, brown a leaky integrator over white noise.
#[derive(Debug, Clone)]
pub struct NoiseSource {
    pub color: NoiseColor,
    rng: StdRng,
    running: bool,
    // Pink filter poles
    b0: f64,
    b1: f64,
    b2: f64,
    // Brown integrator
    last: f64,
}

const PINK_SCALE: f64 = 0.2;
const BROWN_LEAK: f64 = 1.02;
const BROWN_SCALE: f64 = 3.5;

impl NoiseSource {
    pub fn new(color: NoiseColor, seed: u64) -> Self {
        NoiseSource {
            color,
            rng: StdRng::seed_from_u64(seed),
            running: false,
            b0: 0.0,
            b1: 0.0,
            b2: 0.0,
            last: 0.0,
        }
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
        self.b0 = 0.0;
        self.b1 = 0.0;
        self.b2 = 0.0;
        self.last = 0.0;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Generate the next sample in [-1, 1].
    pub fn next_sample(&mut self) -> f64 {
        if !self.running {
            return 0.0;
        }

        let white: f64 = self.rng.random_range(-1.0..1.0);
        let sample = match self.color {
            NoiseColor::White => white,
            NoiseColor::Pink => {
                self.b0 = 0.99765 * self.b0 + white * 0.099_046_0;
                self.b1 = 0.96300 * self.b1 + white * 0.296_516_4;
                self.b2 = 0.57000 * self.b2 + white * 1.052_691_3;
                (self.b0 + self.b1 + self.b2 + white * 0.1848) * PINK_SCALE
            }
            NoiseColor::Brown => {
                self.last = (self.last + 0.02 * white) / BROWN_LEAK;
                self.last * BROWN_SCALE
            }
        };
        sample.clamp(-1.0, 1.0)
    }
}
