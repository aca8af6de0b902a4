//! Low-frequency oscillator for parameter modulation.

use std::f64::consts::PI;

/// A sine LFO whose output sweeps between `min` and `max`.
///
/// LFOs run at control rate: the caller advances them by a whole block of
/// frames and applies the returned value to the modulated parameter.
#[derive(Debug, Clone)]
pub struct Lfo {
    pub frequency: f64,
    pub min: f64,
    pub max: f64,
    phase: f64,
    sample_rate: f64,
    running: bool,
}

impl Lfo {
    pub fn new(frequency: f64, min: f64, max: f64, sample_rate: f64) -> Self {
        Lfo {
            frequency,
            min,
            max,
            phase: 0.0,
            sample_rate,
            running: false,
        }
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
        self.phase = 0.0;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Current output value. A stopped LFO rests at the midpoint.
    pub fn value(&self) -> f64 {
        let mid = (self.min + self.max) / 2.0;
        if !self.running {
            return mid;
        }
        let half_range = (self.max - self.min) / 2.0;
        mid + half_range * (2.0 * PI * self.phase).sin()
    }

    /// Advance by `frames` samples and return the new value.
    pub fn advance(&mut self, frames: usize) -> f64 {
        if self.running {
            self.phase += self.frequency * frames as f64 / self.sample_rate;
            self.phase -= self.phase.floor();
        }
        self.value()
    }
}
