//! Biquad filter with the same response as a WebAudio BiquadFilterNode.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Filter response shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    Lowpass,
    Highpass,
    Bandpass,
    Notch,
}

/// Cutoffs are held below this fraction of the sample rate.
const MAX_CUTOFF_RATIO: f64 = 0.45;
const MIN_CUTOFF_HZ: f64 = 10.0;

/// A 2nd-order IIR filter, Direct Form II Transposed.
/// Coefficient formulas from the Audio EQ Cookbook (Robert Bristow-Johnson).
///
/// The cutoff can be moved every control block by an LFO; coefficients
/// are recomputed lazily on the next processed sample.
#[derive(Debug, Clone)]
pub struct BiquadFilter {
    pub filter_type: FilterType,
    frequency: f64,
    q: f64,

    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,

    z1: f64,
    z2: f64,

    sample_rate: f64,
    dirty: bool,
}

impl BiquadFilter {
    pub fn new(filter_type: FilterType, frequency: f64, q: f64, sample_rate: f64) -> Self {
        let mut f = BiquadFilter {
            filter_type,
            frequency: 0.0,
            q: q.max(1e-3),
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            z1: 0.0,
            z2: 0.0,
            sample_rate,
            dirty: true,
        };
        f.set_frequency(frequency);
        f.update_coefficients();
        f
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn q(&self) -> f64 {
        self.q
    }

    /// Recompute coefficients from the current cutoff and Q.
    pub fn update_coefficients(&mut self) {
        let w0 = 2.0 * PI * self.frequency / self.sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * self.q);

        let (b0, b1, b2) = match self.filter_type {
            FilterType::Lowpass => {
                let b1 = 1.0 - cos_w0;
                (b1 / 2.0, b1, b1 / 2.0)
            }
            FilterType::Highpass => {
                let b0 = (1.0 + cos_w0) / 2.0;
                (b0, -(1.0 + cos_w0), b0)
            }
            // Constant 0 dB peak gain
            FilterType::Bandpass => (alpha, 0.0, -alpha),
            FilterType::Notch => (1.0, -2.0 * cos_w0, 1.0),
        };
        let a0 = 1.0 + alpha;

        self.b0 = b0 / a0;
        self.b1 = b1 / a0;
        self.b2 = b2 / a0;
        self.a1 = -2.0 * cos_w0 / a0;
        self.a2 = (1.0 - alpha) / a0;
        self.dirty = false;
    }

    /// Process a single sample.
    pub fn process(&mut self, input: f64) -> f64 {
        if self.dirty {
            self.update_coefficients();
        }

        let output = self.b0 * input + self.z1;
        self.z1 = self.b1 * input - self.a1 * output + self.z2;
        self.z2 = self.b2 * input - self.a2 * output;
        output
    }

    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }

    /// Move the cutoff (or center) frequency, clamped to a stable range.
    pub fn set_frequency(&mut self, freq: f64) {
        let nyquist_guard = self.sample_rate * MAX_CUTOFF_RATIO;
        let freq = freq.clamp(MIN_CUTOFF_HZ, nyquist_guard.max(MIN_CUTOFF_HZ));
        if freq != self.frequency {
            self.frequency = freq;
            self.dirty = true;
        }
    }

    pub fn set_q(&mut self, q: f64) {
        self.q = q.max(1e-3);
        self.dirty = true;
    }
}
