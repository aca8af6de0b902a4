//! Peak limiter: clip protection at the end of the master chain.
//!
//! A feed-forward compressor with a hard knee and a steep ratio, tuned the
//! way WebAudio limiters built on DynamicsCompressorNode usually are.

/// A mono peak limiter.
#[derive(Debug, Clone)]
pub struct Limiter {
    sample_rate: f64,

    /// Threshold in dB (typical: -6 to 0).
    pub threshold: f64,
    /// Gain reduction ratio above the threshold.
    pub ratio: f64,
    /// Attack time in seconds.
    pub attack: f64,
    /// Release time in seconds.
    pub release: f64,

    attack_coef: f64,
    release_coef: f64,
    envelope: f64,
}

impl Limiter {
    pub fn new(threshold: f64, sample_rate: f64) -> Self {
        let mut l = Self {
            sample_rate,
            threshold: threshold.clamp(-60.0, 0.0),
            ratio: 20.0,
            attack: 0.003,
            release: 0.01,
            attack_coef: 0.0,
            release_coef: 0.0,
            envelope: 0.0,
        };
        l.update_coefficients();
        l
    }

    /// Recompute the envelope follower coefficients after changing
    /// `attack` or `release`.
    pub fn update_coefficients(&mut self) {
        self.attack_coef = (-1.0 / (self.attack.max(1e-5) * self.sample_rate)).exp();
        self.release_coef = (-1.0 / (self.release.max(1e-5) * self.sample_rate)).exp();
    }

    #[inline]
    fn linear_to_db(linear: f64) -> f64 {
        if linear <= 0.0 {
            -120.0
        } else {
            20.0 * linear.log10()
        }
    }

    #[inline]
    fn db_to_linear(db: f64) -> f64 {
        10.0_f64.powf(db / 20.0)
    }

    /// Gain change in dB (<= 0) for an envelope level in dB.
    #[inline]
    fn compute_gain(&self, input_db: f64) -> f64 {
        if input_db <= self.threshold {
            0.0
        } else {
            (self.threshold - input_db) * (1.0 - 1.0 / self.ratio)
        }
    }

    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let level = input.abs();
        let coef = if level > self.envelope {
            self.attack_coef
        } else {
            self.release_coef
        };
        self.envelope = coef * self.envelope + (1.0 - coef) * level;

        let reduction_db = self.compute_gain(Self::linear_to_db(self.envelope));
        if reduction_db == 0.0 {
            return input;
        }
        input * Self::db_to_linear(reduction_db)
    }

    pub fn reset(&mut self) {
        self.envelope = 0.0;
    }

    /// Current gain reduction in dB (positive number, for metering).
    pub fn gain_reduction(&self) -> f64 {
        -self.compute_gain(Self::linear_to_db(self.envelope))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_below_threshold() {
        let mut lim = Limiter::new(-1.0, 44100.0);
        for _ in 0..1000 {
            lim.process(0.3);
        }
        assert_eq!(lim.process(0.3), 0.3);
        assert_eq!(lim.gain_reduction(), 0.0);
    }

    #[test]
    fn holds_hot_signal_near_threshold() {
        let mut lim = Limiter::new(-1.0, 44100.0);
        for _ in 0..5000 {
            lim.process(2.0);
        }
        let out = lim.process(2.0);
        let ceiling = 10.0_f64.powf(-1.0 / 20.0);
        // 20:1 above threshold leaves a small overshoot
        assert!(out < ceiling * 1.1, "limiter let {out} through");
        assert!(out > 0.5, "limiter over-reduced to {out}");
        assert!(lim.gain_reduction() > 5.0);
    }

    #[test]
    fn recovers_after_release() {
        let mut lim = Limiter::new(-1.0, 44100.0);
        for _ in 0..2000 {
            lim.process(1.5);
        }
        let squashed = lim.process(0.2);
        for _ in 0..5000 {
            lim.process(0.2);
        }
        let released = lim.process(0.2);
        assert!(released > squashed, "gain should recover: {squashed} -> {released}");
        assert!((released - 0.2).abs() < 1e-9);
    }
}
