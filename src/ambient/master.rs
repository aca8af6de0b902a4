//! Master output chain: master gain into a peak limiter.
//!
//! Created once per engine initialization and shared by every chain.

use crate::dsp::limiter::Limiter;
use crate::dsp::param::Param;

#[derive(Debug, Clone)]
pub struct MasterChain {
    pub gain: Param,
    pub limiter: Limiter,
}

impl MasterChain {
    /// Gain starts at 0 so the first chain fades in from silence.
    pub fn new(limiter_threshold_db: f64, sample_rate: f64) -> Self {
        MasterChain {
            gain: Param::new(0.0, sample_rate),
            limiter: Limiter::new(limiter_threshold_db, sample_rate),
        }
    }

    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let gain = self.gain.next_value();
        self.limiter.process(input * gain)
    }

    /// Drop to silence and clear limiter state.
    pub fn reset(&mut self) {
        self.gain.set_value(0.0);
        self.limiter.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_muted() {
        let mut m = MasterChain::new(-1.0, 1000.0);
        assert_eq!(m.gain.value(), 0.0);
        assert_eq!(m.process(0.8), 0.0);
    }

    #[test]
    fn applies_gain_then_limits() {
        let mut m = MasterChain::new(-1.0, 1000.0);
        m.gain.set_value(0.5);
        assert!((m.process(0.4) - 0.2).abs() < 1e-12);

        m.gain.set_value(1.0);
        let mut out = 0.0;
        for _ in 0..1000 {
            out = m.process(3.0);
        }
        assert!(out < 1.0, "limiter should hold a hot input below full scale, got {out}");
    }
}
