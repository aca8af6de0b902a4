//! Automatable parameter with linear ramps.

/// A linear ramp in progress.
#[derive(Debug, Clone, Copy)]
struct Ramp {
    start: f64,
    target: f64,
    total: usize,
    elapsed: usize,
}

/// A scalar parameter that can jump or glide to a new value.
///
/// Ramps are measured in frames and always start from the value the
/// parameter currently holds, so a new ramp issued mid-ramp continues
/// without a discontinuity.
#[derive(Debug, Clone)]
pub struct Param {
    value: f64,
    ramp: Option<Ramp>,
    sample_rate: f64,
}

impl Param {
    pub fn new(value: f64, sample_rate: f64) -> Self {
        Param {
            value,
            ramp: None,
            sample_rate,
        }
    }

    /// Jump to `value`, cancelling any ramp.
    pub fn set_value(&mut self, value: f64) {
        self.value = value;
        self.ramp = None;
    }

    /// Glide linearly from the current value to `target` over `seconds`.
    pub fn ramp_to(&mut self, target: f64, seconds: f64) {
        let total = (seconds.max(0.0) * self.sample_rate).round() as usize;
        if total == 0 {
            self.set_value(target);
            return;
        }
        self.ramp = Some(Ramp {
            start: self.value,
            target,
            total,
            elapsed: 0,
        });
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Where the parameter is heading (its value when not ramping).
    pub fn target(&self) -> f64 {
        self.ramp.map_or(self.value, |r| r.target)
    }

    pub fn is_ramping(&self) -> bool {
        self.ramp.is_some()
    }

    /// Advance one frame and return the value for that frame.
    pub fn next_value(&mut self) -> f64 {
        if let Some(ramp) = &mut self.ramp {
            ramp.elapsed += 1;
            if ramp.elapsed >= ramp.total {
                self.value = ramp.target;
                self.ramp = None;
            } else {
                let t = ramp.elapsed as f64 / ramp.total as f64;
                self.value = ramp.start + (ramp.target - ramp.start) * t;
            }
        }
        self.value
    }
}
