//! Engine tuning. Every field has a default, so a partial JSON document
//! (or none at all) yields a working configuration.

use serde::{Deserialize, Serialize};

use crate::ambient::preset::PresetTable;
use crate::error::{EngineError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Master gain ramp from silence after a chain starts.
    pub fade_in_secs: f64,
    /// Master gain ramp to silence before a chain is disposed.
    pub fade_out_secs: f64,
    /// Extra wait after the fade-out ramp before the chain is disposed.
    pub dispose_grace_secs: f64,
    /// Ramp applied to volume changes.
    pub volume_ramp_secs: f64,
    /// Linear gain at 100 % volume. Kept below 1 for headroom into the limiter.
    pub max_gain: f64,
    /// Volume percent used until the first `set_volume`.
    pub initial_volume: u8,
    pub limiter_threshold_db: f64,
    /// Seed for the noise generators. Each chain derives its own stream.
    pub seed: u64,
    pub presets: PresetTable,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            fade_in_secs: 6.0,
            fade_out_secs: 4.0,
            dispose_grace_secs: 0.5,
            volume_ramp_secs: 0.5,
            max_gain: 0.5,
            initial_volume: 100,
            limiter_threshold_db: -1.0,
            seed: 0x5eed_a3b1,
            presets: PresetTable::builtin(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        let positive = |name: &str, v: f64| {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(EngineError::Config(format!("{name} must be positive, got {v}")))
            }
        };
        positive("fade_in_secs", self.fade_in_secs)?;
        positive("fade_out_secs", self.fade_out_secs)?;
        positive("volume_ramp_secs", self.volume_ramp_secs)?;

        if !(self.dispose_grace_secs.is_finite() && self.dispose_grace_secs >= 0.0) {
            return Err(EngineError::Config(format!(
                "dispose_grace_secs must not be negative, got {}",
                self.dispose_grace_secs
            )));
        }
        if !(self.max_gain > 0.0 && self.max_gain <= 1.0) {
            return Err(EngineError::Config(format!(
                "max_gain must be in (0, 1], got {}",
                self.max_gain
            )));
        }
        if self.initial_volume > 100 {
            return Err(EngineError::Config(format!(
                "initial_volume must be a percentage, got {}",
                self.initial_volume
            )));
        }
        if !(-60.0..=0.0).contains(&self.limiter_threshold_db) {
            return Err(EngineError::Config(format!(
                "limiter_threshold_db must be in [-60, 0], got {}",
                self.limiter_threshold_db
            )));
        }
        self.presets.validate()
    }
}
