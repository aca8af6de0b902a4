//! Soundscape presets: one data record per mode describing its chain.
//!
//! Every chain has the same shape: a colored noise source, one or two
//! filters in series, an optional gain stage, and zero or more LFOs that
//! modulate a filter cutoff or the gain stage.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::dsp::filter::FilterType;
use crate::dsp::noise::NoiseColor;
use crate::error::{EngineError, Result};

use super::mode::SoundMode;

fn default_q() -> f64 {
    1.0
}

/// One filter in the chain's series path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    #[serde(rename = "type")]
    pub kind: FilterType,
    pub frequency: f64,
    #[serde(default = "default_q")]
    pub q: f64,
}

/// What an LFO modulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "param", rename_all = "snake_case")]
pub enum LfoTarget {
    /// The chain's gain stage level.
    Gain,
    /// Cutoff/center frequency of the filter at this index.
    FilterFrequency { filter: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LfoSpec {
    /// Rate in Hz.
    pub frequency: f64,
    pub min: f64,
    pub max: f64,
    pub target: LfoTarget,
}

/// Full description of one mode's signal path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainSpec {
    pub noise: NoiseColor,
    pub filters: Vec<FilterSpec>,
    /// Static level of the gain stage. A gain LFO overrides it once started.
    #[serde(default)]
    pub gain: Option<f64>,
    #[serde(default)]
    pub lfos: Vec<LfoSpec>,
}

impl ChainSpec {
    /// Whether the chain needs a gain stage between the filters and master.
    pub fn has_gain_stage(&self) -> bool {
        self.gain.is_some() || self.lfos.iter().any(|l| l.target == LfoTarget::Gain)
    }

    pub fn validate(&self, mode: SoundMode) -> Result<()> {
        let invalid = |reason: String| EngineError::InvalidPreset { mode, reason };

        if self.filters.is_empty() {
            return Err(invalid("chain has no filters".into()));
        }
        for (i, f) in self.filters.iter().enumerate() {
            if !(f.frequency.is_finite() && f.frequency > 0.0) {
                return Err(invalid(format!("filter {i} has frequency {}", f.frequency)));
            }
            if !(f.q.is_finite() && f.q > 0.0) {
                return Err(invalid(format!("filter {i} has Q {}", f.q)));
            }
        }
        if let Some(gain) = self.gain {
            if !(0.0..=1.0).contains(&gain) {
                return Err(invalid(format!("gain {gain} outside [0, 1]")));
            }
        }
        for (i, lfo) in self.lfos.iter().enumerate() {
            if !(lfo.frequency.is_finite() && lfo.frequency > 0.0) {
                return Err(invalid(format!("lfo {i} has rate {}", lfo.frequency)));
            }
            if lfo.min > lfo.max {
                return Err(invalid(format!("lfo {i} range {}..{} is inverted", lfo.min, lfo.max)));
            }
            match lfo.target {
                LfoTarget::Gain if lfo.min < 0.0 || lfo.max > 1.0 => {
                    return Err(invalid(format!("lfo {i} gain range outside [0, 1]")));
                }
                LfoTarget::FilterFrequency { filter } if filter >= self.filters.len() => {
                    return Err(invalid(format!("lfo {i} targets missing filter {filter}")));
                }
                LfoTarget::FilterFrequency { .. } if lfo.min <= 0.0 => {
                    return Err(invalid(format!("lfo {i} sweeps below 0 Hz")));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

fn lowpass(frequency: f64) -> FilterSpec {
    FilterSpec { kind: FilterType::Lowpass, frequency, q: 1.0 }
}

fn highpass(frequency: f64) -> FilterSpec {
    FilterSpec { kind: FilterType::Highpass, frequency, q: 1.0 }
}

fn bandpass(frequency: f64, q: f64) -> FilterSpec {
    FilterSpec { kind: FilterType::Bandpass, frequency, q }
}

fn gain_lfo(frequency: f64, min: f64, max: f64) -> LfoSpec {
    LfoSpec { frequency, min, max, target: LfoTarget::Gain }
}

fn cutoff_lfo(filter: usize, frequency: f64, min: f64, max: f64) -> LfoSpec {
    LfoSpec { frequency, min, max, target: LfoTarget::FilterFrequency { filter } }
}

/// Built-in chain for `mode`, `None` for silence.
pub fn builtin(mode: SoundMode) -> Option<ChainSpec> {
    let spec = match mode {
        SoundMode::None => return None,
        // Steady hiss, no droplets
        SoundMode::Rain => ChainSpec {
            noise: NoiseColor::Pink,
            filters: vec![highpass(1000.0), lowpass(4500.0)],
            gain: Some(0.9),
            lfos: vec![gain_lfo(0.8, 0.85, 0.95)],
        },
        // Wind through leaves; the lowpass sweep carries the motion
        SoundMode::Forest => ChainSpec {
            noise: NoiseColor::Brown,
            filters: vec![highpass(200.0), lowpass(4500.0)],
            gain: None,
            lfos: vec![cutoff_lfo(1, 0.06, 3000.0, 5000.0)],
        },
        // Room tone, no voices
        SoundMode::Cafe => ChainSpec {
            noise: NoiseColor::Pink,
            filters: vec![highpass(500.0), lowpass(3500.0)],
            gain: Some(0.92),
            lfos: vec![gain_lfo(0.4, 0.88, 0.96)],
        },
        SoundMode::BrownNoise => ChainSpec {
            noise: NoiseColor::Brown,
            filters: vec![lowpass(3000.0)],
            gain: Some(0.95),
            lfos: vec![gain_lfo(0.1, 0.92, 0.98)],
        },
        SoundMode::PinkNoise => ChainSpec {
            noise: NoiseColor::Pink,
            filters: vec![highpass(100.0), lowpass(5000.0)],
            gain: None,
            lfos: vec![],
        },
        // Swell with a ~15 s period on both band center and level
        SoundMode::Ocean => ChainSpec {
            noise: NoiseColor::Pink,
            filters: vec![bandpass(400.0, 0.8), lowpass(4500.0)],
            gain: Some(0.85),
            lfos: vec![cutoff_lfo(0, 0.07, 300.0, 550.0), gain_lfo(0.06, 0.7, 0.95)],
        },
        // Cabin rumble
        SoundMode::Airplane => ChainSpec {
            noise: NoiseColor::Brown,
            filters: vec![bandpass(200.0, 1.0), lowpass(1500.0)],
            gain: Some(0.86),
            lfos: vec![gain_lfo(0.04, 0.8, 0.92)],
        },
    };
    Some(spec)
}

/// Chain specs keyed by mode.
///
/// Deserializing a partial table keeps the built-in chain for every mode
/// the input leaves out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<SoundMode, ChainSpec>", into = "BTreeMap<SoundMode, ChainSpec>")]
pub struct PresetTable {
    chains: BTreeMap<SoundMode, ChainSpec>,
}

impl PresetTable {
    pub fn builtin() -> Self {
        let chains = SoundMode::audible()
            .filter_map(|mode| builtin(mode).map(|spec| (mode, spec)))
            .collect();
        PresetTable { chains }
    }

    pub fn get(&self, mode: SoundMode) -> Option<&ChainSpec> {
        self.chains.get(&mode)
    }

    /// Replace one mode's chain. Silence cannot carry a chain.
    pub fn set(&mut self, mode: SoundMode, spec: ChainSpec) -> Result<()> {
        if !mode.is_audible() {
            return Err(EngineError::InvalidMode(mode));
        }
        spec.validate(mode)?;
        self.chains.insert(mode, spec);
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.chains.contains_key(&SoundMode::None) {
            return Err(EngineError::InvalidMode(SoundMode::None));
        }
        for (mode, spec) in &self.chains {
            spec.validate(*mode)?;
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (SoundMode, &ChainSpec)> {
        self.chains.iter().map(|(m, s)| (*m, s))
    }
}

impl Default for PresetTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl From<BTreeMap<SoundMode, ChainSpec>> for PresetTable {
    fn from(overrides: BTreeMap<SoundMode, ChainSpec>) -> Self {
        let mut table = Self::builtin();
        table.chains.extend(overrides);
        table
    }
}

impl From<PresetTable> for BTreeMap<SoundMode, ChainSpec> {
    fn from(table: PresetTable) -> Self {
        table.chains
    }
}
