use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// An ambient soundscape selection. Exactly one mode is current at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SoundMode {
    #[default]
    None,
    Rain,
    Forest,
    #[serde(alias = "coffee")]
    Cafe,
    #[serde(alias = "brown")]
    BrownNoise,
    #[serde(alias = "pink")]
    PinkNoise,
    Ocean,
    Airplane,
}

impl SoundMode {
    /// Every mode, silence first.
    pub const ALL: [SoundMode; 8] = [
        SoundMode::None,
        SoundMode::Rain,
        SoundMode::Forest,
        SoundMode::Cafe,
        SoundMode::BrownNoise,
        SoundMode::PinkNoise,
        SoundMode::Ocean,
        SoundMode::Airplane,
    ];

    /// Modes that synthesize sound.
    pub fn audible() -> impl Iterator<Item = SoundMode> {
        Self::ALL.into_iter().filter(|m| m.is_audible())
    }

    pub fn is_audible(self) -> bool {
        self != SoundMode::None
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SoundMode::None => "none",
            SoundMode::Rain => "rain",
            SoundMode::Forest => "forest",
            SoundMode::Cafe => "cafe",
            SoundMode::BrownNoise => "brown-noise",
            SoundMode::PinkNoise => "pink-noise",
            SoundMode::Ocean => "ocean",
            SoundMode::Airplane => "airplane",
        }
    }
}

impl fmt::Display for SoundMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SoundMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mode = match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" | "off" => SoundMode::None,
            "rain" => SoundMode::Rain,
            "forest" => SoundMode::Forest,
            "cafe" | "coffee" => SoundMode::Cafe,
            "brown-noise" | "brown" => SoundMode::BrownNoise,
            "pink-noise" | "pink" => SoundMode::PinkNoise,
            "ocean" => SoundMode::Ocean,
            "airplane" => SoundMode::Airplane,
            _ => return Err(EngineError::UnknownMode(s.to_string())),
        };
        Ok(mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_round_trips_through_from_str() {
        for mode in SoundMode::ALL {
            assert_eq!(mode.to_string().parse::<SoundMode>().unwrap(), mode);
        }
    }

    #[test]
    fn accepts_legacy_spellings() {
        assert_eq!("coffee".parse::<SoundMode>().unwrap(), SoundMode::Cafe);
        assert_eq!("brown".parse::<SoundMode>().unwrap(), SoundMode::BrownNoise);
        assert_eq!(" Pink ".parse::<SoundMode>().unwrap(), SoundMode::PinkNoise);
    }

    #[test]
    fn rejects_unknown() {
        let err = "thunderstorm".parse::<SoundMode>().unwrap_err();
        assert!(matches!(err, EngineError::UnknownMode(ref s) if s == "thunderstorm"));
    }

    #[test]
    fn serde_names_match_display() {
        let json = serde_json::to_string(&SoundMode::BrownNoise).unwrap();
        assert_eq!(json, "\"brown-noise\"");
        let mode: SoundMode = serde_json::from_str("\"coffee\"").unwrap();
        assert_eq!(mode, SoundMode::Cafe);
    }

    #[test]
    fn seven_audible_modes() {
        assert_eq!(SoundMode::audible().count(), 7);
        assert!(!SoundMode::None.is_audible());
    }
}
