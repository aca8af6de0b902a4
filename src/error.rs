use thiserror::Error;

use crate::ambient::mode::SoundMode;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown sound mode '{0}'")]
    UnknownMode(String),

    #[error("no sound chain is defined for mode '{0}'")]
    InvalidMode(SoundMode),

    #[error("invalid preset for '{mode}': {reason}")]
    InvalidPreset { mode: SoundMode, reason: String },

    #[error("audio output unavailable: {0}")]
    PlatformUnavailable(String),

    #[error("invalid engine config: {0}")]
    Config(String),

    #[error("failed to parse engine config: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
