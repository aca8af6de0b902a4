//! Ambient Sound Engine: procedural soundscapes for focus sessions.
//!
//! `engine` owns the lifecycle and the public API, `transport` switches and
//! crossfades chains on the audio clock, `chain` builds per-mode node graphs
//! from the data in `preset`, and `master` is the gain + limiter stage every
//! chain routes through.

pub mod backend;
pub mod chain;
#[cfg(feature = "device")]
pub mod device;
pub mod engine;
pub mod master;
pub mod mode;
pub mod preset;
pub mod transport;

pub use backend::{AudioBackend, OutputConfig, PullBackend, SharedOutput};
pub use engine::{AmbientEngine, EngineState};
pub use mode::SoundMode;
pub use transport::{Phase, Volume};
