//! Ambient Engine: the owned, per-UI instance that turns "desired mode"
//! and "desired volume" signals into sound.
//!
//! Initialization is deferred: the output is only opened by an explicit
//! [`AmbientEngine::initialize`] or by the first audible
//! [`AmbientEngine::set_mode`], which hosts should call from a user
//! gesture. All control calls take `&mut self`, so requests are serialized
//! and each one supersedes whatever fade the previous one left pending.

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::error::Result;

use super::backend::{AudioBackend, OutputConfig, SharedOutput};
use super::mode::SoundMode;
use super::transport::{Phase, Transport, Volume};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Initialized,
}

pub struct AmbientEngine<B: AudioBackend> {
    backend: B,
    config: EngineConfig,
    shared: Arc<SharedOutput>,
    state: EngineState,
    volume: Volume,
    output: Option<OutputConfig>,
}

impl<B: AudioBackend> AmbientEngine<B> {
    /// The config is checked by [`initialize`](Self::initialize), before the
    /// output is opened.
    pub fn new(backend: B, config: EngineConfig) -> Self {
        let volume = Volume::from_percent(u32::from(config.initial_volume));
        AmbientEngine {
            backend,
            config,
            shared: SharedOutput::new(),
            state: EngineState::Uninitialized,
            volume,
            output: None,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Output format negotiated with the backend, once initialized.
    pub fn output(&self) -> Option<OutputConfig> {
        self.output
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Open the output and build the master chain. No-op when initialized.
    pub fn initialize(&mut self) -> Result<()> {
        if self.state == EngineState::Initialized {
            return Ok(());
        }
        self.config.validate()?;

        self.shared.clear_output_lost();
        let output = match self.backend.start(Arc::clone(&self.shared)) {
            Ok(output) => output,
            Err(e) => {
                log::warn!("ambient sound unavailable: {e}");
                return Err(e);
            }
        };

        let transport = Transport::new(self.config.clone(), output, self.volume);
        *self.shared.lock() = Some(transport);

        self.output = Some(output);
        self.state = EngineState::Initialized;
        log::info!(
            "ambient engine initialized at {} Hz, {} channel(s)",
            output.sample_rate,
            output.channels
        );
        Ok(())
    }

    /// Switch soundscapes, fading out the current one first.
    ///
    /// Audible modes initialize the engine on demand; `None` never does.
    pub fn set_mode(&mut self, mode: SoundMode) -> Result<()> {
        if !mode.is_audible() && self.state == EngineState::Uninitialized {
            return Ok(());
        }
        self.initialize()?;
        self.with_transport(|t| t.set_mode(mode)).unwrap_or(Ok(()))
    }

    /// Switch by name. Unknown names are reported and fall back to silence.
    pub fn select(&mut self, name: &str) -> Result<SoundMode> {
        match name.parse::<SoundMode>() {
            Ok(mode) => {
                self.set_mode(mode)?;
                Ok(mode)
            }
            Err(e) => {
                log::warn!("{e}, falling back to silence");
                self.set_mode(SoundMode::None)?;
                Err(e)
            }
        }
    }

    /// Set the output volume in percent (clamped to 100).
    pub fn set_volume(&mut self, percent: u32) {
        let volume = Volume::from_percent(percent);
        self.volume = volume;
        self.with_transport(|t| t.set_volume(volume));
    }

    pub fn volume(&self) -> Volume {
        self.volume
    }

    pub fn current_mode(&self) -> SoundMode {
        self.with_transport(|t| t.current_mode()).unwrap_or_default()
    }

    pub fn target_mode(&self) -> SoundMode {
        self.with_transport(|t| t.target_mode()).unwrap_or_default()
    }

    pub fn phase(&self) -> Phase {
        self.with_transport(|t| t.phase()).unwrap_or(Phase::Idle)
    }

    pub fn master_gain(&self) -> f64 {
        self.with_transport(|t| t.master_gain()).unwrap_or(0.0)
    }

    pub fn master_gain_target(&self) -> f64 {
        self.with_transport(|t| t.master_gain_target()).unwrap_or(0.0)
    }

    pub fn live_node_count(&self) -> usize {
        self.with_transport(|t| t.live_node_count()).unwrap_or(0)
    }

    pub fn live_generator_count(&self) -> usize {
        self.with_transport(|t| t.live_generator_count()).unwrap_or(0)
    }

    pub fn is_output_lost(&self) -> bool {
        self.shared.is_output_lost()
    }

    /// Render interleaved frames. Used by pull-driven hosts; device backends
    /// render from their own callback.
    pub fn render(&self, out: &mut [f32]) {
        self.shared.fill_buffer(out);
    }

    /// Stop everything and release the output. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        if self.state == EngineState::Uninitialized {
            return;
        }

        if let Some(mut transport) = self.shared.lock().take() {
            transport.dispose();
        }
        self.backend.stop();
        self.output = None;
        self.state = EngineState::Uninitialized;
        log::info!("ambient engine disposed");
    }

    fn with_transport<R>(&self, f: impl FnOnce(&mut Transport) -> R) -> Option<R> {
        self.shared.lock().as_mut().map(f)
    }
}

impl<B: AudioBackend> Drop for AmbientEngine<B> {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Build an engine from a JSON config.
pub fn from_json<B: AudioBackend>(backend: B, json: &str) -> Result<AmbientEngine<B>> {
    let config = EngineConfig::from_json(json)?;
    Ok(AmbientEngine::new(backend, config))
}
