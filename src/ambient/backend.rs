//! Audio output backends.
//!
//! A backend opens an output and pulls interleaved frames from a
//! [`SharedOutput`] slot. The engine installs its [`Transport`] in that slot
//! once the backend reports the output configuration, and takes it back out
//! on dispose; the output renders silence while the slot is empty.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{EngineError, Result};

use super::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputConfig {
    pub sample_rate: u32,
    pub channels: usize,
}

/// State shared between the engine and the output callback.
#[derive(Default)]
pub struct SharedOutput {
    transport: Mutex<Option<Transport>>,
    output_lost: AtomicBool,
}

impl SharedOutput {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn lock(&self) -> MutexGuard<'_, Option<Transport>> {
        self.transport.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Render into an interleaved buffer, or silence if nothing is installed.
    pub fn fill_buffer(&self, data: &mut [f32]) {
        match &mut *self.lock() {
            Some(transport) => transport.fill_buffer(data),
            None => data.fill(0.0),
        }
    }

    pub fn mark_output_lost(&self) {
        self.output_lost.store(true, Ordering::Relaxed);
    }

    pub fn clear_output_lost(&self) {
        self.output_lost.store(false, Ordering::Relaxed);
    }

    pub fn is_output_lost(&self) -> bool {
        self.output_lost.load(Ordering::Relaxed)
    }
}

pub trait AudioBackend {
    /// Open the output. The output pulls from `shared` until [`stop`](Self::stop).
    ///
    /// Fails with [`EngineError::PlatformUnavailable`] when there is no usable
    /// output (no device, or playback not yet permitted by the host).
    fn start(&mut self, shared: Arc<SharedOutput>) -> Result<OutputConfig>;

    fn stop(&mut self);
}

/// Backend for hosts that drive rendering themselves, such as a WebAudio
/// AudioWorklet calling into WASM, an offline renderer, or tests.
#[derive(Debug, Clone)]
pub struct PullBackend {
    config: OutputConfig,
    running: bool,
}

impl PullBackend {
    pub fn new(sample_rate: u32, channels: usize) -> Self {
        PullBackend {
            config: OutputConfig { sample_rate, channels },
            running: false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

impl AudioBackend for PullBackend {
    fn start(&mut self, _shared: Arc<SharedOutput>) -> Result<OutputConfig> {
        if self.config.sample_rate == 0 || self.config.channels == 0 {
            return Err(EngineError::PlatformUnavailable(format!(
                "unusable output format {} Hz x {} channels",
                self.config.sample_rate, self.config.channels
            )));
        }
        self.running = true;
        Ok(self.config)
    }

    fn stop(&mut self) {
        self.running = false;
    }
}
