pub mod ambient;
pub mod config;
pub mod dsp;
pub mod error;

use std::fmt::Display;

use wasm_bindgen::prelude::*;

use crate::ambient::backend::PullBackend;
use crate::ambient::engine::AmbientEngine;
use crate::ambient::mode::SoundMode;
use crate::config::EngineConfig;

pub use crate::error::EngineError;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

fn js_error(e: impl Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// WASM-exposed: return the engine version string.
#[wasm_bindgen(js_name = engineVersion)]
pub fn engine_version() -> String {
    VERSION.to_string()
}

/// WASM-exposed: the selectable mode names, silence first.
#[wasm_bindgen(js_name = soundModes)]
pub fn sound_modes() -> Result<JsValue, JsValue> {
    let names: Vec<&str> = SoundMode::ALL.iter().map(|m| m.as_str()).collect();
    serde_wasm_bindgen::to_value(&names).map_err(js_error)
}

/// WASM-exposed: render `seconds` of a soundscape to a mono WAV byte array.
#[wasm_bindgen(js_name = renderSoundscapeWav)]
pub fn render_soundscape_wav(
    mode: &str,
    seconds: f64,
    sample_rate: u32,
) -> Result<Vec<u8>, JsValue> {
    let mode: SoundMode = mode.parse().map_err(js_error)?;
    dsp::renderer::render_wav(mode, seconds, sample_rate, EngineConfig::default())
        .map_err(js_error)
}

/// WASM-exposed ambient engine, pulled from an AudioWorklet.
///
/// Create it when the timer view mounts, call `initialize` or `setMode`
/// from a click handler, and `dispose` when the view unmounts.
#[wasm_bindgen]
pub struct AmbientSound {
    engine: AmbientEngine<PullBackend>,
}

#[wasm_bindgen]
impl AmbientSound {
    #[wasm_bindgen(constructor)]
    pub fn new(sample_rate: u32, channels: u32) -> AmbientSound {
        let backend = PullBackend::new(sample_rate, channels as usize);
        AmbientSound {
            engine: AmbientEngine::new(backend, EngineConfig::default()),
        }
    }

    /// Create an engine from a (partial) config object.
    #[wasm_bindgen(js_name = withConfig)]
    pub fn with_config(
        sample_rate: u32,
        channels: u32,
        config: JsValue,
    ) -> Result<AmbientSound, JsValue> {
        let config: EngineConfig = serde_wasm_bindgen::from_value(config).map_err(js_error)?;
        config.validate().map_err(js_error)?;
        Ok(AmbientSound {
            engine: AmbientEngine::new(PullBackend::new(sample_rate, channels as usize), config),
        })
    }

    pub fn initialize(&mut self) -> Result<(), JsValue> {
        self.engine.initialize().map_err(js_error)
    }

    /// Unknown names reject and leave the engine fading to silence.
    #[wasm_bindgen(js_name = setMode)]
    pub fn set_mode(&mut self, mode: &str) -> Result<(), JsValue> {
        self.engine.select(mode).map(|_| ()).map_err(js_error)
    }

    #[wasm_bindgen(js_name = setVolume)]
    pub fn set_volume(&mut self, percent: u32) {
        self.engine.set_volume(percent);
    }

    #[wasm_bindgen(js_name = currentMode)]
    pub fn current_mode(&self) -> String {
        self.engine.current_mode().to_string()
    }

    /// Fill an interleaved output block.
    pub fn render(&self, out: &mut [f32]) {
        self.engine.render(out);
    }

    pub fn dispose(&mut self) {
        self.engine.dispose();
    }
}
