//! Native output through the default cpal device.

use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::error::{EngineError, Result};

use super::backend::{AudioBackend, OutputConfig, SharedOutput};

const PREFERRED_SAMPLE_RATE: u32 = 48000;

fn unavailable(context: &str, err: impl std::fmt::Display) -> EngineError {
    EngineError::PlatformUnavailable(format!("{context}: {err}"))
}

/// Streams the engine to the host's default output device.
#[derive(Default)]
pub struct DeviceBackend {
    stream: Option<cpal::Stream>,
}

impl DeviceBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioBackend for DeviceBackend {
    fn start(&mut self, shared: Arc<SharedOutput>) -> Result<OutputConfig> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| EngineError::PlatformUnavailable("no output device available".into()))?;

        log::info!(
            "Selected audio device: {}",
            device.name().unwrap_or_else(|_| String::from("<no name>"))
        );

        let supported_config = device
            .supported_output_configs()
            .map_err(|e| unavailable("error while querying configs", e))?
            .filter(|config| config.sample_format() == cpal::SampleFormat::F32)
            .max_by(cpal::SupportedStreamConfigRange::cmp_default_heuristics)
            .ok_or_else(|| EngineError::PlatformUnavailable("no f32 output configuration".into()))?;

        let sample_rate = PREFERRED_SAMPLE_RATE.clamp(
            supported_config.min_sample_rate().0,
            supported_config.max_sample_rate().0,
        );
        let config: cpal::StreamConfig = supported_config
            .with_sample_rate(cpal::SampleRate(sample_rate))
            .into();

        log::info!("Selected audio device config: {config:?}");

        let stream = device
            .build_output_stream(
                &config,
                {
                    let shared = Arc::clone(&shared);
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        shared.fill_buffer(data);
                    }
                },
                {
                    let shared = Arc::clone(&shared);
                    move |err| {
                        log::warn!("audio device lost! {err}");
                        shared.mark_output_lost();
                    }
                },
                None,
            )
            .map_err(|e| unavailable("failed to build output stream", e))?;

        stream.play().map_err(|e| unavailable("failed to start playback", e))?;
        self.stream = Some(stream);

        Ok(OutputConfig {
            sample_rate: config.sample_rate.0,
            channels: usize::from(config.channels),
        })
    }

    fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(err) = stream.pause() {
                log::warn!("failed to pause output stream: {err}");
            }
        }
    }
}
