//! Offline renderer: renders a soundscape to samples or a WAV byte buffer.

use crate::ambient::backend::PullBackend;
use crate::ambient::engine::AmbientEngine;
use crate::ambient::mode::SoundMode;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};

/// Longest render accepted, in seconds.
pub const MAX_RENDER_SECS: f64 = 600.0;

/// Largest 16-bit sample count whose data chunk still fits the RIFF size field.
const MAX_WAV_SAMPLES: u64 = (u32::MAX as u64 - 36) / 2;

/// Render `seconds` of `mode` (mono, fade-in included) at full volume.
pub fn render_soundscape(
    mode: SoundMode,
    seconds: f64,
    sample_rate: u32,
    config: EngineConfig,
) -> Result<Vec<f32>> {
    if !(seconds.is_finite() && (0.0..=MAX_RENDER_SECS).contains(&seconds)) {
        return Err(EngineError::Config(format!(
            "render length must be between 0 and {MAX_RENDER_SECS} s, got {seconds}"
        )));
    }
    let frames = (seconds * f64::from(sample_rate)).round() as u64;
    if frames > MAX_WAV_SAMPLES {
        return Err(EngineError::Config(format!(
            "{frames} samples exceed the WAV size limit"
        )));
    }
    config.validate()?;

    let mut engine = AmbientEngine::new(PullBackend::new(sample_rate, 1), config);
    engine.set_volume(100);
    engine.initialize()?;
    engine.set_mode(mode)?;

    let mut samples = vec![0.0f32; frames as usize];
    engine.render(&mut samples);
    engine.dispose();
    Ok(samples)
}

/// Render a soundscape to a 16-bit mono PCM WAV file as bytes.
pub fn render_wav(
    mode: SoundMode,
    seconds: f64,
    sample_rate: u32,
    config: EngineConfig,
) -> Result<Vec<u8>> {
    let samples = render_soundscape(mode, seconds, sample_rate, config)?;
    let pcm: Vec<i16> = samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
        .collect();
    Ok(encode_wav(&pcm, sample_rate, 1))
}

/// Encode interleaved i16 PCM samples to a WAV byte buffer.
fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
    let bits_per_sample: u16 = 16;
    let byte_rate = sample_rate * channels as u32 * (bits_per_sample as u32 / 8);
    let block_align = channels * (bits_per_sample / 8);
    let data_size = (samples.len() * 2) as u32;

    let mut buf = Vec::with_capacity(44 + data_size as usize);

    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&(36 + data_size).to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
    buf.extend_from_slice(&channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&bits_per_sample.to_le_bytes());

    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    for &sample in samples {
        buf.extend_from_slice(&sample.to_le_bytes());
    }

    buf
}
