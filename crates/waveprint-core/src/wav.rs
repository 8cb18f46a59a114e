//! WAV chunk parsing for transcoder output

use std::path::Path;

use crate::error::EngineError;

/// Decoded chunk: left-channel samples plus the header facts the pipeline
/// needs downstream.
#[derive(Debug)]
pub struct WavChunk {
    pub samples: Vec<f64>,
    pub sample_rate: u32,
    pub duration_sec: f64,
}

/// Parse a RIFF/WAVE file produced by the transcoder. Only the left
/// channel of 16-bit integer PCM is read; other encodings are rejected.
pub fn read_wav(path: &Path) -> Result<WavChunk, EngineError> {
    let mut reader = hound::WavReader::open(path)
        .map_err(|e| EngineError::Input(format!("failed to open WAV {}: {}", path.display(), e)))?;

    let spec = reader.spec();
    if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(EngineError::Input(format!(
            "{}: expected 16-bit integer PCM, got {:?} at {} bits",
            path.display(),
            spec.sample_format,
            spec.bits_per_sample
        )));
    }
    if spec.channels == 0 {
        return Err(EngineError::Input(format!(
            "{}: WAV header reports zero channels",
            path.display()
        )));
    }

    let samples = reader
        .samples::<i16>()
        .step_by(spec.channels as usize)
        .map(|s| s.map(|v| v as f64 / 32_768.0))
        .collect::<Result<Vec<f64>, _>>()
        .map_err(|e| {
            EngineError::Input(format!("failed to read WAV samples from {}: {}", path.display(), e))
        })?;

    let duration_sec = samples.len() as f64 / spec.sample_rate as f64;

    Ok(WavChunk {
        samples,
        sample_rate: spec.sample_rate,
        duration_sec,
    })
}
