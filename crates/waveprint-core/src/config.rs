//! Configuration parameters for the fingerprinting pipeline
//!
//! All tunables driving the spectrogram, peak extraction, and landmark
//! pairing stages, plus the two presets the service ships with.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Sample rate the transcoder is asked to emit for every chunk, in Hz.
pub const TRANSCODE_SAMPLE_RATE: u32 = 44_100;

/// Pipeline configuration.
///
/// All values must be provided; use [`EngineConfig::music`] or
/// [`EngineConfig::audiobook`] for the tuned defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Decimation factor applied after the low-pass filter.
    pub dsp_ratio: usize,
    /// FFT window size in samples (power of two, >= 64).
    pub window_size: usize,
    /// Samples between successive FFT frames (1..=window_size).
    pub hop_size: usize,
    /// Low-pass cutoff applied before decimation, in Hz.
    pub max_freq_hz: f64,
    /// Number of following peaks paired with each anchor.
    pub target_zone_size: usize,
    /// `[lo, hi)` spectrogram bin ranges scanned for per-frame maxima.
    pub freq_bands: Vec<(usize, usize)>,
    /// Seconds of audio per processing chunk; 0 processes the whole file.
    pub chunk_duration_sec: f64,
}

impl EngineConfig {
    /// Parameters tuned for long-form spoken word. Produces far fewer
    /// fingerprints per second than the music preset, which keeps storage
    /// and memory practical for multi-hour files: speech needs fewer,
    /// wider bands and coarser time resolution.
    pub fn audiobook() -> Self {
        Self {
            dsp_ratio: 8,
            window_size: 2048,
            hop_size: 2048,
            max_freq_hz: 3000.0,
            target_zone_size: 3,
            freq_bands: vec![(0, 100), (100, 350), (350, 1024)],
            chunk_duration_sec: 120.0,
        }
    }

    /// Shazam-style parameters for short music clips, with high
    /// time-frequency resolution and more target pairs per anchor.
    pub fn music() -> Self {
        Self {
            dsp_ratio: 4,
            window_size: 1024,
            hop_size: 512,
            max_freq_hz: 5000.0,
            target_zone_size: 5,
            freq_bands: vec![(0, 10), (10, 20), (20, 40), (40, 80), (80, 160), (160, 512)],
            chunk_duration_sec: 300.0,
        }
    }

    /// Look up a preset by name.
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "music" => Some(Self::music()),
            "audiobook" => Some(Self::audiobook()),
            _ => None,
        }
    }

    /// Validate all parameters against their documented constraints.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.dsp_ratio < 1 {
            return Err(EngineError::Config("dsp_ratio must be >= 1".into()));
        }
        if self.window_size < 64 || !self.window_size.is_power_of_two() {
            return Err(EngineError::Config(
                "window_size must be a power of two >= 64".into(),
            ));
        }
        if self.hop_size == 0 || self.hop_size > self.window_size {
            return Err(EngineError::Config(
                "hop_size must be in 1..=window_size".into(),
            ));
        }
        let nyquist = TRANSCODE_SAMPLE_RATE as f64 / 2.0;
        if self.max_freq_hz <= 0.0 || self.max_freq_hz >= nyquist {
            return Err(EngineError::Config(format!(
                "max_freq_hz must be in (0, {})",
                nyquist
            )));
        }
        if self.target_zone_size < 1 {
            return Err(EngineError::Config("target_zone_size must be >= 1".into()));
        }
        for &(lo, hi) in &self.freq_bands {
            if lo >= hi || hi > self.window_size / 2 {
                return Err(EngineError::Config(format!(
                    "invalid frequency band [{}, {}): bounds must satisfy lo < hi <= window_size/2",
                    lo, hi
                )));
            }
        }
        if self.chunk_duration_sec < 0.0 {
            return Err(EngineError::Config("chunk_duration_sec must be >= 0".into()));
        }
        Ok(())
    }

    /// Sample rate after decimation, in Hz.
    pub fn effective_sample_rate(&self, sample_rate: u32) -> f64 {
        sample_rate as f64 / self.dsp_ratio as f64
    }

    /// Width of one spectrogram bin, in Hz.
    pub fn freq_resolution(&self, sample_rate: u32) -> f64 {
        self.effective_sample_rate(sample_rate) / self.window_size as f64
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::music()
    }
}
