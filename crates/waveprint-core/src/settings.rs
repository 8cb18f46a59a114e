//! TOML settings for the service binaries
//!
//! Selects the store location and codec, the transcoder binary names, the
//! matching thresholds, and the fingerprinting preset.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::matcher;
use crate::store::DocFormat;

/// Main settings structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub transcoder: TranscoderSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    /// Preset selecting the pipeline parameters ("music" or "audiobook").
    #[serde(default = "default_preset")]
    pub preset: String,
    /// Full custom pipeline parameters; wins over `preset` when present.
    #[serde(default)]
    pub fingerprint: Option<EngineConfig>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store: StoreSettings::default(),
            transcoder: TranscoderSettings::default(),
            matching: MatchingSettings::default(),
            preset: default_preset(),
            fingerprint: None,
        }
    }
}

/// Fingerprint store location and codec.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreSettings {
    #[serde(default = "default_base_directory")]
    pub base_directory: String,
    #[serde(default)]
    pub format: DocFormat,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            base_directory: default_base_directory(),
            format: DocFormat::default(),
        }
    }
}

fn default_base_directory() -> String {
    "./fingerprints".to_string()
}

/// Names of the external transcoder binaries.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranscoderSettings {
    #[serde(default = "default_probe_bin")]
    pub probe_bin: String,
    #[serde(default = "default_transcode_bin")]
    pub transcode_bin: String,
}

impl Default for TranscoderSettings {
    fn default() -> Self {
        Self {
            probe_bin: default_probe_bin(),
            transcode_bin: default_transcode_bin(),
        }
    }
}

fn default_probe_bin() -> String {
    "ffprobe".to_string()
}

fn default_transcode_bin() -> String {
    "ffmpeg".to_string()
}

/// Matching thresholds.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MatchingSettings {
    #[serde(default = "default_min_score")]
    pub min_score: f64,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            min_score: default_min_score(),
            max_results: default_max_results(),
        }
    }
}

fn default_min_score() -> f64 {
    matcher::MIN_SCORE
}

fn default_max_results() -> usize {
    matcher::DEFAULT_LIMIT
}

fn default_preset() -> String {
    "music".to_string()
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read settings file {}: {}", path.display(), e))?;
        let settings: Settings = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("failed to parse TOML settings: {}", e))?;
        Ok(settings)
    }

    /// Resolve the pipeline configuration from the custom table or the
    /// named preset.
    pub fn engine_config(&self) -> Result<EngineConfig, EngineError> {
        if let Some(config) = &self.fingerprint {
            return Ok(config.clone());
        }
        EngineConfig::preset(&self.preset)
            .ok_or_else(|| EngineError::Config(format!("unknown preset '{}'", self.preset)))
    }
}
