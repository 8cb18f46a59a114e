//! External transcoder subprocess client
//!
//! Demuxing and resampling are delegated to an ffmpeg-style tool pair: a
//! duration/metadata probe and a chunk extractor emitting mono 16-bit PCM
//! WAV at the pipeline rate. Binary names are configurable; the defaults
//! match the stock ffmpeg distribution.

use std::collections::HashMap;
use std::path::Path;
use std::process::Command;

use crate::config::TRANSCODE_SAMPLE_RATE;
use crate::error::EngineError;

/// Handle to the probe/transcode binaries.
#[derive(Debug, Clone)]
pub struct Transcoder {
    probe_bin: String,
    transcode_bin: String,
}

impl Default for Transcoder {
    fn default() -> Self {
        Self::new("ffprobe", "ffmpeg")
    }
}

impl Transcoder {
    pub fn new(probe_bin: impl Into<String>, transcode_bin: impl Into<String>) -> Self {
        Self {
            probe_bin: probe_bin.into(),
            transcode_bin: transcode_bin.into(),
        }
    }

    /// Total duration of `input` in seconds.
    pub fn probe_duration(&self, input: &Path) -> Result<f64, EngineError> {
        let output = Command::new(&self.probe_bin)
            .args([
                "-v",
                "quiet",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(input)
            .output()
            .map_err(|e| {
                EngineError::Transcode(format!("failed to spawn {}: {}", self.probe_bin, e))
            })?;

        if !output.status.success() {
            return Err(EngineError::Transcode(format!(
                "{} duration query failed for {}",
                self.probe_bin,
                input.display()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout);
        text.trim().parse::<f64>().map_err(|e| {
            EngineError::Input(format!(
                "unparseable duration for {}: {}",
                input.display(),
                e
            ))
        })
    }

    /// Container tags (title, artist, ...) with lowercased tag names.
    /// Files without tags yield an empty map.
    pub fn probe_tags(&self, input: &Path) -> Result<HashMap<String, String>, EngineError> {
        let output = Command::new(&self.probe_bin)
            .args(["-v", "quiet", "-print_format", "json", "-show_format"])
            .arg(input)
            .output()
            .map_err(|e| {
                EngineError::Transcode(format!("failed to spawn {}: {}", self.probe_bin, e))
            })?;

        if !output.status.success() {
            return Err(EngineError::Transcode(format!(
                "{} metadata query failed for {}",
                self.probe_bin,
                input.display()
            )));
        }

        let value: serde_json::Value = serde_json::from_slice(&output.stdout).map_err(|e| {
            EngineError::Input(format!(
                "unparseable probe output for {}: {}",
                input.display(),
                e
            ))
        })?;

        let mut tags = HashMap::new();
        if let Some(map) = value.pointer("/format/tags").and_then(|t| t.as_object()) {
            for (name, value) in map {
                if let Some(text) = value.as_str() {
                    tags.insert(name.to_lowercase(), text.to_string());
                }
            }
        }
        Ok(tags)
    }

    /// Extract `[start, start + duration)` from `input` as a mono 16-bit
    /// PCM WAV at the pipeline rate, written to `out`.
    pub fn extract_chunk(
        &self,
        input: &Path,
        start_sec: f64,
        duration_sec: f64,
        out: &Path,
    ) -> Result<(), EngineError> {
        let output = Command::new(&self.transcode_bin)
            .arg("-y")
            .args(["-ss", &format!("{:.3}", start_sec)])
            .args(["-t", &format!("{:.3}", duration_sec)])
            .arg("-i")
            .arg(input)
            .args(["-c", "pcm_s16le"])
            .args(["-ar", &TRANSCODE_SAMPLE_RATE.to_string()])
            .args(["-ac", "1"])
            .arg(out)
            .output()
            .map_err(|e| {
                EngineError::Transcode(format!("failed to spawn {}: {}", self.transcode_bin, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EngineError::Transcode(format!(
                "chunk extraction at {:.0}s failed: {}",
                start_sec,
                stderr.trim()
            )));
        }

        Ok(())
    }
}
