//! Chunked fingerprinting driver
//!
//! Streams arbitrarily long audio through the DSP pipeline in
//! bounded-duration chunks, keeping peak memory proportional to the chunk
//! length rather than the file length. Consecutive chunks overlap so that
//! anchor/target pairs straddling a boundary are still emitted; the
//! mapping semantics absorb the duplicate addresses.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::fingerprint::{fingerprint_peaks, FingerprintEntry};
use crate::peaks::extract_peaks;
use crate::spectrogram::compute_spectrogram;
use crate::transcoder::Transcoder;
use crate::wav;

/// Seconds shared between consecutive chunks.
const CHUNK_OVERLAP_SEC: f64 = 5.0;

static CHUNK_SEQ: AtomicU64 = AtomicU64::new(0);

/// Cooperative cancellation flag, checked at chunk boundaries. Partial
/// results are discarded on cancel.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Chunk schedule for a file of `total_duration` seconds: `(start, dur)`
/// pairs. A non-positive chunk duration processes the whole file at once.
pub(crate) fn chunk_plan(total_duration: f64, chunk_duration: f64) -> Vec<(f64, f64)> {
    let chunk = if chunk_duration <= 0.0 {
        total_duration
    } else {
        chunk_duration
    };

    let mut step = chunk - CHUNK_OVERLAP_SEC;
    if step <= 0.0 {
        step = chunk;
    }

    let mut plan = Vec::new();
    let mut start = 0.0;
    while start < total_duration {
        let dur = chunk.min(total_duration - start);
        if dur <= 0.0 {
            break;
        }
        plan.push((start, dur));
        start += step;
    }
    plan
}

/// Fingerprint an audio file through the transcoder, one chunk at a time.
///
/// Returns the accumulated `address -> entry` mapping with anchor times
/// absolute in the source. Any per-chunk failure aborts the whole
/// operation; no partial result is returned.
pub fn fingerprint_file(
    input: &Path,
    work_id: u32,
    config: &EngineConfig,
    transcoder: &Transcoder,
    cancel: Option<&CancelToken>,
) -> Result<HashMap<u32, FingerprintEntry>, EngineError> {
    config.validate()?;

    let duration = transcoder.probe_duration(input)?;
    if duration <= 0.0 {
        return Err(EngineError::Input(format!(
            "{} contains no audio",
            input.display()
        )));
    }

    let plan = chunk_plan(duration, config.chunk_duration_sec);
    log::info!(
        "fingerprinting {}: {:.0}s of audio in {} chunk(s)",
        input.display(),
        duration,
        plan.len()
    );

    let mut fingerprints = HashMap::new();
    for (chunk_idx, &(start, dur)) in plan.iter().enumerate() {
        if let Some(token) = cancel {
            if token.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
        }

        let chunk_started = Instant::now();
        let wav_path = chunk_temp_path(start);

        if let Err(err) = transcoder.extract_chunk(input, start, dur, &wav_path) {
            let _ = std::fs::remove_file(&wav_path);
            return Err(err);
        }

        let parsed = wav::read_wav(&wav_path);
        let _ = std::fs::remove_file(&wav_path);
        let chunk = parsed?;

        let chunk_fp = fingerprint_samples(
            &chunk.samples,
            chunk.sample_rate,
            chunk.duration_sec,
            start,
            work_id,
            config,
        )?;

        log::debug!(
            "chunk {} [{:.0}s - {:.0}s]: {} fingerprints in {:?}",
            chunk_idx,
            start,
            start + dur,
            chunk_fp.len(),
            chunk_started.elapsed()
        );

        fingerprints.extend(chunk_fp);
    }

    log::info!(
        "fingerprinted {}: {} fingerprints from {} chunk(s)",
        input.display(),
        fingerprints.len(),
        plan.len()
    );
    Ok(fingerprints)
}

/// Fingerprint an in-memory chunk of mono PCM. `start_offset_sec` shifts
/// peak times so they reflect position in the full source.
pub fn fingerprint_samples(
    samples: &[f64],
    sample_rate: u32,
    duration_sec: f64,
    start_offset_sec: f64,
    work_id: u32,
    config: &EngineConfig,
) -> Result<HashMap<u32, FingerprintEntry>, EngineError> {
    config.validate()?;

    let spectrogram = compute_spectrogram(samples, sample_rate, config)?;
    let mut peaks = extract_peaks(&spectrogram, duration_sec, sample_rate, config);
    drop(spectrogram);

    for peak in &mut peaks {
        peak.time_sec += start_offset_sec;
    }

    Ok(fingerprint_peaks(&peaks, work_id, config))
}

fn chunk_temp_path(start_sec: f64) -> PathBuf {
    let seq = CHUNK_SEQ.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!(
        "waveprint_chunk_{}_{}_{:.0}.wav",
        std::process::id(),
        seq,
        start_sec
    ))
}
