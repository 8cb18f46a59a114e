//! Banded peak extraction from a magnitude spectrogram

use crate::config::EngineConfig;

/// A significant point in the spectrogram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    /// Frequency in Hz.
    pub freq_hz: f64,
    /// Offset from the start of the source, in seconds.
    pub time_sec: f64,
}

/// Extract per-band maxima that rise above the frame's average band
/// energy.
///
/// For every frame the strongest bin of each configured band is
/// collected, then only bands strictly above the mean of those maxima
/// emit a peak. Bands at or below the mean are dropped, which keeps
/// roughly the upper half of band energies and suppresses silent frames
/// entirely.
pub fn extract_peaks(
    spectrogram: &[Vec<f64>],
    audio_duration_sec: f64,
    sample_rate: u32,
    config: &EngineConfig,
) -> Vec<Peak> {
    if spectrogram.is_empty() {
        return Vec::new();
    }

    let freq_resolution = config.freq_resolution(sample_rate);
    let frame_duration = audio_duration_sec / spectrogram.len() as f64;
    let half_window = config.window_size / 2;

    let mut peaks = Vec::new();
    for (frame_idx, frame) in spectrogram.iter().enumerate() {
        // (magnitude, bin) of the strongest bin per band
        let mut band_maxima: Vec<(f64, usize)> = Vec::with_capacity(config.freq_bands.len());

        for &(lo, hi) in &config.freq_bands {
            let hi = hi.min(half_window).min(frame.len());
            if lo >= hi {
                continue;
            }

            let mut best_mag = 0.0;
            let mut best_idx = 0;
            for idx in lo..hi {
                if frame[idx] > best_mag {
                    best_mag = frame[idx];
                    best_idx = idx;
                }
            }
            band_maxima.push((best_mag, best_idx));
        }

        if band_maxima.is_empty() {
            continue;
        }

        let avg: f64 =
            band_maxima.iter().map(|(mag, _)| mag).sum::<f64>() / band_maxima.len() as f64;

        for &(mag, idx) in &band_maxima {
            if mag > avg {
                peaks.push(Peak {
                    time_sec: frame_idx as f64 * frame_duration,
                    freq_hz: idx as f64 * freq_resolution,
                });
            }
        }
    }

    peaks
}
