//! Magnitude spectrogram of a mono PCM signal

use rustfft::{num_complex::Complex, FftPlanner};

use crate::config::EngineConfig;
use crate::dsp;
use crate::error::EngineError;

/// Compute the magnitude spectrogram of `samples` at `sample_rate`.
///
/// The signal is low-passed at the configured cutoff, decimated by the
/// DSP ratio, then sliced into Hann-windowed frames of `window_size`
/// stepped by `hop_size`. Each output frame holds the magnitudes of the
/// first `window_size / 2` spectrum bins. Inputs shorter than one window
/// produce an empty spectrogram.
pub fn compute_spectrogram(
    samples: &[f64],
    sample_rate: u32,
    config: &EngineConfig,
) -> Result<Vec<Vec<f64>>, EngineError> {
    let filtered = dsp::low_pass_filter(config.max_freq_hz, sample_rate as f64, samples);

    let target_rate = sample_rate / config.dsp_ratio as u32;
    let downsampled = dsp::downsample(&filtered, sample_rate, target_rate)?;
    drop(filtered);

    let window = dsp::hann_window(config.window_size);
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(config.window_size);

    let mut frames = Vec::with_capacity(downsampled.len() / config.hop_size + 1);
    let mut start = 0;
    while start + config.window_size <= downsampled.len() {
        let mut buffer: Vec<Complex<f64>> = downsampled[start..start + config.window_size]
            .iter()
            .zip(&window)
            .map(|(&s, &w)| Complex::new(s * w, 0.0))
            .collect();

        fft.process(&mut buffer);

        frames.push(
            buffer[..config.window_size / 2]
                .iter()
                .map(|c| c.norm())
                .collect(),
        );

        start += config.hop_size;
    }

    Ok(frames)
}
