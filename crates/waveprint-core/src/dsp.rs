//! Scalar DSP primitives: low-pass filtering, decimation, windowing, and
//! FFT magnitudes.

use rustfft::{num_complex::Complex, FftPlanner};
use std::f64::consts::PI;

use crate::error::EngineError;

/// First-order IIR low-pass filter attenuating content above `cutoff_hz`.
///
/// A single pole is enough here: the filter only has to tame aliasing
/// ahead of a modest decimation ratio.
pub fn low_pass_filter(cutoff_hz: f64, sample_rate: f64, input: &[f64]) -> Vec<f64> {
    let rc = 1.0 / (2.0 * PI * cutoff_hz);
    let dt = 1.0 / sample_rate;
    let alpha = dt / (rc + dt);

    let mut filtered = Vec::with_capacity(input.len());
    let mut prev = 0.0;
    for (i, &x) in input.iter().enumerate() {
        let y = if i == 0 {
            alpha * x
        } else {
            alpha * x + (1.0 - alpha) * prev
        };
        filtered.push(y);
        prev = y;
    }
    filtered
}

/// Decimate `input` from `original_rate` to `target_rate` by averaging
/// buckets of `original_rate / target_rate` samples. The tail bucket may
/// be shorter than the ratio.
pub fn downsample(
    input: &[f64],
    original_rate: u32,
    target_rate: u32,
) -> Result<Vec<f64>, EngineError> {
    if original_rate == 0 || target_rate == 0 {
        return Err(EngineError::Config("sample rates must be positive".into()));
    }
    if target_rate > original_rate {
        return Err(EngineError::Config(
            "target sample rate must not exceed the original rate".into(),
        ));
    }

    let ratio = (original_rate / target_rate) as usize;
    let mut resampled = Vec::with_capacity(input.len() / ratio + 1);
    let mut start = 0;
    while start < input.len() {
        let end = (start + ratio).min(input.len());
        let sum: f64 = input[start..end].iter().sum();
        resampled.push(sum / (end - start) as f64);
        start = end;
    }

    Ok(resampled)
}

/// Hann window of length `size`.
pub fn hann_window(size: usize) -> Vec<f64> {
    (0..size)
        .map(|i| {
            let theta = 2.0 * PI * i as f64 / (size - 1) as f64;
            0.5 - 0.5 * theta.cos()
        })
        .collect()
}

/// Magnitudes of the first `len/2` spectrum bins of a real-valued frame.
///
/// One-shot helper; the spectrogram loop plans its FFT once and reuses it
/// across frames instead.
pub fn fft_magnitudes(frame: &[f64]) -> Vec<f64> {
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(frame.len());

    let mut buffer: Vec<Complex<f64>> = frame.iter().map(|&s| Complex::new(s, 0.0)).collect();
    fft.process(&mut buffer);

    buffer[..frame.len() / 2].iter().map(|c| c.norm()).collect()
}
