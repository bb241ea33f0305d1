//! Offline analysis of rendered audio
//!
//! Level and spectrum measurements used by the render tool's report and by
//! the integration tests to make assertions about panning energy and pitch
//! scaling without listening.

use std::f32::consts::PI;

use rustfft::{num_complex::Complex, FftPlanner};

pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|x| x * x).sum::<f32>() / samples.len() as f32).sqrt()
}

pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().map(|x| x.abs()).fold(0.0, f32::max)
}

/// Strongest spectral component in Hz, DC excluded.
///
/// Analyzes up to the first 2048 samples through a Hamming window; the
/// result is quantized to the FFT bin width (`sample_rate / window`).
pub fn dominant_frequency(samples: &[f32], sample_rate: f32) -> f32 {
    let window_size = 2048.min(samples.len());
    if window_size < 2 {
        return 0.0;
    }
    let windowed: Vec<Complex<f32>> = samples[..window_size]
        .iter()
        .enumerate()
        .map(|(i, &x)| {
            let w = 0.54 - 0.46 * (2.0 * PI * i as f32 / (window_size - 1) as f32).cos();
            Complex { re: x * w, im: 0.0 }
        })
        .collect();

    let mut buffer = windowed;
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(window_size);
    fft.process(&mut buffer);

    // Positive frequencies only, skip the DC bin
    let num_bins = window_size / 2;
    let dominant_bin = buffer[1..num_bins]
        .iter()
        .enumerate()
        .map(|(i, c)| (i + 1, c.norm_sqr()))
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
        .unwrap_or(0);

    dominant_bin as f32 * sample_rate / window_size as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: f32, frames: usize) -> Vec<f32> {
        (0..frames)
            .map(|i| (2.0 * PI * freq * i as f32 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn test_rms_of_full_scale_sine() {
        let signal = sine(440.0, 44100.0, 4410);
        let level = rms(&signal);
        assert!(
            (level - std::f32::consts::FRAC_1_SQRT_2).abs() < 0.01,
            "sine RMS should be ~0.707, got {}",
            level
        );
    }

    #[test]
    fn test_peak_and_empty_input() {
        assert_eq!(rms(&[]), 0.0);
        assert_eq!(peak(&[]), 0.0);
        assert_eq!(peak(&[0.1, -0.9, 0.4]), 0.9);
    }

    #[test]
    fn test_dominant_frequency_of_sine() {
        let sample_rate = 44100.0;
        let signal = sine(440.0, sample_rate, 4096);
        let freq = dominant_frequency(&signal, sample_rate);
        let bin_width = sample_rate / 2048.0;
        assert!(
            (freq - 440.0).abs() <= bin_width,
            "expected ~440 Hz, got {}",
            freq
        );
    }

    #[test]
    fn test_dominant_frequency_tracks_the_louder_tone() {
        let sample_rate = 44100.0;
        let a = sine(300.0, sample_rate, 4096);
        let b = sine(1200.0, sample_rate, 4096);
        let mixed: Vec<f32> = a
            .iter()
            .zip(&b)
            .map(|(x, y)| 0.2 * x + 0.8 * y)
            .collect();
        let freq = dominant_frequency(&mixed, sample_rate);
        assert!((freq - 1200.0).abs() < 50.0, "got {}", freq);
    }
}
