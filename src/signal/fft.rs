//! FFT computation using rustfft
//!
//! Bins follow the `fftfreq` layout: bin `k` sits at `k * rate / n`, and
//! only strictly positive frequencies are returned. The input is not padded.

use rustfft::FftPlanner;
use rustfft::num_complex::Complex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VacError};

/// Positive half of a magnitude spectrum
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Spectrum {
    /// Bin frequencies (Hz)
    pub frequencies: Vec<f64>,
    /// Bin magnitudes `|X_k|`
    pub amplitudes: Vec<f64>,
}

impl Spectrum {
    /// Squared magnitudes
    pub fn power(&self) -> Vec<f64> {
        self.amplitudes.iter().map(|a| a * a).collect()
    }

    /// Frequency and magnitude of the strongest bin
    pub fn dominant(&self) -> Option<(f64, f64)> {
        self.amplitudes
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, f64)>, (i, &a)| match best {
                Some((_, b)) if b >= a => best,
                _ => Some((i, a)),
            })
            .map(|(i, a)| (self.frequencies[i], a))
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }
}

/// Compute the positive-frequency spectrum of `data`
///
/// NaN samples are dropped before the transform.
pub fn perform_fft(data: &[f64], sample_rate: f64) -> Result<Spectrum> {
    profiling::scope!("perform_fft");

    if !sample_rate.is_finite() || sample_rate <= 0.0 {
        return Err(VacError::invalid("sample_rate", format!("{} is not a positive rate", sample_rate)));
    }

    let samples: Vec<f64> = data.iter().copied().filter(|v| !v.is_nan()).collect();
    let n = samples.len();
    if n < 2 {
        return Err(VacError::insufficient("FFT", 2, n));
    }

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(n);
    let mut buffer: Vec<Complex<f64>> = samples.iter().map(|&s| Complex::new(s, 0.0)).collect();
    fft.process(&mut buffer);

    let positive_bins = (n - 1) / 2;
    let resolution = sample_rate / n as f64;

    Ok(Spectrum {
        frequencies: (1..=positive_bins).map(|k| k as f64 * resolution).collect(),
        amplitudes: buffer[1..=positive_bins].iter().map(|c| c.norm()).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_fft_dominant_frequency() {
        let rate = 100.0;
        let samples: Vec<f64> = (0..200)
            .map(|i| (2.0 * PI * 5.0 * i as f64 / rate).sin())
            .collect();

        let spectrum = perform_fft(&samples, rate).unwrap();
        let (freq, amp) = spectrum.dominant().unwrap();

        assert!((freq - 5.0).abs() < 1e-9);
        assert!((amp - 100.0).abs() < 1e-6);
        assert_eq!(spectrum.frequencies.len(), 99);
    }

    #[test]
    fn test_fft_bin_layout_odd_length() {
        let spectrum = perform_fft(&[1.0, 2.0, 3.0, 4.0, 5.0], 10.0).unwrap();
        assert_eq!(spectrum.frequencies, vec![2.0, 4.0]);
    }

    #[test]
    fn test_fft_rejects_bad_input() {
        assert!(perform_fft(&[1.0], 1.0).is_err());
        assert!(perform_fft(&[1.0, 2.0, 3.0], 0.0).is_err());
    }
}
