//! Noise characteristics of a pressure trace

use serde::Serialize;

use crate::data::stats::finite_values;
use crate::error::{Result, VacError};
use crate::signal::fft::perform_fft;
use crate::signal::fit::polyfit;

/// Result of [`calculate_noise_metrics`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoiseMetrics {
    /// Root mean square of the detrended signal
    pub noise_rms: f64,
    /// Peak-to-peak of the detrended signal
    pub noise_p2p: f64,
    /// Signal to noise ratio in dB, `None` when the noise power is zero
    pub snr_db: Option<f64>,
    /// Frequency of the strongest positive bin (Hz), 0 when there is none
    pub dominant_frequency: f64,
    pub frequencies: Vec<f64>,
    pub power_spectrum: Vec<f64>,
    pub detrended: Vec<f64>,
}

/// Remove a quadratic trend and characterize what is left
pub fn calculate_noise_metrics(pressure: &[f64], sample_rate_hz: f64) -> Result<NoiseMetrics> {
    profiling::scope!("calculate_noise_metrics");

    let values = finite_values(pressure);
    if values.len() < 3 {
        return Err(VacError::insufficient("Noise analysis", 3, values.len()));
    }

    let x: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();
    let trend = polyfit(&x, &values, 2)?;
    let detrended: Vec<f64> = x
        .iter()
        .zip(&values)
        .map(|(&xi, &p)| p - trend.eval(xi))
        .collect();

    let n = detrended.len() as f64;
    let noise_power = detrended.iter().map(|d| d * d).sum::<f64>() / n;
    let signal_power = values.iter().map(|p| p * p).sum::<f64>() / n;
    let noise_p2p = detrended.iter().copied().fold(f64::NEG_INFINITY, f64::max)
        - detrended.iter().copied().fold(f64::INFINITY, f64::min);

    let snr_db = (noise_power > 0.0).then(|| 10.0 * (signal_power / noise_power).log10());

    let spectrum = perform_fft(&detrended, sample_rate_hz)?;
    let power_spectrum = spectrum.power();
    let dominant_frequency = spectrum.dominant().map_or(0.0, |(f, _)| f);

    Ok(NoiseMetrics {
        noise_rms: noise_power.sqrt(),
        noise_p2p,
        snr_db,
        dominant_frequency,
        frequencies: spectrum.frequencies,
        power_spectrum,
        detrended,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_noise_on_trend() {
        let amplitude = 1e-7;
        let pressure: Vec<f64> = (0..200)
            .map(|i| {
                let t = i as f64;
                1e-5 - 2e-8 * t + 5e-11 * t * t + amplitude * (2.0 * PI * 0.1 * t).sin()
            })
            .collect();

        let metrics = calculate_noise_metrics(&pressure, 1.0).unwrap();

        assert!((metrics.dominant_frequency - 0.1).abs() < 1e-9);
        let expected_rms = amplitude / 2f64.sqrt();
        assert!((metrics.noise_rms - expected_rms).abs() / expected_rms < 0.1);
        assert!(metrics.noise_p2p > amplitude && metrics.noise_p2p < 2.5 * amplitude);
        assert!(metrics.snr_db.unwrap() > 30.0);
        assert_eq!(metrics.detrended.len(), 200);
        assert_eq!(metrics.frequencies.len(), metrics.power_spectrum.len());
    }

    #[test]
    fn test_noise_needs_three_points() {
        assert!(matches!(
            calculate_noise_metrics(&[1.0, f64::NAN, 2.0], 1.0),
            Err(VacError::InsufficientData { .. })
        ));
    }
}
