//! Base pressure: the lowest pressure the system holds stably

use serde::Serialize;

use crate::data::stats::{finite_values, percentile};
use crate::error::{Result, VacError};
use crate::signal::{rolling_min, rolling_std};

/// Result of [`calculate_base_pressure`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasePressure {
    /// Rolling minimum at the most stable window
    pub base_pressure: f64,
    /// Rolling standard deviation at that window
    pub stability: f64,
    /// `1 / (1 + stability / base_pressure)`
    pub confidence: f64,
    pub window_minutes: f64,
    pub window_samples: usize,
    /// `None` when the window never fit and the global minimum was used
    pub most_stable_index: Option<usize>,
    pub rolling_min: Vec<f64>,
    pub rolling_std: Vec<f64>,
}

fn population_std(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
}

/// Find the base pressure from the most stable window of the series
///
/// The window spans `window_minutes * 60 * sample_rate_hz` samples. When
/// the window is longer than the data every rolling value is NaN and the
/// global minimum is reported instead.
pub fn calculate_base_pressure(
    pressure: &[f64],
    window_minutes: f64,
    sample_rate_hz: f64,
) -> Result<BasePressure> {
    profiling::scope!("calculate_base_pressure");

    if window_minutes.is_nan() || window_minutes <= 0.0 {
        return Err(VacError::invalid("window_minutes", "must be positive"));
    }
    if sample_rate_hz.is_nan() || sample_rate_hz <= 0.0 {
        return Err(VacError::invalid("sample_rate_hz", "must be positive"));
    }

    let valid = finite_values(pressure);
    if valid.is_empty() {
        return Err(VacError::EmptyDataset);
    }

    let window_samples = ((window_minutes * 60.0 * sample_rate_hz).floor() as usize).max(1);
    let mins = rolling_min(pressure, window_samples);
    let stds = rolling_std(pressure, window_samples);

    let most_stable_index = stds
        .iter()
        .enumerate()
        .filter(|(_, s)| !s.is_nan())
        .fold(None, |best: Option<(usize, f64)>, (i, &s)| match best {
            Some((_, b)) if b <= s => best,
            _ => Some((i, s)),
        })
        .map(|(i, _)| i);

    let (base_pressure, stability) = match most_stable_index {
        Some(idx) => (mins[idx], stds[idx]),
        None => {
            tracing::debug!(
                window_samples,
                len = pressure.len(),
                "window longer than data, using global minimum"
            );
            let global_min = valid.iter().copied().fold(f64::INFINITY, f64::min);
            (global_min, population_std(&valid))
        }
    };

    let confidence = if stability > 0.0 {
        if base_pressure > 0.0 {
            1.0 / (1.0 + stability / base_pressure)
        } else {
            0.0
        }
    } else {
        1.0
    };

    Ok(BasePressure {
        base_pressure,
        stability,
        confidence,
        window_minutes,
        window_samples,
        most_stable_index,
        rolling_min: mins,
        rolling_std: stds,
    })
}

/// Base pressure as a low percentile of the valid samples
pub fn base_pressure_percentile(pressure: &[f64], q: f64) -> Result<f64> {
    let valid = finite_values(pressure);
    if valid.len() < 2 {
        return Err(VacError::insufficient("Base pressure", 2, valid.len()));
    }
    Ok(percentile(&valid, q))
}
