//! Missing-value handling, outlier removal and smoothing for series data

use serde::{Deserialize, Serialize};

use crate::data::stats::{OutlierMethod, detect_outliers};
use crate::signal::rolling_mean;

/// How missing (NaN) samples are treated before plotting or analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingDataMethod {
    /// Drop rows where either coordinate is missing
    #[default]
    Drop,
    /// Linear interpolation against the row position
    Interpolate,
    /// Carry the last valid value forward
    Forward,
    /// Carry the next valid value backward
    Backward,
    /// Replace with zero
    Zero,
    /// Replace with the mean of the valid values
    Mean,
}

impl MissingDataMethod {
    pub fn label(&self) -> &'static str {
        match self {
            MissingDataMethod::Drop => "Drop missing rows",
            MissingDataMethod::Interpolate => "Linear interpolation",
            MissingDataMethod::Forward => "Forward fill",
            MissingDataMethod::Backward => "Backward fill",
            MissingDataMethod::Zero => "Fill with zero",
            MissingDataMethod::Mean => "Fill with mean",
        }
    }
}

/// Linear interpolation across interior NaN runs; leading and trailing NaN stay
pub fn interpolate_linear(values: &mut [f64]) {
    let mut last_valid: Option<usize> = None;
    for i in 0..values.len() {
        if values[i].is_nan() {
            continue;
        }
        if let Some(prev) = last_valid {
            if i - prev > 1 {
                let start = values[prev];
                let step = (values[i] - start) / (i - prev) as f64;
                for (k, slot) in values[prev + 1..i].iter_mut().enumerate() {
                    *slot = start + step * (k + 1) as f64;
                }
            }
        }
        last_valid = Some(i);
    }
}

/// Forward fill NaN entries
pub fn forward_fill(values: &mut [f64]) {
    let mut prev = f64::NAN;
    for v in values.iter_mut() {
        if v.is_nan() {
            *v = prev;
        } else {
            prev = *v;
        }
    }
}

/// Backward fill NaN entries
pub fn backward_fill(values: &mut [f64]) {
    let mut next = f64::NAN;
    for v in values.iter_mut().rev() {
        if v.is_nan() {
            *v = next;
        } else {
            next = *v;
        }
    }
}

/// Fill NaN entries of a single series in place
///
/// `Drop` leaves the values untouched; row removal needs both coordinates
/// and is done by [`handle_missing`].
pub fn fill_missing(values: &mut [f64], method: MissingDataMethod) {
    match method {
        MissingDataMethod::Drop => {}
        MissingDataMethod::Interpolate => interpolate_linear(values),
        MissingDataMethod::Forward => forward_fill(values),
        MissingDataMethod::Backward => backward_fill(values),
        MissingDataMethod::Zero => values.iter_mut().filter(|v| v.is_nan()).for_each(|v| *v = 0.0),
        MissingDataMethod::Mean => {
            let valid: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
            if valid.is_empty() {
                return;
            }
            let mean = valid.iter().sum::<f64>() / valid.len() as f64;
            values.iter_mut().filter(|v| v.is_nan()).for_each(|v| *v = mean);
        }
    }
}

/// Apply a missing-data method to an `(x, y)` pair
///
/// Fill methods operate on `y` only. Rows where a coordinate is still
/// missing afterwards are removed, so the result never contains NaN.
pub fn handle_missing(x: &[f64], y: &[f64], method: MissingDataMethod) -> (Vec<f64>, Vec<f64>) {
    let mut filled = y.to_vec();
    fill_missing(&mut filled, method);

    x.iter()
        .zip(&filled)
        .filter(|(a, b)| !a.is_nan() && !b.is_nan())
        .map(|(a, b)| (*a, *b))
        .unzip()
}

/// Replace outliers with NaN
pub fn remove_outliers(values: &[f64], method: OutlierMethod, threshold: f64) -> Vec<f64> {
    let report = detect_outliers(values, method, threshold);
    let mut cleaned = values.to_vec();
    for idx in report.indices {
        cleaned[idx] = f64::NAN;
    }
    cleaned
}

/// Clamp outliers to the detection bounds
pub fn cap_outliers(values: &[f64], method: OutlierMethod, threshold: f64) -> Vec<f64> {
    let report = detect_outliers(values, method, threshold);
    let mut capped = values.to_vec();
    for idx in report.indices {
        capped[idx] = capped[idx].clamp(report.lower_bound, report.upper_bound);
    }
    capped
}

/// Smoothing filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmoothingMethod {
    /// Centered moving average, edges keep the raw values
    #[default]
    MovingAverage,
    /// Exponentially weighted mean with span `window`
    Exponential,
}

/// Exponentially weighted moving average (`lambda` in `(0, 1]`)
pub fn ewma(values: &[f64], lambda: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut current = f64::NAN;
    for &v in values {
        if v.is_nan() {
            out.push(current);
            continue;
        }
        current = if current.is_nan() { v } else { lambda * v + (1.0 - lambda) * current };
        out.push(current);
    }
    out
}

/// Smooth a series, returning a vector of the same length
pub fn smooth(values: &[f64], window: usize, method: SmoothingMethod) -> Vec<f64> {
    if window < 2 {
        return values.to_vec();
    }
    match method {
        SmoothingMethod::MovingAverage => rolling_mean(values, window)
            .into_iter()
            .zip(values)
            .map(|(s, &raw)| if s.is_nan() { raw } else { s })
            .collect(),
        SmoothingMethod::Exponential => ewma(values, 2.0 / (window as f64 + 1.0)),
    }
}
