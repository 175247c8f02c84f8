//! Signal primitives over 1-D sample arrays
//!
//! Rolling windows use centered alignment with a full window required
//! (`min_periods == window`); incomplete windows, and windows holding a
//! non-finite sample, yield NaN.

pub mod fft;
pub mod fit;

pub use fft::{Spectrum, perform_fft};

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VacError};

/// Running sums of a window, kept relative to a local shift
///
/// The shift is reset to the window's first value every `window` steps and
/// the sums recomputed, which bounds cancellation error when the scale of
/// the data changes by orders of magnitude.
struct WindowSums {
    shift: f64,
    sum: f64,
    sum_sq: f64,
}

impl WindowSums {
    fn over(slice: &[f64]) -> Self {
        let shift = slice.iter().copied().find(|v| v.is_finite()).unwrap_or(0.0);
        let mut sums = Self {
            shift,
            sum: 0.0,
            sum_sq: 0.0,
        };
        for &v in slice.iter().filter(|v| v.is_finite()) {
            sums.add(v);
        }
        sums
    }

    fn add(&mut self, v: f64) {
        let d = v - self.shift;
        self.sum += d;
        self.sum_sq += d * d;
    }

    fn remove(&mut self, v: f64) {
        let d = v - self.shift;
        self.sum -= d;
        self.sum_sq -= d * d;
    }
}

/// Feed `f(&sums, window)` for every complete, finite centered window
fn rolling_sums<F>(values: &[f64], window: usize, f: F) -> Vec<f64>
where
    F: Fn(&WindowSums, usize) -> f64,
{
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    if window == 0 || window > n {
        return out;
    }

    let half = window / 2;
    let mut sums = WindowSums::over(&values[..window]);
    let mut missing = values[..window].iter().filter(|v| !v.is_finite()).count();
    for start in 0..=n - window {
        if start > 0 {
            let (old, new) = (values[start - 1], values[start + window - 1]);
            if old.is_finite() {
                sums.remove(old);
            } else {
                missing -= 1;
            }
            if new.is_finite() {
                sums.add(new);
            } else {
                missing += 1;
            }
            if start % window == 0 {
                sums = WindowSums::over(&values[start..start + window]);
            }
        }
        if missing == 0 {
            out[start + half] = f(&sums, window);
        }
    }
    out
}

/// Centered rolling minimum
///
/// Uses a monotonic queue of candidate indices, so each sample is pushed
/// and popped at most once.
pub fn rolling_min(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    if window == 0 || window > n {
        return out;
    }

    let half = window / 2;
    let mut queue: VecDeque<usize> = VecDeque::with_capacity(window);
    let mut last_missing: Option<usize> = None;
    for end in 0..n {
        let v = values[end];
        if v.is_finite() {
            while queue.back().is_some_and(|&j| values[j] >= v) {
                queue.pop_back();
            }
            queue.push_back(end);
        } else {
            last_missing = Some(end);
        }

        if end + 1 < window {
            continue;
        }
        let start = end + 1 - window;
        while queue.front().is_some_and(|&j| j < start) {
            queue.pop_front();
        }
        if last_missing.is_some_and(|m| m >= start) {
            continue;
        }
        if let Some(&j) = queue.front() {
            out[start + half] = values[j];
        }
    }
    out
}

/// Centered rolling mean
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    rolling_sums(values, window, |s, w| s.shift + s.sum / w as f64)
}

/// Centered rolling sample standard deviation (ddof = 1)
pub fn rolling_std(values: &[f64], window: usize) -> Vec<f64> {
    rolling_sums(values, window, |s, w| {
        if w < 2 {
            return f64::NAN;
        }
        let ss = s.sum_sq - s.sum * s.sum / w as f64;
        (ss.max(0.0) / (w - 1) as f64).sqrt()
    })
}

/// Back-fill then forward-fill NaN entries in place
pub fn fill_edges(values: &mut [f64]) {
    let mut next = f64::NAN;
    for v in values.iter_mut().rev() {
        if v.is_nan() {
            *v = next;
        } else {
            next = *v;
        }
    }
    let mut prev = f64::NAN;
    for v in values.iter_mut() {
        if v.is_nan() {
            *v = prev;
        } else {
            prev = *v;
        }
    }
}

/// Centered moving average, NaN where the window does not fit
pub fn calculate_moving_average(data: &[f64], window_size: usize) -> Result<Vec<f64>> {
    if window_size == 0 {
        return Err(VacError::invalid("window_size", "must be at least 1"));
    }
    Ok(rolling_mean(data, window_size))
}

/// Numerical gradient of `y`, unit spacing when `x` is `None`
///
/// Interior points use the second-order non-uniform central difference,
/// the end points one-sided first-order differences.
pub fn gradient(y: &[f64], x: Option<&[f64]>) -> Result<Vec<f64>> {
    let n = y.len();
    if n < 2 {
        return Err(VacError::insufficient("Gradient", 2, n));
    }
    if let Some(x) = x {
        if x.len() != n {
            return Err(VacError::LengthMismatch { left: x.len(), right: n });
        }
    }
    let at = |i: usize| x.map_or(i as f64, |x| x[i]);

    let mut out = vec![0.0; n];
    out[0] = (y[1] - y[0]) / (at(1) - at(0));
    out[n - 1] = (y[n - 1] - y[n - 2]) / (at(n - 1) - at(n - 2));

    for i in 1..n - 1 {
        let hs = at(i) - at(i - 1);
        let hd = at(i + 1) - at(i);
        out[i] = (hs * hs * y[i + 1] - hd * hd * y[i - 1] + (hd * hd - hs * hs) * y[i])
            / (hs * hd * (hd + hs));
    }
    Ok(out)
}

/// Rate of change of `y` with respect to `x`
pub fn calculate_derivative(x: &[f64], y: &[f64]) -> Result<Vec<f64>> {
    gradient(y, Some(x))
}

/// Peaks or valleys found in a series
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extrema {
    pub indices: Vec<usize>,
    pub x_values: Vec<f64>,
    pub y_values: Vec<f64>,
    pub prominences: Vec<f64>,
}

/// Peaks and valleys of a series
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeaksAndValleys {
    pub peaks: Extrema,
    pub valleys: Extrema,
}

/// Local maxima; flat tops resolve to their middle sample
fn local_maxima(y: &[f64]) -> Vec<usize> {
    let n = y.len();
    let mut peaks = Vec::new();
    if n < 3 {
        return peaks;
    }

    let mut i = 1;
    while i < n - 1 {
        if y[i - 1] < y[i] {
            let mut ahead = i + 1;
            while ahead < n - 1 && y[ahead] == y[i] {
                ahead += 1;
            }
            if y[ahead] < y[i] {
                let right = ahead - 1;
                peaks.push((i + right) / 2);
                i = ahead;
                continue;
            }
        }
        i += 1;
    }
    peaks
}

/// Height of a peak above the higher of its two bases
fn prominence(y: &[f64], peak: usize) -> f64 {
    let height = y[peak];

    let mut left_min = height;
    let mut i = peak;
    loop {
        if y[i] > height {
            break;
        }
        left_min = left_min.min(y[i]);
        if i == 0 {
            break;
        }
        i -= 1;
    }

    let mut right_min = height;
    for &v in &y[peak..] {
        if v > height {
            break;
        }
        right_min = right_min.min(v);
    }

    height - left_min.max(right_min)
}

fn extrema(x: &[f64], y: &[f64], min_prominence: Option<f64>) -> Extrema {
    let mut found = Extrema::default();
    for peak in local_maxima(y) {
        let p = prominence(y, peak);
        if min_prominence.is_some_and(|min| p < min) {
            continue;
        }
        found.indices.push(peak);
        found.x_values.push(x[peak]);
        found.y_values.push(y[peak]);
        found.prominences.push(p);
    }
    found
}

/// Find peaks (local maxima) and valleys (local minima)
///
/// `prominence` is the minimum prominence a candidate must have; `None`
/// keeps every local extremum.
pub fn find_peaks_and_valleys(
    x: &[f64],
    y: &[f64],
    prominence: Option<f64>,
) -> Result<PeaksAndValleys> {
    if x.len() != y.len() {
        return Err(VacError::LengthMismatch { left: x.len(), right: y.len() });
    }

    let inverted: Vec<f64> = y.iter().map(|v| -v).collect();
    let mut valleys = extrema(x, &inverted, prominence);
    for v in valleys.y_values.iter_mut() {
        *v = -*v;
    }

    Ok(PeaksAndValleys {
        peaks: extrema(x, y, prominence),
        valleys,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nan_eq(a: &[f64], b: &[f64]) -> bool {
        a.len() == b.len()
            && a.iter()
                .zip(b)
                .all(|(x, y)| (x.is_nan() && y.is_nan()) || (x - y).abs() < 1e-12)
    }

    #[test]
    fn test_rolling_alignment_matches_centered_window() {
        let data: Vec<f64> = (0..10).map(|i| i as f64).collect();

        let odd = rolling_mean(&data, 3);
        assert!(odd[0].is_nan());
        assert_eq!(odd[1], 1.0);
        assert!(odd[9].is_nan());

        // even windows lean left: index 2 covers 0..=3
        let even = rolling_mean(&data, 4);
        assert!(even[1].is_nan());
        assert_eq!(even[2], 1.5);
        assert_eq!(even[8], 7.5);
        assert!(even[9].is_nan());
    }

    #[test]
    fn test_rolling_window_larger_than_data() {
        let out = rolling_std(&[1.0, 2.0, 3.0], 5);
        assert!(out.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_rolling_std_and_min() {
        let data = vec![1.0, 3.0, 5.0, 7.0];
        let std = rolling_std(&data, 3);
        assert!(nan_eq(&std, &[f64::NAN, 2.0, 2.0, f64::NAN]));
        let min = rolling_min(&data, 3);
        assert!(nan_eq(&min, &[f64::NAN, 1.0, 3.0, f64::NAN]));
    }

    #[test]
    fn test_rolling_skips_windows_with_nan() {
        let data = vec![4.0, 2.0, f64::NAN, 8.0, 6.0, 1.0, 3.0];
        let min = rolling_min(&data, 3);
        assert!(nan_eq(&min, &[f64::NAN, f64::NAN, f64::NAN, f64::NAN, 1.0, 1.0, f64::NAN]));
        let mean = rolling_mean(&data, 3);
        assert!(nan_eq(&mean, &[f64::NAN, f64::NAN, f64::NAN, f64::NAN, 5.0, 10.0 / 3.0, f64::NAN]));
    }

    #[test]
    fn test_rolling_std_across_decades() {
        // 1e-1 down to ~1e-9 with a 1% ripple; running sums must track the small windows
        let data: Vec<f64> = (0..400)
            .map(|i| {
                let t = i as f64;
                1e-1 * (-t / 20.0).exp() + 1e-9 * (1.0 + 0.01 * (t * 0.7).sin())
            })
            .collect();
        let window = 25;
        let fast = rolling_std(&data, window);
        let half = window / 2;
        for i in half..data.len() - (window - half) {
            let slice = &data[i - half..i - half + window];
            let mean = slice.iter().sum::<f64>() / window as f64;
            let ss: f64 = slice.iter().map(|v| (v - mean).powi(2)).sum();
            let exact = (ss / (window - 1) as f64).sqrt();
            assert!((fast[i] - exact).abs() <= 1e-6 * exact + 1e-20, "index {i}: {} vs {exact}", fast[i]);
        }
    }

    #[test]
    fn test_fill_edges() {
        let mut data = vec![f64::NAN, 2.0, f64::NAN, 4.0, f64::NAN];
        fill_edges(&mut data);
        assert_eq!(data, vec![2.0, 2.0, 4.0, 4.0, 4.0]);
    }

    #[test]
    fn test_gradient_uniform_and_nonuniform() {
        let y = vec![1.0, 4.0, 9.0, 16.0];
        assert_eq!(gradient(&y, None).unwrap(), vec![3.0, 4.0, 6.0, 7.0]);

        let x = vec![0.0, 1.0, 3.0];
        let y: Vec<f64> = x.iter().map(|v| 2.0 * v + 1.0).collect();
        let d = calculate_derivative(&x, &y).unwrap();
        assert!(d.iter().all(|v| (v - 2.0).abs() < 1e-12));
    }

    #[test]
    fn test_moving_average_rejects_zero_window() {
        assert!(calculate_moving_average(&[1.0, 2.0], 0).is_err());
    }

    #[test]
    fn test_find_peaks_and_valleys() {
        let x: Vec<f64> = (0..9).map(|i| i as f64).collect();
        let y = vec![0.0, 2.0, 1.0, 5.0, 5.0, 5.0, 0.0, 1.0, 0.0];

        let found = find_peaks_and_valleys(&x, &y, None).unwrap();
        assert_eq!(found.peaks.indices, vec![1, 4, 7]);
        assert_eq!(found.peaks.prominences, vec![1.0, 5.0, 1.0]);
        assert_eq!(found.valleys.indices, vec![2, 6]);
        assert_eq!(found.valleys.y_values, vec![1.0, 0.0]);

        let strong = find_peaks_and_valleys(&x, &y, Some(2.0)).unwrap();
        assert_eq!(strong.peaks.indices, vec![4]);
    }
}
