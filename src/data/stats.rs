use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};
use statrs::statistics::Statistics as _;

use crate::constants::stats::{DEFAULT_IQR_THRESHOLD, DEFAULT_ZSCORE_THRESHOLD, OUTLIER_MIN_POINTS};
use crate::error::{Result, VacError};
use crate::signal::fit::{pearson, polyfit, r_squared};

/// Descriptive statistics of a series (NaN values excluded)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation
    pub std: f64,
    /// Population variance
    pub var: f64,
    pub min: f64,
    pub max: f64,
    pub range: f64,
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub skewness: f64,
    /// Excess kurtosis
    pub kurtosis: f64,
    /// Coefficient of variation, NaN when the mean is zero
    pub cv: f64,
}

/// Copy of `data` without NaN entries
pub fn finite_values(data: &[f64]) -> Vec<f64> {
    data.iter().copied().filter(|v| !v.is_nan()).collect()
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let rank = (q / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

/// Percentile `q` (0-100) with linear interpolation between ranks
pub fn percentile(data: &[f64], q: f64) -> f64 {
    percentile_sorted(&sorted(&finite_values(data)), q)
}

/// Median of the non-NaN values
pub fn median(data: &[f64]) -> f64 {
    percentile(data, 50.0)
}

/// Calculate comprehensive statistics for a data series
pub fn calculate_statistics(data: &[f64]) -> Result<Statistics> {
    let values = finite_values(data);
    if values.is_empty() {
        return Err(VacError::EmptyDataset);
    }

    let ordered = sorted(&values);
    let count = values.len();
    let mean = values.iter().mean();
    let var = values.iter().population_variance();
    let std = var.sqrt();

    let n = count as f64;
    let m3 = values.iter().map(|v| (v - mean).powi(3)).sum::<f64>() / n;
    let m4 = values.iter().map(|v| (v - mean).powi(4)).sum::<f64>() / n;
    let (skewness, kurtosis) = if var > 0.0 {
        (m3 / var.powf(1.5), m4 / (var * var) - 3.0)
    } else {
        (f64::NAN, f64::NAN)
    };

    let min = ordered[0];
    let max = ordered[count - 1];
    let q1 = percentile_sorted(&ordered, 25.0);
    let q3 = percentile_sorted(&ordered, 75.0);

    Ok(Statistics {
        count,
        mean,
        median: percentile_sorted(&ordered, 50.0),
        std,
        var,
        min,
        max,
        range: max - min,
        q1,
        q3,
        iqr: q3 - q1,
        skewness,
        kurtosis,
        cv: if mean != 0.0 { std / mean } else { f64::NAN },
    })
}

/// Outlier detection method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierMethod {
    /// Outside `[q1 - k*iqr, q3 + k*iqr]`
    Iqr,
    /// More than `k` population standard deviations from the mean
    #[default]
    ZScore,
    /// More than `k` median absolute deviations from the median
    Mad,
}

impl OutlierMethod {
    /// Conventional `k` for the method
    pub fn default_threshold(self) -> f64 {
        match self {
            OutlierMethod::Iqr => DEFAULT_IQR_THRESHOLD,
            OutlierMethod::ZScore | OutlierMethod::Mad => DEFAULT_ZSCORE_THRESHOLD,
        }
    }
}

/// Outliers found in a series
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutlierReport {
    /// Indices into the original (NaN-including) array
    pub indices: Vec<usize>,
    pub values: Vec<f64>,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub count: usize,
    pub percentage: f64,
}

/// Detect outliers in data
///
/// Fewer than three valid points produce an empty report.
pub fn detect_outliers(data: &[f64], method: OutlierMethod, threshold: f64) -> OutlierReport {
    let values = finite_values(data);
    if values.len() < OUTLIER_MIN_POINTS {
        return OutlierReport {
            lower_bound: f64::NAN,
            upper_bound: f64::NAN,
            ..Default::default()
        };
    }

    let ordered = sorted(&values);
    let (lower_bound, upper_bound) = match method {
        OutlierMethod::Iqr => {
            let q1 = percentile_sorted(&ordered, 25.0);
            let q3 = percentile_sorted(&ordered, 75.0);
            let iqr = q3 - q1;
            (q1 - threshold * iqr, q3 + threshold * iqr)
        }
        OutlierMethod::ZScore => {
            let mean = values.iter().mean();
            let std = values.iter().population_std_dev();
            (mean - threshold * std, mean + threshold * std)
        }
        OutlierMethod::Mad => {
            let med = percentile_sorted(&ordered, 50.0);
            let deviations: Vec<f64> = values.iter().map(|v| (v - med).abs()).collect();
            let mad = percentile(&deviations, 50.0);
            (med - threshold * mad, med + threshold * mad)
        }
    };

    let (indices, outliers): (Vec<usize>, Vec<f64>) = data
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.is_nan() && (**v < lower_bound || **v > upper_bound))
        .map(|(i, v)| (i, *v))
        .unzip();

    let count = indices.len();
    OutlierReport {
        indices,
        values: outliers,
        lower_bound,
        upper_bound,
        count,
        percentage: count as f64 / values.len() as f64 * 100.0,
    }
}

/// Pairwise correlation between two series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Correlation {
    pub pearson_r: f64,
    pub pearson_p: f64,
    pub spearman_r: f64,
    pub sample_count: usize,
}

fn paired_finite(x: &[f64], y: &[f64]) -> Result<(Vec<f64>, Vec<f64>)> {
    if x.len() != y.len() {
        return Err(VacError::LengthMismatch { left: x.len(), right: y.len() });
    }
    Ok(x.iter()
        .zip(y)
        .filter(|(a, b)| !a.is_nan() && !b.is_nan())
        .map(|(a, b)| (*a, *b))
        .unzip())
}

/// Average ranks (1-based), ties share the mean of their positions
fn ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut out = vec![0.0; values.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        let rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            out[idx] = rank;
        }
        i = j + 1;
    }
    out
}

/// Two-tailed p-value of a Pearson coefficient from Student's t
fn p_value_for_r(r: f64, n: usize) -> f64 {
    if n < 3 {
        return 1.0;
    }
    if r.abs() >= 1.0 {
        return 0.0;
    }

    let df = (n - 2) as f64;
    let t_stat = r * df.sqrt() / (1.0 - r * r).sqrt();

    match StudentsT::new(0.0, 1.0, df) {
        Ok(t_dist) => 2.0 * (1.0 - t_dist.cdf(t_stat.abs())),
        Err(_) => 1.0,
    }
}

/// Pearson and Spearman correlation of two series (NaN pairs dropped)
pub fn calculate_correlation(x: &[f64], y: &[f64]) -> Result<Correlation> {
    let (xs, ys) = paired_finite(x, y)?;
    if xs.len() < 2 {
        return Err(VacError::insufficient("Correlation", 2, xs.len()));
    }

    let pearson_r = pearson(&xs, &ys);
    Ok(Correlation {
        pearson_r,
        pearson_p: p_value_for_r(pearson_r, xs.len()),
        spearman_r: pearson(&ranks(&xs), &ranks(&ys)),
        sample_count: xs.len(),
    })
}

/// Pearson correlation between every pair of a set of columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    /// Row-major, `None` where a pair has fewer than two complete rows or no variance
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        self.values[i][j]
    }
}

fn pairwise_pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let (xs, ys) = paired_finite(x, y).ok()?;
    if xs.len() < 2 {
        return None;
    }
    let flat = |v: &[f64]| v.iter().all(|&a| a == v[0]);
    if flat(&xs) || flat(&ys) {
        return None;
    }
    Some(pearson(&xs, &ys))
}

/// Correlation matrix over named series, NaN rows dropped pair by pair
pub fn calculate_correlation_matrix(series: &[(String, Vec<f64>)]) -> CorrelationMatrix {
    let values = series
        .iter()
        .map(|(_, a)| series.iter().map(|(_, b)| pairwise_pearson(a, b)).collect())
        .collect();
    CorrelationMatrix {
        columns: series.iter().map(|(name, _)| name.clone()).collect(),
        values,
    }
}

/// Polynomial regression result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Regression {
    /// Ascending order, intercept first
    pub coefficients: Vec<f64>,
    pub r_squared: f64,
    pub predictions: Vec<f64>,
    pub residuals: Vec<f64>,
}

/// Least-squares polynomial regression of `y` on `x` (NaN pairs dropped)
pub fn perform_regression(x: &[f64], y: &[f64], degree: usize) -> Result<Regression> {
    if degree == 0 {
        return Err(VacError::invalid("degree", "must be at least 1"));
    }
    let (xs, ys) = paired_finite(x, y)?;
    let poly = polyfit(&xs, &ys, degree)?;

    let predictions: Vec<f64> = xs.iter().map(|&v| poly.eval(v)).collect();
    let residuals = ys.iter().zip(&predictions).map(|(o, p)| o - p).collect();

    Ok(Regression {
        coefficients: poly.coefficients(),
        r_squared: r_squared(&ys, &predictions),
        predictions,
        residuals,
    })
}
