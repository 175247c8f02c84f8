//! Data quality analysis
//!
//! Scores a series on completeness, consistency and validity and lists the
//! issues that drove the score down.

use serde::{Deserialize, Serialize};

use crate::constants::quality::{DUPLICATE_THRESHOLD, GAP_FACTOR, OUTLIER_THRESHOLD, ZERO_THRESHOLD};
use crate::data::stats::{OutlierMethod, detect_outliers, finite_values, median};

/// Thresholds used by [`analyze_quality`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    pub zero_threshold: f64,
    pub outlier_method: OutlierMethod,
    pub outlier_threshold: f64,
    pub duplicate_threshold: f64,
    pub gap_factor: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            zero_threshold: ZERO_THRESHOLD,
            outlier_method: OutlierMethod::Iqr,
            outlier_threshold: OUTLIER_THRESHOLD,
            duplicate_threshold: DUPLICATE_THRESHOLD,
            gap_factor: GAP_FACTOR,
        }
    }
}

/// Data quality analysis report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub total_points: usize,
    pub valid_points: usize,
    pub missing_points: usize,

    /// Indices of zero or near-zero values
    pub zeros: Vec<usize>,
    /// Indices of outliers
    pub outliers: Vec<usize>,
    /// Start index of each run of repeated consecutive values
    pub duplicates: Vec<usize>,
    /// Timestamp gaps as `(before, after)` index pairs
    pub gaps: Vec<(usize, usize)>,

    /// Share of non-missing values
    pub completeness: f64,
    /// `1 / (1 + cv)`
    pub consistency: f64,
    /// Share of points without a detected problem
    pub validity: f64,

    pub recommendations: Vec<String>,
}

impl QualityReport {
    /// Overall quality score (0-100)
    pub fn score(&self) -> f64 {
        (self.completeness + self.consistency + self.validity) / 3.0 * 100.0
    }

    /// Letter grade for the score
    pub fn grade(&self) -> &'static str {
        let score = self.score();
        if score >= 95.0 {
            "A+"
        } else if score >= 90.0 {
            "A"
        } else if score >= 85.0 {
            "B+"
        } else if score >= 80.0 {
            "B"
        } else if score >= 75.0 {
            "C+"
        } else if score >= 70.0 {
            "C"
        } else if score >= 60.0 {
            "D"
        } else {
            "F"
        }
    }
}

fn find_duplicate_runs(data: &[f64], threshold: f64) -> Vec<usize> {
    let mut runs = Vec::new();
    let mut previous: Option<usize> = None;
    for i in 1..data.len() {
        let (a, b) = (data[i - 1], data[i]);
        if a.is_nan() || b.is_nan() || (b - a).abs() >= threshold {
            continue;
        }
        if previous != Some(i - 1) {
            runs.push(i);
        }
        previous = Some(i);
    }
    runs
}

fn find_gaps(timestamps: &[f64], factor: f64) -> Vec<(usize, usize)> {
    if timestamps.len() < 2 {
        return Vec::new();
    }
    let diffs: Vec<f64> = timestamps.windows(2).map(|w| w[1] - w[0]).collect();
    let typical = median(&diffs);
    if typical.is_nan() {
        return Vec::new();
    }

    diffs
        .iter()
        .enumerate()
        .filter(|(_, d)| **d > factor * typical)
        .map(|(i, _)| (i, i + 1))
        .collect()
}

fn recommendations(report: &QualityReport) -> Vec<String> {
    let total = report.total_points as f64;
    let mut notes = Vec::new();

    if report.missing_points as f64 > total * 0.1 {
        notes.push(format!(
            "High amount of missing data ({}/{}). Consider interpolation or filtering.",
            report.missing_points, report.total_points
        ));
    }
    if report.zeros.len() as f64 > total * 0.05 {
        notes.push(format!(
            "Many zero values detected ({}). Check sensor calibration or data collection.",
            report.zeros.len()
        ));
    }
    if report.outliers.len() as f64 > total * 0.02 {
        notes.push(format!(
            "Multiple outliers found ({}). Consider outlier removal or investigation.",
            report.outliers.len()
        ));
    }
    if report.duplicates.len() as f64 > total * 0.1 {
        notes.push(format!(
            "Many duplicate values ({}). Check if sensor is stuck or data is repeated.",
            report.duplicates.len()
        ));
    }
    if !report.gaps.is_empty() {
        notes.push(format!(
            "Time series gaps detected ({}). Consider interpolation for continuity.",
            report.gaps.len()
        ));
    }
    if report.score() < 70.0 {
        notes.push("Overall data quality is poor. Manual review recommended.".to_string());
    }
    notes
}

/// Analyze a series and optional matching timestamps
pub fn analyze_quality(data: &[f64], timestamps: Option<&[f64]>, config: &QualityConfig) -> QualityReport {
    profiling::scope!("analyze_quality");

    let valid = finite_values(data);
    let total_points = data.len();

    let mut report = QualityReport {
        total_points,
        valid_points: valid.len(),
        missing_points: total_points - valid.len(),
        ..Default::default()
    };

    report.zeros = data
        .iter()
        .enumerate()
        .filter(|(_, v)| v.abs() < config.zero_threshold)
        .map(|(i, _)| i)
        .collect();
    report.outliers = detect_outliers(data, config.outlier_method, config.outlier_threshold).indices;
    report.duplicates = find_duplicate_runs(data, config.duplicate_threshold);
    if let Some(ts) = timestamps {
        report.gaps = find_gaps(ts, config.gap_factor);
    }

    if total_points > 0 {
        report.completeness = valid.len() as f64 / total_points as f64;
        let problems = report.zeros.len() + report.outliers.len() + report.duplicates.len();
        report.validity = 1.0 - problems as f64 / total_points as f64;
    }
    if !valid.is_empty() {
        let mean = valid.iter().sum::<f64>() / valid.len() as f64;
        let std = (valid.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / valid.len() as f64).sqrt();
        let cv = if mean != 0.0 { std / mean } else { 1.0 };
        report.consistency = 1.0 / (1.0 + cv);
    }

    report.recommendations = recommendations(&report);

    tracing::debug!(
        total = report.total_points,
        missing = report.missing_points,
        score = report.score(),
        "quality analysis complete"
    );
    report
}
