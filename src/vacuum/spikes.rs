//! Pressure spike detection against an adaptive rolling threshold

use serde::{Deserialize, Serialize};

use crate::constants::vacuum::{
    SPIKE_MIN_SAMPLES, SPIKE_RATIO_CRITICAL, SPIKE_RATIO_HIGH, SPIKE_RATIO_MEDIUM, SPIKE_WINDOW_MAX,
    SPIKE_WINDOW_MIN,
};
use crate::signal::{fill_edges, rolling_mean, rolling_std};
use crate::vacuum::tier_above;

/// Spike severity from the ratio of peak to baseline pressure
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpikeSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl SpikeSeverity {
    /// Classify a spike; a non-positive baseline is always critical
    pub fn classify(max_pressure: f64, baseline: f64) -> Self {
        if baseline <= 0.0 {
            return SpikeSeverity::Critical;
        }
        match tier_above(
            max_pressure / baseline,
            [SPIKE_RATIO_CRITICAL, SPIKE_RATIO_HIGH, SPIKE_RATIO_MEDIUM],
        ) {
            0 => SpikeSeverity::Critical,
            1 => SpikeSeverity::High,
            2 => SpikeSeverity::Medium,
            _ => SpikeSeverity::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SpikeSeverity::Low => "low",
            SpikeSeverity::Medium => "medium",
            SpikeSeverity::High => "high",
            SpikeSeverity::Critical => "critical",
        }
    }
}

/// One detected spike; indices refer to the input array, `end_index` exclusive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PressureSpike {
    pub start_index: usize,
    pub end_index: usize,
    /// Number of flagged samples
    pub duration: usize,
    pub max_pressure: f64,
    pub mean_pressure: f64,
    /// Rolling mean where the spike starts
    pub baseline_pressure: f64,
    /// `max_pressure / baseline_pressure`, `None` for a non-positive baseline
    pub pressure_ratio: Option<f64>,
    pub spike_magnitude: f64,
    pub severity: SpikeSeverity,
}

/// Adaptive window: a tenth of the data, clamped to `[10, 100]`
fn spike_window(len: usize) -> usize {
    (len / 10).clamp(SPIKE_WINDOW_MIN, SPIKE_WINDOW_MAX)
}

/// Detect spikes above `rolling_mean + threshold_factor * rolling_std`
///
/// NaN samples are skipped. Runs of at least `min_duration` flagged
/// samples become spikes, including a run that reaches the end of the
/// data. Fewer than ten valid samples or a constant series yield no spikes.
pub fn detect_pressure_spikes(
    pressure: &[f64],
    threshold_factor: f64,
    min_duration: usize,
) -> Vec<PressureSpike> {
    profiling::scope!("detect_pressure_spikes");

    let (positions, values): (Vec<usize>, Vec<f64>) = pressure
        .iter()
        .enumerate()
        .filter(|(_, p)| !p.is_nan())
        .map(|(i, p)| (i, *p))
        .unzip();

    if values.len() < SPIKE_MIN_SAMPLES {
        return Vec::new();
    }
    if values.iter().all(|&v| v == values[0]) {
        return Vec::new();
    }

    let window = spike_window(values.len());
    let mut means = rolling_mean(&values, window);
    let mut stds = rolling_std(&values, window);
    fill_edges(&mut means);
    fill_edges(&mut stds);

    let flagged: Vec<bool> = values
        .iter()
        .zip(means.iter().zip(&stds))
        .map(|(&p, (&m, &s))| p > m + threshold_factor * s)
        .collect();

    let min_duration = min_duration.max(1);
    let mut spikes = Vec::new();
    let mut start: Option<usize> = None;

    for i in 0..=flagged.len() {
        let is_spike = flagged.get(i).copied().unwrap_or(false);
        match (is_spike, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                if i - s >= min_duration {
                    spikes.push(build_spike(&values, &positions, &means, s, i));
                }
                start = None;
            }
            _ => {}
        }
    }

    tracing::debug!(
        count = spikes.len(),
        window,
        threshold_factor,
        "spike detection complete"
    );
    spikes
}

fn build_spike(values: &[f64], positions: &[usize], means: &[f64], start: usize, end: usize) -> PressureSpike {
    let region = &values[start..end];
    let max_pressure = region.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean_pressure = region.iter().sum::<f64>() / region.len() as f64;
    let baseline = means[start];

    PressureSpike {
        start_index: positions[start],
        end_index: positions[end - 1] + 1,
        duration: end - start,
        max_pressure,
        mean_pressure,
        baseline_pressure: baseline,
        pressure_ratio: (baseline > 0.0).then(|| max_pressure / baseline),
        spike_magnitude: max_pressure - baseline,
        severity: SpikeSeverity::classify(max_pressure, baseline),
    }
}
