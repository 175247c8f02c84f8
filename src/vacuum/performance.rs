//! Whole-trace vacuum system report and heuristic rating

use serde::{Deserialize, Serialize};

use crate::constants::rating::{
    BASE_PRESSURE, GRADE_POINTS, OVERALL, PUMP_EFFICIENCY, SPIKE_RATE, STABILITY,
};
use crate::constants::vacuum::{
    BASE_PRESSURE_PERCENTILE, DEFAULT_CYCLE_MIN_DROP, DEFAULT_CYCLE_MIN_DURATION,
    DEFAULT_SAMPLE_RATE_HZ, DEFAULT_SPIKE_MIN_DURATION, DEFAULT_SPIKE_SIGMA, DEFAULT_SYSTEM_VOLUME_L,
    PERFORMANCE_LEAK_MIN_RISING, PERFORMANCE_LEAK_MIN_SAMPLES, PERFORMANCE_MIN_SAMPLES,
};
use crate::data::stats::{median, percentile};
use crate::error::{Result, VacError};
use crate::signal::gradient;
use crate::vacuum::{
    LeakRateAnalysis, NoiseMetrics, PressureSpike, PumpDownCycle, base_pressure_percentile,
    calculate_leak_rate, calculate_noise_metrics, detect_pressure_spikes, detect_pump_down_cycles,
    paired_valid, tier_above,
};

/// Letter grade, best first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
}

impl Grade {
    const ALL: [Grade; 4] = [Grade::A, Grade::B, Grade::C, Grade::D];

    fn from_tier(tier: usize) -> Self {
        Self::ALL[tier.min(Self::ALL.len() - 1)]
    }

    /// Grade for a value where lower is better (strictly below each breakpoint)
    fn lower_is_better(value: f64, ladder: [f64; 3]) -> Self {
        Self::from_tier(ladder.iter().position(|&limit| value < limit).unwrap_or(3))
    }

    /// Grade for a value where higher is better (strictly above each breakpoint)
    fn higher_is_better(value: f64, ladder: [f64; 3]) -> Self {
        Self::from_tier(tier_above(value, ladder))
    }

    /// Overall grade from a 0-100 score
    pub fn from_score(score: f64) -> Self {
        Self::from_tier(OVERALL.iter().position(|&limit| score >= limit).unwrap_or(3))
    }

    /// Points this grade contributes to the overall score
    pub fn points(self) -> f64 {
        GRADE_POINTS[self as usize]
    }

    pub fn performance(self) -> &'static str {
        match self {
            Grade::A => "Excellent",
            Grade::B => "Good",
            Grade::C => "Adequate",
            Grade::D => "Poor",
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let letter = match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
        };
        f.write_str(letter)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BasicMetrics {
    pub min_pressure: f64,
    pub max_pressure: f64,
    pub mean_pressure: f64,
    /// Sample standard deviation over mean, `None` for a zero mean
    pub pressure_stability: Option<f64>,
    pub data_points: usize,
}

impl BasicMetrics {
    fn from_pressure(pressure: &[f64]) -> Self {
        let n = pressure.len();
        let mean = pressure.iter().sum::<f64>() / n as f64;
        let std = if n > 1 {
            (pressure.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / (n - 1) as f64).sqrt()
        } else {
            0.0
        };
        Self {
            min_pressure: pressure.iter().copied().fold(f64::INFINITY, f64::min),
            max_pressure: pressure.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            mean_pressure: mean,
            pressure_stability: (mean != 0.0).then(|| std / mean),
            data_points: n,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SystemVolume {
    pub volume_liters: f64,
    /// True when no volume was supplied and the default was assumed
    pub estimated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemRating {
    /// 0-100
    pub score: f64,
    pub grade: Grade,
    pub performance: String,
    pub factors: Vec<String>,
    pub base_pressure: Grade,
    /// `None` when no pump-down cycle was found
    pub pump_efficiency: Option<Grade>,
    pub spike_frequency: Grade,
    pub stability: Grade,
}

/// Score a system from its four sub-metrics
///
/// `spike_rate` is spikes per 1000 samples. A missing pump-down efficiency
/// or stability scores zero points for that sub-metric.
pub fn rate_system(
    base_pressure: f64,
    mean_cycle_drop: Option<f64>,
    spike_rate: f64,
    stability: Option<f64>,
) -> SystemRating {
    let base = Grade::lower_is_better(base_pressure, BASE_PRESSURE);
    let pump = mean_cycle_drop.map(|drop| Grade::higher_is_better(drop, PUMP_EFFICIENCY));
    let spikes = Grade::lower_is_better(spike_rate, SPIKE_RATE);
    let steady = stability.map_or(Grade::D, |s| Grade::lower_is_better(s, STABILITY));

    let mut factors = vec![format!("{} base pressure", base.performance())];
    match pump {
        Some(grade) => factors.push(format!("{} pump-down efficiency", grade.performance())),
        None => factors.push("No pump-down cycles detected".to_string()),
    }
    factors.push(
        match spikes {
            Grade::A => "Low spike frequency",
            Grade::B => "Moderate spike frequency",
            Grade::C => "High spike frequency",
            Grade::D => "Very high spike frequency",
        }
        .to_string(),
    );
    factors.push(format!("{} pressure stability", steady.performance()));

    let score = base.points() + pump.map_or(0.0, Grade::points) + spikes.points() + steady.points();
    let grade = Grade::from_score(score);

    SystemRating {
        score,
        grade,
        performance: grade.performance().to_string(),
        factors,
        base_pressure: base,
        pump_efficiency: pump,
        spike_frequency: spikes,
        stability: steady,
    }
}

/// Result of [`analyze_vacuum_system_performance`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceReport {
    pub basic_metrics: BasicMetrics,
    /// 10th percentile of the valid pressure samples
    pub base_pressure: f64,
    pub noise: Option<NoiseMetrics>,
    pub pump_cycles: Vec<PumpDownCycle>,
    pub pressure_spikes: Vec<PressureSpike>,
    /// Present when the trace has enough rising-pressure samples
    pub leak_analysis: Option<LeakRateAnalysis>,
    pub system_volume: SystemVolume,
    pub system_rating: SystemRating,
}

/// Sampling rate from the median positive time step
fn estimate_sample_rate(time: &[f64]) -> f64 {
    let steps: Vec<f64> = time.windows(2).map(|w| w[1] - w[0]).filter(|dt| *dt > 0.0).collect();
    let step = median(&steps);
    if step.is_finite() && step > 0.0 {
        1.0 / step
    } else {
        DEFAULT_SAMPLE_RATE_HZ
    }
}

/// Leak analysis over the samples whose pressure derivative is in the top quartile
fn rising_leak_analysis(pressure: &[f64], time: &[f64]) -> Result<Option<LeakRateAnalysis>> {
    if pressure.len() <= PERFORMANCE_LEAK_MIN_SAMPLES {
        return Ok(None);
    }

    let dp = gradient(pressure, None)?;
    let threshold = percentile(&dp, 75.0);
    let (leak_p, leak_t): (Vec<f64>, Vec<f64>) = dp
        .iter()
        .zip(pressure.iter().zip(time))
        .filter(|(d, _)| **d > threshold)
        .map(|(_, (p, t))| (*p, *t))
        .unzip();

    if leak_p.len() <= PERFORMANCE_LEAK_MIN_RISING {
        tracing::debug!(rising = leak_p.len(), "not enough rising samples for leak analysis");
        return Ok(None);
    }

    match calculate_leak_rate(&leak_p, &leak_t, leak_p[0], None) {
        Ok(analysis) => Ok(Some(analysis)),
        Err(err) => {
            tracing::warn!(error = %err, "leak analysis over rising samples failed");
            Ok(None)
        }
    }
}

/// Spike and cycle detection parameters used by the report
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionThresholds {
    pub spike_sigma: f64,
    pub spike_min_duration: usize,
    pub cycle_min_drop: f64,
    pub cycle_min_duration: usize,
}

impl Default for DetectionThresholds {
    fn default() -> Self {
        Self {
            spike_sigma: DEFAULT_SPIKE_SIGMA,
            spike_min_duration: DEFAULT_SPIKE_MIN_DURATION,
            cycle_min_drop: DEFAULT_CYCLE_MIN_DROP,
            cycle_min_duration: DEFAULT_CYCLE_MIN_DURATION,
        }
    }
}

/// Run every vacuum analysis over one trace and rate the system
///
/// Requires at least ten valid `(pressure, time)` pairs. `system_volume`
/// falls back to a 10 L estimate.
pub fn analyze_vacuum_system_performance(
    pressure: &[f64],
    time: &[f64],
    system_volume: Option<f64>,
    thresholds: &DetectionThresholds,
) -> Result<PerformanceReport> {
    profiling::scope!("analyze_vacuum_system_performance");

    let (pressure, time) = paired_valid(pressure, time)?;
    if pressure.len() < PERFORMANCE_MIN_SAMPLES {
        return Err(VacError::insufficient(
            "Vacuum performance analysis",
            PERFORMANCE_MIN_SAMPLES,
            pressure.len(),
        ));
    }
    if let Some(volume) = system_volume {
        if !volume.is_finite() || volume <= 0.0 {
            return Err(VacError::invalid("system_volume", "must be a positive volume"));
        }
    }

    let basic_metrics = BasicMetrics::from_pressure(&pressure);
    let base_pressure = base_pressure_percentile(&pressure, BASE_PRESSURE_PERCENTILE)?;

    let noise = match calculate_noise_metrics(&pressure, estimate_sample_rate(&time)) {
        Ok(metrics) => Some(metrics),
        Err(err) => {
            tracing::warn!(error = %err, "noise analysis skipped");
            None
        }
    };

    let pump_cycles = detect_pump_down_cycles(
        &pressure,
        &time,
        thresholds.cycle_min_drop,
        thresholds.cycle_min_duration,
    )?;
    let pressure_spikes =
        detect_pressure_spikes(&pressure, thresholds.spike_sigma, thresholds.spike_min_duration);
    let leak_analysis = rising_leak_analysis(&pressure, &time)?;

    let system_volume = match system_volume {
        Some(volume_liters) => SystemVolume {
            volume_liters,
            estimated: false,
        },
        None => SystemVolume {
            volume_liters: DEFAULT_SYSTEM_VOLUME_L,
            estimated: true,
        },
    };

    let mean_cycle_drop = (!pump_cycles.is_empty()).then(|| {
        pump_cycles.iter().map(|c| c.pressure_drop).sum::<f64>() / pump_cycles.len() as f64
    });
    let spike_rate = pressure_spikes.len() as f64 / pressure.len() as f64 * 1000.0;
    let system_rating = rate_system(
        base_pressure,
        mean_cycle_drop,
        spike_rate,
        basic_metrics.pressure_stability,
    );

    tracing::info!(
        points = pressure.len(),
        cycles = pump_cycles.len(),
        spikes = pressure_spikes.len(),
        score = system_rating.score,
        grade = %system_rating.grade,
        "vacuum performance analysis complete"
    );

    Ok(PerformanceReport {
        basic_metrics,
        base_pressure,
        noise,
        pump_cycles,
        pressure_spikes,
        leak_analysis,
        system_volume,
        system_rating,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stable_trace() -> (Vec<f64>, Vec<f64>) {
        let time: Vec<f64> = (0..200).map(|i| i as f64).collect();
        let pressure = time.iter().map(|t| 1e-9 * (1.0 + 0.01 * (t * 0.7).sin())).collect();
        (pressure, time)
    }

    #[test]
    fn test_rate_system_best_case() {
        let rating = rate_system(1e-9, Some(6.0), 0.0, Some(0.05));
        assert_eq!(rating.score, 100.0);
        assert_eq!(rating.grade, Grade::A);
        assert_eq!(rating.performance, "Excellent");
        assert_eq!(rating.factors.len(), 4);
    }

    #[test]
    fn test_rate_system_mixed() {
        let rating = rate_system(1e-7, Some(4.0), 2.0, Some(0.2));
        assert_eq!(rating.base_pressure, Grade::B);
        assert_eq!(rating.pump_efficiency, Some(Grade::B));
        assert_eq!(rating.spike_frequency, Grade::B);
        assert_eq!(rating.stability, Grade::B);
        assert_eq!(rating.score, 75.0);
        assert_eq!(rating.grade, Grade::B);
    }

    #[test]
    fn test_rate_system_worst_case() {
        let rating = rate_system(1e-3, None, 20.0, None);
        assert_eq!(rating.score, 0.0);
        assert_eq!(rating.grade, Grade::D);
        assert!(rating.pump_efficiency.is_none());
        assert!(rating.factors.iter().any(|f| f == "No pump-down cycles detected"));
    }

    #[test]
    fn test_breakpoints_are_strict() {
        assert_eq!(Grade::lower_is_better(1e-8, BASE_PRESSURE), Grade::B);
        assert_eq!(Grade::higher_is_better(5.0, PUMP_EFFICIENCY), Grade::B);
        assert_eq!(Grade::from_score(87.5), Grade::A);
        assert_eq!(Grade::from_score(37.4), Grade::D);
    }

    #[test]
    fn test_stable_trace_report() {
        let (pressure, time) = stable_trace();
        let report = analyze_vacuum_system_performance(&pressure, &time, None, &DetectionThresholds::default()).unwrap();

        assert_eq!(report.basic_metrics.data_points, 200);
        assert!(report.basic_metrics.pressure_stability.unwrap() < 0.1);
        assert!(report.base_pressure < 1e-9);
        assert!(report.pump_cycles.is_empty());
        assert!(report.pressure_spikes.is_empty());
        assert!(report.noise.is_some());
        assert!(report.leak_analysis.is_some());
        assert!(report.system_volume.estimated);
        assert_eq!(report.system_volume.volume_liters, 10.0);

        // base A, spikes A, stability A, no cycles
        assert_eq!(report.system_rating.score, 75.0);
        assert_eq!(report.system_rating.grade, Grade::B);
    }

    #[test]
    fn test_given_volume_and_short_input() {
        let (pressure, time) = stable_trace();
        let report = analyze_vacuum_system_performance(&pressure, &time, Some(25.0), &DetectionThresholds::default())
                .unwrap();
        assert!(!report.system_volume.estimated);
        assert_eq!(report.system_volume.volume_liters, 25.0);

        assert!(matches!(
            analyze_vacuum_system_performance(&pressure[..9], &time[..9], None, &DetectionThresholds::default()),
            Err(VacError::InsufficientData { required: 10, actual: 9, .. })
        ));
    }

    #[test]
    fn test_thresholds_reach_detectors() {
        // 1% ripple with one 3x burst
        let time: Vec<f64> = (0..300).map(|i| i as f64).collect();
        let mut pressure: Vec<f64> = time.iter().map(|t| 1e-6 * (1.0 + 0.01 * (t * 0.9).sin())).collect();
        pressure[150] = 3e-6;

        let strict = DetectionThresholds::default();
        let report = analyze_vacuum_system_performance(&pressure, &time, None, &strict).unwrap();
        assert_eq!(report.pressure_spikes.len(), 1);

        let two_samples = DetectionThresholds {
            spike_min_duration: 2,
            ..strict
        };
        let report = analyze_vacuum_system_performance(&pressure, &time, None, &two_samples).unwrap();
        assert!(report.pressure_spikes.is_empty());
    }

    #[test]
    fn test_sample_rate_estimate() {
        assert_eq!(estimate_sample_rate(&[0.0, 0.5, 1.0, 1.5]), 2.0);
        assert_eq!(estimate_sample_rate(&[3.0, 3.0]), DEFAULT_SAMPLE_RATE_HZ);
    }
}
