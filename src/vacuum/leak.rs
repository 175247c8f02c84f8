//! Leak-rate estimation from a pressure-rise trace
//!
//! Three independent estimators run over the same samples. A failing
//! estimator is logged and reported with zeroed values so the others
//! still come through.

use serde::{Deserialize, Serialize};

use crate::constants::vacuum::{
    CONDUCTANCE_SCALE, CONDUCTANCE_VOLUMES_L, EXPONENTIAL_PREFERENCE_R2, LEAK_MINOR, LEAK_SEVERE,
    LEAK_SIGNIFICANT,
};
use crate::error::{Result, VacError};
use crate::signal::fit::{correlation_squared, linear_fit};
use crate::vacuum::{paired_valid, tier_above};

/// Estimator used for the headline leak rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeakMethod {
    Linear,
    Exponential,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeakSeverity {
    Negligible,
    Minor,
    Significant,
    Severe,
}

impl LeakSeverity {
    pub fn classify(leak_rate: f64) -> Self {
        match tier_above(leak_rate, [LEAK_SEVERE, LEAK_SIGNIFICANT, LEAK_MINOR]) {
            0 => LeakSeverity::Severe,
            1 => LeakSeverity::Significant,
            2 => LeakSeverity::Minor,
            _ => LeakSeverity::Negligible,
        }
    }
}

/// Straight-line fit of pressure against time
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearLeak {
    /// Slope (mbar/s)
    pub leak_rate: f64,
    pub fit_quality: f64,
}

/// Straight-line fit of `ln(pressure)` against time
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ExponentialLeak {
    /// `|slope * mean(pressure)|` (mbar/s)
    pub leak_rate: f64,
    pub fit_quality: f64,
    /// `-1 / slope` (s), `None` for a zero slope
    pub time_constant: Option<f64>,
}

/// `Q = V * dP/dt * 1e-3` for an assumed chamber volume
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConductanceLeak {
    pub volume_liters: f64,
    /// mbar·L/s
    pub leak_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeakSummary {
    pub primary_method: LeakMethod,
    pub leak_rate: f64,
    pub severity: LeakSeverity,
    pub start_pressure: f64,
    pub end_pressure: f64,
    pub total_rise: f64,
    /// Seconds from the first to the last valid sample
    pub analysis_duration: f64,
}

/// Result of [`calculate_leak_rate`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeakRateAnalysis {
    pub linear: LinearLeak,
    pub exponential: ExponentialLeak,
    pub conductance: Vec<ConductanceLeak>,
    pub summary: LeakSummary,
}

fn linear_estimate(time: &[f64], pressure: &[f64]) -> LinearLeak {
    match linear_fit(time, pressure) {
        Ok(fit) => {
            let fitted: Vec<f64> = time.iter().map(|&t| fit.predict(t)).collect();
            LinearLeak {
                leak_rate: fit.slope,
                fit_quality: correlation_squared(pressure, &fitted),
            }
        }
        Err(err) => {
            tracing::warn!(error = %err, "linear leak fit failed");
            LinearLeak::default()
        }
    }
}

fn exponential_estimate(time: &[f64], pressure: &[f64]) -> ExponentialLeak {
    let (t_pos, log_p): (Vec<f64>, Vec<f64>) = time
        .iter()
        .zip(pressure)
        .filter(|(_, p)| **p > 0.0)
        .map(|(t, p)| (*t, p.ln()))
        .unzip();

    if t_pos.len() <= 2 {
        tracing::debug!(positive = t_pos.len(), "too few positive samples for exponential leak fit");
        return ExponentialLeak::default();
    }

    match linear_fit(&t_pos, &log_p) {
        Ok(fit) => {
            let mean_pressure = pressure.iter().sum::<f64>() / pressure.len() as f64;
            let fitted: Vec<f64> = t_pos.iter().map(|&t| fit.predict(t)).collect();
            ExponentialLeak {
                leak_rate: (fit.slope * mean_pressure).abs(),
                fit_quality: correlation_squared(&log_p, &fitted),
                time_constant: (fit.slope != 0.0).then(|| -1.0 / fit.slope),
            }
        }
        Err(err) => {
            tracing::warn!(error = %err, "exponential leak fit failed");
            ExponentialLeak::default()
        }
    }
}

fn conductance_estimate(time: &[f64], pressure: &[f64]) -> Vec<ConductanceLeak> {
    let n = pressure.len();
    let dt = time[n - 1] - time[0];
    let dp = pressure[n - 1] - pressure[0];
    let dp_dt = if dt != 0.0 { dp / dt } else { 0.0 };

    CONDUCTANCE_VOLUMES_L
        .iter()
        .map(|&volume_liters| ConductanceLeak {
            volume_liters,
            leak_rate: volume_liters * dp_dt * CONDUCTANCE_SCALE,
        })
        .collect()
}

/// Estimate the leak rate of a pressure-rise trace
///
/// NaN pairs are dropped and time is rebased to start at zero. `end_pressure`
/// defaults to the last valid sample.
pub fn calculate_leak_rate(
    pressure: &[f64],
    time: &[f64],
    start_pressure: f64,
    end_pressure: Option<f64>,
) -> Result<LeakRateAnalysis> {
    profiling::scope!("calculate_leak_rate");

    let (pressure, time) = paired_valid(pressure, time)?;
    if pressure.len() < 2 {
        return Err(VacError::insufficient("Leak rate", 2, pressure.len()));
    }

    let t0 = time[0];
    let time: Vec<f64> = time.iter().map(|t| t - t0).collect();

    let linear = linear_estimate(&time, &pressure);
    let exponential = exponential_estimate(&time, &pressure);
    let conductance = conductance_estimate(&time, &pressure);

    let (primary_method, leak_rate) = if exponential.fit_quality > EXPONENTIAL_PREFERENCE_R2 {
        (LeakMethod::Exponential, exponential.leak_rate)
    } else {
        (LeakMethod::Linear, linear.leak_rate)
    };

    let end_pressure = end_pressure.unwrap_or(pressure[pressure.len() - 1]);
    let summary = LeakSummary {
        primary_method,
        leak_rate,
        severity: LeakSeverity::classify(leak_rate),
        start_pressure,
        end_pressure,
        total_rise: end_pressure - start_pressure,
        analysis_duration: time[time.len() - 1],
    };

    tracing::debug!(
        method = ?summary.primary_method,
        leak_rate = summary.leak_rate,
        severity = ?summary.severity,
        "leak rate estimated"
    );

    Ok(LeakRateAnalysis {
        linear,
        exponential,
        conductance,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_rise() {
        let time: Vec<f64> = (0..101).map(|i| 1000.0 + i as f64).collect();
        let pressure: Vec<f64> = (0..101).map(|i| 1e-6 + 1e-9 * i as f64).collect();

        let result = calculate_leak_rate(&pressure, &time, pressure[0], None).unwrap();

        assert!((result.linear.leak_rate - 1e-9).abs() < 1e-15);
        assert!((result.linear.fit_quality - 1.0).abs() < 1e-9);
        assert_eq!(result.summary.primary_method, LeakMethod::Exponential);
        assert!((result.summary.leak_rate - 1e-9).abs() / 1e-9 < 0.01);
        assert_eq!(result.summary.severity, LeakSeverity::Minor);
        assert_eq!(result.summary.analysis_duration, 100.0);
        assert!((result.summary.total_rise - 1e-7).abs() < 1e-18);

        assert_eq!(result.conductance.len(), 4);
        assert_eq!(result.conductance[1].volume_liters, 10.0);
        assert!((result.conductance[1].leak_rate - 1e-11).abs() < 1e-17);
    }

    #[test]
    fn test_exponential_time_constant() {
        let time: Vec<f64> = (0..50).map(|i| i as f64).collect();
        let pressure: Vec<f64> = time.iter().map(|t| 1e-3 * (-t / 50.0).exp()).collect();

        let result = calculate_leak_rate(&pressure, &time, 1e-3, Some(5e-4)).unwrap();
        let tau = result.exponential.time_constant.unwrap();

        assert!((tau - 50.0).abs() < 1e-6);
        assert_eq!(result.summary.end_pressure, 5e-4);
    }

    #[test]
    fn test_non_positive_pressure_degrades_exponential() {
        let time = vec![0.0, 1.0, 2.0, 3.0];
        let pressure = vec![0.0, -1.0, 1e-6, 2e-6];

        let result = calculate_leak_rate(&pressure, &time, 0.0, None).unwrap();
        assert_eq!(result.exponential, ExponentialLeak::default());
        assert_eq!(result.summary.primary_method, LeakMethod::Linear);
    }

    #[test]
    fn test_too_few_points() {
        let err = calculate_leak_rate(&[1.0, f64::NAN], &[0.0, 1.0], 1.0, None).unwrap_err();
        assert!(matches!(err, VacError::InsufficientData { actual: 1, .. }));
    }

    #[test]
    fn test_severity_ladder() {
        assert_eq!(LeakSeverity::classify(1e-5), LeakSeverity::Severe);
        assert_eq!(LeakSeverity::classify(1e-7), LeakSeverity::Significant);
        assert_eq!(LeakSeverity::classify(1e-9), LeakSeverity::Minor);
        assert_eq!(LeakSeverity::classify(1e-12), LeakSeverity::Negligible);
    }
}
