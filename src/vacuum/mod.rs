//! Vacuum pressure-curve analysis
//!
//! Every function here is stateless and works on plain `f64` slices:
//! pressure in mbar, time in seconds. Input problems are reported as
//! [`VacError`](crate::error::VacError) values.

pub mod base_pressure;
pub mod cycles;
pub mod leak;
pub mod noise;
pub mod outgassing;
pub mod performance;
pub mod pump_down;
pub mod spikes;

pub use base_pressure::{BasePressure, base_pressure_percentile, calculate_base_pressure};
pub use cycles::{CycleEfficiency, PumpDownCycle, detect_pump_down_cycles};
pub use leak::{LeakMethod, LeakRateAnalysis, LeakSeverity, calculate_leak_rate};
pub use noise::{NoiseMetrics, calculate_noise_metrics};
pub use outgassing::{OutgassingAnalysis, OutgassingLevel, calculate_outgassing_rate};
pub use performance::{
    DetectionThresholds, Grade, PerformanceReport, SystemRating, analyze_vacuum_system_performance,
};
pub use pump_down::{Milestone, PumpDownAnalysis, PumpRate, analyze_pump_down_curve};
pub use spikes::{PressureSpike, SpikeSeverity, detect_pressure_spikes};

use crate::error::{Result, VacError};

/// Drop every `(pressure, time)` pair where either side is NaN
///
/// Mismatched lengths are an error.
pub(crate) fn paired_valid(pressure: &[f64], time: &[f64]) -> Result<(Vec<f64>, Vec<f64>)> {
    if pressure.len() != time.len() {
        return Err(VacError::LengthMismatch {
            left: pressure.len(),
            right: time.len(),
        });
    }
    Ok(pressure
        .iter()
        .zip(time)
        .filter(|(p, t)| !p.is_nan() && !t.is_nan())
        .map(|(p, t)| (*p, *t))
        .unzip())
}

/// Classify `value` against descending breakpoints `[a, b, c]` (strictly above)
pub(crate) fn tier_above(value: f64, breakpoints: [f64; 3]) -> usize {
    breakpoints
        .iter()
        .position(|&limit| value > limit)
        .unwrap_or(breakpoints.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paired_valid() {
        let (p, t) = paired_valid(&[1.0, f64::NAN, 3.0, 4.0], &[0.0, 1.0, f64::NAN, 3.0]).unwrap();
        assert_eq!(p, vec![1.0, 4.0]);
        assert_eq!(t, vec![0.0, 3.0]);

        assert!(matches!(
            paired_valid(&[1.0], &[1.0, 2.0]),
            Err(VacError::LengthMismatch { left: 1, right: 2 })
        ));
    }

    #[test]
    fn test_tier_above() {
        let ladder = [100.0, 10.0, 3.0];
        assert_eq!(tier_above(150.0, ladder), 0);
        assert_eq!(tier_above(100.0, ladder), 1);
        assert_eq!(tier_above(5.0, ladder), 2);
        assert_eq!(tier_above(1.0, ladder), 3);
    }
}
