//! Outgassing rate `Q = V * dP/dt`

use serde::{Deserialize, Serialize};

use crate::constants::vacuum::{OUTGASSING_AREA_M2, OUTGASSING_HIGH, OUTGASSING_LOW, OUTGASSING_MODERATE};
use crate::error::{Result, VacError};
use crate::signal::calculate_derivative;
use crate::vacuum::{paired_valid, tier_above};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutgassingLevel {
    VeryLow,
    Low,
    Moderate,
    High,
}

impl OutgassingLevel {
    pub fn classify(average_rate: f64) -> Self {
        match tier_above(average_rate, [OUTGASSING_HIGH, OUTGASSING_MODERATE, OUTGASSING_LOW]) {
            0 => OutgassingLevel::High,
            1 => OutgassingLevel::Moderate,
            2 => OutgassingLevel::Low,
            _ => OutgassingLevel::VeryLow,
        }
    }
}

/// Result of [`calculate_outgassing_rate`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgassingAnalysis {
    /// Per-sample `Q` (mbar·L/s)
    pub outgassing_rate: Vec<f64>,
    pub average_rate: f64,
    /// Average rate per square metre of surface (1 m² assumed)
    pub specific_outgassing: f64,
    pub level: OutgassingLevel,
    pub volume_liters: f64,
}

/// Outgassing from a pressure-rise trace in a chamber of `volume_liters`
///
/// Time must be strictly increasing once NaN pairs are removed.
pub fn calculate_outgassing_rate(pressure: &[f64], time: &[f64], volume_liters: f64) -> Result<OutgassingAnalysis> {
    profiling::scope!("calculate_outgassing_rate");

    if !volume_liters.is_finite() || volume_liters <= 0.0 {
        return Err(VacError::invalid("volume_liters", "must be a positive volume"));
    }

    let (pressure, time) = paired_valid(pressure, time)?;
    if pressure.len() < 2 {
        return Err(VacError::insufficient("Outgassing rate", 2, pressure.len()));
    }
    if let Some(i) = time.windows(2).position(|w| w[1] <= w[0]) {
        return Err(VacError::Validation(format!(
            "time must be strictly increasing (sample {} to {})",
            i,
            i + 1
        )));
    }

    let t0 = time[0];
    let rel: Vec<f64> = time.iter().map(|t| t - t0).collect();
    let outgassing_rate: Vec<f64> = calculate_derivative(&rel, &pressure)?
        .into_iter()
        .map(|dp_dt| volume_liters * dp_dt)
        .collect();

    let average_rate = outgassing_rate.iter().sum::<f64>() / outgassing_rate.len() as f64;

    Ok(OutgassingAnalysis {
        average_rate,
        specific_outgassing: average_rate / OUTGASSING_AREA_M2,
        level: OutgassingLevel::classify(average_rate),
        volume_liters,
        outgassing_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_ramp_matches_average_slope() {
        let time: Vec<f64> = vec![0.0, 1.0, 3.0, 4.5, 10.0, 12.0];
        let pressure: Vec<f64> = time.iter().map(|t| 1e-6 + 3e-9 * t).collect();
        let volume = 25.0;

        let result = calculate_outgassing_rate(&pressure, &time, volume).unwrap();
        let n = pressure.len();
        let expected = volume * (pressure[n - 1] - pressure[0]) / (time[n - 1] - time[0]);

        assert!((result.average_rate - expected).abs() / expected < 1e-9);
        assert_eq!(result.level, OutgassingLevel::Moderate);
        assert_eq!(result.outgassing_rate.len(), n);
        assert_eq!(result.specific_outgassing, result.average_rate);
    }

    #[test]
    fn test_non_increasing_time_rejected() {
        let err = calculate_outgassing_rate(&[1.0, 2.0, 3.0], &[0.0, 1.0, 1.0], 10.0).unwrap_err();
        assert!(matches!(err, VacError::Validation(_)));
    }

    #[test]
    fn test_invalid_volume() {
        assert!(calculate_outgassing_rate(&[1.0, 2.0], &[0.0, 1.0], 0.0).is_err());
    }

    #[test]
    fn test_level_ladder() {
        assert_eq!(OutgassingLevel::classify(1e-5), OutgassingLevel::High);
        assert_eq!(OutgassingLevel::classify(1e-9), OutgassingLevel::Low);
        assert_eq!(OutgassingLevel::classify(-1e-9), OutgassingLevel::VeryLow);
    }
}
