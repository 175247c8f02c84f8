//! Detection of repeated pump-down cycles in a long trace

use serde::{Deserialize, Serialize};

use crate::constants::vacuum::{
    CYCLE_DERIVATIVE_THRESHOLD, CYCLE_EFFICIENCY_HIGH, CYCLE_EFFICIENCY_MODERATE, CYCLE_LOG_OFFSET,
};
use crate::error::{Result, VacError};
use crate::signal::gradient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleEfficiency {
    Low,
    Moderate,
    High,
}

impl CycleEfficiency {
    /// Classify by pressure drop in decades
    pub fn classify(pressure_drop: f64) -> Self {
        if pressure_drop > CYCLE_EFFICIENCY_HIGH {
            CycleEfficiency::High
        } else if pressure_drop > CYCLE_EFFICIENCY_MODERATE {
            CycleEfficiency::Moderate
        } else {
            CycleEfficiency::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PumpDownCycle {
    /// Index into the input arrays
    pub start_index: usize,
    /// Exclusive end index into the input arrays
    pub end_index: usize,
    pub start_time: f64,
    pub end_time: f64,
    /// Seconds from the first to the last sample of the cycle
    pub duration: f64,
    pub initial_pressure: f64,
    pub final_pressure: f64,
    /// `log10(initial / final)`
    pub pressure_drop: f64,
    /// Decades per second
    pub avg_pump_speed: f64,
    pub efficiency: CycleEfficiency,
}

/// Find regions where `log10(P)` falls steadily
///
/// A cycle is a run of at least `min_duration` samples whose per-sample
/// log-pressure derivative is below `-0.001`, dropping by at least
/// `min_pressure_drop` decades. A run still open at the end of the data
/// is evaluated too.
pub fn detect_pump_down_cycles(
    pressure: &[f64],
    time: &[f64],
    min_pressure_drop: f64,
    min_duration: usize,
) -> Result<Vec<PumpDownCycle>> {
    profiling::scope!("detect_pump_down_cycles");

    if pressure.len() != time.len() {
        return Err(VacError::LengthMismatch {
            left: pressure.len(),
            right: time.len(),
        });
    }
    let (positions, (p, t)): (Vec<usize>, (Vec<f64>, Vec<f64>)) = pressure
        .iter()
        .zip(time)
        .enumerate()
        .filter(|(_, (pv, tv))| !pv.is_nan() && !tv.is_nan())
        .map(|(i, (pv, tv))| (i, (*pv, *tv)))
        .unzip();

    if p.len() < min_duration.max(2) {
        return Ok(Vec::new());
    }

    let log_p: Vec<f64> = p.iter().map(|v| (v + CYCLE_LOG_OFFSET).log10()).collect();
    let pumping: Vec<bool> = gradient(&log_p, None)?
        .into_iter()
        .map(|d| d < CYCLE_DERIVATIVE_THRESHOLD)
        .collect();

    let mut cycles = Vec::new();
    let mut start: Option<usize> = None;
    for i in 0..=pumping.len() {
        let active = pumping.get(i).copied().unwrap_or(false);
        match (active, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                if i - s >= min_duration {
                    if let Some(cycle) = evaluate_cycle(&p, &t, &positions, s, i, min_pressure_drop) {
                        cycles.push(cycle);
                    }
                }
                start = None;
            }
            _ => {}
        }
    }

    tracing::debug!(count = cycles.len(), "pump-down cycle detection complete");
    Ok(cycles)
}

fn evaluate_cycle(
    p: &[f64],
    t: &[f64],
    positions: &[usize],
    start: usize,
    end: usize,
    min_pressure_drop: f64,
) -> Option<PumpDownCycle> {
    let initial_pressure = p[start];
    let final_pressure = p[end - 1];
    if initial_pressure <= 0.0 || final_pressure <= 0.0 {
        return None;
    }

    let pressure_drop = (initial_pressure / final_pressure).log10();
    if pressure_drop < min_pressure_drop {
        return None;
    }

    let duration = t[end - 1] - t[start];
    Some(PumpDownCycle {
        start_index: positions[start],
        end_index: positions[end - 1] + 1,
        start_time: t[start],
        end_time: t[end - 1],
        duration,
        initial_pressure,
        final_pressure,
        pressure_drop,
        avg_pump_speed: if duration > 0.0 { pressure_drop / duration } else { 0.0 },
        efficiency: CycleEfficiency::classify(pressure_drop),
    })
}
