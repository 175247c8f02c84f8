//! Pump-down curve characterization

use serde::{Deserialize, Serialize};

use crate::constants::vacuum::{
    DECAY_TAU_GUESS, DECAY_TAU_MIN, MILESTONES_MBAR, PUMP_RATE_MIN_WINDOW, PUMP_RATE_WINDOW_DIVISOR,
};
use crate::error::{Result, VacError};
use crate::signal::fit::{DecayFit, correlation_squared, fit_exponential_decay, linear_fit};
use crate::signal::gradient;

/// First time the curve reaches a pressure decade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    /// Target pressure (mbar)
    pub target_pressure: f64,
    /// Display label such as `"1e-3 mbar"`
    pub label: String,
    /// Time of the first sample at or below the target
    pub time: f64,
    /// Seconds since the first valid sample
    pub duration: f64,
    /// Index into the input arrays
    pub index: usize,
}

/// Local pumping rate from a log-linear fit over one window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PumpRate {
    pub start_time: f64,
    pub start_pressure: f64,
    pub end_pressure: f64,
    /// `-d ln(P)/dt` (1/s)
    pub pump_rate: f64,
    /// `pump_rate * mean(P)` over the window
    pub effective_speed: f64,
}

/// Result of [`analyze_pump_down_curve`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PumpDownAnalysis {
    pub initial_pressure: f64,
    pub final_pressure: f64,
    /// Fitted `P_ult`, or the final pressure when the fit fails
    pub ultimate_vacuum: f64,
    /// `initial / final`, `None` when the final pressure is not positive
    pub pressure_drop_ratio: Option<f64>,
    pub milestones: Vec<Milestone>,
    /// `-d(log10 P)` per sample
    pub pumping_speed_indicator: Vec<f64>,
    pub pump_rates: Vec<PumpRate>,
    /// Fitted `tau` (s)
    pub time_constant: Option<f64>,
    /// Squared correlation between the curve and the fitted model
    pub fit_quality: f64,
    pub total_pump_time: f64,
}

fn milestone_label(target: f64) -> String {
    format!("1e{} mbar", target.log10().round() as i32)
}

fn find_milestones(pressure: &[f64], time: &[f64], positions: &[usize]) -> Vec<Milestone> {
    let initial = pressure[0];
    let last = pressure[pressure.len() - 1];

    MILESTONES_MBAR
        .iter()
        .filter(|&&target| last <= target && target < initial)
        .filter_map(|&target| {
            let idx = pressure.iter().position(|&p| p <= target)?;
            Some(Milestone {
                target_pressure: target,
                label: milestone_label(target),
                time: time[idx],
                duration: time[idx] - time[0],
                index: positions[idx],
            })
        })
        .collect()
}

fn windowed_pump_rates(pressure: &[f64], time: &[f64]) -> Vec<PumpRate> {
    let n = pressure.len();
    let window = PUMP_RATE_MIN_WINDOW.max(n / PUMP_RATE_WINDOW_DIVISOR);
    let step = (window / 2).max(1);
    if n <= window {
        return Vec::new();
    }

    (0..n - window)
        .step_by(step)
        .filter_map(|start| {
            let p = &pressure[start..start + window];
            let t = &time[start..start + window];
            if p.iter().any(|&v| v <= 0.0) {
                return None;
            }
            let rel: Vec<f64> = t.iter().map(|v| v - t[0]).collect();
            let log_p: Vec<f64> = p.iter().map(|v| v.ln()).collect();
            let fit = linear_fit(&rel, &log_p).ok()?;
            let pump_rate = -fit.slope;
            let mean = p.iter().sum::<f64>() / p.len() as f64;
            Some(PumpRate {
                start_time: t[0],
                start_pressure: p[0],
                end_pressure: p[p.len() - 1],
                pump_rate,
                effective_speed: pump_rate * mean,
            })
        })
        .collect()
}

fn fit_decay(pressure: &[f64], time: &[f64]) -> Result<(DecayFit, f64)> {
    let initial = pressure[0];
    let last = pressure[pressure.len() - 1];
    if initial <= 0.0 {
        return Err(VacError::Fit("initial pressure must be positive".to_string()));
    }

    let rel: Vec<f64> = time.iter().map(|t| t - time[0]).collect();
    let fit = fit_exponential_decay(
        &rel,
        pressure,
        [initial, DECAY_TAU_GUESS, last],
        [0.0, DECAY_TAU_MIN, 0.0],
        [f64::INFINITY, f64::INFINITY, initial],
    )?;
    let modelled: Vec<f64> = rel.iter().map(|&t| fit.eval(t)).collect();
    Ok((fit, correlation_squared(pressure, &modelled)))
}

/// Characterize a pump-down curve
///
/// Requires at least two valid `(pressure, time)` pairs. A failed decay
/// fit is logged and reported as `ultimate_vacuum = final_pressure`,
/// `fit_quality = 0`, no time constant.
pub fn analyze_pump_down_curve(pressure: &[f64], time: &[f64]) -> Result<PumpDownAnalysis> {
    profiling::scope!("analyze_pump_down_curve");

    if pressure.len() != time.len() {
        return Err(VacError::LengthMismatch {
            left: pressure.len(),
            right: time.len(),
        });
    }
    let mut positions = Vec::with_capacity(pressure.len());
    let mut p = Vec::with_capacity(pressure.len());
    let mut t = Vec::with_capacity(time.len());
    for (i, (&pv, &tv)) in pressure.iter().zip(time).enumerate() {
        if !pv.is_nan() && !tv.is_nan() {
            positions.push(i);
            p.push(pv);
            t.push(tv);
        }
    }
    if p.len() < 2 {
        return Err(VacError::insufficient("Pump-down analysis", 2, p.len()));
    }

    let initial_pressure = p[0];
    let final_pressure = p[p.len() - 1];

    let log_p: Vec<f64> = p.iter().map(|v| v.log10()).collect();
    let pumping_speed_indicator = gradient(&log_p, None)?.into_iter().map(|d| -d).collect();

    let (ultimate_vacuum, time_constant, fit_quality) = match fit_decay(&p, &t) {
        Ok((fit, quality)) => (fit.ultimate, Some(fit.time_constant), quality),
        Err(err) => {
            tracing::warn!(error = %err, "pump-down decay fit failed, using final pressure");
            (final_pressure, None, 0.0)
        }
    };

    Ok(PumpDownAnalysis {
        initial_pressure,
        final_pressure,
        ultimate_vacuum,
        pressure_drop_ratio: (final_pressure > 0.0).then(|| initial_pressure / final_pressure),
        milestones: find_milestones(&p, &t, &positions),
        pumping_speed_indicator,
        pump_rates: windowed_pump_rates(&p, &t),
        time_constant,
        fit_quality,
        total_pump_time: t[t.len() - 1] - t[0],
    })
}
