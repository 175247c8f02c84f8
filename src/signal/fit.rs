//! Least-squares fitting helpers
//!
//! Polynomial fits solve the normal equations on a centered, scaled
//! abscissa so that time columns in seconds (or epoch seconds) stay well
//! conditioned. The bounded Levenberg-Marquardt solver backs the
//! exponential pump-down model.

use crate::constants::numeric::{LM_MAX_ITERATIONS, SINGULARITY_TOLERANCE};
use crate::error::{Result, VacError};

/// Fitted polynomial, stored in scaled coordinates `u = (x - shift) / scale`
#[derive(Debug, Clone, PartialEq)]
pub struct Polynomial {
    scaled: Vec<f64>,
    shift: f64,
    scale: f64,
}

impl Polynomial {
    /// Evaluate the polynomial at `x`
    pub fn eval(&self, x: f64) -> f64 {
        let u = (x - self.shift) / self.scale;
        self.scaled.iter().rev().fold(0.0, |acc, &c| acc * u + c)
    }

    /// Polynomial degree
    pub fn degree(&self) -> usize {
        self.scaled.len().saturating_sub(1)
    }

    /// Coefficients in the raw abscissa, ascending order (intercept first)
    pub fn coefficients(&self) -> Vec<f64> {
        let size = self.scaled.len();
        let mut raw = vec![0.0; size];
        for (k, &a) in self.scaled.iter().enumerate() {
            let factor = a / self.scale.powi(k as i32);
            // (x - m)^k = sum_j C(k, j) x^j (-m)^(k-j)
            let mut binom = 1.0;
            for j in 0..=k {
                raw[j] += factor * binom * (-self.shift).powi((k - j) as i32);
                binom = binom * (k - j) as f64 / (j + 1) as f64;
            }
        }
        raw
    }

    /// Slope of a first-degree fit in raw units
    pub fn slope(&self) -> f64 {
        self.coefficients().get(1).copied().unwrap_or(0.0)
    }
}

/// Solve a square linear system with partial pivoting
pub fn solve_linear_system(mut matrix: Vec<Vec<f64>>, mut vector: Vec<f64>) -> Option<Vec<f64>> {
    let size = vector.len();

    for i in 0..size {
        let mut max_row = i;
        for k in (i + 1)..size {
            if matrix[k][i].abs() > matrix[max_row][i].abs() {
                max_row = k;
            }
        }
        matrix.swap(i, max_row);
        vector.swap(i, max_row);

        if matrix[i][i].abs() < SINGULARITY_TOLERANCE || !matrix[i][i].is_finite() {
            return None;
        }

        for k in (i + 1)..size {
            let factor = matrix[k][i] / matrix[i][i];
            for j in i..size {
                matrix[k][j] -= factor * matrix[i][j];
            }
            vector[k] -= factor * vector[i];
        }
    }

    let mut solution = vec![0.0; size];
    for i in (0..size).rev() {
        solution[i] = vector[i];
        for j in (i + 1)..size {
            solution[i] -= matrix[i][j] * solution[j];
        }
        solution[i] /= matrix[i][i];
    }

    Some(solution)
}

/// Least-squares polynomial fit of `y` against `x`
pub fn polyfit(x: &[f64], y: &[f64], degree: usize) -> Result<Polynomial> {
    if x.len() != y.len() {
        return Err(VacError::LengthMismatch {
            left: x.len(),
            right: y.len(),
        });
    }
    if x.len() < degree + 1 {
        return Err(VacError::insufficient("Polynomial fit", degree + 1, x.len()));
    }

    let n = x.len() as f64;
    let shift = x.iter().sum::<f64>() / n;
    let spread = x.iter().map(|v| (v - shift).abs()).fold(0.0, f64::max);
    let scale = if spread > 0.0 { spread } else { 1.0 };
    let u: Vec<f64> = x.iter().map(|v| (v - shift) / scale).collect();

    let size = degree + 1;
    let mut matrix = vec![vec![0.0; size]; size];
    let mut vector = vec![0.0; size];

    for i in 0..size {
        for j in 0..size {
            matrix[i][j] = u.iter().map(|p| p.powi((i + j) as i32)).sum();
        }
        vector[i] = u.iter().zip(y).map(|(p, v)| v * p.powi(i as i32)).sum();
    }

    let scaled = solve_linear_system(matrix, vector)
        .ok_or_else(|| VacError::Fit("singular normal equations".to_string()))?;

    Ok(Polynomial {
        scaled,
        shift,
        scale,
    })
}

/// Straight-line fit result
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Ordinary least-squares line through `(x, y)`
pub fn linear_fit(x: &[f64], y: &[f64]) -> Result<LinearFit> {
    if x.len() != y.len() {
        return Err(VacError::LengthMismatch {
            left: x.len(),
            right: y.len(),
        });
    }
    if x.len() < 2 {
        return Err(VacError::insufficient("Linear fit", 2, x.len()));
    }

    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let sxx: f64 = x.iter().map(|v| (v - mean_x).powi(2)).sum();
    let sxy: f64 = x.iter().zip(y).map(|(a, b)| (a - mean_x) * (b - mean_y)).sum();

    if sxx <= 0.0 || !sxx.is_finite() {
        return Err(VacError::Fit("abscissa has no spread".to_string()));
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    let fitted: Vec<f64> = x.iter().map(|v| slope * v + intercept).collect();

    Ok(LinearFit {
        slope,
        intercept,
        r_squared: r_squared(y, &fitted),
    })
}

/// Coefficient of determination, 0 when `observed` has no variance
pub fn r_squared(observed: &[f64], fitted: &[f64]) -> f64 {
    if observed.is_empty() {
        return 0.0;
    }
    let mean = observed.iter().sum::<f64>() / observed.len() as f64;
    let ss_tot: f64 = observed.iter().map(|v| (v - mean).powi(2)).sum();
    let ss_res: f64 = observed
        .iter()
        .zip(fitted)
        .map(|(o, f)| (o - f).powi(2))
        .sum();

    if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 }
}

/// Pearson correlation coefficient, 0 when either side is constant
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return 0.0;
    }
    let mean_a = a[..n].iter().sum::<f64>() / n as f64;
    let mean_b = b[..n].iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a[..n].iter().zip(&b[..n]) {
        cov += (x - mean_a) * (y - mean_b);
        var_a += (x - mean_a).powi(2);
        var_b += (y - mean_b).powi(2);
    }

    let denominator = (var_a * var_b).sqrt();
    if denominator == 0.0 || !denominator.is_finite() {
        0.0
    } else {
        cov / denominator
    }
}

/// Squared Pearson correlation, the fit quality measure used by the vacuum analyses
pub fn correlation_squared(a: &[f64], b: &[f64]) -> f64 {
    let r = pearson(a, b);
    if r.is_finite() { r * r } else { 0.0 }
}

/// Result of fitting `P(t) = P0 * exp(-t / tau) + P_ult`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayFit {
    pub amplitude: f64,
    pub time_constant: f64,
    pub ultimate: f64,
    pub iterations: usize,
    pub residual_sum: f64,
}

impl DecayFit {
    pub fn eval(&self, t: f64) -> f64 {
        decay_model(t, &[self.amplitude, self.time_constant, self.ultimate])
    }
}

fn decay_model(t: f64, p: &[f64; 3]) -> f64 {
    p[0] * (-t / p[1]).exp() + p[2]
}

fn decay_jacobian(t: f64, p: &[f64; 3]) -> [f64; 3] {
    let e = (-t / p[1]).exp();
    [e, p[0] * e * t / (p[1] * p[1]), 1.0]
}

/// Bounded fit of the three-parameter exponential decay
///
/// `initial`, `lower` and `upper` are ordered `[P0, tau, P_ult]`.
pub fn fit_exponential_decay(
    t: &[f64],
    y: &[f64],
    initial: [f64; 3],
    lower: [f64; 3],
    upper: [f64; 3],
) -> Result<DecayFit> {
    let (params, iterations, residual_sum) =
        levenberg_marquardt(t, y, initial, lower, upper, decay_model, decay_jacobian)?;

    Ok(DecayFit {
        amplitude: params[0],
        time_constant: params[1],
        ultimate: params[2],
        iterations,
        residual_sum,
    })
}

/// Box-constrained Levenberg-Marquardt with Marquardt diagonal scaling
///
/// Steps are projected onto `[lower, upper]`. Returns the parameters, the
/// number of outer iterations and the final residual sum of squares.
pub fn levenberg_marquardt<const N: usize, F, J>(
    x: &[f64],
    y: &[f64],
    initial: [f64; N],
    lower: [f64; N],
    upper: [f64; N],
    model: F,
    jacobian: J,
) -> Result<([f64; N], usize, f64)>
where
    F: Fn(f64, &[f64; N]) -> f64,
    J: Fn(f64, &[f64; N]) -> [f64; N],
{
    profiling::scope!("levenberg_marquardt");

    if x.len() != y.len() {
        return Err(VacError::LengthMismatch {
            left: x.len(),
            right: y.len(),
        });
    }
    if x.len() < N {
        return Err(VacError::insufficient("Curve fit", N, x.len()));
    }

    let project = |p: [f64; N]| -> [f64; N] {
        let mut out = p;
        for k in 0..N {
            out[k] = out[k].max(lower[k]).min(upper[k]);
        }
        out
    };
    let residual_sum = |p: &[f64; N]| -> f64 {
        x.iter()
            .zip(y)
            .map(|(&xi, &yi)| (yi - model(xi, p)).powi(2))
            .sum()
    };

    let mut params = project(initial);
    let mut sse = residual_sum(&params);
    if !sse.is_finite() {
        return Err(VacError::Fit("initial guess produces non-finite residuals".to_string()));
    }

    let mut lambda = 1e-3;
    let mut iterations = 0;

    while iterations < LM_MAX_ITERATIONS {
        iterations += 1;

        let mut jtj = vec![vec![0.0; N]; N];
        let mut jtr = vec![0.0; N];
        for (&xi, &yi) in x.iter().zip(y) {
            let grad = jacobian(xi, &params);
            let residual = yi - model(xi, &params);
            for a in 0..N {
                jtr[a] += grad[a] * residual;
                for b in 0..N {
                    jtj[a][b] += grad[a] * grad[b];
                }
            }
        }

        let mut improved = false;
        let mut step_size = 0.0;
        while lambda < 1e16 {
            let mut damped = jtj.clone();
            for k in 0..N {
                let diag = if jtj[k][k] > 0.0 { jtj[k][k] } else { 1.0 };
                damped[k][k] += lambda * diag;
            }

            let Some(delta) = solve_linear_system(damped, jtr.clone()) else {
                lambda *= 10.0;
                continue;
            };

            let mut candidate = params;
            for k in 0..N {
                candidate[k] += delta[k];
            }
            let candidate = project(candidate);
            let candidate_sse = residual_sum(&candidate);

            if candidate_sse.is_finite() && candidate_sse <= sse {
                step_size = (0..N)
                    .map(|k| ((candidate[k] - params[k]) / params[k].abs().max(1e-300)).abs())
                    .fold(0.0, f64::max);
                let gain = sse - candidate_sse;
                params = candidate;
                sse = candidate_sse;
                lambda = (lambda / 10.0).max(1e-12);
                improved = gain > 1e-15 * sse.max(f64::MIN_POSITIVE);
                break;
            }
            lambda *= 10.0;
        }

        if !improved || step_size < 1e-12 {
            break;
        }
    }

    if params.iter().any(|p| !p.is_finite()) || !sse.is_finite() {
        return Err(VacError::Fit("solver diverged".to_string()));
    }

    Ok((params, iterations, sse))
}
