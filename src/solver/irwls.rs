//! Iteratively re-weighted least squares
//!
//! Each iteration turns the current residuals r_i = 1 - y_i f(x_i) into
//! per-sample weights, solves one weighted least-squares system over the
//! active samples and stops once the coefficients stop moving. The system
//! itself depends on the basis the decision function is expanded over, which
//! is what [`Basis`] abstracts.

use crate::core::{Result, SVMError, SolverStatus, TrainingConfig};
use crate::parallel::WorkerPool;
use log::{debug, info, warn};
use std::sync::atomic::Ordering;

/// Residuals below this are treated as this value when weighting
pub const RESIDUAL_FLOOR: f64 = 1e-4;

/// Smallest ridge the retry schedule starts from
pub const MIN_RETRY_RIDGE: f64 = 1e-10;

/// IRWLS weight for one residual
///
/// Margin-satisfying samples (r <= 0) drop out with weight 0, the rest get
/// C / r with r floored at [`RESIDUAL_FLOOR`].
pub fn irwls_weight(residual: f64, c: f64) -> f64 {
    if residual <= 0.0 {
        0.0
    } else if residual < RESIDUAL_FLOOR {
        c / RESIDUAL_FLOOR
    } else {
        c / residual
    }
}

/// Per-sample weights and the indices with non-zero weight
#[derive(Debug, Clone, PartialEq)]
pub struct WeightState {
    weights: Vec<f64>,
    active: Vec<usize>,
}

impl WeightState {
    /// Weight every residual on the pool
    pub fn from_residuals(pool: &WorkerPool, residuals: &[f64], c: f64) -> Self {
        let weights = pool.map_indices(residuals.len(), |i| irwls_weight(residuals[i], c));
        let active = weights
            .iter()
            .enumerate()
            .filter(|(_, &w)| w > 0.0)
            .map(|(i, _)| i)
            .collect();
        Self { weights, active }
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Indices with non-zero weight, ascending
    pub fn active(&self) -> &[usize] {
        &self.active
    }

    pub fn n_active(&self) -> usize {
        self.active.len()
    }
}

/// Expansion coefficients plus bias produced by one solve
#[derive(Debug, Clone, PartialEq)]
pub struct Coefficients {
    pub weights: Vec<f64>,
    pub bias: f64,
}

impl Coefficients {
    pub fn zeros(len: usize) -> Self {
        Self {
            weights: vec![0.0; len],
            bias: 0.0,
        }
    }

    /// ||θ - θ_prev||² / ||θ||² with θ = weights and bias
    pub fn relative_change(&self, previous: &Coefficients) -> f64 {
        let diff: f64 = self
            .weights
            .iter()
            .zip(&previous.weights)
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            + (self.bias - previous.bias).powi(2);
        let norm: f64 = self.weights.iter().map(|w| w * w).sum::<f64>() + self.bias * self.bias;

        if norm > 0.0 {
            diff / norm
        } else if diff == 0.0 {
            0.0
        } else {
            f64::INFINITY
        }
    }
}

/// The function space one IRWLS run iterates in
pub trait Basis: Sync {
    /// Number of expansion coefficients, excluding the bias
    fn len(&self) -> usize;

    /// Solve the weighted system for the active samples of `state`
    ///
    /// Must return [`SVMError::NotPositiveDefinite`] when the system cannot be
    /// factored so the caller can retry with a larger ridge.
    fn solve(&self, labels: &[f64], state: &WeightState, ridge: f64) -> Result<Coefficients>;

    /// Decision values f(x_i) on every training sample
    fn decision_values(&self, coefficients: &Coefficients) -> Result<Vec<f64>>;
}

/// Result of a finished IRWLS run
#[derive(Debug, Clone)]
pub struct IrwlsOutcome {
    pub coefficients: Coefficients,
    pub status: SolverStatus,
    pub iterations: usize,
    pub final_change: f64,
    /// Ridge in effect at the end of the run
    pub ridge: f64,
}

/// Iterate weight / solve / convergence until a terminal state
///
/// The iterate with the smallest relative change seen so far is kept. Once
/// `config.patience` iterations pass without a new smallest change, or the
/// iteration limit is hit, the run ends as
/// [`SolverStatus::MaxIterationsReached`] and returns the kept iterate rather
/// than the last one.
pub fn run_irwls<B: Basis>(
    basis: &B,
    labels: &[f64],
    config: &TrainingConfig,
    pool: &WorkerPool,
) -> Result<IrwlsOutcome> {
    let n = labels.len();
    let mut coefficients = Coefficients::zeros(basis.len());
    // f = 0 before the first solve
    let mut residuals = vec![1.0; n];
    let mut ridge = config.ridge;
    let mut best: Option<(Coefficients, f64)> = None;
    let mut since_best = 0;

    for iteration in 1..=config.max_iterations {
        if let Some(flag) = &config.abort {
            if flag.load(Ordering::Relaxed) {
                info!("Training aborted before iteration {iteration}");
                return Err(SVMError::Aborted { iteration });
            }
        }

        let state = WeightState::from_residuals(pool, &residuals, config.c);
        if state.n_active() == 0 {
            info!("No active samples at iteration {iteration}, stopping");
            return Ok(IrwlsOutcome {
                coefficients,
                status: SolverStatus::Converged,
                iterations: iteration,
                final_change: 0.0,
                ridge,
            });
        }

        let next = solve_with_retries(basis, labels, &state, &mut ridge, config, iteration)?;
        let change = next.relative_change(&coefficients);
        coefficients = next;
        debug!(
            "Iteration {iteration}: {} active, relative change {change:.3e}",
            state.n_active()
        );

        if change < config.tolerance {
            info!("Converged after {iteration} iterations (change {change:.3e})");
            return Ok(IrwlsOutcome {
                coefficients,
                status: SolverStatus::Converged,
                iterations: iteration,
                final_change: change,
                ridge,
            });
        }

        if best.as_ref().map_or(true, |(_, best_change)| change < *best_change) {
            best = Some((coefficients.clone(), change));
            since_best = 0;
        } else {
            since_best += 1;
        }
        if since_best >= config.patience {
            let (kept, kept_change) = best.unwrap_or((coefficients, change));
            warn!(
                "No improvement for {since_best} iterations, stopping at iteration {iteration} (best change {kept_change:.3e})"
            );
            return Ok(IrwlsOutcome {
                coefficients: kept,
                status: SolverStatus::MaxIterationsReached,
                iterations: iteration,
                final_change: kept_change,
                ridge,
            });
        }

        let f = basis.decision_values(&coefficients)?;
        residuals = pool.map_indices(n, |i| 1.0 - labels[i] * f[i]);
    }

    let (kept, kept_change) = best.unwrap_or((coefficients, f64::INFINITY));
    warn!(
        "Reached the iteration limit of {} (best change {kept_change:.3e})",
        config.max_iterations
    );
    Ok(IrwlsOutcome {
        coefficients: kept,
        status: SolverStatus::MaxIterationsReached,
        iterations: config.max_iterations,
        final_change: kept_change,
        ridge,
    })
}

/// Solve once, growing the ridge tenfold on every factorization failure
///
/// A grown ridge stays in effect for the rest of the run.
fn solve_with_retries<B: Basis>(
    basis: &B,
    labels: &[f64],
    state: &WeightState,
    ridge: &mut f64,
    config: &TrainingConfig,
    iteration: usize,
) -> Result<Coefficients> {
    let mut attempts = 0;
    loop {
        attempts += 1;
        match basis.solve(labels, state, *ridge) {
            Err(SVMError::NotPositiveDefinite { dimension }) => {
                if attempts > config.max_ridge_retries {
                    return Err(SVMError::SolverFailed {
                        iteration,
                        attempts,
                        ridge: *ridge,
                    });
                }
                let grown = ridge.max(MIN_RETRY_RIDGE) * 10.0;
                warn!(
                    "System of dimension {dimension} not positive definite at iteration {iteration}, retrying with ridge {grown:e}"
                );
                *ridge = grown;
            }
            other => return other,
        }
    }
}
