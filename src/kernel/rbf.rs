//! RBF (Radial Basis Function) kernel implementation
//!
//! The RBF kernel is defined as: K(x, y) = exp(-γ * ||x - y||²)
//! where γ (gamma) is a hyperparameter that controls the kernel width.

use crate::core::{KernelConfig, Result};
use crate::kernel::linear::dot;
use crate::kernel::Kernel;

/// RBF (Radial Basis Function) kernel: K(x, y) = exp(-γ * ||x - y||²)
///
/// The gamma parameter controls the "reach" of each training example:
/// - High gamma: close points have high influence (potential overfitting)
/// - Low gamma: distant points have influence (potential underfitting)
#[derive(Debug, Clone, Copy)]
pub struct RBFKernel {
    gamma: f64,
}

impl RBFKernel {
    /// Create a new RBF kernel, rejecting gamma <= 0
    pub fn new(gamma: f64) -> Result<Self> {
        KernelConfig::rbf(gamma).validate()?;
        Ok(Self { gamma })
    }

    /// Create RBF kernel with gamma = 1.0 / n_features
    pub fn with_auto_gamma(n_features: usize) -> Result<Self> {
        Self::new(1.0 / n_features as f64)
    }

    /// Skip validation; the caller has already checked gamma
    pub(crate) fn new_unchecked(gamma: f64) -> Self {
        Self { gamma }
    }

    /// Get the gamma parameter
    pub fn gamma(&self) -> f64 {
        self.gamma
    }
}

impl Kernel for RBFKernel {
    fn compute(&self, x: &[f64], y: &[f64]) -> f64 {
        (-self.gamma * squared_euclidean_distance(x, y)).exp()
    }

    fn compute_with_norms(&self, x: &[f64], y: &[f64], x_norm_sq: f64, y_norm_sq: f64) -> f64 {
        // ||x - y||² = ||x||² + ||y||² - 2*x^T*y
        let squared_distance = x_norm_sq + y_norm_sq - 2.0 * dot(x, y);

        // Cancellation can push the distance slightly below zero; NaN passes through
        let squared_distance = if squared_distance < 0.0 {
            0.0
        } else {
            squared_distance
        };
        (-self.gamma * squared_distance).exp()
    }
}

/// ||x - y||²
fn squared_euclidean_distance(x: &[f64], y: &[f64]) -> f64 {
    x.iter()
        .zip(y)
        .map(|(a, b)| {
            let diff = a - b;
            diff * diff
        })
        .sum()
}
