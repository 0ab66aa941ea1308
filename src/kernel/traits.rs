//! Kernel trait definition

/// Kernel function trait
///
/// A kernel function K(x, y) must satisfy Mercer's condition to be valid for SVM.
/// Points are dense slices of equal length.
pub trait Kernel: Send + Sync {
    /// Compute kernel value K(x, y)
    fn compute(&self, x: &[f64], y: &[f64]) -> f64;

    /// Compute kernel value using precomputed squared norms
    /// This can be more efficient for some kernels (e.g., RBF)
    fn compute_with_norms(&self, x: &[f64], y: &[f64], x_norm_sq: f64, y_norm_sq: f64) -> f64 {
        // Default implementation ignores the norms
        let _ = (x_norm_sq, y_norm_sq);
        self.compute(x, y)
    }
}
