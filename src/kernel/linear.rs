//! Linear kernel implementation

use crate::kernel::Kernel;

/// Linear kernel: K(x, y) = x^T * y
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearKernel;

impl LinearKernel {
    /// Create a new linear kernel
    pub fn new() -> Self {
        Self
    }
}

impl Kernel for LinearKernel {
    fn compute(&self, x: &[f64], y: &[f64]) -> f64 {
        dot(x, y)
    }
}

/// Dot product of two dense vectors of equal length
pub fn dot(x: &[f64], y: &[f64]) -> f64 {
    debug_assert_eq!(x.len(), y.len());
    x.iter().zip(y).map(|(a, b)| a * b).sum()
}
