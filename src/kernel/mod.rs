//! Kernel functions and the parallel kernel-matrix engine

pub mod engine;
pub mod linear;
pub mod rbf;
pub mod traits;

pub use self::engine::*;
pub use self::linear::*;
pub use self::rbf::*;
pub use self::traits::*;

use crate::core::KernelConfig;

impl Kernel for KernelConfig {
    fn compute(&self, x: &[f64], y: &[f64]) -> f64 {
        match *self {
            KernelConfig::Linear => LinearKernel.compute(x, y),
            KernelConfig::Rbf { gamma } => RBFKernel::new_unchecked(gamma).compute(x, y),
        }
    }

    fn compute_with_norms(&self, x: &[f64], y: &[f64], x_norm_sq: f64, y_norm_sq: f64) -> f64 {
        match *self {
            KernelConfig::Linear => LinearKernel.compute(x, y),
            KernelConfig::Rbf { gamma } => {
                RBFKernel::new_unchecked(gamma).compute_with_norms(x, y, x_norm_sq, y_norm_sq)
            }
        }
    }
}
