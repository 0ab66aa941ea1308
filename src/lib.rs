//! Kernel Support Vector Machines trained by Iteratively Re-weighted Least Squares
//!
//! Two regimes: a full solver over the N×N kernel matrix, and a budgeted
//! solver that expands the decision function over M ≪ N centers so that large
//! datasets fit in memory.

pub mod api;
pub mod cache;
pub mod core;
pub mod data;
pub mod kernel;
pub mod linalg;
pub mod model;
pub mod parallel;
pub mod persistence;
pub mod solver;

// Re-export main types for convenience
pub use crate::api::{evaluate, predict, train_budgeted, train_full, EvaluationMetrics, SVM};
pub use crate::cache::{CacheStats, KernelCache};
pub use crate::core::error::{Result, SVMError};
pub use crate::core::traits::*;
pub use crate::core::types::*;
pub use crate::data::LibSVMDataset;
pub use crate::kernel::{Kernel, KernelEngine, LinearKernel, RBFKernel};
pub use crate::model::{Model, PredictionEngine};
pub use crate::parallel::WorkerPool;
pub use crate::solver::{BudgetedSolver, FullSolver, SolverStrategy};

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
