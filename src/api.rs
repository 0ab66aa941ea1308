//! High-level API for IRWLS SVM training and prediction
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use irwls_svm::api::SVM;
//! use irwls_svm::{CenterSelection, KernelConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let model = SVM::new()
//!     .with_kernel(KernelConfig::rbf(0.5))
//!     .with_c(10.0)
//!     .with_threads(4)
//!     .with_budget(200, CenterSelection::Incremental)
//!     .train_from_file("data.libsvm")?;
//!
//! let metrics = irwls_svm::api::evaluate_file(&model, "test.libsvm", 4)?;
//! println!("Accuracy: {:.2}%", metrics.accuracy() * 100.0);
//! # Ok(())
//! # }
//! ```

use crate::core::{
    BudgetConfig, CenterSelection, Classifier, Dataset, DenseMatrix, KernelConfig, Prediction,
    Result, TrainingConfig,
};
use crate::data::LibSVMDataset;
use crate::model::{Model, PredictionEngine};
use crate::solver::{BudgetedSolver, FullSolver, SolverStrategy};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Train over the full kernel matrix
pub fn train_full(
    features: &DenseMatrix,
    labels: &[f64],
    kernel: KernelConfig,
    config: &TrainingConfig,
) -> Result<Model> {
    kernel.validate()?;
    config.validate()?;
    let dataset = Dataset::new(features.clone(), labels.to_vec())?;
    FullSolver.run(&dataset, kernel, config)
}

/// Train over `config.budget` centers
pub fn train_budgeted(
    features: &DenseMatrix,
    labels: &[f64],
    kernel: KernelConfig,
    config: &TrainingConfig,
) -> Result<Model> {
    kernel.validate()?;
    config.validate()?;
    let dataset = Dataset::new(features.clone(), labels.to_vec())?;
    BudgetedSolver.run(&dataset, kernel, config)
}

/// Labels and margins for every query row, on as many threads as training used
pub fn predict(model: &Model, queries: &DenseMatrix) -> Result<Vec<Prediction>> {
    PredictionEngine::new(model, model.summary().threads.max(1))?.predict(queries)
}

/// Confusion-matrix metrics of `model` on a labeled dataset
pub fn evaluate(model: &Model, dataset: &Dataset, threads: usize) -> Result<EvaluationMetrics> {
    let predictions = PredictionEngine::new(model, threads)?.predict(dataset.features())?;
    Ok(EvaluationMetrics::from_predictions(
        &predictions,
        dataset.labels(),
    ))
}

/// Evaluate on a LibSVM file, densified to the model's dimensionality
pub fn evaluate_file<P: AsRef<Path>>(
    model: &Model,
    path: P,
    threads: usize,
) -> Result<EvaluationMetrics> {
    let dataset = LibSVMDataset::from_file(path)?.to_dataset(Some(model.dim()))?;
    evaluate(model, &dataset, threads)
}

/// High-level SVM interface with builder pattern
#[derive(Debug, Clone)]
pub struct SVM {
    kernel: KernelConfig,
    config: TrainingConfig,
}

impl SVM {
    /// RBF kernel with gamma 1, full solver, default parameters
    pub fn new() -> Self {
        Self {
            kernel: KernelConfig::default(),
            config: TrainingConfig::default(),
        }
    }

    pub fn with_kernel(mut self, kernel: KernelConfig) -> Self {
        self.kernel = kernel;
        self
    }

    /// Set regularization parameter C
    pub fn with_c(mut self, c: f64) -> Self {
        self.config.c = c;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.config.threads = threads;
        self
    }

    /// Set convergence tolerance
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.config.tolerance = tolerance;
        self
    }

    /// Set maximum number of iterations
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    pub fn with_ridge(mut self, ridge: f64) -> Self {
        self.config.ridge = ridge;
        self
    }

    /// Stop after this many iterations without a new smallest relative change
    pub fn with_patience(mut self, patience: usize) -> Self {
        self.config.patience = patience;
        self
    }

    /// Train budgeted with `size` centers instead of the full solver
    pub fn with_budget(mut self, size: usize, selection: CenterSelection) -> Self {
        let budget = self.config.budget.take().unwrap_or_default();
        self.config.budget = Some(BudgetConfig {
            size,
            selection,
            ..budget
        });
        self
    }

    /// Seed for center sampling; only used with a budget
    pub fn with_seed(mut self, seed: u64) -> Self {
        if let Some(budget) = self.config.budget.as_mut() {
            budget.seed = seed;
        }
        self
    }

    /// Candidates scored per incremental selection step; only used with a budget
    pub fn with_candidates(mut self, candidates: usize) -> Self {
        if let Some(budget) = self.config.budget.as_mut() {
            budget.candidates = candidates;
        }
        self
    }

    /// Column cache size in bytes for incremental selection; only used with a budget
    pub fn with_cache_size(mut self, bytes: usize) -> Self {
        if let Some(budget) = self.config.budget.as_mut() {
            budget.cache_size = bytes;
        }
        self
    }

    /// Flag checked between iterations; setting it aborts training
    pub fn with_abort_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.config.abort = Some(flag);
        self
    }

    pub fn kernel(&self) -> KernelConfig {
        self.kernel
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Train on a dataset
    pub fn train(&self, dataset: &Dataset) -> Result<Model> {
        let strategy: &dyn SolverStrategy = if self.config.budget.is_some() {
            &BudgetedSolver
        } else {
            &FullSolver
        };
        strategy.run(dataset, self.kernel, &self.config)
    }

    /// Train from LibSVM format file
    pub fn train_from_file<P: AsRef<Path>>(&self, path: P) -> Result<Model> {
        let dataset = LibSVMDataset::from_file(path)?.to_dataset(None)?;
        self.train(&dataset)
    }
}

impl Default for SVM {
    fn default() -> Self {
        Self::new()
    }
}

/// Detailed evaluation metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationMetrics {
    pub true_positives: usize,
    pub true_negatives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

impl EvaluationMetrics {
    pub fn new(tp: usize, tn: usize, fp: usize, fn_: usize) -> Self {
        Self {
            true_positives: tp,
            true_negatives: tn,
            false_positives: fp,
            false_negatives: fn_,
        }
    }

    /// Tally predictions against {-1, +1} labels
    pub fn from_predictions(predictions: &[Prediction], labels: &[f64]) -> Self {
        let mut tp = 0; // True positives
        let mut tn = 0; // True negatives
        let mut fp = 0; // False positives
        let mut fn_ = 0; // False negatives

        for (pred, &actual) in predictions.iter().zip(labels.iter()) {
            match (pred.label > 0.0, actual > 0.0) {
                (true, true) => tp += 1,
                (false, false) => tn += 1,
                (true, false) => fp += 1,
                (false, true) => fn_ += 1,
            }
        }

        Self::new(tp, tn, fp, fn_)
    }

    pub fn total(&self) -> usize {
        self.true_positives + self.true_negatives + self.false_positives + self.false_negatives
    }

    /// Calculate accuracy: (TP + TN) / (TP + TN + FP + FN)
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            (self.true_positives + self.true_negatives) as f64 / total as f64
        }
    }

    /// Calculate precision: TP / (TP + FP)
    pub fn precision(&self) -> f64 {
        let denominator = self.true_positives + self.false_positives;
        if denominator == 0 {
            0.0
        } else {
            self.true_positives as f64 / denominator as f64
        }
    }

    /// Calculate recall (sensitivity): TP / (TP + FN)
    pub fn recall(&self) -> f64 {
        let denominator = self.true_positives + self.false_negatives;
        if denominator == 0 {
            0.0
        } else {
            self.true_positives as f64 / denominator as f64
        }
    }

    /// Calculate F1 score: 2 * (precision * recall) / (precision + recall)
    pub fn f1_score(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * (p * r) / (p + r)
        }
    }

    /// Calculate specificity: TN / (TN + FP)
    pub fn specificity(&self) -> f64 {
        let denominator = self.true_negatives + self.false_positives;
        if denominator == 0 {
            0.0
        } else {
            self.true_negatives as f64 / denominator as f64
        }
    }
}
