//! Core type definitions for IRWLS SVM

use crate::core::{Result, SVMError};
use serde::{Deserialize, Serialize};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Prediction result containing label and decision value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Predicted class label (+1 or -1)
    pub label: f64,
    /// Raw decision function value
    pub decision_value: f64,
}

impl Prediction {
    /// Create a prediction from a decision value (ties go to +1)
    pub fn from_decision_value(decision_value: f64) -> Self {
        let label = if decision_value >= 0.0 { 1.0 } else { -1.0 };
        Self {
            label,
            decision_value,
        }
    }
}

/// Dense row-major matrix of `f64` values
///
/// Used for feature matrices, center sets, query batches and kernel matrices.
#[derive(Clone, Debug, PartialEq)]
pub struct DenseMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl DenseMatrix {
    /// Wrap a row-major buffer of `rows * cols` values
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(SVMError::DimensionMismatch {
                expected: rows * cols,
                actual: data.len(),
            });
        }
        Ok(Self { rows, cols, data })
    }

    /// Matrix of zeros
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Build a matrix from equally sized rows
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            if row.len() != cols {
                return Err(SVMError::DimensionMismatch {
                    expected: cols,
                    actual: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    /// Row `i` as a slice
    ///
    /// # Panics
    /// Panics if `i >= rows()`
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// Element at (i, j)
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.cols + j]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Iterate over rows
    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> {
        // chunks_exact panics on a zero chunk size
        self.data.chunks_exact(self.cols.max(1)).take(self.rows)
    }

    /// Copy the listed rows into a new matrix, in the given order
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        let mut data = Vec::with_capacity(indices.len() * self.cols);
        for &i in indices {
            data.extend_from_slice(self.row(i));
        }
        Self {
            rows: indices.len(),
            cols: self.cols,
            data,
        }
    }

    /// Zero-copy faer view of this matrix
    pub fn as_faer(&self) -> faer::MatRef<'_, f64> {
        faer::MatRef::from_row_major_slice(&self.data, self.rows, self.cols)
    }

    /// Rows as owned vectors (used for serialization)
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.iter_rows().map(<[f64]>::to_vec).collect()
    }
}

/// Labeled training data: dense features plus {-1, +1} labels
#[derive(Clone, Debug)]
pub struct Dataset {
    features: DenseMatrix,
    labels: Vec<f64>,
}

impl Dataset {
    /// Create a dataset, validating shapes and labels
    pub fn new(features: DenseMatrix, labels: Vec<f64>) -> Result<Self> {
        if features.rows() == 0 || labels.is_empty() {
            return Err(SVMError::EmptyDataset);
        }
        if features.cols() == 0 {
            return Err(SVMError::InvalidDataset(
                "Feature matrix must have at least one column".to_string(),
            ));
        }
        if features.rows() != labels.len() {
            return Err(SVMError::DimensionMismatch {
                expected: features.rows(),
                actual: labels.len(),
            });
        }
        if let Some(&bad) = labels.iter().find(|&&y| y != 1.0 && y != -1.0) {
            return Err(SVMError::InvalidLabel(bad));
        }
        if let Some(pos) = features.as_slice().iter().position(|v| !v.is_finite()) {
            let cols = features.cols();
            return Err(SVMError::InvalidDataset(format!(
                "Non-finite feature value at row {}, column {}",
                pos / cols,
                pos % cols
            )));
        }
        Ok(Self { features, labels })
    }

    pub fn features(&self) -> &DenseMatrix {
        &self.features
    }

    pub fn labels(&self) -> &[f64] {
        &self.labels
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Number of features
    pub fn dim(&self) -> usize {
        self.features.cols()
    }

    /// Always false: construction rejects empty datasets
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Number of (+1, -1) labels
    pub fn class_counts(&self) -> (usize, usize) {
        let positives = self.labels.iter().filter(|&&y| y > 0.0).count();
        (positives, self.labels.len() - positives)
    }
}

/// Kernel function selection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum KernelConfig {
    /// K(x, y) = x^T y
    Linear,
    /// K(x, y) = exp(-gamma ||x - y||²)
    Rbf { gamma: f64 },
}

impl KernelConfig {
    pub fn linear() -> Self {
        Self::Linear
    }

    pub fn rbf(gamma: f64) -> Self {
        Self::Rbf { gamma }
    }

    /// Reject non-positive or non-finite gamma
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::Linear => Ok(()),
            Self::Rbf { gamma } if gamma > 0.0 && gamma.is_finite() => Ok(()),
            Self::Rbf { gamma } => Err(SVMError::InvalidParameter(format!(
                "RBF gamma must be positive and finite, got: {gamma}"
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Rbf { .. } => "rbf",
        }
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::Rbf { gamma: 1.0 }
    }
}

/// How budgeted training picks its centers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CenterSelection {
    /// Uniform random subsample of the training points
    Random,
    /// Greedy kernel-approximation error descent over random candidate pools
    Incremental,
}

/// Configuration of the reduced basis used by budgeted training
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetConfig {
    /// Number of centers M (1 <= M <= n)
    pub size: usize,
    /// Center selection strategy
    pub selection: CenterSelection,
    /// Candidates scored per incremental selection step
    pub candidates: usize,
    /// Seed for center sampling
    pub seed: u64,
    /// Column cache size in bytes for incremental selection
    pub cache_size: usize,
}

impl BudgetConfig {
    pub fn new(size: usize, selection: CenterSelection) -> Self {
        Self {
            size,
            selection,
            ..Self::default()
        }
    }
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            size: 10,
            selection: CenterSelection::Random,
            candidates: 64,
            seed: 0,
            cache_size: 64 * 1024 * 1024, // 64MB
        }
    }
}

/// Configuration for IRWLS training
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    /// Regularization parameter C
    pub c: f64,
    /// Worker threads (>= 1)
    pub threads: usize,
    /// Squared relative coefficient change that counts as converged
    pub tolerance: f64,
    /// Maximum number of IRWLS iterations
    pub max_iterations: usize,
    /// Ridge term added to the diagonal of every system
    pub ridge: f64,
    /// Factorization retries with a 10x larger ridge before failing
    pub max_ridge_retries: usize,
    /// Iterations without a new smallest relative change before stopping
    pub patience: usize,
    /// Reduced basis, required by budgeted training
    pub budget: Option<BudgetConfig>,
    /// Checked between iterations; set it to stop training
    pub abort: Option<Arc<AtomicBool>>,
}

impl TrainingConfig {
    /// Reject invalid settings before any computation happens
    pub fn validate(&self) -> Result<()> {
        if !(self.c > 0.0 && self.c.is_finite()) {
            return Err(SVMError::InvalidParameter(format!(
                "C must be positive and finite, got: {}",
                self.c
            )));
        }
        if self.threads == 0 {
            return Err(SVMError::InvalidParameter(
                "Thread count must be at least 1".to_string(),
            ));
        }
        if !(self.tolerance > 0.0) {
            return Err(SVMError::InvalidParameter(format!(
                "Tolerance must be positive, got: {}",
                self.tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(SVMError::InvalidParameter(
                "Maximum iterations must be at least 1".to_string(),
            ));
        }
        if self.patience == 0 {
            return Err(SVMError::InvalidParameter(
                "Patience must be at least 1".to_string(),
            ));
        }
        if !(self.ridge >= 0.0 && self.ridge.is_finite()) {
            return Err(SVMError::InvalidParameter(format!(
                "Ridge must be non-negative, got: {}",
                self.ridge
            )));
        }
        if let Some(budget) = &self.budget {
            if budget.size == 0 {
                return Err(SVMError::InvalidParameter(
                    "Budget size must be at least 1".to_string(),
                ));
            }
            if budget.candidates == 0 {
                return Err(SVMError::InvalidParameter(
                    "Candidate pool size must be at least 1".to_string(),
                ));
            }
        }
        Ok(())
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            threads: 1,
            tolerance: 1e-6,
            max_iterations: 500,
            ridge: 1e-6,
            max_ridge_retries: 3,
            patience: 5,
            budget: None,
            abort: None,
        }
    }
}

/// Terminal status of a successful training run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverStatus {
    Converged,
    /// Stopped short of the tolerance, either at the iteration limit or
    /// after `patience` iterations without a new smallest relative change
    MaxIterationsReached,
}

/// Which solver produced a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverKind {
    Full,
    Budgeted,
}

/// How a model's training run ended
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingSummary {
    pub solver: SolverKind,
    pub status: SolverStatus,
    pub iterations: usize,
    /// Squared relative coefficient change of the returned iterate
    pub final_change: f64,
    pub c: f64,
    /// Worker threads used for training, reused by [`crate::api::predict`]
    pub threads: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dense_matrix_creation() {
        let m = DenseMatrix::new(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert_eq!(m.rows(), 2);
        assert_eq!(m.cols(), 3);
        assert_eq!(m.row(1), &[4.0, 5.0, 6.0]);
        assert_eq!(m.get(0, 2), 3.0);
    }

    #[test]
    fn test_dense_matrix_length_mismatch() {
        let result = DenseMatrix::new(2, 2, vec![1.0, 2.0, 3.0]);
        assert!(matches!(
            result,
            Err(SVMError::DimensionMismatch {
                expected: 4,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_dense_matrix_from_rows() {
        let m = DenseMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(m.as_slice(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(m.to_rows(), vec![vec![1.0, 2.0], vec![3.0, 4.0]]);

        let ragged = DenseMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0]]);
        assert!(ragged.is_err());
    }

    #[test]
    fn test_select_rows() {
        let m = DenseMatrix::from_rows(&[vec![1.0], vec![2.0], vec![3.0]]).unwrap();
        let picked = m.select_rows(&[2, 0]);
        assert_eq!(picked.as_slice(), &[3.0, 1.0]);
        assert_eq!(picked.rows(), 2);
    }

    #[test]
    fn test_faer_view_matches_layout() {
        let m = DenseMatrix::new(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let view = m.as_faer();
        assert_eq!(view[(0, 1)], 2.0);
        assert_eq!(view[(1, 0)], 3.0);
    }

    #[test]
    fn test_dataset_validation() {
        let features = DenseMatrix::from_rows(&[vec![1.0], vec![-1.0]]).unwrap();
        let dataset = Dataset::new(features.clone(), vec![1.0, -1.0]).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.dim(), 1);
        assert_eq!(dataset.class_counts(), (1, 1));

        assert!(matches!(
            Dataset::new(features.clone(), vec![1.0]),
            Err(SVMError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            Dataset::new(features, vec![1.0, 0.5]),
            Err(SVMError::InvalidLabel(l)) if l == 0.5
        ));
        assert!(matches!(
            Dataset::new(DenseMatrix::zeros(0, 1), vec![]),
            Err(SVMError::EmptyDataset)
        ));
    }

    #[test]
    fn test_dataset_rejects_non_finite_features() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let features = DenseMatrix::from_rows(&[vec![0.5, 1.0], vec![bad, 1.0]]).unwrap();
            match Dataset::new(features, vec![-1.0, 1.0]) {
                Err(SVMError::InvalidDataset(msg)) => assert!(msg.contains("row 1, column 0")),
                other => panic!("expected InvalidDataset for {bad}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_kernel_config_validation() {
        assert!(KernelConfig::linear().validate().is_ok());
        assert!(KernelConfig::rbf(0.5).validate().is_ok());
        assert!(matches!(
            KernelConfig::rbf(0.0).validate(),
            Err(SVMError::InvalidParameter(_))
        ));
        assert!(KernelConfig::rbf(-1.0).validate().is_err());
        assert!(KernelConfig::rbf(f64::NAN).validate().is_err());
    }

    #[test]
    fn test_training_config_default() {
        let config = TrainingConfig::default();
        assert_eq!(config.c, 1.0);
        assert_eq!(config.threads, 1);
        assert_eq!(config.tolerance, 1e-6);
        assert_eq!(config.max_iterations, 500);
        assert_eq!(config.max_ridge_retries, 3);
        assert_eq!(config.patience, 5);
        assert!(config.budget.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_training_config_rejects_bad_values() {
        let bad_c = TrainingConfig {
            c: 0.0,
            ..TrainingConfig::default()
        };
        assert!(bad_c.validate().is_err());

        let bad_threads = TrainingConfig {
            threads: 0,
            ..TrainingConfig::default()
        };
        assert!(bad_threads.validate().is_err());

        let bad_budget = TrainingConfig {
            budget: Some(BudgetConfig::new(0, CenterSelection::Random)),
            ..TrainingConfig::default()
        };
        assert!(bad_budget.validate().is_err());

        let bad_patience = TrainingConfig {
            patience: 0,
            ..TrainingConfig::default()
        };
        assert!(bad_patience.validate().is_err());
    }

    #[test]
    fn test_prediction() {
        let pred = Prediction::from_decision_value(2.5);
        assert_eq!(pred.label, 1.0);
        assert_eq!(pred.decision_value, 2.5);

        let neg_pred = Prediction::from_decision_value(-1.8);
        assert_eq!(neg_pred.label, -1.0);
        assert_eq!(neg_pred.decision_value, -1.8);

        assert_eq!(Prediction::from_decision_value(0.0).label, 1.0);
    }

    #[test]
    fn test_kernel_config_serde() {
        let json = serde_json::to_string(&KernelConfig::rbf(0.25)).unwrap();
        assert_eq!(json, r#"{"type":"rbf","gamma":0.25}"#);
        let back: KernelConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, KernelConfig::rbf(0.25));
    }
}
