//! Trained models and batch prediction
//!
//! A [`Model`] is immutable once built. [`PredictionEngine`] evaluates
//!
//! ```text
//! f(x) = Σ_i coefficient_i · k(x, center_i) + bias
//! ```
//!
//! for query batches, splitting the queries into contiguous blocks across a
//! worker pool.

use crate::core::{
    Classifier, DenseMatrix, KernelConfig, Prediction, Result, SVMError, TrainingSummary,
};
use crate::kernel::Kernel;
use crate::parallel::WorkerPool;

/// Kernel expansion learned by one of the solvers
#[derive(Debug, Clone)]
pub struct Model {
    kernel: KernelConfig,
    centers: DenseMatrix,
    center_norms: Vec<f64>,
    coefficients: Vec<f64>,
    bias: f64,
    summary: TrainingSummary,
    source_indices: Option<Vec<usize>>,
}

impl Model {
    /// Assemble a model, validating that the parts fit together
    pub fn from_parts(
        kernel: KernelConfig,
        centers: DenseMatrix,
        coefficients: Vec<f64>,
        bias: f64,
        summary: TrainingSummary,
    ) -> Result<Self> {
        kernel.validate()?;
        if centers.cols() == 0 {
            return Err(SVMError::InvalidParameter(
                "Model centers must have at least one feature".to_string(),
            ));
        }
        if coefficients.len() != centers.rows() {
            return Err(SVMError::DimensionMismatch {
                expected: centers.rows(),
                actual: coefficients.len(),
            });
        }
        if !bias.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
            return Err(SVMError::InvalidParameter(
                "Model coefficients must be finite".to_string(),
            ));
        }
        let center_norms = centers
            .iter_rows()
            .map(|row| row.iter().map(|v| v * v).sum())
            .collect();
        Ok(Self {
            kernel,
            centers,
            center_norms,
            coefficients,
            bias,
            summary,
            source_indices: None,
        })
    }

    /// Record which training samples the centers were taken from
    pub fn with_source_indices(mut self, indices: Vec<usize>) -> Self {
        self.source_indices = Some(indices);
        self
    }

    pub fn kernel(&self) -> KernelConfig {
        self.kernel
    }

    /// Retained support points or centers, one row each
    pub fn centers(&self) -> &DenseMatrix {
        &self.centers
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn summary(&self) -> &TrainingSummary {
        &self.summary
    }

    /// Training-set indices of the centers, when known
    pub fn source_indices(&self) -> Option<&[usize]> {
        self.source_indices.as_deref()
    }

    fn decision_value_unchecked(&self, x: &[f64]) -> f64 {
        let x_norm: f64 = x.iter().map(|v| v * v).sum();
        let expansion: f64 = self
            .centers
            .iter_rows()
            .zip(&self.center_norms)
            .zip(&self.coefficients)
            .map(|((center, &c_norm), &coef)| {
                coef * self.kernel.compute_with_norms(x, center, x_norm, c_norm)
            })
            .sum();
        expansion + self.bias
    }
}

impl Classifier for Model {
    fn decision_value(&self, x: &[f64]) -> Result<f64> {
        if x.len() != self.dim() {
            return Err(SVMError::DimensionMismatch {
                expected: self.dim(),
                actual: x.len(),
            });
        }
        Ok(self.decision_value_unchecked(x))
    }

    fn n_support_vectors(&self) -> usize {
        self.centers.rows()
    }

    fn bias(&self) -> f64 {
        self.bias
    }

    fn dim(&self) -> usize {
        self.centers.cols()
    }
}

/// Evaluates a model on query batches with a fixed number of threads
pub struct PredictionEngine<'m> {
    model: &'m Model,
    pool: WorkerPool,
}

impl<'m> PredictionEngine<'m> {
    pub fn new(model: &'m Model, threads: usize) -> Result<Self> {
        Ok(Self {
            model,
            pool: WorkerPool::new(threads)?,
        })
    }

    pub fn model(&self) -> &Model {
        self.model
    }

    /// f(x) for every query row
    pub fn decision_values(&self, queries: &DenseMatrix) -> Result<Vec<f64>> {
        if queries.cols() != self.model.dim() {
            return Err(SVMError::DimensionMismatch {
                expected: self.model.dim(),
                actual: queries.cols(),
            });
        }
        if queries.as_slice().iter().any(|v| !v.is_finite()) {
            return Err(SVMError::InvalidDataset(
                "Query features must be finite".to_string(),
            ));
        }
        let model = self.model;
        Ok(self.pool.map_indices(queries.rows(), |i| {
            model.decision_value_unchecked(queries.row(i))
        }))
    }

    /// Labels and margins for every query row
    pub fn predict(&self, queries: &DenseMatrix) -> Result<Vec<Prediction>> {
        Ok(self
            .decision_values(queries)?
            .into_iter()
            .map(Prediction::from_decision_value)
            .collect())
    }
}
