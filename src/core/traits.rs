//! Core traits for IRWLS SVM

use crate::core::{Prediction, Result};

/// Trained binary classifier over dense points
pub trait Classifier: Send + Sync {
    /// Decision function value f(x) for a single point
    fn decision_value(&self, x: &[f64]) -> Result<f64>;

    /// Predict a single point
    fn predict_one(&self, x: &[f64]) -> Result<Prediction> {
        self.decision_value(x).map(Prediction::from_decision_value)
    }

    /// Number of retained support vectors or centers
    fn n_support_vectors(&self) -> usize;

    /// Get the bias term
    fn bias(&self) -> f64;

    /// Input dimensionality the classifier expects
    fn dim(&self) -> usize;
}
