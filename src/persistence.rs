//! Model serialization and persistence
//!
//! Models are stored as pretty-printed JSON: kernel, centers, coefficients,
//! bias and a metadata block describing how the model was trained.

use crate::core::{
    Classifier, DenseMatrix, KernelConfig, Result, SVMError, SolverKind, SolverStatus,
    TrainingSummary,
};
use crate::model::Model;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Serializable representation of a trained model
#[derive(Debug, Serialize, Deserialize)]
pub struct SerializableModel {
    pub kernel: KernelConfig,
    /// Centers or support vectors, one dense row each
    pub centers: Vec<Vec<f64>>,
    /// Expansion coefficient per center
    pub coefficients: Vec<f64>,
    /// Bias term
    pub bias: f64,
    /// Model metadata
    pub metadata: ModelMetadata,
}

/// Model metadata for tracking and validation
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Library version used to create the model
    pub library_version: String,
    /// Input dimensionality
    pub n_features: usize,
    /// Number of centers or support vectors
    pub n_support_vectors: usize,
    pub solver: SolverKind,
    pub status: SolverStatus,
    pub iterations: usize,
    pub final_change: f64,
    /// Training parameters used
    pub training_params: TrainingParams,
    /// Creation timestamp
    pub created_at: String,
}

/// Training parameters for reference
#[derive(Debug, Serialize, Deserialize)]
pub struct TrainingParams {
    pub c: f64,
    /// Worker threads used for training
    #[serde(default = "default_threads")]
    pub threads: usize,
}

fn default_threads() -> usize {
    1
}

impl SerializableModel {
    /// Create a serializable model from a trained model
    pub fn from_model(model: &Model) -> Self {
        let summary = model.summary();
        Self {
            kernel: model.kernel(),
            centers: model.centers().to_rows(),
            coefficients: model.coefficients().to_vec(),
            bias: model.bias(),
            metadata: ModelMetadata {
                library_version: env!("CARGO_PKG_VERSION").to_string(),
                n_features: model.dim(),
                n_support_vectors: model.n_support_vectors(),
                solver: summary.solver,
                status: summary.status,
                iterations: summary.iterations,
                final_change: summary.final_change,
                training_params: TrainingParams {
                    c: summary.c,
                    threads: summary.threads,
                },
                created_at: chrono::Utc::now().to_rfc3339(),
            },
        }
    }

    /// Rebuild the model, validating shapes and kernel parameters
    pub fn to_model(&self) -> Result<Model> {
        let centers = if self.centers.is_empty() {
            DenseMatrix::zeros(0, self.metadata.n_features)
        } else {
            DenseMatrix::from_rows(&self.centers)?
        };
        if centers.cols() != self.metadata.n_features {
            return Err(SVMError::DimensionMismatch {
                expected: self.metadata.n_features,
                actual: centers.cols(),
            });
        }
        let summary = TrainingSummary {
            solver: self.metadata.solver,
            status: self.metadata.status,
            iterations: self.metadata.iterations,
            final_change: self.metadata.final_change,
            c: self.metadata.training_params.c,
            threads: self.metadata.training_params.threads,
        };
        Model::from_parts(
            self.kernel,
            centers,
            self.coefficients.clone(),
            self.bias,
            summary,
        )
    }

    /// Write JSON to any writer
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, self)
            .map_err(|e| SVMError::SerializationError(e.to_string()))
    }

    /// Read JSON from any reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        serde_json::from_reader(reader).map_err(|e| SVMError::SerializationError(e.to_string()))
    }

    /// Save model to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path).map_err(SVMError::IoError)?;
        self.to_writer(BufWriter::new(file))
    }

    /// Load model from file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path).map_err(SVMError::IoError)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Print model summary
    pub fn print_summary(&self) {
        println!("=== IRWLS SVM Model Summary ===");
        match self.kernel {
            KernelConfig::Linear => println!("Kernel: linear"),
            KernelConfig::Rbf { gamma } => println!("Kernel: rbf (gamma = {gamma})"),
        }
        println!("Solver: {:?}", self.metadata.solver);
        println!("Features: {}", self.metadata.n_features);
        println!("Support Vectors: {}", self.metadata.n_support_vectors);
        println!("Bias: {:.6}", self.bias);
        println!(
            "Status: {:?} after {} iterations (change {:.3e})",
            self.metadata.status, self.metadata.iterations, self.metadata.final_change
        );
        println!("Library Version: {}", self.metadata.library_version);
        println!("Created: {}", self.metadata.created_at);
        println!("Training Parameters:");
        println!("  C: {}", self.metadata.training_params.c);
        println!("  Threads: {}", self.metadata.training_params.threads);
    }
}

/// Save a model as JSON
pub fn save_model<P: AsRef<Path>>(model: &Model, path: P) -> Result<()> {
    SerializableModel::from_model(model).save_to_file(path)
}

/// Load a model saved with [`save_model`]
pub fn load_model<P: AsRef<Path>>(path: P) -> Result<Model> {
    SerializableModel::load_from_file(path)?.to_model()
}
