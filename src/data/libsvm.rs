//! LibSVM format reader
//!
//! Supports loading datasets in the libsvm format:
//! label index:value index:value ...
//!
//! Example:
//! +1 1:0.5 3:1.2 7:0.8
//! -1 2:0.3 5:2.1
//!
//! Query files may omit the label column. Rows are densified on request, so a
//! file can be read against the dimensionality of an existing model.

use crate::core::{Dataset, DenseMatrix, Result, SVMError};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Parsed LibSVM file: sparse rows, optional labels
#[derive(Debug, Clone)]
pub struct LibSVMDataset {
    rows: Vec<Vec<(usize, f64)>>,
    labels: Option<Vec<f64>>,
    dimensions: usize,
}

impl LibSVMDataset {
    /// Load a dataset from a LibSVM format file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path).map_err(SVMError::IoError)?;
        let reader = BufReader::new(file);
        Self::from_reader(reader)
    }

    /// Load a dataset from a reader (for testing and flexibility)
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        let mut labeled: Option<bool> = None;
        let mut max_dimension = 0;

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(SVMError::IoError)?;
            let line = line.trim();

            // Skip empty lines and comments
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (label, features, max_idx) = Self::parse_line(line).map_err(|e| {
                SVMError::ParseError(format!("Error parsing line {}: {}", line_num + 1, e))
            })?;

            match (labeled, label) {
                (None, _) => labeled = Some(label.is_some()),
                (Some(true), None) | (Some(false), Some(_)) => {
                    return Err(SVMError::ParseError(format!(
                        "Error parsing line {}: mixed labeled and unlabeled lines",
                        line_num + 1
                    )));
                }
                _ => {}
            }
            if let Some(label) = label {
                labels.push(label);
            }
            if let Some(max_idx) = max_idx {
                max_dimension = max_dimension.max(max_idx + 1);
            }
            rows.push(features);
        }

        if rows.is_empty() {
            return Err(SVMError::EmptyDataset);
        }

        Ok(LibSVMDataset {
            rows,
            labels: labeled.unwrap_or(false).then_some(labels),
            dimensions: max_dimension,
        })
    }

    /// Parse a single line into (label, 0-based features, largest index)
    fn parse_line(line: &str) -> Result<(Option<f64>, Vec<(usize, f64)>, Option<usize>)> {
        let parts: Vec<&str> = line.split_whitespace().collect();

        if parts.is_empty() {
            return Err(SVMError::ParseError("Empty line".to_string()));
        }

        let (label, feature_parts) = if parts[0].contains(':') {
            (None, &parts[..])
        } else {
            let label = parts[0]
                .parse::<f64>()
                .map_err(|_| SVMError::ParseError(format!("Invalid label: {}", parts[0])))?;
            // Any positive label is the positive class
            let label = if label > 0.0 { 1.0 } else { -1.0 };
            (Some(label), &parts[1..])
        };

        let mut features = Vec::with_capacity(feature_parts.len());
        let mut max_index = None;

        for feature_str in feature_parts {
            let (index, value) = feature_str.split_once(':').ok_or_else(|| {
                SVMError::ParseError(format!("Invalid feature format: {feature_str}"))
            })?;

            let index = index
                .parse::<usize>()
                .map_err(|_| SVMError::ParseError(format!("Invalid feature index: {index}")))?;

            let value = value
                .parse::<f64>()
                .map_err(|_| SVMError::ParseError(format!("Invalid feature value: {value}")))?;

            // libsvm uses 1-based indexing, convert to 0-based
            if index == 0 {
                return Err(SVMError::ParseError(format!(
                    "Feature index must be positive: {index}"
                )));
            }
            let zero_based_index = index - 1;

            features.push((zero_based_index, value));
            max_index = Some(max_index.map_or(zero_based_index, |m: usize| m.max(zero_based_index)));
        }

        Ok((label, features, max_index))
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Always false: parsing rejects empty files
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// One past the largest feature index seen
    pub fn dim(&self) -> usize {
        self.dimensions
    }

    /// Labels mapped to {-1, +1}, if the file has them
    pub fn labels(&self) -> Option<&[f64]> {
        self.labels.as_deref()
    }

    /// Dense `len() × dim` feature matrix
    ///
    /// `dim` defaults to [`dim()`](Self::dim); a larger value pads with zeros,
    /// a smaller one fails with `DimensionMismatch`.
    pub fn to_features(&self, dim: Option<usize>) -> Result<DenseMatrix> {
        let dim = dim.unwrap_or(self.dimensions);
        if dim < self.dimensions {
            return Err(SVMError::DimensionMismatch {
                expected: dim,
                actual: self.dimensions,
            });
        }
        let mut data = vec![0.0; self.rows.len() * dim];
        for (i, row) in self.rows.iter().enumerate() {
            for &(j, value) in row {
                data[i * dim + j] = value;
            }
        }
        DenseMatrix::new(self.rows.len(), dim, data)
    }

    /// Labeled dense dataset
    pub fn to_dataset(&self, dim: Option<usize>) -> Result<Dataset> {
        let labels = self.labels.as_ref().ok_or_else(|| {
            SVMError::InvalidDataset("Training data requires a label on every line".to_string())
        })?;
        Dataset::new(self.to_features(dim)?, labels.clone())
    }
}
