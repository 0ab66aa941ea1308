//! Parallel kernel-matrix evaluation
//!
//! Output rows are split into contiguous blocks, one per worker. Workers only
//! read the point sets and write their own block, so no locking is needed.

use crate::core::{DenseMatrix, KernelConfig, Result, SVMError};
use crate::kernel::Kernel;
use crate::parallel::WorkerPool;

/// Dense matrix of kernel evaluations
pub type KernelMatrix = DenseMatrix;

/// Evaluates kernel values between point sets on a worker pool
pub struct KernelEngine<'p> {
    config: KernelConfig,
    pool: &'p WorkerPool,
}

impl<'p> KernelEngine<'p> {
    /// Create an engine, rejecting invalid kernel parameters
    pub fn new(config: KernelConfig, pool: &'p WorkerPool) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, pool })
    }

    pub fn config(&self) -> KernelConfig {
        self.config
    }

    pub fn pool(&self) -> &'p WorkerPool {
        self.pool
    }

    /// Squared L2 norm of every row
    pub fn squared_norms(&self, points: &DenseMatrix) -> Vec<f64> {
        self.pool.map_indices(points.rows(), |i| {
            points.row(i).iter().map(|v| v * v).sum()
        })
    }

    /// K[i][j] = kernel(a[i], b[j])
    pub fn matrix(&self, a: &DenseMatrix, b: &DenseMatrix) -> Result<KernelMatrix> {
        check_columns(a, b)?;
        let a_norms = self.squared_norms(a);
        let b_norms = self.squared_norms(b);
        self.matrix_with_norms(a, &a_norms, b, &b_norms)
    }

    /// Same as [`matrix`](Self::matrix) with squared norms supplied by the caller
    pub fn matrix_with_norms(
        &self,
        a: &DenseMatrix,
        a_norms: &[f64],
        b: &DenseMatrix,
        b_norms: &[f64],
    ) -> Result<KernelMatrix> {
        check_columns(a, b)?;
        check_norms(a, a_norms)?;
        check_norms(b, b_norms)?;

        let q = b.rows();
        let kernel = self.config;
        let mut out = DenseMatrix::zeros(a.rows(), q);
        self.pool
            .for_each_row_block(out.as_mut_slice(), q, |rows, block| {
                for (local, i) in rows.enumerate() {
                    let x = a.row(i);
                    let dst = &mut block[local * q..(local + 1) * q];
                    for (j, value) in dst.iter_mut().enumerate() {
                        *value = kernel.compute_with_norms(x, b.row(j), a_norms[i], b_norms[j]);
                    }
                }
            });
        Ok(out)
    }

    /// kernel(points[i], x) for every row of `points`
    pub fn column(
        &self,
        points: &DenseMatrix,
        norms: &[f64],
        x: &[f64],
        x_norm: f64,
    ) -> Result<Vec<f64>> {
        if x.len() != points.cols() {
            return Err(SVMError::DimensionMismatch {
                expected: points.cols(),
                actual: x.len(),
            });
        }
        check_norms(points, norms)?;
        let kernel = self.config;
        Ok(self.pool.map_indices(points.rows(), |i| {
            kernel.compute_with_norms(points.row(i), x, norms[i], x_norm)
        }))
    }
}

fn check_columns(a: &DenseMatrix, b: &DenseMatrix) -> Result<()> {
    if a.cols() != b.cols() {
        return Err(SVMError::DimensionMismatch {
            expected: a.cols(),
            actual: b.cols(),
        });
    }
    Ok(())
}

fn check_norms(points: &DenseMatrix, norms: &[f64]) -> Result<()> {
    if norms.len() != points.rows() {
        return Err(SVMError::DimensionMismatch {
            expected: points.rows(),
            actual: norms.len(),
        });
    }
    Ok(())
}
