//! Dense linear algebra on top of faer
//!
//! Factorizations, triangular solves and products are delegated to faer; this
//! module only adapts them to [`DenseMatrix`] and the crate error type.

use crate::core::{DenseMatrix, Result, SVMError};
use crate::kernel::dot;
use crate::parallel::WorkerPool;
use faer::linalg::matmul::matmul;
use faer::linalg::solvers::Llt;
use faer::linalg::triangular_solve::{
    solve_lower_triangular_in_place, solve_upper_triangular_in_place,
};
use faer::{Accum, Mat, MatRef, Par, Side};

/// Lower-triangular Cholesky factor L with A = L Lᵀ
#[derive(Clone, Debug)]
pub struct CholeskyFactor {
    lower: Mat<f64>,
}

impl CholeskyFactor {
    /// Factor a symmetric positive definite matrix
    ///
    /// Only the lower triangle of `a` is read.
    pub fn factor(a: MatRef<'_, f64>) -> Result<Self> {
        let n = a.nrows();
        if a.ncols() != n {
            return Err(SVMError::DimensionMismatch {
                expected: n,
                actual: a.ncols(),
            });
        }
        let llt = Llt::new(a, Side::Lower)
            .map_err(|_| SVMError::NotPositiveDefinite { dimension: n })?;
        Ok(Self {
            lower: llt.L().to_owned(),
        })
    }

    /// Factor of the empty matrix, the starting point for [`extend`](Self::extend)
    pub fn empty() -> Self {
        Self {
            lower: Mat::zeros(0, 0),
        }
    }

    pub fn dim(&self) -> usize {
        self.lower.nrows()
    }

    pub fn lower(&self) -> MatRef<'_, f64> {
        self.lower.as_ref()
    }

    /// Solve L x = b
    pub fn forward_substitution(&self, b: &[f64], par: Par) -> Result<Vec<f64>> {
        let mut rhs = self.column(b)?;
        solve_lower_triangular_in_place(self.lower.as_ref(), rhs.as_mut(), par);
        Ok(column_to_vec(&rhs))
    }

    /// Solve Lᵀ x = b
    pub fn backward_substitution(&self, b: &[f64], par: Par) -> Result<Vec<f64>> {
        let mut rhs = self.column(b)?;
        solve_upper_triangular_in_place(self.lower.transpose(), rhs.as_mut(), par);
        Ok(column_to_vec(&rhs))
    }

    /// Solve A x = b with A = L Lᵀ
    pub fn solve(&self, b: &[f64], par: Par) -> Result<Vec<f64>> {
        let mut rhs = self.column(b)?;
        solve_lower_triangular_in_place(self.lower.as_ref(), rhs.as_mut(), par);
        solve_upper_triangular_in_place(self.lower.transpose(), rhs.as_mut(), par);
        Ok(column_to_vec(&rhs))
    }

    /// Grow the factor by one row and column
    ///
    /// `column` holds the new off-diagonal entries A[n][0..n] and `diagonal`
    /// is A[n][n]. Fails if the bordered matrix is not positive definite.
    pub fn extend(&mut self, column: &[f64], diagonal: f64) -> Result<()> {
        let n = self.dim();
        let w = if n == 0 {
            if !column.is_empty() {
                return Err(SVMError::DimensionMismatch {
                    expected: 0,
                    actual: column.len(),
                });
            }
            Vec::new()
        } else {
            self.forward_substitution(column, Par::Seq)?
        };
        let pivot = diagonal - w.iter().map(|v| v * v).sum::<f64>();
        if !(pivot > 0.0) || !pivot.is_finite() {
            return Err(SVMError::NotPositiveDefinite { dimension: n + 1 });
        }
        let corner = pivot.sqrt();
        let old = &self.lower;
        let grown = Mat::from_fn(n + 1, n + 1, |i, j| {
            if i < n && j < n {
                old[(i, j)]
            } else if i == n && j < n {
                w[j]
            } else if i == n && j == n {
                corner
            } else {
                0.0
            }
        });
        self.lower = grown;
        Ok(())
    }

    fn column(&self, b: &[f64]) -> Result<Mat<f64>> {
        if b.len() != self.dim() {
            return Err(SVMError::DimensionMismatch {
                expected: self.dim(),
                actual: b.len(),
            });
        }
        Ok(Mat::from_fn(b.len(), 1, |i, _| b[i]))
    }
}

fn column_to_vec(m: &Mat<f64>) -> Vec<f64> {
    (0..m.nrows()).map(|i| m[(i, 0)]).collect()
}

/// y = A x, one contiguous row block per worker
pub fn matvec(pool: &WorkerPool, a: &DenseMatrix, x: &[f64]) -> Result<Vec<f64>> {
    if x.len() != a.cols() {
        return Err(SVMError::DimensionMismatch {
            expected: a.cols(),
            actual: x.len(),
        });
    }
    Ok(pool.map_indices(a.rows(), |i| dot(a.row(i), x)))
}

/// C = A B
pub fn matmul_dense(a: MatRef<'_, f64>, b: MatRef<'_, f64>, par: Par) -> Result<Mat<f64>> {
    if a.ncols() != b.nrows() {
        return Err(SVMError::DimensionMismatch {
            expected: a.ncols(),
            actual: b.nrows(),
        });
    }
    let mut out = Mat::zeros(a.nrows(), b.ncols());
    matmul(out.as_mut(), Accum::Replace, a, b, 1.0, par);
    Ok(out)
}

/// Gram product AᵀA
pub fn gram(a: MatRef<'_, f64>, par: Par) -> Mat<f64> {
    let mut out = Mat::zeros(a.ncols(), a.ncols());
    matmul(out.as_mut(), Accum::Replace, a.transpose(), a, 1.0, par);
    out
}

/// Aᵀ x
pub fn transpose_matvec(a: MatRef<'_, f64>, x: &[f64], par: Par) -> Result<Vec<f64>> {
    if x.len() != a.nrows() {
        return Err(SVMError::DimensionMismatch {
            expected: a.nrows(),
            actual: x.len(),
        });
    }
    let rhs = Mat::from_fn(x.len(), 1, |i, _| x[i]);
    let out = matmul_dense(a.transpose(), rhs.as_ref(), par)?;
    Ok(column_to_vec(&out))
}
