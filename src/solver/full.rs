//! IRWLS over the full kernel matrix
//!
//! The decision function is expanded over every training point. Each
//! iteration solves
//!
//! ```text
//! (K_AA + D_A⁻¹ + ridge·I) β_A + b·1 = y_A,    1ᵀ β_A = 0
//! ```
//!
//! on the active set A by eliminating the bias: with H the matrix on the
//! left, solve H u = y_A and H v = 1, then b = Σu / Σv and β_A = u - b·v.

use crate::core::{
    Dataset, KernelConfig, Result, SolverKind, TrainingConfig, TrainingSummary,
};
use crate::kernel::{KernelEngine, KernelMatrix};
use crate::linalg::{matvec, CholeskyFactor};
use crate::model::Model;
use crate::parallel::WorkerPool;
use crate::solver::irwls::{run_irwls, Basis, Coefficients, WeightState};
use crate::solver::SolverStrategy;
use faer::Mat;
use log::info;

/// Every training point as a basis function, with the N×N kernel matrix
pub struct FullBasis<'p> {
    kernel: KernelMatrix,
    pool: &'p WorkerPool,
}

impl<'p> FullBasis<'p> {
    pub fn new(kernel: KernelMatrix, pool: &'p WorkerPool) -> Self {
        Self { kernel, pool }
    }
}

impl Basis for FullBasis<'_> {
    fn len(&self) -> usize {
        self.kernel.rows()
    }

    fn solve(&self, labels: &[f64], state: &WeightState, ridge: f64) -> Result<Coefficients> {
        let active = state.active();
        let weights = state.weights();
        let k = &self.kernel;
        let par = self.pool.par();

        let h = Mat::from_fn(active.len(), active.len(), |r, s| {
            let value = k.get(active[r], active[s]);
            if r == s {
                value + 1.0 / weights[active[r]] + ridge
            } else {
                value
            }
        });
        let y_active: Vec<f64> = active.iter().map(|&i| labels[i]).collect();
        let ones = vec![1.0; active.len()];

        let (u, v) = self.pool.install(|| -> Result<_> {
            let factor = CholeskyFactor::factor(h.as_ref())?;
            Ok((factor.solve(&y_active, par)?, factor.solve(&ones, par)?))
        })?;

        // v = H⁻¹1 with H positive definite, so Σv > 0
        let bias = u.iter().sum::<f64>() / v.iter().sum::<f64>();
        let mut coefficients = Coefficients::zeros(self.len());
        for (r, &i) in active.iter().enumerate() {
            coefficients.weights[i] = u[r] - bias * v[r];
        }
        coefficients.bias = bias;
        Ok(coefficients)
    }

    fn decision_values(&self, coefficients: &Coefficients) -> Result<Vec<f64>> {
        let mut f = matvec(self.pool, &self.kernel, &coefficients.weights)?;
        for value in &mut f {
            *value += coefficients.bias;
        }
        Ok(f)
    }
}

/// Trains over all N points; the model keeps points with non-zero coefficient
#[derive(Debug, Clone, Copy, Default)]
pub struct FullSolver;

impl SolverStrategy for FullSolver {
    fn kind(&self) -> SolverKind {
        SolverKind::Full
    }

    fn run(&self, dataset: &Dataset, kernel: KernelConfig, config: &TrainingConfig) -> Result<Model> {
        kernel.validate()?;
        config.validate()?;

        let pool = WorkerPool::new(config.threads)?;
        let engine = KernelEngine::new(kernel, &pool)?;
        let features = dataset.features();
        info!(
            "Full IRWLS: {} samples, {} features, {} kernel, C = {}",
            dataset.len(),
            dataset.dim(),
            kernel.name(),
            config.c
        );

        let norms = engine.squared_norms(features);
        let k = engine.matrix_with_norms(features, &norms, features, &norms)?;
        let basis = FullBasis::new(k, &pool);
        let outcome = run_irwls(&basis, dataset.labels(), config, &pool)?;

        let support: Vec<usize> = outcome
            .coefficients
            .weights
            .iter()
            .enumerate()
            .filter(|(_, &w)| w != 0.0)
            .map(|(i, _)| i)
            .collect();
        let coefficients = support
            .iter()
            .map(|&i| outcome.coefficients.weights[i])
            .collect();
        info!("{} support vectors retained", support.len());

        let summary = TrainingSummary {
            solver: SolverKind::Full,
            status: outcome.status,
            iterations: outcome.iterations,
            final_change: outcome.final_change,
            c: config.c,
            threads: config.threads,
        };
        Model::from_parts(
            kernel,
            features.select_rows(&support),
            coefficients,
            outcome.coefficients.bias,
            summary,
        )
        .map(|model| model.with_source_indices(support))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Classifier, DenseMatrix, SVMError, SolverStatus};
    use approx::assert_relative_eq;

    fn separable() -> Dataset {
        let features = DenseMatrix::from_rows(&[
            vec![2.0, 2.0],
            vec![3.0, 1.5],
            vec![2.5, 3.0],
            vec![-2.0, -1.0],
            vec![-3.0, -2.5],
            vec![-1.5, -3.0],
        ])
        .unwrap();
        Dataset::new(features, vec![1.0, 1.0, 1.0, -1.0, -1.0, -1.0]).unwrap()
    }

    #[test]
    fn test_bias_elimination_satisfies_system() {
        let pool = WorkerPool::new(1).unwrap();
        let data = separable();
        let engine = KernelEngine::new(KernelConfig::linear(), &pool).unwrap();
        let k = engine.matrix(data.features(), data.features()).unwrap();
        let basis = FullBasis::new(k.clone(), &pool);

        let residuals = vec![1.0; data.len()];
        let state = WeightState::from_residuals(&pool, &residuals, 2.0);
        let ridge = 1e-6;
        let c = basis.solve(data.labels(), &state, ridge).unwrap();

        // Σβ = 0
        assert_relative_eq!(c.weights.iter().sum::<f64>(), 0.0, epsilon = 1e-10);
        // Each row of the bordered system holds
        for i in 0..data.len() {
            let kb: f64 = (0..data.len()).map(|j| k.get(i, j) * c.weights[j]).sum();
            let lhs = kb + c.weights[i] * (1.0 / state.weights()[i] + ridge) + c.bias;
            assert_relative_eq!(lhs, data.labels()[i], epsilon = 1e-9);
        }
    }

    #[test]
    fn test_inactive_points_get_zero_coefficient() {
        let pool = WorkerPool::new(1).unwrap();
        let data = separable();
        let engine = KernelEngine::new(KernelConfig::rbf(0.5), &pool).unwrap();
        let k = engine.matrix(data.features(), data.features()).unwrap();
        let basis = FullBasis::new(k, &pool);

        let residuals = [1.0, -1.0, 0.5, 0.2, -0.3, 1.0];
        let state = WeightState::from_residuals(&pool, &residuals, 1.0);
        let c = basis.solve(data.labels(), &state, 1e-6).unwrap();
        assert_eq!(c.weights[1], 0.0);
        assert_eq!(c.weights[4], 0.0);
        assert!(c.weights[0] != 0.0);
    }

    #[test]
    fn test_full_solver_separates_training_data() {
        let data = separable();
        let model = FullSolver
            .run(&data, KernelConfig::linear(), &TrainingConfig::default())
            .unwrap();

        assert_eq!(model.summary().solver, SolverKind::Full);
        assert!(model.summary().iterations <= 500);
        assert!(model.n_support_vectors() > 0);
        assert!(model.n_support_vectors() <= data.len());
        for (x, &y) in data.features().iter_rows().zip(data.labels()) {
            assert_eq!(model.predict_one(x).unwrap().label, y);
        }
    }

    #[test]
    fn test_full_solver_iteration_bound() {
        let data = separable();
        let config = TrainingConfig {
            max_iterations: 1,
            ..TrainingConfig::default()
        };
        let model = FullSolver
            .run(&data, KernelConfig::rbf(1.0), &config)
            .unwrap();
        assert_eq!(model.summary().iterations, 1);
        assert_eq!(model.summary().status, SolverStatus::MaxIterationsReached);
    }

    #[test]
    fn test_full_solver_rejects_bad_gamma() {
        let data = separable();
        assert!(matches!(
            FullSolver.run(&data, KernelConfig::rbf(0.0), &TrainingConfig::default()),
            Err(SVMError::InvalidParameter(_))
        ));
    }
}
