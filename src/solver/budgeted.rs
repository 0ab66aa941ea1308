//! IRWLS over a reduced set of M centers
//!
//! The decision function is f(x) = Σ_j β_j k(x, c_j) + b. With Φ = [K_nc | 1]
//! each iteration solves the (M+1)-dimensional primal system
//!
//! ```text
//! (Φ_Aᵀ D_A Φ_A + blockdiag(K_cc, 0) + ridge·I) θ = Φ_Aᵀ D_A y_A
//! ```
//!
//! for θ = [β; b], assembled from the active rows scaled by sqrt(a_i).

use crate::core::{
    Dataset, DenseMatrix, KernelConfig, Result, SVMError, SolverKind, TrainingConfig,
    TrainingSummary,
};
use crate::kernel::{KernelEngine, KernelMatrix};
use crate::linalg::{gram, matvec, transpose_matvec, CholeskyFactor};
use crate::model::Model;
use crate::parallel::WorkerPool;
use crate::solver::centers::{select_centers, SelectedCenters};
use crate::solver::irwls::{run_irwls, Basis, Coefficients, WeightState};
use crate::solver::SolverStrategy;
use faer::Mat;
use log::info;

/// M centers as basis functions
pub struct BudgetedBasis<'p> {
    /// N×M kernel values between samples and centers
    k_nc: KernelMatrix,
    /// M×M kernel values among centers
    k_cc: KernelMatrix,
    pool: &'p WorkerPool,
}

impl<'p> BudgetedBasis<'p> {
    pub fn new(k_nc: KernelMatrix, k_cc: KernelMatrix, pool: &'p WorkerPool) -> Result<Self> {
        if k_cc.rows() != k_nc.cols() || k_cc.cols() != k_nc.cols() {
            return Err(SVMError::DimensionMismatch {
                expected: k_nc.cols(),
                actual: k_cc.rows(),
            });
        }
        Ok(Self { k_nc, k_cc, pool })
    }

    /// Build both kernel blocks from centers picked among `features`
    pub fn from_centers(
        engine: &KernelEngine<'p>,
        features: &DenseMatrix,
        norms: &[f64],
        centers: &SelectedCenters,
    ) -> Result<Self> {
        let m = centers.indices.len();
        let (k_nc, k_cc) = match &centers.columns {
            Some(columns) => {
                let n = features.rows();
                let data: Vec<f64> = (0..n)
                    .flat_map(|i| columns.iter().map(move |column| column[i]))
                    .collect();
                let k_nc = DenseMatrix::new(n, m, data)?;
                let k_cc = k_nc.select_rows(&centers.indices);
                (k_nc, k_cc)
            }
            None => {
                let c = features.select_rows(&centers.indices);
                let c_norms: Vec<f64> = centers.indices.iter().map(|&i| norms[i]).collect();
                let k_nc = engine.matrix_with_norms(features, norms, &c, &c_norms)?;
                let k_cc = k_nc.select_rows(&centers.indices);
                (k_nc, k_cc)
            }
        };
        Self::new(k_nc, k_cc, engine.pool())
    }
}

impl Basis for BudgetedBasis<'_> {
    fn len(&self) -> usize {
        self.k_nc.cols()
    }

    fn solve(&self, labels: &[f64], state: &WeightState, ridge: f64) -> Result<Coefficients> {
        let m = self.len();
        let active = state.active();
        let weights = state.weights();
        let k_nc = &self.k_nc;
        let par = self.pool.par();

        let scale: Vec<f64> = active.iter().map(|&i| weights[i].sqrt()).collect();
        let phi = Mat::from_fn(active.len(), m + 1, |r, j| {
            if j < m {
                scale[r] * k_nc.get(active[r], j)
            } else {
                scale[r]
            }
        });
        let target: Vec<f64> = active
            .iter()
            .zip(&scale)
            .map(|(&i, s)| s * labels[i])
            .collect();

        let theta = self.pool.install(|| -> Result<Vec<f64>> {
            let mut h = gram(phi.as_ref(), par);
            for r in 0..m {
                for s in 0..m {
                    h[(r, s)] += self.k_cc.get(r, s);
                }
            }
            for d in 0..=m {
                h[(d, d)] += ridge;
            }
            let rhs = transpose_matvec(phi.as_ref(), &target, par)?;
            CholeskyFactor::factor(h.as_ref())?.solve(&rhs, par)
        })?;

        Ok(Coefficients {
            weights: theta[..m].to_vec(),
            bias: theta[m],
        })
    }

    fn decision_values(&self, coefficients: &Coefficients) -> Result<Vec<f64>> {
        let mut f = matvec(self.pool, &self.k_nc, &coefficients.weights)?;
        for value in &mut f {
            *value += coefficients.bias;
        }
        Ok(f)
    }
}

/// Trains over M ≪ N centers; the model keeps all M centers
#[derive(Debug, Clone, Copy, Default)]
pub struct BudgetedSolver;

impl SolverStrategy for BudgetedSolver {
    fn kind(&self) -> SolverKind {
        SolverKind::Budgeted
    }

    fn run(&self, dataset: &Dataset, kernel: KernelConfig, config: &TrainingConfig) -> Result<Model> {
        kernel.validate()?;
        config.validate()?;
        let budget = config.budget.as_ref().ok_or_else(|| {
            SVMError::InvalidParameter("Budgeted training requires a budget".to_string())
        })?;
        if budget.size > dataset.len() {
            return Err(SVMError::InvalidParameter(format!(
                "Budget size {} exceeds the number of samples {}",
                budget.size,
                dataset.len()
            )));
        }

        let pool = WorkerPool::new(config.threads)?;
        let engine = KernelEngine::new(kernel, &pool)?;
        let features = dataset.features();
        info!(
            "Budgeted IRWLS: {} samples, {} features, {} kernel, {} centers ({:?}), C = {}",
            dataset.len(),
            dataset.dim(),
            kernel.name(),
            budget.size,
            budget.selection,
            config.c
        );

        let norms = engine.squared_norms(features);
        let centers = select_centers(&engine, features, &norms, budget)?;
        let basis = BudgetedBasis::from_centers(&engine, features, &norms, &centers)?;
        let outcome = run_irwls(&basis, dataset.labels(), config, &pool)?;

        let summary = TrainingSummary {
            solver: SolverKind::Budgeted,
            status: outcome.status,
            iterations: outcome.iterations,
            final_change: outcome.final_change,
            c: config.c,
            threads: config.threads,
        };
        Model::from_parts(
            kernel,
            features.select_rows(&centers.indices),
            outcome.coefficients.weights,
            outcome.coefficients.bias,
            summary,
        )
        .map(|model| model.with_source_indices(centers.indices))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BudgetConfig, CenterSelection, Classifier, SolverStatus};
    use approx::assert_relative_eq;

    fn xor_like() -> Dataset {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..40 {
            let t = i as f64 * 0.15;
            let (x, y) = (t.cos() * 2.0, t.sin() * 2.0);
            rows.push(vec![x, y]);
            labels.push(if x * y >= 0.0 { 1.0 } else { -1.0 });
        }
        Dataset::new(DenseMatrix::from_rows(&rows).unwrap(), labels).unwrap()
    }

    fn budgeted(size: usize, selection: CenterSelection) -> TrainingConfig {
        TrainingConfig {
            c: 10.0,
            budget: Some(BudgetConfig::new(size, selection)),
            ..TrainingConfig::default()
        }
    }

    #[test]
    fn test_solve_matches_normal_equations() {
        let pool = WorkerPool::new(1).unwrap();
        let data = xor_like();
        let engine = KernelEngine::new(KernelConfig::rbf(1.0), &pool).unwrap();
        let norms = engine.squared_norms(data.features());
        let centers = SelectedCenters {
            indices: vec![0, 10, 20, 30],
            columns: None,
        };
        let basis = BudgetedBasis::from_centers(&engine, data.features(), &norms, &centers).unwrap();

        let residuals: Vec<f64> = (0..data.len()).map(|i| 0.5 + (i % 3) as f64).collect();
        let state = WeightState::from_residuals(&pool, &residuals, 1.0);
        let ridge = 1e-6;
        let c = basis.solve(data.labels(), &state, ridge).unwrap();

        // Gradient of ½βᵀK_ccβ + ½Σ a_i (f_i - y_i)² + ½ridge||θ||² vanishes
        let f = basis.decision_values(&c).unwrap();
        let a = state.weights();
        for j in 0..4 {
            let kcc_beta: f64 = (0..4).map(|k| basis.k_cc.get(j, k) * c.weights[k]).sum();
            let fit: f64 = (0..data.len())
                .map(|i| a[i] * (f[i] - data.labels()[i]) * basis.k_nc.get(i, j))
                .sum();
            assert_relative_eq!(kcc_beta + fit + ridge * c.weights[j], 0.0, epsilon = 1e-8);
        }
        let bias_grad: f64 = (0..data.len())
            .map(|i| a[i] * (f[i] - data.labels()[i]))
            .sum::<f64>()
            + ridge * c.bias;
        assert_relative_eq!(bias_grad, 0.0, epsilon = 1e-8);
    }

    #[test]
    fn test_precomputed_columns_match_engine() {
        let pool = WorkerPool::new(2).unwrap();
        let data = xor_like();
        let engine = KernelEngine::new(KernelConfig::rbf(0.7), &pool).unwrap();
        let norms = engine.squared_norms(data.features());
        let budget = BudgetConfig {
            candidates: 5,
            ..BudgetConfig::new(5, CenterSelection::Incremental)
        };
        let selected = select_centers(&engine, data.features(), &norms, &budget).unwrap();
        let from_columns =
            BudgetedBasis::from_centers(&engine, data.features(), &norms, &selected).unwrap();
        let recomputed = BudgetedBasis::from_centers(
            &engine,
            data.features(),
            &norms,
            &SelectedCenters {
                indices: selected.indices.clone(),
                columns: None,
            },
        )
        .unwrap();

        for i in 0..data.len() {
            for j in 0..5 {
                assert_relative_eq!(
                    from_columns.k_nc.get(i, j),
                    recomputed.k_nc.get(i, j),
                    epsilon = 1e-12
                );
            }
        }
        assert_eq!(from_columns.k_cc, from_columns.k_nc.select_rows(&selected.indices));
    }

    #[test]
    fn test_budgeted_solver_fits_training_data() {
        let data = xor_like();
        for selection in [CenterSelection::Random, CenterSelection::Incremental] {
            let model = BudgetedSolver
                .run(&data, KernelConfig::rbf(1.0), &budgeted(12, selection))
                .unwrap();
            assert_eq!(model.n_support_vectors(), 12);
            assert_eq!(model.summary().solver, SolverKind::Budgeted);

            let correct = data
                .features()
                .iter_rows()
                .zip(data.labels())
                .filter(|(x, &y)| model.predict_one(x).unwrap().label == y)
                .count();
            assert!(correct as f64 / data.len() as f64 >= 0.85, "{selection:?}: {correct}");
        }
    }

    #[test]
    fn test_budget_required() {
        let data = xor_like();
        assert!(matches!(
            BudgetedSolver.run(&data, KernelConfig::rbf(1.0), &TrainingConfig::default()),
            Err(SVMError::InvalidParameter(_))
        ));
        assert!(matches!(
            BudgetedSolver.run(
                &data,
                KernelConfig::rbf(1.0),
                &budgeted(41, CenterSelection::Random)
            ),
            Err(SVMError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_single_center() {
        let data = xor_like();
        let config = TrainingConfig {
            max_iterations: 20,
            ..budgeted(1, CenterSelection::Random)
        };
        let model = BudgetedSolver
            .run(&data, KernelConfig::linear(), &config)
            .unwrap();
        assert_eq!(model.n_support_vectors(), 1);
        assert!(model.summary().iterations <= 20);
        assert!(matches!(
            model.summary().status,
            SolverStatus::Converged | SolverStatus::MaxIterationsReached
        ));
    }
}
