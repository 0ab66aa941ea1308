//! Integration tests for the irwls-svm library
//!
//! These tests verify end-to-end functionality across multiple modules
//! and validate real-world usage scenarios.

use irwls_svm::api::{self, SVM};
use irwls_svm::persistence::{load_model, save_model};
use irwls_svm::{
    CenterSelection, Classifier, Dataset, DenseMatrix, KernelConfig, LibSVMDataset,
    PredictionEngine, SVMError, SolverKind, SolverStatus, TrainingConfig,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use std::io::Write;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tempfile::NamedTempFile;

/// Two round clusters around (2, 2) and (-2, -2), alternating labels
fn gaussian_clusters(n: usize, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 0.5).unwrap();
    let mut rows = Vec::with_capacity(n);
    let mut labels = Vec::with_capacity(n);
    for i in 0..n {
        let label = if i % 2 == 0 { 1.0 } else { -1.0 };
        let center = 2.0 * label;
        rows.push(vec![
            center + noise.sample(&mut rng),
            center + noise.sample(&mut rng),
        ]);
        labels.push(label);
    }
    Dataset::new(DenseMatrix::from_rows(&rows).unwrap(), labels).unwrap()
}

/// Label is the sign of x1 * x2, with noise pushing points off the axes
fn quadrants(n: usize, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 0.3).unwrap();
    let corners = [(1.0, 1.0), (-1.0, -1.0), (1.0, -1.0), (-1.0, 1.0)];
    let mut rows = Vec::with_capacity(n);
    let mut labels = Vec::with_capacity(n);
    for i in 0..n {
        let (cx, cy) = corners[i % 4];
        rows.push(vec![
            cx + noise.sample(&mut rng),
            cy + noise.sample(&mut rng),
        ]);
        labels.push(if cx * cy > 0.0 { 1.0 } else { -1.0 });
    }
    Dataset::new(DenseMatrix::from_rows(&rows).unwrap(), labels).unwrap()
}

fn label_agreement(a: &[f64], b: &[f64]) -> f64 {
    let same = a.iter().zip(b).filter(|(x, y)| x == y).count();
    same as f64 / a.len() as f64
}

fn labels_of(model: &irwls_svm::Model, queries: &DenseMatrix, threads: usize) -> Vec<f64> {
    PredictionEngine::new(model, threads)
        .unwrap()
        .predict(queries)
        .unwrap()
        .iter()
        .map(|p| p.label)
        .collect()
}

/// Test complete workflow: clusters -> linear full training -> held-out evaluation
#[test]
fn test_linear_full_on_separated_clusters() {
    let train = gaussian_clusters(100, 7);
    let test = gaussian_clusters(100, 8);

    let model = SVM::new()
        .with_kernel(KernelConfig::linear())
        .with_c(1.0)
        .train(&train)
        .expect("Training should succeed");

    assert_eq!(model.summary().solver, SolverKind::Full);
    assert!(model.n_support_vectors() > 0, "Should have support vectors");
    assert!(model.n_support_vectors() <= train.len());

    let train_metrics = api::evaluate(&model, &train, 1).unwrap();
    assert_eq!(train_metrics.accuracy(), 1.0);

    let test_metrics = api::evaluate(&model, &test, 1).unwrap();
    assert!(
        test_metrics.accuracy() >= 0.95,
        "Held-out accuracy too low: {}",
        test_metrics.accuracy()
    );
    assert!(test_metrics.f1_score() >= 0.95);
}

#[test]
fn test_rbf_full_on_quadrants() {
    let train = quadrants(120, 3);
    let test = quadrants(80, 4);

    let model = SVM::new()
        .with_kernel(KernelConfig::rbf(1.0))
        .with_c(10.0)
        .train(&train)
        .unwrap();

    let accuracy = api::evaluate(&model, &test, 2).unwrap().accuracy();
    assert!(accuracy >= 0.9, "Held-out accuracy too low: {accuracy}");
}

#[test]
fn test_budgeted_incremental_on_quadrants() {
    let train = quadrants(200, 5);
    let test = quadrants(80, 6);

    let model = SVM::new()
        .with_kernel(KernelConfig::rbf(1.0))
        .with_c(10.0)
        .with_budget(20, CenterSelection::Incremental)
        .with_seed(11)
        .train(&train)
        .unwrap();

    assert_eq!(model.summary().solver, SolverKind::Budgeted);
    assert!(model.n_support_vectors() <= 20);

    let accuracy = api::evaluate(&model, &test, 1).unwrap().accuracy();
    assert!(accuracy >= 0.9, "Held-out accuracy too low: {accuracy}");
}

#[test]
fn test_training_is_deterministic() {
    let train = quadrants(80, 9);
    let svm = SVM::new()
        .with_kernel(KernelConfig::rbf(0.8))
        .with_c(5.0)
        .with_budget(15, CenterSelection::Incremental)
        .with_seed(42);

    let first = svm.train(&train).unwrap();
    let second = svm.train(&train).unwrap();

    assert_eq!(first.centers(), second.centers());
    assert_eq!(first.coefficients(), second.coefficients());
    assert_eq!(first.bias(), second.bias());
    assert_eq!(first.summary(), second.summary());

    let config = TrainingConfig {
        c: 5.0,
        ..TrainingConfig::default()
    };
    let kernel = KernelConfig::rbf(0.8);
    let a = api::train_full(train.features(), train.labels(), kernel, &config).unwrap();
    let b = api::train_full(train.features(), train.labels(), kernel, &config).unwrap();
    for (x, y) in a.coefficients().iter().zip(b.coefficients()) {
        assert!((x - y).abs() <= 1e-6 * x.abs().max(1.0));
    }
    assert_eq!(a.source_indices(), b.source_indices());
}

#[test]
fn test_thread_count_does_not_change_predictions() {
    let train = quadrants(120, 13);
    let test = quadrants(100, 14);
    let svm = SVM::new().with_kernel(KernelConfig::rbf(1.0)).with_c(4.0);

    let single = svm.clone().with_threads(1).train(&train).unwrap();
    let multi = svm.with_threads(4).train(&train).unwrap();

    let a = labels_of(&single, test.features(), 1);
    let b = labels_of(&multi, test.features(), 4);
    assert!(label_agreement(&a, &b) >= 0.99);

    // Same model, different prediction pools
    let c = labels_of(&single, test.features(), 4);
    assert_eq!(a, c);
}

#[test]
fn test_budget_of_every_point_matches_full() {
    let train = quadrants(80, 71);
    let test = quadrants(200, 72);
    let kernel = KernelConfig::rbf(0.5);
    let config = TrainingConfig {
        c: 1.0,
        ..TrainingConfig::default()
    };

    let full = api::train_full(train.features(), train.labels(), kernel, &config).unwrap();

    let mut budgeted_config = config.clone();
    budgeted_config.budget = Some(irwls_svm::BudgetConfig::new(
        train.len(),
        CenterSelection::Random,
    ));
    let budgeted =
        api::train_budgeted(train.features(), train.labels(), kernel, &budgeted_config).unwrap();
    assert_eq!(budgeted.n_support_vectors(), train.len());

    let f_full = PredictionEngine::new(&full, 1)
        .unwrap()
        .decision_values(test.features())
        .unwrap();
    let f_budgeted = PredictionEngine::new(&budgeted, 1)
        .unwrap()
        .decision_values(test.features())
        .unwrap();
    let max_diff = f_full
        .iter()
        .zip(&f_budgeted)
        .map(|(a, b)| (a - b).abs())
        .fold(0.0, f64::max);
    assert!(max_diff <= 1e-3, "Decision values differ by {max_diff}");
    assert!(
        (full.bias() - budgeted.bias()).abs() <= 1e-3,
        "Bias {} vs {}",
        full.bias(),
        budgeted.bias()
    );
}

#[test]
fn test_iteration_bound_is_respected() {
    let train = quadrants(60, 31);
    let model = SVM::new()
        .with_kernel(KernelConfig::rbf(1.0))
        .with_c(10.0)
        .with_max_iterations(1)
        .train(&train)
        .unwrap();

    let summary = model.summary();
    assert_eq!(summary.iterations, 1);
    assert_eq!(summary.status, SolverStatus::MaxIterationsReached);

    let patient = SVM::new()
        .with_kernel(KernelConfig::rbf(1.0))
        .with_c(10.0)
        .with_max_iterations(40)
        .with_patience(2)
        .train(&train)
        .unwrap();
    assert!(patient.summary().iterations <= 40);
    assert!(patient.summary().final_change.is_finite());
}

#[test]
fn test_abort_flag_stops_training() {
    let train = gaussian_clusters(20, 41);
    let flag = Arc::new(AtomicBool::new(true));
    let result = SVM::new()
        .with_abort_flag(Arc::clone(&flag))
        .with_budget(5, CenterSelection::Random)
        .train(&train);
    assert!(matches!(result, Err(SVMError::Aborted { iteration: 1 })));
}

#[test]
fn test_parameter_and_shape_errors() {
    let train = gaussian_clusters(20, 51);

    let bad_gamma = api::train_full(
        train.features(),
        train.labels(),
        KernelConfig::rbf(0.0),
        &TrainingConfig::default(),
    );
    assert!(matches!(bad_gamma, Err(SVMError::InvalidParameter(_))));

    let bad_c = SVM::new().with_c(-1.0).train(&train);
    assert!(matches!(bad_c, Err(SVMError::InvalidParameter(_))));

    let too_many_centers = SVM::new()
        .with_budget(train.len() + 1, CenterSelection::Random)
        .train(&train);
    assert!(matches!(
        too_many_centers,
        Err(SVMError::InvalidParameter(_))
    ));

    let bad_label = api::train_full(
        train.features(),
        &vec![0.0; train.len()],
        KernelConfig::linear(),
        &TrainingConfig::default(),
    );
    assert!(matches!(bad_label, Err(SVMError::InvalidLabel(_))));

    let model = SVM::new().train(&train).unwrap();
    let wrong_width = DenseMatrix::zeros(3, 5);
    assert!(matches!(
        api::predict(&model, &wrong_width),
        Err(SVMError::DimensionMismatch {
            expected: 2,
            actual: 5
        })
    ));
}

/// Test complete workflow: LibSVM file -> training -> save -> load -> predict
#[test]
fn test_file_workflow_with_persistence() {
    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    writeln!(temp_file, "# linearly separable").unwrap();
    writeln!(temp_file, "+1 1:2.0 2:1.0").unwrap();
    writeln!(temp_file, "+1 1:1.8 2:1.1").unwrap();
    writeln!(temp_file, "+1 1:2.2 2:0.9").unwrap();
    writeln!(temp_file, "-1 1:-2.0 2:-1.0").unwrap();
    writeln!(temp_file, "-1 1:-1.8 2:-1.1").unwrap();
    writeln!(temp_file, "-1 1:-2.2 2:-0.9").unwrap();
    temp_file.flush().unwrap();

    let model = SVM::new()
        .with_kernel(KernelConfig::linear())
        .train_from_file(temp_file.path())
        .expect("Training should succeed");
    let metrics = api::evaluate_file(&model, temp_file.path(), 1).unwrap();
    assert_eq!(metrics.accuracy(), 1.0);

    let model_file = NamedTempFile::new().unwrap();
    save_model(&model, model_file.path()).unwrap();
    let loaded = load_model(model_file.path()).unwrap();

    let queries = LibSVMDataset::from_file(temp_file.path())
        .unwrap()
        .to_features(Some(loaded.dim()))
        .unwrap();
    let before = api::predict(&model, &queries).unwrap();
    let after = api::predict(&loaded, &queries).unwrap();
    assert_eq!(before, after);
    assert_eq!(loaded.summary(), model.summary());
}

#[test]
fn test_unlabeled_queries_padded_to_model_width() {
    let train = gaussian_clusters(30, 61);
    let model = SVM::new()
        .with_kernel(KernelConfig::linear())
        .train(&train)
        .unwrap();

    let data = LibSVMDataset::from_reader(&b"1:2.0\n1:-2.0 2:-2.0\n"[..]).unwrap();
    assert!(data.labels().is_none());
    let queries = data.to_features(Some(model.dim())).unwrap();
    assert_eq!(queries.cols(), 2);

    let predictions = api::predict(&model, &queries).unwrap();
    assert_eq!(predictions[0].label, 1.0);
    assert_eq!(predictions[1].label, -1.0);
}
