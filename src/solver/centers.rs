//! Center selection for budgeted training
//!
//! `Random` draws M distinct training points uniformly. `Incremental` grows
//! the basis greedily: each step scores a random pool of candidates by how
//! much they reduce the Nyström approximation error of the full kernel
//! matrix and keeps the best one.

use crate::cache::KernelCache;
use crate::core::{BudgetConfig, CenterSelection, DenseMatrix, Result, SVMError};
use crate::kernel::KernelEngine;
use crate::linalg::CholeskyFactor;
use faer::Par;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use std::sync::Arc;

/// Diagonal jitter added to K_cc while the factor is grown
pub const CENTER_JITTER: f64 = 1e-5;

/// Chosen centers as training indices
///
/// Incremental selection already evaluated k(·, c) over the training set for
/// every center; those columns are kept so the solver need not recompute them.
#[derive(Debug, Clone)]
pub struct SelectedCenters {
    pub indices: Vec<usize>,
    pub columns: Option<Vec<Arc<Vec<f64>>>>,
}

/// Pick centers according to `budget.selection`
pub fn select_centers(
    engine: &KernelEngine<'_>,
    features: &DenseMatrix,
    norms: &[f64],
    budget: &BudgetConfig,
) -> Result<SelectedCenters> {
    let n = features.rows();
    if budget.size == 0 || budget.size > n {
        return Err(SVMError::InvalidParameter(format!(
            "Budget size must be between 1 and the number of samples ({n}), got: {}",
            budget.size
        )));
    }
    match budget.selection {
        CenterSelection::Random => Ok(SelectedCenters {
            indices: random_centers(n, budget.size, budget.seed),
            columns: None,
        }),
        CenterSelection::Incremental => incremental_centers(engine, features, norms, budget),
    }
}

/// `m` distinct indices from `0..n`, ascending
pub fn random_centers(n: usize, m: usize, seed: u64) -> Vec<usize> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut picked = index::sample(&mut rng, n, m.min(n)).into_vec();
    picked.sort_unstable();
    picked
}

/// Greedy selection tracking Z = L⁻¹ K_{C·}, where L Lᵀ = K_CC + jitter·I
///
/// For a candidate x, w = L⁻¹ k_{Cx} and the residual of its column after
/// projection onto the current basis is k_x - Zᵀ w.
fn incremental_centers(
    engine: &KernelEngine<'_>,
    features: &DenseMatrix,
    norms: &[f64],
    budget: &BudgetConfig,
) -> Result<SelectedCenters> {
    let n = features.rows();
    let pool = engine.pool();
    let mut rng = StdRng::seed_from_u64(budget.seed);
    let mut cache = KernelCache::with_memory_limit(budget.cache_size, n);

    let mut selected: Vec<usize> = Vec::with_capacity(budget.size);
    let mut columns: Vec<Arc<Vec<f64>>> = Vec::with_capacity(budget.size);
    let mut z_rows: Vec<Vec<f64>> = Vec::with_capacity(budget.size);
    let mut factor = CholeskyFactor::empty();
    // Points not yet selected and not rejected
    let mut pool_of_points: Vec<usize> = (0..n).collect();

    while selected.len() < budget.size && !pool_of_points.is_empty() {
        let draw = budget.candidates.min(pool_of_points.len());
        let positions = index::sample(&mut rng, pool_of_points.len(), draw).into_vec();
        let candidates: Vec<usize> = positions.iter().map(|&p| pool_of_points[p]).collect();

        let mut candidate_columns = Vec::with_capacity(candidates.len());
        for &j in &candidates {
            let column = match cache.get(j) {
                Some(column) => column,
                None => {
                    let column =
                        Arc::new(engine.column(features, norms, features.row(j), norms[j])?);
                    cache.put(j, Arc::clone(&column));
                    column
                }
            };
            candidate_columns.push(column);
        }

        let scored = pool.map_indices(candidates.len(), |t| {
            score_candidate(&factor, &z_rows, &selected, candidates[t], &candidate_columns[t])
        });
        let mut best = 0;
        for t in 1..scored.len() {
            if scored[t].score > scored[best].score {
                best = t;
            }
        }
        let chosen = candidates[best];
        let column = Arc::clone(&candidate_columns[best]);
        let cross: Vec<f64> = selected.iter().map(|&c| column[c]).collect();

        pool_of_points.retain(|&j| j != chosen);
        match factor.extend(&cross, column[chosen] + CENTER_JITTER) {
            Ok(()) => {}
            Err(SVMError::NotPositiveDefinite { .. }) => {
                debug!("Candidate {chosen} is numerically dependent on the basis, skipping");
                continue;
            }
            Err(e) => return Err(e),
        }

        let m = selected.len();
        let corner = factor.lower()[(m, m)];
        let w = &scored[best].projection;
        let z_new: Vec<f64> = (0..n)
            .map(|i| {
                let projected: f64 = z_rows.iter().zip(w).map(|(z, wk)| z[i] * wk).sum();
                (column[i] - projected) / corner
            })
            .collect();
        z_rows.push(z_new);
        debug!(
            "Center {} = sample {chosen} (score {:.4e})",
            m + 1,
            scored[best].score
        );
        selected.push(chosen);
        columns.push(column);
        cache.take(chosen);
    }

    if selected.len() < budget.size {
        warn!(
            "Only {} of {} requested centers are linearly independent",
            selected.len(),
            budget.size
        );
    }
    let stats = cache.stats();
    info!(
        "Selected {} centers incrementally (column cache {} hits / {} misses)",
        selected.len(),
        stats.hits,
        stats.misses
    );

    Ok(SelectedCenters {
        indices: selected,
        columns: Some(columns),
    })
}

struct CandidateScore {
    score: f64,
    /// L⁻¹ k_{Cx}
    projection: Vec<f64>,
}

/// ||k_x - K_{·C} K_CC⁻¹ k_{Cx}||² / η, with η the residual self-similarity
fn score_candidate(
    factor: &CholeskyFactor,
    z_rows: &[Vec<f64>],
    selected: &[usize],
    x: usize,
    column: &[f64],
) -> CandidateScore {
    let cross: Vec<f64> = selected.iter().map(|&c| column[c]).collect();
    let projection = if selected.is_empty() {
        Vec::new()
    } else {
        match factor.forward_substitution(&cross, Par::Seq) {
            Ok(w) => w,
            Err(_) => {
                return CandidateScore {
                    score: 0.0,
                    projection: vec![0.0; selected.len()],
                }
            }
        }
    };

    let eta = column[x] - projection.iter().map(|w| w * w).sum::<f64>();
    if !(eta > 0.0) {
        return CandidateScore {
            score: 0.0,
            projection,
        };
    }

    let error: f64 = (0..column.len())
        .map(|i| {
            let projected: f64 = z_rows.iter().zip(&projection).map(|(z, w)| z[i] * w).sum();
            let r = column[i] - projected;
            r * r
        })
        .sum();
    CandidateScore {
        score: error / eta,
        projection,
    }
}
