//! IRWLS solver implementations
//!
//! Both solvers share the loop in [`irwls`] and differ only in the basis the
//! decision function is expanded over: every training point ([`full`]) or a
//! fixed set of centers ([`budgeted`], picked by [`centers`]).

pub mod budgeted;
pub mod centers;
pub mod full;
pub mod irwls;

pub use self::budgeted::{BudgetedBasis, BudgetedSolver};
pub use self::centers::{random_centers, select_centers, SelectedCenters};
pub use self::full::{FullBasis, FullSolver};
pub use self::irwls::{irwls_weight, run_irwls, Basis, Coefficients, IrwlsOutcome, WeightState};

use crate::core::{Dataset, KernelConfig, Result, SolverKind, TrainingConfig};
use crate::model::Model;

/// A training regime producing a [`Model`] from a dataset
pub trait SolverStrategy {
    fn kind(&self) -> SolverKind;

    /// Train with the given kernel and configuration
    fn run(&self, dataset: &Dataset, kernel: KernelConfig, config: &TrainingConfig) -> Result<Model>;
}
