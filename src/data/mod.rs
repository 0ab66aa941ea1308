//! Data loading
//!
//! Readers turn files into the dense matrices and datasets the solvers consume.

pub mod libsvm;

pub use self::libsvm::*;
