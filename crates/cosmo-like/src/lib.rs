#![deny(missing_docs)]

//! Scoring a theory spectrum against several likelihood modules.
//!
//! The modules themselves live in an external library and are reached through
//! [`cosmo_core::LikelihoodModule`]; this crate only prepares their input
//! vectors, tracks nuisance values and sums the results.

/// Likelihood module registry and evaluation.
pub mod aggregator;
/// Nuisance value files.
pub mod nuisance;

pub use aggregator::{LikelihoodAggregator, LikelihoodReport, ModuleLoader, DEFAULT_LIKELIHOODS};
pub use nuisance::{parse_nuisance, read_nuisance};
