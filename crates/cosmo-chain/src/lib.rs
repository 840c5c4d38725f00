#![deny(missing_docs)]

//! Sampler-independent access to cosmological MCMC chains.
//!
//! A chain folder is opened through [`Chain::open`]: the [`SamplerFormat`]
//! reads the metadata into a [`ParameterCatalog`], discovers the sample files,
//! and [`loader::load`] concatenates and normalizes them into one point
//! matrix with the layout `[multiplicity, mloglik, varying..., derived...]`.

/// Parameter metadata parsing for every supported dialect.
pub mod catalog;
/// The loaded chain and its statistics.
pub mod chain;
/// YAML chain configuration.
pub mod config;
/// Weighted covariance, correlation and precomputed covariance artifacts.
pub mod covariance;
/// Rebuilding spectrum and nuisance inputs from chain rows.
pub mod export;
/// Sampler formats and their file conventions.
pub mod format;
/// Reading and concatenating sample files.
pub mod loader;
/// JSON chain summaries.
pub mod summary;

pub use catalog::{MetadataDialect, ParameterCatalog, ParameterClass, ParameterEntry};
pub use chain::{Chain, MLOGLIK, MULTIPLICITY};
pub use config::ChainConfig;
pub use covariance::{
    correlation_from, weighted_covariance, weighted_means, CovarianceOrigin, CovarianceSource,
};
pub use export::{ArgValue, PointExporter, SubstitutionRule, SUBSTITUTIONS};
pub use format::SamplerFormat;
pub use summary::{ChainSummary, ParameterSummary};
