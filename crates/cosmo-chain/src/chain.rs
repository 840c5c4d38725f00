use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use cosmo_core::errors::ErrorInfo;
use cosmo_core::{CosmoError, CosmoResult};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use tracing::{debug, info};

use crate::catalog::ParameterCatalog;
use crate::config::ChainConfig;
use crate::covariance::{
    correlation_from, load_artifact, weighted_covariance, weighted_means, Covariance,
    CovarianceOrigin, CovarianceSource,
};
use crate::export::PointExporter;
use crate::format::SamplerFormat;
use crate::loader;

/// Column name of the sample multiplicity.
pub const MULTIPLICITY: &str = "multiplicity";
/// Column name of minus the log-likelihood.
pub const MLOGLIK: &str = "mloglik";

/// A loaded chain: parameter catalog plus the normalized point matrix.
///
/// The point matrix never changes after construction. The likelihood
/// ordering, covariance and correlation are computed on first use and then
/// reused.
#[derive(Debug)]
pub struct Chain {
    name: String,
    folder: PathBuf,
    format: SamplerFormat,
    catalog: ParameterCatalog,
    files: Vec<PathBuf>,
    points: Array2<f64>,
    covariance_source: CovarianceSource,
    sorted: OnceLock<Vec<usize>>,
    covariance: OnceLock<Covariance>,
    correlation: OnceLock<Array2<f64>>,
}

impl Chain {
    /// Opens the chain described by `config`.
    pub fn open(config: &ChainConfig) -> CosmoResult<Self> {
        let folder = config.folder.as_path();
        if !folder.is_dir() {
            return Err(CosmoError::Config(
                ErrorInfo::new("chain-folder", "the chain folder provided is not a directory")
                    .with_path(folder),
            ));
        }
        let prefix = config.prefix.as_deref();
        let format = config.format;
        let name = format.chain_name(folder, prefix)?;
        let mut catalog = format.load_catalog(folder, prefix)?;
        let applied = catalog.set_labels(&config.labels);
        if !applied.is_empty() {
            debug!(labels = applied.len(), "applied label overrides");
        }
        let files = format.discover(folder, prefix)?;
        let points = loader::load(&files, &catalog, format)?;
        info!(chain = %name, rows = points.nrows(), "chain opened");

        let mut chain = Self::from_points(name, format, catalog, points)?;
        chain.folder = folder.to_path_buf();
        chain.files = files;
        chain.covariance_source = config.covariance;
        Ok(chain)
    }

    /// Wraps an already normalized point matrix.
    pub fn from_points(
        name: impl Into<String>,
        format: SamplerFormat,
        catalog: ParameterCatalog,
        points: Array2<f64>,
    ) -> CosmoResult<Self> {
        if points.nrows() == 0 {
            return Err(CosmoError::EmptyChain(ErrorInfo::new(
                "chain-empty",
                "point matrix has no rows",
            )));
        }
        if points.ncols() != catalog.column_count() {
            return Err(CosmoError::MalformedChain(
                ErrorInfo::new(
                    "chain-columns",
                    "point matrix column count does not match the parameter catalog",
                )
                .with_context("expected", catalog.column_count().to_string())
                .with_context("found", points.ncols().to_string()),
            ));
        }
        Ok(Self {
            name: name.into(),
            folder: PathBuf::new(),
            format,
            catalog,
            files: Vec::new(),
            points,
            covariance_source: CovarianceSource::Sample,
            sorted: OnceLock::new(),
            covariance: OnceLock::new(),
            correlation: OnceLock::new(),
        })
    }

    /// Chain name: the folder name for MontePython, the prefix otherwise.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Folder the chain was opened from (empty for in-memory chains).
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Sampler format the chain was read as.
    pub fn format(&self) -> SamplerFormat {
        self.format
    }

    /// Parameter catalog describing the columns.
    pub fn catalog(&self) -> &ParameterCatalog {
        &self.catalog
    }

    /// Sample files that were discovered, including empty ones.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Whole point matrix (`[multiplicity, mloglik, parameters...]` per row).
    pub fn points(&self) -> &Array2<f64> {
        &self.points
    }

    /// Number of sample rows.
    pub fn len(&self) -> usize {
        self.points.nrows()
    }

    /// Always `false`: chains without rows cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.points.nrows() == 0
    }

    /// Sampled parameters in column order.
    pub fn varying_parameters(&self) -> &[String] {
        self.catalog.varying_parameters()
    }

    /// Derived parameters in column order.
    pub fn derived_parameters(&self) -> &[String] {
        self.catalog.derived_parameters()
    }

    /// Varying then derived parameters.
    pub fn parameters(&self) -> Vec<String> {
        self.catalog.parameters()
    }

    /// Display label of a parameter.
    pub fn label_of(&self, param: &str) -> CosmoResult<&str> {
        self.catalog.label_of(param)
    }

    /// Overrides display labels; returns the names actually changed.
    pub fn set_labels<I, K, V>(&mut self, overrides: I) -> Vec<String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        self.catalog.set_labels(overrides)
    }

    /// Sampling bounds imposed on a varying parameter.
    pub fn bounds_of(&self, param: &str) -> CosmoResult<(Option<f64>, Option<f64>)> {
        self.catalog.bounds_of(param)
    }

    /// Column index of `param`.
    ///
    /// With `within_row` the index addresses a chain row and the reserved
    /// names `multiplicity` (alias `#`) and `mloglik` are accepted; without it
    /// the index addresses the covariance matrix.
    pub fn index_of(&self, param: &str, within_row: bool) -> CosmoResult<usize> {
        if within_row {
            match param {
                MULTIPLICITY | "#" => return Ok(0),
                MLOGLIK => return Ok(1),
                _ => {}
            }
        }
        let offset = if within_row { 2 } else { 0 };
        self.catalog
            .position(param)
            .map(|idx| idx + offset)
            .ok_or_else(|| CosmoError::unknown_parameter(param))
    }

    /// Column of `param` over all rows.
    pub fn values(&self, param: &str) -> CosmoResult<ArrayView1<'_, f64>> {
        let idx = self.index_of(param, true)?;
        Ok(self.points.column(idx))
    }

    /// A single chain row.
    pub fn row(&self, index: usize) -> Option<ArrayView1<'_, f64>> {
        (index < self.points.nrows()).then(|| self.points.row(index))
    }

    /// Smallest value reached by `param`; NaN when any entry is NaN.
    pub fn min(&self, param: &str) -> CosmoResult<f64> {
        Ok(extreme(self.values(param)?, f64::INFINITY, f64::min))
    }

    /// Largest value reached by `param`; NaN when any entry is NaN.
    pub fn max(&self, param: &str) -> CosmoResult<f64> {
        Ok(extreme(self.values(param)?, f64::NEG_INFINITY, f64::max))
    }

    fn likelihood_order(&self) -> &[usize] {
        self.sorted.get_or_init(|| {
            let mloglik = self.points.column(1);
            let mut order: Vec<usize> = (0..self.points.nrows()).collect();
            order.sort_by(|&a, &b| mloglik[a].total_cmp(&mloglik[b]));
            debug!(chain = %self.name, "likelihood ordering cached");
            order
        })
    }

    /// The `k` rows with the smallest mloglik, best first.
    ///
    /// Ties keep file and row order. Asking for more rows than the chain
    /// holds returns every row.
    pub fn best_fit(&self, k: usize) -> Array2<f64> {
        let order = self.likelihood_order();
        let take = k.min(order.len());
        self.points.select(Axis(0), &order[..take])
    }

    /// Values of `param` in the `k` best-fit rows.
    pub fn best_fit_of(&self, k: usize, param: &str) -> CosmoResult<Vec<f64>> {
        let idx = self.index_of(param, true)?;
        let order = self.likelihood_order();
        Ok(order
            .iter()
            .take(k)
            .map(|&row| self.points[(row, idx)])
            .collect())
    }

    /// The single best-fit row.
    pub fn best_fit_row(&self) -> ArrayView1<'_, f64> {
        self.points.row(self.likelihood_order()[0])
    }

    fn covariance_entry(&self) -> CosmoResult<&Covariance> {
        if let Some(covariance) = self.covariance.get() {
            return Ok(covariance);
        }
        let computed = self.compute_covariance()?;
        Ok(self.covariance.get_or_init(|| computed))
    }

    fn compute_covariance(&self) -> CosmoResult<Covariance> {
        let dim = self.catalog.parameters().len();
        let artifact = self.format.covariance_artifact(&self.folder, &self.name);
        let use_artifact = match self.covariance_source {
            CovarianceSource::Artifact => true,
            CovarianceSource::Auto => !self.folder.as_os_str().is_empty() && artifact.is_file(),
            CovarianceSource::Sample => false,
        };
        if use_artifact {
            let matrix = load_artifact(&artifact, dim)?;
            info!(path = %artifact.display(), "covariance read from artifact");
            return Ok(Covariance {
                matrix,
                origin: CovarianceOrigin::Artifact(artifact),
            });
        }
        let matrix = weighted_covariance(self.points.view())?;
        debug!(chain = %self.name, dim, "covariance computed from weighted samples");
        Ok(Covariance {
            matrix,
            origin: CovarianceOrigin::Sample,
        })
    }

    /// Full covariance matrix over varying then derived parameters.
    pub fn covariance(&self) -> CosmoResult<&Array2<f64>> {
        self.covariance_entry().map(|covariance| &covariance.matrix)
    }

    /// Policy used to pick the covariance matrix.
    pub fn covariance_source(&self) -> CovarianceSource {
        self.covariance_source
    }

    /// Where the covariance matrix came from.
    pub fn covariance_origin(&self) -> CosmoResult<&CovarianceOrigin> {
        self.covariance_entry().map(|covariance| &covariance.origin)
    }

    /// Covariance between two parameters.
    pub fn covariance_of(&self, p1: &str, p2: &str) -> CosmoResult<f64> {
        let i = self.index_of(p1, false)?;
        let j = self.index_of(p2, false)?;
        Ok(self.covariance()?[(i, j)])
    }

    /// Variance of a parameter.
    pub fn variance(&self, param: &str) -> CosmoResult<f64> {
        self.covariance_of(param, param)
    }

    /// Full correlation matrix; the diagonal is exactly one.
    pub fn correlation(&self) -> CosmoResult<&Array2<f64>> {
        if let Some(correlation) = self.correlation.get() {
            return Ok(correlation);
        }
        let computed = correlation_from(self.covariance()?);
        Ok(self.correlation.get_or_init(|| computed))
    }

    /// Correlation coefficient between two parameters.
    pub fn correlation_of(&self, p1: &str, p2: &str) -> CosmoResult<f64> {
        let i = self.index_of(p1, false)?;
        let j = self.index_of(p2, false)?;
        Ok(self.correlation()?[(i, j)])
    }

    /// Correlation matrix restricted to `params`, in the given order.
    pub fn correlation_subset<S: AsRef<str>>(&self, params: &[S]) -> CosmoResult<Array2<f64>> {
        let indices = params
            .iter()
            .map(|param| self.index_of(param.as_ref(), false))
            .collect::<CosmoResult<Vec<_>>>()?;
        let full = self.correlation()?;
        Ok(Array2::from_shape_fn(
            (indices.len(), indices.len()),
            |(a, b)| full[(indices[a], indices[b])],
        ))
    }

    /// Multiplicity-weighted mean of every parameter.
    pub fn means(&self) -> CosmoResult<Array1<f64>> {
        weighted_means(self.points.view())
    }

    /// Exporter for rebuilding spectrum and nuisance inputs from rows of this chain.
    pub fn exporter(&self) -> PointExporter<'_> {
        PointExporter::new(&self.catalog)
    }
}

fn extreme(values: ArrayView1<'_, f64>, init: f64, pick: fn(f64, f64) -> f64) -> f64 {
    values.fold(init, |acc, &v| if v.is_nan() || acc.is_nan() { f64::NAN } else { pick(acc, v) })
}
