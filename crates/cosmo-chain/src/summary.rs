use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{SecondsFormat, Utc};
use cosmo_core::errors::ErrorInfo;
use cosmo_core::provenance::{ChainProvenance, SchemaVersion};
use cosmo_core::{CosmoError, CosmoResult};
use serde::{Deserialize, Serialize};

use crate::catalog::ParameterClass;
use crate::chain::Chain;
use crate::covariance::CovarianceOrigin;
use crate::loader;

/// Per-parameter entry of a [`ChainSummary`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSummary {
    /// Parameter name.
    pub name: String,
    /// Display label.
    pub label: String,
    /// Parameter classification.
    pub class: ParameterClass,
    /// Sampling bounds (absent for derived parameters).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<(Option<f64>, Option<f64>)>,
    /// Smallest sampled value.
    pub min: f64,
    /// Largest sampled value.
    pub max: f64,
    /// Multiplicity-weighted mean.
    pub mean: f64,
    /// Standard deviation taken from the covariance diagonal.
    pub std_dev: f64,
    /// Values at the best-fit rows, best first.
    pub best_fit: Vec<f64>,
}

/// Serializable overview of a loaded chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainSummary {
    /// Schema version of the payload.
    pub schema_version: SchemaVersion,
    /// Chain name.
    pub name: String,
    /// Sample files that were discovered (file names only).
    pub files: Vec<String>,
    /// Number of sample rows.
    pub rows: usize,
    /// Sum of multiplicities.
    pub total_multiplicity: f64,
    /// mloglik of the best-fit rows, best first.
    pub best_fit_mloglik: Vec<f64>,
    /// Source of the covariance matrix.
    pub covariance: CovarianceOrigin,
    /// One entry per varying and derived parameter, in column order.
    pub parameters: Vec<ParameterSummary>,
    /// Provenance of the inputs.
    pub provenance: ChainProvenance,
}

impl ChainSummary {
    /// Summarizes `chain`, reporting the `best_fit` best rows.
    pub fn from_chain(chain: &Chain, best_fit: usize) -> CosmoResult<Self> {
        let catalog = chain.catalog();
        let means = chain.means()?;
        let covariance = chain.covariance()?;
        let mut parameters = Vec::with_capacity(means.len());
        for (idx, name) in chain.parameters().iter().enumerate() {
            let class = catalog.class_of(name)?;
            let bounds = match class {
                ParameterClass::Derived => None,
                _ => Some(chain.bounds_of(name)?),
            };
            parameters.push(ParameterSummary {
                name: name.clone(),
                label: chain.label_of(name)?.to_string(),
                class,
                bounds,
                min: chain.min(name)?,
                max: chain.max(name)?,
                mean: means[idx],
                std_dev: covariance[(idx, idx)].sqrt(),
                best_fit: chain.best_fit_of(best_fit, name)?,
            });
        }

        let mut tool_versions = BTreeMap::new();
        tool_versions.insert(
            env!("CARGO_PKG_NAME").to_string(),
            env!("CARGO_PKG_VERSION").to_string(),
        );
        let provenance = ChainProvenance {
            input_hash: loader::digest(chain.files())?,
            sampler: chain.format().to_string(),
            metadata_files: catalog
                .sources()
                .iter()
                .map(|path| path.display().to_string())
                .collect(),
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            tool_versions,
        };

        Ok(Self {
            schema_version: SchemaVersion::default(),
            name: chain.name().to_string(),
            files: chain
                .files()
                .iter()
                .filter_map(|path| path.file_name())
                .map(|name| name.to_string_lossy().into_owned())
                .collect(),
            rows: chain.len(),
            total_multiplicity: chain.values("multiplicity")?.sum(),
            best_fit_mloglik: chain.best_fit_of(best_fit, "mloglik")?,
            covariance: chain.covariance_origin()?.clone(),
            parameters,
            provenance,
        })
    }

    /// Writes the summary to a JSON file.
    pub fn write(&self, path: &Path) -> CosmoResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| CosmoError::io("summary-mkdir", parent, err))?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|err| {
            CosmoError::Config(ErrorInfo::new("summary-serialize", err.to_string()).with_path(path))
        })?;
        fs::write(path, json).map_err(|err| CosmoError::io("summary-write", path, err))
    }

    /// Loads a summary from disk.
    pub fn load(path: &Path) -> CosmoResult<Self> {
        let contents =
            fs::read_to_string(path).map_err(|err| CosmoError::io("summary-read", path, err))?;
        serde_json::from_str(&contents).map_err(|err| {
            CosmoError::Config(ErrorInfo::new("summary-parse", err.to_string()).with_path(path))
        })
    }
}
