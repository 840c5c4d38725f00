use std::fs;
use std::path::{Path, PathBuf};

use cosmo_core::errors::ErrorInfo;
use cosmo_core::{CosmoError, CosmoResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::covariance::CovarianceSource;
use crate::format::SamplerFormat;

/// YAML-configurable description of a chain to analyse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Folder holding the chain files and metadata. Relative paths are
    /// resolved against the configuration file's directory.
    pub folder: PathBuf,
    /// File prefix, required by the CosmoMC family of formats.
    #[serde(default)]
    pub prefix: Option<String>,
    /// Sampler that produced the chain.
    #[serde(default)]
    pub format: SamplerFormat,
    /// Display label overrides; unknown names are ignored.
    #[serde(default)]
    pub labels: IndexMap<String, String>,
    /// Covariance matrix policy.
    #[serde(default)]
    pub covariance: CovarianceSource,
    /// Number of best-fit rows reported in summaries.
    #[serde(default = "default_best_fit")]
    pub best_fit: usize,
}

fn default_best_fit() -> usize {
    1
}

impl ChainConfig {
    /// Configuration for `folder` with every other option at its default.
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
            prefix: None,
            format: SamplerFormat::default(),
            labels: IndexMap::new(),
            covariance: CovarianceSource::default(),
            best_fit: default_best_fit(),
        }
    }

    /// Sets the sampler format.
    pub fn with_format(mut self, format: SamplerFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets the chain prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Sets the covariance policy.
    pub fn with_covariance(mut self, source: CovarianceSource) -> Self {
        self.covariance = source;
        self
    }

    /// Loads a configuration from a YAML file.
    pub fn load(path: &Path) -> CosmoResult<Self> {
        let contents =
            fs::read_to_string(path).map_err(|err| CosmoError::io("config-read", path, err))?;
        let mut config: ChainConfig = serde_yaml::from_str(&contents).map_err(|err| {
            CosmoError::Config(ErrorInfo::new("config-parse", err.to_string()).with_path(path))
        })?;
        if config.folder.is_relative() {
            if let Some(parent) = path.parent() {
                config.folder = parent.join(&config.folder);
            }
        }
        Ok(config)
    }
}
