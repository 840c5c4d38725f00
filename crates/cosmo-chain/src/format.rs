use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use cosmo_core::errors::ErrorInfo;
use cosmo_core::{CosmoError, CosmoResult};
use ndarray::{s, Array2};
use serde::{Deserialize, Serialize};

use crate::catalog::{MetadataDialect, ParameterCatalog};

/// Sampler codes whose output can be read.
///
/// The format is chosen once per chain; every format-specific decision
/// (file discovery, metadata dialect, column normalization) goes through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SamplerFormat {
    /// MontePython: `log.param` plus any number of `*.txt` chains in the folder.
    #[default]
    #[serde(rename = "montepython")]
    MontePython,
    /// CosmoMC Metropolis-Hastings: `<prefix>_<n>.txt` chains.
    #[serde(rename = "cosmomc")]
    CosmoMc,
    /// CosmoMC driving MultiNest: a single `<prefix>.txt` with `-2 log L` in column 1.
    #[serde(rename = "cosmomc+multinest", alias = "multinest")]
    MultiNest,
    /// CosmoMC driving PolyChord: a single `<prefix>.txt` with `-2 log L` in column 1.
    #[serde(rename = "cosmomc+polychord", alias = "polychord")]
    PolyChord,
}

impl SamplerFormat {
    /// Canonical lower-case name.
    pub fn as_str(self) -> &'static str {
        match self {
            SamplerFormat::MontePython => "montepython",
            SamplerFormat::CosmoMc => "cosmomc",
            SamplerFormat::MultiNest => "cosmomc+multinest",
            SamplerFormat::PolyChord => "cosmomc+polychord",
        }
    }

    /// Metadata dialect written by the sampler.
    pub fn dialect(self) -> MetadataDialect {
        match self {
            SamplerFormat::MontePython => MetadataDialect::LogParam,
            _ => MetadataDialect::InputParams,
        }
    }

    /// Whether column 1 stores `-2 log L` and must be halved.
    pub fn halves_likelihood(self) -> bool {
        matches!(self, SamplerFormat::MultiNest | SamplerFormat::PolyChord)
    }

    fn requires_prefix(self) -> bool {
        !matches!(self, SamplerFormat::MontePython)
    }

    fn prefix<'a>(self, prefix: Option<&'a str>) -> CosmoResult<&'a str> {
        match prefix {
            Some(prefix) if !prefix.is_empty() => Ok(prefix),
            _ => Err(CosmoError::Config(
                ErrorInfo::new("prefix-missing", "this sampler format needs a chain prefix")
                    .with_context("format", self.as_str()),
            )),
        }
    }

    /// Human readable chain name: the folder name for MontePython, the prefix otherwise.
    pub fn chain_name(self, directory: &Path, prefix: Option<&str>) -> CosmoResult<String> {
        if self.requires_prefix() {
            return self.prefix(prefix).map(str::to_string);
        }
        let name = directory
            .components()
            .filter_map(|component| component.as_os_str().to_str())
            .filter(|part| !part.is_empty() && *part != "." && *part != "/")
            .last()
            .unwrap_or_default();
        Ok(name.to_string())
    }

    /// Metadata file the parameter catalog is read from.
    pub fn metadata_path(self, directory: &Path, prefix: Option<&str>) -> CosmoResult<PathBuf> {
        match self {
            SamplerFormat::MontePython => Ok(directory.join("log.param")),
            _ => Ok(directory.join(format!("{}.inputparams", self.prefix(prefix)?))),
        }
    }

    /// Builds the parameter catalog for a chain folder.
    pub fn load_catalog(
        self,
        directory: &Path,
        prefix: Option<&str>,
    ) -> CosmoResult<ParameterCatalog> {
        ParameterCatalog::load(&self.metadata_path(directory, prefix)?, self.dialect())
    }

    /// Lists the sample files of a chain, sorted lexicographically.
    pub fn discover(self, directory: &Path, prefix: Option<&str>) -> CosmoResult<Vec<PathBuf>> {
        let prefix = if self.requires_prefix() {
            Some(self.prefix(prefix)?)
        } else {
            None
        };
        let listing =
            fs::read_dir(directory).map_err(|err| CosmoError::io("chain-dir", directory, err))?;
        let mut files = Vec::new();
        for entry in listing {
            let entry = entry.map_err(|err| CosmoError::io("chain-dir", directory, err))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            if self.matches(file_name, prefix) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    fn matches(self, file_name: &str, prefix: Option<&str>) -> bool {
        let Some(stem) = file_name.strip_suffix(".txt") else {
            return false;
        };
        match (self, prefix) {
            (SamplerFormat::MontePython, _) => true,
            (SamplerFormat::CosmoMc, Some(prefix)) => stem
                .strip_prefix(prefix)
                .and_then(|rest| rest.strip_prefix('_'))
                .is_some_and(|digits| {
                    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
                }),
            (_, Some(prefix)) => stem == prefix,
            (_, None) => false,
        }
    }

    /// Applies the format's column conventions to freshly loaded rows.
    ///
    /// Parameter columns (offset by two) are multiplied by their catalog scale
    /// factor and, where the sampler stores `-2 log L`, column 1 is halved.
    pub fn normalize(self, points: &mut Array2<f64>, catalog: &ParameterCatalog) -> CosmoResult<()> {
        for (idx, name) in catalog.parameters().iter().enumerate() {
            let scale = catalog.scale_of(name)?;
            if scale != 1.0 {
                points.slice_mut(s![.., idx + 2]).mapv_inplace(|v| v * scale);
            }
        }
        if self.halves_likelihood() {
            points.slice_mut(s![.., 1]).mapv_inplace(|v| v / 2.0);
        }
        Ok(())
    }

    /// Location of a precomputed covariance matrix for the chain.
    pub fn covariance_artifact(self, directory: &Path, name: &str) -> PathBuf {
        directory.join(format!("{name}.covmat"))
    }
}

impl fmt::Display for SamplerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SamplerFormat {
    type Err = CosmoError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "montepython" => Ok(SamplerFormat::MontePython),
            "cosmomc" => Ok(SamplerFormat::CosmoMc),
            "cosmomc+multinest" | "multinest" => Ok(SamplerFormat::MultiNest),
            "cosmomc+polychord" | "polychord" => Ok(SamplerFormat::PolyChord),
            other => Err(CosmoError::Config(
                ErrorInfo::new("format-unknown", "sampler format not known")
                    .with_context("format", other)
                    .with_hint("use montepython, cosmomc, cosmomc+multinest or cosmomc+polychord"),
            )),
        }
    }
}
