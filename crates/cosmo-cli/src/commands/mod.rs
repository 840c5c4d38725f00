pub mod best_fit;
pub mod export;
pub mod info;
pub mod matrix;
pub mod summarize;

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use cosmo_chain::{Chain, ChainConfig, CovarianceSource, SamplerFormat};
use serde::Serialize;

/// Chain selection shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct ChainArgs {
    /// YAML chain configuration; the flags below override its values.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Folder holding the chain files and metadata.
    #[arg(long, required_unless_present = "config")]
    pub folder: Option<PathBuf>,
    /// Chain prefix (CosmoMC family only).
    #[arg(long)]
    pub prefix: Option<String>,
    /// Sampler format: montepython, cosmomc, cosmomc+multinest or cosmomc+polychord.
    #[arg(long)]
    pub format: Option<SamplerFormat>,
    /// Covariance policy: auto, artifact or sample.
    #[arg(long, value_parser = parse_covariance)]
    pub covariance: Option<CovarianceSource>,
}

fn parse_covariance(value: &str) -> Result<CovarianceSource, String> {
    match value {
        "auto" => Ok(CovarianceSource::Auto),
        "artifact" => Ok(CovarianceSource::Artifact),
        "sample" => Ok(CovarianceSource::Sample),
        other => Err(format!("unknown covariance policy '{other}'")),
    }
}

impl ChainArgs {
    pub fn chain_config(&self) -> Result<ChainConfig, Box<dyn Error>> {
        let mut config = match (&self.config, &self.folder) {
            (Some(path), _) => ChainConfig::load(path)?,
            (None, Some(folder)) => ChainConfig::new(folder),
            (None, None) => return Err("either --config or --folder is required".into()),
        };
        if let Some(folder) = &self.folder {
            config.folder = folder.clone();
        }
        if let Some(prefix) = &self.prefix {
            config.prefix = Some(prefix.clone());
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        if let Some(covariance) = self.covariance {
            config.covariance = covariance;
        }
        Ok(config)
    }

    pub fn open(&self) -> Result<(ChainConfig, Chain), Box<dyn Error>> {
        let config = self.chain_config()?;
        let chain = Chain::open(&config)?;
        Ok((config, chain))
    }
}

/// Splits a comma separated parameter list, dropping empty items.
pub fn split_params(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

/// Writes `contents` to `out` when given, to stdout otherwise.
pub fn emit(out: Option<&Path>, contents: &str) -> Result<(), Box<dyn Error>> {
    match out {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, contents)?;
        }
        None => print!("{contents}"),
    }
    Ok(())
}
