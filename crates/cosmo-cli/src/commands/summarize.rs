use std::collections::HashSet;
use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use cosmo_chain::{Chain, ChainConfig, ChainSummary};
use cosmo_core::CosmoResult;
use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use super::write_json;

#[derive(Args, Debug)]
pub struct SummarizeArgs {
    /// YAML chain configurations.
    #[arg(long = "configs", value_name = "PATH", num_args = 1..)]
    pub configs: Vec<PathBuf>,
    /// MontePython chain folders read with default settings.
    #[arg(long = "folders", value_name = "PATH", num_args = 1..)]
    pub folders: Vec<PathBuf>,
    /// Output directory for `<chain>.json` summaries and the batch index.
    #[arg(long)]
    pub out: PathBuf,
    /// Number of worker threads.
    #[arg(long, default_value_t = 1)]
    pub concurrency: usize,
}

#[derive(Debug, Serialize)]
struct BatchEntry {
    name: String,
    summary: String,
    rows: usize,
    input_hash: String,
}

fn summarize_one(config: &ChainConfig) -> CosmoResult<ChainSummary> {
    let chain = Chain::open(config)?;
    ChainSummary::from_chain(&chain, config.best_fit)
}

pub fn run(args: &SummarizeArgs) -> Result<(), Box<dyn Error>> {
    let mut configs = Vec::new();
    for path in &args.configs {
        configs.push(ChainConfig::load(path)?);
    }
    configs.extend(args.folders.iter().map(ChainConfig::new));
    if configs.is_empty() {
        return Err("no chains given: use --configs or --folders".into());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(args.concurrency.max(1))
        .build()?;
    let summaries: CosmoResult<Vec<ChainSummary>> =
        pool.install(|| configs.par_iter().map(summarize_one).collect());
    let summaries = summaries?;

    let mut seen = HashSet::new();
    for summary in &summaries {
        if !seen.insert(summary.name.as_str()) {
            return Err(format!(
                "two chains are named '{}'; their summaries would share {}.json",
                summary.name, summary.name
            )
            .into());
        }
    }

    let mut entries = Vec::with_capacity(summaries.len());
    for summary in &summaries {
        let file = format!("{}.json", summary.name);
        summary.write(&args.out.join(&file))?;
        entries.push(BatchEntry {
            name: summary.name.clone(),
            summary: file,
            rows: summary.rows,
            input_hash: summary.provenance.input_hash.clone(),
        });
    }
    write_json(&args.out.join("index.json"), &entries)?;
    info!(chains = entries.len(), out = %args.out.display(), "summaries written");
    Ok(())
}
