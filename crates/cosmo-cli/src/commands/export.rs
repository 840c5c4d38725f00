use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use cosmo_chain::ArgValue;
use indexmap::IndexMap;
use tracing::info;

use super::{write_json, ChainArgs};

#[derive(Args, Debug)]
pub struct ExportArgs {
    #[command(flatten)]
    pub chain: ChainArgs,
    /// Row to export; the best-fit row by default.
    #[arg(long)]
    pub row: Option<usize>,
    /// Directory that `data.path['cosmo']` references resolve to.
    #[arg(long)]
    pub base_dir: Option<PathBuf>,
    /// Extra spectrum-code arguments as `name=value`; these win over chain values.
    #[arg(long = "set", value_name = "NAME=VALUE")]
    pub overrides: Vec<String>,
    /// Output directory for `spectrum_inputs.json` and `nuisance.txt`.
    #[arg(long)]
    pub out: PathBuf,
}

fn parse_override(text: &str) -> Result<(String, ArgValue), Box<dyn Error>> {
    let (name, value) = text
        .split_once('=')
        .ok_or_else(|| format!("override '{text}' is not of the form name=value"))?;
    let value = value.trim();
    let value = match value.parse::<f64>() {
        Ok(number) => ArgValue::Number(number),
        Err(_) => ArgValue::Text(value.to_string()),
    };
    Ok((name.trim().to_string(), value))
}

pub fn run(args: &ExportArgs) -> Result<(), Box<dyn Error>> {
    let (_, chain) = args.chain.open()?;
    let row = match args.row {
        Some(index) => chain
            .row(index)
            .ok_or_else(|| format!("row {index} is out of range ({} rows)", chain.len()))?,
        None => chain.best_fit_row(),
    };
    let overrides = args
        .overrides
        .iter()
        .map(|text| parse_override(text))
        .collect::<Result<IndexMap<_, _>, _>>()?;

    let mut exporter = chain.exporter();
    if let Some(base_dir) = &args.base_dir {
        exporter = exporter.with_base_dir(base_dir);
    }
    let inputs = exporter.spectrum_inputs(row, &overrides)?;
    write_json(&args.out.join("spectrum_inputs.json"), &inputs)?;
    let nuisance = exporter.write_nuisance(row, &args.out.join("nuisance.txt"))?;
    info!(
        inputs = inputs.len(),
        nuisance = nuisance.len(),
        out = %args.out.display(),
        "point exported"
    );
    Ok(())
}
