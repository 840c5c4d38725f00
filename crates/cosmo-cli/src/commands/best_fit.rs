use std::error::Error;
use std::fmt::Write as _;

use clap::Args;
use cosmo_chain::MLOGLIK;

use super::{split_params, ChainArgs};

#[derive(Args, Debug)]
pub struct BestFitArgs {
    #[command(flatten)]
    pub chain: ChainArgs,
    /// Number of rows to print; defaults to the configuration's `best_fit`.
    #[arg(long, short = 'k')]
    pub count: Option<usize>,
    /// Comma separated parameters to print; all of them by default.
    #[arg(long)]
    pub params: Option<String>,
}

pub fn run(args: &BestFitArgs) -> Result<(), Box<dyn Error>> {
    let (config, chain) = args.chain.open()?;
    let count = args.count.unwrap_or(config.best_fit);
    let params = match &args.params {
        Some(list) => split_params(list),
        None => chain.parameters(),
    };
    let mut columns = vec![MLOGLIK.to_string()];
    columns.extend(params);
    let indices = columns
        .iter()
        .map(|name| chain.index_of(name, true))
        .collect::<Result<Vec<_>, _>>()?;

    let mut out = String::new();
    writeln!(out, "{}", columns.join("\t"))?;
    for row in chain.best_fit(count).rows() {
        let cells: Vec<String> = indices.iter().map(|&idx| format!("{}", row[idx])).collect();
        writeln!(out, "{}", cells.join("\t"))?;
    }
    print!("{out}");
    Ok(())
}
