use std::error::Error;

use clap::{Parser, Subcommand};
use commands::{
    best_fit::{self, BestFitArgs},
    export::{self, ExportArgs},
    info::{self, InfoArgs},
    matrix::{self, MatrixArgs, MatrixKind},
    summarize::{self, SummarizeArgs},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "cosmo", about = "Cosmological MCMC chain analysis")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the parameters of a chain with their bounds and ranges.
    Info(InfoArgs),
    /// Print the rows with the smallest mloglik.
    BestFit(BestFitArgs),
    /// Print the covariance matrix over varying and derived parameters.
    Covariance(MatrixArgs),
    /// Print the correlation matrix, optionally restricted to some parameters.
    Correlation(MatrixArgs),
    /// Rebuild spectrum and nuisance inputs from a chain row.
    Export(ExportArgs),
    /// Write JSON summaries for one or more chains.
    Summarize(SummarizeArgs),
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Info(args) => info::run(&args),
        Command::BestFit(args) => best_fit::run(&args),
        Command::Covariance(args) => matrix::run(&args, MatrixKind::Covariance),
        Command::Correlation(args) => matrix::run(&args, MatrixKind::Correlation),
        Command::Export(args) => export::run(&args),
        Command::Summarize(args) => summarize::run(&args),
    }
}
