use std::error::Error;
use std::fmt::Write as _;
use std::path::PathBuf;

use clap::Args;
use ndarray::Array2;

use super::{emit, split_params, ChainArgs};

#[derive(Args, Debug)]
pub struct MatrixArgs {
    #[command(flatten)]
    pub chain: ChainArgs,
    /// Comma separated parameters to restrict the matrix to, in output order.
    #[arg(long)]
    pub params: Option<String>,
    /// Write the matrix to this file instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy)]
pub enum MatrixKind {
    Covariance,
    Correlation,
}

pub fn run(args: &MatrixArgs, kind: MatrixKind) -> Result<(), Box<dyn Error>> {
    let (_, chain) = args.chain.open()?;
    let params = match &args.params {
        Some(list) => split_params(list),
        None => chain.parameters(),
    };
    let matrix = match kind {
        MatrixKind::Correlation => chain.correlation_subset(&params)?,
        MatrixKind::Covariance => {
            let mut matrix = Array2::zeros((params.len(), params.len()));
            for (i, p1) in params.iter().enumerate() {
                for (j, p2) in params.iter().enumerate() {
                    matrix[(i, j)] = chain.covariance_of(p1, p2)?;
                }
            }
            matrix
        }
    };

    let mut text = String::new();
    writeln!(text, "# {}", params.join(" "))?;
    for row in matrix.rows() {
        let cells: Vec<String> = row.iter().map(|value| format!("{value:.6e}")).collect();
        writeln!(text, "{}", cells.join(" "))?;
    }
    emit(args.out.as_deref(), &text)
}
