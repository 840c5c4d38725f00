use std::fs;
use std::path::{Path, PathBuf};

use cosmo_core::errors::ErrorInfo;
use cosmo_core::{CosmoError, CosmoResult};
use ndarray::{concatenate, Array2, ArrayView2, Axis};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::catalog::ParameterCatalog;
use crate::format::SamplerFormat;

/// Reads a whitespace-delimited numeric table.
///
/// Zero-byte files are an ordinary outcome of unfinished sampler runs and
/// yield `Ok(None)`. Blank lines and `#` comments are skipped, so a file made
/// only of those parses to a table with no rows.
pub fn read_table(path: &Path) -> CosmoResult<Option<Array2<f64>>> {
    let metadata = fs::metadata(path).map_err(|err| CosmoError::io("chain-stat", path, err))?;
    if metadata.len() == 0 {
        return Ok(None);
    }
    let text = fs::read_to_string(path).map_err(|err| CosmoError::io("chain-read", path, err))?;
    parse_table(&text)
        .map(Some)
        .map_err(|err| attach_path(err, path))
}

/// Parses the textual contents of a chain file.
pub fn parse_table(text: &str) -> CosmoResult<Array2<f64>> {
    let mut width: Option<usize> = None;
    let mut values = Vec::new();
    let mut rows = 0usize;
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let start = values.len();
        for token in line.split_whitespace() {
            let value = token.parse::<f64>().map_err(|_| {
                CosmoError::MalformedChain(
                    ErrorInfo::new("chain-value", "non-numeric value in chain file")
                        .with_context("line", (idx + 1).to_string())
                        .with_context("token", token),
                )
            })?;
            values.push(value);
        }
        let row_width = values.len() - start;
        match width {
            None => width = Some(row_width),
            Some(expected) if expected != row_width => {
                return Err(CosmoError::MalformedChain(
                    ErrorInfo::new("chain-ragged", "rows have differing column counts")
                        .with_context("line", (idx + 1).to_string())
                        .with_context("expected", expected.to_string())
                        .with_context("found", row_width.to_string()),
                ));
            }
            Some(_) => {}
        }
        rows += 1;
    }
    let width = width.unwrap_or(0);
    Array2::from_shape_vec((rows, width), values).map_err(|err| {
        CosmoError::MalformedChain(ErrorInfo::new("chain-shape", err.to_string()))
    })
}

fn attach_path(err: CosmoError, path: &Path) -> CosmoError {
    match err {
        CosmoError::MalformedChain(info) => CosmoError::MalformedChain(info.with_path(path)),
        other => other,
    }
}

/// Loads, validates and concatenates the sample files of one chain.
///
/// The returned matrix has the layout `[multiplicity, mloglik, parameters...]`
/// with the format's scaling and likelihood conventions already applied.
pub fn load(
    files: &[PathBuf],
    catalog: &ParameterCatalog,
    format: SamplerFormat,
) -> CosmoResult<Array2<f64>> {
    let expected = catalog.column_count();
    let mut tables = Vec::with_capacity(files.len());
    for path in files {
        let Some(table) = read_table(path)? else {
            debug!(path = %path.display(), "skipping empty chain file");
            continue;
        };
        if table.nrows() == 0 {
            return Err(CosmoError::MalformedChain(
                ErrorInfo::new("chain-no-rows", "non-empty chain file holds no sample rows")
                    .with_path(path),
            ));
        }
        if table.ncols() != expected {
            return Err(CosmoError::MalformedChain(
                ErrorInfo::new(
                    "chain-columns",
                    "chain file column count does not match the parameter catalog",
                )
                .with_path(path)
                .with_context("expected", expected.to_string())
                .with_context("found", table.ncols().to_string()),
            ));
        }
        tables.push(table);
    }

    if tables.is_empty() {
        return Err(CosmoError::EmptyChain(
            ErrorInfo::new("chain-empty", "no sample rows found in any chain file")
                .with_context("files", files.len().to_string()),
        ));
    }

    let views: Vec<ArrayView2<'_, f64>> = tables.iter().map(|table| table.view()).collect();
    let mut points = concatenate(Axis(0), &views).map_err(|err| {
        CosmoError::MalformedChain(ErrorInfo::new("chain-concatenate", err.to_string()))
    })?;
    format.normalize(&mut points, catalog)?;
    info!(
        format = %format,
        files = tables.len(),
        rows = points.nrows(),
        columns = points.ncols(),
        "chain loaded"
    );
    Ok(points)
}

/// SHA-256 digest over the names and contents of the given files.
pub fn digest(files: &[PathBuf]) -> CosmoResult<String> {
    let mut hasher = Sha256::new();
    for path in files {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        hasher.update(name.as_bytes());
        hasher.update([0u8]);
        let bytes = fs::read(path).map_err(|err| CosmoError::io("chain-read", path, err))?;
        hasher.update(&bytes);
    }
    Ok(format!("{:x}", hasher.finalize()))
}
