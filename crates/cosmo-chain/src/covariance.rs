use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use cosmo_core::errors::ErrorInfo;
use cosmo_core::{CosmoError, CosmoResult};
use ndarray::{s, Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::loader::parse_table;

/// Where the covariance matrix of a chain comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CovarianceSource {
    /// Use the precomputed artifact when it exists, otherwise the weighted sample.
    #[default]
    Auto,
    /// Require the precomputed artifact.
    Artifact,
    /// Always compute from the weighted sample.
    Sample,
}

/// Provenance of a cached covariance matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "path", rename_all = "kebab-case")]
pub enum CovarianceOrigin {
    /// Read from a precomputed file.
    Artifact(PathBuf),
    /// Computed from the chain's weighted samples.
    Sample,
}

/// Covariance matrix together with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Covariance {
    /// Square matrix ordered as varying then derived parameters.
    pub matrix: Array2<f64>,
    /// Source of the matrix.
    pub origin: CovarianceOrigin,
}

fn total_weight(points: &ArrayView2<'_, f64>) -> CosmoResult<Array1<f64>> {
    let multiplicity = points.column(0);
    let total = multiplicity.sum();
    if !(total > 0.0) {
        return Err(CosmoError::EmptyChain(
            ErrorInfo::new("chain-weight", "chain has no positive total multiplicity")
                .with_context("total", total.to_string()),
        ));
    }
    Ok(multiplicity.mapv(|m| m / total))
}

/// Weighted means of every parameter column of a point matrix.
///
/// `points` uses the chain layout `[multiplicity, mloglik, parameters...]`.
pub fn weighted_means(points: ArrayView2<'_, f64>) -> CosmoResult<Array1<f64>> {
    let weights = total_weight(&points)?;
    Ok(weights.dot(&points.slice(s![.., 2..])))
}

/// Covariance of the parameter columns under the multiplicity weights.
///
/// With `w_i = m_i / Σ m`, the entry for `(p, q)` is
/// `Σ w_i (x_ip - mean_p)(x_iq - mean_q)`. The result is exactly symmetric.
pub fn weighted_covariance(points: ArrayView2<'_, f64>) -> CosmoResult<Array2<f64>> {
    let weights = total_weight(&points)?;
    let params = points.slice(s![.., 2..]);
    let means = weights.dot(&params);
    let centered = &params - &means;
    let weighted = &centered * &weights.view().insert_axis(Axis(1));
    let mut covariance = centered.t().dot(&weighted);
    let dim = covariance.nrows();
    for p in 0..dim {
        for q in (p + 1)..dim {
            covariance[(q, p)] = covariance[(p, q)];
        }
    }
    Ok(covariance)
}

/// Normalizes a covariance matrix into a correlation matrix with a unit diagonal.
pub fn correlation_from(covariance: &Array2<f64>) -> Array2<f64> {
    let dim = covariance.nrows();
    Array2::from_shape_fn((dim, dim), |(i, j)| {
        if i == j {
            1.0
        } else {
            covariance[(i, j)] / (covariance[(i, i)] * covariance[(j, j)]).sqrt()
        }
    })
}

/// Reads a precomputed square covariance matrix of dimension `dim`.
pub fn load_artifact(path: &Path, dim: usize) -> CosmoResult<Array2<f64>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(CosmoError::MissingArtifact(
                ErrorInfo::new("covmat-missing", "covariance matrix file was not found")
                    .with_path(path)
                    .with_hint("the chain may never have been analysed; use the sample covariance"),
            ))
        }
        Err(err) => return Err(CosmoError::io("covmat-read", path, err)),
    };
    let matrix = parse_table(&text).map_err(|err| match err {
        CosmoError::MalformedChain(info) => CosmoError::MalformedChain(info.with_path(path)),
        other => other,
    })?;
    if matrix.nrows() != dim || matrix.ncols() != dim {
        return Err(CosmoError::MalformedChain(
            ErrorInfo::new(
                "covmat-shape",
                "covariance matrix does not match the parameter count",
            )
            .with_path(path)
            .with_context("expected", format!("{dim}x{dim}"))
            .with_context("found", format!("{}x{}", matrix.nrows(), matrix.ncols())),
        ));
    }
    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn multiplicity_acts_as_repeat_count() {
        let weighted = array![[2.0, 0.0, 1.0], [1.0, 0.0, 4.0]];
        let expanded = array![[1.0, 0.0, 1.0], [1.0, 0.0, 1.0], [1.0, 0.0, 4.0]];
        let a = weighted_covariance(weighted.view()).unwrap();
        let b = weighted_covariance(expanded.view()).unwrap();
        assert!((a[(0, 0)] - b[(0, 0)]).abs() < 1e-12);
        assert!((a[(0, 0)] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn zero_weight_is_rejected() {
        let points = array![[0.0, 1.0, 1.0]];
        assert!(matches!(
            weighted_covariance(points.view()),
            Err(CosmoError::EmptyChain(_))
        ));
    }
}
