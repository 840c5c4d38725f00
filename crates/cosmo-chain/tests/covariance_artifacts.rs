use std::fs;
use std::path::Path;

use cosmo_chain::{Chain, ChainConfig, ChainSummary, CovarianceOrigin, CovarianceSource};
use cosmo_core::CosmoError;
use tempfile::tempdir;

const LOG_PARAM: &str = "\
data.parameters['omega_b'] = [2.2, None, None, 0.01, 1, 'cosmo']
data.parameters['n_s']     = [0.96, 0.8, 1.2, 0.004, 1, 'cosmo']
data.parameters['H0']      = [0, None, None, 0, 1, 'derived']
";

const ROWS: &str = "\
1 5.0 2.20 0.960 67.0
2 3.0 2.25 0.970 68.0
1 4.0 2.10 0.955 66.5
";

const COVMAT: &str = "\
# omega_b n_s H0
1.0 0.1 0.2
0.1 2.0 0.3
0.2 0.3 3.0
";

fn chain_dir() -> tempfile::TempDir {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("log.param"), LOG_PARAM).unwrap();
    fs::write(dir.path().join("2024-03-01_5000__1.txt"), ROWS).unwrap();
    dir
}

fn write_covmat(dir: &Path, contents: &str) {
    let name = dir.file_name().unwrap().to_string_lossy().into_owned();
    fs::write(dir.join(format!("{name}.covmat")), contents).unwrap();
}

#[test]
fn artifact_takes_precedence_when_present() {
    let dir = chain_dir();
    write_covmat(dir.path(), COVMAT);
    let chain = Chain::open(&ChainConfig::new(dir.path())).unwrap();
    assert_eq!(chain.variance("n_s").unwrap(), 2.0);
    assert_eq!(chain.covariance_of("omega_b", "H0").unwrap(), 0.2);
    assert!(matches!(
        chain.covariance_origin().unwrap(),
        CovarianceOrigin::Artifact(_)
    ));
}

#[test]
fn auto_falls_back_to_the_weighted_sample() {
    let dir = chain_dir();
    let chain = Chain::open(&ChainConfig::new(dir.path())).unwrap();
    assert_eq!(chain.covariance_origin().unwrap(), &CovarianceOrigin::Sample);
    assert!(chain.variance("omega_b").unwrap() > 0.0);
}

#[test]
fn sample_policy_ignores_the_artifact() {
    let dir = chain_dir();
    write_covmat(dir.path(), COVMAT);
    let config = ChainConfig::new(dir.path()).with_covariance(CovarianceSource::Sample);
    let chain = Chain::open(&config).unwrap();
    assert_eq!(chain.covariance_origin().unwrap(), &CovarianceOrigin::Sample);
}

#[test]
fn artifact_policy_requires_the_file() {
    let dir = chain_dir();
    let config = ChainConfig::new(dir.path()).with_covariance(CovarianceSource::Artifact);
    let chain = Chain::open(&config).unwrap();
    let err = chain.covariance().unwrap_err();
    assert!(matches!(err, CosmoError::MissingArtifact(_)));
    assert!(err.info().hint.is_some());
}

#[test]
fn artifact_of_the_wrong_dimension_is_malformed() {
    let dir = chain_dir();
    write_covmat(dir.path(), "1.0 0.0\n0.0 1.0\n");
    let chain = Chain::open(&ChainConfig::new(dir.path())).unwrap();
    let err = chain.covariance().unwrap_err();
    assert_eq!(err.info().code, "covmat-shape");
    assert_eq!(err.info().context["expected"], "3x3");
}

#[test]
fn yaml_config_resolves_relative_folders() {
    let root = tempdir().unwrap();
    let chains = root.path().join("chains/lcdm");
    fs::create_dir_all(&chains).unwrap();
    fs::write(chains.join("log.param"), LOG_PARAM).unwrap();
    fs::write(chains.join("run_1.txt"), ROWS).unwrap();
    let config_path = root.path().join("chain.yaml");
    fs::write(
        &config_path,
        "folder: chains/lcdm\nlabels:\n  n_s: \"$n_s$\"\n  sigma8: \"$\\\\sigma_8$\"\ncovariance: sample\n",
    )
    .unwrap();

    let config = ChainConfig::load(&config_path).unwrap();
    assert_eq!(config.folder, chains);
    assert_eq!(config.covariance, CovarianceSource::Sample);
    let chain = Chain::open(&config).unwrap();
    assert_eq!(chain.name(), "lcdm");
    assert_eq!(chain.label_of("n_s").unwrap(), "$n_s$");
}

#[test]
fn summary_round_trips_through_json() {
    let dir = chain_dir();
    let chain = Chain::open(&ChainConfig::new(dir.path())).unwrap();
    let summary = ChainSummary::from_chain(&chain, 2).unwrap();
    assert_eq!(summary.rows, 3);
    assert_eq!(summary.total_multiplicity, 4.0);
    assert_eq!(summary.best_fit_mloglik, vec![3.0, 4.0]);
    assert_eq!(summary.parameters.len(), 3);
    assert!(summary.parameters[2].bounds.is_none());
    assert_eq!(summary.provenance.input_hash.len(), 64);
    assert_eq!(summary.provenance.sampler, "montepython");

    let out = tempdir().unwrap();
    let path = out.path().join("reports/summary.json");
    summary.write(&path).unwrap();
    let loaded = ChainSummary::load(&path).unwrap();
    assert_eq!(loaded.name, summary.name);
    assert_eq!(loaded.files, summary.files);
    assert_eq!(loaded.best_fit_mloglik, summary.best_fit_mloglik);
    assert_eq!(loaded.covariance, summary.covariance);
    assert_eq!(loaded.provenance, summary.provenance);
    for (a, b) in loaded.parameters.iter().zip(&summary.parameters) {
        assert_eq!(a.name, b.name);
        assert_eq!(a.class, b.class);
        assert_eq!(a.bounds, b.bounds);
        assert!((a.mean - b.mean).abs() < 1e-12);
    }
}
