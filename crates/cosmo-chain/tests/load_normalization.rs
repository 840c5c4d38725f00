use std::fs;
use std::path::Path;

use cosmo_chain::{loader, Chain, ChainConfig, ParameterCatalog, SamplerFormat};
use cosmo_core::CosmoError;
use tempfile::tempdir;

const LOG_PARAM: &str = "\
data.parameters['omega_b'] = [2.2, None, None, 0.01, 5, 'cosmo']
data.parameters['n_s']     = [0.96, 0.8, 1.2, 0.004, 1, 'cosmo']
data.parameters['H0']      = [0, None, None, 0, 1, 'derived']
";

const INPUTPARAMS: &str = "\
param[omegabh2] = 0.0221 0.005 0.1 0.0001 0.0001
param[ns] = 0.96 0.8 1.2 0.004 0.002
";

const PARAMNAMES: &str = "\
omegabh2   \\Omega_b h^2
ns         n_s
H0*        H_0
";

fn write(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).unwrap();
}

fn montepython_dir(chains: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempdir().unwrap();
    write(dir.path(), "log.param", LOG_PARAM);
    for (name, contents) in chains {
        write(dir.path(), name, contents);
    }
    dir
}

fn cosmomc_dir(chains: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempdir().unwrap();
    write(dir.path(), "base.inputparams", INPUTPARAMS);
    write(dir.path(), "base.paramnames", PARAMNAMES);
    for (name, contents) in chains {
        write(dir.path(), name, contents);
    }
    dir
}

#[test]
fn scale_factor_is_applied_to_parameter_columns() {
    let dir = montepython_dir(&[("2024-01-01_1000__1.txt", "1 10.0 2.0 0.96 67.0\n")]);
    let chain = Chain::open(&ChainConfig::new(dir.path())).unwrap();
    assert_eq!(chain.values("omega_b").unwrap()[0], 10.0);
    assert_eq!(chain.values("n_s").unwrap()[0], 0.96);
    assert_eq!(chain.values("mloglik").unwrap()[0], 10.0);
}

#[test]
fn empty_files_do_not_change_the_point_matrix() {
    let rows = "1 5.0 2.0 0.95 66.0\n3 1.0 2.1 0.97 68.0\n";
    let single = montepython_dir(&[("a.txt", rows)]);
    let padded = montepython_dir(&[("a.txt", rows), ("b.txt", ""), ("c.txt", ""), ("d.txt", "")]);

    let single_chain = Chain::open(&ChainConfig::new(single.path())).unwrap();
    let padded_chain = Chain::open(&ChainConfig::new(padded.path())).unwrap();
    assert_eq!(single_chain.points(), padded_chain.points());
    assert_eq!(padded_chain.files().len(), 4);
}

#[test]
fn comment_only_file_aborts_the_load() {
    let dir = montepython_dir(&[
        ("a.txt", "1 5.0 2.0 0.95 66.0\n"),
        ("b.txt", "\n   \n# truncated header\n"),
    ]);
    let err = Chain::open(&ChainConfig::new(dir.path())).unwrap_err();
    assert!(matches!(err, CosmoError::MalformedChain(_)));
    assert_eq!(err.info().code, "chain-no-rows");
    assert!(err.info().context["path"].ends_with("b.txt"));
}

#[test]
fn nested_samplers_halve_the_likelihood_column() {
    for format in [SamplerFormat::MultiNest, SamplerFormat::PolyChord] {
        let dir = cosmomc_dir(&[("base.txt", "0.5 8.0 0.022 0.96 67.0\n")]);
        let config = ChainConfig::new(dir.path())
            .with_format(format)
            .with_prefix("base");
        let chain = Chain::open(&config).unwrap();
        assert_eq!(chain.values("mloglik").unwrap()[0], 4.0, "{format}");
    }
}

#[test]
fn metropolis_cosmomc_keeps_the_likelihood_column() {
    let dir = cosmomc_dir(&[
        ("base_1.txt", "2 8.0 0.022 0.96 67.0\n"),
        ("base_2.txt", "1 9.0 0.023 0.95 68.0\n"),
        ("base.txt", "1 1.0 0.023 0.95 68.0\n"),
    ]);
    let config = ChainConfig::new(dir.path())
        .with_format(SamplerFormat::CosmoMc)
        .with_prefix("base");
    let chain = Chain::open(&config).unwrap();
    assert_eq!(chain.len(), 2);
    assert_eq!(chain.values("mloglik").unwrap().to_vec(), vec![8.0, 9.0]);
    assert_eq!(chain.name(), "base");
    assert_eq!(chain.derived_parameters(), ["H0"]);
}

#[test]
fn cosmomc_without_prefix_is_a_config_error() {
    let dir = cosmomc_dir(&[("base_1.txt", "1 1 1 1 1\n")]);
    let config = ChainConfig::new(dir.path()).with_format(SamplerFormat::CosmoMc);
    assert!(matches!(Chain::open(&config), Err(CosmoError::Config(_))));
}

#[test]
fn differing_column_counts_are_malformed() {
    let dir = montepython_dir(&[
        ("a.txt", "1 5.0 2.0 0.95 66.0\n"),
        ("b.txt", "1 5.0 2.0 0.95\n"),
    ]);
    let err = Chain::open(&ChainConfig::new(dir.path())).unwrap_err();
    assert!(matches!(err, CosmoError::MalformedChain(_)));
    assert_eq!(err.info().code, "chain-columns");
}

#[test]
fn ragged_rows_within_a_file_are_malformed() {
    let dir = montepython_dir(&[("a.txt", "1 5.0 2.0 0.95 66.0\n1 5.0 2.0\n")]);
    let err = Chain::open(&ChainConfig::new(dir.path())).unwrap_err();
    assert_eq!(err.info().code, "chain-ragged");
    assert!(err.info().context.contains_key("path"));
}

#[test]
fn only_empty_files_is_an_empty_chain() {
    let dir = montepython_dir(&[("a.txt", ""), ("b.txt", "")]);
    let err = Chain::open(&ChainConfig::new(dir.path())).unwrap_err();
    assert!(matches!(err, CosmoError::EmptyChain(_)));
}

#[test]
fn no_sample_files_is_an_empty_chain() {
    let dir = montepython_dir(&[]);
    assert!(matches!(
        Chain::open(&ChainConfig::new(dir.path())),
        Err(CosmoError::EmptyChain(_))
    ));
}

#[test]
fn discovery_is_lexicographic() {
    let dir = cosmomc_dir(&[
        ("base_2.txt", "1 1 1 1 1\n"),
        ("base_10.txt", "1 1 1 1 1\n"),
        ("base_1.txt", "1 1 1 1 1\n"),
        ("notes.md", "ignored"),
    ]);
    let files = SamplerFormat::CosmoMc
        .discover(dir.path(), Some("base"))
        .unwrap();
    let names: Vec<_> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["base_1.txt", "base_10.txt", "base_2.txt"]);
}

#[test]
fn loader_checks_width_against_catalog() {
    let dir = montepython_dir(&[("a.txt", "1 5.0 2.0\n")]);
    let catalog = ParameterCatalog::from_log_param(LOG_PARAM).unwrap();
    let files = vec![dir.path().join("a.txt")];
    let err = loader::load(&files, &catalog, SamplerFormat::MontePython).unwrap_err();
    assert_eq!(err.info().context["expected"], "5");
    assert_eq!(err.info().context["found"], "3");
}

#[test]
fn comment_lines_are_skipped() {
    let table = loader::parse_table("# header\n\n1 2 3\n4 5 6\n").unwrap();
    assert_eq!(table.shape(), &[2, 3]);
    assert_eq!(table[(1, 2)], 6.0);
}

#[test]
fn digest_depends_on_contents() {
    let first = montepython_dir(&[("a.txt", "1 5.0 2.0 0.95 66.0\n")]);
    let second = montepython_dir(&[("a.txt", "1 5.0 2.0 0.95 66.5\n")]);
    let a = loader::digest(&[first.path().join("a.txt")]).unwrap();
    let b = loader::digest(&[second.path().join("a.txt")]).unwrap();
    assert_eq!(a.len(), 64);
    assert_ne!(a, b);
}
