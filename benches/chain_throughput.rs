use std::fmt::Write as _;
use std::fs;

use cosmo_chain::{Chain, ChainConfig, CovarianceSource};
use criterion::{criterion_group, criterion_main, Criterion};
use tempfile::TempDir;

const LOG_PARAM: &str = "\
data.parameters['omega_b']  = [2.2377, None, None, 0.015, 0.01, 'cosmo']
data.parameters['omega_cdm'] = [0.12, None, None, 0.0013, 1, 'cosmo']
data.parameters['n_s']      = [0.9649, 0.8, 1.2, 0.0042, 1, 'cosmo']
data.parameters['tau_reio'] = [0.0544, 0.004, None, 0.008, 1, 'cosmo']
data.parameters['A_planck'] = [1.0, 0.9, 1.1, 0.0025, 1, 'nuisance']
data.parameters['H0']       = [0, None, None, 0, 1, 'derived']
data.parameters['sigma8']   = [0, None, None, 0, 1, 'derived']
";

fn fixture(files: usize, rows: usize) -> TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("log.param"), LOG_PARAM).expect("log.param");
    for file in 0..files {
        let mut contents = String::new();
        for row in 0..rows {
            let t = (file * rows + row) as f64;
            writeln!(
                contents,
                "{} {:.6} {:.6} {:.6} {:.6} {:.6} {:.6} {:.6} {:.6}",
                1 + row % 3,
                500.0 + (t * 0.37).sin() * 10.0,
                2.2 + (t * 0.11).cos() * 0.02,
                0.12 + (t * 0.13).sin() * 0.001,
                0.965 + (t * 0.17).cos() * 0.004,
                0.054 + (t * 0.19).sin() * 0.007,
                1.0 + (t * 0.23).cos() * 0.002,
                67.4 + (t * 0.29).sin() * 0.5,
                0.81 + (t * 0.31).cos() * 0.006,
            )
            .expect("format row");
        }
        fs::write(dir.path().join(format!("run__{file}.txt")), contents).expect("chain file");
    }
    dir
}

fn bench_chain(c: &mut Criterion) {
    let dir = fixture(4, 2_500);
    let config = ChainConfig::new(dir.path()).with_covariance(CovarianceSource::Sample);

    c.bench_function("chain_open", |b| {
        b.iter(|| {
            let _ = Chain::open(&config).expect("open");
        });
    });

    c.bench_function("chain_best_fit_and_covariance", |b| {
        b.iter(|| {
            let chain = Chain::open(&config).expect("open");
            let _ = chain.best_fit(10);
            let _ = chain.correlation().expect("correlation");
        });
    });
}

criterion_group!(benches, bench_chain);
criterion_main!(benches);
