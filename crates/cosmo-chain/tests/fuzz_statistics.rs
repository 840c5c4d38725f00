use cosmo_chain::{Chain, ParameterCatalog, SamplerFormat};
use ndarray::Array2;
use proptest::prelude::*;

const LOG_PARAM: &str = "\
data.parameters['a'] = [0, None, None, 1, 1, 'cosmo']
data.parameters['b'] = [0, None, None, 1, 1, 'cosmo']
data.parameters['c'] = [0, None, None, 0, 1, 'derived']
";

fn rows() -> impl Strategy<Value = Vec<[f64; 5]>> {
    prop::collection::vec(
        (1u32..5, 0.0f64..100.0, -5.0f64..5.0, -5.0f64..5.0, -5.0f64..5.0).prop_map(
            |(m, l, a, b, c)| [f64::from(m), l, a, b, c + 0.5 * a],
        ),
        2..40,
    )
}

fn chain(rows: &[[f64; 5]]) -> Chain {
    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    let points = Array2::from_shape_vec((rows.len(), 5), flat).unwrap();
    let catalog = ParameterCatalog::from_log_param(LOG_PARAM).unwrap();
    Chain::from_points("fuzz", SamplerFormat::MontePython, catalog, points).unwrap()
}

proptest! {
    #[test]
    fn covariance_is_symmetric_and_correlation_bounded(rows in rows()) {
        let chain = chain(&rows);
        let covariance = chain.covariance().unwrap();
        prop_assert_eq!(covariance, &covariance.t());
        let correlation = chain.correlation().unwrap();
        for i in 0..correlation.nrows() {
            prop_assert_eq!(correlation[(i, i)], 1.0);
            for j in 0..correlation.ncols() {
                let value = correlation[(i, j)];
                prop_assert!(value.is_nan() || value.abs() <= 1.0 + 1e-9);
            }
        }
    }

    #[test]
    fn best_fit_is_sorted_and_minimal(rows in rows(), k in 1usize..10) {
        let chain = chain(&rows);
        let best = chain.best_fit_of(k, "mloglik").unwrap();
        prop_assert_eq!(best.len(), k.min(rows.len()));
        prop_assert!(best.windows(2).all(|pair| pair[0] <= pair[1]));
        let floor = rows.iter().map(|row| row[1]).fold(f64::INFINITY, f64::min);
        prop_assert_eq!(best[0], floor);
    }

    #[test]
    fn parameter_sequences_are_disjoint(rows in rows()) {
        let chain = chain(&rows);
        for name in chain.varying_parameters() {
            prop_assert!(!chain.derived_parameters().contains(name));
        }
        prop_assert_eq!(chain.parameters().len() + 2, chain.points().ncols());
    }
}
