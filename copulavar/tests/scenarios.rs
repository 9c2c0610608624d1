//! End-to-end scenarios exercised through the façade.

use chrono::NaiveDate;
use copulavar::copulas::{EmpiricalMarginal, GaussianCopula, UniformMatrix, Vine};
use copulavar::core::{Config, PriceSeries, Real, VineTopology};
use copulavar::math::random_numbers::MersenneTwisterUniformRng;
use copulavar::math::statistics::{kendall_tau, std_dev};
use copulavar::math::normal_cdf_inverse;
use copulavar::risk::{run, RiskEngine};
use nalgebra::DMatrix;

/// Correlated normal return series via a Gaussian factor structure.
fn correlated_returns(n_assets: usize, rho: Real, n_obs: usize, seed: u64) -> Vec<Vec<Real>> {
    let corr = DMatrix::from_fn(n_assets, n_assets, |i, j| if i == j { 1.0 } else { rho });
    let copula = GaussianCopula::from_correlation(corr).expect("valid correlation");
    let uniforms = copula.sample(n_obs, seed).expect("sampling");
    (0..n_assets)
        .map(|j| {
            uniforms
                .column(j)
                .into_iter()
                .map(|u| 0.01 * normal_cdf_inverse(u))
                .collect()
        })
        .collect()
}

fn uniforms_from(returns: &[Vec<Real>]) -> UniformMatrix {
    let marginals: Vec<EmpiricalMarginal> = returns
        .iter()
        .enumerate()
        .map(|(i, r)| EmpiricalMarginal::from_returns(&format!("asset{i}"), r).expect("marginal"))
        .collect();
    UniformMatrix::from_marginals(&marginals).expect("uniform matrix")
}

#[test]
fn gaussian_copula_recovers_known_correlation() {
    // three equicorrelated normal return series with rho = 0.6, passed
    // through the empirical CDF, must come back out of the Gaussian copula
    // fit with every off-diagonal entry within 0.05
    let returns = correlated_returns(3, 0.6, 1_000, 20_240_101);
    let uniforms = uniforms_from(&returns);
    let fitted = GaussianCopula::fit(&uniforms).expect("fit");
    for i in 0..3 {
        for j in (i + 1)..3 {
            let rho = fitted.correlation()[(i, j)];
            assert!((rho - 0.6).abs() < 0.05, "recovered rho[{i},{j}] = {rho}");
        }
    }
}

#[test]
fn direct_vine_structure_and_tau_round_trip() {
    let returns = correlated_returns(4, 0.5, 1_500, 77);
    let uniforms = uniforms_from(&returns);
    let vine = Vine::fit(&uniforms, VineTopology::Direct).expect("vine fit");

    let sizes: Vec<usize> = vine.trees().iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![3, 2, 1]);

    // 500 draws must reproduce each tree-0 pair dependence
    let sampled = vine.sample(500, 9).expect("vine sample");
    for edge in &vine.trees()[0] {
        let tau = kendall_tau(&sampled.column(edge.left), &sampled.column(edge.right));
        let fitted = edge.copula.kendall_tau();
        assert!(
            (tau - fitted).abs() < 0.15,
            "pair ({}, {}): sampled tau {tau} vs fitted {fitted}",
            edge.left,
            edge.right
        );
    }
}

#[test]
fn covariance_var_matches_closed_form() {
    let returns = correlated_returns(1, 0.0, 800, 5)[0].clone();
    let engine = RiskEngine::new(5, 0.99, 100_000.0).expect("engine");
    let var = engine.covariance_value_at_risk(&returns).expect("var");

    let sigma = std_dev(&returns).expect("sigma");
    let expected = -normal_cdf_inverse(0.01) * sigma * (5.0_f64).sqrt() * 100_000.0;
    assert!(
        (var - expected).abs() < 1e-9 * expected.abs(),
        "var = {var}, expected = {expected}"
    );
    assert!(var > 0.0);
}

#[test]
fn full_run_is_deterministic_and_complete() {
    let mut rng = MersenneTwisterUniformRng::new(321);
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).expect("date");
    let mut series = vec![PriceSeries::new(); 3];
    let mut levels = [100.0_f64; 3];
    for day in 0..250 {
        let date = start + chrono::Days::new(day);
        let common = normal_cdf_inverse(rng.next_open01());
        for (a, s) in series.iter_mut().enumerate() {
            let own = normal_cdf_inverse(rng.next_open01());
            levels[a] *= (0.012 * (0.6 * common + 0.4 * own)).exp();
            s.insert(date, levels[a]);
        }
    }

    let config = Config {
        tickers: vec!["A".into(), "B".into(), "C".into()],
        window: 5,
        confidence_interval: 0.99,
        portfolio_value: 100_000.0,
        vine_topology: VineTopology::Regular,
    };
    let prices: Vec<(&str, &PriceSeries)> =
        vec![("A", &series[0]), ("B", &series[1]), ("C", &series[2])];

    let first = run(&config, &prices, 42).expect("run");
    let second = run(&config, &prices, 42).expect("run");
    assert_eq!(first.results, second.results);

    assert!(first.failures.is_empty(), "{:?}", first.failures);
    for model in ["covariance", "gaussian", "vine_regular", "clayton_pairwise"] {
        let var = first.value_at_risk(model);
        assert!(var.is_some(), "missing {model}");
        assert!(var.is_some_and(|v| v > 0.0), "non-positive VaR for {model}");
    }
}
