//! Portfolio positions and value-at-risk computation.

use cvar_core::errors::{Error, Result};
use cvar_core::{ensure, Real};
use cvar_math::normal_cdf_inverse;
use cvar_math::statistics::{percentile, rolling_sum, std_dev};
use nalgebra::DMatrix;

/// One asset position.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    /// Asset identifier.
    pub ticker: String,
    /// Number of shares held.
    pub shares: Real,
    /// Price the position was sized at.
    pub last_price: Real,
}

/// A long-only portfolio of share positions.
#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    positions: Vec<Position>,
}

impl Portfolio {
    /// Allocate `total` equally in dollars across the given assets:
    /// each position holds `(total / n) / price` shares.
    pub fn equal_dollar(last_prices: &[(String, Real)], total: Real) -> Result<Self> {
        ensure!(!last_prices.is_empty(), "portfolio needs at least one asset");
        ensure!(total > 0.0, "portfolio value must be positive, got {total}");
        let per_asset = total / last_prices.len() as Real;
        let mut positions = Vec::with_capacity(last_prices.len());
        for (ticker, price) in last_prices {
            ensure!(
                *price > 0.0,
                "last price of {ticker} must be positive, got {price}"
            );
            positions.push(Position {
                ticker: ticker.clone(),
                shares: per_asset / price,
                last_price: *price,
            });
        }
        Ok(Self { positions })
    }

    /// The positions, in construction order.
    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    /// Current dollar value: `Σ shares · price`.
    pub fn value(&self) -> Real {
        self.positions
            .iter()
            .map(|p| p.shares * p.last_price)
            .sum()
    }

    /// Dollar weight of each position.
    pub fn weights(&self) -> Vec<Real> {
        let total = self.value();
        self.positions
            .iter()
            .map(|p| p.shares * p.last_price / total)
            .collect()
    }

    /// Weighted portfolio return per row of an asset-return matrix whose
    /// columns follow the position order.
    pub fn portfolio_returns(&self, asset_returns: &DMatrix<Real>) -> Result<Vec<Real>> {
        ensure!(
            asset_returns.ncols() == self.positions.len(),
            "return matrix has {} columns for {} positions",
            asset_returns.ncols(),
            self.positions.len()
        );
        let weights = self.weights();
        let mut out = Vec::with_capacity(asset_returns.nrows());
        for row in 0..asset_returns.nrows() {
            let r = (0..weights.len())
                .map(|j| weights[j] * asset_returns[(row, j)])
                .sum();
            out.push(r);
        }
        Ok(out)
    }
}

/// One model's risk assessment: the dollar VaR and the rolling-window
/// return distribution it was taken from.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskResult {
    /// Model name, e.g. `"gaussian"` or `"vine_direct"`.
    pub model: String,
    /// Value at risk as a positive dollar loss.
    pub value_at_risk: Real,
    /// Rolling holding-period returns the percentile was taken over.
    pub rolling_returns: Vec<Real>,
}

/// Rolling-window percentile VaR.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskEngine {
    window: usize,
    confidence: Real,
    portfolio_value: Real,
}

impl RiskEngine {
    /// Create an engine for a holding period of `window` observations at the
    /// given confidence level (e.g. 0.99) and portfolio dollar value.
    pub fn new(window: usize, confidence: Real, portfolio_value: Real) -> Result<Self> {
        ensure!(window > 0, "window must be positive");
        ensure!(
            confidence > 0.0 && confidence < 1.0,
            "confidence must be in (0, 1), got {confidence}"
        );
        ensure!(
            portfolio_value > 0.0,
            "portfolio value must be positive, got {portfolio_value}"
        );
        Ok(Self {
            window,
            confidence,
            portfolio_value,
        })
    }

    /// The holding-period window length.
    pub fn window(&self) -> usize {
        self.window
    }

    /// Value at risk of a (simulated or historical) portfolio return series.
    ///
    /// Returns are summed over rolling windows of the holding period, the
    /// `1 − confidence` percentile of those sums is taken, and the loss is
    /// expressed as a positive dollar amount.
    pub fn value_at_risk(&self, portfolio_returns: &[Real]) -> Result<Real> {
        Ok(self.assess("", portfolio_returns)?.value_at_risk)
    }

    /// Full assessment of one model's portfolio return series, keeping the
    /// rolling return distribution alongside the VaR.
    pub fn assess(&self, model: &str, portfolio_returns: &[Real]) -> Result<RiskResult> {
        let rolling_returns = rolling_sum(portfolio_returns, self.window)?;
        let q = 100.0 * (1.0 - self.confidence);
        let quantile = percentile(&rolling_returns, q)?;
        Ok(RiskResult {
            model: model.to_string(),
            value_at_risk: -quantile * self.portfolio_value,
            rolling_returns,
        })
    }

    /// Variance-covariance baseline on a historical portfolio return series:
    /// `−Φ⁻¹(1 − confidence) · σ · √window · value`, reported with the
    /// historical rolling returns.
    pub fn covariance_assess(&self, portfolio_returns: &[Real]) -> Result<RiskResult> {
        let sigma = std_dev(portfolio_returns).ok_or(Error::InsufficientData {
            context: "covariance VaR".into(),
            observations: portfolio_returns.len(),
            required: 2,
        })?;
        let z = normal_cdf_inverse(1.0 - self.confidence);
        Ok(RiskResult {
            model: "covariance".to_string(),
            value_at_risk: -z * sigma * (self.window as Real).sqrt() * self.portfolio_value,
            rolling_returns: rolling_sum(portfolio_returns, self.window)?,
        })
    }

    /// Variance-covariance baseline VaR without the rolling series.
    pub fn covariance_value_at_risk(&self, portfolio_returns: &[Real]) -> Result<Real> {
        Ok(self.covariance_assess(portfolio_returns)?.value_at_risk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn equal_dollar_allocation() {
        let p = Portfolio::equal_dollar(
            &[("A".into(), 50.0), ("B".into(), 200.0)],
            100_000.0,
        )
        .unwrap();
        assert_relative_eq!(p.positions()[0].shares, 1_000.0);
        assert_relative_eq!(p.positions()[1].shares, 250.0);
        assert_relative_eq!(p.value(), 100_000.0);
        let w = p.weights();
        assert_relative_eq!(w[0], 0.5);
        assert_relative_eq!(w[1], 0.5);
    }

    #[test]
    fn equal_dollar_rejects_bad_inputs() {
        assert!(Portfolio::equal_dollar(&[], 1.0).is_err());
        assert!(Portfolio::equal_dollar(&[("A".into(), 0.0)], 1.0).is_err());
        assert!(Portfolio::equal_dollar(&[("A".into(), 1.0)], 0.0).is_err());
    }

    #[test]
    fn portfolio_returns_are_weighted_sums() {
        let p = Portfolio::equal_dollar(
            &[("A".into(), 10.0), ("B".into(), 10.0)],
            100.0,
        )
        .unwrap();
        let returns = DMatrix::from_row_slice(2, 2, &[0.02, -0.02, 0.01, 0.03]);
        let pr = p.portfolio_returns(&returns).unwrap();
        assert_relative_eq!(pr[0], 0.0);
        assert_relative_eq!(pr[1], 0.02);

        let wrong = DMatrix::from_row_slice(1, 3, &[0.1, 0.1, 0.1]);
        assert!(p.portfolio_returns(&wrong).is_err());
    }

    #[test]
    fn var_of_known_sample() {
        // window 1 reduces to a plain percentile of the returns
        let engine = RiskEngine::new(1, 0.95, 1_000.0).unwrap();
        let returns: Vec<Real> = (0..100).map(|i| (i as Real - 50.0) / 1_000.0).collect();
        let var = engine.value_at_risk(&returns).unwrap();
        // 5th percentile of [-0.050, 0.049] is -0.04505
        assert_relative_eq!(var, 45.05, epsilon = 1e-9);
    }

    #[test]
    fn var_window_too_large() {
        let engine = RiskEngine::new(10, 0.99, 1_000.0).unwrap();
        assert!(matches!(
            engine.value_at_risk(&[0.01; 5]),
            Err(Error::WindowTooLarge { window: 10, samples: 5 })
        ));
    }

    #[test]
    fn covariance_var_closed_form() {
        let engine = RiskEngine::new(5, 0.99, 100_000.0).unwrap();
        // symmetric returns with known sigma
        let returns = [0.01, -0.01, 0.02, -0.02, 0.01, -0.01];
        let sigma = std_dev(&returns).unwrap();
        let expected = -normal_cdf_inverse(0.01) * sigma * 5.0_f64.sqrt() * 100_000.0;
        let var = engine.covariance_value_at_risk(&returns).unwrap();
        assert_relative_eq!(var, expected, epsilon = 1e-9);
        assert!(var > 0.0);
    }

    #[test]
    fn var_monotone_in_confidence() {
        let returns: Vec<Real> = (0..200)
            .map(|i| ((i * 73) % 200) as Real / 1_000.0 - 0.1)
            .collect();
        let var_95 = RiskEngine::new(5, 0.95, 10_000.0)
            .and_then(|e| e.value_at_risk(&returns))
            .unwrap();
        let var_99 = RiskEngine::new(5, 0.99, 10_000.0)
            .and_then(|e| e.value_at_risk(&returns))
            .unwrap();
        assert!(var_99 >= var_95, "VaR99 = {var_99}, VaR95 = {var_95}");
    }

    #[test]
    fn assess_keeps_rolling_distribution() {
        let engine = RiskEngine::new(2, 0.95, 1_000.0).unwrap();
        let result = engine.assess("gaussian", &[0.01, -0.02, 0.03]).unwrap();
        assert_eq!(result.model, "gaussian");
        assert_eq!(result.rolling_returns.len(), 2);
        assert_relative_eq!(result.rolling_returns[0], -0.01);
        assert_relative_eq!(result.rolling_returns[1], 0.01);
    }

    #[test]
    fn engine_rejects_bad_parameters() {
        assert!(RiskEngine::new(0, 0.99, 1.0).is_err());
        assert!(RiskEngine::new(5, 1.0, 1.0).is_err());
        assert!(RiskEngine::new(5, 0.99, 0.0).is_err());
    }
}
