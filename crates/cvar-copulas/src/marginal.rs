//! Marginal transforms between return space and uniform space.
//!
//! Two distinct marginals exist per asset: the empirical CDF, which maps
//! observed returns into uniform observations for copula fitting, and a
//! parametric normal reference distribution, which the risk engine uses to
//! map synthetic uniforms back into return space.

use cvar_core::errors::{Error, Result};
use cvar_core::Real;
use nalgebra::DMatrix;
use statrs::distribution::{ContinuousCDF, Normal};

// ── Empirical marginal ────────────────────────────────────────────────────────

/// The empirical CDF of one asset's return series.
///
/// `to_uniform` is right-continuous with ties counted inclusively and is
/// scaled by `n + 1`, so every observed value maps strictly inside (0, 1).
#[derive(Debug, Clone, PartialEq)]
pub struct EmpiricalMarginal {
    asset: String,
    observations: Vec<Real>,
    sorted: Vec<Real>,
}

impl EmpiricalMarginal {
    /// Build the marginal from an asset's return series.
    ///
    /// Fails with [`Error::InsufficientData`] for fewer than 2 observations.
    pub fn from_returns(asset: &str, returns: &[Real]) -> Result<Self> {
        if returns.len() < 2 {
            return Err(Error::InsufficientData {
                context: asset.to_string(),
                observations: returns.len(),
                required: 2,
            });
        }
        if returns.iter().any(|x| !x.is_finite()) {
            return Err(Error::InvalidArgument(format!(
                "returns of {asset} contain non-finite values"
            )));
        }
        let mut sorted = returns.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        Ok(Self {
            asset: asset.to_string(),
            observations: returns.to_vec(),
            sorted,
        })
    }

    /// The asset identifier.
    pub fn asset(&self) -> &str {
        &self.asset
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Whether the marginal holds no observations (never true post-construction).
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// The observed return series in time order.
    pub fn observations(&self) -> &[Real] {
        &self.observations
    }

    /// Empirical CDF value of `x`: `count(xᵢ ≤ x) / (n + 1)`.
    pub fn to_uniform(&self, x: Real) -> Real {
        let count = self.sorted.partition_point(|&s| s <= x);
        count as Real / (self.sorted.len() as Real + 1.0)
    }

    /// The marginal's own observations, transformed (column of the uniform
    /// observation matrix).
    pub fn uniforms(&self) -> Vec<Real> {
        self.observations.iter().map(|&x| self.to_uniform(x)).collect()
    }
}

// ── Parametric reference marginal ─────────────────────────────────────────────

/// A normal distribution fitted to an asset's returns.
///
/// Used by the risk engine to invert synthetic uniforms into returns;
/// deliberately distinct from the empirical CDF above.
#[derive(Debug, Clone)]
pub struct NormalReference {
    asset: String,
    mean: Real,
    std_dev: Real,
    dist: Normal,
}

impl NormalReference {
    /// Fit by sample mean and (Bessel-corrected) standard deviation.
    pub fn fit(asset: &str, returns: &[Real]) -> Result<Self> {
        if returns.len() < 2 {
            return Err(Error::InsufficientData {
                context: asset.to_string(),
                observations: returns.len(),
                required: 2,
            });
        }
        let mean = cvar_math::statistics::mean(returns).unwrap_or(0.0);
        let std_dev = cvar_math::statistics::std_dev(returns).unwrap_or(0.0);
        if !(std_dev > 0.0) {
            return Err(Error::InvalidArgument(format!(
                "returns of {asset} are constant; cannot fit a normal reference"
            )));
        }
        let dist = Normal::new(mean, std_dev)
            .map_err(|e| Error::InvalidArgument(format!("normal fit for {asset}: {e}")))?;
        Ok(Self {
            asset: asset.to_string(),
            mean,
            std_dev,
            dist,
        })
    }

    /// The asset identifier.
    pub fn asset(&self) -> &str {
        &self.asset
    }

    /// Fitted mean.
    pub fn mean(&self) -> Real {
        self.mean
    }

    /// Fitted standard deviation.
    pub fn std_dev(&self) -> Real {
        self.std_dev
    }

    /// Inverse CDF of the fitted normal, i.e. `u ↦ μ + σ·Φ⁻¹(u)`.
    pub fn from_uniform(&self, u: Real) -> Real {
        let u = u.clamp(1.0e-12, 1.0 - 1.0e-12);
        self.dist.inverse_cdf(u)
    }
}

// ── Uniform observation matrix ────────────────────────────────────────────────

/// Uniform-margin observations: rows = time points, columns = variables.
///
/// The common input to every copula fitter.  All entries lie in [0, 1] and
/// every column has the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformMatrix {
    data: DMatrix<Real>,
}

impl UniformMatrix {
    /// Wrap a matrix, validating the unit-interval invariant.
    pub fn new(data: DMatrix<Real>) -> Result<Self> {
        if data.nrows() == 0 || data.ncols() == 0 {
            return Err(Error::InvalidArgument(
                "uniform matrix must be non-empty".into(),
            ));
        }
        if let Some(bad) = data.iter().find(|&&x| !(0.0..=1.0).contains(&x)) {
            return Err(Error::InvalidArgument(format!(
                "uniform matrix entry {bad} outside [0, 1]"
            )));
        }
        Ok(Self { data })
    }

    /// Build from per-variable columns of equal length.
    pub fn from_columns(columns: &[Vec<Real>]) -> Result<Self> {
        if columns.is_empty() || columns[0].is_empty() {
            return Err(Error::InvalidArgument(
                "uniform matrix must be non-empty".into(),
            ));
        }
        let rows = columns[0].len();
        if let Some(c) = columns.iter().find(|c| c.len() != rows) {
            return Err(Error::InvalidArgument(format!(
                "column length mismatch: expected {rows}, got {}",
                c.len()
            )));
        }
        let data = DMatrix::from_fn(rows, columns.len(), |i, j| columns[j][i]);
        Self::new(data)
    }

    /// Apply each marginal's own empirical CDF pointwise; column *i* holds
    /// the transform of asset *i*'s series.
    pub fn from_marginals(marginals: &[EmpiricalMarginal]) -> Result<Self> {
        let columns: Vec<Vec<Real>> = marginals.iter().map(|m| m.uniforms()).collect();
        Self::from_columns(&columns)
    }

    /// Number of time points.
    pub fn n_rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of variables.
    pub fn n_vars(&self) -> usize {
        self.data.ncols()
    }

    /// One variable's column.
    pub fn column(&self, j: usize) -> Vec<Real> {
        self.data.column(j).iter().copied().collect()
    }

    /// The `(u, v)` observations of a variable pair.
    pub fn pairs(&self, i: usize, j: usize) -> Vec<(Real, Real)> {
        (0..self.data.nrows())
            .map(|r| (self.data[(r, i)], self.data[(r, j)]))
            .collect()
    }

    /// Borrow the underlying matrix.
    pub fn as_matrix(&self) -> &DMatrix<Real> {
        &self.data
    }
}
