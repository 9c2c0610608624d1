//! Multivariate Gaussian copula.

use crate::marginal::UniformMatrix;
use cvar_core::errors::{Error, Result};
use cvar_core::Real;
use cvar_math::correlation::{correlation_matrix, nearest_positive_semidefinite, pseudo_sqrt};
use cvar_math::random_numbers::MersenneTwisterUniformRng;
use cvar_math::{normal_cdf, normal_cdf_inverse};
use nalgebra::{DMatrix, DVector};

/// A Gaussian copula parameterised by a correlation matrix.
///
/// Fitted by transforming uniform observations to normal scores, taking
/// their Pearson correlation matrix, and repairing it to positive
/// semi-definiteness if numerical noise pushed an eigenvalue negative.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianCopula {
    correlation: DMatrix<Real>,
    sqrt: DMatrix<Real>,
}

impl GaussianCopula {
    /// Fit to uniform-margin observations.
    pub fn fit(uniforms: &UniformMatrix) -> Result<Self> {
        let data = uniforms.as_matrix();
        if data.nrows() < 2 {
            return Err(Error::InsufficientData {
                context: "gaussian copula".into(),
                observations: data.nrows(),
                required: 2,
            });
        }
        let scores =
            DMatrix::from_fn(data.nrows(), data.ncols(), |i, j| {
                normal_cdf_inverse(data[(i, j)])
            });
        let corr = correlation_matrix(&scores)?;
        let corr = nearest_positive_semidefinite(&corr)?;
        let sqrt = pseudo_sqrt(&corr)?;
        Ok(Self {
            correlation: corr,
            sqrt,
        })
    }

    /// Construct directly from a correlation matrix.
    ///
    /// The matrix is repaired to PSD the same way `fit` repairs an estimate.
    pub fn from_correlation(correlation: DMatrix<Real>) -> Result<Self> {
        let corr = nearest_positive_semidefinite(&correlation)?;
        let sqrt = pseudo_sqrt(&corr)?;
        Ok(Self {
            correlation: corr,
            sqrt,
        })
    }

    /// The fitted correlation matrix.
    pub fn correlation(&self) -> &DMatrix<Real> {
        &self.correlation
    }

    /// Number of variables.
    pub fn n_vars(&self) -> usize {
        self.correlation.nrows()
    }

    /// Draw `n` rows of dependent uniforms.
    ///
    /// Each row is `Φ(S·z)` where `z` are iid standard normals obtained by
    /// inverse transform from the seeded Mersenne Twister stream.
    pub fn sample(&self, n: usize, seed: u64) -> Result<UniformMatrix> {
        let d = self.n_vars();
        let mut rng = MersenneTwisterUniformRng::new(seed);
        let mut out = DMatrix::<Real>::zeros(n, d);
        for row in 0..n {
            let z = DVector::from_fn(d, |_, _| normal_cdf_inverse(rng.next_open01()));
            let x = &self.sqrt * z;
            for j in 0..d {
                out[(row, j)] = normal_cdf(x[j]).clamp(1.0e-12, 1.0 - 1.0e-12);
            }
        }
        UniformMatrix::new(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cvar_math::statistics::pearson;

    fn bivariate_uniforms(rho: Real, n: usize, seed: u64) -> UniformMatrix {
        let g = GaussianCopula::from_correlation(DMatrix::from_row_slice(
            2,
            2,
            &[1.0, rho, rho, 1.0],
        ))
        .unwrap();
        g.sample(n, seed).unwrap()
    }

    #[test]
    fn fit_recovers_correlation() {
        let uniforms = bivariate_uniforms(0.6, 4_000, 42);
        let fitted = GaussianCopula::fit(&uniforms).unwrap();
        let rho = fitted.correlation()[(0, 1)];
        assert!((rho - 0.6).abs() < 0.05, "fitted rho = {rho}");
    }

    #[test]
    fn sample_is_deterministic_per_seed() {
        let a = bivariate_uniforms(0.3, 50, 7);
        let b = bivariate_uniforms(0.3, 50, 7);
        assert_eq!(a, b);
        let c = bivariate_uniforms(0.3, 50, 8);
        assert_ne!(a, c);
    }

    #[test]
    fn independent_copula_gives_uncorrelated_uniforms() {
        let uniforms = bivariate_uniforms(0.0, 4_000, 11);
        let r = pearson(&uniforms.column(0), &uniforms.column(1));
        assert!(r.abs() < 0.05, "pearson = {r}");
    }

    #[test]
    fn infeasible_correlation_is_repaired_on_construction() {
        let corr = DMatrix::from_row_slice(
            3,
            3,
            &[1.0, 0.9, -0.9, 0.9, 1.0, 0.9, -0.9, 0.9, 1.0],
        );
        let g = GaussianCopula::from_correlation(corr).unwrap();
        assert_eq!(g.n_vars(), 3);
        assert!(cvar_math::correlation::min_eigenvalue(g.correlation()) >= -1e-8);
    }

    #[test]
    fn rank_deficient_correlation_samples() {
        // Perfectly correlated pair still samples (pseudo sqrt, not Cholesky).
        let corr = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);
        let g = GaussianCopula::from_correlation(corr).unwrap();
        let u = g.sample(200, 3).unwrap();
        for row in 0..200 {
            let a = u.as_matrix()[(row, 0)];
            let b = u.as_matrix()[(row, 1)];
            assert!((a - b).abs() < 1e-6);
        }
    }
}
