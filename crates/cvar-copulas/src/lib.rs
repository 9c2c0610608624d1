//! # cvar-copulas
//!
//! Dependence modeling: empirical marginal transforms, the bivariate copula
//! family library (Gaussian pair, Clayton, Frank, Gumbel), the multivariate
//! Gaussian copula, hierarchical vine copulas (direct/central/regular), and
//! the independent pairwise Clayton baseline.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Modules ───────────────────────────────────────────────────────────────────

/// Bivariate copula families: fit, density, h-function, inverse, sampling.
pub mod bivariate;

/// Multivariate Gaussian copula.
pub mod gaussian;

/// Empirical marginals, parametric reference marginals, uniform matrices.
pub mod marginal;

/// Independent per-pair Clayton baseline.
pub mod pairwise;

/// Vine copulas: tree construction and recursive sampling.
pub mod vine;

// ── Convenience re-exports ────────────────────────────────────────────────────

pub use bivariate::{Family, PairCopula};
pub use gaussian::GaussianCopula;
pub use marginal::{EmpiricalMarginal, NormalReference, UniformMatrix};
pub use pairwise::ClaytonPairwise;
pub use vine::{Edge, Vine};
