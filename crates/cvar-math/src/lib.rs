//! # cvar-math
//!
//! Mathematical utilities for copulavar-rs: standard-normal distribution
//! helpers, 1D root-finding, correlation-matrix utilities (over nalgebra),
//! order-statistic helpers, and seeded random number generation.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Modules ───────────────────────────────────────────────────────────────────

/// Correlation matrices: estimation, PSD repair, square roots.
pub mod correlation;

/// Standard normal distribution and related special functions.
pub mod distributions;

/// Seeded uniform random number generation.
pub mod random_numbers;

/// 1D root-finding solvers.
pub mod solvers1d;

/// Descriptive statistics, percentiles, rank correlation.
pub mod statistics;

// ── Convenience re-exports ────────────────────────────────────────────────────

pub use distributions::{normal_cdf, normal_cdf_inverse, normal_pdf};
pub use random_numbers::MersenneTwisterUniformRng;
