//! # cvar-core
//!
//! Core types, error definitions, and configuration shared across the
//! copulavar-rs workspace – type aliases, the error enum, the run
//! configuration, and the price/return series containers.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Public modules ───────────────────────────────────────────────────────────

/// Run configuration.
pub mod config;

/// Error types and the `ensure!` / `fail!` macros.
pub mod errors;

/// Price series and log-return extraction.
pub mod series;

// ── Primitive type aliases ────────────────────────────────────────────────────

/// Floating-point type used throughout the library.
pub type Real = f64;

// ── Re-exports for convenience ────────────────────────────────────────────────

pub use config::{Config, VineTopology};
pub use errors::{Error, Result};
pub use series::PriceSeries;
