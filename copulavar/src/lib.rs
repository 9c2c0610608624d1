//! # copulavar
//!
//! Copula-based dependence modeling and portfolio value-at-risk simulation.
//!
//! This crate is a **façade** that re-exports the public items of the
//! underlying workspace crates. Application code should depend on this
//! crate rather than the individual `cvar-*` crates.
//!
//! ## Quick start
//!
//! ```toml
//! [dependencies]
//! copulavar = "0.1"
//! ```
//!
//! ```rust
//! use copulavar::core::{Config, VineTopology};
//!
//! let config = Config {
//!     tickers: vec!["BTC-USD".into(), "ETH-USD".into(), "SOL-USD".into()],
//!     window: 5,
//!     confidence_interval: 0.99,
//!     portfolio_value: 100_000.0,
//!     vine_topology: VineTopology::Regular,
//! };
//! assert!(config.validate().is_ok());
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Core types, configuration, errors, and price series.
pub use cvar_core as core;

/// Mathematical utilities: distributions, solvers, statistics, RNG.
pub use cvar_math as math;

/// Marginal transforms and copula models.
pub use cvar_copulas as copulas;

/// Portfolio construction, VaR engine, and run orchestration.
pub use cvar_risk as risk;
