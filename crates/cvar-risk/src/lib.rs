//! # cvar-risk
//!
//! Portfolio construction, the rolling-window percentile VaR engine, the
//! variance-covariance baseline, and the orchestration that fits every
//! dependence model on a common price history and reports their VaR
//! estimates side by side.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Portfolio positions and the VaR engine.
pub mod engine;

/// End-to-end simulation runs over all dependence models.
pub mod run;

pub use engine::{Portfolio, Position, RiskEngine, RiskResult};
pub use run::{run, RunReport};
