//! Run configuration.

use crate::errors::{Error, Result};
use crate::Real;
use serde::{Deserialize, Serialize};

/// Vine tree topology selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VineTopology {
    /// D-vine: a fixed path ordering of all variables.
    Direct,
    /// C-vine: a root variable connected to every other variable.
    Central,
    /// R-vine: spanning trees chosen to maximize absolute Kendall's tau.
    Regular,
}

impl VineTopology {
    /// The model name used in reports, e.g. `"vine_direct"`.
    pub fn model_name(&self) -> &'static str {
        match self {
            VineTopology::Direct => "vine_direct",
            VineTopology::Central => "vine_central",
            VineTopology::Regular => "vine_regular",
        }
    }
}

/// Configuration for a full simulation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Asset identifiers, in column order.
    pub tickers: Vec<String>,
    /// Rolling-window length in observations (e.g. 5 trading days).
    pub window: usize,
    /// VaR confidence level in (0, 1), e.g. 0.99.
    pub confidence_interval: Real,
    /// Total portfolio dollar value.
    pub portfolio_value: Real,
    /// Vine topology to fit.
    pub vine_topology: VineTopology,
}

impl Config {
    /// Check the documented domains of every option.
    pub fn validate(&self) -> Result<()> {
        if self.tickers.is_empty() {
            return Err(Error::InvalidArgument("tickers must not be empty".into()));
        }
        if self.window == 0 {
            return Err(Error::InvalidArgument("window must be positive".into()));
        }
        if !(self.confidence_interval > 0.0 && self.confidence_interval < 1.0) {
            return Err(Error::InvalidArgument(format!(
                "confidence_interval must be in (0, 1), got {}",
                self.confidence_interval
            )));
        }
        if !(self.portfolio_value > 0.0) {
            return Err(Error::InvalidArgument(format!(
                "portfolio_value must be positive, got {}",
                self.portfolio_value
            )));
        }
        Ok(())
    }
}
