//! Error types for copulavar-rs.
//!
//! A single `thiserror`-derived enum covers every failure mode in the
//! workspace.  Fitting and sampling errors are isolated per model or per
//! variable pair by the callers; each variant carries the identifiers and
//! attempted values needed to act on it.

use thiserror::Error;

/// The top-level error type used throughout copulavar-rs.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// Too few observations for a reliable empirical CDF or parameter fit.
    #[error("insufficient data for {context}: {observations} observations, need at least {required}")]
    InsufficientData {
        /// Asset or pair the data belongs to.
        context: String,
        /// Observations actually available.
        observations: usize,
        /// Minimum observations required.
        required: usize,
    },

    /// Pair data collapsed to a single rank position; the fit would diverge.
    #[error("degenerate fit for pair ({left}, {right}): margin standard deviation {std_dev:.3e} is near zero")]
    DegenerateFit {
        /// Left variable index.
        left: usize,
        /// Right variable index.
        right: usize,
        /// Offending margin standard deviation.
        std_dev: f64,
    },

    /// The empirical correlation matrix is not positive semi-definite even
    /// after the nearest-PSD correction.
    #[error("correlation matrix is not positive semi-definite: minimum eigenvalue {min_eigenvalue:.3e}")]
    NonPositiveDefinite {
        /// Smallest eigenvalue found after correction.
        min_eigenvalue: f64,
    },

    /// Vine construction requires at least three variables.
    #[error("vine construction requires at least 3 variables, got {variables}")]
    InsufficientVariables {
        /// Number of variables supplied.
        variables: usize,
    },

    /// No spanning structure satisfying the proximity condition exists at
    /// some tree level.  Indicates a broken prior tree.
    #[error("proximity condition violated at tree {tree}: no spanning structure over {nodes} nodes")]
    ProximityViolation {
        /// Tree level (0-indexed) at which construction failed.
        tree: usize,
        /// Number of nodes the tree had to span.
        nodes: usize,
    },

    /// The rolling window exceeds the available simulated sample length.
    #[error("rolling window {window} exceeds sample length {samples}")]
    WindowTooLarge {
        /// Configured window length.
        window: usize,
        /// Available sample length.
        samples: usize,
    },

    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// General runtime error.
    #[error("{0}")]
    Runtime(String),
}

/// Shorthand `Result` type used throughout copulavar-rs.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Returns `Err(Error::InvalidArgument(...))` if `$cond` is false.
///
/// # Example
/// ```
/// use cvar_core::ensure;
/// fn positive(x: f64) -> cvar_core::errors::Result<f64> {
///     ensure!(x > 0.0, "x must be positive, got {x}");
///     Ok(x)
/// }
/// assert!(positive(1.0).is_ok());
/// assert!(positive(-1.0).is_err());
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $($msg:tt)*) => {
        if !$cond {
            return Err($crate::errors::Error::InvalidArgument(
                format!($($msg)*)
            ));
        }
    };
}

/// Returns `Err(Error::Runtime(...))` immediately.
///
/// # Example
/// ```
/// use cvar_core::fail;
/// fn always_err() -> cvar_core::errors::Result<()> {
///     fail!("something went wrong");
/// }
/// assert!(always_err().is_err());
/// ```
#[macro_export]
macro_rules! fail {
    ($($msg:tt)*) => {
        return Err($crate::errors::Error::Runtime(format!($($msg)*)))
    };
}
