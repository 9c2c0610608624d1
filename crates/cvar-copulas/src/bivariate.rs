//! Bivariate copula families.
//!
//! Each family is a one-parameter copula fitted by Kendall-τ inversion.
//! A fitted [`PairCopula`] exposes the density, the conditional h-function
//! `h(u|v) = ∂C(u,v)/∂v`, its inverse in the first argument, and conditional
//! sampling.  [`select_family`] fits every family and keeps the one with the
//! lowest AIC.

use cvar_core::errors::{Error, Result};
use cvar_core::Real;
use cvar_math::distributions::debye1;
use cvar_math::random_numbers::MersenneTwisterUniformRng;
use cvar_math::solvers1d::brent;
use cvar_math::statistics::{kendall_tau, std_dev};
use cvar_math::{normal_cdf, normal_cdf_inverse};
use std::f64::consts::PI;
use std::fmt;

/// Arguments are kept away from the unit-interval endpoints by this margin
/// so logs and negative powers stay finite.
const EPS: Real = 1.0e-10;

/// Margins with a standard deviation below this are treated as degenerate.
const DEGENERACY_TOLERANCE: Real = 1.0e-9;

fn clamp01(x: Real) -> Real {
    x.clamp(EPS, 1.0 - EPS)
}

// ── Family ────────────────────────────────────────────────────────────────────

/// The supported one-parameter bivariate copula families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// Elliptical, symmetric dependence; parameter ρ ∈ (−1, 1).
    Gaussian,
    /// Lower-tail dependence; parameter θ > 0.
    Clayton,
    /// Radially symmetric, no tail dependence; parameter θ ≠ 0.
    Frank,
    /// Upper-tail dependence; parameter θ ≥ 1.
    Gumbel,
}

impl Family {
    /// Candidate order for model selection.  Earlier entries win AIC ties.
    pub const PRIORITY: [Family; 4] = [
        Family::Gaussian,
        Family::Frank,
        Family::Clayton,
        Family::Gumbel,
    ];

    /// Short lowercase name used in reports.
    pub fn name(&self) -> &'static str {
        match self {
            Family::Gaussian => "gaussian",
            Family::Clayton => "clayton",
            Family::Frank => "frank",
            Family::Gumbel => "gumbel",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Pair copula ───────────────────────────────────────────────────────────────

/// A fitted bivariate copula for one variable pair.
#[derive(Debug, Clone, PartialEq)]
pub struct PairCopula {
    family: Family,
    parameter: Real,
    pair: (usize, usize),
    log_likelihood: Real,
    n_obs: usize,
}

impl PairCopula {
    /// Fit `family` to uniform-margin observations by Kendall-τ inversion.
    ///
    /// `pair` records which variable indices the observations came from and
    /// only serves error context and reporting.
    pub fn fit(family: Family, observations: &[(Real, Real)], pair: (usize, usize)) -> Result<Self> {
        if observations.len() < 2 {
            return Err(Error::InsufficientData {
                context: format!("pair ({}, {})", pair.0, pair.1),
                observations: observations.len(),
                required: 2,
            });
        }
        let us: Vec<Real> = observations.iter().map(|o| o.0).collect();
        let vs: Vec<Real> = observations.iter().map(|o| o.1).collect();
        let tau = kendall_tau(&us, &vs);
        let parameter = parameter_from_tau(family, tau)?;

        let mut copula = Self {
            family,
            parameter,
            pair,
            log_likelihood: 0.0,
            n_obs: observations.len(),
        };
        copula.log_likelihood = observations
            .iter()
            .map(|&(u, v)| copula.density(u, v).max(1.0e-300).ln())
            .sum();
        Ok(copula)
    }

    /// The copula family.
    pub fn family(&self) -> Family {
        self.family
    }

    /// The fitted dependence parameter (ρ for Gaussian, θ otherwise).
    pub fn parameter(&self) -> Real {
        self.parameter
    }

    /// The variable indices this copula was fitted on.
    pub fn pair(&self) -> (usize, usize) {
        self.pair
    }

    /// Number of observations the copula was fitted on.
    pub fn n_observations(&self) -> usize {
        self.n_obs
    }

    /// Log-likelihood of the fitting sample under the fitted parameter.
    pub fn log_likelihood(&self) -> Real {
        self.log_likelihood
    }

    /// Akaike information criterion: `2k − 2·ln L` with `k = 1`.
    pub fn aic(&self) -> Real {
        2.0 - 2.0 * self.log_likelihood
    }

    /// Kendall's τ implied by the fitted parameter.
    pub fn kendall_tau(&self) -> Real {
        match self.family {
            Family::Gaussian => 2.0 * self.parameter.asin() / PI,
            Family::Clayton => self.parameter / (self.parameter + 2.0),
            Family::Gumbel => 1.0 - 1.0 / self.parameter,
            Family::Frank => {
                let t = self.parameter.abs();
                self.parameter.signum() * (1.0 - 4.0 / t * (1.0 - debye1(t)))
            }
        }
    }

    /// Copula density `c(u, v)`.
    pub fn density(&self, u: Real, v: Real) -> Real {
        let u = clamp01(u);
        let v = clamp01(v);
        match self.family {
            Family::Gaussian => {
                let rho = self.parameter;
                let x = normal_cdf_inverse(u);
                let y = normal_cdf_inverse(v);
                let r2 = 1.0 - rho * rho;
                (1.0 / r2.sqrt())
                    * (-(rho * rho * (x * x + y * y) - 2.0 * rho * x * y) / (2.0 * r2)).exp()
            }
            Family::Clayton => {
                let th = self.parameter;
                let s = u.powf(-th) + v.powf(-th) - 1.0;
                (1.0 + th) * (u * v).powf(-(1.0 + th)) * s.powf(-(2.0 * th + 1.0) / th)
            }
            Family::Frank => {
                let th = self.parameter;
                let g1 = (-th).exp_m1();
                let gu = (-th * u).exp_m1();
                let gv = (-th * v).exp_m1();
                let d = g1 + gu * gv;
                -th * g1 * (-th * (u + v)).exp() / (d * d)
            }
            Family::Gumbel => {
                let th = self.parameter;
                if th <= 1.0 + 1.0e-12 {
                    return 1.0;
                }
                let x = -u.ln();
                let y = -v.ln();
                let s = x.powf(th) + y.powf(th);
                let c = (-s.powf(1.0 / th)).exp();
                c / (u * v)
                    * s.powf(2.0 / th - 2.0)
                    * (x * y).powf(th - 1.0)
                    * (1.0 + (th - 1.0) * s.powf(-1.0 / th))
            }
        }
    }

    /// Conditional distribution `h(u | v) = ∂C(u, v)/∂v`.
    ///
    /// All four families are exchangeable, so conditioning on the second
    /// argument loses no generality.
    pub fn h(&self, u: Real, v: Real) -> Real {
        let u = clamp01(u);
        let v = clamp01(v);
        let h = match self.family {
            Family::Gaussian => {
                let rho = self.parameter;
                let x = normal_cdf_inverse(u);
                let y = normal_cdf_inverse(v);
                normal_cdf((x - rho * y) / (1.0 - rho * rho).sqrt())
            }
            Family::Clayton => {
                let th = self.parameter;
                let s = u.powf(-th) + v.powf(-th) - 1.0;
                v.powf(-(th + 1.0)) * s.powf(-(th + 1.0) / th)
            }
            Family::Frank => {
                let th = self.parameter;
                let g1 = (-th).exp_m1();
                let gu = (-th * u).exp_m1();
                let gv = (-th * v).exp_m1();
                (gv + 1.0) * gu / (g1 + gu * gv)
            }
            Family::Gumbel => {
                let th = self.parameter;
                if th <= 1.0 + 1.0e-12 {
                    return u;
                }
                let x = -u.ln();
                let y = -v.ln();
                let s = x.powf(th) + y.powf(th);
                let c = (-s.powf(1.0 / th)).exp();
                c * y.powf(th - 1.0) * s.powf(1.0 / th - 1.0) / v
            }
        };
        h.clamp(0.0, 1.0)
    }

    /// Inverse of the h-function in its first argument: the `u` with
    /// `h(u | v) = p`.
    ///
    /// Closed form for Gaussian, Clayton, and Frank; Brent root search for
    /// Gumbel.
    pub fn h_inverse(&self, p: Real, v: Real) -> Result<Real> {
        let p = clamp01(p);
        let v = clamp01(v);
        let u = match self.family {
            Family::Gaussian => {
                let rho = self.parameter;
                let y = normal_cdf_inverse(v);
                normal_cdf(normal_cdf_inverse(p) * (1.0 - rho * rho).sqrt() + rho * y)
            }
            Family::Clayton => {
                let th = self.parameter;
                let base = (p * v.powf(th + 1.0)).powf(-th / (th + 1.0)) - v.powf(-th) + 1.0;
                base.powf(-1.0 / th)
            }
            Family::Frank => {
                let th = self.parameter;
                let g1 = (-th).exp_m1();
                let gu = p * g1 / ((1.0 - p) * (-th * v).exp() + p);
                -(1.0 / th) * gu.ln_1p()
            }
            Family::Gumbel => {
                if self.parameter <= 1.0 + 1.0e-12 {
                    return Ok(p);
                }
                let f = |u: Real| self.h(u, v) - p;
                // h(·|v) is increasing in u; a one-sided bracket means the
                // root is pinned at the boundary.
                if f(EPS) >= 0.0 {
                    return Ok(EPS);
                }
                if f(1.0 - EPS) <= 0.0 {
                    return Ok(1.0 - EPS);
                }
                brent(f, EPS, 1.0 - EPS, 1.0e-10)?
            }
        };
        Ok(clamp01(u))
    }

    /// Draw `n` dependent uniform pairs by conditional inversion.
    pub fn sample(&self, n: usize, rng: &mut MersenneTwisterUniformRng) -> Result<Vec<(Real, Real)>> {
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            let v = rng.next_open01();
            let p = rng.next_open01();
            let u = self.h_inverse(p, v)?;
            out.push((u, v));
        }
        Ok(out)
    }
}

// ── Parameter estimation ──────────────────────────────────────────────────────

fn parameter_from_tau(family: Family, tau: Real) -> Result<Real> {
    match family {
        Family::Gaussian => Ok((PI * tau / 2.0).sin().clamp(-0.999, 0.999)),
        Family::Clayton => Ok((2.0 * tau / (1.0 - tau).max(1.0e-12)).clamp(1.0e-6, 100.0)),
        Family::Gumbel => {
            if tau < 0.0 {
                Ok(1.0)
            } else {
                Ok((1.0 / (1.0 - tau).max(1.0e-12)).clamp(1.0, 50.0))
            }
        }
        Family::Frank => frank_theta_from_tau(tau),
    }
}

/// Invert Frank's relation `τ(θ) = 1 − (4/θ)(1 − D₁(θ))` for θ > 0, using
/// the odd symmetry τ(−θ) = −τ(θ) for negative dependence.
fn frank_theta_from_tau(tau: Real) -> Result<Real> {
    let sign = if tau < 0.0 { -1.0 } else { 1.0 };
    let t = tau.abs();
    if t < 1.0e-5 {
        return Ok(sign * 1.0e-5);
    }
    let tau_of = |theta: Real| 1.0 - 4.0 / theta * (1.0 - debye1(theta)) - t;
    // τ(θ) spans (0, ~0.96) on this bracket; clamp τ beyond the upper end.
    if tau_of(100.0) <= 0.0 {
        return Ok(sign * 100.0);
    }
    let theta = brent(tau_of, 1.0e-6, 100.0, 1.0e-9)?;
    Ok(sign * theta)
}

// ── Model selection ───────────────────────────────────────────────────────────

/// Fit every family and keep the one with the lowest AIC.
///
/// Ties keep the earlier entry of [`Family::PRIORITY`].  Degenerate margins
/// (standard deviation below 1e-9) are rejected up front.
pub fn select_family(observations: &[(Real, Real)], pair: (usize, usize)) -> Result<PairCopula> {
    reject_degenerate(observations, pair)?;

    let mut best: Option<PairCopula> = None;
    for family in Family::PRIORITY {
        let candidate = PairCopula::fit(family, observations, pair)?;
        let better = match &best {
            None => true,
            Some(b) => candidate.aic() < b.aic(),
        };
        if better {
            best = Some(candidate);
        }
    }
    best.ok_or_else(|| Error::Runtime("no copula family could be fitted".into()))
}

/// Reject observation pairs whose margins have (near) zero variance;
/// Kendall-τ inversion is meaningless on them.
pub(crate) fn reject_degenerate(observations: &[(Real, Real)], pair: (usize, usize)) -> Result<()> {
    let us: Vec<Real> = observations.iter().map(|o| o.0).collect();
    let vs: Vec<Real> = observations.iter().map(|o| o.1).collect();
    for xs in [&us, &vs] {
        let sd = std_dev(xs).unwrap_or(0.0);
        if sd < DEGENERACY_TOLERANCE {
            return Err(Error::DegenerateFit {
                left: pair.0,
                right: pair.1,
                std_dev: sd,
            });
        }
    }
    Ok(())
}
