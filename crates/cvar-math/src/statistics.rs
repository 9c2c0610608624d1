//! Descriptive statistics, percentiles, rolling sums, and rank correlation.

use cvar_core::errors::{Error, Result};
use cvar_core::Real;

/// Arithmetic mean.  Returns `None` for an empty slice.
pub fn mean(xs: &[Real]) -> Option<Real> {
    if xs.is_empty() {
        None
    } else {
        Some(xs.iter().sum::<Real>() / xs.len() as Real)
    }
}

/// Sample standard deviation (Bessel-corrected).  Returns `None` for fewer
/// than 2 observations.
pub fn std_dev(xs: &[Real]) -> Option<Real> {
    if xs.len() < 2 {
        return None;
    }
    let m = mean(xs)?;
    let ss = xs.iter().map(|x| (x - m) * (x - m)).sum::<Real>();
    Some((ss / (xs.len() as Real - 1.0)).sqrt())
}

/// Percentile `q ∈ [0, 100]` with linear interpolation between order
/// statistics (numpy's default convention).
pub fn percentile(xs: &[Real], q: Real) -> Result<Real> {
    if xs.is_empty() {
        return Err(Error::InvalidArgument(
            "percentile of an empty sample".into(),
        ));
    }
    if !(0.0..=100.0).contains(&q) {
        return Err(Error::InvalidArgument(format!(
            "percentile rank must be in [0, 100], got {q}"
        )));
    }
    let mut sorted = xs.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let h = (sorted.len() as Real - 1.0) * q / 100.0;
    let lo = h.floor() as usize;
    let frac = h - lo as Real;
    if lo + 1 >= sorted.len() {
        return Ok(sorted[sorted.len() - 1]);
    }
    Ok(sorted[lo] + frac * (sorted[lo + 1] - sorted[lo]))
}

/// Rolling sums over windows of length `w`, dropping incomplete leading
/// windows.  Output length is `xs.len() − w + 1`.
pub fn rolling_sum(xs: &[Real], w: usize) -> Result<Vec<Real>> {
    if w == 0 {
        return Err(Error::InvalidArgument("window must be positive".into()));
    }
    if w > xs.len() {
        return Err(Error::WindowTooLarge {
            window: w,
            samples: xs.len(),
        });
    }
    let mut out = Vec::with_capacity(xs.len() - w + 1);
    let mut acc: Real = xs[..w].iter().sum();
    out.push(acc);
    for i in w..xs.len() {
        acc += xs[i] - xs[i - w];
        out.push(acc);
    }
    Ok(out)
}

/// Pearson correlation of two equal-length slices.
///
/// Returns 0 when either margin is constant.
pub fn pearson(xs: &[Real], ys: &[Real]) -> Real {
    assert_eq!(xs.len(), ys.len(), "pearson: length mismatch");
    let n = xs.len();
    if n < 2 {
        return 0.0;
    }
    let mx = xs.iter().sum::<Real>() / n as Real;
    let my = ys.iter().sum::<Real>() / n as Real;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for i in 0..n {
        let dx = xs[i] - mx;
        let dy = ys[i] - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return 0.0;
    }
    sxy / (sxx * syy).sqrt()
}

/// Kendall's τ (τ-a: concordance count over all pairs, ties contribute 0).
///
/// O(n²); fine for the sample sizes this system fits on.
pub fn kendall_tau(xs: &[Real], ys: &[Real]) -> Real {
    assert_eq!(xs.len(), ys.len(), "kendall_tau: length mismatch");
    let n = xs.len();
    if n < 2 {
        return 0.0;
    }
    let mut s: i64 = 0;
    for i in 0..n {
        for j in (i + 1)..n {
            let c = (xs[i] - xs[j]) * (ys[i] - ys[j]);
            if c > 0.0 {
                s += 1;
            } else if c < 0.0 {
                s -= 1;
            }
        }
    }
    s as Real / (n * (n - 1) / 2) as Real
}
