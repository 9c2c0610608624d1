//! Correlation-matrix estimation and repair.
//!
//! Wraps nalgebra's symmetric eigendecomposition into the operations the
//! Gaussian copula needs: sample correlation of a column matrix, a
//! nearest-PSD correction, and the pseudo square root used for sampling.

use crate::statistics::pearson;
use cvar_core::errors::{Error, Result};
use cvar_core::Real;
use nalgebra::DMatrix;

/// Tolerance below which an eigenvalue counts as zero rather than negative.
pub const PSD_TOLERANCE: Real = 1.0e-8;

/// Sample Pearson correlation matrix of the columns of `data`.
///
/// The result is exactly symmetric with a unit diagonal.
pub fn correlation_matrix(data: &DMatrix<Real>) -> Result<DMatrix<Real>> {
    let n = data.ncols();
    if n == 0 || data.nrows() < 2 {
        return Err(Error::InvalidArgument(format!(
            "correlation matrix needs at least 2 rows and 1 column, got {}x{}",
            data.nrows(),
            n
        )));
    }
    let cols: Vec<Vec<Real>> = (0..n)
        .map(|j| data.column(j).iter().copied().collect())
        .collect();
    let mut corr = DMatrix::identity(n, n);
    for i in 0..n {
        for j in (i + 1)..n {
            let r = pearson(&cols[i], &cols[j]);
            corr[(i, j)] = r;
            corr[(j, i)] = r;
        }
    }
    Ok(corr)
}

/// Smallest eigenvalue of a symmetric matrix.
pub fn min_eigenvalue(m: &DMatrix<Real>) -> Real {
    let eigen = m.clone().symmetric_eigen();
    eigen
        .eigenvalues
        .iter()
        .copied()
        .fold(f64::INFINITY, f64::min)
}

/// Nearest positive semi-definite correction of a correlation matrix.
///
/// Clips negative eigenvalues to zero, reconstructs, and rescales back to a
/// unit diagonal.  Fails with [`Error::NonPositiveDefinite`] if the result
/// still has an eigenvalue below `-PSD_TOLERANCE` (which indicates a
/// numerically hopeless input, not a small perturbation).
pub fn nearest_positive_semidefinite(corr: &DMatrix<Real>) -> Result<DMatrix<Real>> {
    let n = corr.nrows();
    if corr.ncols() != n {
        return Err(Error::InvalidArgument(
            "correlation matrix must be square".into(),
        ));
    }
    if min_eigenvalue(corr) >= -PSD_TOLERANCE {
        return Ok(corr.clone());
    }

    let eigen = corr.clone().symmetric_eigen();
    let mut diag = DMatrix::<Real>::zeros(n, n);
    for i in 0..n {
        diag[(i, i)] = eigen.eigenvalues[i].max(0.0);
    }
    let v = eigen.eigenvectors;
    let mut repaired = &v * diag * v.transpose();

    // Rescale to a unit diagonal.
    let scale: Vec<Real> = (0..n).map(|i| repaired[(i, i)].sqrt()).collect();
    for i in 0..n {
        for j in 0..n {
            let d = scale[i] * scale[j];
            repaired[(i, j)] = if d > 0.0 { repaired[(i, j)] / d } else { 0.0 };
        }
        repaired[(i, i)] = 1.0;
    }

    let min_ev = min_eigenvalue(&repaired);
    if min_ev < -PSD_TOLERANCE {
        return Err(Error::NonPositiveDefinite {
            min_eigenvalue: min_ev,
        });
    }
    Ok(repaired)
}

/// Pseudo square root of a symmetric positive-semidefinite matrix.
///
/// Computes `S` such that `S · Sᵀ ≈ M` from the eigendecomposition, zeroing
/// negative eigenvalues.  Unlike a Cholesky factor this also handles rank
/// deficiency (perfectly correlated assets).
pub fn pseudo_sqrt(m: &DMatrix<Real>) -> Result<DMatrix<Real>> {
    let n = m.nrows();
    if m.ncols() != n {
        return Err(Error::InvalidArgument("matrix must be square".into()));
    }
    let eigen = m.clone().symmetric_eigen();
    let mut diag = DMatrix::<Real>::zeros(n, n);
    for i in 0..n {
        let ev = eigen.eigenvalues[i];
        diag[(i, i)] = if ev > 0.0 { ev.sqrt() } else { 0.0 };
    }
    Ok(&eigen.eigenvectors * diag)
}
