//! Linear algebra operations
//!
//! The TRL solve only ever needs 2x2 complex eigen-decompositions, which are
//! done in closed form here. The pseudo-inverse goes through nalgebra's SVD;
//! all ndarray<->nalgebra conversions are contained in this module.

use nalgebra::DMatrix;
use ndarray::Array2;
use num_complex::Complex64;

use crate::constants::{NEAR_ZERO, SVD_TOLERANCE};

// ============================================================================
// Conversion helpers (internal)
// ============================================================================

/// Convert ndarray Array2<Complex64> to nalgebra DMatrix<Complex64>
#[inline]
fn to_na_complex(a: &Array2<Complex64>) -> DMatrix<Complex64> {
    let (m, n) = a.dim();
    DMatrix::from_fn(m, n, |i, j| a[[i, j]])
}

/// Convert nalgebra DMatrix<Complex64> to ndarray Array2<Complex64>
#[inline]
fn from_na_complex(m: &DMatrix<Complex64>) -> Array2<Complex64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}

// ============================================================================
// Pseudo-inverse
// ============================================================================

/// Moore-Penrose pseudo-inverse of a complex matrix
///
/// Returns None for an empty matrix or when the SVD fails to converge.
pub fn pinv_complex(a: &Array2<Complex64>) -> Option<Array2<Complex64>> {
    let (m, n) = a.dim();
    if m == 0 || n == 0 {
        return None;
    }

    to_na_complex(a)
        .pseudo_inverse(SVD_TOLERANCE)
        .ok()
        .map(|p| from_na_complex(&p))
}

// ============================================================================
// 2x2 eigen-decomposition
// ============================================================================

/// Eigenvalues of a 2x2 complex matrix via the characteristic quadratic
///
/// The root that does not suffer cancellation is computed first and the
/// second is recovered from the determinant when possible.
pub fn eigenvalues_2x2(m: &Array2<Complex64>) -> [Complex64; 2] {
    let (a, b, c, d) = (m[[0, 0]], m[[0, 1]], m[[1, 0]], m[[1, 1]]);
    let trace = a + d;
    let det = a * d - b * c;
    let disc = ((a - d) * (a - d) + 4.0 * b * c).sqrt();

    let (plus, minus) = (trace + disc, trace - disc);
    let (big, other) = if plus.norm() >= minus.norm() {
        (plus, minus)
    } else {
        (minus, plus)
    };

    let lambda0 = big / 2.0;
    let lambda1 = if lambda0.norm() > NEAR_ZERO {
        det / lambda0
    } else {
        other / 2.0
    };
    [lambda0, lambda1]
}

/// Unit-norm eigenvector of a 2x2 complex matrix for a given eigenvalue
///
/// Picks the better conditioned of the two rows of `(M - λI)`. Returns None
/// when `M - λI` vanishes entirely, i.e. the eigenspace is two-dimensional.
pub fn eigenvector_2x2(m: &Array2<Complex64>, lambda: Complex64) -> Option<[Complex64; 2]> {
    let (a, b, c, d) = (m[[0, 0]], m[[0, 1]], m[[1, 0]], m[[1, 1]]);

    // from row 0: (a - λ) x + b y = 0  ->  [b, λ - a]
    // from row 1: c x + (d - λ) y = 0  ->  [λ - d, c]
    let p = [b, lambda - a];
    let q = [lambda - d, c];
    let p_norm = (p[0].norm_sqr() + p[1].norm_sqr()).sqrt();
    let q_norm = (q[0].norm_sqr() + q[1].norm_sqr()).sqrt();

    let (v, norm) = if p_norm >= q_norm { (p, p_norm) } else { (q, q_norm) };

    let scale = 1.0 + a.norm() + b.norm() + c.norm() + d.norm();
    if norm <= NEAR_ZERO * scale || !norm.is_finite() {
        return None;
    }
    Some([v[0] / norm, v[1] / norm])
}
