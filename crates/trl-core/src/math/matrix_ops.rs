//! Matrix operation helpers
//!
//! Small utilities for the fixed 2x2 complex matrices used throughout
//! the error-box algebra.

use ndarray::{Array2, Array3};
use num_complex::Complex64;

use crate::constants::NEAR_ZERO;
use crate::error::{CalibrationError, Result};

/// Build a 2x2 complex matrix from its entries in row-major order
#[inline]
pub fn mat2(m00: Complex64, m01: Complex64, m10: Complex64, m11: Complex64) -> Array2<Complex64> {
    let mut m = Array2::<Complex64>::zeros((2, 2));
    m[[0, 0]] = m00;
    m[[0, 1]] = m01;
    m[[1, 0]] = m10;
    m[[1, 1]] = m11;
    m
}

/// Create a 2x2 diagonal matrix
#[inline]
pub fn diag2(d0: Complex64, d1: Complex64) -> Array2<Complex64> {
    mat2(d0, Complex64::new(0.0, 0.0), Complex64::new(0.0, 0.0), d1)
}

/// Identity matrix of given size
#[inline]
pub fn identity(n: usize) -> Array2<Complex64> {
    Array2::<Complex64>::eye(n)
}

/// Reject anything that is not a 2x2 matrix
pub fn ensure_2x2(m: &Array2<Complex64>, what: &'static str) -> Result<()> {
    let (rows, cols) = m.dim();
    if rows != 2 || cols != 2 {
        return Err(CalibrationError::Shape { what, rows, cols });
    }
    Ok(())
}

/// Determinant of a 2x2 complex matrix
#[inline]
pub fn det_2x2(m: &Array2<Complex64>) -> Complex64 {
    m[[0, 0]] * m[[1, 1]] - m[[0, 1]] * m[[1, 0]]
}

/// Invert a 2x2 complex matrix
///
/// Returns None if matrix is singular (determinant near zero).
#[inline]
pub fn invert_2x2(m: &Array2<Complex64>) -> Option<Array2<Complex64>> {
    if m.shape() != [2, 2] {
        return None;
    }

    let det = det_2x2(m);
    if det.norm() < NEAR_ZERO || !det.is_finite() {
        return None;
    }

    let inv_det = Complex64::new(1.0, 0.0) / det;
    Some(mat2(
        m[[1, 1]] * inv_det,
        -m[[0, 1]] * inv_det,
        -m[[1, 0]] * inv_det,
        m[[0, 0]] * inv_det,
    ))
}

/// True when every entry is finite
#[inline]
pub fn all_finite(m: &Array2<Complex64>) -> bool {
    m.iter().all(|z| z.is_finite())
}

/// Extract S-parameters at a single frequency into a 2D array
#[inline]
pub fn extract_freq_slice(s: &Array3<Complex64>, f: usize) -> Array2<Complex64> {
    s.slice(ndarray::s![f, .., ..]).to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn test_diag2() {
        let m = diag2(c(1.0, 0.0), c(2.0, 0.0));
        assert_eq!(m[[0, 0]], c(1.0, 0.0));
        assert_eq!(m[[1, 1]], c(2.0, 0.0));
        assert_eq!(m[[0, 1]], c(0.0, 0.0));
        assert_eq!(m[[1, 0]], c(0.0, 0.0));
    }

    #[test]
    fn test_invert_2x2() {
        let m = mat2(c(1.0, 0.5), c(2.0, 0.0), c(3.0, -1.0), c(4.0, 0.0));

        let inv = invert_2x2(&m).unwrap();
        let identity_approx = m.dot(&inv);

        assert!((identity_approx[[0, 0]] - c(1.0, 0.0)).norm() < 1e-12);
        assert!((identity_approx[[1, 1]] - c(1.0, 0.0)).norm() < 1e-12);
        assert!(identity_approx[[0, 1]].norm() < 1e-12);
        assert!(identity_approx[[1, 0]].norm() < 1e-12);
    }

    #[test]
    fn test_invert_singular() {
        let m = mat2(c(1.0, 0.0), c(2.0, 0.0), c(2.0, 0.0), c(4.0, 0.0));
        assert!(invert_2x2(&m).is_none());
    }

    #[test]
    fn test_ensure_2x2_rejects_other_shapes() {
        let m = Array2::<Complex64>::zeros((3, 2));
        let err = ensure_2x2(&m, "dut").unwrap_err();
        assert_eq!(
            err,
            CalibrationError::Shape {
                what: "dut",
                rows: 3,
                cols: 2
            }
        );
        assert!(ensure_2x2(&identity(2), "dut").is_ok());
    }
}
