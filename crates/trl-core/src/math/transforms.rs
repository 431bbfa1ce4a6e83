//! S-parameter transformation functions
//!
//! Provides conversions between 2-port S-parameters and T-parameters
//! (scattering transfer / cascade parameters).
//!
//! Convention: `T = 1/S21 * [[-det(S), S11], [-S22, 1]]`, so that the
//! T-parameters of cascaded two-ports multiply left to right.

use ndarray::Array2;
use num_complex::Complex64;

use crate::constants::NEAR_ZERO;
use crate::error::{CalibrationError, Result, Step};
use crate::math::matrix_ops::{det_2x2, ensure_2x2, mat2};

/// Convert 2x2 S-parameters to T-parameters
///
/// With `normalize` set the result is scaled so that T22 = 1 exactly. That is
/// not a physical conversion; it is only used when composing error boxes,
/// where the transmission scale is tracked separately.
///
/// Fails when S21 = 0 (no forward transmission) and `normalize` is false.
pub fn s2t(s: &Array2<Complex64>, normalize: bool) -> Result<Array2<Complex64>> {
    ensure_2x2(s, "S-parameters")?;

    let t = mat2(-det_2x2(s), s[[0, 0]], -s[[1, 1]], Complex64::new(1.0, 0.0));
    if normalize {
        return Ok(t);
    }

    let s21 = s[[1, 0]];
    if s21.norm() < NEAR_ZERO {
        return Err(CalibrationError::singular(Step::S2T, "S21 is zero"));
    }
    Ok(t / s21)
}

/// Convert 2x2 T-parameters to S-parameters
///
/// Exact inverse of [`s2t`]. With `normalize` set the result is left with
/// S21 = 1. Fails when T22 = 0 and `normalize` is false.
pub fn t2s(t: &Array2<Complex64>, normalize: bool) -> Result<Array2<Complex64>> {
    ensure_2x2(t, "T-parameters")?;

    let s = mat2(t[[0, 1]], det_2x2(t), Complex64::new(1.0, 0.0), -t[[1, 0]]);
    if normalize {
        return Ok(s);
    }

    let t22 = t[[1, 1]];
    if t22.norm() < NEAR_ZERO {
        return Err(CalibrationError::singular(Step::T2S, "T22 is zero"));
    }
    Ok(s / t22)
}
