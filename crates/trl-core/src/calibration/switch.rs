//! Switch-term correction
//!
//! Removes the bias a VNA's source switch introduces into raw 2-port ratios,
//! following Eqs. (18)-(21) of:
//! - R. B. Marks, "Formulations of the Basic Vector Network Analyzer Error
//!   Model including Switch-Terms", 50th ARFTG Conference Digest, 1997.

use ndarray::Array2;
use num_complex::Complex64;

use crate::constants::NEAR_ZERO;
use crate::error::{CalibrationError, Result, Step};
use crate::math::matrix_ops::{all_finite, ensure_2x2, mat2};

/// Correct raw 2-port S-parameters for the forward and reverse switch terms
///
/// # Arguments
/// * `s` - Raw 2x2 S-parameters
/// * `forward` - Forward switch term (GF), measured with port 1 driving
/// * `reverse` - Reverse switch term (GR), measured with port 2 driving
pub fn correct_switch(
    s: &Array2<Complex64>,
    forward: Complex64,
    reverse: Complex64,
) -> Result<Array2<Complex64>> {
    ensure_2x2(s, "S-parameters")?;

    let (s11, s12, s21, s22) = (s[[0, 0]], s[[0, 1]], s[[1, 0]], s[[1, 1]]);
    let den = Complex64::new(1.0, 0.0) - s12 * s21 * forward * reverse;
    if den.norm() < NEAR_ZERO {
        return Err(CalibrationError::singular(
            Step::SwitchCorrection,
            "1 - S12*S21*GF*GR vanishes",
        ));
    }

    let corrected = mat2(
        (s11 - s12 * s21 * forward) / den,
        (s12 - s11 * s12 * reverse) / den,
        (s21 - s22 * s21 * forward) / den,
        (s22 - s12 * s21 * reverse) / den,
    );

    if !all_finite(&corrected) {
        return Err(CalibrationError::NonFinite {
            step: Step::SwitchCorrection,
        });
    }
    Ok(corrected)
}
