//! Post-hoc rewrites of a solved calibration
//!
//! Both transforms cascade an extra two-port onto the error boxes, fold its
//! transmission into `k` and renormalize the boxes so their bottom-right
//! entries are 1 again. No re-solve is needed.

use ndarray::Array2;
use num_complex::Complex64;

use super::apply::ErrorBoxes;
use crate::constants::NEAR_ZERO;
use crate::error::{CalibrationError, Result, Step};
use crate::math::matrix_ops::{all_finite, diag2, ensure_2x2, mat2};

/// Move the reference plane by `offset` meters along the line
///
/// Positive offsets move away from the ports (into the line), negative
/// offsets towards the ports.
pub fn shift_plane(boxes: &ErrorBoxes, offset: f64, gamma: Complex64) -> Result<ErrorBoxes> {
    if !offset.is_finite() {
        return Err(CalibrationError::InvalidParameter {
            name: "plane offset",
            value: offset.to_string(),
        });
    }

    let e = (-gamma * offset).exp();
    if e.norm() < NEAR_ZERO || !e.is_finite() {
        return Err(CalibrationError::singular(
            Step::PlaneShift,
            "line propagation factor under- or overflows",
        ));
    }
    let l = diag2(e, 1.0 / e);

    cascade(boxes, &l, &l, Step::PlaneShift)
}

/// Change the reference impedance of the calibration from `z_from` to `z_new`
///
/// `z_from` is normally the characteristic impedance of the Line standard.
pub fn change_impedance(
    boxes: &ErrorBoxes,
    z_from: Complex64,
    z_new: Complex64,
) -> Result<ErrorBoxes> {
    let q_a = impedance_transformer(z_from, z_new)?;
    let q_b = impedance_transformer(z_new, z_from)?;
    cascade(boxes, &q_a, &q_b, Step::ImpedanceChange)
}

/// T-parameters of an impedance step from `zn` to `zm`
///
/// Eqs. (86) and (87) of:
/// - R. Marks and D. Williams, "A general waveguide circuit theory",
///   J. Res. NIST, vol. 97, 1992.
pub fn impedance_transformer(zn: Complex64, zm: Complex64) -> Result<Array2<Complex64>> {
    let invalid = || CalibrationError::InvalidParameter {
        name: "impedance pair",
        value: format!("{} -> {}", zn, zm),
    };

    if !zn.is_finite() || !zm.is_finite() || zn.norm() < NEAR_ZERO {
        return Err(invalid());
    }
    let sum = zm + zn;
    if sum.norm() < NEAR_ZERO || zm.re.abs() < NEAR_ZERO {
        return Err(invalid());
    }

    let g = (zm - zn) / sum;
    let one = Complex64::new(1.0, 0.0);
    let one_minus_g2 = one - g * g;
    if one_minus_g2.norm() < NEAR_ZERO {
        return Err(invalid());
    }

    let factor = ((zm / zn).conj() * (zn.re / zm.re)).sqrt() / one_minus_g2.sqrt();
    Ok(mat2(one, g, g, one) * factor)
}

/// `A' = A*left`, `B' = right*B`, `k' = k*A'22*B'22`, then renormalize
fn cascade(
    boxes: &ErrorBoxes,
    left: &Array2<Complex64>,
    right: &Array2<Complex64>,
    step: Step,
) -> Result<ErrorBoxes> {
    ensure_2x2(&boxes.a, "error box A")?;
    ensure_2x2(&boxes.b, "error box B")?;

    let a = boxes.a.dot(left);
    let b = right.dot(&boxes.b);

    let (a22, b22) = (a[[1, 1]], b[[1, 1]]);
    if a22.norm() < NEAR_ZERO || b22.norm() < NEAR_ZERO {
        return Err(CalibrationError::singular(
            step,
            "error box bottom-right entry vanishes",
        ));
    }

    let shifted = ErrorBoxes {
        k: boxes.k * a22 * b22,
        a: a / a22,
        b: b / b22,
    };
    if !all_finite(&shifted.a) || !all_finite(&shifted.b) || !shifted.k.is_finite() {
        return Err(CalibrationError::NonFinite { step });
    }
    Ok(shifted)
}

impl ErrorBoxes {
    /// See [`shift_plane`]
    pub fn shift_plane(&self, offset: f64, gamma: Complex64) -> Result<ErrorBoxes> {
        shift_plane(self, offset, gamma)
    }

    /// See [`change_impedance`]
    pub fn change_impedance(&self, z_from: Complex64, z_new: Complex64) -> Result<ErrorBoxes> {
        change_impedance(self, z_from, z_new)
    }
}
