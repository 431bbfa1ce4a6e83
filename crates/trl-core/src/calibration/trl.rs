//! Thru-Reflect-Line (TRL) calibration solver
//!
//! Solves one frequency point at a time. The error model is
//!
//! ```text
//! T_measured = k * A * T_actual * B
//! ```
//!
//! where `A`, `B` are the T-parameters of the left/right error boxes and `k`
//! absorbs the transmission gain of both. Eigen-decomposition of the
//! Line/Thru cascade yields the normalized error boxes and the line's
//! propagation constant; the Thru fixes `k` and `a11*b11`; the Reflect
//! resolves `a11/b11`.
//!
//! The solver is stateless. Sign and phase-unwrap ambiguities are resolved
//! against a caller-supplied [`TrlEstimate`]; across a frequency sweep the
//! solution of one point ([`TrlSolution::estimate`]) is the natural estimate
//! for the next.
//!
//! Reference:
//! - Z. Hatab, "TRL calibration", <https://ziadhatab.github.io/posts/trl-calibration>

use ndarray::Array2;
use num_complex::Complex64;
use std::f64::consts::PI;
use tracing::{debug, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::apply::ErrorBoxes;
use crate::constants::{EIGEN_SEPARATION_TOL, NEAR_ZERO, PORT_GAIN_TOL};
use crate::error::{CalibrationError, ErrorBoxSide, Result, Step};
use crate::math::linalg::{eigenvalues_2x2, eigenvector_2x2, pinv_complex};
use crate::math::matrix_ops::{all_finite, diag2, ensure_2x2, invert_2x2, mat2};
use crate::math::transforms::s2t;

/// A-priori guess used to resolve the TRL ambiguities
///
/// * `gamma` picks the forward eigenvalue as the one nearest
///   `exp(-gamma*l)`. For a low-loss line the phase error `|d(beta)*l|` must
///   stay below `min(beta*l, pi - beta*l)`, well inside the half-wavelength
///   bound of the phase unwrap. Past it the pairing flips silently: the solve
///   returns roughly `-gamma` and wrong error boxes, and only the
///   `Re(gamma) < 0` warning is logged.
/// * `reflect` only needs the right sign/phase quadrant of the Reflect
///   standard (-1 for a short, +1 for an open).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrlEstimate {
    /// Propagation constant estimate (1/m)
    pub gamma: Complex64,
    /// Reflect standard estimate
    pub reflect: Complex64,
}

impl TrlEstimate {
    /// Estimate with a short (-1) as the reflect guess
    pub fn new(gamma: Complex64) -> Self {
        Self {
            gamma,
            reflect: Complex64::new(-1.0, 0.0),
        }
    }

    /// Replace the reflect guess
    pub fn with_reflect(mut self, reflect: Complex64) -> Self {
        self.reflect = reflect;
        self
    }
}

/// Result of a TRL solve at one frequency point
#[derive(Debug, Clone, PartialEq)]
pub struct TrlSolution {
    /// Left error box (T-parameters), bottom-right entry is 1
    pub a: Array2<Complex64>,
    /// Right error box (T-parameters), bottom-right entry is 1
    pub b: Array2<Complex64>,
    /// Transmission scale factor
    pub k: Complex64,
    /// Propagation constant of the Line standard (1/m)
    pub gamma: Complex64,
    /// Calibrated reflection coefficient of the Reflect standard
    pub reflect: Complex64,
}

impl TrlSolution {
    /// Estimate to feed into the solve of the adjacent frequency point
    pub fn estimate(&self) -> TrlEstimate {
        TrlEstimate {
            gamma: self.gamma,
            reflect: self.reflect,
        }
    }

    /// The (A, B, k) triple used to correct measurements
    pub fn error_boxes(&self) -> ErrorBoxes {
        ErrorBoxes {
            a: self.a.clone(),
            b: self.b.clone(),
            k: self.k,
        }
    }
}

/// Solve TRL calibration for a single frequency point
///
/// All S-parameters must already be corrected for switch terms.
///
/// # Arguments
/// * `thru_s` - Measured 2x2 S-parameters of the Thru standard
/// * `line_s` - Measured 2x2 S-parameters of the Line standard
/// * `line_length` - Line length relative to the Thru, in meters
/// * `estimate` - Propagation constant and reflect estimates
/// * `reflect_a` - Measured reflection of the Reflect standard at port A
/// * `reflect_b` - Measured reflection of the Reflect standard at port B
pub fn trl(
    thru_s: &Array2<Complex64>,
    line_s: &Array2<Complex64>,
    line_length: f64,
    estimate: TrlEstimate,
    reflect_a: Complex64,
    reflect_b: Complex64,
) -> Result<TrlSolution> {
    ensure_2x2(thru_s, "thru")?;
    ensure_2x2(line_s, "line")?;
    if !line_length.is_finite() || line_length <= 0.0 {
        return Err(CalibrationError::InvalidParameter {
            name: "line length",
            value: line_length.to_string(),
        });
    }
    if !estimate.gamma.is_finite() || !estimate.reflect.is_finite() {
        return Err(CalibrationError::InvalidParameter {
            name: "estimate",
            value: format!("{:?}", estimate),
        });
    }

    let line_t = s2t(line_s, false)?;
    let thru_t = s2t(thru_s, false)?;
    let thru_t_inv = invert_2x2(&thru_t).ok_or_else(|| {
        CalibrationError::singular(Step::ThruInversion, "thru T-parameters are singular")
    })?;

    // eigenvalue expected for the forward wave, exp(-gamma*l)
    let target = (-estimate.gamma * line_length).exp();

    // Left port: columns of A are eigenvectors of A*L*inv(A)
    let left = EigenPair::solve(&line_t.dot(&thru_t_inv), target, Step::LeftEigen)?;
    let a21_a11 = ratio(left.forward_vector[1], left.forward_vector[0], Step::LeftEigen)?;
    let a12 = ratio(left.other_vector[0], left.other_vector[1], Step::LeftEigen)?;

    // Right port: rows of B are eigenvectors of (inv(B)*L*B)^T
    let right_m = thru_t_inv.dot(&line_t).reversed_axes();
    let right = EigenPair::solve(&right_m, target, Step::RightEigen)?;
    let b12_b11 = ratio(right.forward_vector[1], right.forward_vector[0], Step::RightEigen)?;
    let b21 = ratio(right.other_vector[0], right.other_vector[1], Step::RightEigen)?;

    let one = Complex64::new(1.0, 0.0);
    let a_norm = mat2(one, a12, a21_a11, one);
    let b_norm = mat2(one, b12_b11, b21, one);

    let gamma = propagation_constant(
        right.forward_value,
        right.other_value,
        estimate.gamma,
        line_length,
    )?;

    // k and a11*b11 from the thru: pinv(A_) * Thru_T * pinv(B_) = k * diag(a11*b11, 1)
    let a_pinv = pinv_complex(&a_norm).ok_or(CalibrationError::SingularErrorBox {
        side: ErrorBoxSide::A,
        step: Step::ScaleFactor,
    })?;
    let b_pinv = pinv_complex(&b_norm).ok_or(CalibrationError::SingularErrorBox {
        side: ErrorBoxSide::B,
        step: Step::ScaleFactor,
    })?;
    let m = a_pinv.dot(&thru_t).dot(&b_pinv);
    let k = m[[1, 1]];
    if k.norm() < NEAR_ZERO {
        return Err(CalibrationError::singular(
            Step::ScaleFactor,
            "scale factor k vanishes",
        ));
    }
    let a11b11 = m[[0, 0]] / k;
    if a11b11.norm() < PORT_GAIN_TOL || !a11b11.is_finite() {
        return Err(CalibrationError::IllConditioned {
            magnitude: a11b11.norm(),
        });
    }

    let ports = PortRatios {
        a12,
        a21_a11,
        b12_b11,
        b21,
    };
    let resolved = resolve_reflect(&ports, a11b11, reflect_a, reflect_b, estimate.reflect)?;

    let a = a_norm.dot(&diag2(resolved.a11, one));
    let b = diag2(resolved.b11, one).dot(&b_norm);

    if !all_finite(&a) || !all_finite(&b) || !k.is_finite() {
        return Err(CalibrationError::NonFinite {
            step: Step::Reflect,
        });
    }

    if gamma.re < 0.0 {
        warn!(gamma = %gamma, "solved propagation constant is not passive (Re < 0)");
    }
    if resolved.reflect.norm() > 1.0 + 1e-6 {
        warn!(
            reflect = %resolved.reflect,
            "calibrated reflect has magnitude above unity"
        );
    }

    Ok(TrlSolution {
        a,
        b,
        k,
        gamma,
        reflect: resolved.reflect,
    })
}

/// Index of the companion eigenvalue
///
/// Only valid for a 2x2 eigenproblem, which has exactly two eigenvalues.
#[inline]
fn other_index(selected: usize) -> usize {
    1 - selected
}

/// Eigenvalue/eigenvector pairs split into forward (exp(-gamma*l)) and
/// companion (exp(+gamma*l)) branches
struct EigenPair {
    forward_value: Complex64,
    other_value: Complex64,
    forward_vector: [Complex64; 2],
    other_vector: [Complex64; 2],
}

impl EigenPair {
    fn solve(m: &Array2<Complex64>, target: Complex64, step: Step) -> Result<Self> {
        let values = eigenvalues_2x2(m);

        let scale = values[0].norm().max(values[1].norm()).max(NEAR_ZERO);
        let separation = (values[0] - values[1]).norm() / scale;
        if separation < EIGEN_SEPARATION_TOL || !separation.is_finite() {
            return Err(CalibrationError::DegenerateStandards { step, separation });
        }

        // nearest to the estimate, first index on ties
        let forward = if (values[1] - target).norm() < (values[0] - target).norm() {
            1
        } else {
            0
        };
        let other = other_index(forward);
        debug!(%step, forward, lambda = %values[forward], "selected forward eigenvalue");

        let degenerate = || CalibrationError::DegenerateStandards { step, separation };
        let forward_vector = eigenvector_2x2(m, values[forward]).ok_or_else(degenerate)?;
        let other_vector = eigenvector_2x2(m, values[other]).ok_or_else(degenerate)?;

        Ok(Self {
            forward_value: values[forward],
            other_value: values[other],
            forward_vector,
            other_vector,
        })
    }
}

fn ratio(num: Complex64, den: Complex64, step: Step) -> Result<Complex64> {
    if den.norm() < NEAR_ZERO {
        return Err(CalibrationError::singular(
            step,
            "eigenvector component vanishes",
        ));
    }
    Ok(num / den)
}

/// Recover gamma from the eigenvalue pair, unwrapping the phase against the estimate
///
/// The forward eigenvalue and the reciprocal of its companion both estimate
/// exp(-gamma*l); their mean is used. The 2*pi multiple is the one that
/// lands closest to `gamma_est * l`.
fn propagation_constant(
    forward: Complex64,
    other: Complex64,
    gamma_est: Complex64,
    line_length: f64,
) -> Result<Complex64> {
    if other.norm() < NEAR_ZERO {
        return Err(CalibrationError::singular(
            Step::PropagationConstant,
            "companion eigenvalue vanishes",
        ));
    }
    let e = (forward + 1.0 / other) / 2.0;
    if e.norm() < NEAR_ZERO {
        return Err(CalibrationError::singular(
            Step::PropagationConstant,
            "averaged eigenvalue vanishes",
        ));
    }

    let ln_e = e.ln();
    let p = ((gamma_est * line_length + ln_e).im / (2.0 * PI)).round();
    debug!(unwrap = p, "phase unwrap factor");

    let gamma = (-ln_e + Complex64::new(0.0, 2.0 * PI * p)) / line_length;
    if !gamma.is_finite() {
        return Err(CalibrationError::NonFinite {
            step: Step::PropagationConstant,
        });
    }
    Ok(gamma)
}

/// Normalized error-box ratios from the eigen-decomposition
struct PortRatios {
    a12: Complex64,
    a21_a11: Complex64,
    b12_b11: Complex64,
    b21: Complex64,
}

struct ResolvedReflect {
    a11: Complex64,
    b11: Complex64,
    reflect: Complex64,
}

/// Split a11*b11 into a11 and b11 using the reflect measured at both ports
///
/// The square root leaves a sign ambiguity; the branch whose calibrated
/// reflect is nearer `reflect_est` wins. An exact tie keeps the principal root.
fn resolve_reflect(
    ports: &PortRatios,
    a11b11: Complex64,
    reflect_a: Complex64,
    reflect_b: Complex64,
    reflect_est: Complex64,
) -> Result<ResolvedReflect> {
    let one = Complex64::new(1.0, 0.0);

    let den_a = one - reflect_a * ports.a21_a11;
    let den_b = reflect_b + ports.b21;
    let num_b = one + reflect_b * ports.b12_b11;
    if den_a.norm() < NEAR_ZERO || den_b.norm() < NEAR_ZERO || num_b.norm() < NEAR_ZERO {
        return Err(CalibrationError::singular(
            Step::Reflect,
            "reflect measurement coincides with an error-box pole",
        ));
    }

    // a11*Gamma from port A, 1/(b11*Gamma) from port B
    let a11_gamma = (reflect_a - ports.a12) / den_a;
    let a11_b11 = a11_gamma * num_b / den_b;

    let mut a11 = (a11_b11 * a11b11).sqrt();
    if a11.norm() < NEAR_ZERO {
        return Err(CalibrationError::singular(
            Step::Reflect,
            "reflect standard is not reflective (a11 vanishes)",
        ));
    }
    let mut b11 = a11b11 / a11;

    let reflect_cal_a = a11_gamma / a11;
    let reflect_cal_b = den_b / num_b / b11;
    let mut reflect = (reflect_cal_a + reflect_cal_b) / 2.0;

    if (reflect - reflect_est).norm() > (-reflect - reflect_est).norm() {
        debug!(reflect = %reflect, estimate = %reflect_est, "flipping reflect sign branch");
        a11 = -a11;
        b11 = -b11;
        reflect = -reflect;
    }

    if !reflect.is_finite() {
        return Err(CalibrationError::NonFinite {
            step: Step::Reflect,
        });
    }

    Ok(ResolvedReflect { a11, b11, reflect })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    fn ideal_thru() -> Array2<Complex64> {
        mat2(c(0.0, 0.0), c(1.0, 0.0), c(1.0, 0.0), c(0.0, 0.0))
    }

    fn ideal_line(gamma: Complex64, length: f64) -> Array2<Complex64> {
        let e = (-gamma * length).exp();
        mat2(c(0.0, 0.0), e, e, c(0.0, 0.0))
    }

    #[test]
    fn test_other_index() {
        assert_eq!(other_index(0), 1);
        assert_eq!(other_index(1), 0);
    }

    #[test]
    fn test_error_free_standards_give_identity_boxes() {
        let gamma = c(2.0, 150.0);
        let length = 5e-3;

        let sol = trl(
            &ideal_thru(),
            &ideal_line(gamma, length),
            length,
            TrlEstimate::new(c(0.0, 140.0)),
            c(-1.0, 0.0),
            c(-1.0, 0.0),
        )
        .unwrap();

        for i in 0..2 {
            for j in 0..2 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(sol.a[[i, j]].re, expected, epsilon = 1e-10);
                assert_relative_eq!(sol.a[[i, j]].im, 0.0, epsilon = 1e-10);
                assert_relative_eq!(sol.b[[i, j]].re, expected, epsilon = 1e-10);
                assert_relative_eq!(sol.b[[i, j]].im, 0.0, epsilon = 1e-10);
            }
        }
        assert_relative_eq!(sol.k.re, 1.0, epsilon = 1e-10);
        assert_relative_eq!(sol.k.im, 0.0, epsilon = 1e-10);
        assert_relative_eq!(sol.gamma.re, gamma.re, epsilon = 1e-8);
        assert_relative_eq!(sol.gamma.im, gamma.im, epsilon = 1e-8);
        assert_relative_eq!(sol.reflect.re, -1.0, epsilon = 1e-10);
        assert_relative_eq!(sol.reflect.im, 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_open_reflect_estimate_selects_open_branch() {
        let gamma = c(1.0, 100.0);
        let length = 4e-3;

        let sol = trl(
            &ideal_thru(),
            &ideal_line(gamma, length),
            length,
            TrlEstimate::new(gamma).with_reflect(c(1.0, 0.0)),
            c(1.0, 0.0),
            c(1.0, 0.0),
        )
        .unwrap();

        assert_relative_eq!(sol.reflect.re, 1.0, epsilon = 1e-10);
        assert_relative_eq!(sol.a[[0, 0]].re, 1.0, epsilon = 1e-10);
        assert_relative_eq!(sol.b[[0, 0]].re, 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_reflect_sign_tie_keeps_principal_root() {
        // +0.9j and -0.9j are equidistant from the estimate -1
        let reflect = c(0.0, 0.9);
        let sol = trl(
            &ideal_thru(),
            &ideal_line(c(1.0, 100.0), 5e-3),
            5e-3,
            TrlEstimate::new(c(1.0, 100.0)),
            reflect,
            reflect,
        )
        .unwrap();

        assert_relative_eq!(sol.reflect.re, 0.0, epsilon = 1e-12);
        assert_relative_eq!(sol.reflect.im, 0.9, epsilon = 1e-12);
        assert_relative_eq!(sol.a[[0, 0]].re, 1.0, epsilon = 1e-12);
        assert_relative_eq!(sol.a[[0, 0]].im, 0.0, epsilon = 1e-12);
        assert_relative_eq!(sol.b[[0, 0]].re, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_identical_line_and_thru_is_degenerate() {
        let err = trl(
            &ideal_thru(),
            &ideal_thru(),
            1e-3,
            TrlEstimate::new(c(0.0, 100.0)),
            c(-1.0, 0.0),
            c(-1.0, 0.0),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            CalibrationError::DegenerateStandards {
                step: Step::LeftEigen,
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_line_length() {
        for length in [0.0, -1e-3, f64::NAN] {
            let err = trl(
                &ideal_thru(),
                &ideal_line(c(0.0, 100.0), 1e-3),
                length,
                TrlEstimate::new(c(0.0, 100.0)),
                c(-1.0, 0.0),
                c(-1.0, 0.0),
            )
            .unwrap_err();
            assert!(matches!(err, CalibrationError::InvalidParameter { .. }));
        }
    }

    #[test]
    fn test_zero_thru_transmission_fails() {
        let thru = mat2(c(0.1, 0.0), c(0.0, 0.0), c(0.0, 0.0), c(0.1, 0.0));
        let err = trl(
            &thru,
            &ideal_line(c(0.0, 100.0), 1e-3),
            1e-3,
            TrlEstimate::new(c(0.0, 100.0)),
            c(-1.0, 0.0),
            c(-1.0, 0.0),
        )
        .unwrap_err();
        assert_eq!(err.step(), Some(Step::S2T));
    }

    #[test]
    fn test_matched_reflect_fails() {
        let err = trl(
            &ideal_thru(),
            &ideal_line(c(0.0, 100.0), 5e-3),
            5e-3,
            TrlEstimate::new(c(0.0, 100.0)),
            c(0.0, 0.0),
            c(0.0, 0.0),
        )
        .unwrap_err();
        assert_eq!(err.step(), Some(Step::Reflect));
    }
}
