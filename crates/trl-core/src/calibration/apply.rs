//! Applying a solved calibration to a device under test

use ndarray::Array2;
use num_complex::Complex64;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::constants::NEAR_ZERO;
use crate::error::{CalibrationError, ErrorBoxSide, Result, Step};
use crate::math::matrix_ops::{all_finite, ensure_2x2, identity, invert_2x2, mat2};
use crate::math::transforms::s2t;

/// Left/right error boxes and transmission scale of a 7-term error model
///
/// Raw T-parameters relate to the actual ones through
/// `T_raw = k * A * T_actual * B`.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorBoxes {
    /// Left (port A) error box, T-parameters
    pub a: Array2<Complex64>,
    /// Right (port B) error box, T-parameters
    pub b: Array2<Complex64>,
    /// Transmission scale factor
    pub k: Complex64,
}

impl ErrorBoxes {
    /// Build from solved boxes, rejecting anything that is not 2x2
    pub fn new(a: Array2<Complex64>, b: Array2<Complex64>, k: Complex64) -> Result<Self> {
        ensure_2x2(&a, "error box A")?;
        ensure_2x2(&b, "error box B")?;
        Ok(Self { a, b, k })
    }

    /// Error-free calibration (A = B = I, k = 1)
    pub fn identity() -> Self {
        Self {
            a: identity(2),
            b: identity(2),
            k: Complex64::new(1.0, 0.0),
        }
    }

    /// Correct a raw measurement, see [`apply_cal`]
    pub fn apply(&self, dut: &Dut, port: Port) -> Result<Dut> {
        apply_cal(dut, self, port)
    }
}

/// Test port used to read a 1-port measurement
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Port {
    /// Port A (S11 position)
    #[default]
    Left,
    /// Port B (S22 position)
    Right,
}

/// A device-under-test measurement
#[derive(Debug, Clone, PartialEq)]
pub enum Dut {
    /// Reflection coefficient of a 1-port device
    OnePort(Complex64),
    /// 2x2 S-parameters of a 2-port device
    TwoPort(Array2<Complex64>),
}

impl Dut {
    /// Reflection coefficient, if this is a 1-port measurement
    pub fn one_port(&self) -> Option<Complex64> {
        match self {
            Dut::OnePort(g) => Some(*g),
            Dut::TwoPort(_) => None,
        }
    }

    /// S-parameters, if this is a 2-port measurement
    pub fn two_port(&self) -> Option<&Array2<Complex64>> {
        match self {
            Dut::OnePort(_) => None,
            Dut::TwoPort(s) => Some(s),
        }
    }
}

impl From<Complex64> for Dut {
    fn from(g: Complex64) -> Self {
        Dut::OnePort(g)
    }
}

impl From<Array2<Complex64>> for Dut {
    fn from(s: Array2<Complex64>) -> Self {
        Dut::TwoPort(s)
    }
}

/// Correct a raw (switch-corrected) DUT measurement
///
/// A 1-port value is embedded as `diag(value, value)` and read back from the
/// position of `port` after correction.
///
/// # Arguments
/// * `dut` - Raw measurement
/// * `boxes` - Solved error boxes
/// * `port` - Port a 1-port measurement was taken on; ignored for 2-ports
pub fn apply_cal(dut: &Dut, boxes: &ErrorBoxes, port: Port) -> Result<Dut> {
    match dut {
        Dut::TwoPort(s) => {
            ensure_2x2(s, "DUT S-parameters")?;
            correct_two_port(s, boxes).map(Dut::TwoPort)
        }
        Dut::OnePort(g) => {
            let zero = Complex64::new(0.0, 0.0);
            let s = mat2(*g, zero, zero, *g);
            let corrected = correct_two_port(&s, boxes)?;
            Ok(Dut::OnePort(match port {
                Port::Left => corrected[[0, 0]],
                Port::Right => corrected[[1, 1]],
            }))
        }
    }
}

fn correct_two_port(s: &Array2<Complex64>, boxes: &ErrorBoxes) -> Result<Array2<Complex64>> {
    ensure_2x2(&boxes.a, "error box A")?;
    ensure_2x2(&boxes.b, "error box B")?;

    let a_inv = invert_2x2(&boxes.a).ok_or(CalibrationError::SingularErrorBox {
        side: ErrorBoxSide::A,
        step: Step::Apply,
    })?;
    let b_inv = invert_2x2(&boxes.b).ok_or(CalibrationError::SingularErrorBox {
        side: ErrorBoxSide::B,
        step: Step::Apply,
    })?;

    // T22 is forced to 1, the transmission scale is carried by S21 separately
    let t_norm = s2t(s, true)?;
    let t_cal = a_inv.dot(&t_norm).dot(&b_inv);

    let t22 = t_cal[[1, 1]];
    if t22.norm() < NEAR_ZERO {
        return Err(CalibrationError::singular(
            Step::Apply,
            "corrected T22 vanishes",
        ));
    }
    let t_cal = t_cal / t22;

    let zero = Complex64::new(0.0, 0.0);
    let s21_raw = s[[1, 0]];
    let s21 = boxes.k * s21_raw / t22;

    // det(T_cal) = S12/S21 once T22 = 1
    let det = t_cal[[0, 0]] - t_cal[[1, 0]] * t_cal[[0, 1]];
    let s12 = if s21.norm() >= NEAR_ZERO {
        det / s21
    } else if s[[0, 1]].norm() < NEAR_ZERO {
        // no transmission in either direction
        zero
    } else {
        return Err(CalibrationError::singular(
            Step::Apply,
            "S21 vanishes, S12 cannot be reconstructed",
        ));
    };

    let corrected = mat2(t_cal[[0, 1]], s12, s21, -t_cal[[1, 0]]);
    if !all_finite(&corrected) {
        return Err(CalibrationError::NonFinite { step: Step::Apply });
    }
    Ok(corrected)
}
