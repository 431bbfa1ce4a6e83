//! Calibration error types
//!
//! Every per-frequency operation reports failures through [`CalibrationError`],
//! tagged with the [`Step`] that detected them. None of these are recoverable
//! inside the solver: they indicate bad standards, bad estimates or a
//! corrupted measurement.

use std::fmt;
use thiserror::Error;

/// Result alias for per-frequency calibration operations
pub type Result<T> = std::result::Result<T, CalibrationError>;

/// Computation step that produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    S2T,
    T2S,
    SwitchCorrection,
    ThruInversion,
    LeftEigen,
    RightEigen,
    PropagationConstant,
    ScaleFactor,
    Reflect,
    Apply,
    PlaneShift,
    ImpedanceChange,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::S2T => "S-to-T conversion",
            Step::T2S => "T-to-S conversion",
            Step::SwitchCorrection => "switch-term correction",
            Step::ThruInversion => "thru inversion",
            Step::LeftEigen => "left-port eigen-decomposition",
            Step::RightEigen => "right-port eigen-decomposition",
            Step::PropagationConstant => "propagation constant",
            Step::ScaleFactor => "scale factor",
            Step::Reflect => "reflect resolution",
            Step::Apply => "calibration apply",
            Step::PlaneShift => "reference plane shift",
            Step::ImpedanceChange => "impedance change",
        };
        f.write_str(name)
    }
}

/// Which error box a singularity refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorBoxSide {
    /// Left (port A) error box
    A,
    /// Right (port B) error box
    B,
}

impl fmt::Display for ErrorBoxSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorBoxSide::A => f.write_str("A"),
            ErrorBoxSide::B => f.write_str("B"),
        }
    }
}

/// Calibration errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("{what}: expected a 2x2 matrix, got {rows}x{cols}")]
    Shape {
        what: &'static str,
        rows: usize,
        cols: usize,
    },

    #[error("singular network in {step}: {detail}")]
    SingularNetwork { step: Step, detail: &'static str },

    #[error(
        "degenerate standards in {step}: Line and Thru are electrically indistinguishable \
         (eigenvalue separation {separation:e})"
    )]
    DegenerateStandards { step: Step, separation: f64 },

    #[error("singular error box {side} in {step}")]
    SingularErrorBox { side: ErrorBoxSide, step: Step },

    #[error("ill-conditioned port-gain product a11*b11 (|a11*b11| = {magnitude:e})")]
    IllConditioned { magnitude: f64 },

    #[error("invalid {name}: {value}")]
    InvalidParameter { name: &'static str, value: String },

    #[error("non-finite result in {step}")]
    NonFinite { step: Step },
}

impl CalibrationError {
    pub(crate) fn singular(step: Step, detail: &'static str) -> Self {
        CalibrationError::SingularNetwork { step, detail }
    }

    /// Step that raised the error, if any
    pub fn step(&self) -> Option<Step> {
        match self {
            CalibrationError::SingularNetwork { step, .. }
            | CalibrationError::DegenerateStandards { step, .. }
            | CalibrationError::SingularErrorBox { step, .. }
            | CalibrationError::NonFinite { step } => Some(*step),
            CalibrationError::IllConditioned { .. } => Some(Step::ScaleFactor),
            CalibrationError::Shape { .. } | CalibrationError::InvalidParameter { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_step() {
        let err = CalibrationError::singular(Step::S2T, "S21 is zero");
        assert_eq!(
            err.to_string(),
            "singular network in S-to-T conversion: S21 is zero"
        );
        assert_eq!(err.step(), Some(Step::S2T));

        let err = CalibrationError::SingularErrorBox {
            side: ErrorBoxSide::B,
            step: Step::Apply,
        };
        assert_eq!(err.to_string(), "singular error box B in calibration apply");
    }

    #[test]
    fn test_ill_conditioned_belongs_to_scale_factor() {
        let err = CalibrationError::IllConditioned { magnitude: 1e-14 };
        assert_eq!(err.step(), Some(Step::ScaleFactor));
        assert!(err.to_string().contains("a11*b11"));
    }

    #[test]
    fn test_shape_error_has_no_step() {
        let err = CalibrationError::Shape {
            what: "thru",
            rows: 3,
            cols: 3,
        };
        assert_eq!(err.step(), None);
        assert!(err.to_string().contains("3x3"));
    }
}
