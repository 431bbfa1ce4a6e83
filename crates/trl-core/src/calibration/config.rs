//! TRL calibration configuration

use num_complex::Complex64;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::trl::TrlEstimate;
use crate::error::{CalibrationError, Result};
use crate::math::conversions::ereff_2_gamma;

/// Reference impedance renormalization applied after the solve
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpedanceChange {
    /// Characteristic impedance of the Line standard (ohms)
    pub z_line: Complex64,
    /// New reference impedance (ohms)
    pub z_new: Complex64,
}

/// Settings for a swept TRL calibration
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct TrlConfig {
    /// Line length relative to the Thru (m)
    pub line_length: f64,
    /// Propagation constant estimate for the first frequency point (1/m)
    pub gamma_est: Complex64,
    /// Reflect estimate for the first frequency point
    pub reflect_est: Complex64,
    /// Reference plane offset applied after the solve (m), positive into the line
    #[cfg_attr(feature = "serde", serde(default))]
    pub plane_offset: Option<f64>,
    /// Impedance renormalization applied after the solve
    #[cfg_attr(feature = "serde", serde(default))]
    pub impedance: Option<ImpedanceChange>,
}

impl TrlConfig {
    /// Configuration with a short as the reflect estimate
    pub fn new(line_length: f64, gamma_est: Complex64) -> Self {
        Self {
            line_length,
            gamma_est,
            reflect_est: Complex64::new(-1.0, 0.0),
            plane_offset: None,
            impedance: None,
        }
    }

    /// Seed the propagation constant from an effective relative permittivity
    /// guess at the first frequency `f` (Hz)
    pub fn from_ereff(line_length: f64, ereff: f64, f: f64) -> Self {
        Self::new(line_length, ereff_2_gamma(Complex64::new(ereff, 0.0), f))
    }

    /// Set the reflect estimate (-1 short, +1 open)
    pub fn with_reflect_est(mut self, reflect_est: Complex64) -> Self {
        self.reflect_est = reflect_est;
        self
    }

    /// Reflect estimate for a standard offset by `offset` meters of line
    ///
    /// The nominal reflect is rotated by `exp(-2*gamma_est*offset)`.
    pub fn with_offset_reflect(mut self, reflect: Complex64, offset: f64) -> Self {
        self.reflect_est = reflect * (-2.0 * self.gamma_est * offset).exp();
        self
    }

    /// Move the reference plane after solving
    pub fn with_plane_offset(mut self, offset: f64) -> Self {
        self.plane_offset = Some(offset);
        self
    }

    /// Renormalize from the line impedance to `z_new` after solving
    pub fn with_impedance_change(mut self, z_line: Complex64, z_new: Complex64) -> Self {
        self.impedance = Some(ImpedanceChange { z_line, z_new });
        self
    }

    /// Estimate for the first frequency point
    pub fn estimate(&self) -> TrlEstimate {
        TrlEstimate::new(self.gamma_est).with_reflect(self.reflect_est)
    }

    /// Check the settings before running a sweep
    pub fn validate(&self) -> Result<()> {
        if !self.line_length.is_finite() || self.line_length <= 0.0 {
            return Err(CalibrationError::InvalidParameter {
                name: "line length",
                value: self.line_length.to_string(),
            });
        }
        if !self.gamma_est.is_finite() || !self.reflect_est.is_finite() {
            return Err(CalibrationError::InvalidParameter {
                name: "estimate",
                value: format!("gamma {} reflect {}", self.gamma_est, self.reflect_est),
            });
        }
        if let Some(offset) = self.plane_offset {
            if !offset.is_finite() {
                return Err(CalibrationError::InvalidParameter {
                    name: "plane offset",
                    value: offset.to_string(),
                });
            }
        }
        Ok(())
    }
}
