//! Unit conversion functions
//!
//! Provides magnitude/dB conversions and the propagation-constant helpers
//! used to seed and interpret a TRL solve.

use num_complex::Complex64;
use std::f64::consts::PI;

use crate::constants::SPEED_OF_LIGHT;

/// Convert magnitude to dB (20*log10(mag))
pub fn mag_2_db(mag: f64) -> f64 {
    20.0 * mag.log10()
}

/// Convert complex number to dB (20*log10(|z|))
pub fn complex_2_db(z: Complex64) -> f64 {
    mag_2_db(z.norm())
}

/// Convert Nepers to dB
pub fn np_2_db(np: f64) -> f64 {
    np * 20.0 / 10.0_f64.ln()
}

/// Propagation constant from effective relative permittivity
///
/// `gamma = 2*pi*f/c0 * sqrt(-(ereff - j*eps))`. The tiny negative imaginary
/// offset keeps the square root on the branch with non-negative attenuation
/// and positive phase constant.
pub fn ereff_2_gamma(ereff: Complex64, f: f64) -> Complex64 {
    let arg = -(ereff - Complex64::new(0.0, f64::EPSILON));
    2.0 * PI * f / SPEED_OF_LIGHT * arg.sqrt()
}

/// Effective relative permittivity from propagation constant
///
/// `ereff = -(c0/(2*pi*f) * gamma)^2`
pub fn gamma_2_ereff(gamma: Complex64, f: f64) -> Complex64 {
    let x = SPEED_OF_LIGHT / (2.0 * PI * f) * gamma;
    -(x * x)
}

/// Line loss in dB per meter from the attenuation constant (Re gamma, Np/m)
pub fn gamma_2_db_per_m(gamma: Complex64) -> f64 {
    np_2_db(gamma.re)
}
