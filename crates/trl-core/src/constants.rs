//! Numerical constants for RF calculations
//!
//! Provides standardized tolerance values and physical constants
//! used throughout the library.

/// Tolerance for detecting near-zero values in division and singularity checks.
/// Used to prevent division by zero and detect ill-conditioned matrices.
pub const NEAR_ZERO: f64 = 1e-15;

/// Tolerance for SVD-based pseudo-inverse.
/// Singular values below this are treated as zero.
pub const SVD_TOLERANCE: f64 = 1e-14;

/// Relative separation below which the two eigenvalues of the
/// Line/Thru cascade are considered coincident.
pub const EIGEN_SEPARATION_TOL: f64 = 1e-10;

/// Magnitude of the port-gain product `a11*b11` below which the
/// square-root branch of the reflect solution is ill-conditioned.
pub const PORT_GAIN_TOL: f64 = 1e-12;

/// Speed of light in vacuum (m/s)
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;
