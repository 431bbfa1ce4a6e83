//! Mathematical functions module
//!
//! Provides the matrix helpers, parameter transforms and unit conversions
//! used by the calibration code.

pub mod conversions;
pub mod linalg;
pub mod matrix_ops;
pub mod transforms;

pub use conversions::*;
pub use transforms::*;
