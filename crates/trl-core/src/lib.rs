//! trl-core: Thru-Reflect-Line VNA calibration
//!
//! Solves the two-port error model of a vector network analyzer from
//! measurements of a Thru, a Line and a symmetric Reflect standard, then
//! corrects raw DUT data with the solved error boxes.
//!
//! ## Modules
//!
//! - `calibration` - TRL solver, DUT correction, reference plane/impedance changes
//! - `error` - Typed calibration failures
//! - `frequency` - Frequency sweep representation
//! - `math` - Matrix helpers, S/T transforms, unit conversions
//! - `network` - N-port network container used by the swept calibration

pub mod calibration;
pub mod constants;
pub mod error;
pub mod frequency;
pub mod math;
pub mod network;

pub use calibration::{
    apply_cal, trl, Dut, ErrorBoxes, Port, TrlCalibration, TrlCoefficients, TrlConfig,
    TrlEstimate, TrlSolution,
};
pub use error::CalibrationError;
pub use frequency::Frequency;
pub use network::Network;
