//! VNA calibration
//!
//! - `trl` - single-point Thru-Reflect-Line solver
//! - `apply` - error-box correction of a measured DUT
//! - `reference` - reference plane shift and impedance renormalization
//! - `switch` - switch-term correction of raw 2-port data
//! - `sweep` - frequency-swept calibration over [`Network`](crate::Network) data

pub mod apply;
pub mod config;
pub mod reference;
pub mod switch;
pub mod sweep;
pub mod trl;

pub use apply::{apply_cal, Dut, ErrorBoxes, Port};
pub use config::{ImpedanceChange, TrlConfig};
pub use reference::{change_impedance, impedance_transformer, shift_plane};
pub use switch::correct_switch;
pub use sweep::{SwitchTerms, TrlCalibration, TrlCoefficients};
pub use trl::{trl, TrlEstimate, TrlSolution};
