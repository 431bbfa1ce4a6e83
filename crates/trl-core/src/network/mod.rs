//! Network module - N-port electrical network representation
//!
//! Carries S-parameter data across a frequency sweep for the calibration
//! standards and devices under test.

mod core;
mod params;

pub use self::core::{Network, DEFAULT_Z0};
