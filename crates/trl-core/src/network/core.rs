//! Core Network struct and constructors
//!
//! Contains the fundamental Network data structure and factory methods.

use anyhow::{bail, Result};
use ndarray::{Array1, Array2, Array3};
use num_complex::Complex64;

use crate::frequency::Frequency;

/// Default reference impedance (ohms)
pub const DEFAULT_Z0: f64 = 50.0;

/// An N-port electrical network sampled over a frequency sweep
#[derive(Debug, Clone)]
pub struct Network {
    /// Frequency data
    pub frequency: Frequency,
    /// S-parameter data [nfreq, nports, nports]
    pub s: Array3<Complex64>,
    /// Reference impedance (per port)
    pub z0: Array1<Complex64>,
    /// Network name
    pub name: Option<String>,
}

impl Network {
    /// Create a new Network from S-parameters
    ///
    /// Fails if the S-parameter stack does not match the frequency count,
    /// is not square, or `z0` does not have one entry per port.
    pub fn new(frequency: Frequency, s: Array3<Complex64>, z0: Array1<Complex64>) -> Result<Self> {
        let (nfreq, rows, cols) = s.dim();
        if nfreq != frequency.npoints() {
            bail!(
                "S-parameters have {} frequency points, frequency has {}",
                nfreq,
                frequency.npoints()
            );
        }
        if rows != cols {
            bail!("S-parameter matrices must be square, got {}x{}", rows, cols);
        }
        if z0.len() != rows {
            bail!("z0 length {} does not match {} ports", z0.len(), rows);
        }

        Ok(Self {
            frequency,
            s,
            z0,
            name: None,
        })
    }

    /// Create a 1-port network from reflection coefficients, one per frequency
    pub fn from_one_port(frequency: Frequency, gamma: &[Complex64]) -> Result<Self> {
        let s = Array3::from_shape_fn((gamma.len(), 1, 1), |(f, _, _)| gamma[f]);
        Self::new(frequency, s, Array1::from_elem(1, Complex64::new(DEFAULT_Z0, 0.0)))
    }

    /// Create a 2-port network from 2x2 S-parameter matrices, one per frequency
    pub fn from_two_port(frequency: Frequency, s: &[Array2<Complex64>]) -> Result<Self> {
        for (f, m) in s.iter().enumerate() {
            if m.dim() != (2, 2) {
                bail!("S-parameters at frequency index {} are not 2x2", f);
            }
        }
        let s = Array3::from_shape_fn((s.len(), 2, 2), |(f, i, j)| s[f][[i, j]]);
        Self::new(frequency, s, Array1::from_elem(2, Complex64::new(DEFAULT_Z0, 0.0)))
    }

    /// Set the network name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Get the number of ports
    #[inline]
    pub fn nports(&self) -> usize {
        self.s.shape()[1]
    }

    /// Get the number of frequency points
    #[inline]
    pub fn nfreq(&self) -> usize {
        self.s.shape()[0]
    }

    /// Name for diagnostics
    pub(crate) fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }
}
