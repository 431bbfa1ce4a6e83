//! Per-frequency access to network data

use ndarray::Array2;
use num_complex::Complex64;

use super::core::Network;
use crate::math::matrix_ops::extract_freq_slice;

impl Network {
    /// Get frequency vector in Hz
    pub fn f(&self) -> &[f64] {
        self.frequency.f()
    }

    /// S-parameter matrix at frequency index `f`
    pub fn s_at(&self, f: usize) -> Array2<Complex64> {
        extract_freq_slice(&self.s, f)
    }
}
