//! Synthetic VNA measurements for the TRL tests
//!
//! Raw data is generated from known error boxes through
//! `T_raw = k * A * T_actual * B`, so a correct calibration must return the
//! boxes exactly (up to rounding).

#![allow(dead_code)]

use ndarray::Array2;
use num_complex::Complex64;
use trl_core::math::matrix_ops::mat2;
use trl_core::math::transforms::{s2t, t2s};
use trl_core::ErrorBoxes;

pub use trl_core::constants::SPEED_OF_LIGHT;

pub fn c(re: f64, im: f64) -> Complex64 {
    Complex64::new(re, im)
}

/// Error model with A22 = B22 = 1
pub struct Fixture {
    pub a: Array2<Complex64>,
    pub b: Array2<Complex64>,
    pub k: Complex64,
}

impl Fixture {
    pub fn sample() -> Self {
        Self::at_phase(0.0)
    }

    /// Error boxes whose entries rotate slowly with `phase`, mimicking
    /// cable and adapter delay across a sweep
    pub fn at_phase(phase: f64) -> Self {
        let rot = |mag: f64, arg: f64| Complex64::from_polar(mag, arg - phase);
        Self {
            a: mat2(rot(0.92, 0.15), rot(0.06, -0.8), rot(-0.08, 0.4), c(1.0, 0.0)),
            b: mat2(rot(0.85, -0.25), rot(0.05, 1.1), rot(0.07, -0.3), c(1.0, 0.0)),
            k: Complex64::from_polar(0.8, 0.3 - 2.0 * phase),
        }
    }

    pub fn boxes(&self) -> ErrorBoxes {
        ErrorBoxes {
            a: self.a.clone(),
            b: self.b.clone(),
            k: self.k,
        }
    }

    /// Raw 2-port S-parameters seen through the error boxes
    pub fn measure(&self, s: &Array2<Complex64>) -> Array2<Complex64> {
        let t = s2t(s, false).unwrap();
        let t_raw = self.a.dot(&t).dot(&self.b) * self.k;
        t2s(&t_raw, false).unwrap()
    }

    /// Raw reflection of `gamma` at port A
    pub fn measure_port_a(&self, gamma: Complex64) -> Complex64 {
        let a = &self.a;
        (a[[0, 0]] * gamma + a[[0, 1]]) / (a[[1, 0]] * gamma + a[[1, 1]])
    }

    /// Raw reflection of `gamma` at port B
    pub fn measure_port_b(&self, gamma: Complex64) -> Complex64 {
        let b = &self.b;
        (b[[0, 0]] * gamma - b[[1, 0]]) / (b[[1, 1]] - b[[0, 1]] * gamma)
    }
}

/// Matched line of `length` meters
pub fn matched_line(gamma: Complex64, length: f64) -> Array2<Complex64> {
    let e = (-gamma * length).exp();
    mat2(c(0.0, 0.0), e, e, c(0.0, 0.0))
}

/// Microstrip-like propagation constant: fixed loss, linear phase
pub fn line_gamma(f: f64, ereff: f64, alpha: f64) -> Complex64 {
    c(alpha, 2.0 * std::f64::consts::PI * f * ereff.sqrt() / SPEED_OF_LIGHT)
}

/// Raw ratios a VNA reports when its switch is not ideal
///
/// `forward`/`reverse` are the switch terms a2/b2 and a1/b1.
pub fn add_switch_terms(
    s: &Array2<Complex64>,
    forward: Complex64,
    reverse: Complex64,
) -> Array2<Complex64> {
    let one = c(1.0, 0.0);
    let s21 = s[[1, 0]] / (one - s[[1, 1]] * forward);
    let s11 = s[[0, 0]] + s[[0, 1]] * forward * s21;
    let s12 = s[[0, 1]] / (one - s[[0, 0]] * reverse);
    let s22 = s[[1, 1]] + s[[1, 0]] * reverse * s12;
    mat2(s11, s12, s21, s22)
}

pub fn assert_close(x: Complex64, y: Complex64, tol: f64, what: &str) {
    assert!(
        (x - y).norm() < tol,
        "{}: got {}, expected {} (|diff| = {:e})",
        what,
        x,
        y,
        (x - y).norm()
    );
}

pub fn assert_matrix_close(x: &Array2<Complex64>, y: &Array2<Complex64>, tol: f64, what: &str) {
    assert_eq!(x.dim(), y.dim(), "{}: shape mismatch", what);
    for ((i, j), v) in x.indexed_iter() {
        assert_close(*v, y[[i, j]], tol, &format!("{}[{},{}]", what, i, j));
    }
}
