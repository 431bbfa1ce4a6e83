//! Benchmarks for the swept TRL calibration
//!
//! Tests how the solve and correction scale with the number of frequency points.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array2;
use num_complex::Complex64;
use std::f64::consts::PI;
use trl_core::calibration::{Port, TrlCalibration, TrlConfig};
use trl_core::frequency::{Frequency, FrequencyUnit, SweepType};
use trl_core::math::matrix_ops::mat2;
use trl_core::math::transforms::{s2t, t2s};
use trl_core::Network;

const LENGTH: f64 = 5e-3;

fn cx(re: f64, im: f64) -> Complex64 {
    Complex64::new(re, im)
}

fn line(gamma: Complex64, length: f64) -> Array2<Complex64> {
    let e = (-gamma * length).exp();
    mat2(cx(0.0, 0.0), e, e, cx(0.0, 0.0))
}

/// Error boxes with a slowly rotating phase
fn boxes(f: f64) -> (Array2<Complex64>, Array2<Complex64>, Complex64) {
    let rot = |m: f64, a: f64| Complex64::from_polar(m, a - 0.05 * f / 1e9);
    (
        mat2(rot(0.9, 0.1), rot(0.05, -0.7), rot(-0.08, 0.3), cx(1.0, 0.0)),
        mat2(rot(0.85, -0.2), rot(0.04, 1.0), rot(0.06, -0.4), cx(1.0, 0.0)),
        Complex64::from_polar(0.8, 0.3),
    )
}

/// Create a synthetic calibration over `nfreq` points
fn create_calibration(nfreq: usize) -> (TrlCalibration, Network) {
    let freq = Frequency::new(2.0, 10.0, nfreq, FrequencyUnit::GHz, SweepType::Linear);
    let gamma = |f: f64| cx(1.5, 2.0 * PI * f * 2.6_f64.sqrt() / 299_792_458.0);

    let measure = |f: f64, s: &Array2<Complex64>| {
        let (a, b, k) = boxes(f);
        let t = s2t(s, false).unwrap();
        t2s(&(a.dot(&t).dot(&b) * k), false).unwrap()
    };
    let reflect_a = |f: f64| {
        let (a, _, _) = boxes(f);
        (a[[0, 1]] - a[[0, 0]]) / (a[[1, 1]] - a[[1, 0]])
    };
    let reflect_b = |f: f64| {
        let (_, b, _) = boxes(f);
        (-b[[0, 0]] - b[[1, 0]]) / (b[[1, 1]] + b[[0, 1]])
    };

    let thru: Vec<_> = freq.f().iter().map(|&f| measure(f, &line(gamma(f), 0.0))).collect();
    let line_s: Vec<_> = freq
        .f()
        .iter()
        .map(|&f| measure(f, &line(gamma(f), LENGTH)))
        .collect();
    let dut: Vec<_> = freq
        .f()
        .iter()
        .map(|&f| measure(f, &line(gamma(f), 2.0 * LENGTH)))
        .collect();
    let ra: Vec<_> = freq.f().iter().map(|&f| reflect_a(f)).collect();
    let rb: Vec<_> = freq.f().iter().map(|&f| reflect_b(f)).collect();

    let cal = TrlCalibration::new(
        Network::from_two_port(freq.clone(), &thru).unwrap(),
        Network::from_two_port(freq.clone(), &line_s).unwrap(),
        Network::from_one_port(freq.clone(), &ra).unwrap(),
        Network::from_one_port(freq.clone(), &rb).unwrap(),
        TrlConfig::from_ereff(LENGTH, 2.5, freq.start()),
    );
    let dut = Network::from_two_port(freq, &dut).unwrap();
    (cal, dut)
}

fn bench_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("trl_sweep");

    for nfreq in [10, 100, 1000].iter() {
        let (cal, _) = create_calibration(*nfreq);
        group.bench_with_input(BenchmarkId::new("run", nfreq), nfreq, |b, _| {
            b.iter(|| black_box(cal.run()))
        });
    }

    group.finish();
}

fn bench_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("trl_apply");

    for nfreq in [10, 100, 1000].iter() {
        let (cal, dut) = create_calibration(*nfreq);
        let coefs = cal.run().unwrap();
        group.bench_with_input(BenchmarkId::new("two_port", nfreq), nfreq, |b, _| {
            b.iter(|| black_box(coefs.apply(black_box(&dut), Port::Left)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_run, bench_apply);
criterion_main!(benches);
