//! Swept TRL calibration over [`Network`] data
//!
//! Runs the single-point solver across a frequency sweep in order, feeding
//! the solution of each point forward as the estimate of the next.

use anyhow::{anyhow, bail, Context, Result};
use ndarray::{Array1, Array3};
use num_complex::Complex64;
use tracing::{debug, info};

use super::apply::{apply_cal, Dut, ErrorBoxes, Port};
use super::config::TrlConfig;
use super::switch::correct_switch;
use super::trl::{trl, TrlEstimate};
use crate::frequency::Frequency;
use crate::math::conversions::{complex_2_db, gamma_2_db_per_m, gamma_2_ereff};
use crate::network::Network;

/// Relative tolerance when checking that all standards share one sweep
const FREQ_MATCH_TOL: f64 = 1e-9;

/// Forward/reverse switch-term measurements (1-port networks)
#[derive(Debug, Clone)]
pub struct SwitchTerms {
    pub forward: Network,
    pub reverse: Network,
}

impl SwitchTerms {
    pub fn new(forward: Network, reverse: Network) -> Self {
        Self { forward, reverse }
    }

    /// Correct a 2-port network point by point
    pub fn correct(&self, ntwk: &Network) -> Result<Network> {
        ensure_same_sweep(&self.forward, ntwk)?;
        ensure_same_sweep(&self.reverse, ntwk)?;

        let mut s = Array3::<Complex64>::zeros(ntwk.s.raw_dim());
        for f in 0..ntwk.nfreq() {
            let corrected = correct_switch(
                &ntwk.s_at(f),
                self.forward.s[[f, 0, 0]],
                self.reverse.s[[f, 0, 0]],
            )
            .with_context(|| point_context(ntwk, f))?;
            s.slice_mut(ndarray::s![f, .., ..]).assign(&corrected);
        }

        let mut out = Network::new(ntwk.frequency.clone(), s, ntwk.z0.clone())?;
        out.name = ntwk.name.clone();
        Ok(out)
    }
}

/// Per-frequency TRL solution stacks
#[derive(Debug, Clone)]
pub struct TrlCoefficients {
    pub frequency: Frequency,
    /// Left error boxes [nfreq, 2, 2]
    pub a: Array3<Complex64>,
    /// Right error boxes [nfreq, 2, 2]
    pub b: Array3<Complex64>,
    /// Transmission scale factors
    pub k: Array1<Complex64>,
    /// Line propagation constants (1/m)
    pub gamma: Array1<Complex64>,
    /// Calibrated reflect standard
    pub reflect: Array1<Complex64>,
}

impl TrlCoefficients {
    fn zeros(frequency: Frequency) -> Self {
        let n = frequency.npoints();
        Self {
            frequency,
            a: Array3::zeros((n, 2, 2)),
            b: Array3::zeros((n, 2, 2)),
            k: Array1::zeros(n),
            gamma: Array1::zeros(n),
            reflect: Array1::zeros(n),
        }
    }

    /// Get the number of frequency points
    #[inline]
    pub fn nfreq(&self) -> usize {
        self.k.len()
    }

    /// Error boxes at frequency index `f`
    pub fn error_boxes(&self, f: usize) -> ErrorBoxes {
        ErrorBoxes {
            a: self.a.slice(ndarray::s![f, .., ..]).to_owned(),
            b: self.b.slice(ndarray::s![f, .., ..]).to_owned(),
            k: self.k[f],
        }
    }

    fn set_error_boxes(&mut self, f: usize, boxes: &ErrorBoxes) {
        self.a.slice_mut(ndarray::s![f, .., ..]).assign(&boxes.a);
        self.b.slice_mut(ndarray::s![f, .., ..]).assign(&boxes.b);
        self.k[f] = boxes.k;
    }

    /// Effective relative permittivity of the Line standard
    pub fn ereff(&self) -> Array1<Complex64> {
        Array1::from_shape_fn(self.nfreq(), |f| {
            gamma_2_ereff(self.gamma[f], self.frequency.f()[f])
        })
    }

    /// Line loss in dB/m
    pub fn loss_db_per_m(&self) -> Array1<f64> {
        self.gamma.mapv(gamma_2_db_per_m)
    }

    /// Move the reference plane at every point using the solved gamma
    pub fn shift_plane(&self, offset: f64) -> Result<Self> {
        self.map_boxes(|f, boxes| boxes.shift_plane(offset, self.gamma[f]))
    }

    /// Change the reference impedance at every point
    pub fn change_impedance(&self, z_from: Complex64, z_new: Complex64) -> Result<Self> {
        self.map_boxes(|_, boxes| boxes.change_impedance(z_from, z_new))
    }

    fn map_boxes<F>(&self, op: F) -> Result<Self>
    where
        F: Fn(usize, &ErrorBoxes) -> crate::error::Result<ErrorBoxes>,
    {
        let mut out = self.clone();
        for f in 0..self.nfreq() {
            let boxes = op(f, &self.error_boxes(f)).with_context(|| {
                format!(
                    "at frequency index {} ({} Hz)",
                    f,
                    self.frequency.f()[f]
                )
            })?;
            out.set_error_boxes(f, &boxes);
        }
        Ok(out)
    }

    /// Correct a (switch-corrected) DUT network
    ///
    /// `port` selects where a 1-port DUT was measured.
    pub fn apply(&self, dut: &Network, port: Port) -> Result<Network> {
        ensure_same_grid(self.frequency.f(), "calibration", dut.f(), dut.label())?;

        let mut s = Array3::<Complex64>::zeros(dut.s.raw_dim());
        for f in 0..dut.nfreq() {
            let boxes = self.error_boxes(f);
            let ctx = || point_context(dut, f);
            match dut.nports() {
                1 => {
                    let out = apply_cal(&Dut::OnePort(dut.s[[f, 0, 0]]), &boxes, port)
                        .with_context(ctx)?;
                    s[[f, 0, 0]] = out
                        .one_port()
                        .ok_or_else(|| anyhow!("expected a 1-port result"))?;
                }
                2 => {
                    let out = apply_cal(&Dut::TwoPort(dut.s_at(f)), &boxes, port)
                        .with_context(ctx)?;
                    let out = out
                        .two_port()
                        .ok_or_else(|| anyhow!("expected a 2-port result"))?;
                    s.slice_mut(ndarray::s![f, .., ..]).assign(out);
                }
                n => bail!("cannot calibrate a {}-port DUT with a 2-port TRL", n),
            }
        }

        let mut out = Network::new(dut.frequency.clone(), s, dut.z0.clone())?;
        out.name = dut.name.clone();
        Ok(out)
    }
}

/// Swept TRL calibration
#[derive(Debug, Clone)]
pub struct TrlCalibration {
    /// Measured Thru standard (2-port)
    pub thru: Network,
    /// Measured Line standard (2-port)
    pub line: Network,
    /// Reflect standard measured at port A (1-port)
    pub reflect_a: Network,
    /// Reflect standard measured at port B (1-port)
    pub reflect_b: Network,
    /// Optional switch terms, applied to every 2-port measurement
    pub switch_terms: Option<SwitchTerms>,
    pub config: TrlConfig,
}

impl TrlCalibration {
    pub fn new(
        thru: Network,
        line: Network,
        reflect_a: Network,
        reflect_b: Network,
        config: TrlConfig,
    ) -> Self {
        Self {
            thru,
            line,
            reflect_a,
            reflect_b,
            switch_terms: None,
            config,
        }
    }

    /// Correct all 2-port measurements for switch terms
    pub fn with_switch_terms(mut self, forward: Network, reverse: Network) -> Self {
        self.switch_terms = Some(SwitchTerms::new(forward, reverse));
        self
    }

    fn validate(&self) -> Result<()> {
        self.config.validate()?;

        if self.thru.nports() != 2 || self.line.nports() != 2 {
            bail!("Thru and Line standards must be 2-port networks");
        }
        if self.reflect_a.nports() != 1 || self.reflect_b.nports() != 1 {
            bail!("Reflect measurements must be 1-port networks");
        }
        if self.thru.nfreq() == 0 {
            bail!("calibration standards contain no frequency points");
        }
        if !self.thru.frequency.is_monotonic() {
            bail!("frequency sweep must be monotonic to thread TRL estimates");
        }

        for other in [&self.line, &self.reflect_a, &self.reflect_b] {
            ensure_same_sweep(&self.thru, other)?;
        }
        if let Some(sw) = &self.switch_terms {
            if sw.forward.nports() != 1 || sw.reverse.nports() != 1 {
                bail!("switch terms must be 1-port networks");
            }
            ensure_same_sweep(&self.thru, &sw.forward)?;
            ensure_same_sweep(&self.thru, &sw.reverse)?;
        }
        Ok(())
    }

    fn switch_corrected(&self, ntwk: &Network) -> Result<Network> {
        match &self.switch_terms {
            Some(sw) => sw.correct(ntwk),
            None => Ok(ntwk.clone()),
        }
    }

    /// Solve the calibration at every frequency point
    ///
    /// Points are processed in sweep order; each solution seeds the next.
    pub fn run(&self) -> Result<TrlCoefficients> {
        self.validate()?;

        let thru = self.switch_corrected(&self.thru)?;
        let line = self.switch_corrected(&self.line)?;
        let frequency = thru.frequency.clone();
        let nfreq = thru.nfreq();

        info!(
            nfreq,
            start_hz = frequency.start(),
            stop_hz = frequency.stop(),
            line_length = self.config.line_length,
            "solving TRL calibration"
        );

        let mut coefs = TrlCoefficients::zeros(frequency);
        (0..nfreq).try_fold(self.config.estimate(), |estimate: TrlEstimate, f| {
            let sol = trl(
                &thru.s_at(f),
                &line.s_at(f),
                self.config.line_length,
                estimate,
                self.reflect_a.s[[f, 0, 0]],
                self.reflect_b.s[[f, 0, 0]],
            )
            .with_context(|| {
                format!(
                    "TRL solve failed at frequency index {} ({} Hz)",
                    f,
                    thru.f()[f]
                )
            })?;

            debug!(
                index = f,
                freq_hz = thru.f()[f],
                gamma = %sol.gamma,
                reflect_db = complex_2_db(sol.reflect),
                "solved frequency point"
            );

            coefs.set_error_boxes(f, &sol.error_boxes());
            coefs.gamma[f] = sol.gamma;
            coefs.reflect[f] = sol.reflect;
            Ok::<_, anyhow::Error>(sol.estimate())
        })?;

        if let Some(offset) = self.config.plane_offset {
            coefs = coefs.shift_plane(offset).context("reference plane shift failed")?;
        }
        if let Some(z) = self.config.impedance {
            coefs = coefs
                .change_impedance(z.z_line, z.z_new)
                .context("impedance renormalization failed")?;
        }

        Ok(coefs)
    }

    /// Solve and apply the calibration to a DUT
    ///
    /// 2-port DUTs are switch-corrected first when switch terms are present.
    pub fn apply(&self, dut: &Network, port: Port) -> Result<Network> {
        let coefs = self.run()?;
        let dut = if dut.nports() == 2 {
            self.switch_corrected(dut)?
        } else {
            dut.clone()
        };
        coefs.apply(&dut, port)
    }
}

fn point_context(ntwk: &Network, f: usize) -> String {
    format!(
        "{} at frequency index {} ({} Hz)",
        ntwk.label(),
        f,
        ntwk.f()[f]
    )
}

fn ensure_same_sweep(reference: &Network, other: &Network) -> Result<()> {
    ensure_same_grid(reference.f(), reference.label(), other.f(), other.label())
}

fn ensure_same_grid(reference: &[f64], ref_label: &str, other: &[f64], label: &str) -> Result<()> {
    if reference.len() != other.len() {
        bail!(
            "{} has {} frequency points, {} has {}",
            label,
            other.len(),
            ref_label,
            reference.len()
        );
    }
    let mismatch = reference
        .iter()
        .zip(other)
        .position(|(a, b)| (a - b).abs() > FREQ_MATCH_TOL * a.abs().max(b.abs()));
    if let Some(f) = mismatch {
        bail!(
            "{} and {} disagree at frequency index {} ({} Hz vs {} Hz)",
            ref_label,
            label,
            f,
            reference[f],
            other[f]
        );
    }
    Ok(())
}
