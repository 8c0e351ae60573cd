//! Butterworth Bandpass Filter
//!
//! Bandpass design from an analog low-pass prototype, bilinear-transformed
//! into second-order sections (biquads). Supports a causal single pass and
//! an acausal forward/backward pass with end tapers and zero padding.

use rustfft::num_complex::Complex;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::array_ops::{cosine_taper, find_zero_crossing};
use crate::error::{PrismError, Result};

/// Largest accepted roll-off (poles per side of the band)
pub const MAX_ROLL_OFF: usize = 8;

/// Smallest accepted gap between the two corners, in Hz
pub const MIN_CORNER_SEPARATION: f64 = 0.01;

/// Second-order section (biquad) coefficients
/// Transfer function: H(z) = (b0 + b1*z^-1 + b2*z^-2) / (1 + a1*z^-1 + a2*z^-2)
#[derive(Debug, Clone, Copy)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

/// State for a single biquad section (Direct Form II Transposed)
#[derive(Debug, Clone, Default)]
struct BiquadState {
    z1: f64,
    z2: f64,
}

/// Single biquad filter section
#[derive(Debug, Clone)]
pub struct BiquadFilter {
    coeffs: BiquadCoeffs,
    state: BiquadState,
}

impl BiquadFilter {
    pub fn new(coeffs: BiquadCoeffs) -> Self {
        Self {
            coeffs,
            state: BiquadState::default(),
        }
    }

    pub fn coeffs(&self) -> BiquadCoeffs {
        self.coeffs
    }

    /// Process a single sample using Direct Form II Transposed
    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let output = self.coeffs.b0 * input + self.state.z1;
        self.state.z1 = self.coeffs.b1 * input - self.coeffs.a1 * output + self.state.z2;
        self.state.z2 = self.coeffs.b2 * input - self.coeffs.a2 * output;
        output
    }

    pub fn reset(&mut self) {
        self.state = BiquadState::default();
    }

    /// Filter the whole slice in place, starting from rest
    pub fn run_forward(&mut self, signal: &mut [f64]) {
        self.reset();
        for sample in signal.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    /// Filter the time-reversed slice in place, starting from rest
    pub fn run_backward(&mut self, signal: &mut [f64]) {
        self.reset();
        for sample in signal.iter_mut().rev() {
            *sample = self.process(*sample);
        }
    }
}

/// Samples tapered at each end of the record before filtering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaperLengths {
    pub start: usize,
    pub end: usize,
}

/// What a filter pass leaves behind besides the in-place result
#[derive(Debug, Clone)]
pub struct FilterOutput {
    /// Filtered signal including the zero padding on both sides
    pub padded: Vec<f64>,
    pub pad_length: usize,
    pub taper: TaperLengths,
}

/// Butterworth bandpass filter as a cascade of `2 * roll_off` biquads
#[derive(Debug, Clone)]
pub struct ButterworthFilter {
    low_cut: f64,
    high_cut: f64,
    roll_off: usize,
    dt: f64,
    causal: bool,
    sections: Vec<BiquadFilter>,
}

impl ButterworthFilter {
    /// Design a bandpass filter for corners `low_cut < high_cut` (Hz).
    pub fn new(low_cut: f64, high_cut: f64, dt: f64, roll_off: usize, causal: bool) -> Result<Self> {
        Self::validate(low_cut, high_cut, roll_off, dt)?;

        let w1 = Self::prewarp(low_cut, dt);
        let w2 = Self::prewarp(high_cut, dt);
        let sections = Self::design_sections(w1, w2, roll_off)
            .into_iter()
            .map(BiquadFilter::new)
            .collect();

        Ok(Self {
            low_cut,
            high_cut,
            roll_off,
            dt,
            causal,
            sections,
        })
    }

    fn validate(low_cut: f64, high_cut: f64, roll_off: usize, dt: f64) -> Result<()> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(PrismError::InvalidSampleInterval(dt));
        }
        let nyquist = 0.5 / dt;
        if !(low_cut > 0.0 && low_cut.is_finite()) {
            return Err(PrismError::InvalidFilter(format!(
                "Low cutoff must be positive, got {} Hz",
                low_cut
            )));
        }
        if high_cut >= nyquist {
            return Err(PrismError::InvalidFilter(format!(
                "High cutoff ({} Hz) must be less than Nyquist ({} Hz)",
                high_cut, nyquist
            )));
        }
        if high_cut - low_cut < MIN_CORNER_SEPARATION {
            return Err(PrismError::InvalidFilter(format!(
                "Cutoffs must be at least {} Hz apart, got {} and {} Hz",
                MIN_CORNER_SEPARATION, low_cut, high_cut
            )));
        }
        if roll_off == 0 || roll_off > MAX_ROLL_OFF {
            return Err(PrismError::InvalidFilter(format!(
                "Roll-off must be between 1 and {}, got {}",
                MAX_ROLL_OFF, roll_off
            )));
        }
        Ok(())
    }

    /// Prewarp frequency for bilinear transform with `s = 2(1 - z^-1)/(1 + z^-1)`
    fn prewarp(freq: f64, dt: f64) -> f64 {
        2.0 * (PI * freq * dt).tan()
    }

    /// Each upper-half prototype pole maps to two bandpass poles, and each of
    /// those forms one section together with its conjugate.
    fn design_sections(w1: f64, w2: f64, roll_off: usize) -> Vec<BiquadCoeffs> {
        let order = 2 * roll_off;
        let bandwidth = w2 - w1;
        let center_sq = Complex::new(w1 * w2, 0.0);
        let mut sections = Vec::with_capacity(order);

        for k in 1..=roll_off {
            let theta = PI * (2 * k - 1) as f64 / (2 * order) as f64;
            let prototype = Complex::new(-theta.sin(), theta.cos());
            let a = prototype * (bandwidth / 2.0);
            let root = (a * a - center_sq).sqrt();

            for pole in [a + root, a - root] {
                let a0 = (Complex::new(2.0, 0.0) - pole).norm_sqr();
                let fact = 2.0 * bandwidth / a0;
                sections.push(BiquadCoeffs {
                    b0: fact,
                    b1: 0.0,
                    b2: -fact,
                    a1: (2.0 * pole.norm_sqr() - 8.0) / a0,
                    a2: (Complex::new(2.0, 0.0) + pole).norm_sqr() / a0,
                });
            }
        }
        sections
    }

    pub fn low_cut(&self) -> f64 {
        self.low_cut
    }

    pub fn high_cut(&self) -> f64 {
        self.high_cut
    }

    pub fn roll_off(&self) -> usize {
        self.roll_off
    }

    pub fn is_causal(&self) -> bool {
        self.causal
    }

    pub fn sections(&self) -> impl Iterator<Item = BiquadCoeffs> + '_ {
        self.sections.iter().map(|s| s.coeffs())
    }

    /// Zero padding added at each end before filtering
    pub fn pad_length(&self) -> usize {
        let r = self.roll_off as f64;
        let by_low = 3.0 * r / (self.low_cut * self.dt);
        let by_band = 6.0 * r / ((self.high_cut - self.low_cut) * self.dt);
        by_low.max(by_band).ceil() as usize
    }

    /// Start taper runs to the zero crossing preceding `onset`, falling back to
    /// twice the minimum when no crossing exists or it is too close.
    pub fn taper_lengths(
        &self,
        values: &[f64],
        onset: usize,
        end_taper_seconds: f64,
        min_taper_seconds: f64,
    ) -> TaperLengths {
        let min_taper = (min_taper_seconds / self.dt).round() as usize;
        let start = match find_zero_crossing(values, onset, 0) {
            Some(zc) if zc >= min_taper => zc,
            _ => 2 * min_taper,
        };
        TaperLengths {
            start: start.min(values.len()),
            end: ((end_taper_seconds / self.dt).round() as usize).min(values.len()),
        }
    }

    /// Filter `values` in place.
    ///
    /// Causal filtering is a single forward pass of every section. Acausal
    /// filtering tapers both ends, zero-pads, runs the cascade forward and
    /// then backward, and strips the padding from `values`. The padded
    /// signal is returned for integration.
    pub fn apply(
        &self,
        values: &mut [f64],
        onset: usize,
        end_taper_seconds: f64,
        min_taper_seconds: f64,
    ) -> FilterOutput {
        let mut sections = self.sections.clone();

        if self.causal {
            for section in &mut sections {
                section.run_forward(values);
            }
            return FilterOutput {
                padded: values.to_vec(),
                pad_length: 0,
                taper: TaperLengths::default(),
            };
        }

        let taper = self.taper_lengths(values, onset, end_taper_seconds, min_taper_seconds);
        cosine_taper(values, taper.start, taper.end);

        let pad_length = self.pad_length();
        let mut padded = vec![0.0; values.len() + 2 * pad_length];
        padded[pad_length..pad_length + values.len()].copy_from_slice(values);

        // Whole cascade forward, then whole cascade backward, so the padding
        // holds the true two-sided response
        for section in &mut sections {
            section.run_forward(&mut padded);
        }
        for section in sections.iter_mut().rev() {
            section.run_backward(&mut padded);
        }

        values.copy_from_slice(&padded[pad_length..pad_length + values.len()]);
        FilterOutput {
            padded,
            pad_length,
            taper,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rms(values: &[f64]) -> f64 {
        (values.iter().map(|x| x * x).sum::<f64>() / values.len() as f64).sqrt()
    }

    #[test]
    fn test_section_count() {
        let filter = ButterworthFilter::new(0.1, 20.0, 0.01, 4, false).unwrap();
        assert_eq!(filter.sections().count(), 8);
    }

    #[test]
    fn test_rejects_bad_corners() {
        assert!(ButterworthFilter::new(0.0, 20.0, 0.01, 4, false).is_err());
        assert!(ButterworthFilter::new(1.0, 50.0, 0.01, 4, false).is_err());
        assert!(ButterworthFilter::new(1.0, 1.005, 0.01, 4, false).is_err());
        assert!(ButterworthFilter::new(0.1, 20.0, 0.01, 0, false).is_err());
        assert!(ButterworthFilter::new(0.1, 20.0, 0.01, MAX_ROLL_OFF + 1, false).is_err());
    }

    #[test]
    fn test_zero_in_zero_out() {
        let filter = ButterworthFilter::new(0.1, 20.0, 0.01, 4, false).unwrap();
        let mut values = vec![0.0; 1000];
        let output = filter.apply(&mut values, 200, 2.0, 0.5);
        assert!(values.iter().all(|&v| v == 0.0));
        assert!(output.padded.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_passband_sine_keeps_amplitude() {
        let dt = 0.01;
        let filter = ButterworthFilter::new(0.1, 10.0, dt, 4, false).unwrap();
        let original: Vec<f64> = (0..4000)
            .map(|i| (2.0 * PI * 1.0 * i as f64 * dt).sin())
            .collect();
        let mut values = original.clone();
        filter.apply(&mut values, 0, 2.0, 0.5);

        let middle = 1500..2500;
        let ratio = rms(&values[middle.clone()]) / rms(&original[middle]);
        assert!((ratio - 1.0).abs() < 0.05, "gain ratio {}", ratio);
    }

    #[test]
    fn test_stopband_sine_is_attenuated() {
        let dt = 0.01;
        let filter = ButterworthFilter::new(0.5, 5.0, dt, 4, false).unwrap();
        let original: Vec<f64> = (0..4000)
            .map(|i| (2.0 * PI * 30.0 * i as f64 * dt).sin())
            .collect();
        let mut values = original.clone();
        filter.apply(&mut values, 0, 2.0, 0.5);
        assert!(rms(&values[1500..2500]) < 0.01);
    }

    #[test]
    fn test_taper_falls_back_without_crossing() {
        let filter = ButterworthFilter::new(0.1, 20.0, 0.01, 4, false).unwrap();
        let values = vec![1.0; 1000];
        let taper = filter.taper_lengths(&values, 300, 2.0, 0.5);
        assert_eq!(taper.start, 100);
        assert_eq!(taper.end, 200);
    }

    #[test]
    fn test_padding_holds_two_sided_response() {
        let dt = 0.01;
        let filter = ButterworthFilter::new(0.1, 20.0, dt, 4, false).unwrap();
        let mut impulse = vec![0.0; 2000];
        impulse[1000] = 1.0;
        let output = filter.apply(&mut impulse, 1000, 0.0, 0.0);

        let pad = output.pad_length;
        let energy = |v: &[f64]| v.iter().map(|x| x * x).sum::<f64>();
        let total = energy(&output.padded);
        let head = energy(&output.padded[..pad]);
        let tail = energy(&output.padded[pad + 2000..]);
        assert!(total > 0.0);
        assert!(head / total < 1e-2, "head share {}", head / total);
        assert!(tail / total < 1e-2, "tail share {}", tail / total);
        // In-record samples are the stripped padded signal
        assert_eq!(&output.padded[pad..pad + 2000], &impulse[..]);
    }

    #[test]
    fn test_causal_is_single_pass() {
        let dt = 0.01;
        let causal = ButterworthFilter::new(0.1, 10.0, dt, 2, true).unwrap();
        let acausal = ButterworthFilter::new(0.1, 10.0, dt, 2, false).unwrap();
        let mut impulse = vec![0.0; 2000];
        impulse[1000] = 1.0;
        let mut a = impulse.clone();
        let mut b = impulse;
        causal.apply(&mut a, 1000, 0.0, 0.0);
        acausal.apply(&mut b, 1000, 0.0, 0.0);
        // A causal response cannot precede the impulse
        assert!(a[..1000].iter().all(|&v| v == 0.0));
        assert!(b[..1000].iter().any(|&v| v != 0.0));
    }
}
