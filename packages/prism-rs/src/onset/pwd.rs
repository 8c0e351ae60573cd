use std::f64::consts::PI;
use std::sync::OnceLock;

use crate::array_ops::{central_difference, find_zero_crossing, integrate_trapezoid, mean, peak};
use crate::config::MIN_PWD_BINS;

use super::EventOnsetDetector;

/// Natural period of the reference oscillator (s)
const OSCILLATOR_PERIOD: f64 = 0.01;
/// Fraction of critical damping of the reference oscillator
const OSCILLATOR_DAMPING: f64 = 0.6;

const STANDARD_RATES: [u32; 9] = [20, 40, 50, 80, 100, 200, 250, 500, 1000];

/// Discrete state transition of the damped oscillator for one sample interval.
///
/// State is `[displacement, velocity]`; one step is `y = ae * y + aeb * x`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PwdCoefficients {
    pub ae: [[f64; 2]; 2],
    pub aeb: [f64; 2],
}

impl PwdCoefficients {
    /// Exact matrix exponential for interval `dt`
    pub fn compute(dt: f64) -> Self {
        let omega = 2.0 * PI / OSCILLATOR_PERIOD;
        let xi = OSCILLATOR_DAMPING;
        let omega_d = omega * (1.0 - xi * xi).sqrt();
        let c = 2.0 * xi * omega;
        let k = omega * omega;

        let decay = (-xi * omega * dt).exp();
        let (sin, cos) = (omega_d * dt).sin_cos();
        let ratio = xi * omega / omega_d;

        let ae = [
            [decay * (cos + ratio * sin), decay * sin / omega_d],
            [-decay * (k / omega_d) * sin, decay * (cos - ratio * sin)],
        ];
        let aeb = [(-c * ae[0][1] - ae[1][1] + 1.0) / k, ae[0][1]];
        Self { ae, aeb }
    }

    /// Precomputed coefficients for common sample rates, computed otherwise
    pub fn for_interval(dt: f64) -> Self {
        static TABLE: OnceLock<Vec<(u32, PwdCoefficients)>> = OnceLock::new();
        let table = TABLE.get_or_init(|| {
            STANDARD_RATES
                .iter()
                .map(|&sps| (sps, Self::compute(1.0 / sps as f64)))
                .collect()
        });

        let sps = 1.0 / dt;
        table
            .iter()
            .find(|(rate, _)| (*rate as f64 - sps).abs() < 1e-6)
            .map(|(_, coeffs)| *coeffs)
            .unwrap_or_else(|| Self::compute(dt))
    }
}

/// Damping-energy onset picker.
///
/// Drives the oscillator with the record up to its peak, accumulates the
/// energy dissipated by damping and picks where the energy rate first
/// leaves its background level.
#[derive(Debug, Clone, Copy, Default)]
pub struct PwdPicker {
    /// Histogram bins for the background level; `None` uses round(2/dt)
    pub histogram_bins: Option<usize>,
    pub buffer_seconds: f64,
}

impl PwdPicker {
    pub fn new(histogram_bins: Option<usize>, buffer_seconds: f64) -> Self {
        Self {
            histogram_bins,
            buffer_seconds,
        }
    }

    fn bins_for(&self, dt: f64) -> usize {
        self.histogram_bins
            .unwrap_or_else(|| (2.0 / dt).round() as usize)
            .max(MIN_PWD_BINS)
    }

    /// Oscillator velocity response to `samples`
    pub fn oscillator_velocity(samples: &[f64], dt: f64) -> Vec<f64> {
        let PwdCoefficients { ae, aeb } = PwdCoefficients::for_interval(dt);
        let mut y = [0.0, 0.0];
        samples
            .iter()
            .map(|&x| {
                y = [
                    ae[0][0] * y[0] + ae[0][1] * y[1] + aeb[0] * x,
                    ae[1][0] * y[0] + ae[1][1] * y[1] + aeb[1] * x,
                ];
                y[1]
            })
            .collect()
    }

    /// Midpoint of the most populated bin in the lower half of the histogram
    fn background_level(values: &[f64], bins: usize) -> Option<f64> {
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !(max > min) {
            return None;
        }
        let width = (max - min) / bins as f64;
        let mut counts = vec![0usize; bins];
        for &v in values {
            let bin = (((v - min) / width) as usize).min(bins - 1);
            counts[bin] += 1;
        }

        let mut mode = 0;
        for (b, &count) in counts.iter().enumerate().take(bins / 2) {
            if count > counts[mode] {
                mode = b;
            }
        }
        Some(min + (mode as f64 + 0.5) * width)
    }
}

impl EventOnsetDetector for PwdPicker {
    fn name(&self) -> &'static str {
        "pwd"
    }

    fn buffer_seconds(&self) -> f64 {
        self.buffer_seconds
    }

    fn pick(&self, samples: &[f64], dt: f64) -> Option<usize> {
        let p = peak(samples)?;
        let mut segment = samples[..=p.index].to_vec();
        if segment.len() < 3 {
            return None;
        }
        let m = mean(&segment);
        for v in segment.iter_mut() {
            *v -= m;
        }

        let omega = 2.0 * PI / OSCILLATOR_PERIOD;
        let velocity = Self::oscillator_velocity(&segment, dt);
        let power: Vec<f64> = velocity
            .iter()
            .map(|v| 2.0 * OSCILLATOR_DAMPING * omega * v * v)
            .collect();

        let mut energy = integrate_trapezoid(&power, dt, 0.0);
        let total = energy.iter().copied().fold(0.0, f64::max);
        if total <= 0.0 {
            return None;
        }
        for e in energy.iter_mut() {
            *e /= total;
        }
        let rate = central_difference(&energy, dt, 3).ok()?;

        let threshold = Self::background_level(&rate, self.bins_for(dt))?;
        let rough = rate.iter().position(|&r| r > threshold)?;
        Some(find_zero_crossing(&segment, rough, 0).unwrap_or(rough))
    }
}
