//! Array statistics and elementary operations on sampled series
//!
//! Every function here works on plain slices. Empty input returns a neutral
//! value (0.0, `None`, or an empty vector) instead of NaN.

use nalgebra::{DMatrix, DVector};
use std::f64::consts::PI;
use std::ops::RangeInclusive;

use crate::error::{PrismError, Result};

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Population variance
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|&x| (x - m).powi(2)).sum::<f64>() / values.len() as f64
}

pub fn rms(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    (values.iter().map(|&x| x * x).sum::<f64>() / values.len() as f64).sqrt()
}

/// RMS of the sample-wise difference over the common length
pub fn rms_difference(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }
    let sum: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum();
    (sum / n as f64).sqrt()
}

/// Largest absolute sample, keeping its sign
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub index: usize,
    pub value: f64,
}

pub fn peak(values: &[f64]) -> Option<Peak> {
    let mut best: Option<Peak> = None;
    for (index, &value) in values.iter().enumerate() {
        match best {
            Some(p) if p.value.abs() >= value.abs() => {}
            _ => best = Some(Peak { index, value }),
        }
    }
    best
}

/// Search for the first strict sign change between `start` and `stop`.
///
/// Searches forward when `start < stop` and backward when `start > stop`.
/// The returned index is the sample on the search side of the crossing:
/// for `[1, 1, -1, -1]` a forward search from 0 to 3 returns 1, a backward
/// search from 3 to 0 returns 2.
pub fn find_zero_crossing(values: &[f64], start: usize, stop: usize) -> Option<usize> {
    if values.len() < 2 {
        return None;
    }
    let last = values.len() - 1;
    let start = start.min(last);
    let stop = stop.min(last);

    if start < stop {
        (start..stop).find(|&i| values[i] * values[i + 1] < 0.0)
    } else if start > stop {
        (stop + 1..=start).rev().find(|&i| values[i] * values[i - 1] < 0.0)
    } else {
        None
    }
}

pub fn remove_value(values: &mut [f64], value: f64) {
    for v in values.iter_mut() {
        *v -= value;
    }
}

/// Subtract the mean and return it
pub fn remove_mean(values: &mut [f64]) -> f64 {
    let m = mean(values);
    remove_value(values, m);
    m
}

/// Remove the least-squares straight line through the samples
pub fn remove_linear_trend(values: &mut [f64]) {
    let n = values.len();
    if n < 2 {
        remove_mean(values);
        return;
    }
    let nf = n as f64;
    let x_mean = (nf - 1.0) / 2.0;
    let y_mean = mean(values);
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (i, &y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        sxy += dx * (y - y_mean);
        sxx += dx * dx;
    }
    let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
    for (i, v) in values.iter_mut().enumerate() {
        *v -= y_mean + slope * (i as f64 - x_mean);
    }
}

/// Polynomial in time, coefficients in ascending power order
#[derive(Debug, Clone, PartialEq)]
pub struct Polynomial {
    pub coefficients: Vec<f64>,
}

impl Polynomial {
    pub fn new(coefficients: Vec<f64>) -> Self {
        Self { coefficients }
    }

    pub fn zero() -> Self {
        Self {
            coefficients: vec![0.0],
        }
    }

    pub fn order(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    /// Horner evaluation at time `t`
    pub fn evaluate(&self, t: f64) -> f64 {
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, &c| acc * t + c)
    }

    pub fn derivative(&self) -> Polynomial {
        if self.coefficients.len() <= 1 {
            return Polynomial::zero();
        }
        Polynomial::new(
            self.coefficients
                .iter()
                .enumerate()
                .skip(1)
                .map(|(k, &c)| k as f64 * c)
                .collect(),
        )
    }

    /// Sample the polynomial at `t = i * dt` for `i` in `0..len`
    pub fn sample(&self, len: usize, dt: f64) -> Vec<f64> {
        (0..len).map(|i| self.evaluate(i as f64 * dt)).collect()
    }
}

/// Least-squares polynomial through `values` sampled at `t = i * dt`.
///
/// The order is capped at `len - 1`. Time is normalized to [0, 1] for the
/// solve and the coefficients are scaled back afterwards. Returns `None`
/// for empty input or a rank-deficient system.
pub fn fit_polynomial(values: &[f64], dt: f64, order: usize) -> Option<Polynomial> {
    let n = values.len();
    if n == 0 {
        return None;
    }
    let order = order.min(n - 1);
    let denom = (n - 1).max(1) as f64;
    let span = denom * dt;

    let design = DMatrix::from_fn(n, order + 1, |i, j| (i as f64 / denom).powi(j as i32));
    let rhs = DVector::from_column_slice(values);
    let solution = design.svd(true, true).solve(&rhs, 1e-12).ok()?;

    let coefficients: Vec<f64> = solution
        .iter()
        .enumerate()
        .map(|(k, &c)| c / span.powi(k as i32))
        .collect();

    if coefficients.iter().all(|c| c.is_finite()) {
        Some(Polynomial::new(coefficients))
    } else {
        None
    }
}

/// A polynomial fit together with its RMS error against the data
#[derive(Debug, Clone)]
pub struct TrendFit {
    pub polynomial: Polynomial,
    pub rms: f64,
}

/// Fit every order in `orders` and keep the one with the lowest RMS error.
pub fn best_fit_trend(values: &[f64], dt: f64, orders: RangeInclusive<usize>) -> Option<TrendFit> {
    let mut best: Option<TrendFit> = None;
    for order in orders {
        let Some(polynomial) = fit_polynomial(values, dt, order) else {
            continue;
        };
        let fitted = polynomial.sample(values.len(), dt);
        let rms = rms_difference(values, &fitted);
        if best.as_ref().map_or(true, |b| rms < b.rms) {
            best = Some(TrendFit { polynomial, rms });
        }
    }
    best
}

/// Trapezoidal integration with initial value `init`
pub fn integrate_trapezoid(values: &[f64], dt: f64, init: f64) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let half = dt / 2.0;
    let mut out = Vec::with_capacity(values.len());
    out.push(init);
    for i in 1..values.len() {
        let next = out[i - 1] + (values[i - 1] + values[i]) * half;
        out.push(next);
    }
    out
}

// Antisymmetric central-difference weights for offsets 1..=m
const STENCIL_3: &[f64] = &[0.5];
const STENCIL_5: &[f64] = &[2.0 / 3.0, -1.0 / 12.0];
const STENCIL_7: &[f64] = &[0.75, -0.15, 1.0 / 60.0];
const STENCIL_9: &[f64] = &[0.8, -0.2, 4.0 / 105.0, -1.0 / 280.0];

fn stencil(half_width: usize) -> &'static [f64] {
    match half_width {
        1 => STENCIL_3,
        2 => STENCIL_5,
        3 => STENCIL_7,
        _ => STENCIL_9,
    }
}

/// Central-difference derivative of order 3, 5, 7 or 9.
///
/// Near the edges the widest stencil that still fits is used; the two end
/// samples fall back to one-sided first differences.
pub fn central_difference(values: &[f64], dt: f64, order: usize) -> Result<Vec<f64>> {
    let half_width = match order {
        3 => 1,
        5 => 2,
        7 => 3,
        9 => 4,
        _ => {
            return Err(PrismError::InvalidParameter(format!(
                "Central difference order must be 3, 5, 7 or 9, got {}",
                order
            )))
        }
    };

    let n = values.len();
    if n < 2 {
        return Ok(vec![0.0; n]);
    }

    let mut out = vec![0.0; n];
    for i in 0..n {
        let m = half_width.min(i).min(n - 1 - i);
        out[i] = if m == 0 {
            if i == 0 {
                (values[1] - values[0]) / dt
            } else {
                (values[n - 1] - values[n - 2]) / dt
            }
        } else {
            stencil(m)
                .iter()
                .enumerate()
                .map(|(k, w)| w * (values[i + k + 1] - values[i - k - 1]))
                .sum::<f64>()
                / dt
        };
    }
    Ok(out)
}

/// Five-point one-sided derivative at `f[0]`, looking forward
pub fn forward_slope_5pt(f: [f64; 5], dt: f64) -> f64 {
    (-25.0 * f[0] + 48.0 * f[1] - 36.0 * f[2] + 16.0 * f[3] - 3.0 * f[4]) / (12.0 * dt)
}

/// Five-point one-sided derivative at `f[0]`, looking backward (`f[k]` is k samples earlier)
pub fn backward_slope_5pt(f: [f64; 5], dt: f64) -> f64 {
    (25.0 * f[0] - 48.0 * f[1] + 36.0 * f[2] - 16.0 * f[3] + 3.0 * f[4]) / (12.0 * dt)
}

/// Half-cosine ramps over the first `start_len` and last `end_len` samples
pub fn cosine_taper(values: &mut [f64], start_len: usize, end_len: usize) {
    let n = values.len();
    let start_len = start_len.min(n);
    let end_len = end_len.min(n);

    for i in 0..start_len {
        values[i] *= 0.5 * (1.0 - (PI * i as f64 / start_len as f64).cos());
    }
    for j in 0..end_len {
        values[n - 1 - j] *= 0.5 * (1.0 - (PI * j as f64 / end_len as f64).cos());
    }
}
