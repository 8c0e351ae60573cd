#![allow(dead_code)]

use prism_rs::ProcessingConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

/// Dominant frequency of the synthetic event (Hz)
pub const EVENT_FREQUENCY: f64 = 2.0;
/// Duration of the synthetic event (s)
pub const EVENT_DURATION: f64 = 4.0;
/// Displacement amplitude of the synthetic event (cm)
pub const EVENT_AMPLITUDE: f64 = 0.1;

/// Acceleration of a transient whose displacement starts and ends at rest:
///   D(τ) = A (1 - cos ωτ) h(τ/T),  h(x) = (1 - x)³ (1 + 15x)
/// Samples are taken mid-interval so the jump at the onset falls between
/// samples `onset - 1` and `onset`.
pub fn event_acceleration(n: usize, dt: f64, onset: usize) -> Vec<f64> {
    let omega = 2.0 * PI * EVENT_FREQUENCY;
    let t_end = EVENT_DURATION;
    let c = 15.0;

    (0..n)
        .map(|i| {
            let tau = (i as f64 - onset as f64 + 0.5) * dt;
            if !(0.0..=t_end).contains(&tau) {
                return 0.0;
            }
            let x = tau / t_end;
            let h = (1.0 - x).powi(3) * (1.0 + c * x);
            let h1 = -3.0 * (1.0 - x).powi(2) * (1.0 + c * x) + c * (1.0 - x).powi(3);
            let h2 = 6.0 * (1.0 - x) * (1.0 + c * x) - 6.0 * c * (1.0 - x).powi(2);
            let (sin, cos) = (omega * tau).sin_cos();
            EVENT_AMPLITUDE
                * (omega * omega * cos * h
                    + 2.0 * omega * sin * h1 / t_end
                    + (1.0 - cos) * h2 / (t_end * t_end))
        })
        .collect()
}

/// Seeded uniform noise in `[-amplitude, amplitude)`
pub fn uniform_noise(n: usize, amplitude: f64, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| amplitude * rng.random_range(-1.0..1.0))
        .collect()
}

/// Event plus noise plus an acceleration drift `c0 + c1 t`
pub fn ramp_drift_record(n: usize, dt: f64, onset: usize, c0: f64, c1: f64, seed: u64) -> Vec<f64> {
    let event = event_acceleration(n, dt, onset);
    let noise = uniform_noise(n, 0.05, seed);
    (0..n)
        .map(|i| event[i] + noise[i] + c0 + c1 * i as f64 * dt)
        .collect()
}

/// Event plus noise plus an acceleration drift that ramps linearly from zero
/// at `knee_start` to `level` at `knee_end` and stays there. The velocity
/// drift is flat, then quadratic, then linear.
pub fn knee_drift_record(
    n: usize,
    dt: f64,
    onset: usize,
    knee_start: usize,
    knee_end: usize,
    level: f64,
    seed: u64,
) -> Vec<f64> {
    let event = event_acceleration(n, dt, onset);
    let noise = uniform_noise(n, 0.05, seed);
    (0..n)
        .map(|i| {
            let drift = if i < knee_start {
                0.0
            } else if i < knee_end {
                level * (i - knee_start) as f64 / (knee_end - knee_start) as f64
            } else {
                level
            };
            event[i] + noise[i] + drift
        })
        .collect()
}

pub fn sine(n: usize, dt: f64, freq: f64) -> Vec<f64> {
    (0..n)
        .map(|i| (2.0 * PI * freq * i as f64 * dt).sin())
        .collect()
}

/// Default configuration without resampling, so indices stay in the input frame
pub fn config_without_resampling() -> ProcessingConfig {
    let mut config = ProcessingConfig::default();
    config.resample.min_samples_per_second = 0.0;
    config
}

pub fn max_abs(values: &[f64]) -> f64 {
    values.iter().fold(0.0, |m, v| m.max(v.abs()))
}
