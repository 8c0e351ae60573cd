use serde::{Deserialize, Serialize};

use crate::array_ops::{integrate_trapezoid, mean, peak, rms};
use crate::filters::TaperLengths;
use crate::types::CorrectedRecords;

/// Standard gravity in cm/s²
pub const GRAVITY: f64 = 980.665;

/// Exceedance level for the bracketed duration, in cm/s²
pub const BRACKET_THRESHOLD: f64 = 5.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesPeak {
    pub value: f64,
    pub index: usize,
    /// Seconds from the first sample
    pub time: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesSummary {
    pub peak: SeriesPeak,
    pub mean: f64,
}

impl SeriesSummary {
    pub fn of(values: &[f64], dt: f64) -> Self {
        let peak = peak(values)
            .map(|p| SeriesPeak {
                value: p.value,
                index: p.index,
                time: p.index as f64 * dt,
            })
            .unwrap_or_default();
        Self {
            peak,
            mean: mean(values),
        }
    }
}

/// Scalar quantities derived from the corrected records
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComputedParameters {
    pub acceleration: SeriesSummary,
    pub velocity: SeriesSummary,
    pub displacement: SeriesSummary,
    pub initial_velocity: f64,
    pub initial_displacement: f64,
    pub onset_index: usize,
    pub onset_time: f64,
    pub buffered_onset_index: usize,
    pub buffered_onset_time: f64,
    pub taper: TaperLengths,
    /// cm/s
    pub arias_intensity: f64,
    /// cm/s
    pub cumulative_absolute_velocity: f64,
    /// Seconds between the first and last exceedance of 5 cm/s²
    pub bracketed_duration: f64,
    pub rms_acceleration: f64,
}

impl ComputedParameters {
    pub fn compute(
        records: &CorrectedRecords,
        onset: usize,
        buffered_onset: usize,
        taper: TaperLengths,
    ) -> Self {
        let dt = records.dt;
        let acc = &records.acceleration;

        let squared: Vec<f64> = acc.iter().map(|a| a * a).collect();
        let absolute: Vec<f64> = acc.iter().map(|a| a.abs()).collect();
        let arias = integrate_trapezoid(&squared, dt, 0.0)
            .last()
            .copied()
            .unwrap_or(0.0)
            * std::f64::consts::PI
            / (2.0 * GRAVITY);
        let cav = integrate_trapezoid(&absolute, dt, 0.0)
            .last()
            .copied()
            .unwrap_or(0.0);

        Self {
            acceleration: SeriesSummary::of(acc, dt),
            velocity: SeriesSummary::of(&records.velocity, dt),
            displacement: SeriesSummary::of(&records.displacement, dt),
            initial_velocity: records.velocity.first().copied().unwrap_or(0.0),
            initial_displacement: records.displacement.first().copied().unwrap_or(0.0),
            onset_index: onset,
            onset_time: onset as f64 * dt,
            buffered_onset_index: buffered_onset,
            buffered_onset_time: buffered_onset as f64 * dt,
            taper,
            arias_intensity: arias,
            cumulative_absolute_velocity: cav,
            bracketed_duration: bracketed_duration(acc, dt, BRACKET_THRESHOLD),
            rms_acceleration: rms(acc),
        }
    }
}

/// Time between the first and last sample with `|a| >= threshold`; 0 if none
pub fn bracketed_duration(acceleration: &[f64], dt: f64, threshold: f64) -> f64 {
    let first = acceleration.iter().position(|a| a.abs() >= threshold);
    let last = acceleration.iter().rposition(|a| a.abs() >= threshold);
    match (first, last) {
        (Some(f), Some(l)) => (l - f) as f64 * dt,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(acceleration: Vec<f64>) -> CorrectedRecords {
        let n = acceleration.len();
        CorrectedRecords {
            acceleration,
            velocity: vec![0.5; n],
            displacement: vec![-0.25; n],
            dt: 0.01,
        }
    }

    #[test]
    fn test_constant_acceleration_intensities() {
        let params = ComputedParameters::compute(&records(vec![10.0; 101]), 20, 10, TaperLengths::default());
        // 1 s of 10 cm/s²
        assert!((params.cumulative_absolute_velocity - 10.0).abs() < 1e-9);
        let expected_arias = std::f64::consts::PI / (2.0 * GRAVITY) * 100.0;
        assert!((params.arias_intensity - expected_arias).abs() < 1e-9);
        assert!((params.bracketed_duration - 1.0).abs() < 1e-12);
        assert!((params.rms_acceleration - 10.0).abs() < 1e-12);
        assert_eq!(params.initial_velocity, 0.5);
        assert_eq!(params.initial_displacement, -0.25);
        assert!((params.onset_time - 0.2).abs() < 1e-12);
        assert_eq!(params.buffered_onset_index, 10);
    }

    #[test]
    fn test_peak_summary_keeps_sign_and_time() {
        let mut acc = vec![0.0; 50];
        acc[30] = -7.0;
        let params = ComputedParameters::compute(&records(acc), 0, 0, TaperLengths::default());
        assert_eq!(params.acceleration.peak.value, -7.0);
        assert_eq!(params.acceleration.peak.index, 30);
        assert!((params.acceleration.peak.time - 0.3).abs() < 1e-12);
        assert_eq!(params.bracketed_duration, 0.0);
    }

    #[test]
    fn test_empty_records_are_neutral() {
        let params = ComputedParameters::compute(&records(Vec::new()), 0, 0, TaperLengths::default());
        assert_eq!(params.arias_intensity, 0.0);
        assert_eq!(params.acceleration.peak, SeriesPeak::default());
    }
}
