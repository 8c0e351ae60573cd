//! Quality-control oracle for corrected velocity and displacement
//!
//! Both checks compare mean levels at the ends of the trace against the
//! configured tolerances. Comparisons are inclusive.

use serde::{Deserialize, Serialize};

use crate::array_ops::{find_zero_crossing, mean};
use crate::config::QcThresholds;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VelocityQc {
    pub initial: f64,
    pub residual: f64,
    pub passed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplacementQc {
    pub residual: f64,
    pub passed: bool,
}

/// Outcome of a QC pass. `displacement` is only filled by the full check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QcReport {
    pub window: usize,
    pub velocity: VelocityQc,
    pub displacement: Option<DisplacementQc>,
}

impl QcReport {
    pub fn passed(&self) -> bool {
        self.velocity.passed && self.displacement.map_or(true, |d| d.passed)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct QcChecker {
    thresholds: QcThresholds,
    window: usize,
}

impl QcChecker {
    /// Window is the longer of the pre-event span and one low-cut period.
    pub fn new(thresholds: QcThresholds, low_cut: f64, sample_rate: f64, onset: usize) -> Self {
        let period_samples = (sample_rate / low_cut).round() as usize;
        Self {
            thresholds,
            window: onset.max(period_samples),
        }
    }

    /// Window clamped to a record of `len` samples
    pub fn window(&self, len: usize) -> usize {
        self.window.min(len.saturating_sub(1))
    }

    /// Mean from the start through the first crossing after the window
    pub fn initial_level(&self, values: &[f64]) -> f64 {
        let Some(&first) = values.first() else {
            return 0.0;
        };
        let window = self.window(values.len());
        match find_zero_crossing(values, window, values.len() - 1) {
            Some(zc) => mean(&values[..=zc]),
            None => first,
        }
    }

    /// Mean from the last crossing before the end window to the end
    pub fn residual_level(&self, values: &[f64]) -> f64 {
        let Some(&last) = values.last() else {
            return 0.0;
        };
        let start = (values.len() - 1).saturating_sub(self.window(values.len()));
        match find_zero_crossing(values, start, 0) {
            Some(zc) => mean(&values[zc..]),
            None => last,
        }
    }

    pub fn check_velocity(&self, velocity: &[f64]) -> VelocityQc {
        let initial = self.initial_level(velocity);
        let residual = self.residual_level(velocity);
        VelocityQc {
            initial,
            residual,
            passed: initial.abs() <= self.thresholds.initial_velocity
                && residual.abs() <= self.thresholds.residual_velocity,
        }
    }

    pub fn check_displacement(&self, displacement: &[f64]) -> DisplacementQc {
        let residual = self.residual_level(displacement);
        DisplacementQc {
            residual,
            passed: residual.abs() <= self.thresholds.residual_displacement,
        }
    }

    /// Velocity-only check run after trend removal
    pub fn velocity_only(&self, velocity: &[f64]) -> QcReport {
        QcReport {
            window: self.window(velocity.len()),
            velocity: self.check_velocity(velocity),
            displacement: None,
        }
    }

    /// Velocity and displacement check run on filtered records
    pub fn full(&self, velocity: &[f64], displacement: &[f64]) -> QcReport {
        QcReport {
            window: self.window(velocity.len()),
            velocity: self.check_velocity(velocity),
            displacement: Some(self.check_displacement(displacement)),
        }
    }
}
