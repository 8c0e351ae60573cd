//! Pre-event offset and velocity trend removal

use serde::{Deserialize, Serialize};

use crate::array_ops::{best_fit_trend, find_zero_crossing, mean, remove_value};
use crate::integrator::Integrator;

/// Orders tried for the velocity trend
const TREND_ORDERS: std::ops::RangeInclusive<usize> = 1..=2;

/// What trend removal took out of the record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendReport {
    pub pre_event_mean: f64,
    pub velocity_offset: f64,
    /// Order of the velocity trend that was removed (0 when none was fitted)
    pub order: usize,
    pub velocity_trend: Vec<f64>,
    pub fit_rms: f64,
}

/// Corrected velocity, the mean-removed series before detrending, and the report
#[derive(Debug, Clone)]
pub struct TrendOutcome {
    pub velocity: Vec<f64>,
    pub demeaned_acceleration: Vec<f64>,
    pub demeaned_velocity: Vec<f64>,
    pub report: TrendReport,
}

/// Remove the pre-event mean from `acceleration` and the best low-order
/// velocity trend, in place. Returns the re-integrated velocity.
pub fn remove_trends(
    acceleration: &mut [f64],
    onset: usize,
    dt: f64,
    integrator: &Integrator,
) -> TrendOutcome {
    let onset = onset.min(acceleration.len());
    let pre_event_mean = mean(&acceleration[..onset]);
    remove_value(acceleration, pre_event_mean);

    let mut velocity = integrator.integrate(acceleration, dt, 0.0);
    let reference = match find_zero_crossing(&velocity, onset, 0) {
        Some(zc) if zc > 0 => zc,
        _ => onset,
    };
    let velocity_offset = mean(&velocity[..reference]);
    remove_value(&mut velocity, velocity_offset);
    let demeaned_acceleration = acceleration.to_vec();

    let Some(fit) = best_fit_trend(&velocity, dt, TREND_ORDERS) else {
        return TrendOutcome {
            velocity: velocity.clone(),
            demeaned_acceleration,
            demeaned_velocity: velocity,
            report: TrendReport {
                pre_event_mean,
                velocity_offset,
                order: 0,
                velocity_trend: Vec::new(),
                fit_rms: 0.0,
            },
        };
    };

    let slope = fit.polynomial.derivative();
    for (i, a) in acceleration.iter_mut().enumerate() {
        *a -= slope.evaluate(i as f64 * dt);
    }

    let init = velocity.first().copied().unwrap_or(0.0) - fit.polynomial.evaluate(0.0);
    let corrected = integrator.integrate(acceleration, dt, init);

    TrendOutcome {
        velocity: corrected,
        demeaned_acceleration,
        demeaned_velocity: velocity,
        report: TrendReport {
            pre_event_mean,
            velocity_offset,
            order: fit.polynomial.order(),
            velocity_trend: fit.polynomial.coefficients.clone(),
            fit_rms: fit.rms,
        },
    }
}
