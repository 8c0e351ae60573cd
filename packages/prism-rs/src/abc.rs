//! Adaptive Baseline Correction
//!
//! Searches for a three-segment velocity baseline: a polynomial before the
//! event, a polynomial after the second break point, and a cubic Hermite
//! connector between them. Every candidate is corrected, filtered,
//! integrated and QC-checked; the best-scoring passing candidate wins.

use serde::{Deserialize, Serialize};

use crate::array_ops::{
    backward_slope_5pt, best_fit_trend, forward_slope_5pt, peak, rms_difference, Polynomial,
};
use crate::config::{AbcConfig, OrderRange};
use crate::error::Result;
use crate::integrator::Integrator;
use crate::pipeline::{filter_and_integrate, FilterStage, FilteredRecords};
use crate::qc::{QcChecker, QcReport};
use crate::types::ProcessingStatus;

/// Relative distance from the peak at which a corrected first sample is penalized
const PEAK_AT_ORIGIN_TOLERANCE: f64 = 1e-9;

/// Fraction of the record beyond which the second break point is not placed
const MAX_BREAK_FRACTION: f64 = 0.8;

/// One evaluated baseline. Arrays are not kept; the winner is rebuilt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub iteration: usize,
    pub break1: usize,
    pub break2: usize,
    pub order1: usize,
    pub order3: usize,
    pub rms: [f64; 3],
    pub score: f64,
    pub qc: QcReport,
}

/// Summary of the search attached to the result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbcReport {
    pub selected: Candidate,
    pub candidates_evaluated: usize,
    pub passed: bool,
}

pub enum AbcOutcome {
    Selected {
        status: ProcessingStatus,
        report: AbcReport,
        records: FilteredRecords,
    },
    NoCandidates,
}

/// Three-segment baseline in sample time
#[derive(Debug, Clone)]
struct Baseline {
    first: Polynomial,
    third: Polynomial,
    break1: usize,
    break2: usize,
}

impl Baseline {
    fn sample(&self, len: usize, dt: f64) -> Vec<f64> {
        let t1 = self.break1 as f64 * dt;
        let span = (self.break2 - self.break1) as f64 * dt;

        // Slopes at the joins from the fitted polynomials, not the data
        let y0 = self.first.evaluate(t1);
        let y1 = self.third.evaluate(0.0);
        let m0 = backward_slope_5pt([0, 1, 2, 3, 4].map(|k| self.first.evaluate(t1 - k as f64 * dt)), dt);
        let m1 = forward_slope_5pt([0, 1, 2, 3, 4].map(|k| self.third.evaluate(k as f64 * dt)), dt);

        (0..len)
            .map(|i| {
                if i < self.break1 {
                    self.first.evaluate(i as f64 * dt)
                } else if i < self.break2 {
                    let u = (i - self.break1) as f64 * dt / span;
                    hermite(u, y0, y1, m0 * span, m1 * span)
                } else {
                    self.third.evaluate((i - self.break2) as f64 * dt)
                }
            })
            .collect()
    }
}

/// Cubic Hermite on `u` in [0, 1] with end values and scaled end tangents
fn hermite(u: f64, y0: f64, y1: f64, tangent0: f64, tangent1: f64) -> f64 {
    let u2 = u * u;
    let u3 = u2 * u;
    (2.0 * u3 - 3.0 * u2 + 1.0) * y0
        + (u3 - 2.0 * u2 + u) * tangent0
        + (-2.0 * u3 + 3.0 * u2) * y1
        + (u3 - u2) * tangent1
}

pub struct AdaptiveBaselineCorrector<'a> {
    config: &'a AbcConfig,
    stage: &'a FilterStage,
    qc: &'a QcChecker,
    integrator: &'a Integrator,
    dt: f64,
}

struct Corrected {
    candidate: Candidate,
    records: FilteredRecords,
}

impl<'a> AdaptiveBaselineCorrector<'a> {
    pub fn new(
        config: &'a AbcConfig,
        stage: &'a FilterStage,
        qc: &'a QcChecker,
        integrator: &'a Integrator,
        dt: f64,
    ) -> Self {
        Self {
            config,
            stage,
            qc,
            integrator,
            dt,
        }
    }

    /// Second break points tried for a record of `len` samples
    pub fn break_points(&self, onset: usize, len: usize) -> Vec<usize> {
        let window = self.config.window_samples.max(1);
        let limit = (MAX_BREAK_FRACTION * len as f64).floor() as usize;
        let min_span = 1.0 / self.stage.filter.low_cut();

        (1..)
            .map(|k| onset + k * window)
            .take_while(|&b2| b2 <= limit)
            .filter(|&b2| (b2 - onset) as f64 * self.dt >= min_span)
            .collect()
    }

    /// Run the search on mean-removed acceleration and its velocity.
    pub fn run(&self, acceleration: &[f64], velocity: &[f64], onset: usize) -> Result<AbcOutcome> {
        let len = acceleration.len();
        let break1 = onset.min(len);
        let Some(first) = fit_segment(&velocity[..break1], self.dt, self.config.first_order_range) else {
            log::warn!("ABC: no pre-event samples to fit");
            return Ok(AbcOutcome::NoCandidates);
        };

        let mut candidates = Vec::new();
        let mut iteration = 0;
        for order3 in self.config.third_order_range.orders() {
            for break2 in self.break_points(break1, len) {
                let Some(third) = fit_segment(
                    &velocity[break2..],
                    self.dt,
                    OrderRange::new(order3, order3),
                ) else {
                    continue;
                };
                let baseline = Baseline {
                    first: first.clone(),
                    third,
                    break1,
                    break2,
                };
                let corrected = self.evaluate(acceleration, velocity, &baseline, iteration, onset)?;
                log::debug!(
                    "ABC candidate {}: b2={} order3={} score={:.6e} qc={}",
                    iteration,
                    break2,
                    order3,
                    corrected.candidate.score,
                    corrected.candidate.qc.passed()
                );
                candidates.push(corrected.candidate);
                iteration += 1;
            }
        }

        let total = candidates.len();
        let Some(selected) = select(candidates) else {
            log::warn!("ABC: no candidate break points for a record of {} samples", len);
            return Ok(AbcOutcome::NoCandidates);
        };
        let passed = selected.qc.passed();
        let status = if passed {
            ProcessingStatus::Good
        } else {
            ProcessingStatus::FailQc
        };
        log::info!(
            "ABC selected b1={} b2={} order3={} after {} candidates ({})",
            selected.break1,
            selected.break2,
            selected.order3,
            total,
            status
        );

        // Rebuild only the winner's arrays
        let third = fit_segment(
            &velocity[selected.break2..],
            self.dt,
            OrderRange::new(selected.order3, selected.order3),
        )
        .unwrap_or_else(Polynomial::zero);
        let baseline = Baseline {
            first,
            third,
            break1: selected.break1,
            break2: selected.break2,
        };
        let rebuilt = self.evaluate(acceleration, velocity, &baseline, selected.iteration, onset)?;

        Ok(AbcOutcome::Selected {
            status,
            report: AbcReport {
                selected: rebuilt.candidate,
                candidates_evaluated: total,
                passed,
            },
            records: rebuilt.records,
        })
    }

    fn evaluate(
        &self,
        acceleration: &[f64],
        velocity: &[f64],
        baseline: &Baseline,
        iteration: usize,
        onset: usize,
    ) -> Result<Corrected> {
        let len = acceleration.len();
        let curve = baseline.sample(len, self.dt);
        let (b1, b2) = (baseline.break1, baseline.break2);
        let rms = [
            rms_difference(&velocity[..b1], &curve[..b1]),
            rms_difference(&velocity[b1..b2], &curve[b1..b2]),
            rms_difference(&velocity[b2..], &curve[b2..]),
        ];
        let mut score = rms.iter().map(|r| r * r).sum::<f64>().sqrt();

        let slope = self.integrator.differentiate(&curve, self.dt)?;
        let corrected: Vec<f64> = acceleration.iter().zip(&slope).map(|(a, s)| a - s).collect();
        if let (Some(&first), Some(p)) = (corrected.first(), peak(&corrected)) {
            let top = p.value.abs();
            if top > 0.0 && (top - first.abs()).abs() <= PEAK_AT_ORIGIN_TOLERANCE * top {
                score = f64::MAX;
            }
        }

        let records = filter_and_integrate(&corrected, self.stage, onset, self.dt, self.integrator);
        let qc = self.qc.full(&records.velocity, &records.displacement);

        Ok(Corrected {
            candidate: Candidate {
                iteration,
                break1: b1,
                break2: b2,
                order1: baseline.first.order(),
                order3: baseline.third.order(),
                rms,
                score,
                qc,
            },
            records,
        })
    }
}

fn fit_segment(values: &[f64], dt: f64, orders: OrderRange) -> Option<Polynomial> {
    best_fit_trend(values, dt, orders.orders()).map(|fit| fit.polynomial)
}

/// Lowest score first, ties by iteration; prefer the first that passes QC.
fn select(mut candidates: Vec<Candidate>) -> Option<Candidate> {
    candidates.sort_by(|a, b| {
        a.score
            .total_cmp(&b.score)
            .then(a.iteration.cmp(&b.iteration))
    });
    match candidates.iter().position(|c| c.qc.passed()) {
        Some(i) => Some(candidates.swap_remove(i)),
        None => candidates.into_iter().next(),
    }
}
