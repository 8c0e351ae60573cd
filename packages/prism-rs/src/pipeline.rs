//! V1 → V2 Processing Pipeline
//!
//! Orchestrates the correction of one uncorrected acceleration channel:
//! 1. Optional upsampling to the configured sample-rate floor
//! 2. Event onset, signal-to-noise and filter corner checks
//! 3. Trend removal and a velocity QC pass
//! 4. Filtering and integration, or the adaptive baseline search when QC fails
//! 5. Optional decimation back to the input rate and computed parameters
//!
//! Each stage returns the next one, so every early exit ends up in one place.

use rayon::prelude::*;
use uuid::Uuid;

use crate::abc::{AbcOutcome, AbcReport, AdaptiveBaselineCorrector};
use crate::array_ops::{mean, peak, rms};
use crate::config::{FilterSettings, ProcessingConfig};
use crate::error::Result;
use crate::filters::{ButterworthFilter, TaperLengths};
use crate::fourier;
use crate::integrator::Integrator;
use crate::onset::{detector_for, EventOnsetDetector};
use crate::params::ComputedParameters;
use crate::profile_scope;
use crate::qc::{QcChecker, QcReport};
use crate::trend::{remove_trends, TrendOutcome};
use crate::types::{
    ChannelRecord, CorrectedRecords, DiagnosticTrail, FilterReport, ProcessingStatus, Stage,
    V2Result,
};

/// Highest usable high-cut as a fraction of the Nyquist frequency
const MAX_HIGH_CUT_FRACTION: f64 = 0.8;

/// A designed filter together with the taper settings it is applied with
#[derive(Debug, Clone)]
pub struct FilterStage {
    pub filter: ButterworthFilter,
    pub settings: FilterSettings,
}

impl FilterStage {
    pub fn report(&self) -> FilterReport {
        FilterReport {
            low_cut: self.filter.low_cut(),
            high_cut: self.filter.high_cut(),
            roll_off: self.filter.roll_off(),
            causal: self.filter.is_causal(),
        }
    }
}

/// Filtered acceleration and the velocity and displacement integrated from it
#[derive(Debug, Clone)]
pub struct FilteredRecords {
    pub acceleration: Vec<f64>,
    pub velocity: Vec<f64>,
    pub displacement: Vec<f64>,
    pub taper: TaperLengths,
}

/// Filter a copy of `acceleration` and integrate the padded result twice from zero.
pub fn filter_and_integrate(
    acceleration: &[f64],
    stage: &FilterStage,
    onset: usize,
    dt: f64,
    integrator: &Integrator,
) -> FilteredRecords {
    let mut filtered = acceleration.to_vec();
    let output = stage.filter.apply(
        &mut filtered,
        onset,
        stage.settings.end_taper_seconds,
        stage.settings.min_taper_seconds,
    );
    // Integrate through the padding so the records start from the filter's
    // own pre-record response
    let n = filtered.len();
    let record = output.pad_length..output.pad_length + n;
    let velocity = integrator.integrate(&output.padded, dt, 0.0);
    let displacement = integrator.integrate(&velocity, dt, 0.0);
    FilteredRecords {
        acceleration: filtered,
        velocity: velocity[record.clone()].to_vec(),
        displacement: displacement[record].to_vec(),
        taper: output.taper,
    }
}

/// Signal-to-noise ratio in dB of the post-onset against the pre-onset RMS.
///
/// Returns `None` when there is no pre-onset noise to compare against.
pub fn signal_to_noise(acceleration: &[f64], onset: usize) -> Option<f64> {
    let onset = onset.min(acceleration.len());
    let offset = mean(&acceleration[..onset]);
    let demeaned: Vec<f64> = acceleration.iter().map(|a| a - offset).collect();
    let noise = rms(&demeaned[..onset]);
    let signal = rms(&demeaned[onset..]);
    if noise <= 0.0 {
        return None;
    }
    if signal <= 0.0 {
        return Some(f64::NEG_INFINITY);
    }
    Some(20.0 * (signal / noise).log10())
}

enum Step {
    Next(Stage),
    Exit(ProcessingStatus),
}

/// Mutable state of a single channel run
struct Run {
    trail: DiagnosticTrail,
    acceleration: Vec<f64>,
    dt: f64,
    /// Samples and interval as recorded, kept when the run is upsampled
    recorded: Option<(Vec<f64>, f64)>,
    factor: usize,
    onset: usize,
    buffered_onset: usize,
    filter: Option<FilterStage>,
    qc: Option<QcChecker>,
    trend: Option<TrendOutcome>,
    records: Option<FilteredRecords>,
    qc_report: Option<QcReport>,
    abc: Option<AbcReport>,
    status: ProcessingStatus,
    output_dt: f64,
    parameters: Option<ComputedParameters>,
}

impl Run {
    fn new(acceleration: Vec<f64>, dt: f64) -> Self {
        Self {
            trail: DiagnosticTrail::default(),
            acceleration,
            dt,
            recorded: None,
            factor: 1,
            onset: 0,
            buffered_onset: 0,
            filter: None,
            qc: None,
            trend: None,
            records: None,
            qc_report: None,
            abc: None,
            status: ProcessingStatus::Good,
            output_dt: dt,
            parameters: None,
        }
    }
}

/// V2 processor for uncorrected acceleration channels.
///
/// Holds a validated configuration and can be shared across threads.
pub struct V2Processor {
    config: ProcessingConfig,
    detector: Box<dyn EventOnsetDetector>,
    integrator: Integrator,
}

impl V2Processor {
    pub fn new(config: ProcessingConfig) -> Result<Self> {
        config.validate()?;
        let detector = detector_for(&config.onset);
        let integrator = Integrator::new(config.integration, config.difference_order);
        Ok(Self {
            config,
            detector,
            integrator,
        })
    }

    pub fn config(&self) -> &ProcessingConfig {
        &self.config
    }

    /// Correct one channel. Quality failures are statuses; only invalid
    /// input is an error.
    pub fn process(&self, record: ChannelRecord) -> Result<V2Result> {
        record.waveform.validate()?;
        profile_scope!("v2_process");

        let id = Uuid::new_v4().to_string();
        let label = record
            .source
            .channel
            .clone()
            .or_else(|| record.source.station.clone())
            .unwrap_or_else(|| id.clone());

        let mut run = Run::new(record.waveform.samples, record.waveform.dt);
        let mut stage = Stage::Init;
        let status = loop {
            match self.step(stage, &mut run)? {
                Step::Next(next) => stage = next,
                Step::Exit(status) => break status,
            }
        };

        log::info!("[{}] finished with status {}", label, status);
        run.trail.flush(&label);

        let mut result = V2Result::new(id, record.source, status, run.trail);
        result.resample_factor = run.factor;
        result.filter = run.filter.as_ref().map(FilterStage::report);
        result.qc = run.qc_report;
        result.abc = run.abc;
        result.parameters = run.parameters;
        result.records = run.records.map(|r| CorrectedRecords {
            acceleration: r.acceleration,
            velocity: r.velocity,
            displacement: r.displacement,
            dt: run.output_dt,
        });
        Ok(result)
    }

    /// Correct independent channels in parallel.
    pub fn process_channels(&self, records: &[ChannelRecord]) -> Vec<Result<V2Result>> {
        records
            .par_iter()
            .map(|record| self.process(record.clone()))
            .collect()
    }

    fn step(&self, stage: Stage, run: &mut Run) -> Result<Step> {
        match stage {
            Stage::Init => {
                run.trail.record(
                    stage,
                    format!(
                        "{} samples at {:.3} sps",
                        run.acceleration.len(),
                        1.0 / run.dt
                    ),
                );
                Ok(Step::Next(Stage::Resample))
            }
            Stage::Resample => Ok(self.resample(run)),
            Stage::EventOnset => Ok(self.event_onset(run)),
            Stage::SnrCheck => Ok(self.snr_check(run)),
            Stage::FilterSelection => Ok(self.filter_selection(run)),
            Stage::TrendRemoval => {
                profile_scope!("trend_removal");
                let outcome = remove_trends(&mut run.acceleration, run.buffered_onset, run.dt, &self.integrator);
                run.trail.record(
                    stage,
                    format!(
                        "pre-event mean {:.6e}, velocity trend of order {}",
                        outcome.report.pre_event_mean, outcome.report.order
                    ),
                );
                run.trend = Some(outcome);
                Ok(Step::Next(Stage::Qc1))
            }
            Stage::Qc1 => Ok(self.qc1(run)),
            Stage::FilterAndIntegrate => {
                profile_scope!("filter_and_integrate");
                let Some(filter) = run.filter.as_ref() else {
                    return Ok(Step::Exit(ProcessingStatus::FailInit));
                };
                let records = filter_and_integrate(
                    &run.acceleration,
                    filter,
                    run.buffered_onset,
                    run.dt,
                    &self.integrator,
                );
                run.trail.record(
                    stage,
                    format!("tapers start={} end={}", records.taper.start, records.taper.end),
                );
                run.records = Some(records);
                Ok(Step::Next(Stage::Qc2))
            }
            Stage::Qc2 => Ok(self.qc2(run)),
            Stage::AdaptiveBaseline => self.adaptive_baseline(run),
            Stage::Decimate => Ok(self.decimate(run)),
            Stage::ComputedParameters => {
                if let Some(records) = run.records.as_ref() {
                    let scale = if run.output_dt > run.dt { run.factor } else { 1 };
                    let corrected = CorrectedRecords {
                        acceleration: records.acceleration.clone(),
                        velocity: records.velocity.clone(),
                        displacement: records.displacement.clone(),
                        dt: run.output_dt,
                    };
                    let taper = TaperLengths {
                        start: records.taper.start / scale,
                        end: records.taper.end / scale,
                    };
                    run.parameters = Some(ComputedParameters::compute(
                        &corrected,
                        run.onset / scale,
                        run.buffered_onset / scale,
                        taper,
                    ));
                }
                Ok(Step::Next(Stage::Done))
            }
            Stage::Done => {
                run.trail.record(stage, format!("status {}", run.status));
                Ok(Step::Exit(run.status))
            }
        }
    }

    fn resample(&self, run: &mut Run) -> Step {
        let floor = self.config.resample.min_samples_per_second;
        let factor = fourier::resample_factor(floor, run.dt);
        if factor > 1 {
            profile_scope!("upsample");
            let upsampled = fourier::upsample(&run.acceleration, factor);
            let recorded = std::mem::replace(&mut run.acceleration, upsampled);
            run.recorded = Some((recorded, run.dt));
            run.dt /= factor as f64;
            run.factor = factor;
            run.trail.record(
                Stage::Resample,
                format!("upsampled by {} to {:.3} sps", factor, 1.0 / run.dt),
            );
        }
        Step::Next(Stage::EventOnset)
    }

    fn event_onset(&self, run: &mut Run) -> Step {
        profile_scope!("event_onset");
        // Upsampling rings ahead of sharp arrivals; pick on the recorded
        // samples, which the interpolation passes through unchanged
        let pick = match run.recorded.as_ref() {
            Some((samples, dt)) => self
                .detector
                .pick(samples, *dt)
                .map(|onset| onset * run.factor),
            None => self.detector.pick(&run.acceleration, run.dt),
        };
        match pick {
            Some(onset) if onset > 0 => {
                run.onset = onset;
                run.buffered_onset = self.detector.buffered_index(onset, run.dt);
                run.trail.record(
                    Stage::EventOnset,
                    format!(
                        "{} onset at {} (buffered {})",
                        self.detector.name(),
                        onset,
                        run.buffered_onset
                    ),
                );
                Step::Next(Stage::SnrCheck)
            }
            _ => {
                run.trail
                    .record(Stage::EventOnset, format!("{} found no event", self.detector.name()));
                Step::Exit(ProcessingStatus::NoEvent)
            }
        }
    }

    fn snr_check(&self, run: &mut Run) -> Step {
        let snr = &self.config.snr;
        match signal_to_noise(&run.acceleration, run.onset) {
            Some(db) if db < snr.min_snr_db => {
                run.trail.record(
                    Stage::SnrCheck,
                    format!("SNR {:.2} dB below {:.2} dB", db, snr.min_snr_db),
                );
                return Step::Exit(ProcessingStatus::FailInit);
            }
            Some(db) => run.trail.record(Stage::SnrCheck, format!("SNR {:.2} dB", db)),
            None => run.trail.record(Stage::SnrCheck, "no pre-event noise"),
        }

        let top = peak(&run.acceleration).map_or(0.0, |p| p.value.abs());
        if top <= snr.min_peak {
            run.trail.record(
                Stage::SnrCheck,
                format!("peak {:.6e} does not exceed {:.6e}", top, snr.min_peak),
            );
            return Step::Exit(ProcessingStatus::FailInit);
        }
        Step::Next(Stage::FilterSelection)
    }

    fn filter_selection(&self, run: &mut Run) -> Step {
        let settings = &self.config.filter;
        let limit = MAX_HIGH_CUT_FRACTION * 0.5 / run.dt;
        let mut high_cut = settings.high_cut;
        if high_cut > limit {
            log::warn!(
                "High cut {} Hz lowered to {} Hz (0.8 of Nyquist)",
                high_cut,
                limit
            );
            run.trail.record(
                Stage::FilterSelection,
                format!("high cut {} Hz lowered to {} Hz", high_cut, limit),
            );
            high_cut = limit;
        }

        match ButterworthFilter::new(
            settings.low_cut,
            high_cut,
            run.dt,
            settings.roll_off,
            settings.causal,
        ) {
            Ok(filter) => {
                run.trail.record(
                    Stage::FilterSelection,
                    format!(
                        "bandpass {}-{} Hz, roll-off {}, {}",
                        filter.low_cut(),
                        filter.high_cut(),
                        filter.roll_off(),
                        if filter.is_causal() { "causal" } else { "acausal" }
                    ),
                );
                run.qc = Some(QcChecker::new(
                    self.config.qc,
                    filter.low_cut(),
                    1.0 / run.dt,
                    run.buffered_onset,
                ));
                run.filter = Some(FilterStage {
                    filter,
                    settings: settings.clone(),
                });
                Step::Next(Stage::TrendRemoval)
            }
            Err(e) => {
                run.trail.record(Stage::FilterSelection, e.to_string());
                Step::Exit(ProcessingStatus::FailInit)
            }
        }
    }

    fn qc1(&self, run: &mut Run) -> Step {
        let (Some(qc), Some(trend)) = (run.qc.as_ref(), run.trend.as_ref()) else {
            return Step::Exit(ProcessingStatus::FailInit);
        };
        let report = qc.velocity_only(&trend.velocity);
        run.trail.record(
            Stage::Qc1,
            format!(
                "initial velocity {:.4e}, residual velocity {:.4e}: {}",
                report.velocity.initial,
                report.velocity.residual,
                if report.passed() { "pass" } else { "fail" }
            ),
        );
        let next = if report.passed() {
            Stage::FilterAndIntegrate
        } else {
            Stage::AdaptiveBaseline
        };
        run.qc_report = Some(report);
        Step::Next(next)
    }

    fn qc2(&self, run: &mut Run) -> Step {
        let (Some(qc), Some(records)) = (run.qc.as_ref(), run.records.as_ref()) else {
            return Step::Exit(ProcessingStatus::FailInit);
        };
        let report = qc.full(&records.velocity, &records.displacement);
        run.status = if report.passed() {
            ProcessingStatus::Good
        } else {
            ProcessingStatus::FailQc
        };
        run.trail.record(
            Stage::Qc2,
            format!(
                "initial velocity {:.4e}, residual velocity {:.4e}, residual displacement {:.4e}: {}",
                report.velocity.initial,
                report.velocity.residual,
                report.displacement.map_or(0.0, |d| d.residual),
                if report.passed() { "pass" } else { "fail" }
            ),
        );
        run.qc_report = Some(report);
        Step::Next(Stage::Decimate)
    }

    fn adaptive_baseline(&self, run: &mut Run) -> Result<Step> {
        profile_scope!("adaptive_baseline");
        let (Some(filter), Some(qc), Some(trend)) =
            (run.filter.as_ref(), run.qc.as_ref(), run.trend.as_ref())
        else {
            return Ok(Step::Exit(ProcessingStatus::FailInit));
        };

        let corrector =
            AdaptiveBaselineCorrector::new(&self.config.abc, filter, qc, &self.integrator, run.dt);
        match corrector.run(
            &trend.demeaned_acceleration,
            &trend.demeaned_velocity,
            run.buffered_onset,
        )? {
            AbcOutcome::NoCandidates => {
                run.trail.record(Stage::AdaptiveBaseline, "no baseline candidates");
                Ok(Step::Exit(ProcessingStatus::NoAbc))
            }
            AbcOutcome::Selected {
                status,
                report,
                records,
            } => {
                run.trail.record(
                    Stage::AdaptiveBaseline,
                    format!(
                        "selected b1={} b2={} order1={} order3={} score={:.4e} from {} candidates",
                        report.selected.break1,
                        report.selected.break2,
                        report.selected.order1,
                        report.selected.order3,
                        report.selected.score,
                        report.candidates_evaluated
                    ),
                );
                run.status = status;
                run.qc_report = Some(report.selected.qc.clone());
                run.abc = Some(report);
                run.records = Some(records);
                Ok(Step::Next(Stage::Decimate))
            }
        }
    }

    fn decimate(&self, run: &mut Run) -> Step {
        if run.factor > 1 && self.config.resample.decimate_output {
            if let Some(records) = run.records.as_mut() {
                records.acceleration = fourier::decimate(&records.acceleration, run.factor);
                records.velocity = fourier::decimate(&records.velocity, run.factor);
                records.displacement = fourier::decimate(&records.displacement, run.factor);
            }
            run.output_dt = run.dt * run.factor as f64;
            run.trail.record(
                Stage::Decimate,
                format!("decimated by {} to {:.3} sps", run.factor, 1.0 / run.output_dt),
            );
        } else {
            run.output_dt = run.dt;
        }
        Step::Next(Stage::ComputedParameters)
    }
}
