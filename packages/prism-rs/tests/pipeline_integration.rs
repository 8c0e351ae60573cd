mod common;

use common::{config_without_resampling, knee_drift_record, ramp_drift_record};
use prism_rs::filters::TaperLengths;
use prism_rs::{
    ChannelRecord, IntegrationMethod, ProcessingConfig, ProcessingStatus, RecordSource, Stage,
    V2Processor, V2Result, Waveform,
};

const DT: f64 = 0.01;
const ONSET: usize = 300;

fn channel(samples: Vec<f64>, name: &str) -> ChannelRecord {
    ChannelRecord::new(Waveform::new(samples, DT)).with_source(RecordSource {
        station: Some("SYN".to_string()),
        channel: Some(name.to_string()),
        source_file: None,
    })
}

fn has_entry(result: &V2Result, stage: Stage, text: &str) -> bool {
    result
        .trail
        .entries()
        .iter()
        .any(|e| e.stage == stage && e.message.contains(text))
}

fn strict_qc(config: &mut ProcessingConfig, threshold: f64) {
    config.qc.initial_velocity = threshold;
    config.qc.residual_velocity = threshold;
    config.qc.residual_displacement = threshold;
}

#[test]
fn test_drift_free_event_is_good_with_defaults() {
    let processor = V2Processor::new(ProcessingConfig::default()).unwrap();
    let record = ramp_drift_record(2000, DT, ONSET, 0.0, 0.0, 42);

    let result = processor.process(channel(record, "HNE")).unwrap();

    assert_eq!(result.status, ProcessingStatus::Good);
    assert!(result.abc.is_none());
    let qc = result.qc.as_ref().unwrap();
    assert!(qc.passed());
    let residual = qc.displacement.as_ref().unwrap().residual;
    assert!(residual.abs() < 0.05, "residual displacement {}", residual);
}

#[test]
fn test_drifting_record_is_good_with_defaults() {
    let processor = V2Processor::new(ProcessingConfig::default()).unwrap();
    let record = ramp_drift_record(2000, DT, ONSET, 0.3, 0.02, 42);

    let result = processor.process(channel(record, "HNZ")).unwrap();

    assert_eq!(result.status, ProcessingStatus::Good);
    assert_eq!(result.resample_factor, 2);
    let records = result.records.as_ref().unwrap();
    assert_eq!(records.displacement.len(), 4000);
    let params = result.parameters.as_ref().unwrap();
    assert!(
        params.onset_index.abs_diff(2 * ONSET) <= 10,
        "onset {}",
        params.onset_index
    );
}

#[test]
fn test_ramp_drift_record_is_good_without_abc() {
    let processor = V2Processor::new(config_without_resampling()).unwrap();
    let record = ramp_drift_record(2000, DT, ONSET, 0.3, 0.02, 42);

    let result = processor.process(channel(record, "HNE")).unwrap();

    assert_eq!(result.status, ProcessingStatus::Good);
    assert!(result.abc.is_none());
    assert_eq!(result.resample_factor, 1);
    assert_eq!(result.source.channel.as_deref(), Some("HNE"));

    let records = result.records.as_ref().unwrap();
    assert_eq!(records.acceleration.len(), 2000);
    assert_eq!(records.velocity.len(), 2000);
    assert_eq!(records.displacement.len(), 2000);

    let params = result.parameters.as_ref().unwrap();
    assert!(params.onset_index.abs_diff(ONSET) <= 5, "onset {}", params.onset_index);
    assert!(params.buffered_onset_index < params.onset_index);
    assert!(result.qc.as_ref().unwrap().passed());
    assert!(result.qc.as_ref().unwrap().displacement.is_some());
    assert!(result.filter.is_some());
}

#[test]
fn test_knee_drift_needs_adaptive_baseline() {
    let processor = V2Processor::new(config_without_resampling()).unwrap();
    let knee_start = 250;
    let knee_end = 1850;
    let record = knee_drift_record(4000, DT, ONSET, knee_start, knee_end, 1.0, 7);

    let result = processor.process(channel(record, "HNN")).unwrap();

    let qc1_failed = result
        .trail
        .entries()
        .iter()
        .any(|e| e.stage == Stage::Qc1 && e.message.ends_with("fail"));
    assert!(qc1_failed, "trend removal alone should not pass QC");

    assert_eq!(result.status, ProcessingStatus::Good);
    let abc = result.abc.as_ref().unwrap();
    assert!(abc.passed);
    assert!(abc.candidates_evaluated > 0);

    let step = processor.config().abc.window_samples;
    let selected = &abc.selected;
    assert!(selected.break1 <= knee_start + step, "b1 {}", selected.break1);
    assert!(knee_end <= selected.break2 + step, "b2 {}", selected.break2);
    assert!(selected.break2 <= 3200);
}

#[test]
fn test_upsampled_record_is_decimated_back() {
    let mut config = ProcessingConfig::default();
    config.resample.decimate_output = true;
    let processor = V2Processor::new(config).unwrap();
    let record = ramp_drift_record(2000, DT, ONSET, 0.3, 0.02, 3);

    let result = processor.process(channel(record, "HNZ")).unwrap();

    assert_eq!(result.resample_factor, 2);
    let records = result.records.as_ref().unwrap();
    assert_eq!(records.acceleration.len(), 2000);
    assert!((records.dt - DT).abs() < 1e-12);
    let params = result.parameters.as_ref().unwrap();
    assert!(params.onset_index.abs_diff(ONSET) <= 5, "onset {}", params.onset_index);
}

#[test]
fn test_upsampled_record_kept_at_higher_rate() {
    let processor = V2Processor::new(ProcessingConfig::default()).unwrap();
    let record = ramp_drift_record(2000, DT, ONSET, 0.3, 0.02, 5);

    let result = processor.process(channel(record, "HNZ")).unwrap();

    assert_eq!(result.resample_factor, 2);
    let records = result.records.as_ref().unwrap();
    assert_eq!(records.acceleration.len(), 4000);
    assert!((records.dt - DT / 2.0).abs() < 1e-12);
}

#[test]
fn test_channels_are_processed_independently() {
    let processor = V2Processor::new(config_without_resampling()).unwrap();
    let channels = vec![
        channel(ramp_drift_record(2000, DT, ONSET, 0.3, 0.02, 1), "HNE"),
        channel(vec![0.0; 2000], "HNN"),
        channel(ramp_drift_record(2000, DT, ONSET, -0.1, 0.01, 2), "HNZ"),
    ];

    let results = processor.process_channels(&channels);

    assert_eq!(results.len(), 3);
    let statuses: Vec<ProcessingStatus> =
        results.iter().map(|r| r.as_ref().unwrap().status).collect();
    assert_eq!(statuses[1], ProcessingStatus::NoEvent);
    assert_eq!(statuses[0], ProcessingStatus::Good);
    assert_eq!(statuses[2], ProcessingStatus::Good);
    let ids: std::collections::HashSet<_> =
        results.iter().map(|r| r.as_ref().unwrap().id.clone()).collect();
    assert_eq!(ids.len(), 3);
}

#[test]
fn test_result_serializes_status_names() {
    let processor = V2Processor::new(config_without_resampling()).unwrap();
    let result = processor.process(channel(vec![0.0; 500], "HNE")).unwrap();
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["status"], "NOEVENT");
    assert!(json["created_at"].as_str().is_some());
}

#[test]
fn test_short_record_without_break_points_is_noabc() {
    let mut config = config_without_resampling();
    strict_qc(&mut config, 0.0);
    let processor = V2Processor::new(config).unwrap();
    let record = knee_drift_record(1000, DT, ONSET, 250, 600, 1.0, 7);

    let result = processor.process(channel(record, "HNE")).unwrap();

    assert_eq!(result.status, ProcessingStatus::NoAbc);
    assert!(result.abc.is_none());
    assert!(result.records.is_none());
    assert!(has_entry(&result, Stage::Qc1, "fail"));
    assert!(has_entry(&result, Stage::AdaptiveBaseline, "no baseline candidates"));
}

#[test]
fn test_exhausted_baseline_search_is_failqc() {
    let mut config = config_without_resampling();
    strict_qc(&mut config, 1e-9);
    let processor = V2Processor::new(config).unwrap();
    let record = knee_drift_record(4000, DT, ONSET, 250, 1850, 1.0, 7);

    let result = processor.process(channel(record, "HNN")).unwrap();

    assert_eq!(result.status, ProcessingStatus::FailQc);
    let abc = result.abc.as_ref().unwrap();
    assert!(!abc.passed);
    assert!(abc.candidates_evaluated > 1);
    assert!(!result.qc.as_ref().unwrap().passed());
    assert!(result.records.is_some());
    assert!(has_entry(&result, Stage::AdaptiveBaseline, "selected"));
}

#[test]
fn test_unbuildable_filter_is_failinit() {
    let mut config = config_without_resampling();
    config.filter.low_cut = 45.0;
    config.filter.high_cut = 48.0;
    let processor = V2Processor::new(config).unwrap();
    let record = ramp_drift_record(2000, DT, ONSET, 0.3, 0.02, 42);

    let result = processor.process(channel(record, "HNE")).unwrap();

    assert_eq!(result.status, ProcessingStatus::FailInit);
    assert!(result.filter.is_none());
    assert!(result.records.is_none());
    assert!(has_entry(&result, Stage::FilterSelection, "lowered to 40"));
    let last = result.trail.entries().last().unwrap();
    assert_eq!(last.stage, Stage::FilterSelection);
}

#[test]
fn test_weak_peak_is_failinit() {
    let mut config = config_without_resampling();
    config.snr.min_peak = 1e6;
    let processor = V2Processor::new(config).unwrap();
    let record = ramp_drift_record(2000, DT, ONSET, 0.3, 0.02, 42);

    let result = processor.process(channel(record, "HNE")).unwrap();

    assert_eq!(result.status, ProcessingStatus::FailInit);
    assert!(result.filter.is_none());
    assert!(has_entry(&result, Stage::SnrCheck, "does not exceed"));
}

#[test]
fn test_high_cut_at_limit_is_kept() {
    let processor = V2Processor::new(config_without_resampling()).unwrap();
    let record = ramp_drift_record(2000, DT, ONSET, 0.3, 0.02, 42);

    let result = processor.process(channel(record, "HNE")).unwrap();

    assert_eq!(result.filter.as_ref().unwrap().high_cut, 40.0);
    assert!(!has_entry(&result, Stage::FilterSelection, "lowered"));
}

#[test]
fn test_causal_filtering_end_to_end() {
    let mut config = config_without_resampling();
    config.filter.causal = true;
    strict_qc(&mut config, 10.0);
    let processor = V2Processor::new(config).unwrap();
    let record = ramp_drift_record(2000, DT, ONSET, 0.3, 0.02, 42);

    let result = processor.process(channel(record, "HNE")).unwrap();

    assert_eq!(result.status, ProcessingStatus::Good);
    assert!(result.filter.as_ref().unwrap().causal);
    assert!(has_entry(&result, Stage::FilterSelection, "causal"));
    assert_eq!(result.parameters.as_ref().unwrap().taper, TaperLengths::default());
    assert_eq!(result.records.as_ref().unwrap().velocity.len(), 2000);
}

#[test]
fn test_frequency_integration_end_to_end() {
    let mut config = config_without_resampling();
    config.integration = IntegrationMethod::Frequency;
    let processor = V2Processor::new(config).unwrap();
    let record = knee_drift_record(4000, DT, ONSET, 250, 1850, 1.0, 7);

    let result = processor.process(channel(record, "HNN")).unwrap();

    assert_eq!(result.status, ProcessingStatus::Good);
    let records = result.records.as_ref().unwrap();
    assert_eq!(records.displacement.len(), 4000);
    assert!(result.qc.as_ref().unwrap().passed());
}
