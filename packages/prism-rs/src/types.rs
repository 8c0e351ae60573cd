use serde::{Deserialize, Serialize};
use std::fmt;

use crate::abc::AbcReport;
use crate::error::{PrismError, Result};
use crate::params::ComputedParameters;
use crate::qc::QcReport;

/// Uniformly sampled trace
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Waveform {
    pub samples: Vec<f64>,
    /// Sample interval in seconds
    pub dt: f64,
}

impl Waveform {
    pub fn new(samples: Vec<f64>, dt: f64) -> Self {
        Self { samples, dt }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sample_rate(&self) -> f64 {
        1.0 / self.dt
    }

    /// Reject empty traces, non-positive intervals and non-finite samples.
    pub fn validate(&self) -> Result<()> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(PrismError::InvalidSampleInterval(self.dt));
        }
        if self.samples.is_empty() {
            return Err(PrismError::EmptyWaveform);
        }
        if let Some(idx) = self.samples.iter().position(|v| !v.is_finite()) {
            return Err(PrismError::NonFiniteSample(idx));
        }
        Ok(())
    }
}

/// Where a channel came from. Copied into the result, never referenced back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordSource {
    pub station: Option<String>,
    pub channel: Option<String>,
    pub source_file: Option<String>,
}

/// One input channel: uncorrected acceleration plus its lineage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelRecord {
    pub source: RecordSource,
    pub waveform: Waveform,
}

impl ChannelRecord {
    pub fn new(waveform: Waveform) -> Self {
        Self {
            source: RecordSource::default(),
            waveform,
        }
    }

    pub fn with_source(mut self, source: RecordSource) -> Self {
        self.source = source;
        self
    }
}

/// Terminal outcome of a processing run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProcessingStatus {
    Good,
    FailQc,
    FailInit,
    NoEvent,
    NoAbc,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Good => "GOOD",
            Self::FailQc => "FAILQC",
            Self::FailInit => "FAILINIT",
            Self::NoEvent => "NOEVENT",
            Self::NoAbc => "NOABC",
        }
    }

    pub fn is_good(&self) -> bool {
        matches!(self, Self::Good)
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Init,
    Resample,
    EventOnset,
    SnrCheck,
    FilterSelection,
    TrendRemoval,
    Qc1,
    FilterAndIntegrate,
    AdaptiveBaseline,
    Qc2,
    Decimate,
    ComputedParameters,
    Done,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrailEntry {
    pub stage: Stage,
    pub message: String,
}

/// Diagnostic messages gathered while a run progresses
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiagnosticTrail {
    entries: Vec<TrailEntry>,
}

impl DiagnosticTrail {
    pub fn record(&mut self, stage: Stage, message: impl Into<String>) {
        let message = message.into();
        log::debug!("[{:?}] {}", stage, message);
        self.entries.push(TrailEntry { stage, message });
    }

    pub fn entries(&self) -> &[TrailEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Emit the whole trail through the logger at the end of a run.
    pub fn flush(&self, label: &str) {
        for entry in &self.entries {
            log::info!("[{}] {:?}: {}", label, entry.stage, entry.message);
        }
    }
}

/// Corrected V2 series, all of the same length
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectedRecords {
    pub acceleration: Vec<f64>,
    pub velocity: Vec<f64>,
    pub displacement: Vec<f64>,
    pub dt: f64,
}

/// Corner frequencies and shape of the filter actually applied
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterReport {
    pub low_cut: f64,
    pub high_cut: f64,
    pub roll_off: usize,
    pub causal: bool,
}

/// Result of one channel run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct V2Result {
    pub id: String,
    pub source: RecordSource,
    pub status: ProcessingStatus,
    pub records: Option<CorrectedRecords>,
    pub parameters: Option<ComputedParameters>,
    pub qc: Option<QcReport>,
    pub filter: Option<FilterReport>,
    pub abc: Option<AbcReport>,
    pub resample_factor: usize,
    pub trail: DiagnosticTrail,
    pub created_at: String,
}

impl V2Result {
    pub fn new(id: String, source: RecordSource, status: ProcessingStatus, trail: DiagnosticTrail) -> Self {
        Self {
            id,
            source,
            status,
            records: None,
            parameters: None,
            qc: None,
            filter: None,
            abc: None,
            resample_factor: 1,
            trail,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
