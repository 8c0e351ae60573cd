//! Processing configuration
//!
//! One `ProcessingConfig` is built (or deserialized) per session and passed
//! by reference into the orchestrator. It is read-only during a run, so a
//! single instance can be shared across concurrently processed channels.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{PrismError, Result};
use crate::filters::MAX_ROLL_OFF;
use crate::integrator::IntegrationMethod;

/// Smallest PWD histogram accepted, configured or derived from `dt`
pub const MIN_PWD_BINS: usize = 10;
/// Upper bound on the resampling target rate
pub const MAX_SAMPLES_PER_SECOND: f64 = 10_000.0;

/// Event-onset picking algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnsetMethod {
    Aic,
    Pwd,
}

impl Default for OnsetMethod {
    fn default() -> Self {
        Self::Aic
    }
}

impl OnsetMethod {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "aic" => Some(Self::Aic),
            "pwd" => Some(Self::Pwd),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnsetConfig {
    #[serde(default)]
    pub method: OnsetMethod,

    /// Seconds subtracted from the pick to get the buffered onset
    #[serde(default = "default_buffer_seconds")]
    pub buffer_seconds: f64,

    /// Restrict the AIC search to samples before the absolute peak
    #[serde(default = "default_true")]
    pub aic_to_peak: bool,

    /// Histogram bins for the PWD threshold (None = round(2/dt))
    #[serde(default)]
    pub pwd_histogram_bins: Option<usize>,
}

impl Default for OnsetConfig {
    fn default() -> Self {
        Self {
            method: OnsetMethod::Aic,
            buffer_seconds: default_buffer_seconds(),
            aic_to_peak: true,
            pwd_histogram_bins: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterSettings {
    /// Low corner frequency (Hz)
    #[serde(default = "default_low_cut")]
    pub low_cut: f64,

    /// High corner frequency (Hz)
    #[serde(default = "default_high_cut")]
    pub high_cut: f64,

    /// Roll-off; the filter order is twice this value
    #[serde(default = "default_roll_off")]
    pub roll_off: usize,

    #[serde(default)]
    pub causal: bool,

    /// Length of the end taper (s)
    #[serde(default = "default_end_taper")]
    pub end_taper_seconds: f64,

    /// Shortest acceptable start taper (s)
    #[serde(default = "default_min_taper")]
    pub min_taper_seconds: f64,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            low_cut: default_low_cut(),
            high_cut: default_high_cut(),
            roll_off: default_roll_off(),
            causal: false,
            end_taper_seconds: default_end_taper(),
            min_taper_seconds: default_min_taper(),
        }
    }
}

/// QC tolerances (cm/s, cm/s, cm)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QcThresholds {
    #[serde(default = "default_qc_tolerance")]
    pub initial_velocity: f64,
    #[serde(default = "default_qc_tolerance")]
    pub residual_velocity: f64,
    #[serde(default = "default_qc_tolerance")]
    pub residual_displacement: f64,
}

impl Default for QcThresholds {
    fn default() -> Self {
        Self {
            initial_velocity: default_qc_tolerance(),
            residual_velocity: default_qc_tolerance(),
            residual_displacement: default_qc_tolerance(),
        }
    }
}

/// Inclusive polynomial order range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRange {
    pub min: usize,
    pub max: usize,
}

impl OrderRange {
    pub fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    pub fn orders(&self) -> std::ops::RangeInclusive<usize> {
        self.min..=self.max
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbcConfig {
    #[serde(default = "default_first_orders")]
    pub first_order_range: OrderRange,

    #[serde(default = "default_third_orders")]
    pub third_order_range: OrderRange,

    /// Step between successive second breakpoints (samples)
    #[serde(default = "default_abc_window")]
    pub window_samples: usize,
}

impl Default for AbcConfig {
    fn default() -> Self {
        Self {
            first_order_range: default_first_orders(),
            third_order_range: default_third_orders(),
            window_samples: default_abc_window(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResampleConfig {
    /// Records sampled below this rate are upsampled before processing
    #[serde(default = "default_min_sps")]
    pub min_samples_per_second: f64,

    /// Bring upsampled records back to their original rate at the end
    #[serde(default)]
    pub decimate_output: bool,
}

impl Default for ResampleConfig {
    fn default() -> Self {
        Self {
            min_samples_per_second: default_min_sps(),
            decimate_output: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnrConfig {
    /// Minimum post/pre onset RMS ratio in dB
    #[serde(default = "default_min_snr")]
    pub min_snr_db: f64,

    /// Minimum absolute peak acceleration
    #[serde(default)]
    pub min_peak: f64,
}

impl Default for SnrConfig {
    fn default() -> Self {
        Self {
            min_snr_db: default_min_snr(),
            min_peak: 0.0,
        }
    }
}

/// Complete configuration for a V2 processing session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    #[serde(default)]
    pub onset: OnsetConfig,
    #[serde(default)]
    pub filter: FilterSettings,
    #[serde(default)]
    pub qc: QcThresholds,
    #[serde(default)]
    pub abc: AbcConfig,
    #[serde(default)]
    pub resample: ResampleConfig,
    #[serde(default)]
    pub snr: SnrConfig,
    #[serde(default)]
    pub integration: IntegrationMethod,
    /// Central-difference order used by the time-domain differentiator
    #[serde(default = "default_difference_order")]
    pub difference_order: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            onset: OnsetConfig::default(),
            filter: FilterSettings::default(),
            qc: QcThresholds::default(),
            abc: AbcConfig::default(),
            resample: ResampleConfig::default(),
            snr: SnrConfig::default(),
            integration: IntegrationMethod::default(),
            difference_order: default_difference_order(),
        }
    }
}

fn default_buffer_seconds() -> f64 {
    0.5
}
fn default_true() -> bool {
    true
}
fn default_low_cut() -> f64 {
    0.1
}
fn default_high_cut() -> f64 {
    40.0
}
fn default_roll_off() -> usize {
    4
}
fn default_end_taper() -> f64 {
    2.0
}
fn default_min_taper() -> f64 {
    0.5
}
fn default_qc_tolerance() -> f64 {
    0.1
}
fn default_first_orders() -> OrderRange {
    OrderRange::new(1, 2)
}
fn default_third_orders() -> OrderRange {
    OrderRange::new(1, 3)
}
fn default_abc_window() -> usize {
    200
}
fn default_min_sps() -> f64 {
    200.0
}
fn default_min_snr() -> f64 {
    3.0
}
fn default_difference_order() -> usize {
    5
}

impl ProcessingConfig {
    /// Load a JSON configuration file; missing fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check everything that can be checked without a record.
    pub fn validate(&self) -> Result<()> {
        let f = &self.filter;
        if !(f.low_cut.is_finite() && f.low_cut > 0.0) {
            return Err(PrismError::ConfigError(format!(
                "low_cut must be positive, got {}",
                f.low_cut
            )));
        }
        if !(f.high_cut.is_finite() && f.high_cut > f.low_cut) {
            return Err(PrismError::ConfigError(format!(
                "high_cut ({}) must exceed low_cut ({})",
                f.high_cut, f.low_cut
            )));
        }
        if f.roll_off == 0 || f.roll_off > MAX_ROLL_OFF {
            return Err(PrismError::ConfigError(format!(
                "roll_off must be in [1, {}], got {}",
                MAX_ROLL_OFF, f.roll_off
            )));
        }
        if f.end_taper_seconds < 0.0 || f.min_taper_seconds < 0.0 {
            return Err(PrismError::ConfigError(
                "Taper lengths must not be negative".to_string(),
            ));
        }

        for (name, value) in [
            ("initial_velocity", self.qc.initial_velocity),
            ("residual_velocity", self.qc.residual_velocity),
            ("residual_displacement", self.qc.residual_displacement),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(PrismError::ConfigError(format!(
                    "QC threshold {} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }

        for (name, range) in [
            ("first_order_range", self.abc.first_order_range),
            ("third_order_range", self.abc.third_order_range),
        ] {
            if range.min == 0 || range.min > range.max {
                return Err(PrismError::ConfigError(format!(
                    "{} must satisfy 1 <= min <= max, got {}..={}",
                    name, range.min, range.max
                )));
            }
        }
        if self.abc.window_samples == 0 {
            return Err(PrismError::ConfigError(
                "ABC window_samples must be positive".to_string(),
            ));
        }

        if self.onset.buffer_seconds < 0.0 {
            return Err(PrismError::ConfigError(
                "Onset buffer must not be negative".to_string(),
            ));
        }
        if matches!(self.onset.pwd_histogram_bins, Some(b) if b < MIN_PWD_BINS) {
            return Err(PrismError::ConfigError(format!(
                "PWD histogram needs at least {} bins",
                MIN_PWD_BINS
            )));
        }
        if !(self.resample.min_samples_per_second.is_finite()
            && (0.0..=MAX_SAMPLES_PER_SECOND).contains(&self.resample.min_samples_per_second))
        {
            return Err(PrismError::ConfigError(format!(
                "min_samples_per_second must be within 0..={}, got {}",
                MAX_SAMPLES_PER_SECOND, self.resample.min_samples_per_second
            )));
        }
        if ![3, 5, 7, 9].contains(&self.difference_order) {
            return Err(PrismError::ConfigError(format!(
                "difference_order must be 3, 5, 7 or 9, got {}",
                self.difference_order
            )));
        }

        Ok(())
    }
}
