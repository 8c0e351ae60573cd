//! Event-onset detection
//!
//! Two pickers share one trait: an Akaike-information-criterion split
//! (`AicPicker`) and a damping-energy threshold on a short-period
//! oscillator (`PwdPicker`). The pipeline only sees the trait.

mod aic;
mod pwd;

pub use aic::AicPicker;
pub use pwd::{PwdCoefficients, PwdPicker};

use crate::config::{OnsetConfig, OnsetMethod};

/// Picks the sample index where the event begins
pub trait EventOnsetDetector: Send + Sync {
    fn name(&self) -> &'static str;

    /// Onset index into `samples`, or `None` when no pick is possible.
    fn pick(&self, samples: &[f64], dt: f64) -> Option<usize>;

    /// Seconds of pre-event signal kept ahead of the pick
    fn buffer_seconds(&self) -> f64;

    fn buffered_index(&self, onset: usize, dt: f64) -> usize {
        buffered_index(onset, self.buffer_seconds(), dt)
    }
}

/// Build the detector selected in the configuration
pub fn detector_for(config: &OnsetConfig) -> Box<dyn EventOnsetDetector> {
    match config.method {
        OnsetMethod::Aic => Box::new(AicPicker::new(config.aic_to_peak, config.buffer_seconds)),
        OnsetMethod::Pwd => Box::new(PwdPicker::new(
            config.pwd_histogram_bins,
            config.buffer_seconds,
        )),
    }
}

/// Move a pick earlier by `buffer_seconds`, clamped at the first sample
pub fn buffered_index(onset: usize, buffer_seconds: f64, dt: f64) -> usize {
    let buffer = (buffer_seconds / dt).round().max(0.0) as usize;
    onset.saturating_sub(buffer)
}
