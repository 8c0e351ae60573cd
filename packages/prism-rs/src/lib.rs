//! Strong-motion V1 → V2 correction
//!
//! Turns an uncorrected acceleration channel into corrected acceleration,
//! velocity and displacement with a processing status, diagnostics and
//! derived scalar parameters.

pub mod abc;
pub mod array_ops;
pub mod config;
pub mod error;
pub mod filters;
pub mod fourier;
pub mod integrator;
pub mod onset;
pub mod params;
pub mod parser;
pub mod pipeline;
pub mod profiling;
pub mod qc;
pub mod trend;
pub mod types;

pub use abc::{AbcReport, AdaptiveBaselineCorrector, Candidate};
pub use config::{OnsetMethod, ProcessingConfig};
pub use error::{PrismError, Result};
pub use filters::ButterworthFilter;
pub use integrator::{IntegrationMethod, Integrator};
pub use onset::{AicPicker, EventOnsetDetector, PwdPicker};
pub use params::ComputedParameters;
pub use parser::{parse_trace, read_trace_file, ParsedTrace};
pub use pipeline::{filter_and_integrate, V2Processor};
pub use qc::{QcChecker, QcReport};
pub use types::*;
