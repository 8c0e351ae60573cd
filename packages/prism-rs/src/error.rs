use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrismError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid filter parameters: {0}")]
    InvalidFilter(String),

    #[error("Sample interval must be positive and finite, got {0}")]
    InvalidSampleInterval(f64),

    #[error("Waveform contains no samples")]
    EmptyWaveform,

    #[error("Non-finite sample at index {0}")]
    NonFiniteSample(usize),

    #[error("Failed to parse trace: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PrismError>;
