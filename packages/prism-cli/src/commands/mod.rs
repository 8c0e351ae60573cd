pub mod batch;
pub mod config;
pub mod process;

use std::path::Path;

use prism_rs::{read_trace_file, ChannelRecord, ProcessingConfig, RecordSource, Waveform};

/// Load the configuration from `path`, or the defaults when none is given.
pub fn load_config(path: Option<&str>) -> Result<ProcessingConfig, String> {
    match path {
        Some(p) => ProcessingConfig::from_json_file(p)
            .map_err(|e| format!("Invalid config '{}': {}", p, e)),
        None => Ok(ProcessingConfig::default()),
    }
}

/// Read a trace file into a channel record.
///
/// `dt` takes precedence over the file's `# dt:` header; one of the two must
/// be present.
pub fn load_record(
    file_path: &str,
    dt: Option<f64>,
    station: Option<String>,
    channel: Option<String>,
) -> Result<ChannelRecord, String> {
    let path = Path::new(file_path);
    if !path.is_file() {
        return Err(format!("File not found: {}", file_path));
    }

    let trace =
        read_trace_file(path).map_err(|e| format!("Failed to read '{}': {}", file_path, e))?;

    let dt = dt.or(trace.dt).ok_or_else(|| {
        format!(
            "No sample interval for '{}': pass --dt or add a `# dt:` header",
            file_path
        )
    })?;

    let waveform = Waveform::new(trace.samples, dt);
    waveform
        .validate()
        .map_err(|e| format!("Invalid trace '{}': {}", file_path, e))?;

    let source = RecordSource {
        station: station.or(trace.station),
        channel: channel.or(trace.channel),
        source_file: Some(file_path.to_string()),
    };
    Ok(ChannelRecord::new(waveform).with_source(source))
}
