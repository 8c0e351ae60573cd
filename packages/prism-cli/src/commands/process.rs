use crate::cli::ProcessArgs;
use crate::commands::{load_config, load_record};
use crate::exit_codes;
use crate::output;
use prism_rs::{OnsetMethod, ProcessingConfig, V2Processor};
use std::path::Path;
use std::time::Instant;

pub fn execute(args: ProcessArgs) -> i32 {
    let config = match build_config(&args) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    let record = match load_record(
        &args.file,
        args.dt,
        args.station.clone(),
        args.channel.clone(),
    ) {
        Ok(r) => r,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    let processor = match V2Processor::new(config) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::INPUT_ERROR;
        }
    };

    if !args.quiet {
        eprintln!(
            "Processing {} ({} samples, dt={})...",
            args.file,
            record.waveform.len(),
            record.waveform.dt
        );
    }

    let start_time = Instant::now();
    let result = match processor.process(record) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: processing failed: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    };

    if !args.quiet {
        eprintln!(
            "Status {} in {:.2}s",
            result.status,
            start_time.elapsed().as_secs_f64()
        );
    }

    let json = match output::to_json(&result, args.compact) {
        Ok(j) => j,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    };

    if let Err(e) = output::write_output(&json, args.output.as_deref().map(Path::new)) {
        eprintln!("Error: {}", e);
        return exit_codes::EXECUTION_ERROR;
    }

    if result.status.is_good() {
        exit_codes::SUCCESS
    } else {
        exit_codes::QUALITY_FAILURE
    }
}

/// Configuration file (or defaults) with the command-line overrides applied.
fn build_config(args: &ProcessArgs) -> Result<ProcessingConfig, String> {
    let mut config = load_config(args.config.as_deref())?;

    if let Some(ref name) = args.onset {
        config.onset.method = OnsetMethod::from_str(name)
            .ok_or_else(|| format!("Unknown onset method '{}' (expected aic or pwd)", name))?;
    }
    if let Some(low) = args.low_cut {
        config.filter.low_cut = low;
    }
    if let Some(high) = args.high_cut {
        config.filter.high_cut = high;
    }

    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}
