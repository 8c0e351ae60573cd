use crate::cli::BatchArgs;
use crate::commands::{load_config, load_record};
use crate::exit_codes;
use crate::output;
use prism_rs::{V2Processor, V2Result};
use rayon::prelude::*;
use std::path::Path;
use std::time::Instant;

pub fn execute(args: BatchArgs) -> i32 {
    let files = match resolve_glob(&args.pattern) {
        Ok(f) => f,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    if files.is_empty() {
        eprintln!("Error: No matching files found");
        return exit_codes::INPUT_ERROR;
    }

    let processor = match load_config(args.config.as_deref()).and_then(|config| {
        V2Processor::new(config).map_err(|e| e.to_string())
    }) {
        Ok(p) => p,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    if let Some(ref dir) = args.output_dir {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("Error: Failed to create output directory '{}': {}", dir, e);
            return exit_codes::EXECUTION_ERROR;
        }
    }

    let total = files.len();
    if !args.quiet {
        eprintln!("Processing {} file(s)...", total);
    }
    let start_time = Instant::now();

    // Records are independent; results come back in file order
    let outcomes: Vec<Result<V2Result, String>> = files
        .par_iter()
        .map(|file_path| {
            let record = load_record(file_path, args.dt, None, None)?;
            processor
                .process(record)
                .map_err(|e| format!("Processing failed: {}", e))
        })
        .collect();

    let mut succeeded = 0usize;
    let mut failed = 0usize;
    let mut not_good = 0usize;

    for (i, (file_path, outcome)) in files.iter().zip(outcomes).enumerate() {
        if !args.quiet {
            eprintln!("[{}/{}] {}...", i + 1, total, file_path);
        }

        let written = outcome.and_then(|result| {
            write_result(&result, file_path, &args)?;
            Ok(result)
        });

        match written {
            Ok(result) => {
                if !args.quiet {
                    eprintln!("  {}", result.status);
                }
                if !result.status.is_good() {
                    not_good += 1;
                }
                succeeded += 1;
            }
            Err(msg) => {
                eprintln!("  Error: {}", msg);
                failed += 1;
                if !args.continue_on_error {
                    break;
                }
            }
        }
    }

    if !args.quiet {
        eprintln!(
            "Batch complete: {}/{} succeeded, {}/{} failed, {} not GOOD, {:.1}s",
            succeeded,
            total,
            failed,
            total,
            not_good,
            start_time.elapsed().as_secs_f64()
        );
    }

    if failed > 0 {
        exit_codes::EXECUTION_ERROR
    } else if not_good > 0 {
        exit_codes::QUALITY_FAILURE
    } else {
        exit_codes::SUCCESS
    }
}

/// One pretty/compact file per input in `--output-dir`, else JSONL on stdout.
fn write_result(result: &V2Result, file_path: &str, args: &BatchArgs) -> Result<(), String> {
    match args.output_dir {
        Some(ref dir) => {
            let json = output::to_json(result, args.compact)?;
            let stem = Path::new(file_path)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("output");
            let out_path = Path::new(dir).join(format!("{}_v2.json", stem));
            output::write_output(&json, Some(&out_path))
        }
        None => {
            let json = output::to_json(result, true)?;
            output::write_output(&json, None)
        }
    }
}

fn resolve_glob(pattern: &str) -> Result<Vec<String>, String> {
    let paths = glob::glob(pattern)
        .map_err(|e| format!("Invalid glob pattern '{}': {}", pattern, e))?;

    let mut files: Vec<String> = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) => {
                if path.is_file() {
                    if let Some(s) = path.to_str() {
                        files.push(s.to_string());
                    }
                }
            }
            Err(e) => {
                log::warn!("glob error: {}", e);
            }
        }
    }
    files.sort();
    Ok(files)
}
