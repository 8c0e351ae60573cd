use crate::cli::ConfigArgs;
use crate::exit_codes;
use crate::output;
use prism_rs::ProcessingConfig;

pub fn execute(args: ConfigArgs) -> i32 {
    let json = match output::to_json(&ProcessingConfig::default(), args.compact) {
        Ok(j) => j,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    };

    if let Err(e) = output::write_output(&json, None) {
        eprintln!("Error: {}", e);
        return exit_codes::EXECUTION_ERROR;
    }
    exit_codes::SUCCESS
}
