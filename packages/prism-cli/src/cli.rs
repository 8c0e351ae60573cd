use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "prism",
    version,
    about = "Strong-motion V1 to V2 record correction",
    long_about = "Correct uncorrected accelerometer traces into acceleration, velocity and\n\
                  displacement records. Traces are plain text: whitespace-separated samples,\n\
                  `#` comments, optional `# dt:`, `# station:` and `# channel:` headers."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Command {
    /// Correct a single trace file
    Process(ProcessArgs),
    /// Correct many trace files matched by a glob pattern
    Batch(BatchArgs),
    /// Print the default processing configuration
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct ProcessArgs {
    /// Input trace file
    #[arg(long)]
    pub file: String,

    /// Sample interval in seconds (overrides the `# dt:` header)
    #[arg(long)]
    pub dt: Option<f64>,

    /// JSON processing configuration
    #[arg(long)]
    pub config: Option<String>,

    /// Onset picker (aic, pwd)
    #[arg(long)]
    pub onset: Option<String>,

    /// Bandpass low corner in Hz
    #[arg(long)]
    pub low_cut: Option<f64>,

    /// Bandpass high corner in Hz
    #[arg(long)]
    pub high_cut: Option<f64>,

    /// Station code recorded in the result
    #[arg(long)]
    pub station: Option<String>,

    /// Channel code recorded in the result
    #[arg(long)]
    pub channel: Option<String>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Compact JSON output (no indentation)
    #[arg(long, default_value_t = false)]
    pub compact: bool,

    /// Suppress progress messages on stderr
    #[arg(long, default_value_t = false)]
    pub quiet: bool,
}

#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern for input traces (e.g. "data/*.txt")
    #[arg(long)]
    pub pattern: String,

    /// Sample interval in seconds for files without a `# dt:` header
    #[arg(long)]
    pub dt: Option<f64>,

    /// JSON processing configuration
    #[arg(long)]
    pub config: Option<String>,

    /// Write `<stem>_v2.json` per input here (default: JSONL on stdout)
    #[arg(long)]
    pub output_dir: Option<String>,

    /// Keep going when a file cannot be read or processed
    #[arg(long, default_value_t = false)]
    pub continue_on_error: bool,

    /// Compact JSON output (no indentation)
    #[arg(long, default_value_t = false)]
    pub compact: bool,

    /// Suppress progress messages on stderr
    #[arg(long, default_value_t = false)]
    pub quiet: bool,
}

#[derive(Args)]
pub struct ConfigArgs {
    /// Compact JSON output (no indentation)
    #[arg(long, default_value_t = false)]
    pub compact: bool,
}
