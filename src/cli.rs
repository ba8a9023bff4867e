use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "bluedetect")]
#[command(about = "Batch detector for Umbraco CMS installations, fed from a CSV of domains")]
#[command(version)]
pub struct Cli {
    /// Create default configuration file at ./config/bluedetect.toml
    #[arg(long)]
    pub init: bool,

    /// CSV file containing the domains to check
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Output filename (extension will be set based on format if not provided)
    #[arg(short, long, default_value = "umbraco_domains_with_evidence")]
    pub output: String,

    /// Output format: 'csv' (default) or 'json'
    #[arg(short = 'f', long, default_value = "csv")]
    pub output_format: String,

    /// Pause between domains in milliseconds (overrides config)
    #[arg(long, value_name = "MS")]
    pub delay_ms: Option<u64>,

    /// Per-request timeout in seconds (overrides config)
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// Verbose logging (use -v for INFO, -vv for DEBUG)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn validate(&self) -> Result<(), String> {
        if !self.init && self.input.is_none() {
            return Err("An input CSV is required (use --input <FILE>, or --init to create a config file)".to_string());
        }
        match self.output_format.as_str() {
            "csv" | "json" => Ok(()),
            other => Err(format!("Unsupported output format '{}' (expected 'csv' or 'json')", other)),
        }
    }

    /// Resolve the output path, appending the format extension when the
    /// user did not provide one.
    pub fn output_path(&self) -> PathBuf {
        if self.output.contains('.') {
            PathBuf::from(&self.output)
        } else {
            PathBuf::from(format!("{}.{}", self.output, self.output_format))
        }
    }
}
