use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bluedetect::cli::Cli;
use bluedetect::config::{AppConfig, ConfigError};
use bluedetect::detect::Checker;
use bluedetect::export;
use bluedetect::extract::extract_domains;
use bluedetect::job::{run_job, spawn_sweeper, JobStatus, JobStore};

/// Set by the Ctrl-C handler; the progress loop turns it into a stop request
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Handle --init before any other processing
    if cli.init {
        match AppConfig::create_default_config() {
            Ok(path) => {
                println!("Created default configuration file at: {}", path.display());
                println!("Edit this file to customize settings, then run bluedetect again.");
                return Ok(());
            }
            Err(e) => {
                eprintln!("Failed to create configuration file: {}", e);
                std::process::exit(1);
            }
        }
    }

    if let Err(e) = cli.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    init_logging(cli.verbose);

    let mut config = match AppConfig::load() {
        Ok(cfg) => cfg,
        Err(ConfigError::FileNotFound(path)) => {
            warn!(
                "No configuration file at {}; using built-in defaults (run --init to create one)",
                path.display()
            );
            AppConfig::embedded_default()?
        }
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // CLI overrides
    if let Some(delay_ms) = cli.delay_ms {
        config.runner.request_delay_ms = delay_ms;
    }
    if let Some(timeout_secs) = cli.timeout_secs {
        config.http.timeout_secs = timeout_secs;
    }

    let input = cli
        .input
        .as_ref()
        .context("An input CSV is required (use --input <FILE>)")?;
    let file = File::open(input)
        .with_context(|| format!("Failed to open input file {}", input.display()))?;
    let list = extract_domains(file)
        .with_context(|| format!("Failed to extract domains from {}", input.display()))?;

    if list.is_empty() {
        eprintln!("No domains found in {} (column {})", input.display(), list.column);
        std::process::exit(1);
    }
    info!(
        "Loaded {} domains from {} (column {})",
        list.len(),
        input.display(),
        list.column
    );

    let checker = Checker::new(&config.http)?;
    let store = JobStore::new();
    let job_id = store.create_job(list.len()).await;

    spawn_sweeper(
        store.clone(),
        None,
        config.runner.retention(),
        config.runner.sweep_interval(),
    );

    let runner = tokio::spawn(run_job(
        store.clone(),
        job_id.clone(),
        list.domains.clone(),
        checker,
        config.runner.request_delay(),
    ));

    ctrlc::set_handler(|| {
        if INTERRUPTED.swap(true, Ordering::SeqCst) {
            // Second Ctrl-C: bail out without waiting for the in-flight probe
            eprintln!("\nForce exiting.");
            std::process::exit(130);
        }
        eprintln!("\nInterrupt received. Finishing current domain, then stopping...");
    })
    .unwrap_or_else(|e| warn!("Failed to set Ctrl-C handler: {}", e));

    let progress = watch_progress(&store, &job_id, list.len()).await;
    let _ = runner.await;

    let progress = match progress {
        Some(p) => p,
        None => {
            eprintln!("Job {} disappeared before completion", job_id);
            std::process::exit(1);
        }
    };

    let output_path = cli.output_path();
    match cli.output_format.as_str() {
        "json" => export::export_json(&output_path, &progress)?,
        _ => export::export_csv(&output_path, &progress.successful_domains_with_evidence)?,
    }
    println!("Results saved to: {}", output_path.display());

    export::print_summary(&progress);

    match progress.status {
        JobStatus::Error => std::process::exit(1),
        JobStatus::Stopped => std::process::exit(130),
        _ => Ok(()),
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("bluedetect={}", default_level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Poll the job until it reaches a terminal state, driving the progress bar
/// and relaying Ctrl-C as a cooperative stop request.
async fn watch_progress(
    store: &JobStore,
    job_id: &str,
    total: usize,
) -> Option<bluedetect::job::JobProgress> {
    let bar = ProgressBar::new(total as u64);
    bar.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let mut stop_sent = false;
    loop {
        if INTERRUPTED.load(Ordering::SeqCst) && !stop_sent {
            store.request_stop(job_id).await;
            stop_sent = true;
        }

        let Some(snapshot) = store.snapshot(job_id).await else {
            bar.abandon();
            return None;
        };

        bar.set_position(snapshot.checked as u64);
        if let Some(domain) = &snapshot.current_domain {
            bar.set_message(domain.clone());
        }

        if snapshot.is_terminal() {
            match snapshot.status {
                JobStatus::Completed => bar.finish_with_message("done"),
                JobStatus::Stopped => bar.abandon_with_message("stopped"),
                _ => bar.abandon_with_message("error"),
            }
            return Some(snapshot);
        }

        tokio::time::sleep(Duration::from_millis(200)).await;
    }
}
