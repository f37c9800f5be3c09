//! simstats - batch statistics over agent-based simulation runs
//!
//! Walks an input directory of simulation runs, computes the configured
//! analyses over each run's record and writes the CSV reports.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (bad arguments, config, record or I/O failure)

mod cli;
mod config;

use anyhow::{Context, Result};
use cli::Args;
use config::{Config, DEFAULT_CONFIG_FILE};
use indicatif::{ProgressBar, ProgressStyle};
use simstats::record::{SimulationRecord, SimulationRecordSource};
use simstats::report::GlobalStats;
use simstats::scanner::{RunScanner, ScannedRun};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("simstats v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run_batch(args) {
        error!("Post-processing failed: {:#}", e);
        eprintln!("\nError: {:#}", e);
        std::process::exit(1);
    }
    Ok(())
}

/// Handle --init-config: generate a default .simstats.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!("{} already exists. Remove it first or edit it manually.", DEFAULT_CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to add analyses and grouping parameters.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Warning: a tracing subscriber was already installed");
    }
}

/// Process every run of the input directory.
fn run_batch(args: Args) -> Result<()> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate().context("Invalid configuration")?;

    let input_dir = args.input_dir();
    let output_dir = PathBuf::from(&config.general.output_dir);

    let scanner = RunScanner::new(input_dir.clone(), config.general.record_file.clone());
    let runs = scanner.scan()?;
    info!("Found {} run(s) in {}", runs.len(), input_dir.display());

    if args.dry_run {
        return handle_dry_run(&runs, &output_dir);
    }
    if runs.is_empty() {
        warn!(
            "No run directories containing {} found",
            config.general.record_file
        );
        return Ok(());
    }

    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let mut stats = GlobalStats::new(config.output_options());
    for analysis in &config.analyses {
        stats.add_analysis(analysis.build());
    }
    for registration in stats.registrations() {
        debug!(
            "Registered analysis {} ({:?})",
            registration.analysis().name(),
            registration.ownership()
        );
    }

    if config.grouping.enabled {
        stats
            .set_params(
                config.grouping.params.clone(),
                PathBuf::from(&config.grouping.group_file),
                input_dir.clone(),
            )
            .context("Failed to create grouped report")?;
    }

    let progress = progress_bar(runs.len() as u64, args.quiet);
    for run in &runs {
        progress.set_message(run.name.clone());
        process_run(&mut stats, run, &output_dir, &config.general.agent_type)?;
        progress.inc(1);
    }
    progress.finish_with_message("done");

    println!("\nStatistics Summary:");
    println!("   Runs processed: {}", runs.len());
    println!("   Analyses: {}", config.analyses.len());
    println!("   Output: {}", output_dir.display());
    if config.grouping.enabled {
        println!("   Grouped report: {}", config.grouping.group_file);
    }
    println!("   Duration: {:.1}s", start_time.elapsed().as_secs_f64());
    Ok(())
}

/// Load one run's record and apply every analysis to it.
fn process_run(
    stats: &mut GlobalStats<'_>,
    run: &ScannedRun,
    output_dir: &Path,
    agent_type: &str,
) -> Result<()> {
    let record = SimulationRecord::load(&run.record_path)?;
    debug!(
        "Run {}: {} steps, resolution {}, {} agents",
        run.name,
        record.num_steps(),
        record.final_resolution(),
        record.num_agents()
    );

    let output_file = run.output_file(output_dir);
    stats
        .apply(&record, &output_file, agent_type)
        .with_context(|| format!("Failed to process run {}", run.name))
}

fn progress_bar(len: u64, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

/// Handle --dry-run: list discovered runs and exit.
fn handle_dry_run(runs: &[ScannedRun], output_dir: &Path) -> Result<()> {
    println!("\nDry run: discovered runs (nothing is written)...\n");

    if runs.is_empty() {
        println!("   No run directories found.");
    } else {
        for run in runs {
            println!(
                "     {} -> {}",
                run.record_path.display(),
                run.output_file(output_dir).display()
            );
        }
        println!("\n   Total: {} runs", runs.len());
    }
    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        // a broken config file must not fall back to defaults unnoticed
        Err(e) => Err(e.context(format!("Failed to load {}", DEFAULT_CONFIG_FILE))),
    }
}
