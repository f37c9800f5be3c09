//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use simstats::params::ParameterPath;
use std::path::PathBuf;

/// simstats - statistics from agent-based simulation records
///
/// Runs every configured analysis over each run found in the input
/// directory, writes one time-series CSV per run and, when grouping
/// parameters are given, one summary row per run into a grouped CSV.
///
/// Examples:
///   simstats --input-dir ./results
///   simstats --input-dir ./results --agent-type HunterGatherer --separator ';'
///   simstats --input-dir ./results --param config/climate@seed --param config/hunterGatherers@num
///   simstats --input-dir ./results --dry-run
///   simstats --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Directory holding one sub-directory per simulation run
    #[arg(short, long, value_name = "DIR", required_unless_present = "init_config")]
    pub input_dir: Option<PathBuf>,

    /// Directory receiving one CSV per run
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .simstats.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Agent type to analyse ("all" for every type)
    #[arg(short = 't', long, value_name = "TYPE", env = "SIMSTATS_AGENT_TYPE")]
    pub agent_type: Option<String>,

    /// Field separator, written after every field
    #[arg(short, long, value_name = "SEP")]
    pub separator: Option<String>,

    /// Record file name inside each run directory
    #[arg(long, value_name = "NAME")]
    pub record_file: Option<String>,

    /// Grouping parameter in outer/inner@attribute form (repeatable)
    ///
    /// Example: --param config/climate@seed
    #[arg(short, long = "param", value_name = "PATH")]
    pub params: Vec<ParameterPath>,

    /// Grouped report path
    #[arg(long, value_name = "FILE")]
    pub group_file: Option<PathBuf>,

    /// Disable the grouped report even if the config enables it
    #[arg(long, conflicts_with = "params")]
    pub no_group: bool,

    /// Fail a run when a grouping parameter cannot be resolved
    #[arg(long)]
    pub strict_params: bool,

    /// Write empty parameter fields for runs without a readable config.xml
    #[arg(long)]
    pub pad_missing_config: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Dry run: list discovered runs without processing them
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .simstats.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        match self.input_dir {
            Some(ref dir) if !dir.is_dir() => {
                return Err(format!("Input directory does not exist: {}", dir.display()));
            }
            None => return Err("--input-dir is required".to_string()),
            _ => {}
        }

        if let Some(ref separator) = self.separator {
            if separator.is_empty() {
                return Err("Separator must not be empty".to_string());
            }
        }

        if let Some(ref agent_type) = self.agent_type {
            if agent_type.trim().is_empty() {
                return Err("Agent type must not be empty".to_string());
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// The validated input directory.
    pub fn input_dir(&self) -> PathBuf {
        self.input_dir.clone().unwrap_or_default()
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            input_dir: Some(std::env::temp_dir()),
            output_dir: None,
            config: None,
            agent_type: None,
            separator: None,
            record_file: None,
            params: Vec::new(),
            group_file: None,
            no_group: false,
            strict_params: false,
            pad_missing_config: false,
            verbose: false,
            quiet: false,
            dry_run: false,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_params() {
        let args = Args::try_parse_from([
            "simstats",
            "--input-dir",
            "runs",
            "--param",
            "config/climate@seed",
            "-p",
            "config/agents/agent@density",
        ])
        .unwrap();
        assert_eq!(args.params.len(), 2);
        assert_eq!(args.params[1].label(), "density_agent");
    }

    #[test]
    fn test_parse_rejects_bad_param() {
        let result = Args::try_parse_from(["simstats", "-i", "runs", "--param", "config"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_missing_input_dir() {
        let mut args = make_args();
        args.input_dir = Some(PathBuf::from("/definitely/not/here"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_empty_separator() {
        let mut args = make_args();
        args.separator = Some(String::new());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
