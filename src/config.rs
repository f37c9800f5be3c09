//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.simstats.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use simstats::analysis::{build_analysis, AgentAnalysis, AnalysisKind};
use simstats::params::{MissingConfigPolicy, MissingParamPolicy, ParameterPath};
use simstats::report::{OutputOptions, ALL_AGENTS};
use std::path::Path;

/// Default config file name.
pub const DEFAULT_CONFIG_FILE: &str = ".simstats.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Cross-run grouping settings.
    #[serde(default)]
    pub grouping: GroupingConfig,

    /// Analyses, in column order.
    #[serde(default = "default_analyses", rename = "analysis")]
    pub analyses: Vec<AnalysisConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            grouping: GroupingConfig::default(),
            analyses: default_analyses(),
        }
    }
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Field separator of both output files.
    #[serde(default = "default_separator")]
    pub separator: String,

    /// Agent type to analyse, or "all".
    #[serde(default = "default_agent_type")]
    pub agent_type: String,

    /// Directory receiving one CSV per run.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Record file name inside each run directory.
    #[serde(default = "default_record_file")]
    pub record_file: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            separator: default_separator(),
            agent_type: default_agent_type(),
            output_dir: default_output_dir(),
            record_file: default_record_file(),
            verbose: false,
        }
    }
}

fn default_separator() -> String {
    ",".to_string()
}

fn default_agent_type() -> String {
    ALL_AGENTS.to_string()
}

fn default_output_dir() -> String {
    "stats".to_string()
}

fn default_record_file() -> String {
    "record.json".to_string()
}

/// Cross-run grouping settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupingConfig {
    /// Write the grouped report.
    #[serde(default)]
    pub enabled: bool,

    /// Grouped report path.
    #[serde(default = "default_group_file")]
    pub group_file: String,

    /// Parameters in `outer/inner@attribute` form.
    #[serde(default)]
    pub params: Vec<ParameterPath>,

    /// Row handling when a run has no readable config.xml.
    #[serde(default)]
    pub missing_config: MissingConfigPolicy,

    /// Field handling when a parameter is not found.
    #[serde(default)]
    pub missing_param: MissingParamPolicy,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            group_file: default_group_file(),
            params: Vec::new(),
            missing_config: MissingConfigPolicy::default(),
            missing_param: MissingParamPolicy::default(),
        }
    }
}

fn default_group_file() -> String {
    "grouped.csv".to_string()
}

/// One `[[analysis]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub kind: AnalysisKind,

    /// Column name.
    pub name: String,

    /// Agent field read by field-based kinds.
    #[serde(default)]
    pub field: String,

    #[serde(default = "default_true")]
    pub write_results: bool,
}

impl AnalysisConfig {
    pub fn build(&self) -> Box<dyn AgentAnalysis> {
        build_analysis(self.kind, &self.name, &self.field, self.write_results)
    }
}

fn default_true() -> bool {
    true
}

fn default_analyses() -> Vec<AnalysisConfig> {
    vec![AnalysisConfig {
        kind: AnalysisKind::Num,
        name: "numAgents".to_string(),
        field: String::new(),
        write_results: true,
    }]
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Check settings that serde cannot.
    ///
    /// Run after [`Self::merge_with_args`]; command-line flags may complete
    /// a file that is incomplete on its own.
    pub fn validate(&self) -> Result<()> {
        if self.general.separator.is_empty() {
            anyhow::bail!("separator must not be empty");
        }
        if self.analyses.is_empty() {
            anyhow::bail!("at least one [[analysis]] is required");
        }
        for analysis in &self.analyses {
            if analysis.kind.needs_field() && analysis.field.is_empty() {
                anyhow::bail!("analysis '{}' needs a field", analysis.name);
            }
        }
        if self.grouping.enabled && self.grouping.params.is_empty() {
            anyhow::bail!("grouping is enabled but no params are listed");
        }
        Ok(())
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref separator) = args.separator {
            self.general.separator = separator.clone();
        }
        if let Some(ref agent_type) = args.agent_type {
            self.general.agent_type = agent_type.clone();
        }
        if let Some(ref output_dir) = args.output_dir {
            self.general.output_dir = output_dir.display().to_string();
        }
        if let Some(ref record_file) = args.record_file {
            self.general.record_file = record_file.clone();
        }

        // Params on the command line replace the file list and enable grouping
        if !args.params.is_empty() {
            self.grouping.params = args.params.clone();
            self.grouping.enabled = true;
        }
        if let Some(ref group_file) = args.group_file {
            self.grouping.group_file = group_file.display().to_string();
        }
        if args.no_group {
            self.grouping.enabled = false;
        }
        if args.strict_params {
            self.grouping.missing_param = MissingParamPolicy::Strict;
        }
        if args.pad_missing_config {
            self.grouping.missing_config = MissingConfigPolicy::Pad;
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Output options handed to the aggregator.
    pub fn output_options(&self) -> OutputOptions {
        OutputOptions {
            separator: self.general.separator.clone(),
            missing_config: self.grouping.missing_config,
            missing_param: self.grouping.missing_param,
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
