//! Per-run time series and cross-run grouped report.

use super::line::Line;
use crate::analysis::AgentAnalysis;
use crate::error::{AnalysisError, ParamError, Result, StatsError};
use crate::params::{MissingConfigPolicy, MissingParamPolicy, ParameterPath, ParameterResolver};
use crate::record::{AgentRecord, SimulationRecordSource};
use std::borrow::Cow;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Agent type filter selecting every recorded type.
pub const ALL_AGENTS: &str = "all";

/// Formatting and failure policies of the output files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputOptions {
    /// Written after every field, including the last one of a line.
    pub separator: String,
    pub missing_config: MissingConfigPolicy,
    pub missing_param: MissingParamPolicy,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            separator: ",".to_string(),
            missing_config: MissingConfigPolicy::default(),
            missing_param: MissingParamPolicy::default(),
        }
    }
}

impl OutputOptions {
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
            ..Self::default()
        }
    }
}

/// Who releases a registered analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// Dropped together with the aggregator.
    Owned,
    /// Left to the caller.
    Borrowed,
}

/// A registered analysis tagged with its ownership.
pub enum Registration<'a> {
    Owned(Box<dyn AgentAnalysis + 'a>),
    Borrowed(&'a mut (dyn AgentAnalysis + 'a)),
}

impl<'a> Registration<'a> {
    pub fn ownership(&self) -> Ownership {
        match self {
            Registration::Owned(_) => Ownership::Owned,
            Registration::Borrowed(_) => Ownership::Borrowed,
        }
    }

    pub fn analysis(&self) -> &(dyn AgentAnalysis + 'a) {
        match self {
            Registration::Owned(a) => a.as_ref(),
            Registration::Borrowed(a) => &**a,
        }
    }

    fn analysis_mut(&mut self) -> &mut (dyn AgentAnalysis + 'a) {
        match self {
            Registration::Owned(a) => a.as_mut(),
            Registration::Borrowed(a) => &mut **a,
        }
    }
}

/// Grouping configuration installed by [`GlobalStats::set_params`].
struct Grouping<'a> {
    params: Cow<'a, [ParameterPath]>,
    group_file: PathBuf,
    resolver: ParameterResolver,
}

/// Aggregates analyses over every agent of a run.
///
/// Owned analyses are dropped in registration order when the aggregator is
/// dropped; borrowed ones and borrowed parameter lists are never touched.
pub struct GlobalStats<'a> {
    options: OutputOptions,
    analyses: Vec<Registration<'a>>,
    grouping: Option<Grouping<'a>>,
}

impl<'a> GlobalStats<'a> {
    pub fn new(options: OutputOptions) -> Self {
        Self {
            options,
            analyses: Vec::new(),
            grouping: None,
        }
    }

    pub fn name(&self) -> &'static str {
        "Global Stats"
    }

    /// Registers an analysis owned by the aggregator.
    pub fn add_analysis(&mut self, analysis: Box<dyn AgentAnalysis + 'a>) {
        self.analyses.push(Registration::Owned(analysis));
    }

    /// Registers an analysis that stays owned by the caller.
    pub fn add_borrowed_analysis(&mut self, analysis: &'a mut (dyn AgentAnalysis + 'a)) {
        self.analyses.push(Registration::Borrowed(analysis));
    }

    /// Registered analyses in registration order.
    pub fn registrations(&self) -> &[Registration<'a>] {
        &self.analyses
    }

    /// Parameter paths installed by [`Self::set_params`].
    pub fn params(&self) -> Option<&[ParameterPath]> {
        self.grouping.as_ref().map(|g| g.params.as_ref())
    }

    /// Enables the grouped report and (re)creates `group_file` with its header.
    ///
    /// The header lists the analyses registered so far, so register every
    /// analysis before calling this. `input_dir` holds one directory per run
    /// containing its `config.xml`.
    pub fn set_params(
        &mut self,
        params: impl Into<Cow<'a, [ParameterPath]>>,
        group_file: impl Into<PathBuf>,
        input_dir: impl Into<PathBuf>,
    ) -> Result<()> {
        let params = params.into();
        let group_file = group_file.into();

        let mut header = Line::new(&self.options.separator);
        header.field("run");
        for param in params.iter() {
            header.field(param.label());
        }
        for analysis in self.written() {
            header.field(analysis.name());
        }

        std::fs::write(&group_file, header.finish())
            .map_err(|e| StatsError::io(e, &group_file))?;
        info!(
            "Grouping {} parameter(s) into {}",
            params.len(),
            group_file.display()
        );

        self.grouping = Some(Grouping {
            params,
            group_file,
            resolver: ParameterResolver::new(input_dir, self.options.missing_param),
        });
        Ok(())
    }

    /// Computes every analysis over `record` and writes `output_file`.
    ///
    /// `agent_type` is either [`ALL_AGENTS`] or the name of one agent type.
    /// When grouping is enabled one row is appended to the grouped report.
    pub fn apply<R>(&mut self, record: &R, output_file: &Path, agent_type: &str) -> Result<()>
    where
        R: SimulationRecordSource + ?Sized,
    {
        let resolution = record.final_resolution();
        if resolution == 0 {
            return Err(StatsError::InvalidResolution);
        }
        let num_steps = record.num_steps();
        let num_buckets = num_steps / resolution + 1;

        info!("Executing postprocess: {} ...", self.name());
        if agent_type != ALL_AGENTS && record.agents_of(agent_type).is_none() {
            warn!("No agents of type '{}' in record", agent_type);
        }

        for registration in &mut self.analyses {
            let analysis = registration.analysis_mut();
            analysis.set_num_time_steps(num_buckets);

            debug!("Preprocessing analysis: {}", analysis.name());
            analysis.pre_process()?;

            debug!("Computing analysis: {}", analysis.name());
            for_each_agent(record, agent_type, |agent| analysis.compute_agent(agent))?;

            debug!("Postprocessing analysis: {}", analysis.name());
            analysis.post_process()?;
        }

        self.write_time_series(num_steps, resolution, output_file)?;
        info!("Wrote {}", output_file.display());

        if self.grouping.is_some() {
            self.append_group_row(output_file, num_steps / resolution)?;
        }
        Ok(())
    }

    /// Write-enabled analyses in registration order.
    fn written(&self) -> impl Iterator<Item = &(dyn AgentAnalysis + 'a)> + '_ {
        self.analyses
            .iter()
            .map(Registration::analysis)
            .filter(|a| a.write_results())
    }

    fn write_time_series(&self, num_steps: usize, resolution: usize, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| StatsError::io(e, path))?;
        let mut out = BufWriter::new(file);
        let separator = self.options.separator.as_str();

        let mut header = Line::new(separator);
        header.field("timeStep");
        for analysis in self.written() {
            header.field(analysis.name());
        }
        out.write_all(header.finish().as_bytes())
            .map_err(|e| StatsError::io(e, path))?;

        for step in (0..=num_steps).step_by(resolution) {
            let bucket = step / resolution;
            let mut row = Line::new(separator);
            row.field(step);
            for analysis in self.written() {
                row.value(analysis.result(bucket));
            }
            out.write_all(row.finish().as_bytes())
                .map_err(|e| StatsError::io(e, path))?;
        }

        out.flush().map_err(|e| StatsError::io(e, path))
    }

    fn append_group_row(&self, output_file: &Path, final_bucket: usize) -> Result<()> {
        let Some(grouping) = &self.grouping else {
            return Ok(());
        };
        let separator = self.options.separator.as_str();

        let file_name = output_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| output_file.display().to_string());

        let mut row = Line::new(separator);
        row.field(&file_name);

        match grouping.resolver.resolve(&grouping.params, &file_name) {
            Ok(values) => {
                for value in values {
                    row.field(value);
                }
            }
            Err(ParamError::ConfigLoad { path, reason }) => {
                warn!("Skipping parameters of {}: {}", path.display(), reason);
                if self.options.missing_config == MissingConfigPolicy::Pad {
                    for _ in grouping.params.iter() {
                        row.field("");
                    }
                }
            }
            Err(e) => return Err(e.into()),
        }

        for analysis in self.written() {
            row.value(analysis.result(final_bucket));
        }

        debug!("Grouping by params into {}", grouping.group_file.display());
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&grouping.group_file)
            .map_err(|e| StatsError::io(e, &grouping.group_file))?;
        file.write_all(row.finish().as_bytes())
            .map_err(|e| StatsError::io(e, &grouping.group_file))
    }
}

/// Calls `f` on every agent selected by `agent_type`.
fn for_each_agent<R, F>(record: &R, agent_type: &str, mut f: F) -> std::result::Result<(), AnalysisError>
where
    R: SimulationRecordSource + ?Sized,
    F: FnMut(&AgentRecord) -> std::result::Result<(), AnalysisError>,
{
    if agent_type == ALL_AGENTS {
        for name in record.agent_types() {
            if let Some(agents) = record.agents_of(name) {
                for agent in agents {
                    f(agent)?;
                }
            }
        }
    } else if let Some(agents) = record.agents_of(agent_type) {
        for agent in agents {
            f(agent)?;
        }
    }
    Ok(())
}
