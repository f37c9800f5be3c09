//! Per-agent analyses.
//!
//! An analysis is driven by [`crate::report::GlobalStats`] through three
//! phases per run: `pre_process`, one `compute_agent` call per visited agent,
//! then `post_process`. Afterwards `result` may be queried for every bucket.

pub mod builtin;

pub use builtin::*;

use crate::error::AnalysisError;
use crate::record::AgentRecord;

/// Capability interface of a pluggable per-agent statistic.
pub trait AgentAnalysis {
    /// Column name used in output headers.
    fn name(&self) -> &str;

    /// Whether this analysis gets a column in the output files.
    fn write_results(&self) -> bool;

    /// Resizes the result buffer to `num_buckets` entries.
    fn set_num_time_steps(&mut self, num_buckets: usize);

    /// Called once per run before any agent is visited.
    fn pre_process(&mut self) -> Result<(), AnalysisError> {
        Ok(())
    }

    /// Called once for every visited agent. Agent order is unspecified.
    fn compute_agent(&mut self, agent: &AgentRecord) -> Result<(), AnalysisError>;

    /// Called once per run after every agent has been visited.
    fn post_process(&mut self) -> Result<(), AnalysisError> {
        Ok(())
    }

    /// Result of bucket `bucket`.
    fn result(&self, bucket: usize) -> f64;
}
