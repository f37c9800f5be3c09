//! simstats - statistics over agent-based simulation records.
//!
//! [`report::GlobalStats`] runs a list of [`analysis::AgentAnalysis`]
//! implementations over every agent of a [`record::SimulationRecordSource`],
//! writes one time-series CSV per run and, optionally, one row per run into
//! a grouped CSV keyed by values read from each run's `config.xml`.

pub mod analysis;
pub mod error;
pub mod params;
pub mod record;
pub mod report;
pub mod scanner;

pub use error::{AnalysisError, ParamError, RecordError, Result, StatsError};
