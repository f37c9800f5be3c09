//! Statistics output.
//!
//! [`GlobalStats`] drives the registered analyses over a run and writes the
//! per-run time series plus the optional cross-run grouped report.

pub mod global_stats;
mod line;

pub use global_stats::*;
pub use line::format_value;
