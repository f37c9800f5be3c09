//! Error types for the statistics engine.
//!
//! Library code returns these typed errors; the binary wraps them in
//! `anyhow` with additional context.

use std::path::PathBuf;
use thiserror::Error;

/// Failure inside one analysis phase.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("analysis '{analysis}': agent '{agent}' has no field '{field}' at bucket {bucket}")]
    MissingField {
        analysis: String,
        agent: String,
        field: String,
        bucket: usize,
    },

    #[error("analysis '{analysis}' failed: {message}")]
    Failed { analysis: String, message: String },
}

/// Failure while extracting grouping parameters from a run's config.xml.
#[derive(Debug, Error)]
pub enum ParamError {
    #[error("cannot load config {}: {reason}", .path.display())]
    ConfigLoad { path: PathBuf, reason: String },

    #[error("element '{element}' not found while resolving '{param}'")]
    MissingElement { param: String, element: String },

    #[error("attribute '{attribute}' not found while resolving '{param}'")]
    MissingAttribute { param: String, attribute: String },

    #[error("invalid parameter path '{0}'")]
    InvalidPath(String),
}

/// Failure while reading a simulation record.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("I/O error: {source} (path: {})", .path.display())]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },

    #[error("malformed record {}: {source}", .path.display())]
    Parse {
        source: serde_json::Error,
        path: PathBuf,
    },
}

/// Top-level error of [`crate::report::GlobalStats`].
#[derive(Debug, Error)]
pub enum StatsError {
    #[error("I/O error: {source} (path: {})", .path.display())]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },

    #[error("final resolution must be at least 1")]
    InvalidResolution,

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Param(#[from] ParamError),
}

impl StatsError {
    pub(crate) fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        StatsError::Io {
            source,
            path: path.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StatsError>;
