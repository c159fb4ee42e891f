//! Error types shared by the daemon and its collaborators

use std::path::PathBuf;
use std::time::Duration;

/// Errors raised at the external seams (config, processes, watch).
///
/// Per-target failures never escape the reconciliation routine as this type;
/// they are counted and logged where they happen.
#[derive(Debug, thiserror::Error)]
pub enum ThemerError {
    #[error("Failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("{program} did not answer within {}s", .timeout.as_secs_f64())]
    Timeout { program: String, timeout: Duration },

    #[error("Cannot watch {path}: {reason}")]
    Watch { path: PathBuf, reason: String },
}

pub type ThemerResult<T> = Result<T, ThemerError>;
