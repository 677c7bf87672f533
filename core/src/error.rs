use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Structured error body printed by the tools. Machine-readable first, so a
/// calling script can branch on `error` without parsing the message.
#[derive(Debug, Serialize)]
pub struct ErrorReport {
    /// Machine-readable error code (e.g. "io_failed", "missing_directory")
    pub error: String,
    /// Human-readable description of what went wrong
    pub message: String,
    /// File the error relates to (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Hint about how to fix it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs_hint: Option<String>,
}

/// Error codes used across the tools
pub mod codes {
    pub const IO_FAILED: &str = "io_failed";
    pub const MISSING_DIRECTORY: &str = "missing_directory";
    pub const INVALID_PATTERN: &str = "invalid_pattern";
    pub const UNKNOWN_HANDLE: &str = "unknown_handle";
    pub const MALFORMED_ARTIFACT: &str = "malformed_artifact";
    pub const MISSING_COLUMN: &str = "missing_column";
    pub const SERIALIZATION_FAILED: &str = "serialization_failed";
}

/// Failures of a live session log.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no decision with handle {0} in this session")]
    UnknownDecision(usize),
    #[error("no death with handle {0} in this session")]
    UnknownDeath(usize),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write table {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("failed to serialize summary {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Why a single persisted session could not be loaded. Never fatal to a batch.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed summary {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("malformed table {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("table {path} is missing required column '{column}'")]
    MissingColumn { path: PathBuf, column: String },
}

/// Batch-level failures: the whole load is impossible.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("data directory {0} does not exist")]
    MissingDirectory(PathBuf),
    #[error("failed to list {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid session id pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl SessionError {
    pub fn report(&self) -> ErrorReport {
        let (code, path, hint) = match self {
            Self::UnknownDecision(_) | Self::UnknownDeath(_) => (
                codes::UNKNOWN_HANDLE,
                None,
                Some("Handles are only valid for the session log that issued them"),
            ),
            Self::Io { path, .. } => (
                codes::IO_FAILED,
                Some(path),
                Some("Check that the output directory is writable"),
            ),
            Self::Csv { path, .. } | Self::Json { path, .. } => {
                (codes::SERIALIZATION_FAILED, Some(path), None)
            }
        };
        ErrorReport {
            error: code.to_string(),
            message: self.to_string(),
            path: path.map(|p| p.display().to_string()),
            docs_hint: hint.map(str::to_string),
        }
    }
}

impl LoadError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingColumn { .. } => codes::MISSING_COLUMN,
            Self::Io { .. } => codes::IO_FAILED,
            Self::Json { .. } | Self::Csv { .. } => codes::MALFORMED_ARTIFACT,
        }
    }
}

impl StoreError {
    pub fn report(&self) -> ErrorReport {
        let (code, path, hint) = match self {
            Self::MissingDirectory(path) => (
                codes::MISSING_DIRECTORY,
                Some(path),
                Some("Pass --data pointing at the directory sessions were persisted to"),
            ),
            Self::Io { path, .. } => (codes::IO_FAILED, Some(path), None),
            Self::InvalidPattern { .. } => (
                codes::INVALID_PATTERN,
                None,
                Some("Use '*' for any run of characters and '?' for one character"),
            ),
        };
        ErrorReport {
            error: code.to_string(),
            message: self.to_string(),
            path: path.map(|p| p.display().to_string()),
            docs_hint: hint.map(str::to_string),
        }
    }
}
