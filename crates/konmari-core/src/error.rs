//! Error and diagnostic types for analysis runs.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum::Display;
use thiserror::Error;

/// Phase of an analysis run, used to report where a deadline expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    Walk,
    EcosystemDetection,
    Classification,
    Assembly,
}

/// Errors that abort a whole analysis run.
///
/// Everything else is recovered inside its owning pass and surfaces as a
/// [`Diagnostic`] plus a non-complete status.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Root path is missing or unreadable.
    #[error("Invalid repository root {path}: {source}")]
    InvalidRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Root path is not a directory.
    #[error("Repository root is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// The caller-supplied deadline passed before the report was assembled.
    #[error("Analysis deadline exceeded during {phase}")]
    DeadlineExceeded { phase: Phase },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl EngineError {
    /// Create an invalid-root error with path context.
    pub fn invalid_root(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::InvalidRoot {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid-config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Machine-readable kind for serialized error reports.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRoot { .. } | Self::NotADirectory { .. } => ErrorKind::InvalidRoot,
            Self::DeadlineExceeded { .. } => ErrorKind::DeadlineExceeded,
            Self::InvalidConfig { .. } => ErrorKind::InvalidConfig,
        }
    }
}

/// Serialized classification of a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidRoot,
    DeadlineExceeded,
    InvalidConfig,
}

/// Kind of non-fatal diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A manifest existed but could not be parsed.
    ManifestParse,
    /// A file or directory could not be read.
    ReadError,
    /// File metadata could not be read.
    MetadataError,
    /// Version-control metadata could not be inspected.
    VersionControl,
    /// The walk hit its time limit.
    WalkTimeout,
}

/// Non-fatal note attached to the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Path the note concerns, relative to the root when possible.
    pub path: Option<PathBuf>,
    /// Human-readable message.
    pub message: String,
    /// Kind of diagnostic.
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    /// Create a new diagnostic.
    pub fn new(path: Option<PathBuf>, message: impl Into<String>, kind: DiagnosticKind) -> Self {
        Self {
            path,
            message: message.into(),
            kind,
        }
    }

    /// Create a read error diagnostic.
    pub fn read_error(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        Self {
            path: Some(path.into()),
            message: format!("Read error: {error}"),
            kind: DiagnosticKind::ReadError,
        }
    }

    /// Create a manifest parse diagnostic.
    pub fn manifest(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            message: message.into(),
            kind: DiagnosticKind::ManifestParse,
        }
    }
}
