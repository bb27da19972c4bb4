//! Core types and configuration for konmari.
//!
//! This crate provides the data model shared by the walker, the
//! classifiers and the version-control pass: file records, the repository
//! snapshot, findings and the report they are merged into, plus the engine
//! configuration with its injectable pattern tables and scoring rules.

mod config;
mod ecosystem;
mod error;
mod finding;
mod pattern;
mod record;
mod report;
mod snapshot;

pub use config::{
    AnalysisConfig, AnalysisConfigBuilder, ConfigFileRule, ContextConfig, GitConfig, PatternTables,
    ScoringConfig, ScoringRule, WalkConfig, WalkConfigBuilder,
};
pub use ecosystem::{EcosystemSet, MonorepoInfo, MonorepoTool};
pub use error::{Diagnostic, DiagnosticKind, EngineError, ErrorKind, Phase};
pub use finding::{
    Category, CategoryReport, Confidence, ConfidenceBand, Finding, PassStatus, ReasonCode, Signal,
};
pub use pattern::PatternSet;
pub use record::{Ecosystem, FileRecord, Language, display_path};
pub use report::{
    AnalysisOutcome, AnalysisReport, Categories, Cleanliness, CommitSample, ContextAdvice,
    ContextHeavyFile, ErrorReport, GitArchaeologyReport, StaleBranch, Summary,
};
pub use snapshot::{RepositorySnapshot, WalkStats};
