//! Classification and scoring for konmari.
//!
//! This crate turns a [`RepositorySnapshot`](konmari_core::RepositorySnapshot)
//! into findings for the five categories: dead files, orphaned
//! dependencies, broken documentation links, stale configuration and legacy
//! markers. The [`Engine`] runs them alongside the git archaeology pass and
//! the context-heavy documents report, then assembles the final report.

mod age;
mod classifier;
mod config_files;
mod context_heavy;
mod dead_files;
mod dependencies;
mod docs;
mod duplicates;
mod engine;
mod imports;
mod legacy;
mod manifest;
mod scoring;
#[cfg(test)]
mod test_support;

pub use age::{age_signal, format_age, recency_signal};
pub use classifier::{AnalysisContext, Classifier, ClassifierOutput};
pub use config_files::ConfigFileClassifier;
pub use context_heavy::{ContextHeavyScanner, estimate_tokens};
pub use dead_files::DeadFileClassifier;
pub use dependencies::DependencyClassifier;
pub use docs::{DocLinkClassifier, Link, LinkTarget, percent_decode, slugify};
pub use duplicates::{DuplicateDetector, DuplicateGroup, DuplicateKey};
pub use engine::{Engine, VcsOpener};
pub use imports::{
    ImportScanner, PythonImports, go_module_used, js_declared_used, js_package, python_import_names,
    rust_crate_used,
};
pub use legacy::LegacyClassifier;
pub use manifest::{
    BUILD_SECTION, DeclaredDependency, INDIRECT_SECTION, ManifestFormat, ManifestIndex,
    ManifestParseError, ParsedManifest, normalize_package,
};
pub use scoring::ScoreCard;
