//! Repository walking and ecosystem detection for konmari.
//!
//! This crate turns a root directory into an immutable
//! [`RepositorySnapshot`](konmari_core::RepositorySnapshot) using jwalk for
//! parallel traversal, samples large repositories down to a representative
//! subset, and detects which package ecosystems the repository uses.

mod ecosystem;
mod ignore;
mod names;
mod sampling;
mod walker;

pub use ecosystem::{
    EcosystemDetection, EcosystemDetector, MANIFEST_MARKERS, is_marker_file, manifest_ecosystem,
};
pub use ignore::IgnoreRules;
pub use names::{NameClassifier, NameMatch, NameMatchKind};
pub use sampling::select_sample;
pub use walker::RepoWalker;
