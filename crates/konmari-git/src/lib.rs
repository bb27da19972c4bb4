//! Version-control history mining for konmari.
//!
//! The archaeology pass talks to history only through the
//! [`VersionControl`] trait. [`Git2Backend`] reads a real repository via
//! libgit2 (behind the default `git` feature) and [`MemoryBackend`] serves a
//! fixed history.

mod archaeology;
mod backend;
mod memory;
#[cfg(feature = "git")]
mod repo;

use std::path::Path;

pub use archaeology::{ArchaeologyOutcome, Archaeologist};
pub use backend::{BranchInfo, CommitInfo, CommitLog, CommitWindow, VcsError, VersionControl};
pub use memory::MemoryBackend;
#[cfg(feature = "git")]
pub use repo::Git2Backend;

/// Open the default backend for a repository root.
#[cfg(feature = "git")]
pub fn open_repository(root: &Path) -> Result<Box<dyn VersionControl>, VcsError> {
    Ok(Box::new(Git2Backend::open(root)?))
}

/// Open the default backend for a repository root.
#[cfg(not(feature = "git"))]
pub fn open_repository(root: &Path) -> Result<Box<dyn VersionControl>, VcsError> {
    Err(VcsError::Unavailable {
        path: root.to_path_buf(),
        reason: "built without the `git` feature".to_string(),
    })
}
