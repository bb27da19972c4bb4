//! Repository snapshot container and walk statistics.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::error::Diagnostic;
use crate::finding::{PassStatus, ReasonCode};
use crate::record::FileRecord;

/// Summary statistics for a walk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalkStats {
    /// Files discovered before sampling.
    pub total_discovered: usize,
    /// Total size of discovered files in bytes.
    pub total_size: u64,
    /// Directories pruned by ignore rules.
    pub dirs_pruned: usize,
    /// Newest file (path, time).
    pub newest_file: Option<(PathBuf, SystemTime)>,
    /// Duration of the walk.
    pub elapsed: Duration,
}

impl WalkStats {
    /// Create new empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Update stats with a discovered file.
    pub fn record_file(&mut self, path: &Path, size: u64, modified: SystemTime) {
        self.total_discovered += 1;
        self.total_size += size;

        if self.newest_file.as_ref().is_none_or(|(_, t)| modified > *t) {
            self.newest_file = Some((path.to_path_buf(), modified));
        }
    }
}

/// The walker's output: an immutable inventory of the repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositorySnapshot {
    /// Canonical root path.
    pub root: PathBuf,
    /// Discovered files, sorted by relative path.
    pub files: Vec<FileRecord>,
    /// Only a representative subset was kept.
    pub sampled: bool,
    /// Discovered file count exceeded the large-repository threshold.
    pub is_large_repo: bool,
    /// The walk stopped at its time limit.
    pub truncated: bool,
    /// The root is inside a version-controlled work tree.
    pub has_version_control: bool,
    /// Walk statistics.
    pub stats: WalkStats,
    /// Non-fatal problems seen while walking.
    pub diagnostics: Vec<Diagnostic>,
}

impl RepositorySnapshot {
    /// Create a snapshot. Files are sorted by path.
    pub fn new(root: PathBuf, mut files: Vec<FileRecord>, has_version_control: bool) -> Self {
        files.sort_by(|a, b| a.path.cmp(&b.path));
        let total = files.len();
        Self {
            root,
            files,
            sampled: false,
            is_large_repo: false,
            truncated: false,
            has_version_control,
            stats: WalkStats {
                total_discovered: total,
                ..WalkStats::default()
            },
            diagnostics: Vec::new(),
        }
    }

    /// Number of files in the snapshot.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Look up a file by relative path.
    pub fn get(&self, path: &Path) -> Option<&FileRecord> {
        self.files
            .binary_search_by(|f| f.path.as_path().cmp(path))
            .ok()
            .map(|i| &self.files[i])
    }

    /// Check whether a relative path is in the snapshot.
    pub fn contains(&self, path: &Path) -> bool {
        self.get(path).is_some()
    }

    /// Absolute path of a relative record path.
    pub fn absolute(&self, relative: &Path) -> PathBuf {
        self.root.join(relative)
    }

    /// Read a file's contents as lossy UTF-8.
    pub fn read_to_string(&self, record: &FileRecord) -> std::io::Result<String> {
        let bytes = std::fs::read(self.absolute(&record.path))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Status that file-based classifiers inherit from the walk.
    pub fn coverage_status(&self) -> PassStatus {
        if self.truncated {
            PassStatus::Partial {
                reason: ReasonCode::WalkTimeout,
            }
        } else if self.sampled {
            PassStatus::Partial {
                reason: ReasonCode::Sampled,
            }
        } else {
            PassStatus::Complete
        }
    }

    /// Whether findings should be annotated as coming from a partial scan.
    pub fn is_partial(&self) -> bool {
        self.sampled || self.truncated
    }
}
