//! JWalk-based parallel repository walker.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant, SystemTime};

use jwalk::{Parallelism, WalkDir};
use tracing::{debug, info, warn};

use konmari_core::{
    Diagnostic, DiagnosticKind, EngineError, FileRecord, RepositorySnapshot, WalkConfig,
    WalkStats,
};

use crate::ignore::IgnoreRules;
use crate::names::NameClassifier;
use crate::sampling::select_sample;

/// Walks a repository root into a [`RepositorySnapshot`].
#[derive(Debug, Clone)]
pub struct RepoWalker {
    config: WalkConfig,
    rules: IgnoreRules,
}

impl RepoWalker {
    /// Create a walker, compiling the ignore list.
    pub fn new(config: WalkConfig) -> Result<Self, EngineError> {
        let rules = IgnoreRules::new(&config)?;
        Ok(Self { config, rules })
    }

    /// Get the walk configuration.
    pub fn config(&self) -> &WalkConfig {
        &self.config
    }

    /// Walk `root` with only the configured time limit.
    pub fn walk(&self, root: &Path, names: &NameClassifier) -> Result<RepositorySnapshot, EngineError> {
        self.walk_until(root, names, None)
    }

    /// Walk `root`, stopping early at the configured time limit or at
    /// `deadline`, whichever comes first.
    ///
    /// Stopping early is not an error: the snapshot is flagged `truncated`
    /// and carries a diagnostic.
    pub fn walk_until(
        &self,
        root: &Path,
        names: &NameClassifier,
        deadline: Option<Instant>,
    ) -> Result<RepositorySnapshot, EngineError> {
        let start = Instant::now();
        let root = root
            .canonicalize()
            .map_err(|e| EngineError::invalid_root(root, e))?;

        if !root.is_dir() {
            return Err(EngineError::NotADirectory { path: root });
        }
        // Fail fast on unreadable roots rather than returning an empty snapshot.
        std::fs::read_dir(&root).map_err(|e| EngineError::invalid_root(&root, e))?;

        let stop_at = match (self.config.timeout().map(|t| start + t), deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };

        let has_version_control = inside_work_tree(&root);
        let mut stats = WalkStats::new();
        let mut diagnostics = Vec::new();
        let mut files = Vec::new();
        let mut truncated = false;

        let pruned = Arc::new(AtomicUsize::new(0));
        let walker = self.build_walker(&root, Arc::clone(&pruned));

        for entry_result in walker {
            if stop_at.is_some_and(|t| Instant::now() >= t) {
                truncated = true;
                break;
            }

            let entry = match entry_result {
                Ok(e) => e,
                Err(err) => {
                    let path = err.path().map(|p| relative(&root, p).to_path_buf());
                    diagnostics.push(Diagnostic::new(path, err.to_string(), DiagnosticKind::ReadError));
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let rel = relative(&root, &path).to_path_buf();

            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(err) => {
                    diagnostics.push(Diagnostic::new(
                        Some(rel),
                        err.to_string(),
                        DiagnosticKind::MetadataError,
                    ));
                    continue;
                }
            };

            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            stats.record_file(&rel, metadata.len(), modified);
            files.push(FileRecord::new(rel, metadata.len(), modified));
        }

        stats.dirs_pruned = pruned.load(Ordering::Relaxed);

        if truncated {
            warn!(
                root = %root.display(),
                files = files.len(),
                "walk stopped at its time limit; snapshot is truncated"
            );
            diagnostics.push(Diagnostic::new(
                None,
                format!("walk stopped after {} files at its time limit", files.len()),
                DiagnosticKind::WalkTimeout,
            ));
        }

        let discovered = files.len();
        let is_large_repo = discovered > self.config.large_repo_threshold;
        if is_large_repo {
            files = select_sample(files, self.config.sample_cap, names);
            info!(
                discovered,
                kept = files.len(),
                threshold = self.config.large_repo_threshold,
                "large repository, sampling"
            );
        }

        stats.elapsed = start.elapsed();
        debug!(
            root = %root.display(),
            files = files.len(),
            pruned = stats.dirs_pruned,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "walk complete"
        );

        let mut snapshot = RepositorySnapshot::new(root, files, has_version_control);
        snapshot.sampled = is_large_repo;
        snapshot.is_large_repo = is_large_repo;
        snapshot.truncated = truncated;
        snapshot.stats = stats;
        snapshot.diagnostics = diagnostics;
        Ok(snapshot)
    }

    fn build_walker(&self, root: &Path, pruned: Arc<AtomicUsize>) -> WalkDir {
        let parallelism = match self.config.threads {
            0 => Parallelism::RayonDefaultPool {
                busy_timeout: Duration::from_millis(100),
            },
            n => Parallelism::RayonNewPool(n),
        };

        let rules = self.rules.clone();
        WalkDir::new(root)
            .parallelism(parallelism)
            .skip_hidden(false)
            .follow_links(self.config.follow_symlinks)
            .sort(true)
            .process_read_dir(move |_depth, _path, _state, children| {
                children.retain(|child| match child {
                    Ok(entry) if entry.file_type.is_dir() => {
                        let ignored = rules.is_ignored_dir(&entry.file_name.to_string_lossy());
                        if ignored {
                            pruned.fetch_add(1, Ordering::Relaxed);
                        }
                        !ignored
                    }
                    _ => true,
                });
            })
    }
}

/// Whether `root` is inside a git work tree, searching parent directories.
#[cfg(feature = "git")]
fn inside_work_tree(root: &Path) -> bool {
    git2::Repository::discover(root).is_ok_and(|repo| !repo.is_bare())
}

#[cfg(not(feature = "git"))]
fn inside_work_tree(root: &Path) -> bool {
    root.ancestors().any(|dir| dir.join(".git").exists())
}

fn relative<'a>(root: &Path, path: &'a Path) -> &'a Path {
    path.strip_prefix(root).unwrap_or(path)
}
