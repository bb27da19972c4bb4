//! libgit2-backed history reader.

use std::path::Path;
use std::time::Instant;

use chrono::{DateTime, Utc};
use git2::{BranchType, Repository, Sort};
use tracing::debug;

use crate::backend::{BranchInfo, CommitInfo, CommitLog, CommitWindow, VcsError, VersionControl};

impl From<git2::Error> for VcsError {
    fn from(err: git2::Error) -> Self {
        VcsError::backend(err.message())
    }
}

fn to_utc(time: git2::Time) -> DateTime<Utc> {
    DateTime::from_timestamp(time.seconds(), 0).unwrap_or_default()
}

/// Reads history through libgit2, without shelling out.
pub struct Git2Backend {
    repo: Repository,
}

impl Git2Backend {
    /// Open the repository containing `path`, searching parent directories.
    pub fn open(path: &Path) -> Result<Self, VcsError> {
        let repo = Repository::discover(path).map_err(|e| VcsError::Unavailable {
            path: path.to_path_buf(),
            reason: e.message().to_string(),
        })?;
        Ok(Self { repo })
    }
}

impl VersionControl for Git2Backend {
    fn list_commits(&self, window: &CommitWindow) -> Result<CommitLog, VcsError> {
        let start = Instant::now();
        let mut revwalk = self.repo.revwalk()?;

        // An unborn HEAD has no history to read.
        if revwalk.push_head().is_err() {
            debug!("no HEAD commit, empty history");
            return Ok(CommitLog::default());
        }
        revwalk.set_sorting(Sort::TIME)?;

        let mut log = CommitLog::default();
        for oid in revwalk {
            if window.expired() {
                if log.commits.is_empty() {
                    return Err(VcsError::Timeout {
                        elapsed: start.elapsed(),
                    });
                }
                log.truncated = true;
                break;
            }

            let commit = self.repo.find_commit(oid?)?;
            let time = to_utc(commit.time());
            if !window.contains(time) {
                break;
            }

            let author = commit.author();
            log.commits.push(CommitInfo::new(
                commit.id().to_string(),
                String::from_utf8_lossy(commit.message_bytes()),
                author.name().unwrap_or("unknown"),
                time,
            ));
        }

        debug!(
            commits = log.commits.len(),
            truncated = log.truncated,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "read commit window"
        );
        Ok(log)
    }

    fn list_branches(&self) -> Result<Vec<BranchInfo>, VcsError> {
        let mut branches = Vec::new();
        for entry in self.repo.branches(None)? {
            let (branch, kind) = entry?;
            let Some(name) = branch.name()?.map(str::to_string) else {
                continue;
            };
            if name.ends_with("/HEAD") {
                continue;
            }
            let last_commit = branch
                .get()
                .peel_to_commit()
                .ok()
                .map(|c| to_utc(c.time()));

            branches.push(match kind {
                BranchType::Local => BranchInfo::local(name, last_commit),
                BranchType::Remote => BranchInfo::remote(name, last_commit),
            });
        }
        Ok(branches)
    }
}
