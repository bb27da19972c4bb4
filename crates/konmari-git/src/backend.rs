//! The version-control capability interface.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors raised by a version-control backend.
///
/// None of these are fatal to an analysis run: the archaeology pass is
/// skipped or reported as partial instead.
#[derive(Debug, Clone, Error)]
pub enum VcsError {
    /// No repository metadata, or no backend compiled in.
    #[error("Version control unavailable at {path}: {reason}")]
    Unavailable { path: PathBuf, reason: String },

    /// The backend did not finish before its deadline.
    #[error("Version control timed out after {elapsed:?}")]
    Timeout { elapsed: Duration },

    /// The backend failed while reading history.
    #[error("Version control error: {message}")]
    Backend { message: String },
}

impl VcsError {
    /// Create a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// The slice of history a pass is interested in.
#[derive(Debug, Clone, Copy)]
pub struct CommitWindow {
    /// Oldest commit time to include.
    pub since: DateTime<Utc>,
    /// Stop reading history at this instant.
    pub deadline: Option<Instant>,
}

impl CommitWindow {
    /// Window covering the last `days` days before `now`.
    pub fn trailing(now: DateTime<Utc>, days: u32) -> Self {
        Self {
            since: now - chrono::Duration::days(i64::from(days)),
            deadline: None,
        }
    }

    /// Set a deadline for reading history.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Check whether a commit time falls in the window.
    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        time >= self.since
    }

    /// Check whether the deadline has passed.
    pub fn expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// One commit as seen by the archaeology pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub id: String,
    /// First line of the message.
    pub summary: String,
    /// Full message including trailers.
    pub message: String,
    pub author: String,
    pub time: DateTime<Utc>,
}

impl CommitInfo {
    /// Create a commit, taking the summary from the first message line.
    pub fn new(
        id: impl Into<String>,
        message: impl Into<String>,
        author: impl Into<String>,
        time: DateTime<Utc>,
    ) -> Self {
        let message = message.into();
        let summary = message.lines().next().unwrap_or_default().trim().to_string();
        Self {
            id: id.into(),
            summary,
            message,
            author: author.into(),
            time,
        }
    }
}

/// Commits read from a window, newest first.
#[derive(Debug, Clone, Default)]
pub struct CommitLog {
    pub commits: Vec<CommitInfo>,
    /// Reading stopped at the deadline before the window was exhausted.
    pub truncated: bool,
}

/// A local or remote-tracking branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchInfo {
    /// Short name, including the remote prefix for remote branches.
    pub name: String,
    pub remote: bool,
    /// Commit time of the branch tip.
    pub last_commit: Option<DateTime<Utc>>,
}

impl BranchInfo {
    /// Create a local branch.
    pub fn local(name: impl Into<String>, last_commit: Option<DateTime<Utc>>) -> Self {
        Self {
            name: name.into(),
            remote: false,
            last_commit,
        }
    }

    /// Create a remote-tracking branch.
    pub fn remote(name: impl Into<String>, last_commit: Option<DateTime<Utc>>) -> Self {
        Self {
            name: name.into(),
            remote: true,
            last_commit,
        }
    }

    /// Branch name with any remote prefix removed.
    pub fn short_name(&self) -> &str {
        if self.remote {
            self.name
                .split_once('/')
                .map(|(_, rest)| rest)
                .unwrap_or(&self.name)
        } else {
            &self.name
        }
    }
}

/// Narrow read-only view of a repository's history.
pub trait VersionControl {
    /// Commits inside `window`, newest first.
    fn list_commits(&self, window: &CommitWindow) -> Result<CommitLog, VcsError>;

    /// All local and remote-tracking branches.
    fn list_branches(&self) -> Result<Vec<BranchInfo>, VcsError>;
}
