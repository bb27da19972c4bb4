//! In-memory version-control backend.

use crate::backend::{BranchInfo, CommitInfo, CommitLog, CommitWindow, VcsError, VersionControl};

/// A fixed history, for callers that already hold commit data and for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    commits: Vec<CommitInfo>,
    branches: Vec<BranchInfo>,
    failure: Option<VcsError>,
}

impl MemoryBackend {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a commit.
    pub fn with_commit(mut self, commit: CommitInfo) -> Self {
        self.commits.push(commit);
        self
    }

    /// Add a branch.
    pub fn with_branch(mut self, branch: BranchInfo) -> Self {
        self.branches.push(branch);
        self
    }

    /// Make every call fail with `error`.
    pub fn failing(mut self, error: VcsError) -> Self {
        self.failure = Some(error);
        self
    }
}

impl VersionControl for MemoryBackend {
    fn list_commits(&self, window: &CommitWindow) -> Result<CommitLog, VcsError> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        let mut commits: Vec<_> = self
            .commits
            .iter()
            .filter(|c| window.contains(c.time))
            .cloned()
            .collect();
        commits.sort_by(|a, b| b.time.cmp(&a.time).then_with(|| a.id.cmp(&b.id)));
        Ok(CommitLog {
            commits,
            truncated: false,
        })
    }

    fn list_branches(&self) -> Result<Vec<BranchInfo>, VcsError> {
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(self.branches.clone()),
        }
    }
}
