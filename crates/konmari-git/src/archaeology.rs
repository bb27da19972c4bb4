//! Commit-signature mining and throwaway-branch detection.

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use konmari_core::{
    CommitSample, Diagnostic, DiagnosticKind, EngineError, GitArchaeologyReport, GitConfig,
    PassStatus, PatternSet, PatternTables, ReasonCode, StaleBranch,
};

use crate::backend::{BranchInfo, CommitInfo, CommitWindow, VcsError, VersionControl};

/// Summaries longer than this are cut in commit samples.
const SAMPLE_SUMMARY_CHARS: usize = 72;

/// Minimum stylistic matches before an unsigned commit is flagged.
const STYLE_MATCH_THRESHOLD: usize = 2;

/// Result of an archaeology pass.
#[derive(Debug, Clone)]
pub struct ArchaeologyOutcome {
    /// Absent when the pass could not read any history.
    pub report: Option<GitArchaeologyReport>,
    pub status: PassStatus,
    pub diagnostics: Vec<Diagnostic>,
}

impl ArchaeologyOutcome {
    /// An outcome for a pass that did not run.
    pub fn skipped(reason: ReasonCode) -> Self {
        Self {
            report: None,
            status: PassStatus::Skipped { reason },
            diagnostics: Vec::new(),
        }
    }

    /// An outcome for a backend that could not be opened.
    pub fn unavailable(err: &VcsError) -> Self {
        Self {
            report: None,
            status: PassStatus::Skipped {
                reason: ReasonCode::BackendError,
            },
            diagnostics: vec![vcs_diagnostic(err)],
        }
    }
}

fn vcs_diagnostic(err: &VcsError) -> Diagnostic {
    Diagnostic::new(None, err.to_string(), DiagnosticKind::VersionControl)
}

/// Mines commit history and branch names for automation traces.
#[derive(Debug, Clone)]
pub struct Archaeologist {
    signatures: PatternSet,
    styles: PatternSet,
    branches: PatternSet,
    config: GitConfig,
}

impl Archaeologist {
    /// Compile the commit and branch pattern tables.
    pub fn new(tables: &PatternTables, config: GitConfig) -> Result<Self, EngineError> {
        Ok(Self {
            signatures: PatternSet::compile(
                "patterns.automation_signatures",
                &tables.automation_signatures,
            )?,
            styles: PatternSet::compile("patterns.commit_styles", &tables.commit_styles)?,
            branches: PatternSet::compile("patterns.throwaway_branches", &tables.throwaway_branches)?,
            config,
        })
    }

    /// Get the git configuration.
    pub fn config(&self) -> &GitConfig {
        &self.config
    }

    /// Check whether a commit message carries an automation signature.
    pub fn is_automation_commit(&self, commit: &CommitInfo) -> bool {
        self.signatures.is_match(&commit.message)
    }

    /// Check whether an unsigned commit subject reads as machine-written.
    pub fn is_style_flagged(&self, commit: &CommitInfo) -> bool {
        self.styles.match_count(&commit.summary) >= STYLE_MATCH_THRESHOLD
    }

    /// Run the pass against `vcs`, measuring ages from `now`.
    pub fn run(&self, vcs: &dyn VersionControl, now: DateTime<Utc>) -> ArchaeologyOutcome {
        let window = CommitWindow::trailing(now, self.config.window_days)
            .with_deadline(Instant::now() + self.config.timeout());

        let mut status = PassStatus::Complete;
        let mut diagnostics = Vec::new();

        let commits = match vcs.list_commits(&window) {
            Ok(log) => {
                if log.truncated {
                    status = timed_out();
                    diagnostics.push(Diagnostic::new(
                        None,
                        format!("commit history read stopped after {} commits", log.commits.len()),
                        DiagnosticKind::VersionControl,
                    ));
                }
                log.commits
            }
            Err(err @ VcsError::Timeout { .. }) => {
                warn!(error = %err, "commit history timed out");
                status = timed_out();
                diagnostics.push(vcs_diagnostic(&err));
                Vec::new()
            }
            Err(err) => {
                warn!(error = %err, "could not read commit history");
                return ArchaeologyOutcome {
                    report: None,
                    status: PassStatus::Skipped {
                        reason: ReasonCode::BackendError,
                    },
                    diagnostics: vec![vcs_diagnostic(&err)],
                };
            }
        };

        let stale_branches = match vcs.list_branches() {
            Ok(branches) => self.stale_branches(&branches, now),
            Err(err) => {
                warn!(error = %err, "could not list branches");
                status = status.degrade(PassStatus::Partial {
                    reason: ReasonCode::BackendError,
                });
                diagnostics.push(vcs_diagnostic(&err));
                Vec::new()
            }
        };

        let report = self.summarize(&commits, stale_branches);
        debug!(
            total = report.total_commits,
            automation = report.ai_commit_count,
            style_flagged = report.style_flagged_commit_count,
            branches = report.stale_branches.len(),
            "archaeology complete"
        );

        ArchaeologyOutcome {
            report: Some(report),
            status,
            diagnostics,
        }
    }

    fn summarize(&self, commits: &[CommitInfo], stale_branches: Vec<StaleBranch>) -> GitArchaeologyReport {
        let mut ai_commits = Vec::new();
        let mut ai_commit_count = 0;
        let mut style_flagged_commit_count = 0;

        for commit in commits {
            if self.is_automation_commit(commit) {
                ai_commit_count += 1;
                if ai_commits.len() < self.config.max_commit_samples {
                    ai_commits.push(sample(commit));
                }
            } else if self.is_style_flagged(commit) {
                style_flagged_commit_count += 1;
            }
        }

        let ai_commit_ratio = if commits.is_empty() {
            0.0
        } else {
            ai_commit_count as f64 / commits.len() as f64
        };

        GitArchaeologyReport {
            window_days: self.config.window_days,
            total_commits: commits.len(),
            ai_commit_count,
            ai_commit_ratio,
            style_flagged_commit_count,
            ai_commits,
            stale_branches,
        }
    }

    /// Branches whose short name matches a throwaway pattern.
    ///
    /// Local and remote copies of one branch collapse into a single entry
    /// that is `remote` only when no local copy exists.
    pub fn stale_branches(&self, branches: &[BranchInfo], now: DateTime<Utc>) -> Vec<StaleBranch> {
        let mut found: BTreeMap<&str, StaleBranch> = BTreeMap::new();

        for branch in branches {
            if branch.remote && !self.config.include_remote_branches {
                continue;
            }
            let name = branch.short_name();
            let Some(pattern) = self.branches.first_match(name) else {
                continue;
            };
            let age = branch.last_commit.map(|t| (now - t).num_days().max(0));

            found
                .entry(name)
                .and_modify(|existing| {
                    existing.remote &= branch.remote;
                    existing.last_commit_age_days = match (existing.last_commit_age_days, age) {
                        (Some(a), Some(b)) => Some(a.min(b)),
                        (a, b) => a.or(b),
                    };
                })
                .or_insert_with(|| StaleBranch {
                    name: name.to_string(),
                    pattern: pattern.to_string(),
                    remote: branch.remote,
                    last_commit_age_days: age,
                });
        }

        found
            .into_values()
            .take(self.config.max_stale_branches)
            .collect()
    }
}

fn timed_out() -> PassStatus {
    PassStatus::Partial {
        reason: ReasonCode::ArchaeologyTimeout,
    }
}

fn sample(commit: &CommitInfo) -> CommitSample {
    let mut summary: String = commit.summary.chars().take(SAMPLE_SUMMARY_CHARS).collect();
    if commit.summary.chars().count() > SAMPLE_SUMMARY_CHARS {
        summary.push_str("...");
    }
    CommitSample {
        id: commit.id.chars().take(8).collect(),
        summary,
        author: commit.author.clone(),
        date: commit.time,
    }
}
