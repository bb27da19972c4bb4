//! The analysis report: the engine's single output artifact.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ecosystem::{EcosystemSet, MonorepoInfo};
use crate::error::{Diagnostic, EngineError, ErrorKind};
use crate::finding::{
    Category, CategoryReport, Confidence, ConfidenceBand, Finding, PassStatus,
};

/// The five category reports in their fixed order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Categories {
    #[serde(rename = "1_dead_files")]
    pub dead_files: CategoryReport,
    #[serde(rename = "2_dependencies")]
    pub dependencies: CategoryReport,
    #[serde(rename = "3_documentation")]
    pub documentation: CategoryReport,
    #[serde(rename = "4_configuration")]
    pub configuration: CategoryReport,
    #[serde(rename = "5_legacy")]
    pub legacy: CategoryReport,
}

impl Categories {
    /// Iterate the category reports in order.
    pub fn iter(&self) -> impl Iterator<Item = &CategoryReport> {
        [
            &self.dead_files,
            &self.dependencies,
            &self.documentation,
            &self.configuration,
            &self.legacy,
        ]
        .into_iter()
    }

    /// Get the report for a category.
    pub fn get(&self, category: Category) -> &CategoryReport {
        match category {
            Category::DeadFiles => &self.dead_files,
            Category::Dependencies => &self.dependencies,
            Category::Documentation => &self.documentation,
            Category::Configuration => &self.configuration,
            Category::Legacy => &self.legacy,
        }
    }

    /// Total number of findings across categories.
    pub fn total_findings(&self) -> usize {
        self.iter().map(|c| c.count).sum()
    }
}

/// An automation-authored commit kept as an example.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitSample {
    /// Abbreviated commit id.
    pub id: String,
    /// Commit subject, truncated.
    pub summary: String,
    pub author: String,
    pub date: DateTime<Utc>,
}

/// A branch whose name matches a throwaway pattern. Informational only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaleBranch {
    /// Branch name with any remote prefix removed.
    pub name: String,
    /// The pattern that matched.
    pub pattern: String,
    /// Seen only as a remote-tracking branch.
    pub remote: bool,
    /// Days since the branch tip was committed, when known.
    pub last_commit_age_days: Option<i64>,
}

/// Git-history mining results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitArchaeologyReport {
    pub window_days: u32,
    /// Commits inside the window.
    pub total_commits: usize,
    /// Commits whose message or trailer carries an automation signature.
    pub ai_commit_count: usize,
    /// `ai_commit_count / total_commits`, 0 when the window is empty.
    pub ai_commit_ratio: f64,
    /// Unsigned commits whose subject matches two or more machine-like styles.
    pub style_flagged_commit_count: usize,
    /// A few automation-authored commits, newest first.
    pub ai_commits: Vec<CommitSample>,
    pub stale_branches: Vec<StaleBranch>,
}

/// What to do about a context-heavy document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextAdvice {
    ConsiderSplitting,
    Monitor,
}

/// A large text document that costs a lot of context when loaded whole.
///
/// These are recommendations, never deletion candidates, so they live
/// outside the five categories and do not affect cleanliness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextHeavyFile {
    pub path: String,
    pub lines: usize,
    /// Characters divided by four.
    pub estimated_tokens: usize,
    pub exceeds_lines: bool,
    pub exceeds_tokens: bool,
    pub recommendation: ContextAdvice,
    pub confidence: Confidence,
}

/// Findings split by presentation band.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Summary {
    /// Findings at or above 80, from every category but legacy.
    pub quick_wins: Vec<Finding>,
    /// Findings from 50 to 79, from every category.
    pub decisions_needed: Vec<Finding>,
    /// Findings below 50.
    pub contemplate_count: usize,
    pub total_findings: usize,
    /// Documents in the context-heavy report.
    pub context_heavy_count: usize,
}

impl Summary {
    /// Split the findings of every category by band.
    pub fn from_categories(categories: &Categories) -> Self {
        let mut summary = Summary::default();
        for report in categories.iter() {
            for finding in &report.items {
                match finding.band() {
                    ConfidenceBand::QuickWin if report.category.counts_toward_cleanliness() => {
                        summary.quick_wins.push(finding.clone())
                    }
                    ConfidenceBand::QuickWin | ConfidenceBand::DecisionNeeded => {
                        summary.decisions_needed.push(finding.clone())
                    }
                    ConfidenceBand::Contemplate => summary.contemplate_count += 1,
                }
                summary.total_findings += 1;
            }
        }
        summary
    }
}

/// Overall verdict on how tidy the repository is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cleanliness {
    pub is_clean: bool,
    pub nearly_clean: bool,
    /// Findings in the categories that count toward the verdict.
    pub issues_count: usize,
}

impl Cleanliness {
    /// Fewer issues than this still counts as nearly clean.
    pub const NEARLY_CLEAN_LIMIT: usize = 5;

    /// Verdict from the category reports. Legacy findings are excluded.
    pub fn from_categories(categories: &Categories) -> Self {
        let issues_count = categories
            .iter()
            .filter(|c| c.category.counts_toward_cleanliness())
            .map(|c| c.count)
            .sum();
        Self {
            is_clean: issues_count == 0,
            nearly_clean: issues_count > 0 && issues_count < Self::NEARLY_CLEAN_LIMIT,
            issues_count,
        }
    }
}

/// Complete analysis output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub repo_path: PathBuf,
    pub analyzed_at: DateTime<Utc>,
    /// Files in the (possibly sampled) snapshot.
    pub file_count: usize,
    /// Files discovered before sampling.
    pub discovered_file_count: usize,
    pub is_large_repo: bool,
    pub has_git: bool,
    pub sampled: bool,
    pub monorepo: MonorepoInfo,
    pub ecosystems: EcosystemSet,
    pub categories: Categories,
    pub git_archaeology: Option<GitArchaeologyReport>,
    pub archaeology_status: PassStatus,
    pub context_heavy_files: Vec<ContextHeavyFile>,
    pub summary: Summary,
    pub cleanliness: Cleanliness,
    pub diagnostics: Vec<Diagnostic>,
}

impl AnalysisReport {
    /// Look up the report for one category.
    pub fn category(&self, category: Category) -> &CategoryReport {
        self.categories.get(category)
    }

    /// Find a finding by category and target.
    pub fn finding(&self, category: Category, target: &str) -> Option<&Finding> {
        self.category(category)
            .items
            .iter()
            .find(|f| f.target == target)
    }
}

/// Serialized form of a fatal error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&EngineError> for ErrorReport {
    fn from(err: &EngineError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Either a complete report or a top-level error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalysisOutcome {
    Report(Box<AnalysisReport>),
    Failed { error: ErrorReport },
}

impl AnalysisOutcome {
    /// Check if the run failed.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

impl From<Result<AnalysisReport, EngineError>> for AnalysisOutcome {
    fn from(result: Result<AnalysisReport, EngineError>) -> Self {
        match result {
            Ok(report) => Self::Report(Box::new(report)),
            Err(err) => Self::Failed {
                error: ErrorReport::from(&err),
            },
        }
    }
}
