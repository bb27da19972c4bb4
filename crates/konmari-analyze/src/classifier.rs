//! The seam shared by the five category classifiers.

use std::time::SystemTime;

use konmari_core::{
    Category, CategoryReport, Diagnostic, EcosystemSet, Finding, PassStatus, RepositorySnapshot,
    Signal,
};

use crate::manifest::ManifestIndex;

/// Read-only inputs every classifier sees.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisContext<'a> {
    pub snapshot: &'a RepositorySnapshot,
    pub ecosystems: &'a EcosystemSet,
    pub manifests: &'a ManifestIndex,
    /// Reference time for ages.
    pub now: SystemTime,
}

/// Findings of one classifier run.
#[derive(Debug, Clone)]
pub struct ClassifierOutput {
    pub findings: Vec<Finding>,
    pub status: PassStatus,
    pub diagnostics: Vec<Diagnostic>,
}

impl ClassifierOutput {
    /// Create an output without diagnostics.
    pub fn new(findings: Vec<Finding>, status: PassStatus) -> Self {
        Self {
            findings,
            status,
            diagnostics: Vec::new(),
        }
    }

    /// Attach diagnostics.
    pub fn with_diagnostics(mut self, diagnostics: Vec<Diagnostic>) -> Self {
        self.diagnostics.extend(diagnostics);
        self
    }

    /// Build the category report.
    ///
    /// Findings are ordered by confidence, highest first, then by target.
    /// When `partial` is set every finding is tagged `partial_scan`.
    pub fn into_report(self, category: Category, partial: bool) -> (CategoryReport, Vec<Diagnostic>) {
        let mut findings = self.findings;
        if partial {
            for finding in &mut findings {
                if !finding.has_signal(Signal::PartialScan) {
                    finding.signals.push(Signal::PartialScan);
                }
            }
        }
        findings.sort_by(|a, b| {
            b.confidence
                .cmp(&a.confidence)
                .then_with(|| a.target.cmp(&b.target))
                .then_with(|| a.reason.cmp(&b.reason))
        });
        (CategoryReport::new(category, findings, self.status), self.diagnostics)
    }
}

/// A pure function from the analysis context to one category's findings.
pub trait Classifier: Sync {
    /// Category this classifier fills.
    fn category(&self) -> Category;

    /// Classify the snapshot.
    fn classify(&self, ctx: &AnalysisContext<'_>) -> ClassifierOutput;
}
