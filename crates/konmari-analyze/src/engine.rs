//! The analysis engine: walk, detect, classify, assemble.

use std::path::Path;
use std::time::{Instant, SystemTime};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use konmari_core::{
    AnalysisConfig, AnalysisOutcome, AnalysisReport, Categories, Category, Cleanliness, Diagnostic,
    EngineError, Phase, ReasonCode, RepositorySnapshot, Summary,
};
use konmari_git::{ArchaeologyOutcome, Archaeologist, VcsError, VersionControl, open_repository};
use konmari_scan::{EcosystemDetector, NameClassifier, RepoWalker};

use crate::classifier::{AnalysisContext, Classifier, ClassifierOutput};
use crate::config_files::ConfigFileClassifier;
use crate::context_heavy::ContextHeavyScanner;
use crate::dead_files::DeadFileClassifier;
use crate::dependencies::DependencyClassifier;
use crate::docs::DocLinkClassifier;
use crate::legacy::LegacyClassifier;
use crate::manifest::ManifestIndex;

/// Opens a version-control backend for a repository root.
pub type VcsOpener =
    Box<dyn Fn(&Path) -> Result<Box<dyn VersionControl>, VcsError> + Send + Sync>;

/// Runs every pass over a repository and assembles the report.
///
/// An engine compiles its pattern tables once and can analyze any number of
/// repositories. Runs share nothing mutable.
pub struct Engine {
    config: AnalysisConfig,
    walker: RepoWalker,
    names: NameClassifier,
    detector: EcosystemDetector,
    dead_files: DeadFileClassifier,
    dependencies: DependencyClassifier,
    docs: DocLinkClassifier,
    config_files: ConfigFileClassifier,
    legacy: LegacyClassifier,
    context_heavy: ContextHeavyScanner,
    archaeologist: Archaeologist,
    opener: VcsOpener,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn check_deadline(deadline: Option<Instant>, phase: Phase) -> Result<(), EngineError> {
    match deadline {
        Some(deadline) if Instant::now() >= deadline => {
            Err(EngineError::DeadlineExceeded { phase })
        }
        _ => Ok(()),
    }
}

impl Engine {
    /// Validate the configuration and compile every pattern table.
    pub fn new(config: AnalysisConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let patterns = &config.patterns;
        let scoring = &config.scoring;

        Ok(Self {
            walker: RepoWalker::new(config.walk.clone())?,
            names: NameClassifier::compile(patterns)?,
            detector: EcosystemDetector::new(),
            dead_files: DeadFileClassifier::new(patterns, scoring.clone())?,
            dependencies: DependencyClassifier::new(scoring.clone())?,
            docs: DocLinkClassifier::new(scoring.documentation_confidence)?,
            config_files: ConfigFileClassifier::new(patterns, scoring.clone())?,
            legacy: LegacyClassifier::new(patterns, scoring.clone())?,
            context_heavy: ContextHeavyScanner::new(config.context.clone()),
            archaeologist: Archaeologist::new(patterns, config.git.clone())?,
            opener: Box::new(open_repository),
            config,
        })
    }

    /// Replace the version-control backend factory.
    pub fn with_vcs_opener<F>(mut self, opener: F) -> Self
    where
        F: Fn(&Path) -> Result<Box<dyn VersionControl>, VcsError> + Send + Sync + 'static,
    {
        self.opener = Box::new(opener);
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze the repository at `root`.
    pub fn analyze(&self, root: &Path) -> Result<AnalysisReport, EngineError> {
        self.run(root, None)
    }

    /// Analyze `root`, failing with [`EngineError::DeadlineExceeded`] if
    /// any phase ends after `deadline`.
    pub fn analyze_until(&self, root: &Path, deadline: Instant) -> Result<AnalysisReport, EngineError> {
        self.run(root, Some(deadline))
    }

    /// Analyze `root` and wrap the result for serialization.
    pub fn outcome(&self, root: &Path) -> AnalysisOutcome {
        AnalysisOutcome::from(self.analyze(root))
    }

    fn archaeology(&self, snapshot: &RepositorySnapshot, now: DateTime<Utc>) -> ArchaeologyOutcome {
        if !self.config.git.enabled {
            return ArchaeologyOutcome::skipped(ReasonCode::Disabled);
        }
        if !snapshot.has_version_control {
            return ArchaeologyOutcome::skipped(ReasonCode::NoVersionControl);
        }
        match (self.opener)(&snapshot.root) {
            Ok(vcs) => self.archaeologist.run(vcs.as_ref(), now),
            Err(err) => {
                debug!(error = %err, "version control unavailable");
                ArchaeologyOutcome::unavailable(&err)
            }
        }
    }

    fn run(&self, root: &Path, deadline: Option<Instant>) -> Result<AnalysisReport, EngineError> {
        let started = Instant::now();
        let now = SystemTime::now();
        let analyzed_at = DateTime::<Utc>::from(now);

        let snapshot = self.walker.walk_until(root, &self.names, deadline)?;
        check_deadline(deadline, Phase::Walk)?;

        let detection = self.detector.detect(&snapshot);
        let manifests = ManifestIndex::load(&snapshot, &detection.ecosystems);
        check_deadline(deadline, Phase::EcosystemDetection)?;

        let ctx = AnalysisContext {
            snapshot: &snapshot,
            ecosystems: &detection.ecosystems,
            manifests: &manifests,
            now,
        };

        let (
            ((dead_files, dependencies), context_heavy),
            ((documentation, configuration), (legacy, archaeology)),
        ) = rayon::join(
            || {
                rayon::join(
                    || {
                        rayon::join(
                            || self.dead_files.classify(&ctx),
                            || self.dependencies.classify(&ctx),
                        )
                    },
                    || self.context_heavy.scan(&snapshot),
                )
            },
            || {
                rayon::join(
                    || rayon::join(|| self.docs.classify(&ctx), || self.config_files.classify(&ctx)),
                    || rayon::join(|| self.legacy.classify(&ctx), || self.archaeology(&snapshot, analyzed_at)),
                )
            },
        );
        check_deadline(deadline, Phase::Classification)?;

        let mut diagnostics = Vec::new();
        let mut collect = |diags: Vec<Diagnostic>| {
            for diag in diags {
                if !diagnostics.contains(&diag) {
                    diagnostics.push(diag);
                }
            }
        };
        collect(snapshot.diagnostics.clone());
        collect(detection.diagnostics);
        collect(manifests.diagnostics());

        let partial = snapshot.is_partial();
        let mut finish = |output: ClassifierOutput, category: Category| {
            let (report, diags) = output.into_report(category, partial);
            collect(diags);
            report
        };
        let categories = Categories {
            dead_files: finish(dead_files, self.dead_files.category()),
            dependencies: finish(dependencies, self.dependencies.category()),
            documentation: finish(documentation, self.docs.category()),
            configuration: finish(configuration, self.config_files.category()),
            legacy: finish(legacy, self.legacy.category()),
        };
        collect(archaeology.diagnostics);
        let (context_heavy_files, context_diagnostics) = context_heavy;
        collect(context_diagnostics);

        let mut summary = Summary::from_categories(&categories);
        summary.context_heavy_count = context_heavy_files.len();
        let cleanliness = Cleanliness::from_categories(&categories);
        check_deadline(deadline, Phase::Assembly)?;

        info!(
            root = %snapshot.root.display(),
            files = snapshot.file_count(),
            findings = summary.total_findings,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "analysis complete"
        );

        Ok(AnalysisReport {
            repo_path: snapshot.root.clone(),
            analyzed_at,
            file_count: snapshot.file_count(),
            discovered_file_count: snapshot.stats.total_discovered,
            is_large_repo: snapshot.is_large_repo,
            has_git: snapshot.has_version_control,
            sampled: snapshot.sampled,
            monorepo: detection.monorepo,
            ecosystems: detection.ecosystems,
            categories,
            git_archaeology: archaeology.report,
            archaeology_status: archaeology.status,
            context_heavy_files,
            summary,
            cleanliness,
            diagnostics,
        })
    }
}
