//! Dead-file classification: stale names, duplicates and age.

use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use konmari_core::{
    Category, EngineError, FileRecord, Finding, PatternTables, ScoringConfig, Signal, display_path,
};
use konmari_scan::{NameClassifier, NameMatch, NameMatchKind};

use crate::age::{age_signal, format_age, recency_signal};
use crate::classifier::{AnalysisContext, Classifier, ClassifierOutput};
use crate::duplicates::{DuplicateDetector, DuplicateGroup};
use crate::scoring::ScoreCard;

/// Flags backup, temp, scratch and duplicate files.
#[derive(Debug, Clone)]
pub struct DeadFileClassifier {
    names: NameClassifier,
    duplicates: DuplicateDetector,
    scoring: ScoringConfig,
}

impl DeadFileClassifier {
    /// Compile the name and duplicate tables.
    pub fn new(tables: &PatternTables, scoring: ScoringConfig) -> Result<Self, EngineError> {
        Ok(Self {
            names: NameClassifier::compile(tables)?,
            duplicates: DuplicateDetector::new(&tables.duplicate_suffixes)?,
            scoring,
        })
    }

    /// Score one file. Returns `None` when it is not a candidate or
    /// falls below the floor.
    fn evaluate(
        &self,
        record: &FileRecord,
        name_match: Option<NameMatch<'_>>,
        group: Option<&DuplicateGroup>,
        age_days: u64,
    ) -> Option<Finding> {
        if name_match.is_none() && group.is_none() {
            return None;
        }

        let mut signals = Vec::new();
        let mut reasons = Vec::new();

        if let Some(found) = name_match {
            signals.push(Signal::StalePattern);
            match found.kind {
                NameMatchKind::SessionArtifact => {
                    signals.push(Signal::SessionArtifact);
                    reasons.push(format!("known session artifact name `{}`", found.pattern));
                }
                NameMatchKind::StalePattern => {
                    reasons.push(format!("matches stale name pattern `{}`", found.pattern));
                }
            }
        }

        if let Some(group) = group {
            signals.push(Signal::Duplicate);
            if group.is_pair() {
                signals.push(Signal::DuplicatePair);
            }
            reasons.push(format!(
                "probable duplicate of {} ({} similar names)",
                display_path(&group.keep),
                group.count()
            ));
        }

        signals.extend(age_signal(age_days));
        signals.extend(recency_signal(age_days));
        reasons.push(format!("last modified {}", age_phrase(age_days)));

        let card = ScoreCard::new(self.scoring.dead_file_base, &self.scoring.dead_file_rules);
        let confidence = card.score(&signals);

        // Name matches always surface; recent edits only lower their score.
        if name_match.is_none() && confidence.value() < self.scoring.dead_file_floor {
            return None;
        }

        Some(Finding::new(
            record.display_path(),
            Category::DeadFiles,
            confidence,
            signals,
            reasons.join("; "),
        ))
    }
}

fn age_phrase(age_days: u64) -> String {
    match age_days {
        0 => "today".to_string(),
        d => format!("{} ago", format_age(d)),
    }
}

impl Classifier for DeadFileClassifier {
    fn category(&self) -> Category {
        Category::DeadFiles
    }

    fn classify(&self, ctx: &AnalysisContext<'_>) -> ClassifierOutput {
        let snapshot = ctx.snapshot;
        let groups = self.duplicates.find_groups(&snapshot.files);

        let mut flagged: HashMap<&Path, &DuplicateGroup> = HashMap::new();
        for group in &groups {
            for path in group.duplicates() {
                flagged.insert(path.as_path(), group);
            }
        }

        let findings: Vec<Finding> = snapshot
            .files
            .iter()
            .filter_map(|record| {
                let name_match = self.names.classify(&record.name);
                let group = flagged.get(record.path.as_path()).copied();
                self.evaluate(record, name_match, group, record.age_days(ctx.now))
            })
            .collect();

        debug!(
            findings = findings.len(),
            duplicate_groups = groups.len(),
            "dead-file classification complete"
        );
        ClassifierOutput::new(findings, snapshot.coverage_status())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::SystemTime;

    use super::*;

    fn classifier() -> DeadFileClassifier {
        DeadFileClassifier::new(&PatternTables::default(), ScoringConfig::default()).unwrap()
    }

    fn record(path: &str) -> FileRecord {
        FileRecord::new(path, 1, SystemTime::now())
    }

    fn evaluate(path: &str, age_days: u64) -> Option<Finding> {
        let c = classifier();
        let rec = record(path);
        let found = c.names.classify(&rec.name);
        c.evaluate(&rec, found, None, age_days)
    }

    #[test]
    fn test_old_backup_is_quick_win() {
        let finding = evaluate("old_utils_backup.py", 180).unwrap();
        assert_eq!(finding.confidence.value(), 80);
        assert!(finding.has_signal(Signal::StalePattern));
        assert!(finding.has_signal(Signal::AgeOver90));
    }

    #[test]
    fn test_recent_pattern_file_still_surfaces() {
        let finding = evaluate("temp_debug.js", 5).unwrap();
        assert_eq!(finding.confidence.value(), 35);
        assert!(finding.has_signal(Signal::ModifiedWithin14Days));
    }

    #[test]
    fn test_session_artifact_scores_both_signals() {
        let finding = evaluate("PLAN.md", 200).unwrap();
        assert_eq!(finding.confidence.value(), 100);
        assert!(finding.has_signal(Signal::SessionArtifact));
    }

    #[test]
    fn test_age_alone_is_not_a_candidate() {
        assert!(evaluate("src/main.rs", 1000).is_none());
    }

    #[test]
    fn test_recent_files_stay_under_ceiling() {
        let c = classifier();
        let rec = record("PLAN.md");
        let group = DuplicateGroup {
            key: crate::duplicates::DuplicateKey {
                stem: "plan".into(),
                extension: "md".into(),
            },
            keep: PathBuf::from("docs/PLAN.md"),
            members: vec![
                PathBuf::from("PLAN.md"),
                PathBuf::from("docs/PLAN.md"),
                PathBuf::from("x/plan_old.md"),
            ],
        };
        for age in 0..14 {
            let found = c.names.classify(&rec.name);
            let finding = c.evaluate(&rec, found, Some(&group), age).unwrap();
            assert!(finding.confidence.value() <= 65, "age {age}");
        }
    }

    #[test]
    fn test_floor_drops_weak_duplicates() {
        let c = classifier();
        let rec = record("helpers_draft.txt");
        let pair = DuplicateGroup {
            key: crate::duplicates::DuplicateKey {
                stem: "helpers".into(),
                extension: "txt".into(),
            },
            keep: PathBuf::from("helpers.txt"),
            members: vec![PathBuf::from("helpers.txt"), PathBuf::from("helpers_draft.txt")],
        };
        // 50 + 15 - 10 - 20 = 35, below the floor.
        assert!(c.evaluate(&rec, None, Some(&pair), 20).is_none());
        // 50 + 15 - 10 + 15 = 70.
        let finding = c.evaluate(&rec, None, Some(&pair), 400).unwrap();
        assert_eq!(finding.confidence.value(), 70);
        assert!(finding.has_signal(Signal::DuplicatePair));
    }
}
