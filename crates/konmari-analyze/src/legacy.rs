//! Deprecation and removal markers left in source code.

use rayon::prelude::*;
use tracing::debug;

use konmari_core::{
    Category, Diagnostic, EngineError, FileRecord, Finding, PatternSet, PatternTables,
    ScoringConfig, Signal,
};

use crate::age::age_signal;
use crate::classifier::{AnalysisContext, Classifier, ClassifierOutput};
use crate::scoring::ScoreCard;

/// Signal for a marker pattern, judged from the pattern text.
fn marker_signal(pattern: &str) -> Signal {
    let pattern = pattern.to_ascii_lowercase();
    if pattern.contains("legacy") {
        Signal::LegacyMarker
    } else if pattern.contains("todo") || pattern.contains("fixme") {
        Signal::RemovalTodo
    } else {
        Signal::DeprecationMarker
    }
}

/// Reports marker lines. Informational only, capped below the decision band.
#[derive(Debug, Clone)]
pub struct LegacyClassifier {
    markers: PatternSet,
    scoring: ScoringConfig,
}

impl LegacyClassifier {
    pub fn new(tables: &PatternTables, scoring: ScoringConfig) -> Result<Self, EngineError> {
        Ok(Self {
            markers: PatternSet::compile("deprecation_markers", &tables.deprecation_markers)?,
            scoring,
        })
    }

    fn scan(&self, record: &FileRecord, text: &str, age_days: u64) -> Vec<Finding> {
        let card = ScoreCard::new(self.scoring.legacy_base, &self.scoring.legacy_rules);
        let path = record.display_path();

        text.lines()
            .enumerate()
            .filter_map(|(index, line)| {
                let pattern = self.markers.first_match(line)?;
                let marker = self.markers.find(line).unwrap_or(pattern).trim();

                let mut signals = vec![marker_signal(pattern)];
                signals.extend(age_signal(age_days).filter(|s| *s == Signal::AgeOver180));
                let confidence = card.score(&signals).capped(self.scoring.legacy_ceiling);

                Some(Finding::new(
                    format!("{path}:{}", index + 1),
                    Category::Legacy,
                    confidence,
                    signals,
                    format!("marker `{marker}`: {}", line.trim()),
                ))
            })
            .collect()
    }
}

impl Classifier for LegacyClassifier {
    fn category(&self) -> Category {
        Category::Legacy
    }

    fn classify(&self, ctx: &AnalysisContext<'_>) -> ClassifierOutput {
        let results: Vec<Result<Vec<Finding>, Diagnostic>> = ctx
            .snapshot
            .files
            .par_iter()
            .filter(|f| f.is_source())
            .map(|record| {
                let text = ctx
                    .snapshot
                    .read_to_string(record)
                    .map_err(|e| Diagnostic::read_error(&record.path, &e))?;
                Ok(self.scan(record, &text, record.age_days(ctx.now)))
            })
            .collect();

        let mut findings = Vec::new();
        let mut diagnostics = Vec::new();
        for result in results {
            match result {
                Ok(found) => findings.extend(found),
                Err(diag) => diagnostics.push(diag),
            }
        }

        debug!(markers = findings.len(), "legacy scan complete");
        ClassifierOutput::new(findings, ctx.snapshot.coverage_status()).with_diagnostics(diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Fixture;

    fn classifier() -> LegacyClassifier {
        LegacyClassifier::new(&PatternTables::default(), ScoringConfig::default()).unwrap()
    }

    #[test]
    fn test_marker_signals() {
        assert_eq!(marker_signal(r"@\s*deprecated"), Signal::DeprecationMarker);
        assert_eq!(marker_signal(r"(#|//|/\*|\*)\s*LEGACY[:\s]"), Signal::LegacyMarker);
        assert_eq!(marker_signal(r"(#|//)\s*TODO[:\s].*\bremove"), Signal::RemovalTodo);
    }

    #[test]
    fn test_markers_per_line() {
        let source = "\
/**
 * @deprecated use newThing instead
 */
function oldThing() {}
// TODO: remove after the v2 migration
// LEGACY: kept for the old API
const note = 'nothing to see';
";
        let fixture = Fixture::new(&[("src/old.js", source, 400), ("README.md", "@deprecated", 400)]);
        let output = fixture.run(&classifier());

        let mut targets: Vec<_> = output.findings.iter().map(|f| f.target.as_str()).collect();
        targets.sort();
        assert_eq!(targets, vec!["src/old.js:2", "src/old.js:5", "src/old.js:6"]);
        assert!(output.findings.iter().all(|f| f.confidence.value() == 40));
        assert!(output.findings.iter().all(|f| f.has_signal(Signal::AgeOver180)));
    }

    #[test]
    fn test_young_markers_score_base() {
        let fixture = Fixture::new(&[("lib.py", "# DEPRECATED: call v2\n", 5)]);
        let output = fixture.run(&classifier());
        assert_eq!(output.findings.len(), 1);
        assert_eq!(output.findings[0].confidence.value(), 30);
        assert!(output.findings[0].has_signal(Signal::DeprecationMarker));
    }

    #[test]
    fn test_ceiling_holds_with_heavier_rules() {
        let mut scoring = ScoringConfig::default();
        scoring.legacy_rules[0].weight = 50;
        let c = LegacyClassifier::new(&PatternTables::default(), scoring).unwrap();
        let fixture = Fixture::new(&[("a.go", "// TODO: remove this shim\n", 365)]);
        let output = fixture.run(&c);
        assert_eq!(output.findings[0].confidence.value(), 40);
    }
}
