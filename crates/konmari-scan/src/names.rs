//! File-name classification against stale and session-artifact patterns.

use konmari_core::{EngineError, PatternSet, PatternTables};

/// Which table a file name matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameMatchKind {
    /// A known AI-session artifact (also counts as a stale pattern).
    SessionArtifact,
    /// A backup/temp/copy/scratch naming pattern.
    StalePattern,
}

/// A successful name classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameMatch<'a> {
    pub kind: NameMatchKind,
    /// Source of the pattern that matched.
    pub pattern: &'a str,
}

/// Compiled stale-name and session-artifact tables.
#[derive(Debug, Clone)]
pub struct NameClassifier {
    stale: PatternSet,
    session: PatternSet,
}

impl NameClassifier {
    /// Compile the name tables.
    pub fn compile(tables: &PatternTables) -> Result<Self, EngineError> {
        Ok(Self {
            stale: PatternSet::compile("patterns.stale_names", &tables.stale_names)?,
            session: PatternSet::compile("patterns.session_artifacts", &tables.session_artifacts)?,
        })
    }

    /// Classify a bare file name. Session artifacts take precedence.
    pub fn classify(&self, name: &str) -> Option<NameMatch<'_>> {
        if let Some(pattern) = self.session.first_match(name) {
            return Some(NameMatch {
                kind: NameMatchKind::SessionArtifact,
                pattern,
            });
        }
        self.stale.first_match(name).map(|pattern| NameMatch {
            kind: NameMatchKind::StalePattern,
            pattern,
        })
    }

    /// Check whether a name matches either table.
    pub fn is_match(&self, name: &str) -> bool {
        self.session.is_match(name) || self.stale.is_match(name)
    }
}
