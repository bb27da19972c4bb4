//! Findings, categories, signals and confidence scores.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// One of the five fixed buckets, in their mandatory order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Category {
    DeadFiles,
    Dependencies,
    Documentation,
    Configuration,
    Legacy,
}

impl Category {
    /// Report key, prefixed with the category's position.
    pub fn key(self) -> &'static str {
        match self {
            Self::DeadFiles => "1_dead_files",
            Self::Dependencies => "2_dependencies",
            Self::Documentation => "3_documentation",
            Self::Configuration => "4_configuration",
            Self::Legacy => "5_legacy",
        }
    }

    /// Display title.
    pub fn title(self) -> &'static str {
        match self {
            Self::DeadFiles => "Dead Files",
            Self::Dependencies => "Dependencies",
            Self::Documentation => "Documentation",
            Self::Configuration => "Configuration",
            Self::Legacy => "Legacy Code",
        }
    }

    /// One-line description of what the category holds.
    pub fn description(self) -> &'static str {
        match self {
            Self::DeadFiles => "Backup files, temp files, duplicates - easiest wins",
            Self::Dependencies => "Declared packages never imported by scanned sources",
            Self::Documentation => "Documents with broken relative links",
            Self::Configuration => "Config files for tools no longer declared",
            Self::Legacy => "Deprecated code needing human judgment",
        }
    }

    /// Whether findings in this category count toward the cleanliness verdict.
    pub fn counts_toward_cleanliness(self) -> bool {
        !matches!(self, Self::Legacy)
    }
}

/// A contributing signal tag on a finding.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumString,
)]
pub enum Signal {
    #[serde(rename = "stale_pattern")]
    #[strum(serialize = "stale_pattern")]
    StalePattern,
    #[serde(rename = "session_artifact")]
    #[strum(serialize = "session_artifact")]
    SessionArtifact,
    #[serde(rename = "duplicate")]
    #[strum(serialize = "duplicate")]
    Duplicate,
    /// Duplicate group of exactly two files, an ambiguous signal.
    #[serde(rename = "duplicate_pair")]
    #[strum(serialize = "duplicate_pair")]
    DuplicatePair,
    #[serde(rename = "age>180")]
    #[strum(serialize = "age>180")]
    AgeOver180,
    #[serde(rename = "age>90")]
    #[strum(serialize = "age>90")]
    AgeOver90,
    #[serde(rename = "age>60")]
    #[strum(serialize = "age>60")]
    AgeOver60,
    #[serde(rename = "modified<14d")]
    #[strum(serialize = "modified<14d")]
    ModifiedWithin14Days,
    #[serde(rename = "modified<30d")]
    #[strum(serialize = "modified<30d")]
    ModifiedWithin30Days,
    #[serde(rename = "not_imported")]
    #[strum(serialize = "not_imported")]
    NotImported,
    /// References were collected from parsed syntax trees.
    #[serde(rename = "import_scan:ast")]
    #[strum(serialize = "import_scan:ast")]
    AstImportScan,
    /// References were collected by pattern search.
    #[serde(rename = "import_scan:pattern")]
    #[strum(serialize = "import_scan:pattern")]
    PatternImportScan,
    #[serde(rename = "broken_link")]
    #[strum(serialize = "broken_link")]
    BrokenLink,
    #[serde(rename = "missing_anchor")]
    #[strum(serialize = "missing_anchor")]
    MissingAnchor,
    /// A fenced code block is labelled with a file name that does not exist.
    #[serde(rename = "missing_code_reference")]
    #[strum(serialize = "missing_code_reference")]
    MissingCodeReference,
    #[serde(rename = "tool_not_declared")]
    #[strum(serialize = "tool_not_declared")]
    ToolNotDeclared,
    #[serde(rename = "ecosystem_absent")]
    #[strum(serialize = "ecosystem_absent")]
    EcosystemAbsent,
    #[serde(rename = "deprecation_marker")]
    #[strum(serialize = "deprecation_marker")]
    DeprecationMarker,
    #[serde(rename = "legacy_marker")]
    #[strum(serialize = "legacy_marker")]
    LegacyMarker,
    #[serde(rename = "removal_todo")]
    #[strum(serialize = "removal_todo")]
    RemovalTodo,
    /// The snapshot was sampled, so the finding may be incomplete.
    #[serde(rename = "partial_scan")]
    #[strum(serialize = "partial_scan")]
    PartialScan,
}

/// Confidence score, always within 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Confidence(u8);

impl Confidence {
    /// Highest possible score.
    pub const MAX: Self = Self(100);

    /// Clamp a summed score into range.
    pub fn from_score(score: i32) -> Self {
        Self(score.clamp(0, 100) as u8)
    }

    /// The raw value.
    pub fn value(self) -> u8 {
        self.0
    }

    /// Lower this score to at most `ceiling`.
    pub fn capped(self, ceiling: u8) -> Self {
        Self(self.0.min(ceiling.min(100)))
    }

    /// Presentation band for this score.
    pub fn band(self) -> ConfidenceBand {
        ConfidenceBand::of(self)
    }
}

impl From<u8> for Confidence {
    fn from(value: u8) -> Self {
        Self(value.min(100))
    }
}

/// Presentation bands consumed by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConfidenceBand {
    /// 80 and above.
    QuickWin,
    /// 50 to 79.
    DecisionNeeded,
    /// Below 50.
    Contemplate,
}

impl ConfidenceBand {
    /// Lowest score of the quick-win band.
    pub const QUICK_WIN_MIN: u8 = 80;
    /// Lowest score of the decision-needed band.
    pub const DECISION_MIN: u8 = 50;

    /// Band for a score.
    pub fn of(confidence: Confidence) -> Self {
        match confidence.value() {
            v if v >= Self::QUICK_WIN_MIN => Self::QuickWin,
            v if v >= Self::DECISION_MIN => Self::DecisionNeeded,
            _ => Self::Contemplate,
        }
    }
}

/// One proposed item with its score and supporting signals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// File path (relative, `/`-separated) or dependency name.
    pub target: String,
    pub category: Category,
    pub confidence: Confidence,
    pub signals: Vec<Signal>,
    pub reason: String,
}

impl Finding {
    /// Create a new finding.
    pub fn new(
        target: impl Into<String>,
        category: Category,
        confidence: Confidence,
        signals: Vec<Signal>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            target: target.into(),
            category,
            confidence,
            signals,
            reason: reason.into(),
        }
    }

    /// Presentation band of this finding.
    pub fn band(&self) -> ConfidenceBand {
        self.confidence.band()
    }

    /// Whether the finding carries a given signal.
    pub fn has_signal(&self, signal: Signal) -> bool {
        self.signals.contains(&signal)
    }
}

/// Why a pass did not run to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReasonCode {
    /// Only a representative subset of files was scanned.
    Sampled,
    /// The walk stopped at its time limit.
    WalkTimeout,
    /// At least one manifest could not be parsed.
    ManifestParseError,
    /// No version-control metadata at the root.
    NoVersionControl,
    /// The history pass hit its time limit.
    ArchaeologyTimeout,
    /// The version-control backend failed.
    BackendError,
    /// Disabled by configuration.
    Disabled,
}

/// Completion state of a category or of the archaeology pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PassStatus {
    Complete,
    Partial { reason: ReasonCode },
    Skipped { reason: ReasonCode },
}

impl PassStatus {
    /// Whether the pass ran to completion.
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }

    /// Combine two statuses, keeping the less complete one.
    pub fn degrade(self, other: PassStatus) -> PassStatus {
        match (self, other) {
            (Self::Skipped { .. }, _) => self,
            (_, Self::Skipped { .. }) => other,
            (Self::Partial { .. }, _) => self,
            (_, Self::Partial { .. }) => other,
            _ => Self::Complete,
        }
    }
}

/// Findings of one category plus their count and completion state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryReport {
    pub category: Category,
    pub name: String,
    pub description: String,
    pub status: PassStatus,
    pub items: Vec<Finding>,
    pub count: usize,
}

impl CategoryReport {
    /// Build a report for `category` from its findings.
    pub fn new(category: Category, items: Vec<Finding>, status: PassStatus) -> Self {
        Self {
            category,
            name: category.title().to_string(),
            description: category.description().to_string(),
            status,
            count: items.len(),
            items,
        }
    }

    /// An empty, skipped report.
    pub fn skipped(category: Category, reason: ReasonCode) -> Self {
        Self::new(category, Vec::new(), PassStatus::Skipped { reason })
    }

    /// Check if the category has any findings.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_clamps() {
        assert_eq!(Confidence::from_score(-40).value(), 0);
        assert_eq!(Confidence::from_score(145).value(), 100);
        assert_eq!(Confidence::from_score(55).value(), 55);
        assert_eq!(Confidence::from(200).value(), 100);
    }

    #[test]
    fn test_confidence_bands() {
        assert_eq!(Confidence::from(80).band(), ConfidenceBand::QuickWin);
        assert_eq!(Confidence::from(79).band(), ConfidenceBand::DecisionNeeded);
        assert_eq!(Confidence::from(50).band(), ConfidenceBand::DecisionNeeded);
        assert_eq!(Confidence::from(49).band(), ConfidenceBand::Contemplate);
    }

    #[test]
    fn test_signal_tags() {
        assert_eq!(Signal::AgeOver180.to_string(), "age>180");
        assert_eq!(
            serde_json::to_string(&Signal::AstImportScan).unwrap(),
            "\"import_scan:ast\""
        );
        assert_eq!("duplicate".parse::<Signal>().ok(), Some(Signal::Duplicate));
    }

    #[test]
    fn test_category_order() {
        use strum::IntoEnumIterator;
        let keys: Vec<_> = Category::iter().map(Category::key).collect();
        assert_eq!(
            keys,
            vec![
                "1_dead_files",
                "2_dependencies",
                "3_documentation",
                "4_configuration",
                "5_legacy"
            ]
        );
    }

    #[test]
    fn test_status_degrade() {
        let partial = PassStatus::Partial {
            reason: ReasonCode::Sampled,
        };
        assert_eq!(PassStatus::Complete.degrade(partial), partial);
        assert_eq!(partial.degrade(PassStatus::Complete), partial);
        assert!(PassStatus::Complete.degrade(PassStatus::Complete).is_complete());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_value(PassStatus::Skipped {
            reason: ReasonCode::NoVersionControl,
        })
        .unwrap();
        assert_eq!(json["state"], "skipped");
        assert_eq!(json["reason"], "no_version_control");
    }
}
