//! Analysis configuration types.
//!
//! Pattern tables and scoring rules are plain data so callers (and tests)
//! can substitute smaller sets. Every section deserializes with defaults, so
//! a TOML file only needs the keys it overrides.

use std::path::Path;
use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::finding::Signal;
use crate::record::Ecosystem;

/// Configuration for the repository walk.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
#[serde(default)]
pub struct WalkConfig {
    /// Directory names (glob syntax) that are never descended into.
    #[builder(default = "default_ignore_dirs()")]
    pub ignore_dirs: Vec<String>,

    /// Descend into directories starting with `.` (other than ignored ones).
    #[builder(default = "false")]
    pub include_hidden_dirs: bool,

    /// Follow symbolic links.
    #[builder(default = "false")]
    pub follow_symlinks: bool,

    /// File count above which the walk switches to sampling mode.
    #[builder(default = "10_000")]
    pub large_repo_threshold: usize,

    /// Maximum number of files kept in sampling mode.
    #[builder(default = "5_000")]
    pub sample_cap: usize,

    /// Number of threads for walking (0 = auto-detect).
    #[builder(default = "0")]
    pub threads: usize,

    /// Soft time limit for the walk, in seconds.
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

fn default_ignore_dirs() -> Vec<String> {
    [
        ".git",
        "node_modules",
        "venv",
        ".venv",
        "__pycache__",
        "dist",
        "build",
        "target",
        "vendor",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl WalkConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.sample_cap == Some(0) {
            return Err("Sample cap must be greater than zero".to_string());
        }
        Ok(())
    }
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            ignore_dirs: default_ignore_dirs(),
            include_hidden_dirs: false,
            follow_symlinks: false,
            large_repo_threshold: 10_000,
            sample_cap: 5_000,
            threads: 0,
            timeout_secs: None,
        }
    }
}

impl WalkConfig {
    /// Create a new walk config builder.
    pub fn builder() -> WalkConfigBuilder {
        WalkConfigBuilder::default()
    }

    /// Check if a hidden directory should be skipped.
    pub fn should_skip_hidden(&self, name: &str) -> bool {
        !self.include_hidden_dirs && name.starts_with('.') && name.len() > 1
    }

    /// Walk time limit, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// A configuration file tied to a tool that should be declared somewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFileRule {
    /// Regex matched against the file name.
    pub file_pattern: String,
    /// Tool the file configures.
    pub tool: String,
    /// Package names whose declaration means the tool is in use.
    pub packages: Vec<String>,
    /// Ecosystem whose manifests declare the tool.
    pub ecosystem: Ecosystem,
}

impl ConfigFileRule {
    fn new(file_pattern: &str, tool: &str, packages: &[&str], ecosystem: Ecosystem) -> Self {
        Self {
            file_pattern: file_pattern.to_string(),
            tool: tool.to_string(),
            packages: packages.iter().map(|p| p.to_string()).collect(),
            ecosystem,
        }
    }
}

/// Immutable pattern tables injected into the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternTables {
    /// Regexes (case-insensitive) for backup/temp/copy/scratch file names.
    pub stale_names: Vec<String>,
    /// Regexes (case-insensitive) for AI-session artifact file names.
    pub session_artifacts: Vec<String>,
    /// Suffixes stripped from file stems before duplicate grouping.
    pub duplicate_suffixes: Vec<String>,
    /// Regexes (case-insensitive) for deprecation comment markers.
    pub deprecation_markers: Vec<String>,
    /// Regexes (case-insensitive) for automation signatures in commit messages.
    pub automation_signatures: Vec<String>,
    /// Regexes (case-insensitive) for machine-like commit subject styles.
    pub commit_styles: Vec<String>,
    /// Regexes (case-insensitive) for throwaway branch names.
    pub throwaway_branches: Vec<String>,
    /// Configuration-file rules.
    pub config_files: Vec<ConfigFileRule>,
}

const CODE_EXT: &str = "(md|py|js|ts|jsx|tsx|go|rs|txt|json|yaml|yml)";
const SOURCE_EXT: &str = "(md|py|js|ts|jsx|tsx|go|rs|txt)";

fn default_stale_names() -> Vec<String> {
    let mut patterns: Vec<String> = vec![
        // Backups
        format!(r".*_old\.{CODE_EXT}$"),
        format!(r".*_backup\.{CODE_EXT}$"),
        format!(r".*_bak\.{CODE_EXT}$"),
        format!(r".*_orig\.{CODE_EXT}$"),
        format!(r".*_deprecated\.{CODE_EXT}$"),
        format!(r".*_unused\.{CODE_EXT}$"),
        // Copies and versions
        format!(r".*_v\d+\.{SOURCE_EXT}$"),
        format!(r".*_copy\d*\.{SOURCE_EXT}$"),
        format!(r".*\sCopy\.{SOURCE_EXT}$"),
        format!(r".*\s\(\d+\)\.{SOURCE_EXT}$"),
        format!(r".*_final\.{SOURCE_EXT}$"),
        format!(r".*_new\.{SOURCE_EXT}$"),
    ];
    patterns.extend(
        [
            r".*\.bak$",
            r".*\.backup$",
            r".*\.old$",
            r".*\.orig$",
            r".*\.rej$",
            r".*~$",
            r"^backup_.*",
            r"^old_.*",
            r"^copy_of_.*",
            // Temporary files
            r"^temp_.*",
            r"^tmp_.*",
            r".*\.tmp$",
            r".*\.temp$",
            r".*\.swp$",
            r".*\.swo$",
            r"^\.#.*",
            r"^#.*#$",
            r"^untitled.*",
            // Drafts and scratch notes
            r"^draft_.*",
            r"^scratch_.*",
            r"^notes_.*\.md$",
            // Throwaway scripts
            r"^debug_.*\.(py|js|ts)$",
            r"^scratch.*\.(py|js|ts)$",
            r"^experiment.*\.(py|js|ts)$",
            r"^try_.*\.(py|js|ts)$",
            r"^check_.*\.(py|js|ts)$",
            r"^verify_.*\.(py|js|ts)$",
            r"^quick_test.*\.(py|js|ts)$",
            r"^playground.*\.(py|js|ts)$",
        ]
        .into_iter()
        .map(String::from),
    );
    patterns
}

fn default_session_artifacts() -> Vec<String> {
    [
        r"^CLAUDE-CONTEXT\.md$",
        r"^PLAN\.md$",
        r"^DEBUG\.md$",
        r"^TODO-claude\.md$",
        r"^NOTES\.md$",
        r"^context\.md$",
        r"^session-notes\.md$",
        r"^AI-CONTEXT\.md$",
        r"^AI-NOTES\.md$",
        r"^TODO-ai\.md$",
        r"^IMPLEMENTATION_SUMMARY\.md$",
        r"^CHANGES_SUMMARY\.md$",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_duplicate_suffixes() -> Vec<String> {
    [
        "_old", "_backup", "_copy", "_new", "_v1", "_v2", "_v3", "_final", "_draft", "_bak",
        " copy",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_deprecation_markers() -> Vec<String> {
    [
        r"@\s*deprecated",
        r"#\[deprecated",
        r"(#|//|/\*|\*)\s*DEPRECATED[:\s]",
        r"(#|//|/\*|\*)\s*LEGACY[:\s]",
        r"(#|//)\s*TODO[:\s].*\bremove",
        r"(#|//)\s*FIXME[:\s].*\bremove",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_automation_signatures() -> Vec<String> {
    [
        r"Generated with Claude Code",
        r"Co-Authored-By:\s*Claude",
        r"Co-Authored-By:\s*GitHub Copilot",
        r"Generated with Copilot",
        r"Co-Authored-By:\s*OpenAI Codex",
        r"Generated with Codex",
        r"Co-Authored-By:\s*Cursor",
        r"Generated with Cursor",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_commit_styles() -> Vec<String> {
    [
        r"^(feat|fix|chore|docs|style|refactor|test|build|ci)(\(.+\))?:",
        r"update(d)?\s+(readme|documentation|docs)",
        r"add(ed)?\s+(new\s+)?(feature|functionality|support)",
        r"implement(ed)?\s+",
        r"refactor(ed)?\s+",
        r"clean(ed)?\s*up",
        r"fix(ed)?\s+(bug|issue|typo|error)",
        r"initial\s+commit",
        r"^wip\b",
        r"minor\s+(changes|updates|fixes)",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_throwaway_branches() -> Vec<String> {
    [
        r"^claude-",
        r"^cursor-",
        r"^copilot-",
        r"^codex-",
        r"^attempt-",
        r"^test-",
        r"^wip-",
        r"^experimental-",
        r"^try-",
        r"^debug-",
        r"^feature/wip-",
        r"^hotfix-\d{8}",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_config_files() -> Vec<ConfigFileRule> {
    use Ecosystem::{Javascript, Python};
    vec![
        ConfigFileRule::new(r"^\.babelrc(\..*)?$|^babel\.config\.(js|cjs|mjs|json)$", "babel", &["@babel/core", "babel-core"], Javascript),
        ConfigFileRule::new(r"^webpack\.config\.(js|cjs|mjs|ts)$", "webpack", &["webpack"], Javascript),
        ConfigFileRule::new(r"^rollup\.config\.(js|mjs|ts)$", "rollup", &["rollup"], Javascript),
        ConfigFileRule::new(r"^jest\.config\.(js|ts|json|mjs|cjs)$", "jest", &["jest"], Javascript),
        ConfigFileRule::new(r"^\.eslintrc.*$|^eslint\.config\.(js|mjs|cjs)$", "eslint", &["eslint"], Javascript),
        ConfigFileRule::new(r"^\.prettierrc.*$|^prettier\.config\.(js|cjs|mjs)$", "prettier", &["prettier"], Javascript),
        ConfigFileRule::new(r"^tsconfig.*\.json$", "typescript", &["typescript"], Javascript),
        ConfigFileRule::new(r"^\.pylintrc$|^pylintrc$", "pylint", &["pylint"], Python),
        ConfigFileRule::new(r"^\.flake8$", "flake8", &["flake8"], Python),
        ConfigFileRule::new(r"^mypy\.ini$|^\.mypy\.ini$", "mypy", &["mypy"], Python),
        ConfigFileRule::new(r"^setup\.cfg$", "setuptools", &["setuptools"], Python),
    ]
}

impl Default for PatternTables {
    fn default() -> Self {
        Self {
            stale_names: default_stale_names(),
            session_artifacts: default_session_artifacts(),
            duplicate_suffixes: default_duplicate_suffixes(),
            deprecation_markers: default_deprecation_markers(),
            automation_signatures: default_automation_signatures(),
            commit_styles: default_commit_styles(),
            throwaway_branches: default_throwaway_branches(),
            config_files: default_config_files(),
        }
    }
}

/// One weighted scoring rule: when `signal` fires, add `weight`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringRule {
    pub signal: Signal,
    pub weight: i32,
}

impl ScoringRule {
    /// Create a new rule.
    pub const fn new(signal: Signal, weight: i32) -> Self {
        Self { signal, weight }
    }
}

/// Base scores, rule weights and thresholds for every category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Starting score for dead-file candidates.
    pub dead_file_base: i32,
    /// Ordered dead-file rules.
    pub dead_file_rules: Vec<ScoringRule>,
    /// Candidates without a name-pattern match below this score are dropped.
    pub dead_file_floor: u8,

    pub python_dependency_base: u8,
    pub javascript_dependency_base: u8,
    pub go_dependency_base: u8,
    pub rust_dependency_base: u8,

    /// Fixed confidence for broken documentation links.
    pub documentation_confidence: u8,

    pub config_base: i32,
    pub config_rules: Vec<ScoringRule>,
    /// Config files younger than this many days are never flagged.
    pub config_min_age_days: u64,

    pub legacy_base: i32,
    pub legacy_rules: Vec<ScoringRule>,
    /// Legacy findings never score above this.
    pub legacy_ceiling: u8,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            dead_file_base: 50,
            dead_file_rules: vec![
                ScoringRule::new(Signal::StalePattern, 20),
                ScoringRule::new(Signal::SessionArtifact, 15),
                ScoringRule::new(Signal::Duplicate, 15),
                ScoringRule::new(Signal::DuplicatePair, -10),
                ScoringRule::new(Signal::AgeOver180, 15),
                ScoringRule::new(Signal::AgeOver90, 10),
                ScoringRule::new(Signal::AgeOver60, 5),
                ScoringRule::new(Signal::ModifiedWithin14Days, -35),
                ScoringRule::new(Signal::ModifiedWithin30Days, -20),
            ],
            dead_file_floor: 40,
            python_dependency_base: 65,
            javascript_dependency_base: 60,
            go_dependency_base: 65,
            rust_dependency_base: 65,
            documentation_confidence: 55,
            config_base: 55,
            config_rules: vec![
                ScoringRule::new(Signal::AgeOver90, 15),
                ScoringRule::new(Signal::EcosystemAbsent, 5),
            ],
            config_min_age_days: 30,
            legacy_base: 30,
            legacy_rules: vec![ScoringRule::new(Signal::AgeOver180, 10)],
            legacy_ceiling: 40,
        }
    }
}

impl ScoringConfig {
    /// Base confidence for an orphaned dependency of `ecosystem`.
    pub fn dependency_base(&self, ecosystem: Ecosystem) -> u8 {
        match ecosystem {
            Ecosystem::Python => self.python_dependency_base,
            Ecosystem::Javascript => self.javascript_dependency_base,
            Ecosystem::Go => self.go_dependency_base,
            Ecosystem::Rust => self.rust_dependency_base,
        }
    }
}

/// Settings for the version-control pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    /// Run the archaeology pass at all.
    pub enabled: bool,
    /// Trailing window for commit mining, in days.
    pub window_days: u32,
    /// Time limit for the pass, in seconds.
    pub timeout_secs: u64,
    /// Include remote-tracking branches.
    pub include_remote_branches: bool,
    /// Maximum number of stale branch candidates reported.
    pub max_stale_branches: usize,
    /// Number of sample automation commits kept in the report.
    pub max_commit_samples: usize,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_days: 90,
            timeout_secs: 30,
            include_remote_branches: true,
            max_stale_branches: 20,
            max_commit_samples: 10,
        }
    }
}

impl GitConfig {
    /// Time limit for the pass.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Thresholds for the context-heavy documents report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Lowercase extensions, without the dot, that are measured.
    pub extensions: Vec<String>,
    /// Documents with more lines than this are reported.
    pub max_lines: usize,
    /// Documents with more estimated tokens than this are reported.
    pub max_tokens: usize,
    /// Above this many lines the recommendation becomes splitting.
    pub split_lines: usize,
    /// Maximum number of documents kept, largest first.
    pub limit: usize,
    pub confidence: u8,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            extensions: ["md", "txt", "rst", "json", "yaml", "yml"]
                .into_iter()
                .map(String::from)
                .collect(),
            max_lines: 500,
            max_tokens: 4_000,
            split_lines: 1_000,
            limit: 15,
            confidence: 50,
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, Default, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
#[serde(default)]
pub struct AnalysisConfig {
    #[builder(default)]
    pub walk: WalkConfig,
    #[builder(default)]
    pub patterns: PatternTables,
    #[builder(default)]
    pub scoring: ScoringConfig,
    #[builder(default)]
    pub git: GitConfig,
    #[builder(default)]
    pub context: ContextConfig,
}

impl AnalysisConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref walk) = self.walk {
            if walk.sample_cap == 0 {
                return Err("Sample cap must be greater than zero".to_string());
            }
        }
        if let Some(ref git) = self.git {
            if git.window_days == 0 {
                return Err("Git window must be at least one day".to_string());
            }
        }
        Ok(())
    }
}

impl AnalysisConfig {
    /// Create a new config builder.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder::default()
    }

    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, EngineError> {
        let config: Self = toml::from_str(source).map_err(|e| EngineError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| EngineError::config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }

    /// Check numeric invariants that the type system does not enforce.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.walk.sample_cap == 0 {
            return Err(EngineError::config("walk.sample_cap must be greater than zero"));
        }
        if self.git.window_days == 0 {
            return Err(EngineError::config("git.window_days must be at least one"));
        }
        if self.scoring.dead_file_floor > 100
            || self.scoring.documentation_confidence > 100
            || self.scoring.legacy_ceiling > 100
            || self.context.confidence > 100
        {
            return Err(EngineError::config("confidence thresholds must be within 0..=100"));
        }
        Ok(())
    }
}
