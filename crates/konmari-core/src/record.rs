//! Discovered file records and language/ecosystem tags.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// A language/package-manager context detected via manifest presence.
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
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Ecosystem {
    /// pip / poetry / setuptools.
    Python,
    /// npm / yarn / pnpm.
    Javascript,
    /// Go modules.
    Go,
    /// Cargo.
    Rust,
}

/// Source language tag attached to a file, derived from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Go,
    Rust,
    Java,
    Markdown,
}

impl Language {
    /// Detect a language from a file path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "py" | "pyi" => Some(Self::Python),
            "js" | "jsx" | "mjs" | "cjs" => Some(Self::JavaScript),
            "ts" | "tsx" | "mts" | "cts" => Some(Self::TypeScript),
            "go" => Some(Self::Go),
            "rs" => Some(Self::Rust),
            "java" => Some(Self::Java),
            "md" | "markdown" | "mdx" => Some(Self::Markdown),
            _ => None,
        }
    }

    /// The package ecosystem whose dependencies this language's sources import.
    pub fn ecosystem(self) -> Option<Ecosystem> {
        match self {
            Self::Python => Some(Ecosystem::Python),
            Self::JavaScript | Self::TypeScript => Some(Ecosystem::Javascript),
            Self::Go => Some(Ecosystem::Go),
            Self::Rust => Some(Ecosystem::Rust),
            Self::Java | Self::Markdown => None,
        }
    }

    /// Whether files of this language are program source (not documentation).
    pub fn is_source(self) -> bool {
        !matches!(self, Self::Markdown)
    }
}

/// One discovered file. Never mutated after the walk creates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Path relative to the repository root.
    pub path: PathBuf,
    /// File name (last path component).
    pub name: CompactString,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified: SystemTime,
    /// Detected language, if recognized.
    pub language: Option<Language>,
}

impl FileRecord {
    /// Create a record, deriving name and language from the relative path.
    pub fn new(path: impl Into<PathBuf>, size: u64, modified: SystemTime) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| CompactString::new(n.to_string_lossy()))
            .unwrap_or_default();
        let language = Language::from_path(&path);
        Self {
            path,
            name,
            size,
            modified,
            language,
        }
    }

    /// Whole days elapsed between the last modification and `reference`.
    ///
    /// Modification times in the future count as zero days old.
    pub fn age_days(&self, reference: SystemTime) -> u64 {
        reference
            .duration_since(self.modified)
            .unwrap_or(Duration::ZERO)
            .as_secs()
            / SECS_PER_DAY
    }

    /// The path with forward slashes, as used in findings.
    pub fn display_path(&self) -> String {
        display_path(&self.path)
    }

    /// The lowercase file extension without the dot.
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }

    /// Whether the file is program source in a recognized language.
    pub fn is_source(&self) -> bool {
        self.language.is_some_and(Language::is_source)
    }

    /// Whether the file is a markdown-like document.
    pub fn is_markdown(&self) -> bool {
        self.language == Some(Language::Markdown)
    }

    /// Whether the file is prose documentation: markdown, reStructuredText
    /// or plain text.
    pub fn is_document(&self) -> bool {
        self.is_markdown() || self.extension().is_some_and(|ext| ext == "rst" || ext == "txt")
    }
}

/// Render a relative path with `/` separators regardless of platform.
pub fn display_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
