//! Filename-based duplicate detection.
//!
//! Files are grouped by a normalized stem plus extension: the stem is
//! lowercased and stripped of copy markers such as `_old`, `_copy` or
//! ` (2)`. Content is never compared, so two differently named files with
//! identical bytes are not grouped, while same-named files with different
//! content are.
//!
//! A group is only reported when at least one member carries a copy
//! marker, so plain same-named files in different directories (`mod.rs`,
//! `index.js`) never form a group on their own.

use std::collections::BTreeMap;
use std::path::PathBuf;

use regex::Regex;

use konmari_core::{EngineError, FileRecord};

/// Normalized grouping key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DuplicateKey {
    pub stem: String,
    /// Lowercase extension without the dot, empty when absent.
    pub extension: String,
}

/// A group of files sharing a normalized name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub key: DuplicateKey,
    /// Most recently modified member, the one to keep.
    pub keep: PathBuf,
    /// All members sorted by path, including `keep`.
    pub members: Vec<PathBuf>,
}

impl DuplicateGroup {
    /// Number of files in the group.
    pub fn count(&self) -> usize {
        self.members.len()
    }

    /// Whether the group has exactly two members, an ambiguous signal.
    pub fn is_pair(&self) -> bool {
        self.members.len() == 2
    }

    /// Members other than the one to keep.
    pub fn duplicates(&self) -> impl Iterator<Item = &PathBuf> {
        self.members.iter().filter(move |p| **p != self.keep)
    }
}

/// Groups files by normalized name.
#[derive(Debug, Clone)]
pub struct DuplicateDetector {
    suffixes: Vec<String>,
    numbered: Regex,
}

impl DuplicateDetector {
    /// Create a detector stripping `suffixes` (case-insensitive).
    pub fn new(suffixes: &[String]) -> Result<Self, EngineError> {
        let mut suffixes: Vec<String> = suffixes
            .iter()
            .map(|s| s.to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        // Longest first so `_v10`-style entries win over their prefixes.
        suffixes.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        let numbered = Regex::new(r"\s*\(\d+\)$")
            .map_err(|e| EngineError::config(format!("duplicate numbering: {e}")))?;
        Ok(Self { suffixes, numbered })
    }

    /// Normalize a file stem. Returns the stem and whether a marker was removed.
    pub fn normalize_stem(&self, stem: &str) -> (String, bool) {
        let mut current = stem.to_lowercase();
        let mut stripped = false;

        loop {
            let before = current.len();
            if let Some(m) = self.numbered.find(&current) {
                current.truncate(m.start());
            }
            if let Some(suffix) = self.suffixes.iter().find(|s| current.ends_with(s.as_str())) {
                current.truncate(current.len() - suffix.len());
            }
            if current.len() == before {
                break;
            }
            stripped = true;
        }

        if current.is_empty() {
            (stem.to_lowercase(), false)
        } else {
            (current, stripped)
        }
    }

    /// Grouping key for a record.
    pub fn key(&self, record: &FileRecord) -> (DuplicateKey, bool) {
        let stem = record
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (stem, stripped) = self.normalize_stem(&stem);
        let key = DuplicateKey {
            stem,
            extension: record.extension().unwrap_or_default(),
        };
        (key, stripped)
    }

    /// Find duplicate groups. Output is ordered by key.
    pub fn find_groups(&self, files: &[FileRecord]) -> Vec<DuplicateGroup> {
        let mut buckets: BTreeMap<DuplicateKey, (Vec<&FileRecord>, bool)> = BTreeMap::new();
        for record in files {
            let (key, stripped) = self.key(record);
            let bucket = buckets.entry(key).or_default();
            bucket.0.push(record);
            bucket.1 |= stripped;
        }

        buckets
            .into_iter()
            .filter(|(_, (members, has_variant))| members.len() > 1 && *has_variant)
            .filter_map(|(key, (members, _))| {
                let keep = members
                    .iter()
                    .max_by(|a, b| a.modified.cmp(&b.modified).then_with(|| b.path.cmp(&a.path)))?
                    .path
                    .clone();
                let mut paths: Vec<PathBuf> = members.iter().map(|r| r.path.clone()).collect();
                paths.sort();
                Some(DuplicateGroup {
                    key,
                    keep,
                    members: paths,
                })
            })
            .collect()
    }
}
