//! Compiled pattern tables.

use regex::{Regex, RegexSet, RegexSetBuilder};

use crate::error::EngineError;

/// A case-insensitive set of regexes that remembers its source patterns.
#[derive(Debug, Clone)]
pub struct PatternSet {
    set: RegexSet,
    regexes: Vec<Regex>,
    sources: Vec<String>,
}

impl PatternSet {
    /// Compile `patterns`. `label` names the table in error messages.
    pub fn compile(label: &str, patterns: &[String]) -> Result<Self, EngineError> {
        let set = RegexSetBuilder::new(patterns)
            .case_insensitive(true)
            .build()
            .map_err(|e| EngineError::config(format!("{label}: {e}")))?;
        let regexes = patterns
            .iter()
            .map(|p| {
                regex::RegexBuilder::new(p)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| EngineError::config(format!("{label}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            set,
            regexes,
            sources: patterns.to_vec(),
        })
    }

    /// Check if any pattern matches.
    pub fn is_match(&self, text: &str) -> bool {
        self.set.is_match(text)
    }

    /// Source of the first (lowest-index) pattern that matches.
    pub fn first_match(&self, text: &str) -> Option<&str> {
        self.set
            .matches(text)
            .iter()
            .next()
            .map(|i| self.sources[i].as_str())
    }

    /// Number of distinct patterns that match.
    pub fn match_count(&self, text: &str) -> usize {
        self.set.matches(text).iter().count()
    }

    /// Text of the first match of the first matching pattern.
    pub fn find<'t>(&self, text: &'t str) -> Option<&'t str> {
        let index = self.set.matches(text).iter().next()?;
        self.regexes[index].find(text).map(|m| m.as_str())
    }

    /// Number of patterns in the set.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Check whether the set has no patterns.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
