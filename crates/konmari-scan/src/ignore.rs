//! Directory ignore rules.

use std::sync::Arc;

use globset::{Glob, GlobSet, GlobSetBuilder};

use konmari_core::{EngineError, WalkConfig};

/// Decides which directories the walker never descends into.
///
/// Patterns use glob syntax and are matched against the directory name.
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    names: Arc<GlobSet>,
    config: Arc<WalkConfig>,
}

impl IgnoreRules {
    /// Compile the ignore list of a walk config.
    pub fn new(config: &WalkConfig) -> Result<Self, EngineError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &config.ignore_dirs {
            let glob = Glob::new(pattern)
                .map_err(|e| EngineError::config(format!("walk.ignore_dirs: {e}")))?;
            builder.add(glob);
        }
        let names = builder
            .build()
            .map_err(|e| EngineError::config(format!("walk.ignore_dirs: {e}")))?;
        Ok(Self {
            names: Arc::new(names),
            config: Arc::new(config.clone()),
        })
    }

    /// Check if a directory with this name should be pruned.
    pub fn is_ignored_dir(&self, name: &str) -> bool {
        self.names.is_match(name) || self.config.should_skip_hidden(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ignores() {
        let rules = IgnoreRules::new(&WalkConfig::default()).unwrap();

        assert!(rules.is_ignored_dir("node_modules"));
        assert!(rules.is_ignored_dir(".git"));
        assert!(rules.is_ignored_dir(".idea"));
        assert!(!rules.is_ignored_dir("src"));
    }

    #[test]
    fn test_glob_patterns() {
        let config = WalkConfig::builder()
            .ignore_dirs(vec!["*.egg-info".to_string(), "cache*".to_string()])
            .include_hidden_dirs(true)
            .build()
            .unwrap();
        let rules = IgnoreRules::new(&config).unwrap();

        assert!(rules.is_ignored_dir("mypkg.egg-info"));
        assert!(rules.is_ignored_dir("cache_v2"));
        assert!(!rules.is_ignored_dir(".github"));
        assert!(!rules.is_ignored_dir("node_modules"));
    }

    #[test]
    fn test_invalid_glob() {
        let config = WalkConfig::builder()
            .ignore_dirs(vec!["[".to_string()])
            .build()
            .unwrap();
        assert!(IgnoreRules::new(&config).is_err());
    }
}
