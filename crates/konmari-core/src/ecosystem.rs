//! Ecosystem and monorepo detection results.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::record::Ecosystem;

/// Mapping from ecosystem to the manifest files found for it.
///
/// An ecosystem is present if it maps to at least one manifest. Iteration
/// order follows [`Ecosystem`] declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EcosystemSet {
    manifests: IndexMap<Ecosystem, Vec<PathBuf>>,
}

impl EcosystemSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a manifest for an ecosystem. Duplicate paths are ignored.
    pub fn insert(&mut self, ecosystem: Ecosystem, manifest: impl Into<PathBuf>) {
        let manifest = manifest.into();
        let paths = self.manifests.entry(ecosystem).or_default();
        if !paths.contains(&manifest) {
            paths.push(manifest);
        }
        self.manifests.sort_keys();
    }

    /// Check whether an ecosystem is present.
    pub fn contains(&self, ecosystem: Ecosystem) -> bool {
        self.manifests.get(&ecosystem).is_some_and(|p| !p.is_empty())
    }

    /// Manifests found for an ecosystem.
    pub fn manifests(&self, ecosystem: Ecosystem) -> &[PathBuf] {
        self.manifests
            .get(&ecosystem)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Iterate present ecosystems with their manifests.
    pub fn iter(&self) -> impl Iterator<Item = (Ecosystem, &[PathBuf])> {
        self.manifests.iter().map(|(e, p)| (*e, p.as_slice()))
    }

    /// Present ecosystems in order.
    pub fn ecosystems(&self) -> Vec<Ecosystem> {
        self.manifests.keys().copied().collect()
    }

    /// Check whether no ecosystem was detected.
    pub fn is_empty(&self) -> bool {
        self.manifests.is_empty()
    }

    /// Check whether a given manifest path was detected.
    pub fn has_manifest(&self, path: &Path) -> bool {
        self.manifests.values().flatten().any(|p| p == path)
    }
}

/// Workspace tooling that marks a repository as a monorepo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MonorepoTool {
    Lerna,
    Pnpm,
    Nx,
    Turborepo,
    Rush,
    YarnWorkspaces,
    CargoWorkspace,
    GoWorkspace,
}

/// Monorepo detection result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonorepoInfo {
    /// Whether the repository looks like a monorepo.
    pub is_monorepo: bool,
    /// Workspace tools whose markers were found.
    pub tools: Vec<MonorepoTool>,
    /// Package sub-roots, relative to the repository root.
    pub packages: Vec<PathBuf>,
    /// Number of `package.json` files seen anywhere.
    pub package_json_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_is_additive_and_ordered() {
        let mut set = EcosystemSet::new();
        set.insert(Ecosystem::Rust, "Cargo.toml");
        set.insert(Ecosystem::Python, "requirements.txt");
        set.insert(Ecosystem::Python, "pyproject.toml");
        set.insert(Ecosystem::Python, "requirements.txt");

        assert_eq!(set.ecosystems(), vec![Ecosystem::Python, Ecosystem::Rust]);
        assert_eq!(set.manifests(Ecosystem::Python).len(), 2);
        assert!(set.contains(Ecosystem::Rust));
        assert!(!set.contains(Ecosystem::Go));
        assert!(set.manifests(Ecosystem::Go).is_empty());
    }

    #[test]
    fn test_serializes_as_map() {
        let mut set = EcosystemSet::new();
        set.insert(Ecosystem::Javascript, "package.json");
        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json["javascript"][0], "package.json");
    }
}
