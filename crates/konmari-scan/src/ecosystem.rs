//! Ecosystem and monorepo detection over a snapshot.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde::Deserialize;
use tracing::debug;

use konmari_core::{
    Diagnostic, Ecosystem, EcosystemSet, FileRecord, MonorepoInfo, MonorepoTool,
    RepositorySnapshot, display_path,
};

/// Manifest file names and the ecosystem each one marks.
pub const MANIFEST_MARKERS: &[(&str, Ecosystem)] = &[
    ("requirements.txt", Ecosystem::Python),
    ("requirements-dev.txt", Ecosystem::Python),
    ("requirements-test.txt", Ecosystem::Python),
    ("pyproject.toml", Ecosystem::Python),
    ("setup.py", Ecosystem::Python),
    ("Pipfile", Ecosystem::Python),
    ("package.json", Ecosystem::Javascript),
    ("go.mod", Ecosystem::Go),
    ("Cargo.toml", Ecosystem::Rust),
];

/// Root files that declare workspace tooling.
const WORKSPACE_MARKERS: &[&str] = &[
    "lerna.json",
    "pnpm-workspace.yaml",
    "nx.json",
    "turbo.json",
    "rush.json",
    "go.work",
];

/// More `package.json` files than this implies a monorepo.
const PACKAGE_JSON_MONOREPO_COUNT: usize = 3;

/// Ecosystem marked by a manifest file name, if any.
pub fn manifest_ecosystem(name: &str) -> Option<Ecosystem> {
    MANIFEST_MARKERS
        .iter()
        .find(|(marker, _)| *marker == name)
        .map(|(_, eco)| *eco)
}

/// Whether a file name is a manifest or workspace marker.
pub fn is_marker_file(name: &str) -> bool {
    manifest_ecosystem(name).is_some() || WORKSPACE_MARKERS.contains(&name)
}

/// Output of ecosystem detection.
#[derive(Debug, Clone, Default)]
pub struct EcosystemDetection {
    pub ecosystems: EcosystemSet,
    pub monorepo: MonorepoInfo,
    /// Workspace markers that could not be read or parsed.
    pub diagnostics: Vec<Diagnostic>,
}

/// Which nested directories count as package roots.
#[derive(Debug, Default)]
struct PackageScope {
    include: Vec<String>,
    exclude: Vec<String>,
    accept_all: bool,
}

impl PackageScope {
    fn add(&mut self, pattern: &str) {
        let (list, pattern) = match pattern.strip_prefix('!') {
            Some(rest) => (&mut self.exclude, rest),
            None => (&mut self.include, pattern),
        };
        let pattern = pattern.trim().trim_start_matches("./").trim_end_matches('/');
        if !pattern.is_empty() {
            list.push(pattern.to_string());
        }
    }

    fn matcher(&self) -> PackageMatcher {
        PackageMatcher {
            include: build_globs(&self.include),
            exclude: build_globs(&self.exclude),
            accept_all: self.accept_all,
        }
    }
}

struct PackageMatcher {
    include: GlobSet,
    exclude: GlobSet,
    accept_all: bool,
}

impl PackageMatcher {
    fn is_package(&self, dir: &str) -> bool {
        if self.exclude.is_match(dir) {
            return false;
        }
        self.accept_all || self.include.is_match(dir)
    }
}

fn build_globs(patterns: &[String]) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        match GlobBuilder::new(pattern).literal_separator(true).build() {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(err) => debug!(pattern, error = %err, "skipping invalid workspace glob"),
        }
    }
    builder.build().unwrap_or_else(|_| GlobSet::empty())
}

#[derive(Deserialize)]
struct LernaJson {
    packages: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct PnpmWorkspace {
    #[serde(default)]
    packages: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Workspaces {
    List(Vec<String>),
    Object {
        #[serde(default)]
        packages: Vec<String>,
    },
}

#[derive(Deserialize)]
struct PackageJsonWorkspaces {
    workspaces: Option<Workspaces>,
}

#[derive(Deserialize)]
struct CargoWorkspaceManifest {
    workspace: Option<CargoWorkspaceTable>,
}

#[derive(Deserialize)]
struct CargoWorkspaceTable {
    #[serde(default)]
    members: Vec<String>,
    #[serde(default)]
    exclude: Vec<String>,
}

/// Detects ecosystems from manifest files in a snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct EcosystemDetector;

impl EcosystemDetector {
    /// Create a new detector.
    pub fn new() -> Self {
        Self
    }

    /// Detect ecosystems at the root and at each workspace package root.
    pub fn detect(&self, snapshot: &RepositorySnapshot) -> EcosystemDetection {
        let mut detection = EcosystemDetection::default();
        let mut scope = PackageScope::default();
        let mut tools = Vec::new();

        for record in snapshot.files.iter().filter(|f| is_root_file(f)) {
            if let Some(eco) = manifest_ecosystem(&record.name) {
                detection.ecosystems.insert(eco, record.path.clone());
            }
        }

        self.read_workspace_markers(snapshot, &mut scope, &mut tools, &mut detection.diagnostics);

        let package_json_count = snapshot
            .files
            .iter()
            .filter(|f| f.name == "package.json")
            .count();
        if package_json_count > PACKAGE_JSON_MONOREPO_COUNT {
            scope.accept_all = true;
        }

        let is_monorepo = !tools.is_empty() || package_json_count > PACKAGE_JSON_MONOREPO_COUNT;
        let mut packages = BTreeSet::new();

        if is_monorepo {
            let matcher = scope.matcher();
            for record in snapshot.files.iter().filter(|f| !is_root_file(f)) {
                let Some(eco) = manifest_ecosystem(&record.name) else {
                    continue;
                };
                let Some(dir) = record.path.parent() else {
                    continue;
                };
                if matcher.is_package(&display_path(dir)) {
                    detection.ecosystems.insert(eco, record.path.clone());
                    packages.insert(dir.to_path_buf());
                }
            }
        }

        debug!(
            ecosystems = ?detection.ecosystems.ecosystems(),
            is_monorepo,
            packages = packages.len(),
            "ecosystem detection complete"
        );

        detection.monorepo = MonorepoInfo {
            is_monorepo,
            tools,
            packages: packages.into_iter().collect(),
            package_json_count,
        };
        detection
    }

    fn read_workspace_markers(
        &self,
        snapshot: &RepositorySnapshot,
        scope: &mut PackageScope,
        tools: &mut Vec<MonorepoTool>,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        if let Some(text) = read_root(snapshot, "lerna.json", diagnostics) {
            tools.push(MonorepoTool::Lerna);
            match serde_json::from_str::<LernaJson>(&text) {
                Ok(lerna) => lerna
                    .packages
                    .unwrap_or_else(|| vec!["packages/*".to_string()])
                    .iter()
                    .for_each(|p| scope.add(p)),
                Err(err) => {
                    diagnostics.push(Diagnostic::manifest("lerna.json", err.to_string()));
                    scope.add("packages/*");
                }
            }
        }

        if let Some(text) = read_root(snapshot, "pnpm-workspace.yaml", diagnostics) {
            tools.push(MonorepoTool::Pnpm);
            match serde_yaml::from_str::<PnpmWorkspace>(&text) {
                Ok(ws) => ws.packages.iter().for_each(|p| scope.add(p)),
                Err(err) => diagnostics.push(Diagnostic::manifest("pnpm-workspace.yaml", err.to_string())),
            }
        }

        for (marker, tool) in [
            ("nx.json", MonorepoTool::Nx),
            ("turbo.json", MonorepoTool::Turborepo),
            ("rush.json", MonorepoTool::Rush),
        ] {
            if snapshot.contains(Path::new(marker)) {
                tools.push(tool);
                scope.accept_all = true;
            }
        }

        // Malformed manifests are reported by the dependency pass.
        if let Some(text) = read_root(snapshot, "package.json", diagnostics) {
            if let Ok(PackageJsonWorkspaces {
                workspaces: Some(ws),
            }) = serde_json::from_str(&text)
            {
                tools.push(MonorepoTool::YarnWorkspaces);
                let patterns = match ws {
                    Workspaces::List(list) => list,
                    Workspaces::Object { packages } => packages,
                };
                patterns.iter().for_each(|p| scope.add(p));
            }
        }

        if let Some(text) = read_root(snapshot, "Cargo.toml", diagnostics) {
            if let Ok(CargoWorkspaceManifest {
                workspace: Some(ws),
            }) = toml::from_str(&text)
            {
                tools.push(MonorepoTool::CargoWorkspace);
                ws.members.iter().for_each(|p| scope.add(p));
                ws.exclude.iter().for_each(|p| scope.add(&format!("!{p}")));
            }
        }

        if let Some(text) = read_root(snapshot, "go.work", diagnostics) {
            tools.push(MonorepoTool::GoWorkspace);
            parse_go_work_uses(&text).iter().for_each(|p| scope.add(p));
        }
    }
}

fn is_root_file(record: &FileRecord) -> bool {
    record.path.parent().is_none_or(|p| p.as_os_str().is_empty())
}

fn read_root(
    snapshot: &RepositorySnapshot,
    name: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<String> {
    let record = snapshot.get(Path::new(name))?;
    match snapshot.read_to_string(record) {
        Ok(text) => Some(text),
        Err(err) => {
            diagnostics.push(Diagnostic::read_error(PathBuf::from(name), &err));
            None
        }
    }
}

/// Directories named by `use` directives in a `go.work` file.
fn parse_go_work_uses(text: &str) -> Vec<String> {
    let mut dirs = Vec::new();
    let mut in_block = false;

    for line in text.lines() {
        let line = line.split("//").next().unwrap_or_default().trim();
        if in_block {
            if line == ")" {
                in_block = false;
            } else if !line.is_empty() {
                dirs.push(line.to_string());
            }
            continue;
        }
        let Some(rest) = line
            .strip_prefix("use")
            .filter(|r| r.starts_with(|c: char| c.is_whitespace() || c == '('))
        else {
            continue;
        };
        match rest.trim() {
            "(" => in_block = true,
            "" => {}
            dir => dirs.push(dir.to_string()),
        }
    }
    dirs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_ecosystem() {
        assert_eq!(manifest_ecosystem("Pipfile"), Some(Ecosystem::Python));
        assert_eq!(manifest_ecosystem("go.mod"), Some(Ecosystem::Go));
        assert_eq!(manifest_ecosystem("README.md"), None);
        assert!(is_marker_file("lerna.json"));
    }

    #[test]
    fn test_go_work_uses() {
        let text = "go 1.22\n\nuse (\n    ./api\n    ./tools // helpers\n)\nuse ./cli\n";
        assert_eq!(parse_go_work_uses(text), vec!["./api", "./tools", "./cli"]);
    }

    #[test]
    fn test_package_scope_globs() {
        let mut scope = PackageScope::default();
        scope.add("./packages/*");
        scope.add("!packages/legacy");
        let matcher = scope.matcher();

        assert!(matcher.is_package("packages/web"));
        assert!(!matcher.is_package("packages/web/nested"));
        assert!(!matcher.is_package("packages/legacy"));
        assert!(!matcher.is_package("apps/site"));
    }
}
