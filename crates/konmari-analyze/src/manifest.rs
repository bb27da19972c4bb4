//! Per-format manifest parsers.
//!
//! Each [`ManifestFormat`] turns one manifest file into a flat list of
//! [`DeclaredDependency`] values. Malformed input is a typed
//! [`ManifestParseError`], never a best-effort guess.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Deserialize;
use strum::Display;
use thiserror::Error;
use tracing::warn;

use konmari_core::{Diagnostic, Ecosystem, EcosystemSet, RepositorySnapshot, display_path};

/// One dependency declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredDependency {
    pub name: String,
    /// Version requirement as written, if any.
    pub version: Option<String>,
    /// Manifest section, e.g. `dependencies` or `dev-packages`.
    pub section: String,
}

impl DeclaredDependency {
    fn new(name: impl Into<String>, version: Option<String>, section: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.filter(|v| !v.is_empty()),
            section: section.into(),
        }
    }

    /// Whether project sources are expected to import this dependency.
    /// Indirect requirements and build-backend requirements are not.
    pub fn expects_import(&self) -> bool {
        self.section != INDIRECT_SECTION && self.section != BUILD_SECTION
    }
}

/// Section name for go.mod requirements marked `// indirect`.
pub const INDIRECT_SECTION: &str = "indirect";

/// Section name for pyproject `build-system.requires` entries.
pub const BUILD_SECTION: &str = "build-system";

/// A manifest that exists but could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to parse {format} manifest {}: {message}", display_path(.path))]
pub struct ManifestParseError {
    pub path: PathBuf,
    pub format: ManifestFormat,
    pub message: String,
}

/// Supported manifest formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ManifestFormat {
    RequirementsTxt,
    PyProject,
    Pipfile,
    SetupPy,
    PackageJson,
    GoMod,
    CargoToml,
}

impl ManifestFormat {
    /// Format for a manifest file name.
    pub fn from_file_name(name: &str) -> Option<Self> {
        match name {
            "pyproject.toml" => Some(Self::PyProject),
            "Pipfile" => Some(Self::Pipfile),
            "setup.py" => Some(Self::SetupPy),
            "package.json" => Some(Self::PackageJson),
            "go.mod" => Some(Self::GoMod),
            "Cargo.toml" => Some(Self::CargoToml),
            n if n.starts_with("requirements") && n.ends_with(".txt") => Some(Self::RequirementsTxt),
            _ => None,
        }
    }

    /// Ecosystem the format belongs to.
    pub fn ecosystem(self) -> Ecosystem {
        match self {
            Self::RequirementsTxt | Self::PyProject | Self::Pipfile | Self::SetupPy => {
                Ecosystem::Python
            }
            Self::PackageJson => Ecosystem::Javascript,
            Self::GoMod => Ecosystem::Go,
            Self::CargoToml => Ecosystem::Rust,
        }
    }

    /// Parse manifest text.
    pub fn parse(self, text: &str) -> Result<Vec<DeclaredDependency>, String> {
        match self {
            Self::RequirementsTxt => parse_requirements(text),
            Self::PyProject => parse_pyproject(text),
            Self::Pipfile => parse_pipfile(text),
            Self::SetupPy => parse_setup_py(text),
            Self::PackageJson => parse_package_json(text),
            Self::GoMod => parse_go_mod(text),
            Self::CargoToml => parse_cargo_toml(text),
        }
    }

    /// Parse the manifest at `path`, attaching the path to errors.
    pub fn parse_file(self, path: &Path, text: &str) -> Result<Vec<DeclaredDependency>, ManifestParseError> {
        self.parse(text).map_err(|message| ManifestParseError {
            path: path.to_path_buf(),
            format: self,
            message,
        })
    }
}

/// Split a PEP 508 requirement into name and version spec.
///
/// Returns `Ok(None)` for lines that declare nothing (options, URLs).
fn parse_requirement(line: &str) -> Result<Option<(String, Option<String>)>, String> {
    let line = line.split(" #").next().unwrap_or_default().trim();
    let line = line.strip_suffix('\\').unwrap_or(line).trim();
    if line.is_empty() || line.starts_with('#') || line.starts_with('-') || line.contains("://") {
        return Ok(None);
    }

    let end = line
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        .unwrap_or(line.len());
    let name = &line[..end];
    if name.is_empty() || !name.starts_with(|c: char| c.is_ascii_alphanumeric()) {
        return Err(format!("invalid requirement `{line}`"));
    }

    let rest = line[end..].trim();
    let rest = rest
        .strip_prefix('[')
        .and_then(|r| r.split_once(']').map(|(_, after)| after.trim()))
        .unwrap_or(rest);
    if !rest.is_empty() && !rest.starts_with(|c: char| "=<>!~;@(,".contains(c)) {
        return Err(format!("invalid requirement `{line}`"));
    }
    let version = rest.split(';').next().unwrap_or_default().trim().to_string();
    Ok(Some((name.to_string(), Some(version))))
}

fn parse_requirements(text: &str) -> Result<Vec<DeclaredDependency>, String> {
    let mut deps = Vec::new();
    for (index, line) in text.lines().enumerate() {
        match parse_requirement(line) {
            Ok(Some((name, version))) => {
                deps.push(DeclaredDependency::new(name, version, "requirements"))
            }
            Ok(None) => {}
            Err(err) => return Err(format!("line {}: {err}", index + 1)),
        }
    }
    Ok(deps)
}

fn requirement_list(
    values: &[toml::Value],
    section: &str,
    deps: &mut Vec<DeclaredDependency>,
) -> Result<(), String> {
    for value in values {
        let text = value
            .as_str()
            .ok_or_else(|| format!("{section}: expected a string entry"))?;
        if let Some((name, version)) = parse_requirement(text)? {
            deps.push(DeclaredDependency::new(name, version, section));
        }
    }
    Ok(())
}

fn table_keys(table: &toml::Table, section: &str, deps: &mut Vec<DeclaredDependency>) {
    for (name, value) in table {
        if name == "python" {
            continue;
        }
        let version = match value {
            toml::Value::String(v) => Some(v.clone()),
            toml::Value::Table(t) => t.get("version").and_then(|v| v.as_str()).map(String::from),
            _ => None,
        };
        deps.push(DeclaredDependency::new(name.clone(), version, section));
    }
}

fn parse_pyproject(text: &str) -> Result<Vec<DeclaredDependency>, String> {
    let doc: toml::Table = toml::from_str(text).map_err(|e| e.to_string())?;
    let mut deps = Vec::new();

    if let Some(project) = doc.get("project").and_then(|v| v.as_table()) {
        if let Some(list) = project.get("dependencies").and_then(|v| v.as_array()) {
            requirement_list(list, "project", &mut deps)?;
        }
        if let Some(groups) = project.get("optional-dependencies").and_then(|v| v.as_table()) {
            for (group, list) in groups {
                if let Some(list) = list.as_array() {
                    requirement_list(list, &format!("optional:{group}"), &mut deps)?;
                }
            }
        }
    }

    if let Some(requires) = doc
        .get("build-system")
        .and_then(|v| v.get("requires"))
        .and_then(|v| v.as_array())
    {
        requirement_list(requires, BUILD_SECTION, &mut deps)?;
    }

    if let Some(poetry) = doc
        .get("tool")
        .and_then(|v| v.get("poetry"))
        .and_then(|v| v.as_table())
    {
        for section in ["dependencies", "dev-dependencies"] {
            if let Some(table) = poetry.get(section).and_then(|v| v.as_table()) {
                table_keys(table, &format!("poetry.{section}"), &mut deps);
            }
        }
        if let Some(groups) = poetry.get("group").and_then(|v| v.as_table()) {
            for (group, body) in groups {
                if let Some(table) = body.get("dependencies").and_then(|v| v.as_table()) {
                    table_keys(table, &format!("poetry.group.{group}"), &mut deps);
                }
            }
        }
    }

    Ok(deps)
}

fn parse_pipfile(text: &str) -> Result<Vec<DeclaredDependency>, String> {
    let doc: toml::Table = toml::from_str(text).map_err(|e| e.to_string())?;
    let mut deps = Vec::new();
    for section in ["packages", "dev-packages"] {
        if let Some(table) = doc.get(section).and_then(|v| v.as_table()) {
            table_keys(table, section, &mut deps);
        }
    }
    Ok(deps)
}

fn parse_setup_py(text: &str) -> Result<Vec<DeclaredDependency>, String> {
    let block = Regex::new(r"(?s)install_requires\s*=\s*\[(.*?)\]").map_err(|e| e.to_string())?;
    let quoted = Regex::new(r#"["']([^"']+)["']"#).map_err(|e| e.to_string())?;

    let mut deps = Vec::new();
    for caps in block.captures_iter(text) {
        for item in quoted.captures_iter(&caps[1]) {
            if let Some((name, version)) = parse_requirement(&item[1])? {
                deps.push(DeclaredDependency::new(name, version, "install_requires"));
            }
        }
    }
    Ok(deps)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageJson {
    #[serde(default)]
    dependencies: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    dev_dependencies: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    peer_dependencies: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    optional_dependencies: BTreeMap<String, serde_json::Value>,
}

fn parse_package_json(text: &str) -> Result<Vec<DeclaredDependency>, String> {
    let manifest: PackageJson = serde_json::from_str(text).map_err(|e| e.to_string())?;
    let sections = [
        ("dependencies", manifest.dependencies),
        ("devDependencies", manifest.dev_dependencies),
        ("peerDependencies", manifest.peer_dependencies),
        ("optionalDependencies", manifest.optional_dependencies),
    ];

    Ok(sections
        .into_iter()
        .flat_map(|(section, table)| {
            table.into_iter().map(move |(name, version)| {
                DeclaredDependency::new(name, version.as_str().map(String::from), section)
            })
        })
        .collect())
}

fn parse_go_mod(text: &str) -> Result<Vec<DeclaredDependency>, String> {
    fn requirement(line: &str, number: usize) -> Result<DeclaredDependency, String> {
        let (body, comment) = match line.split_once("//") {
            Some((body, comment)) => (body, comment),
            None => (line, ""),
        };
        let mut fields = body.split_whitespace();
        match (fields.next(), fields.next(), fields.next()) {
            (Some(module), Some(version), None) => {
                let section = if comment.trim() == "indirect" {
                    INDIRECT_SECTION
                } else {
                    "require"
                };
                Ok(DeclaredDependency::new(module, Some(version.to_string()), section))
            }
            _ => Err(format!("line {number}: malformed require `{}`", line.trim())),
        }
    }

    let mut deps = Vec::new();
    let mut block_start = None;

    for (index, raw) in text.lines().enumerate() {
        let number = index + 1;
        let line = raw.trim();
        if block_start.is_some() {
            if line == ")" {
                block_start = None;
            } else if !line.is_empty() && !line.starts_with("//") {
                deps.push(requirement(line, number)?);
            }
            continue;
        }
        if let Some(rest) = line
            .strip_prefix("require")
            .filter(|r| r.starts_with([' ', '\t', '(']))
        {
            let rest = rest.trim();
            if rest == "(" {
                block_start = Some(number);
            } else if !rest.is_empty() {
                deps.push(requirement(rest, number)?);
            }
        }
    }

    match block_start {
        Some(line) => Err(format!("line {line}: unterminated require block")),
        None => Ok(deps),
    }
}

fn cargo_section(table: &toml::Table, section: &str, deps: &mut Vec<DeclaredDependency>) {
    for (key, value) in table {
        let version = match value {
            toml::Value::String(v) => Some(v.clone()),
            toml::Value::Table(t) => t.get("version").and_then(|v| v.as_str()).map(String::from),
            _ => None,
        };
        // Renamed dependencies are referenced in source by their key.
        deps.push(DeclaredDependency::new(key.clone(), version, section));
    }
}

fn parse_cargo_toml(text: &str) -> Result<Vec<DeclaredDependency>, String> {
    const SECTIONS: [&str; 3] = ["dependencies", "dev-dependencies", "build-dependencies"];

    let doc: toml::Table = toml::from_str(text).map_err(|e| e.to_string())?;
    let mut deps = Vec::new();

    for section in SECTIONS {
        if let Some(table) = doc.get(section).and_then(|v| v.as_table()) {
            cargo_section(table, section, &mut deps);
        }
    }

    if let Some(targets) = doc.get("target").and_then(|v| v.as_table()) {
        for (cfg, body) in targets {
            for section in SECTIONS {
                if let Some(table) = body.get(section).and_then(|v| v.as_table()) {
                    cargo_section(table, &format!("target.{cfg}.{section}"), &mut deps);
                }
            }
        }
    }

    if let Some(table) = doc
        .get("workspace")
        .and_then(|v| v.get("dependencies"))
        .and_then(|v| v.as_table())
    {
        cargo_section(table, "workspace.dependencies", &mut deps);
    }

    Ok(deps)
}

/// A successfully parsed manifest.
#[derive(Debug, Clone)]
pub struct ParsedManifest {
    pub path: PathBuf,
    pub format: ManifestFormat,
    pub dependencies: Vec<DeclaredDependency>,
}

/// Every detected manifest, parsed once per run.
#[derive(Debug, Clone, Default)]
pub struct ManifestIndex {
    parsed: Vec<ParsedManifest>,
    failed: Vec<ManifestParseError>,
}

impl ManifestIndex {
    /// Build an index from already-parsed results.
    pub fn from_parts(parsed: Vec<ParsedManifest>, failed: Vec<ManifestParseError>) -> Self {
        Self { parsed, failed }
    }

    /// Read and parse every manifest in `ecosystems`.
    pub fn load(snapshot: &RepositorySnapshot, ecosystems: &EcosystemSet) -> Self {
        let mut index = Self::default();

        for (_, manifests) in ecosystems.iter() {
            for path in manifests {
                let Some(format) = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .and_then(ManifestFormat::from_file_name)
                else {
                    continue;
                };

                let text = match std::fs::read(snapshot.absolute(path)) {
                    Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                    Err(err) => {
                        index.failed.push(ManifestParseError {
                            path: path.clone(),
                            format,
                            message: err.to_string(),
                        });
                        continue;
                    }
                };

                match format.parse_file(path, &text) {
                    Ok(dependencies) => index.parsed.push(ParsedManifest {
                        path: path.clone(),
                        format,
                        dependencies,
                    }),
                    Err(err) => {
                        warn!(path = %display_path(path), error = %err.message, "manifest parse failed");
                        index.failed.push(err);
                    }
                }
            }
        }
        index
    }

    /// Parsed manifests.
    pub fn parsed(&self) -> &[ParsedManifest] {
        &self.parsed
    }

    /// Manifests that failed to parse.
    pub fn failures(&self) -> &[ManifestParseError] {
        &self.failed
    }

    /// Whether any manifest of `ecosystem` failed to parse.
    pub fn has_failure(&self, ecosystem: Ecosystem) -> bool {
        self.failed.iter().any(|e| e.format.ecosystem() == ecosystem)
    }

    /// Declarations of one ecosystem with the manifest that made them.
    pub fn declared(
        &self,
        ecosystem: Ecosystem,
    ) -> impl Iterator<Item = (&ParsedManifest, &DeclaredDependency)> {
        self.parsed
            .iter()
            .filter(move |m| m.format.ecosystem() == ecosystem)
            .flat_map(|m| m.dependencies.iter().map(move |d| (m, d)))
    }

    /// Whether `package` is declared by any manifest of `ecosystem`.
    ///
    /// Names compare case-insensitively with `-`, `_` and `.` treated alike.
    pub fn declares(&self, ecosystem: Ecosystem, package: &str) -> bool {
        let wanted = normalize_package(package);
        self.declared(ecosystem)
            .any(|(_, dep)| normalize_package(&dep.name) == wanted)
    }

    /// Diagnostics for every failed manifest.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.failed
            .iter()
            .map(|e| Diagnostic::manifest(e.path.clone(), e.to_string()))
            .collect()
    }
}

/// Lowercase a package name and unify `-`, `_` and `.`.
pub fn normalize_package(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '-' | '.' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}
