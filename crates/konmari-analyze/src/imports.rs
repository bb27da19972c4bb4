//! Import reference scanning.
//!
//! Python sources are parsed with tree-sitter so that comments and string
//! literals never count as imports. The other languages use line-level
//! regexes.

use std::collections::BTreeSet;

use regex::Regex;
use tree_sitter::{LanguageError, Node, Parser};

use konmari_core::{EngineError, Language};

/// Per-thread Python parser.
pub struct PythonImports {
    parser: Parser,
}

impl PythonImports {
    /// Create a parser loaded with the Python grammar.
    pub fn new() -> Result<Self, LanguageError> {
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_python::LANGUAGE.into())?;
        Ok(Self { parser })
    }

    /// Top-level module names imported by `source`, lowercased.
    ///
    /// Relative imports are skipped. Returns `None` if the source could not
    /// be parsed at all.
    pub fn modules(&mut self, source: &str) -> Option<BTreeSet<String>> {
        let tree = self.parser.parse(source, None)?;
        let bytes = source.as_bytes();
        let mut modules = BTreeSet::new();
        let mut stack = vec![tree.root_node()];

        while let Some(node) = stack.pop() {
            match node.kind() {
                "import_statement" => {
                    let mut cursor = node.walk();
                    for name in node.children_by_field_name("name", &mut cursor) {
                        let dotted = match name.kind() {
                            "aliased_import" => name.child_by_field_name("name"),
                            _ => Some(name),
                        };
                        if let Some(text) = dotted.and_then(|n| node_text(n, bytes)) {
                            modules.insert(top_level(text));
                        }
                    }
                }
                "import_from_statement" => {
                    if let Some(module) = node.child_by_field_name("module_name") {
                        if module.kind() != "relative_import" {
                            if let Some(text) = node_text(module, bytes) {
                                modules.insert(top_level(text));
                            }
                        }
                    }
                }
                _ => {
                    let mut cursor = node.walk();
                    stack.extend(node.named_children(&mut cursor));
                }
            }
        }
        Some(modules)
    }
}

fn node_text<'s>(node: Node<'_>, source: &'s [u8]) -> Option<&'s str> {
    node.utf8_text(source).ok()
}

fn top_level(dotted: &str) -> String {
    dotted
        .split('.')
        .next()
        .unwrap_or(dotted)
        .trim()
        .to_ascii_lowercase()
}

/// Import names for declared Python distributions that differ from the
/// distribution name.
const PYTHON_ALIASES: &[(&str, &str)] = &[
    ("beautifulsoup4", "bs4"),
    ("pyyaml", "yaml"),
    ("pillow", "pil"),
    ("scikit-learn", "sklearn"),
    ("scikit-image", "skimage"),
    ("python-dateutil", "dateutil"),
    ("opencv-python", "cv2"),
    ("opencv-python-headless", "cv2"),
    ("python-dotenv", "dotenv"),
    ("attrs", "attr"),
    ("protobuf", "google"),
    ("pyjwt", "jwt"),
    ("psycopg2-binary", "psycopg2"),
    ("mysqlclient", "mysqldb"),
    ("pymupdf", "fitz"),
];

/// Module names a Python distribution can be imported as, normalized.
pub fn python_import_names(distribution: &str) -> Vec<String> {
    let lower = distribution.to_ascii_lowercase();
    let mut names = vec![normalize_module(&lower)];
    names.extend(
        PYTHON_ALIASES
            .iter()
            .filter(|(dist, _)| *dist == lower)
            .map(|(_, module)| normalize_module(module)),
    );
    names
}

/// Lowercase and map `-` and `.` to `_`.
pub fn normalize_module(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '-' | '.' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

/// Regex scanner for JavaScript, Go and Rust sources, plus a Python fallback.
#[derive(Debug, Clone)]
pub struct ImportScanner {
    js_require: Regex,
    js_from: Regex,
    js_bare: Regex,
    js_dynamic: Regex,
    go_single: Regex,
    go_block: Regex,
    go_quoted: Regex,
    rust_use: Regex,
    rust_extern: Regex,
    rust_path: Regex,
    python_line: Regex,
}

fn compile(pattern: &str) -> Result<Regex, EngineError> {
    Regex::new(pattern).map_err(|e| EngineError::config(format!("import pattern: {e}")))
}

impl ImportScanner {
    pub fn new() -> Result<Self, EngineError> {
        Ok(Self {
            js_require: compile(r#"\brequire\s*\(\s*['"]([^'"]+)['"]\s*\)"#)?,
            js_from: compile(r#"\bfrom\s+['"]([^'"]+)['"]"#)?,
            js_bare: compile(r#"(?m)^\s*import\s+['"]([^'"]+)['"]"#)?,
            js_dynamic: compile(r#"\bimport\s*\(\s*['"]([^'"]+)['"]\s*\)"#)?,
            go_single: compile(r#"(?m)^\s*import\s+(?:[\w.]+\s+)?"([^"]+)""#)?,
            go_block: compile(r"(?s)\bimport\s*\((.*?)\)")?,
            go_quoted: compile(r#""([^"]+)""#)?,
            rust_use: compile(r"(?m)^\s*(?:pub(?:\([^)]*\))?\s+)?use\s+(?:::)?([A-Za-z_][A-Za-z0-9_]*)")?,
            rust_extern: compile(r"(?m)^\s*extern\s+crate\s+([A-Za-z_][A-Za-z0-9_]*)")?,
            rust_path: compile(r"\b([A-Za-z_][A-Za-z0-9_]*)::")?,
            python_line: compile(r"(?m)^\s*(?:from|import)\s+([A-Za-z_][\w.]*)")?,
        })
    }

    /// Referenced package names in a source file of `language`.
    ///
    /// Python goes through [`PythonImports`]; this only covers it as a
    /// pattern fallback when no parser is available.
    pub fn references(&self, language: Language, source: &str) -> BTreeSet<String> {
        match language {
            Language::JavaScript | Language::TypeScript => self.javascript(source),
            Language::Go => self.go(source),
            Language::Rust => self.rust(source),
            Language::Python => self
                .python_line
                .captures_iter(source)
                .map(|c| top_level(&c[1]))
                .collect(),
            Language::Java | Language::Markdown => BTreeSet::new(),
        }
    }

    fn javascript(&self, source: &str) -> BTreeSet<String> {
        [&self.js_require, &self.js_from, &self.js_bare, &self.js_dynamic]
            .into_iter()
            .flat_map(|re| re.captures_iter(source))
            .filter_map(|c| js_package(&c[1]))
            .collect()
    }

    fn go(&self, source: &str) -> BTreeSet<String> {
        let mut paths: BTreeSet<String> = self
            .go_single
            .captures_iter(source)
            .map(|c| c[1].to_string())
            .collect();
        for block in self.go_block.captures_iter(source) {
            paths.extend(
                self.go_quoted
                    .captures_iter(&block[1])
                    .map(|c| c[1].to_string()),
            );
        }
        paths
    }

    fn rust(&self, source: &str) -> BTreeSet<String> {
        [&self.rust_use, &self.rust_extern, &self.rust_path]
            .into_iter()
            .flat_map(|re| re.captures_iter(source))
            .map(|c| c[1].to_string())
            .filter(|name| !matches!(name.as_str(), "crate" | "self" | "super" | "Self"))
            .collect()
    }
}

/// Package name of a JavaScript import specifier. Relative paths yield `None`.
pub fn js_package(specifier: &str) -> Option<String> {
    let spec = specifier.strip_prefix("node:").unwrap_or(specifier);
    if spec.is_empty() || spec.starts_with('.') || spec.starts_with('/') {
        return None;
    }
    let mut parts = spec.split('/');
    let first = parts.next()?;
    if first.starts_with('@') {
        let name = parts.next()?;
        Some(format!("{first}/{name}"))
    } else {
        Some(first.to_string())
    }
}

/// Whether a declared JavaScript package appears among `used` packages.
///
/// `@types/x` counts as used when `x` is, and `@types/scope__x` when
/// `@scope/x` is.
pub fn js_declared_used(declared: &str, used: &BTreeSet<String>) -> bool {
    if used.contains(declared) {
        return true;
    }
    match declared.strip_prefix("@types/") {
        Some(typed) => match typed.split_once("__") {
            Some((scope, name)) => used.contains(&format!("@{scope}/{name}")),
            None => used.contains(typed),
        },
        None => false,
    }
}

/// Whether a Go module is used by any import path.
pub fn go_module_used(module: &str, imports: &BTreeSet<String>) -> bool {
    let prefix = format!("{module}/");
    imports
        .iter()
        .any(|path| path == module || path.starts_with(&prefix))
}

/// Whether a declared Rust crate is referenced. Crate keys use `-`, paths `_`.
pub fn rust_crate_used(declared: &str, references: &BTreeSet<String>) -> bool {
    references.contains(&declared.replace('-', "_"))
}
