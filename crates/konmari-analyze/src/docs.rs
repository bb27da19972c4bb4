//! Broken relative links, anchors and code block file labels in documents.

use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};

use rayon::prelude::*;
use regex::Regex;
use tracing::debug;

use konmari_core::{
    Category, Confidence, Diagnostic, EngineError, FileRecord, Finding, RepositorySnapshot, Signal,
    display_path,
};

use crate::classifier::{AnalysisContext, Classifier, ClassifierOutput};

/// A link found in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// 1-based line number.
    pub line: usize,
    pub target: String,
}

/// Where a link points once resolved against its document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    /// A URI with a scheme, a protocol-relative URL or an empty target.
    External,
    /// A `#fragment` within the same document.
    SameDocument { anchor: String },
    /// A repository path, relative to the root, with an optional fragment.
    Local { path: PathBuf, anchor: Option<String> },
    /// `..` segments climb above the repository root.
    OutsideRoot,
}

/// Decode `%XX` escapes. Malformed escapes are kept as written.
pub fn percent_decode(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(value) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(value);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Resolve `..` and `.` lexically. `None` when the path climbs above its base.
fn normalize(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    Some(out)
}

/// GitHub-style heading slug, without the duplicate suffix.
pub fn slugify(heading: &str) -> String {
    heading
        .trim()
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            ' ' => Some('-'),
            c if c.is_alphanumeric() || c == '-' || c == '_' => Some(c),
            _ => None,
        })
        .collect()
}

fn is_fence(line: &str) -> Option<&'static str> {
    let trimmed = line.trim_start();
    if trimmed.starts_with("```") {
        Some("```")
    } else if trimmed.starts_with("~~~") {
        Some("~~~")
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    Prose,
    FenceOpen,
    Code,
}

/// Every line with its 1-based number and its place relative to fences.
fn blocks(text: &str) -> impl Iterator<Item = (usize, &str, Block)> {
    let mut fence: Option<&'static str> = None;
    text.lines().enumerate().map(move |(index, line)| {
        let block = match (fence, is_fence(line)) {
            (None, Some(marker)) => {
                fence = Some(marker);
                Block::FenceOpen
            }
            (Some(open), Some(marker)) if open == marker => {
                fence = None;
                Block::Code
            }
            (Some(_), _) => Block::Code,
            (None, None) => Block::Prose,
        };
        (index + 1, line, block)
    })
}

/// Lines outside fenced code blocks.
fn prose_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    blocks(text).filter_map(|(line, raw, block)| (block == Block::Prose).then_some((line, raw)))
}

/// Flags links to files or anchors that do not exist.
#[derive(Debug, Clone)]
pub struct DocLinkClassifier {
    confidence: u8,
    inline_link: Regex,
    reference_def: Regex,
    code_span: Regex,
    scheme: Regex,
    atx_heading: Regex,
    setext_underline: Regex,
    html_anchor: Regex,
    heading_link: Regex,
    fence_label: Regex,
}

fn compile(pattern: &str) -> Result<Regex, EngineError> {
    Regex::new(pattern).map_err(|e| EngineError::config(format!("link pattern: {e}")))
}

impl DocLinkClassifier {
    pub fn new(confidence: u8) -> Result<Self, EngineError> {
        Ok(Self {
            confidence,
            inline_link: compile(
                r#"!?\[((?:[^\[\]]|\[[^\]]*\])*)\]\(\s*<?([^)\s>]*)>?(?:\s+["'(][^)]*)?\s*\)"#,
            )?,
            reference_def: compile(r"^\s{0,3}\[([^\]^][^\]]*)\]:\s*<?([^\s>]+)>?")?,
            code_span: compile(r"`+[^`]*`+")?,
            scheme: compile(r"^[A-Za-z][A-Za-z0-9+.-]*:")?,
            atx_heading: compile(r"^\s{0,3}#{1,6}\s+(.*?)\s*#*\s*$")?,
            setext_underline: compile(r"^\s{0,3}(=+|-+)\s*$")?,
            html_anchor: compile(r#"(?i)<[a-z][^>]*\b(?:id|name)\s*=\s*["']([^"']+)["']"#)?,
            heading_link: compile(r"\[([^\]]*)\]\([^)]*\)")?,
            fence_label: compile(r"^\s{0,3}(?:`{3,}|~{3,})\s*([\w-]+(?:\.[\w-]+)+)(?:\s|$)")?,
        })
    }

    /// Links outside fenced code blocks and inline code spans. An image
    /// nested in a link, as in a badge, yields both targets.
    pub fn extract_links(&self, text: &str) -> Vec<Link> {
        let mut links = Vec::new();
        for (line, raw) in prose_lines(text) {
            let stripped = self.code_span.replace_all(raw, "");
            if let Some(caps) = self.reference_def.captures(&stripped) {
                links.push(Link {
                    line,
                    target: caps[2].to_string(),
                });
                continue;
            }
            for caps in self.inline_link.captures_iter(&stripped) {
                links.extend(self.inline_link.captures_iter(&caps[1]).map(|inner| Link {
                    line,
                    target: inner[2].to_string(),
                }));
                links.push(Link {
                    line,
                    target: caps[2].to_string(),
                });
            }
        }
        links
    }

    /// File names used as fenced code block labels, as in ```` ```config.yaml ````.
    pub fn code_block_labels(&self, text: &str) -> Vec<Link> {
        blocks(text)
            .filter(|(_, _, block)| *block == Block::FenceOpen)
            .filter_map(|(line, raw, _)| {
                let caps = self.fence_label.captures(raw)?;
                Some(Link {
                    line,
                    target: caps[1].to_string(),
                })
            })
            .collect()
    }

    /// Anchors a document defines: heading slugs and HTML `id`/`name` values.
    pub fn anchors(&self, text: &str) -> HashSet<String> {
        let mut anchors = HashSet::new();
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut previous: Option<&str> = None;

        let mut add_heading = |heading: &str, anchors: &mut HashSet<String>| {
            let plain = self.heading_link.replace_all(heading, "$1");
            let plain: String = plain.chars().filter(|c| !matches!(c, '*' | '`')).collect();
            let base = slugify(&plain);
            let count = seen.entry(base.clone()).or_insert(0);
            let slug = match *count {
                0 => base,
                n => format!("{base}-{n}"),
            };
            *count += 1;
            anchors.insert(slug);
        };

        for (_, line) in prose_lines(text) {
            anchors.extend(
                self.html_anchor
                    .captures_iter(line)
                    .map(|c| c[1].to_lowercase()),
            );

            if let Some(caps) = self.atx_heading.captures(line) {
                add_heading(&caps[1], &mut anchors);
                previous = None;
                continue;
            }
            if self.setext_underline.is_match(line) {
                if let Some(text) = previous.take() {
                    add_heading(text, &mut anchors);
                    continue;
                }
            }
            previous = Some(line).filter(|l| !l.trim().is_empty());
        }
        anchors
    }

    /// Resolve a raw link target found in `document` (relative to the root).
    pub fn resolve(&self, document: &Path, target: &str) -> LinkTarget {
        let target = target.trim();
        if target.is_empty() || target.starts_with("//") || self.scheme.is_match(target) {
            return LinkTarget::External;
        }

        let (path_part, anchor) = match target.split_once('#') {
            Some((path, anchor)) => (path, Some(percent_decode(anchor))),
            None => (target, None),
        };
        let path_part = path_part.split('?').next().unwrap_or_default();

        if path_part.is_empty() {
            return match anchor {
                Some(anchor) if !anchor.is_empty() => LinkTarget::SameDocument { anchor },
                _ => LinkTarget::External,
            };
        }

        let decoded = percent_decode(path_part);
        let joined = match decoded.strip_prefix('/') {
            Some(rooted) => PathBuf::from(rooted),
            None => document
                .parent()
                .unwrap_or_else(|| Path::new(""))
                .join(&decoded),
        };

        match normalize(&joined) {
            Some(path) => LinkTarget::Local {
                path,
                anchor: anchor.filter(|a| !a.is_empty()),
            },
            None => LinkTarget::OutsideRoot,
        }
    }

    fn check_document(
        &self,
        snapshot: &RepositorySnapshot,
        record: &FileRecord,
        text: &str,
        anchors: &HashMap<PathBuf, HashSet<String>>,
        names: &HashSet<&str>,
    ) -> Vec<Finding> {
        let document = display_path(&record.path);
        let mut findings = Vec::new();
        let finding = |signal: Signal, reason: String| {
            Finding::new(
                document.clone(),
                Category::Documentation,
                Confidence::from(self.confidence),
                vec![signal],
                reason,
            )
        };

        for link in self.extract_links(text) {
            let (signal, reason) = match self.resolve(&record.path, &link.target) {
                LinkTarget::External | LinkTarget::OutsideRoot => continue,
                LinkTarget::SameDocument { anchor } => {
                    match anchors.get(&record.path) {
                        Some(known) if !known.contains(&anchor.to_lowercase()) => (
                            Signal::MissingAnchor,
                            format!("line {}: anchor `#{anchor}` not found in this document", link.line),
                        ),
                        _ => continue,
                    }
                }
                LinkTarget::Local { path, anchor } => {
                    let exists = path.as_os_str().is_empty()
                        || snapshot.contains(&path)
                        || snapshot.absolute(&path).exists();
                    if !exists {
                        (
                            Signal::BrokenLink,
                            format!(
                                "line {}: link to `{}` does not resolve ({} not found)",
                                link.line,
                                link.target,
                                display_path(&path)
                            ),
                        )
                    } else {
                        match (anchor, anchors.get(&path)) {
                            (Some(anchor), Some(known)) if !known.contains(&anchor.to_lowercase()) => (
                                Signal::MissingAnchor,
                                format!(
                                    "line {}: anchor `#{anchor}` not found in {}",
                                    link.line,
                                    display_path(&path)
                                ),
                            ),
                            _ => continue,
                        }
                    }
                }
            };

            findings.push(finding(signal, reason));
        }

        // Labels are bare file names, so any file with that name counts.
        for label in self.code_block_labels(text) {
            let found = names.contains(label.target.as_str())
                || snapshot.absolute(Path::new(&label.target)).exists()
                || matches!(
                    self.resolve(&record.path, &label.target),
                    LinkTarget::Local { path, .. } if snapshot.absolute(&path).exists()
                );
            if !found {
                findings.push(finding(
                    Signal::MissingCodeReference,
                    format!(
                        "line {}: code block labelled `{}` but no such file exists",
                        label.line, label.target
                    ),
                ));
            }
        }
        findings
    }
}

impl Classifier for DocLinkClassifier {
    fn category(&self) -> Category {
        Category::Documentation
    }

    fn classify(&self, ctx: &AnalysisContext<'_>) -> ClassifierOutput {
        let snapshot = ctx.snapshot;
        let documents: Vec<&FileRecord> = snapshot.files.iter().filter(|f| f.is_document()).collect();
        let names: HashSet<&str> = snapshot.files.iter().map(|f| f.name.as_str()).collect();

        let texts: Vec<(&FileRecord, Result<String, Diagnostic>)> = documents
            .par_iter()
            .map(|record| {
                let text = snapshot
                    .read_to_string(record)
                    .map_err(|e| Diagnostic::read_error(&record.path, &e));
                (*record, text)
            })
            .collect();

        let anchors: HashMap<PathBuf, HashSet<String>> = texts
            .par_iter()
            .filter(|(record, _)| record.is_markdown())
            .filter_map(|(record, text)| {
                let text = text.as_ref().ok()?;
                Some((record.path.clone(), self.anchors(text)))
            })
            .collect();

        let mut diagnostics = Vec::new();
        let mut findings = Vec::new();
        for (record, text) in &texts {
            match text {
                Ok(text) => {
                    findings.extend(self.check_document(snapshot, record, text, &anchors, &names))
                }
                Err(diag) => diagnostics.push(diag.clone()),
            }
        }

        debug!(
            documents = documents.len(),
            findings = findings.len(),
            "link check complete"
        );
        ClassifierOutput::new(findings, snapshot.coverage_status()).with_diagnostics(diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Fixture;

    fn classifier() -> DocLinkClassifier {
        DocLinkClassifier::new(55).unwrap()
    }

    #[test]
    fn test_extract_links_skips_code() {
        let text = "\
See [guide](docs/guide.md) and ![logo](img/logo.png \"Logo\").
`[not](a-link.md)` inline code
```
[also not](fenced.md)
```
[ref]: ../other.md#setup
[^1]: a footnote
";
        let links = classifier().extract_links(text);
        let targets: Vec<_> = links.iter().map(|l| l.target.as_str()).collect();
        assert_eq!(targets, vec!["docs/guide.md", "img/logo.png", "../other.md#setup"]);
        assert_eq!(links[2].line, 6);
    }

    #[test]
    fn test_resolve_targets() {
        let c = classifier();
        let doc = Path::new("docs/README.md");
        assert_eq!(c.resolve(doc, "https://example.com"), LinkTarget::External);
        assert_eq!(c.resolve(doc, "mailto:a@b.c"), LinkTarget::External);
        assert_eq!(c.resolve(doc, "//cdn.example.com/x.js"), LinkTarget::External);
        assert_eq!(
            c.resolve(doc, "#usage"),
            LinkTarget::SameDocument {
                anchor: "usage".into()
            }
        );
        assert_eq!(
            c.resolve(doc, "../src/My%20File.md#top"),
            LinkTarget::Local {
                path: PathBuf::from("src/My File.md"),
                anchor: Some("top".into())
            }
        );
        assert_eq!(
            c.resolve(doc, "/LICENSE?raw=true"),
            LinkTarget::Local {
                path: PathBuf::from("LICENSE"),
                anchor: None
            }
        );
        assert_eq!(c.resolve(doc, "../../outside.md"), LinkTarget::OutsideRoot);
    }

    #[test]
    fn test_anchor_slugs() {
        let text = "\
# Getting Started
## Install `konmari` *now*
## Getting Started
Setup Guide
===========
<a id=\"Custom-Anchor\"></a>
```
# not a heading
```
";
        let anchors = classifier().anchors(text);
        for slug in ["getting-started", "install-konmari-now", "getting-started-1", "setup-guide", "custom-anchor"] {
            assert!(anchors.contains(slug), "missing {slug}");
        }
        assert!(!anchors.contains("not-a-heading"));
    }

    #[test]
    fn test_percent_decode() {
        assert_eq!(percent_decode("a%20b"), "a b");
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%zz"), "%zz");
    }

    #[test]
    fn test_broken_links_and_anchors() {
        let readme = "\
# Project
[guide](docs/guide.md#install)
[missing](docs/missing.md)
[bad anchor](docs/guide.md#nowhere)
[self](#project)
[self bad](#gone)
[dir](docs/)
[site](https://example.com/missing.md)
";
        let fixture = Fixture::new(&[
            ("README.md", readme, 10),
            ("docs/guide.md", "# Guide\n## Install\n", 10),
        ]);
        let output = fixture.run(&classifier());

        let mut reasons: Vec<_> = output.findings.iter().map(|f| f.reason.as_str()).collect();
        reasons.sort();
        assert_eq!(reasons.len(), 3, "{reasons:?}");
        assert!(reasons[0].starts_with("line 3: link to `docs/missing.md`"));
        assert!(reasons[1].starts_with("line 4: anchor `#nowhere`"));
        assert!(reasons[2].starts_with("line 6: anchor `#gone`"));
        assert!(output.findings.iter().all(|f| f.target == "README.md"));
        assert!(output.findings.iter().all(|f| f.confidence.value() == 55));
    }

    #[test]
    fn test_badge_yields_image_and_link() {
        let text = "[![build](https://ci.example.com/badge.svg)](docs/status.md) [plain](a.md)\n";
        let links = classifier().extract_links(text);
        let targets: Vec<_> = links.iter().map(|l| l.target.as_str()).collect();
        assert_eq!(
            targets,
            vec!["https://ci.example.com/badge.svg", "docs/status.md", "a.md"]
        );
    }

    #[test]
    fn test_code_block_labels() {
        let text = "\
```config.yaml
key: value
```
```python
print('hi')
```
~~~scripts/run.sh extra
~~~
```not-a-label.
```
";
        let labels = classifier().code_block_labels(text);
        let targets: Vec<_> = labels.iter().map(|l| (l.line, l.target.as_str())).collect();
        assert_eq!(targets, vec![(1, "config.yaml")]);
    }

    #[test]
    fn test_missing_code_block_files_and_other_document_kinds() {
        let guide = "\
```settings.toml
debug = true
```
```removed_helper.py
def old(): ...
```
";
        let fixture = Fixture::new(&[
            ("docs/guide.md", guide, 10),
            ("config/settings.toml", "debug = true\n", 10),
            ("docs/manual.rst", "See [the badge](https://example.com) and [old](gone.md).\n", 10),
            ("NOTES.txt", "[ok](docs/guide.md)\n", 10),
        ]);
        let output = fixture.run(&classifier());

        let mut found: Vec<_> = output
            .findings
            .iter()
            .map(|f| (f.target.as_str(), f.signals[0]))
            .collect();
        found.sort_by_key(|(target, _)| *target);
        assert_eq!(
            found,
            vec![
                ("docs/guide.md", Signal::MissingCodeReference),
                ("docs/manual.rst", Signal::BrokenLink),
            ]
        );
        let reason = &output.findings.iter().find(|f| f.target == "docs/guide.md").unwrap().reason;
        assert!(reason.contains("`removed_helper.py`"));
    }

    #[test]
    fn test_badge_target_checked() {
        let fixture = Fixture::new(&[(
            "README.md",
            "[![ci](https://ci.example.com/b.svg)](docs/ci.md)\n",
            10,
        )]);
        let output = fixture.run(&classifier());
        assert_eq!(output.findings.len(), 1);
        assert!(output.findings[0].reason.contains("docs/ci.md"));
    }

    #[test]
    fn test_links_to_unscanned_files_on_disk_resolve() {
        let fixture = Fixture::new(&[("docs/index.md", "[logo](../assets/logo.svg)\n", 10)]);
        std::fs::create_dir_all(fixture.root().join("assets")).unwrap();
        std::fs::write(fixture.root().join("assets/logo.svg"), "<svg/>").unwrap();

        let output = fixture.run(&classifier());
        assert!(output.findings.is_empty());
    }
}
