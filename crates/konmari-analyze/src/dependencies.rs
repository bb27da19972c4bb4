//! Orphaned dependency detection: declared in a manifest, never imported.

use std::collections::BTreeSet;

use itertools::Itertools;
use rayon::prelude::*;
use tracing::{debug, warn};

use konmari_core::{
    Category, Confidence, Diagnostic, Ecosystem, EngineError, FileRecord, Finding, Language,
    PassStatus, ReasonCode, ScoringConfig, Signal, display_path,
};

use crate::classifier::{AnalysisContext, Classifier, ClassifierOutput};
use crate::imports::{
    ImportScanner, PythonImports, go_module_used, js_declared_used, python_import_names, rust_crate_used,
};
use crate::manifest::normalize_package;

/// Names referenced by the sources of one ecosystem.
#[derive(Debug, Default)]
struct References {
    names: BTreeSet<String>,
    /// Every file was read through a syntax tree.
    syntax_tree: bool,
    diagnostics: Vec<Diagnostic>,
}

impl References {
    fn scan_signal(&self) -> Signal {
        if self.syntax_tree {
            Signal::AstImportScan
        } else {
            Signal::PatternImportScan
        }
    }
}

fn languages(ecosystem: Ecosystem) -> &'static [Language] {
    match ecosystem {
        Ecosystem::Python => &[Language::Python],
        Ecosystem::Javascript => &[Language::JavaScript, Language::TypeScript],
        Ecosystem::Go => &[Language::Go],
        Ecosystem::Rust => &[Language::Rust],
    }
}

/// Flags manifest dependencies that no source file imports.
#[derive(Debug, Clone)]
pub struct DependencyClassifier {
    scanner: ImportScanner,
    scoring: ScoringConfig,
}

impl DependencyClassifier {
    pub fn new(scoring: ScoringConfig) -> Result<Self, EngineError> {
        Ok(Self {
            scanner: ImportScanner::new()?,
            scoring,
        })
    }

    fn references(&self, ctx: &AnalysisContext<'_>, ecosystem: Ecosystem) -> References {
        let files: Vec<&FileRecord> = ctx
            .snapshot
            .files
            .iter()
            .filter(|f| f.language.is_some_and(|l| languages(ecosystem).contains(&l)))
            .collect();

        let results: Vec<Result<(BTreeSet<String>, bool), Diagnostic>> = if ecosystem
            == Ecosystem::Python
        {
            files
                .par_iter()
                .map_init(
                    || PythonImports::new().ok(),
                    |parser, record| {
                        let source = ctx
                            .snapshot
                            .read_to_string(record)
                            .map_err(|e| Diagnostic::read_error(&record.path, &e))?;
                        Ok(match parser.as_mut().and_then(|p| p.modules(&source)) {
                            Some(modules) => (modules, true),
                            None => (self.scanner.references(Language::Python, &source), false),
                        })
                    },
                )
                .collect()
        } else {
            files
                .par_iter()
                .map(|record| {
                    let source = ctx
                        .snapshot
                        .read_to_string(record)
                        .map_err(|e| Diagnostic::read_error(&record.path, &e))?;
                    let language = record.language.unwrap_or(Language::JavaScript);
                    Ok((self.scanner.references(language, &source), false))
                })
                .collect()
        };

        let mut refs = References {
            syntax_tree: ecosystem == Ecosystem::Python,
            ..References::default()
        };
        for result in results {
            match result {
                Ok((names, parsed)) => {
                    refs.syntax_tree &= parsed;
                    refs.names.extend(names);
                }
                Err(diag) => refs.diagnostics.push(diag),
            }
        }
        if ecosystem == Ecosystem::Python && !refs.syntax_tree && !files.is_empty() {
            warn!("python grammar unavailable, fell back to pattern import scan");
        }
        refs
    }

    fn is_used(ecosystem: Ecosystem, package: &str, refs: &References) -> bool {
        match ecosystem {
            Ecosystem::Python => python_import_names(package)
                .iter()
                .any(|name| refs.names.contains(name)),
            Ecosystem::Javascript => js_declared_used(package, &refs.names),
            Ecosystem::Go => go_module_used(package, &refs.names),
            Ecosystem::Rust => rust_crate_used(package, &refs.names),
        }
    }

    fn orphans(&self, ctx: &AnalysisContext<'_>, ecosystem: Ecosystem, refs: &References) -> Vec<Finding> {
        let confidence = Confidence::from(self.scoring.dependency_base(ecosystem));

        // First declaration wins when several manifests name the same package.
        ctx.manifests
            .declared(ecosystem)
            .filter(|(_, dep)| dep.expects_import())
            .unique_by(|(_, dep)| normalize_package(&dep.name))
            .filter(|(_, dep)| !Self::is_used(ecosystem, &dep.name, refs))
            .map(|(manifest, dep)| {
                Finding::new(
                    dep.name.clone(),
                    Category::Dependencies,
                    confidence,
                    vec![Signal::NotImported, refs.scan_signal()],
                    format!(
                        "declared in {} ({}) but never imported by {} sources; \
                         tooling, plugin and transitive use is not visible to import scanning",
                        display_path(&manifest.path),
                        dep.section,
                        ecosystem
                    ),
                )
            })
            .collect()
    }
}

impl Classifier for DependencyClassifier {
    fn category(&self) -> Category {
        Category::Dependencies
    }

    fn classify(&self, ctx: &AnalysisContext<'_>) -> ClassifierOutput {
        let mut status = ctx.snapshot.coverage_status();
        let mut findings = Vec::new();
        let mut diagnostics = Vec::new();

        for ecosystem in ctx.ecosystems.ecosystems() {
            if ctx.manifests.has_failure(ecosystem) {
                debug!(%ecosystem, "skipping dependency check after manifest parse failure");
                status = PassStatus::Partial {
                    reason: ReasonCode::ManifestParseError,
                }
                .degrade(status);
                continue;
            }

            let refs = self.references(ctx, ecosystem);
            let orphans = self.orphans(ctx, ecosystem, &refs);
            debug!(
                %ecosystem,
                references = refs.names.len(),
                orphans = orphans.len(),
                "dependency scan complete"
            );
            findings.extend(orphans);
            diagnostics.extend(refs.diagnostics);
        }

        ClassifierOutput::new(findings, status).with_diagnostics(diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Fixture;

    fn classifier() -> DependencyClassifier {
        DependencyClassifier::new(ScoringConfig::default()).unwrap()
    }

    fn targets(output: &ClassifierOutput) -> Vec<&str> {
        let mut t: Vec<_> = output.findings.iter().map(|f| f.target.as_str()).collect();
        t.sort();
        t
    }

    #[test]
    fn test_unused_javascript_package() {
        let fixture = Fixture::new(&[
            (
                "package.json",
                r#"{"dependencies": {"lodash": "^4", "react": "^18"}, "devDependencies": {"@types/react": "^18"}}"#,
                10,
            ),
            ("src/app.jsx", "import React from 'react';\n", 10),
        ]);
        let output = fixture.run(&classifier());

        assert_eq!(targets(&output), vec!["lodash"]);
        let finding = &output.findings[0];
        assert_eq!(finding.confidence.value(), 60);
        assert_eq!(finding.signals, vec![Signal::NotImported, Signal::PatternImportScan]);
        assert!(finding.reason.contains("package.json"));
        assert!(output.status.is_complete());
    }

    #[test]
    fn test_python_imports_use_syntax_tree_and_aliases() {
        let fixture = Fixture::new(&[
            ("requirements.txt", "requests\nPyYAML>=6\nbeautifulsoup4\nunused-lib==1.0\n", 10),
            (
                "app/main.py",
                "import requests\nimport yaml\nfrom bs4 import BeautifulSoup\n# import unused_lib\nx = 'import unused_lib'\n",
                10,
            ),
        ]);
        let output = fixture.run(&classifier());

        assert_eq!(targets(&output), vec!["unused-lib"]);
        let finding = &output.findings[0];
        assert_eq!(finding.confidence.value(), 65);
        assert!(finding.has_signal(Signal::AstImportScan));
    }

    #[test]
    fn test_parse_failure_omits_only_that_ecosystem() {
        let fixture = Fixture::new(&[
            ("package.json", "{ \"dependencies\": ", 10),
            ("requirements.txt", "flask\n", 10),
            ("index.js", "const x = 1;\n", 10),
        ]);
        let output = fixture.run(&classifier());

        assert_eq!(targets(&output), vec!["flask"]);
        assert_eq!(
            output.status,
            PassStatus::Partial {
                reason: ReasonCode::ManifestParseError
            }
        );
    }

    #[test]
    fn test_go_indirect_requirements_are_not_orphans() {
        let go_mod = "module example.com/app\n\nrequire (\n\tgithub.com/pkg/errors v0.9.1\n\tgithub.com/stretchr/testify v1.9.0\n\tgithub.com/davecgh/go-spew v1.1.1 // indirect\n)\n";
        let fixture = Fixture::new(&[
            ("go.mod", go_mod, 10),
            ("main.go", "package main\n\nimport \"github.com/pkg/errors\"\n", 10),
        ]);
        let output = fixture.run(&classifier());

        assert_eq!(targets(&output), vec!["github.com/stretchr/testify"]);
    }

    #[test]
    fn test_build_backend_requirements_are_not_orphans() {
        let pyproject = "[build-system]\nrequires = [\"setuptools>=61\", \"wheel\"]\nbuild-backend = \"setuptools.build_meta\"\n\n[project]\nname = \"demo\"\ndependencies = [\"httpx\", \"rich\"]\n";
        let fixture = Fixture::new(&[
            ("pyproject.toml", pyproject, 10),
            ("demo/cli.py", "import httpx\n", 10),
        ]);
        let output = fixture.run(&classifier());

        assert_eq!(targets(&output), vec!["rich"]);
    }

    #[test]
    fn test_rust_renamed_and_hyphenated_crates() {
        let cargo = "[package]\nname = \"demo\"\n\n[dependencies]\nserde-json = \"1\"\nfoo = { package = \"bar\", version = \"1\" }\nunused = \"1\"\n";
        let fixture = Fixture::new(&[
            ("Cargo.toml", cargo, 10),
            ("src/main.rs", "use foo::Thing;\nfn main() { serde_json::json!(1); }\n", 10),
        ]);
        let output = fixture.run(&classifier());

        assert_eq!(targets(&output), vec!["unused"]);
    }

    #[test]
    fn test_same_package_in_two_manifests_reported_once() {
        let fixture = Fixture::new(&[
            ("requirements.txt", "click\n", 10),
            ("requirements-dev.txt", "click\n", 10),
        ]);
        let output = fixture.run(&classifier());
        assert_eq!(targets(&output), vec!["click"]);
    }
}
