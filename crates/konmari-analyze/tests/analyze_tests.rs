use std::fs::{self, File};
use std::path::Path;
use std::time::{Duration, SystemTime};

use chrono::Utc;
use git2::{Repository, Signature, Time};
use tempfile::TempDir;

use konmari_analyze::Engine;
use konmari_core::{
    AnalysisConfig, AnalysisOutcome, AnalysisReport, Category, ConfidenceBand, ContextAdvice,
    DiagnosticKind, PassStatus, ReasonCode, Signal, WalkConfig,
};
use konmari_git::{BranchInfo, CommitInfo, MemoryBackend, VcsError, VersionControl};

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

fn write(root: &Path, path: &str, contents: &str, age_days: u32) {
    let full = root.join(path);
    fs::create_dir_all(full.parent().unwrap()).unwrap();
    fs::write(&full, contents).unwrap();
    let file = File::options().write(true).open(&full).unwrap();
    file.set_modified(SystemTime::now() - DAY * age_days).unwrap();
}

fn analyze(root: &Path) -> AnalysisReport {
    Engine::new(AnalysisConfig::default())
        .unwrap()
        .analyze(root)
        .unwrap()
}

fn scenario() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(root, "old_utils_backup.py", "def helper():\n    return 1\n", 180);
    write(root, "temp_debug.js", "console.log('debug');\n", 5);
    write(root, "package.json", r#"{"name": "demo", "dependencies": {"lodash": "^4.17.21"}}"#, 40);
    write(root, "src/index.js", "module.exports = () => 42;\n", 40);
    temp
}

#[test]
fn test_end_to_end_scenario() {
    let temp = scenario();
    let report = analyze(temp.path());

    let backup = report
        .finding(Category::DeadFiles, "old_utils_backup.py")
        .expect("backup file flagged");
    assert!(backup.confidence.value() >= 80);
    assert_eq!(backup.band(), ConfidenceBand::QuickWin);
    assert!(report.summary.quick_wins.iter().any(|f| f.target == "old_utils_backup.py"));

    let debug = report
        .finding(Category::DeadFiles, "temp_debug.js")
        .expect("recent temp file still listed");
    assert!(debug.confidence.value() < 50);
    assert!(debug.has_signal(Signal::ModifiedWithin14Days));

    let lodash = report
        .finding(Category::Dependencies, "lodash")
        .expect("unused dependency flagged");
    assert_eq!(lodash.band(), ConfidenceBand::DecisionNeeded);
    assert!(lodash.has_signal(Signal::NotImported));

    assert!(!report.cleanliness.is_clean);
    assert!(report.cleanliness.nearly_clean);
    assert_eq!(report.file_count, 4);
}

#[test]
fn test_no_git_repository() {
    let temp = scenario();
    let report = analyze(temp.path());

    assert!(!report.has_git);
    assert!(report.git_archaeology.is_none());
    assert_eq!(
        report.archaeology_status,
        PassStatus::Skipped {
            reason: ReasonCode::NoVersionControl
        }
    );
    assert_eq!(report.categories.iter().count(), 5);
    assert!(report.categories.iter().all(|c| c.status.is_complete()));

    let json = serde_json::to_value(&report).unwrap();
    assert!(json["git_archaeology"].is_null());
    assert_eq!(json["has_git"], false);
    assert!(json["categories"]["2_dependencies"]["items"].is_array());
}

#[test]
fn test_repeated_runs_are_identical() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(root, "src/report.py", "import os\n", 20);
    write(root, "src/report_old.py", "import os\n", 300);
    write(root, "src/report_v2.py", "import os\n", 200);
    write(root, "lib/report copy.py", "import os\n", 100);
    write(root, "notes_scratch.md", "# Notes\n", 120);

    let engine = Engine::new(AnalysisConfig::default()).unwrap();
    let first = engine.analyze(root).unwrap();
    let second = engine.analyze(root).unwrap();

    let first_json = serde_json::to_value(&first.categories).unwrap();
    let second_json = serde_json::to_value(&second.categories).unwrap();
    assert_eq!(first_json, second_json);

    // The most recently modified member is the one kept.
    let dead = first.category(Category::DeadFiles);
    assert!(dead.items.iter().any(|f| f.has_signal(Signal::Duplicate)));
    assert!(dead.items.iter().all(|f| f.target != "src/report.py"));
}

#[test]
fn test_imported_dependencies_never_flagged() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(
        root,
        "package.json",
        r#"{"dependencies": {"express": "^4", "@aws-sdk/client-s3": "^3", "chalk": "^5", "unused-thing": "1"}}"#,
        40,
    );
    write(root, "requirements.txt", "requests\nPyYAML\n", 40);
    write(root, "server.ts", "import express from 'express';\nimport { S3 } from '@aws-sdk/client-s3/dist';\n", 40);
    write(root, "cli.mjs", "const chalk = await import('chalk');\n", 40);
    write(root, "app/main.py", "import requests\nfrom yaml import safe_load\n", 40);

    let report = analyze(root);
    let deps = report.category(Category::Dependencies);
    let targets: Vec<_> = deps.items.iter().map(|f| f.target.as_str()).collect();
    assert_eq!(targets, vec!["unused-thing"]);
}

#[test]
fn test_documentation_links() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(root, "docs/good.md", "See [the api](api.md).\n", 40);
    write(root, "docs/api.md", "# API\n", 40);
    write(root, "docs/bad.md", "See [gone](removed.md).\n", 40);

    let report = analyze(root);
    let docs = report.category(Category::Documentation);

    assert!(docs.items.iter().all(|f| f.target != "docs/good.md"));
    let bad: Vec<_> = docs.items.iter().filter(|f| f.target == "docs/bad.md").collect();
    assert_eq!(bad.len(), 1);
    assert!(bad[0].has_signal(Signal::BrokenLink));
    assert_eq!(bad[0].confidence.value(), 55);
}

#[test]
fn test_manifest_parse_failure_is_partial() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(root, "package.json", "{ \"dependencies\": {", 40);
    write(root, "index.js", "require('left-pad');\n", 40);

    let report = analyze(root);
    let deps = report.category(Category::Dependencies);
    assert!(deps.items.is_empty());
    assert_eq!(
        deps.status,
        PassStatus::Partial {
            reason: ReasonCode::ManifestParseError
        }
    );
    assert!(report
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::ManifestParse));
}

#[test]
fn test_sampled_findings_are_tagged() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    for i in 0..30 {
        write(root, &format!("src/file_{i:02}.rs"), "fn main() {}\n", 10);
    }
    write(root, "main_old.rs", "fn main() {}\n", 200);

    let walk = WalkConfig::builder()
        .large_repo_threshold(20usize)
        .sample_cap(10usize)
        .build()
        .unwrap();
    let config = AnalysisConfig::builder().walk(walk).build().unwrap();
    let report = Engine::new(config).unwrap().analyze(root).unwrap();

    assert!(report.sampled);
    assert!(report.is_large_repo);
    assert_eq!(report.file_count, 10);
    assert_eq!(report.discovered_file_count, 31);

    let dead = report.category(Category::DeadFiles);
    assert_eq!(
        dead.status,
        PassStatus::Partial {
            reason: ReasonCode::Sampled
        }
    );
    let old = report.finding(Category::DeadFiles, "main_old.rs").unwrap();
    assert!(old.has_signal(Signal::PartialScan));
}

#[test]
fn test_invalid_root_outcome() {
    let engine = Engine::new(AnalysisConfig::default()).unwrap();
    let outcome = engine.outcome(Path::new("/definitely/not/a/repo"));
    assert!(outcome.is_error());

    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["error"]["kind"], "invalid_root");
    assert!(matches!(outcome, AnalysisOutcome::Failed { .. }));
}

#[test]
fn test_archaeology_with_memory_backend() {
    let temp = scenario();
    Repository::init(temp.path()).unwrap();

    let now = Utc::now();
    let engine = Engine::new(AnalysisConfig::default())
        .unwrap()
        .with_vcs_opener(move |_| {
            let backend = MemoryBackend::new()
                .with_commit(CommitInfo::new("a1", "Add cache\n\nGenerated with Claude Code", "dev", now))
                .with_commit(CommitInfo::new("b2", "tweak spacing", "dev", now))
                .with_branch(BranchInfo::local("wip-cache", Some(now - chrono::Duration::days(3))));
            Ok(Box::new(backend) as Box<dyn VersionControl>)
        });
    let report = engine.analyze(temp.path()).unwrap();

    assert!(report.has_git);
    assert!(report.archaeology_status.is_complete());
    let git = report.git_archaeology.unwrap();
    assert_eq!(git.total_commits, 2);
    assert_eq!(git.ai_commit_count, 1);
    assert!((git.ai_commit_ratio - 0.5).abs() < f64::EPSILON);
    assert_eq!(git.stale_branches[0].name, "wip-cache");
}

#[test]
fn test_unopenable_repository_is_skipped() {
    let temp = scenario();
    Repository::init(temp.path()).unwrap();

    let engine = Engine::new(AnalysisConfig::default())
        .unwrap()
        .with_vcs_opener(|path| {
            Err(VcsError::Unavailable {
                path: path.to_path_buf(),
                reason: "corrupt".to_string(),
            })
        });
    let report = engine.analyze(temp.path()).unwrap();

    assert!(report.git_archaeology.is_none());
    assert_eq!(
        report.archaeology_status,
        PassStatus::Skipped {
            reason: ReasonCode::BackendError
        }
    );
    assert!(report
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::VersionControl));
    assert!(report.finding(Category::DeadFiles, "old_utils_backup.py").is_some());
}

#[test]
fn test_real_git_repository() {
    let temp = scenario();
    let repo = Repository::init(temp.path()).unwrap();

    let mut index = repo.index().unwrap();
    index.add_path(Path::new("package.json")).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let signature = Signature::new("Dev", "dev@example.com", &Time::new(Utc::now().timestamp(), 0)).unwrap();
    repo.commit(
        Some("HEAD"),
        &signature,
        &signature,
        "Add package\n\nCo-Authored-By: Claude <noreply@example.com>",
        &tree,
        &[],
    )
    .unwrap();

    let report = analyze(temp.path());
    assert!(report.has_git);
    let git = report.git_archaeology.unwrap();
    assert_eq!(git.total_commits, 1);
    assert_eq!(git.ai_commit_count, 1);
}

#[test]
fn test_subdirectory_of_repository() {
    let temp = TempDir::new().unwrap();
    let repo = Repository::init(temp.path()).unwrap();
    write(temp.path(), "pkg/a.py", "import os\n", 10);

    let mut index = repo.index().unwrap();
    index.add_path(Path::new("pkg/a.py")).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let signature = Signature::new("Dev", "dev@example.com", &Time::new(Utc::now().timestamp(), 0)).unwrap();
    repo.commit(Some("HEAD"), &signature, &signature, "Add package", &tree, &[])
        .unwrap();

    let report = analyze(&temp.path().join("pkg"));
    assert!(report.has_git);
    assert!(report.archaeology_status.is_complete());
    assert_eq!(report.git_archaeology.unwrap().total_commits, 1);
    assert_eq!(report.file_count, 1);
}

#[test]
fn test_context_heavy_documents_reported() {
    let temp = scenario();
    write(temp.path(), "docs/handbook.md", &"A line of guidance.\n".repeat(1_100), 10);
    write(temp.path(), "docs/short.md", "# Short\n", 10);

    let report = analyze(temp.path());
    assert_eq!(report.summary.context_heavy_count, 1);
    let heavy = &report.context_heavy_files[0];
    assert_eq!(heavy.path, "docs/handbook.md");
    assert!(heavy.exceeds_lines);
    assert!(heavy.exceeds_tokens);
    assert_eq!(heavy.recommendation, ContextAdvice::ConsiderSplitting);
    assert_eq!(heavy.confidence.value(), 50);

    // Recommendations only: never a finding, never counted against cleanliness.
    assert!(report.finding(Category::DeadFiles, "docs/handbook.md").is_none());
    assert_eq!(report.cleanliness, analyze(scenario().path()).cleanliness);
}

#[test]
fn test_disabled_archaeology() {
    let temp = scenario();
    Repository::init(temp.path()).unwrap();

    let mut config = AnalysisConfig::default();
    config.git.enabled = false;
    let report = Engine::new(config).unwrap().analyze(temp.path()).unwrap();

    assert!(report.has_git);
    assert_eq!(
        report.archaeology_status,
        PassStatus::Skipped {
            reason: ReasonCode::Disabled
        }
    );
}
