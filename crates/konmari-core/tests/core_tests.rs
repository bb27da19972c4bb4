use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use konmari_core::{
    AnalysisConfig, Category, CategoryReport, Confidence, Ecosystem, FileRecord, Finding,
    PassStatus, ReasonCode, RepositorySnapshot, Signal,
};

#[test]
fn test_config_roundtrips_through_json() {
    let config = AnalysisConfig::default();
    let text = serde_json::to_string(&config).unwrap();
    let parsed: AnalysisConfig = serde_json::from_str(&text).unwrap();

    assert_eq!(parsed.patterns, config.patterns);
    assert_eq!(parsed.scoring, config.scoring);
    assert_eq!(parsed.git, config.git);
}

#[test]
fn test_config_load_missing_file() {
    let err = AnalysisConfig::load(std::path::Path::new("/definitely/not/here.toml")).unwrap_err();
    assert!(err.to_string().contains("Invalid configuration"));
}

#[test]
fn test_snapshot_age_and_language() {
    let now = SystemTime::now();
    let old = now - Duration::from_secs(200 * 24 * 60 * 60);
    let snapshot = RepositorySnapshot::new(
        PathBuf::from("/repo"),
        vec![
            FileRecord::new("lib/main.go", 10, old),
            FileRecord::new("docs/guide.md", 10, now),
        ],
        true,
    );

    let go = snapshot.get(std::path::Path::new("lib/main.go")).unwrap();
    assert_eq!(go.age_days(now), 200);
    assert_eq!(go.language.and_then(|l| l.ecosystem()), Some(Ecosystem::Go));
    assert!(snapshot.has_version_control);
}

#[test]
fn test_category_report_counts() {
    let finding = Finding::new(
        "old_notes.md",
        Category::DeadFiles,
        Confidence::from_score(75),
        vec![Signal::StalePattern, Signal::AgeOver90],
        "matches stale name pattern",
    );
    let report = CategoryReport::new(Category::DeadFiles, vec![finding], PassStatus::Complete);
    assert_eq!(report.count, 1);
    assert_eq!(report.name, "Dead Files");

    let skipped = CategoryReport::skipped(Category::Dependencies, ReasonCode::ManifestParseError);
    assert!(skipped.is_empty());
    assert!(!skipped.status.is_complete());
}

#[test]
fn test_config_load_from_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("konmari.toml");
    std::fs::write(&path, "[git]\nwindow_days = 14\n\n[walk]\nlarge_repo_threshold = 500\n").unwrap();

    let config = AnalysisConfig::load(&path).unwrap();
    assert_eq!(config.git.window_days, 14);
    assert_eq!(config.walk.large_repo_threshold, 500);
}
