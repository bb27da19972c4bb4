use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use konmari_core::{Ecosystem, MonorepoTool, PatternTables, WalkConfig};
use konmari_scan::{EcosystemDetector, NameClassifier, RepoWalker};

fn names() -> NameClassifier {
    NameClassifier::compile(&PatternTables::default()).unwrap()
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

#[test]
fn test_sampling_large_repository() {
    let temp = TempDir::new().unwrap();
    for dir in 0..12 {
        for file in 0..1_000 {
            write(temp.path(), &format!("d{dir}/f{file}.txt"), "");
        }
    }
    write(temp.path(), "package.json", "{}");
    write(temp.path(), "old_utils_backup.py", "");

    let walker = RepoWalker::new(WalkConfig::default()).unwrap();
    let snapshot = walker.walk(temp.path(), &names()).unwrap();

    assert!(snapshot.sampled);
    assert!(snapshot.is_large_repo);
    assert!(snapshot.file_count() <= 5_000);
    assert_eq!(snapshot.stats.total_discovered, 12_002);
    assert!(snapshot.contains(Path::new("package.json")));
    assert!(snapshot.contains(Path::new("old_utils_backup.py")));

    let mut sorted = snapshot.files.clone();
    sorted.sort_by(|a, b| a.path.cmp(&b.path));
    assert_eq!(sorted, snapshot.files);
}

#[test]
fn test_sampling_respects_configured_cap() {
    let temp = TempDir::new().unwrap();
    for file in 0..30 {
        write(temp.path(), &format!("src/f{file}.rs"), "");
    }

    let config = WalkConfig::builder()
        .large_repo_threshold(20usize)
        .sample_cap(10usize)
        .build()
        .unwrap();
    let snapshot = RepoWalker::new(config).unwrap().walk(temp.path(), &names()).unwrap();

    assert!(snapshot.sampled);
    assert_eq!(snapshot.file_count(), 10);
}

#[test]
fn test_small_repository_not_sampled() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "README.md", "# hi");

    let snapshot = RepoWalker::new(WalkConfig::default())
        .unwrap()
        .walk(temp.path(), &names())
        .unwrap();

    assert!(!snapshot.sampled);
    assert!(!snapshot.is_large_repo);
    assert!(!snapshot.truncated);
}

#[test]
fn test_hidden_dirs_included_when_configured() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), ".github/workflows/ci.yml", "");
    write(temp.path(), "main.go", "");

    let config = WalkConfig::builder().include_hidden_dirs(true).build().unwrap();
    let snapshot = RepoWalker::new(config).unwrap().walk(temp.path(), &names()).unwrap();
    assert!(snapshot.contains(Path::new(".github/workflows/ci.yml")));

    let snapshot = RepoWalker::new(WalkConfig::default())
        .unwrap()
        .walk(temp.path(), &names())
        .unwrap();
    assert!(!snapshot.contains(Path::new(".github/workflows/ci.yml")));
}

#[test]
fn test_polyglot_detection() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "requirements.txt", "requests\n");
    write(temp.path(), "package.json", "{}");
    write(temp.path(), "go.mod", "module example.com/x\n");
    write(temp.path(), "tools/Cargo.toml", "[package]\nname = \"t\"\n");

    let snapshot = RepoWalker::new(WalkConfig::default())
        .unwrap()
        .walk(temp.path(), &names())
        .unwrap();
    let detection = EcosystemDetector::new().detect(&snapshot);

    assert!(detection.ecosystems.contains(Ecosystem::Python));
    assert!(detection.ecosystems.contains(Ecosystem::Javascript));
    assert!(detection.ecosystems.contains(Ecosystem::Go));
    // Nested manifests only count inside a workspace.
    assert!(!detection.ecosystems.contains(Ecosystem::Rust));
    assert!(!detection.monorepo.is_monorepo);
}

#[test]
fn test_npm_workspaces() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "package.json", r#"{"workspaces": ["packages/*"]}"#);
    write(temp.path(), "packages/web/package.json", "{}");
    write(temp.path(), "packages/api/requirements.txt", "flask\n");
    write(temp.path(), "scripts/tool/package.json", "{}");

    let snapshot = RepoWalker::new(WalkConfig::default())
        .unwrap()
        .walk(temp.path(), &names())
        .unwrap();
    let detection = EcosystemDetector::new().detect(&snapshot);

    assert!(detection.monorepo.is_monorepo);
    assert_eq!(detection.monorepo.tools, vec![MonorepoTool::YarnWorkspaces]);
    assert_eq!(
        detection.monorepo.packages,
        vec![PathBuf::from("packages/api"), PathBuf::from("packages/web")]
    );
    assert_eq!(
        detection.ecosystems.manifests(Ecosystem::Javascript),
        &[PathBuf::from("package.json"), PathBuf::from("packages/web/package.json")]
    );
    assert!(detection.ecosystems.contains(Ecosystem::Python));
}

#[test]
fn test_cargo_and_pnpm_workspaces() {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "Cargo.toml",
        "[workspace]\nmembers = [\"crates/*\"]\nexclude = [\"crates/scratch\"]\n",
    );
    write(temp.path(), "crates/core/Cargo.toml", "[package]\nname = \"core\"\n");
    write(temp.path(), "crates/scratch/Cargo.toml", "[package]\nname = \"scratch\"\n");
    write(temp.path(), "pnpm-workspace.yaml", "packages:\n  - 'apps/*'\n");
    write(temp.path(), "apps/site/package.json", "{}");

    let snapshot = RepoWalker::new(WalkConfig::default())
        .unwrap()
        .walk(temp.path(), &names())
        .unwrap();
    let detection = EcosystemDetector::new().detect(&snapshot);

    assert!(detection.monorepo.tools.contains(&MonorepoTool::CargoWorkspace));
    assert!(detection.monorepo.tools.contains(&MonorepoTool::Pnpm));
    assert!(detection.ecosystems.contains(Ecosystem::Javascript));
    assert_eq!(
        detection.ecosystems.manifests(Ecosystem::Rust),
        &[PathBuf::from("Cargo.toml"), PathBuf::from("crates/core/Cargo.toml")]
    );
}

#[test]
fn test_package_json_count_heuristic() {
    let temp = TempDir::new().unwrap();
    for name in ["a", "b", "c", "d"] {
        write(temp.path(), &format!("{name}/package.json"), "{}");
    }

    let snapshot = RepoWalker::new(WalkConfig::default())
        .unwrap()
        .walk(temp.path(), &names())
        .unwrap();
    let detection = EcosystemDetector::new().detect(&snapshot);

    assert!(detection.monorepo.is_monorepo);
    assert!(detection.monorepo.tools.is_empty());
    assert_eq!(detection.monorepo.package_json_count, 4);
    assert_eq!(detection.ecosystems.manifests(Ecosystem::Javascript).len(), 4);
}

#[test]
fn test_malformed_lerna_falls_back_to_default_packages() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "lerna.json", "{ not json");
    write(temp.path(), "packages/ui/package.json", "{}");

    let snapshot = RepoWalker::new(WalkConfig::default())
        .unwrap()
        .walk(temp.path(), &names())
        .unwrap();
    let detection = EcosystemDetector::new().detect(&snapshot);

    assert_eq!(detection.diagnostics.len(), 1);
    assert!(detection.ecosystems.contains(Ecosystem::Javascript));
}
