//! Fixtures shared by the classifier unit tests.

use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use konmari_core::{EcosystemSet, FileRecord, RepositorySnapshot};
use tempfile::TempDir;

use crate::classifier::{AnalysisContext, Classifier, ClassifierOutput};
use crate::manifest::{ManifestFormat, ManifestIndex};

pub const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// A temporary repository plus the snapshot and manifests derived from it.
pub struct Fixture {
    pub dir: TempDir,
    pub snapshot: RepositorySnapshot,
    pub ecosystems: EcosystemSet,
    pub manifests: ManifestIndex,
    pub now: SystemTime,
}

impl Fixture {
    /// Write `files` as `(path, contents, age in days)`.
    pub fn new(files: &[(&str, &str, u64)]) -> Self {
        let dir = TempDir::new().unwrap();
        let now = SystemTime::now();
        let mut records = Vec::new();
        let mut ecosystems = EcosystemSet::new();

        for (path, body, age) in files {
            let full = dir.path().join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(&full, body).unwrap();
            let record = FileRecord::new(*path, body.len() as u64, now - DAY * (*age as u32));
            if let Some(format) = ManifestFormat::from_file_name(&record.name) {
                ecosystems.insert(format.ecosystem(), record.path.clone());
            }
            records.push(record);
        }

        let snapshot = RepositorySnapshot::new(dir.path().to_path_buf(), records, false);
        let manifests = ManifestIndex::load(&snapshot, &ecosystems);
        Self {
            dir,
            snapshot,
            ecosystems,
            manifests,
            now,
        }
    }

    pub fn context(&self) -> AnalysisContext<'_> {
        AnalysisContext {
            snapshot: &self.snapshot,
            ecosystems: &self.ecosystems,
            manifests: &self.manifests,
            now: self.now,
        }
    }

    pub fn run(&self, classifier: &dyn Classifier) -> ClassifierOutput {
        classifier.classify(&self.context())
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }
}
