//! Representative sampling for large repositories.

use std::cmp::Reverse;

use konmari_core::FileRecord;

use crate::ecosystem::is_marker_file;
use crate::names::NameClassifier;

/// Priority tier of a file when sampling. Lower is kept first.
fn sample_rank(record: &FileRecord, names: &NameClassifier) -> u8 {
    if is_marker_file(&record.name) {
        0
    } else if names.is_match(&record.name) {
        1
    } else {
        2
    }
}

/// Reduce `files` to at most `cap` records.
///
/// Manifest and workspace markers are kept first, then files whose names
/// match a stale or session pattern, then the most recently modified
/// files. The caller re-sorts the result by path.
pub fn select_sample(
    mut files: Vec<FileRecord>,
    cap: usize,
    names: &NameClassifier,
) -> Vec<FileRecord> {
    if files.len() <= cap {
        return files;
    }

    files.sort_by_cached_key(|f| (sample_rank(f, names), Reverse(f.modified), f.path.clone()));
    files.truncate(cap);
    files
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use konmari_core::PatternTables;

    use super::*;

    #[test]
    fn test_priority_order() {
        let names = NameClassifier::compile(&PatternTables::default()).unwrap();
        let now = SystemTime::now();
        let old = now - Duration::from_secs(400 * 86_400);

        let files = vec![
            FileRecord::new("src/recent.rs", 1, now),
            FileRecord::new("src/older.rs", 1, old),
            FileRecord::new("notes/old_plan.md", 1, old),
            FileRecord::new("package.json", 1, old),
        ];

        let sample = select_sample(files, 3, &names);
        let paths: Vec<_> = sample.iter().map(|f| f.display_path()).collect();

        assert_eq!(paths, vec!["package.json", "notes/old_plan.md", "src/recent.rs"]);
    }

    #[test]
    fn test_under_cap_untouched() {
        let names = NameClassifier::compile(&PatternTables::default()).unwrap();
        let files = vec![FileRecord::new("a.py", 1, SystemTime::now())];
        assert_eq!(select_sample(files, 10, &names).len(), 1);
    }
}
