//! Large text documents that are expensive to load into an assistant's context.

use rayon::prelude::*;
use tracing::debug;

use konmari_core::{
    Confidence, ContextAdvice, ContextConfig, ContextHeavyFile, Diagnostic, FileRecord,
    RepositorySnapshot,
};

/// Rough token estimate: four characters per token.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4
}

/// Measures documentation and data files against size thresholds.
///
/// The result is a recommendation list, not a set of findings: nothing it
/// reports is a deletion candidate.
#[derive(Debug, Clone)]
pub struct ContextHeavyScanner {
    config: ContextConfig,
}

impl ContextHeavyScanner {
    pub fn new(config: ContextConfig) -> Self {
        Self { config }
    }

    fn wants(&self, record: &FileRecord) -> bool {
        // Fewer bytes than the line limit cannot exceed either threshold.
        record.size >= self.config.max_lines as u64
            && record
                .extension()
                .is_some_and(|ext| self.config.extensions.iter().any(|e| *e == ext))
    }

    /// Measure one document. `None` when it is within both limits.
    pub fn measure(&self, path: String, text: &str) -> Option<ContextHeavyFile> {
        let lines = text.matches('\n').count() + 1;
        let estimated_tokens = estimate_tokens(text);
        let exceeds_lines = lines > self.config.max_lines;
        let exceeds_tokens = estimated_tokens > self.config.max_tokens;
        if !exceeds_lines && !exceeds_tokens {
            return None;
        }

        let recommendation = if lines > self.config.split_lines {
            ContextAdvice::ConsiderSplitting
        } else {
            ContextAdvice::Monitor
        };
        Some(ContextHeavyFile {
            path,
            lines,
            estimated_tokens,
            exceeds_lines,
            exceeds_tokens,
            recommendation,
            confidence: Confidence::from(self.config.confidence),
        })
    }

    /// The heaviest documents of the snapshot, largest estimate first.
    pub fn scan(&self, snapshot: &RepositorySnapshot) -> (Vec<ContextHeavyFile>, Vec<Diagnostic>) {
        let results: Vec<Result<Option<ContextHeavyFile>, Diagnostic>> = snapshot
            .files
            .par_iter()
            .filter(|record| self.wants(record))
            .map(|record| {
                let text = snapshot
                    .read_to_string(record)
                    .map_err(|e| Diagnostic::read_error(&record.path, &e))?;
                Ok(self.measure(record.display_path(), &text))
            })
            .collect();

        let mut heavy = Vec::new();
        let mut diagnostics = Vec::new();
        for result in results {
            match result {
                Ok(Some(file)) => heavy.push(file),
                Ok(None) => {}
                Err(diag) => diagnostics.push(diag),
            }
        }

        heavy.sort_by(|a, b| {
            b.estimated_tokens
                .cmp(&a.estimated_tokens)
                .then_with(|| a.path.cmp(&b.path))
        });
        heavy.truncate(self.config.limit);

        debug!(documents = heavy.len(), "context-heavy scan complete");
        (heavy, diagnostics)
    }
}
