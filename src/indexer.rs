use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use kdam::{BarExt, tqdm};
use tracing::{debug, info, warn};

use crate::{
    error::{Error, Result},
    recognizer::Recognizer,
    store::Store,
    walker::{self, DiscoveredFile},
};

/// Settings for one indexing run.
#[derive(Debug, Clone, Default)]
pub struct IndexOptions {
    /// OCR language codes passed to the recognizer for every file.
    pub languages: Vec<String>,
    /// Only files modified at or after this instant are considered.
    pub since: Option<DateTime<Utc>>,
    /// Draw a progress bar on stderr.
    pub show_progress: bool,
}

/// What happened during one indexing run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexReport {
    /// Image files found under the root.
    pub discovered: usize,
    /// Images dropped by the `since` cutoff.
    pub filtered_out: usize,
    /// Images recognized and stored during this run.
    pub indexed: usize,
    /// Images that were already in the store.
    pub skipped: usize,
    /// Images the recognizer could not process. They stay unindexed and
    /// are retried on the next run.
    pub failed: Vec<PathBuf>,
}

impl IndexReport {
    /// Number of images that went through the processing loop.
    pub fn candidates(&self) -> usize {
        self.discovered - self.filtered_out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Indexed,
    Skipped,
    Failed,
}

/// Keep only files modified at or after `cutoff`, compared at full
/// timestamp precision. Returns the survivors and how many were dropped.
pub fn filter_since(
    files: Vec<DiscoveredFile>,
    cutoff: Option<DateTime<Utc>>,
) -> (Vec<DiscoveredFile>, usize) {
    let Some(cutoff) = cutoff else {
        return (files, 0);
    };

    let before = files.len();
    let kept: Vec<_> =
        files.into_iter().filter(|f| f.mtime >= cutoff).collect();
    let dropped = before - kept.len();
    (kept, dropped)
}

/// Recognize and store every image under `root` that the store does not
/// know yet.
///
/// Files are processed one at a time in path order. A file the
/// recognizer fails on is reported and skipped; store errors other than
/// a duplicate key abort the run.
pub fn index_directory<R: Recognizer + ?Sized>(
    store: &Store,
    recognizer: &mut R,
    root: &Path,
    options: &IndexOptions,
) -> Result<IndexReport> {
    let discovered = walker::discover_files(root)?;
    let discovered_count = discovered.len();
    let (candidates, filtered_out) = filter_since(discovered, options.since);

    info!(
        root = %root.display(),
        discovered = discovered_count,
        candidates = candidates.len(),
        "starting index run"
    );

    let mut report = IndexReport {
        discovered: discovered_count,
        filtered_out,
        ..IndexReport::default()
    };

    let mut bar = options
        .show_progress
        .then(|| tqdm!(total = candidates.len()));

    for file in &candidates {
        if let Some(bar) = bar.as_mut() {
            bar.set_description(
                file.relative_path.to_string_lossy().into_owned(),
            );
        }

        match index_one(store, recognizer, file, &options.languages)? {
            Outcome::Indexed => report.indexed += 1,
            Outcome::Skipped => report.skipped += 1,
            Outcome::Failed => {
                let message = format!(
                    "Failed to process image: {}",
                    file.absolute_path.display()
                );
                // Lift the bar off stderr so the line lands above it.
                if let Some(bar) = bar.as_mut() {
                    bar.clear()?;
                }
                println!("{message}");
                if let Some(bar) = bar.as_mut() {
                    bar.refresh()?;
                }
                report.failed.push(file.absolute_path.clone());
            }
        }

        if let Some(bar) = bar.as_mut() {
            bar.update(1)?;
        }
    }

    if bar.is_some() {
        eprintln!();
    }

    info!(
        indexed = report.indexed,
        skipped = report.skipped,
        failed = report.failed.len(),
        "index run finished"
    );
    Ok(report)
}

fn index_one<R: Recognizer + ?Sized>(
    store: &Store,
    recognizer: &mut R,
    file: &DiscoveredFile,
    languages: &[String],
) -> Result<Outcome> {
    let key = file.key();

    if store.exists(&key)? {
        debug!(path = %key, "already indexed");
        return Ok(Outcome::Skipped);
    }

    let text = match recognizer.recognize(&file.absolute_path, languages) {
        Ok(text) => text,
        Err(e) => {
            warn!(path = %key, error = %e, "recognition failed");
            return Ok(Outcome::Failed);
        }
    };

    match store.insert(&key, &text) {
        Ok(()) => {
            debug!(path = %key, chars = text.len(), "indexed");
            Ok(Outcome::Indexed)
        }
        Err(Error::DuplicateKey(_)) => {
            debug!(path = %key, "indexed concurrently by another writer");
            Ok(Outcome::Skipped)
        }
        Err(e) => Err(e),
    }
}
