use crate::config::BatchFailurePolicy;
use crate::foundation::error::{StrokeError, StrokeResult};
use crate::scene::spec::RenderSpec;
use crate::session::progress::{PROGRESS_CAP, ProgressCallback};
use std::collections::HashSet;
use std::future::Future;
use std::io::{Cursor, Write as _};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Result of a batch: a zip archive holding one media file per successful entry.
#[derive(Clone, Debug, Default)]
pub struct BatchArchive {
    /// The zip archive.
    pub bytes: Vec<u8>,
    /// Archive entry names in insertion order.
    pub entries: Vec<String>,
    /// Entries that failed and were skipped.
    pub skipped: Vec<SkippedEntry>,
}

/// A batch entry left out of the archive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedEntry {
    pub index: usize,
    pub word: String,
    pub error: String,
}

/// Stops a batch before its next entry. The entry in flight always completes.
#[derive(Clone, Debug, Default)]
pub struct BatchCancel(Arc<AtomicBool>);

impl BatchCancel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Batch-wide progress: finished jobs plus the running job's own fraction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BatchState {
    pub total: usize,
    pub completed: usize,
    pub current_fraction: f64,
}

impl BatchState {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            completed: 0,
            current_fraction: 0.0,
        }
    }

    pub fn overall(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        let done = self.completed as f64 + self.current_fraction.clamp(0.0, 1.0);
        (done / self.total as f64).min(1.0)
    }
}

/// Zip writer with stored entries and collision-free names.
pub struct ArchiveWriter {
    zip: zip::ZipWriter<Cursor<Vec<u8>>>,
    names: HashSet<String>,
    entries: Vec<String>,
}

impl ArchiveWriter {
    pub fn new() -> Self {
        Self {
            zip: zip::ZipWriter::new(Cursor::new(Vec::new())),
            names: HashSet::new(),
            entries: Vec::new(),
        }
    }

    /// Add a file named `{stem}.{ext}` (or `{stem}_2.{ext}`, ... when taken). Returns the name.
    pub fn add(&mut self, stem: &str, ext: &str, bytes: &[u8]) -> StrokeResult<String> {
        let name = unique_name(stem, ext, &self.names);
        // Media is already compressed.
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored)
            .large_file(bytes.len() as u64 >= u64::from(u32::MAX));
        self.zip
            .start_file(name.clone(), options)
            .map_err(|e| StrokeError::archive(format!("start entry '{name}': {e}")))?;
        self.zip
            .write_all(bytes)
            .map_err(|e| StrokeError::archive(format!("write entry '{name}': {e}")))?;
        self.names.insert(name.clone());
        self.entries.push(name.clone());
        Ok(name)
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn finish(self) -> StrokeResult<(Vec<u8>, Vec<String>)> {
        let cursor = self
            .zip
            .finish()
            .map_err(|e| StrokeError::archive(format!("finish archive: {e}")))?;
        Ok((cursor.into_inner(), self.entries))
    }
}

impl Default for ArchiveWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// `{stem}.{ext}`, or the first free `{stem}_{n}.{ext}` for `n >= 2`.
pub fn unique_name(stem: &str, ext: &str, taken: &HashSet<String>) -> String {
    let first = format!("{stem}.{ext}");
    if !taken.contains(&first) {
        return first;
    }
    (2..)
        .map(|n| format!("{stem}_{n}.{ext}"))
        .find(|name| !taken.contains(name))
        .unwrap_or(first)
}

/// Run `specs` strictly one after another through `run_job` and collect the results.
///
/// `run_job` receives each spec with a per-job progress callback that feeds the batch-wide
/// fraction. Reports stay below 1.0 until the archive is finished. The final report is
/// exactly 1.0 whenever the batch returns `Ok`.
#[tracing::instrument(skip_all, fields(total = specs.len(), ?policy))]
pub async fn run_batch<F, Fut>(
    specs: &[RenderSpec],
    extension: &str,
    policy: BatchFailurePolicy,
    cancel: &BatchCancel,
    on_progress: ProgressCallback,
    mut run_job: F,
) -> StrokeResult<BatchArchive>
where
    F: FnMut(RenderSpec, ProgressCallback) -> Fut,
    Fut: Future<Output = StrokeResult<Vec<u8>>>,
{
    let state = Arc::new(Mutex::new(BatchState::new(specs.len())));
    let mut archive = ArchiveWriter::new();
    let mut skipped = Vec::new();

    for (index, spec) in specs.iter().enumerate() {
        if cancel.is_cancelled() {
            tracing::info!(index, "batch cancelled");
            break;
        }

        let job_progress: ProgressCallback = {
            let state = state.clone();
            let on_progress = on_progress.clone();
            Arc::new(move |f| {
                let overall = {
                    let mut st = state.lock().unwrap_or_else(PoisonError::into_inner);
                    st.current_fraction = st.current_fraction.max(f);
                    st.overall().min(PROGRESS_CAP)
                };
                on_progress(overall);
            })
        };

        match run_job(spec.clone(), job_progress).await {
            Ok(bytes) => {
                let name = archive.add(&spec.file_stem(), extension, &bytes)?;
                tracing::info!(index, %name, bytes = bytes.len(), "batch entry added");
            }
            Err(err) => match policy {
                BatchFailurePolicy::Abort => {
                    tracing::warn!(index, word = %spec.word, error = %err, "batch aborted");
                    return Err(err);
                }
                BatchFailurePolicy::Skip => {
                    tracing::warn!(index, word = %spec.word, error = %err, "batch entry skipped");
                    skipped.push(SkippedEntry {
                        index,
                        word: spec.word.clone(),
                        error: err.to_string(),
                    });
                }
            },
        }

        let overall = {
            let mut st = state.lock().unwrap_or_else(PoisonError::into_inner);
            st.completed += 1;
            st.current_fraction = 0.0;
            st.overall().min(PROGRESS_CAP)
        };
        if index + 1 < specs.len() {
            on_progress(overall);
        }
    }

    let (bytes, entries) = archive.finish()?;
    on_progress(1.0);
    Ok(BatchArchive {
        bytes,
        entries,
        skipped,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/session/batch.rs"]
mod tests;
