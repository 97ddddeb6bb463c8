//! ThreadBatch worker: one batch of links fanned into a small thread pool.
//!
//! Failures go into a lock local to this batch. After every fetch thread has
//! finished, the surviving destinations are posted to the coordinator in
//! batch order and the failed links are handed back to the dispatcher.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::fetch::{fetch_unit, FetchOptions, FetchOutcome, Fetcher};
use crate::links::{FileMap, LinkError};
use crate::queue::Reporter;

/// Everything a batch needs, borrowed from the run for its whole lifetime.
#[derive(Clone, Copy)]
pub struct BatchContext<'a> {
    pub file_map: &'a FileMap,
    pub dest_prefix: &'a Path,
    pub options: &'a FetchOptions,
    pub fetcher: &'a dyn Fetcher,
    pub reporter: &'a dyn Reporter,
    pub thread_cap: usize,
}

/// Outcome of one batch as seen by the dispatcher.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    /// Links to retry next round. Never reported to the coordinator.
    pub failed: Vec<String>,
    /// Destinations posted to the coordinator, in batch order.
    pub reported: Vec<PathBuf>,
    /// Links skipped because the destination already existed.
    pub already_present: usize,
}

impl BatchResult {
    pub fn succeeded(&self) -> usize {
        self.reported.len()
    }
}

/// Batch-level failure that is not a per-link fetch failure.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error(transparent)]
    Config(#[from] LinkError),
}

/// Fetch every link in `batch` and report the successes.
pub fn run_batch(ctx: &BatchContext<'_>, batch: &[String]) -> Result<BatchResult, WorkerError> {
    if batch.is_empty() {
        return Ok(BatchResult::default());
    }

    // Resolve all destinations before any network work so a bad map fails the batch cleanly.
    let pending: Vec<(&str, PathBuf)> = batch
        .iter()
        .map(|link| Ok((link.as_str(), ctx.file_map.destination(ctx.dest_prefix, link)?)))
        .collect::<Result<_, LinkError>>()?;

    let thread_count = ctx.thread_cap.min(batch.len()).max(1);
    let work: Mutex<VecDeque<usize>> = Mutex::new((0..pending.len()).collect());
    let failed: Mutex<Vec<String>> = Mutex::new(Vec::new());
    let already_present = AtomicUsize::new(0);

    std::thread::scope(|s| {
        for _ in 0..thread_count {
            s.spawn(|| loop {
                let next = work.lock().unwrap_or_else(|e| e.into_inner()).pop_front();
                let Some(i) = next else {
                    break;
                };
                let (link, dest) = &pending[i];
                match fetch_unit(ctx.fetcher, link, dest, ctx.options) {
                    Ok(FetchOutcome::AlreadyPresent) => {
                        tracing::debug!(link, dest = %dest.display(), "already present");
                        already_present.fetch_add(1, Ordering::Relaxed);
                    }
                    Ok(FetchOutcome::Fetched) => {
                        tracing::debug!(link, dest = %dest.display(), "fetched");
                    }
                    Err(e) => {
                        tracing::warn!(link, kind = ?e.kind(), "fetch failed: {}", e);
                        failed
                            .lock()
                            .unwrap_or_else(|e| e.into_inner())
                            .push(link.to_string());
                    }
                }
            });
        }
    });

    let failed = failed.into_inner().unwrap_or_else(|e| e.into_inner());
    let already_present = already_present.into_inner();
    let failed_set: HashSet<&str> = failed.iter().map(String::as_str).collect();
    let survivors: Vec<PathBuf> = pending
        .iter()
        .filter(|(link, _)| !failed_set.contains(link))
        .map(|(_, dest)| dest.clone())
        .collect();

    if survivors.is_empty() {
        return Ok(BatchResult {
            failed: order_like(batch, failed),
            reported: survivors,
            already_present,
        });
    }

    match ctx.reporter.post_filenames(&survivors) {
        Ok(()) => Ok(BatchResult {
            failed: order_like(batch, failed),
            reported: survivors,
            already_present,
        }),
        Err(e) => {
            // The files stay on disk; next round finds them present and reports again.
            tracing::warn!(
                links = batch.len(),
                "could not post filenames, returning whole batch for retry: {}",
                e
            );
            Ok(BatchResult {
                failed: batch.to_vec(),
                reported: Vec::new(),
                already_present,
            })
        }
    }
}

/// Put `failed` back into the order the links had in `batch`.
fn order_like(batch: &[String], failed: Vec<String>) -> Vec<String> {
    if failed.len() < 2 {
        return failed;
    }
    let set: HashSet<String> = failed.into_iter().collect();
    batch.iter().filter(|l| set.contains(*l)).cloned().collect()
}
