//! Pool dispatcher: the outer tier.
//!
//! Each round shuffles the candidates, cuts them into batches, and runs the
//! batches on at most `process_cap` workers. Workers send their results back
//! over a channel; the dispatcher is the only place that touches `RunState`.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::Mutex;

use rand::rngs::StdRng;

use super::batch::{partition, shuffle_candidates};
use super::error::RunError;
use super::state::RunState;
use super::worker::{run_batch, BatchContext, BatchResult, WorkerError};

/// What happened in one round, kept for the run report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundStats {
    /// 1-based round index.
    pub round: u32,
    pub candidates: usize,
    /// Batch sizes in submission order.
    pub batch_sizes: Vec<usize>,
    pub failed: usize,
    /// `downloaded_count` after the round closed.
    pub downloaded_after: usize,
}

enum BatchFailure {
    Worker(WorkerError),
    Panicked(String),
}

pub struct Dispatcher<'a> {
    ctx: BatchContext<'a>,
    rng: StdRng,
    requested_batch: Option<usize>,
}

impl<'a> Dispatcher<'a> {
    pub fn new(ctx: BatchContext<'a>, rng: StdRng) -> Self {
        Self {
            ctx,
            rng,
            requested_batch: None,
        }
    }

    /// Ask for a batch size; the run state still caps it at `thread_cap`.
    pub fn with_batch_size(mut self, size: Option<usize>) -> Self {
        self.requested_batch = size;
        self
    }

    /// Run one round over `candidates` and close it on `state`.
    ///
    /// Blocks until every batch has reported back. If a worker fails in a way
    /// that is not a per-link failure, the remaining batches still finish and
    /// the first such failure is returned after the barrier.
    pub fn run_round(
        &mut self,
        round: u32,
        mut candidates: Vec<String>,
        state: &mut RunState,
    ) -> Result<RoundStats, RunError> {
        shuffle_candidates(&mut candidates, &mut self.rng);
        let batch_size = state.effective_thread_count(self.requested_batch.unwrap_or(state.thread_cap()));
        let batches = partition(&candidates, batch_size);
        let batch_sizes: Vec<usize> = batches.iter().map(|b| b.len()).collect();
        let worker_count = state.process_cap().min(batches.len());

        tracing::info!(
            round,
            candidates = candidates.len(),
            batches = batches.len(),
            workers = worker_count,
            "starting round, {} left",
            state.remaining()
        );

        let ctx = BatchContext {
            thread_cap: state.effective_thread_count(batch_size),
            ..self.ctx
        };
        let queue: Mutex<VecDeque<(usize, &[String])>> =
            Mutex::new(batches.iter().copied().enumerate().collect());
        let (tx, rx) = mpsc::channel::<(usize, Result<BatchResult, BatchFailure>)>();

        let mut round_failed: Vec<String> = Vec::new();
        let mut first_fatal: Option<RunError> = None;

        std::thread::scope(|s| {
            let mut handles = Vec::with_capacity(worker_count);
            for _ in 0..worker_count {
                let tx = tx.clone();
                let queue = &queue;
                let ctx = &ctx;
                handles.push(s.spawn(move || loop {
                    let next = queue.lock().unwrap_or_else(|e| e.into_inner()).pop_front();
                    let Some((index, batch)) = next else {
                        break;
                    };
                    let res = match panic::catch_unwind(AssertUnwindSafe(|| run_batch(ctx, batch))) {
                        Ok(Ok(r)) => Ok(r),
                        Ok(Err(e)) => Err(BatchFailure::Worker(e)),
                        Err(payload) => Err(BatchFailure::Panicked(panic_message(&*payload))),
                    };
                    if tx.send((index, res)).is_err() {
                        break;
                    }
                }));
            }
            drop(tx);

            for (index, res) in rx.iter() {
                match res {
                    Ok(result) => {
                        state.add_downloaded(result.succeeded());
                        tracing::debug!(
                            round,
                            batch = index,
                            reported = result.succeeded(),
                            already_present = result.already_present,
                            failed = result.failed.len(),
                            "batch done"
                        );
                        round_failed.extend(result.failed);
                    }
                    Err(failure) => {
                        let batch_links = batches[index];
                        round_failed.extend(batch_links.iter().cloned());
                        let fatal = match failure {
                            BatchFailure::Worker(WorkerError::Config(e)) => RunError::Config(e),
                            BatchFailure::Panicked(reason) => RunError::Fatal {
                                round,
                                batch: index,
                                reason,
                            },
                        };
                        tracing::error!(round, batch = index, "batch aborted: {}", fatal);
                        first_fatal.get_or_insert(fatal);
                    }
                }
            }

            for h in handles {
                if h.join().is_err() && first_fatal.is_none() {
                    first_fatal = Some(RunError::Fatal {
                        round,
                        batch: usize::MAX,
                        reason: "outer worker panicked".to_string(),
                    });
                }
            }
        });

        let failed = round_failed.len();
        state.finish_round(round_failed);

        if let Some(e) = first_fatal {
            return Err(e);
        }

        Ok(RoundStats {
            round,
            candidates: candidates.len(),
            batch_sizes,
            failed,
            downloaded_after: state.downloaded_count(),
        })
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}
