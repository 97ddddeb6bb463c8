//! Run entry: validate inputs, loop rounds until clean or out of retries,
//! then send the terminal stop notification.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::FanoutConfig;
use crate::fetch::{FetchOptions, Fetcher};
use crate::links::{FileMap, LinkSet};
use crate::queue::Reporter;

use super::dispatch::{Dispatcher, RoundStats};
use super::error::RunError;
use super::state::{PoolCaps, RunState};
use super::worker::BatchContext;

/// Inputs for one invocation.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub links: LinkSet,
    /// Count the caller expects; must equal `links.total_count()`.
    pub expected_total: usize,
    pub file_map: FileMap,
    /// Directory the FileMap paths are relative to.
    pub dest_prefix: PathBuf,
    pub options: FetchOptions,
    /// Retry rounds allowed after the first round.
    pub max_retries: u32,
    pub caps: PoolCaps,
    /// Requested links per batch; capped at `caps.thread_cap`.
    pub batch_size: Option<usize>,
    /// Passed through for the downstream collaborator; not interpreted here.
    pub convert: bool,
    /// Fixed seed for candidate shuffling (tests, reproducible runs).
    pub shuffle_seed: Option<u64>,
}

impl RunRequest {
    pub fn new(links: LinkSet, file_map: FileMap, dest_prefix: impl Into<PathBuf>) -> Self {
        Self {
            expected_total: links.total_count(),
            links,
            file_map,
            dest_prefix: dest_prefix.into(),
            options: FetchOptions::default(),
            max_retries: 5,
            caps: PoolCaps::default(),
            batch_size: None,
            convert: false,
            shuffle_seed: None,
        }
    }

    /// Take pool sizes, retry budget and timeouts from the loaded config.
    pub fn with_config(mut self, cfg: &FanoutConfig) -> Self {
        self.caps = PoolCaps::new(cfg.process_cap, cfg.thread_cap);
        self.max_retries = cfg.max_retries;
        self.options.timeout = Duration::from_secs(cfg.fetch_timeout_secs);
        self.options.connect_timeout = Duration::from_secs(cfg.connect_timeout_secs);
        self
    }
}

/// How the round loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every link was materialized and reported.
    Complete,
    /// Retry budget spent; these links were given up on.
    Exhausted { abandoned: Vec<String> },
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub total_links: usize,
    pub downloaded_count: usize,
    pub retry_count: u32,
    pub rounds: Vec<RoundStats>,
    pub elapsed: Duration,
    /// Whether the coordinator acknowledged the stop notification at the transport level.
    pub stop_delivered: bool,
}

impl RunReport {
    pub fn is_complete(&self) -> bool {
        self.outcome == RunOutcome::Complete
    }
}

/// Download every link in `req`, retrying failures by round.
///
/// Per-link failures never surface as errors: they end in
/// `RunOutcome::Exhausted`. Errors are configuration problems (caught before
/// any round starts) or a fatal worker failure.
pub fn run_download(
    req: &RunRequest,
    fetcher: &dyn Fetcher,
    reporter: &dyn Reporter,
) -> Result<RunReport, RunError> {
    let started = Instant::now();

    let total = req.links.total_count();
    if req.expected_total != total {
        return Err(RunError::CountMismatch {
            expected: req.expected_total,
            actual: total,
        });
    }
    req.file_map.ensure_covers(&req.links)?;

    tracing::info!(
        links = total,
        max_retries = req.max_retries,
        process_cap = req.caps.process_cap,
        thread_cap = req.caps.thread_cap,
        http2 = req.options.http2,
        convert = req.convert,
        dest = %req.dest_prefix.display(),
        "starting download run"
    );

    let mut state = RunState::new(total, req.max_retries, req.caps);
    let ctx = BatchContext {
        file_map: &req.file_map,
        dest_prefix: &req.dest_prefix,
        options: &req.options,
        fetcher,
        reporter,
        thread_cap: state.thread_cap(),
    };
    let rng = match req.shuffle_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut dispatcher = Dispatcher::new(ctx, rng).with_batch_size(req.batch_size);

    let mut rounds = Vec::new();
    let mut round = 1u32;
    let outcome = loop {
        debug_assert_eq!(round, state.retry_count() + 1);
        let candidates = state.take_candidates(req.links.as_slice());
        let stats = match dispatcher.run_round(round, candidates, &mut state) {
            Ok(stats) => stats,
            Err(e) => {
                send_stop(reporter, state.downloaded_count());
                return Err(e);
            }
        };
        rounds.push(stats);

        if state.error_links().is_empty() {
            break RunOutcome::Complete;
        }
        tracing::warn!(
            round,
            failed = state.error_links().len(),
            "{} was expected but {} was downloaded",
            state.total_links(),
            state.downloaded_count()
        );
        if !state.begin_retry() {
            tracing::warn!(
                retries = state.retry_count(),
                abandoned = state.error_links().len(),
                "retry budget exhausted"
            );
            break RunOutcome::Exhausted {
                abandoned: state.error_links().to_vec(),
            };
        }
        round += 1;
    };

    let stop_delivered = send_stop(reporter, state.downloaded_count());
    let elapsed = started.elapsed();
    tracing::info!(
        downloaded = state.downloaded_count(),
        total,
        rounds = rounds.len(),
        "download took {:.2?}",
        elapsed
    );

    Ok(RunReport {
        outcome,
        total_links: total,
        downloaded_count: state.downloaded_count(),
        retry_count: state.retry_count(),
        rounds,
        elapsed,
        stop_delivered,
    })
}

/// Best effort: a coordinator that is gone does not fail the run.
fn send_stop(reporter: &dyn Reporter, final_count: usize) -> bool {
    match reporter.stop(final_count) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(final_count, "stop notification not delivered: {}", e);
            false
        }
    }
}
