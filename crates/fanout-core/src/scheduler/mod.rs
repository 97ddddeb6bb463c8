//! Download orchestrator.
//!
//! Two nested tiers: the dispatcher runs up to `process_cap` batches at once,
//! and each batch fans its links into at most `thread_cap` threads. Rounds are
//! barriers; failed links become the next round's candidates until the retry
//! budget runs out.

mod batch;
mod dispatch;
mod error;
mod run;
mod state;
mod worker;

#[cfg(test)]
mod test_support;

pub use batch::{partition, shuffle_candidates};
pub use dispatch::{Dispatcher, RoundStats};
pub use error::RunError;
pub use run::{run_download, RunOutcome, RunReport, RunRequest};
pub use state::{PoolCaps, RunState};
pub use worker::{run_batch, BatchContext, BatchResult, WorkerError};
