//! Retry and backoff policy.
//!
//! Classifies transport failures (curl, HTTP status, socket I/O) into coarse
//! kinds and turns them into backoff decisions. Per-link fetch retries are
//! round-based and owned by the scheduler; this policy covers the
//! coordinator report path and gives fetch failures a kind for logging.

mod classify;
mod policy;
mod run;

pub use classify::{classify_curl_error, classify_http_status, classify_io_error};
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
