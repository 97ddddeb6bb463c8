//! Fetch Unit: one link to one destination path.
//!
//! An existing destination short-circuits to success without touching the
//! network, which makes re-running a partially completed link set safe. The
//! actual transfer is delegated to a [`Fetcher`]; failures come back as data
//! and retry policy stays with the scheduler.

mod error;
mod http;

pub use error::FetchError;
pub use http::CurlFetcher;

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Default whole-transfer timeout per link.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(120);

/// Per-run request options handed to every fetch call.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Extra request headers (session cookies, referer, user agent...).
    pub headers: HashMap<String, String>,
    /// Ask for HTTP/2.
    pub http2: bool,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            headers: HashMap::new(),
            http2: false,
            timeout: DEFAULT_FETCH_TIMEOUT,
            connect_timeout: Duration::from_secs(30),
        }
    }
}

/// Fetch primitive. Implementations must never leave a partially written file
/// at `dest` when they return an error.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, link: &str, dest: &Path, opts: &FetchOptions) -> Result<(), FetchError>;
}

/// What the Fetch Unit did for a successful link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Destination already existed; nothing was fetched.
    AlreadyPresent,
    Fetched,
}

/// Materialize `link` at `dest` unless it is already there.
pub fn fetch_unit(
    fetcher: &dyn Fetcher,
    link: &str,
    dest: &Path,
    opts: &FetchOptions,
) -> Result<FetchOutcome, FetchError> {
    if dest.exists() {
        return Ok(FetchOutcome::AlreadyPresent);
    }
    fetcher.fetch(link, dest, opts)?;
    Ok(FetchOutcome::Fetched)
}
