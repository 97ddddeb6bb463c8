//! Per-link fetch failure. Carried as data, never raised past the batch.

use crate::retry::{classify_curl_error, classify_http_status, ErrorKind};

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Curl reported an error (timeout, connection, short body...).
    #[error("{0}")]
    Curl(#[from] curl::Error),
    /// Response had a non-2xx status.
    #[error("HTTP {0}")]
    Http(u32),
    /// Writing or renaming the destination failed.
    #[error("storage: {0}")]
    Storage(String),
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Curl(e) => classify_curl_error(e),
            FetchError::Http(code) => classify_http_status(*code),
            FetchError::Storage(_) => ErrorKind::Other,
        }
    }
}
