//! libcurl-backed fetch primitive.
//!
//! Streams the body into `<dest>.part` and renames it onto `dest` only after
//! a 2xx response with a complete body. Any failure drops the part file.

use std::path::Path;

use curl::easy::{Easy, HttpVersion, List};

use super::{FetchError, FetchOptions, Fetcher};
use crate::storage::PartFile;

/// Default [`Fetcher`]: one `Easy` handle per call, safe to share across threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurlFetcher;

impl CurlFetcher {
    pub fn new() -> Self {
        CurlFetcher
    }
}

impl Fetcher for CurlFetcher {
    fn fetch(&self, link: &str, dest: &Path, opts: &FetchOptions) -> Result<(), FetchError> {
        let mut part = PartFile::create(dest).map_err(|e| FetchError::Storage(format!("{:#}", e)))?;
        let mut storage_error: Option<std::io::Error> = None;

        let mut easy = Easy::new();
        easy.url(link)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.connect_timeout(opts.connect_timeout)?;
        easy.timeout(opts.timeout)?;
        if opts.http2 {
            if let Err(e) = easy.http_version(HttpVersion::V2) {
                tracing::debug!(link, "HTTP/2 unavailable, using default negotiation: {}", e);
            }
        }

        if !opts.headers.is_empty() {
            let mut list = List::new();
            for (k, v) in &opts.headers {
                list.append(&format!("{}: {}", k.trim(), v.trim()))?;
            }
            easy.http_headers(list)?;
        }

        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| match part.append(data) {
                Ok(()) => Ok(data.len()),
                Err(e) => {
                    storage_error = Some(e);
                    Ok(0) // abort transfer
                }
            })?;
            if let Err(e) = transfer.perform() {
                drop(transfer);
                if e.is_write_error() {
                    if let Some(io_err) = storage_error.take() {
                        return Err(FetchError::Storage(io_err.to_string()));
                    }
                }
                return Err(FetchError::Curl(e));
            }
        }

        let code = easy.response_code()?;
        if !(200..300).contains(&code) {
            return Err(FetchError::Http(code));
        }

        tracing::debug!(link, bytes = part.written(), status = code, "transfer complete");
        part.finalize(dest)
            .map_err(|e| FetchError::Storage(format!("{:#}", e)))
    }
}
