//! TCP client for the queue coordinator.

use std::io::Write;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::path::PathBuf;
use std::time::Duration;

use super::protocol::{command_header, write_frame, QueueMessage, POST_FILENAME_QUEUE, STOP_QUEUE};
use super::ReportError;
use crate::config::CoordinatorConfig;
use crate::retry::{run_with_retry, RetryPolicy};

/// Sink for the two commands the orchestrator produces. Shared by every
/// outer worker, so implementations must be thread-safe.
pub trait Reporter: Send + Sync {
    /// Report files that are fully on disk, in batch order.
    fn post_filenames(&self, paths: &[PathBuf]) -> Result<(), ReportError>;
    /// Final notification carrying the downloaded count.
    fn stop(&self, final_count: usize) -> Result<(), ReportError>;
}

/// Opens one connection per command, as the coordinator expects.
#[derive(Debug, Clone)]
pub struct SocketReporter {
    addr: String,
    header_size: usize,
    timeout: Duration,
    post_policy: RetryPolicy,
}

impl SocketReporter {
    /// Validates that both command names fit in the configured header width.
    pub fn new(cfg: &CoordinatorConfig) -> Result<Self, ReportError> {
        command_header(POST_FILENAME_QUEUE, cfg.header_size)?;
        command_header(STOP_QUEUE, cfg.header_size)?;
        Ok(Self {
            addr: cfg.addr.clone(),
            header_size: cfg.header_size,
            timeout: Duration::from_secs(10),
            post_policy: RetryPolicy::no_retry(),
        })
    }

    /// Backoff used for `PostFilenames`; `Stop` is always single-shot.
    pub fn with_post_policy(mut self, policy: RetryPolicy) -> Self {
        self.post_policy = policy;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    fn resolve(&self) -> Result<SocketAddr, ReportError> {
        self.addr
            .to_socket_addrs()
            .map_err(|_| ReportError::Resolve(self.addr.clone()))?
            .next()
            .ok_or_else(|| ReportError::Resolve(self.addr.clone()))
    }

    fn send(&self, msg: &QueueMessage) -> Result<(), ReportError> {
        let payloads = msg.encode(self.header_size)?;
        let addr = self.resolve()?;
        let mut stream = TcpStream::connect_timeout(&addr, self.timeout)?;
        stream.set_write_timeout(Some(self.timeout))?;
        for payload in &payloads {
            write_frame(&mut stream, payload, self.header_size)?;
        }
        stream.flush()?;
        Ok(())
    }
}

impl Reporter for SocketReporter {
    fn post_filenames(&self, paths: &[PathBuf]) -> Result<(), ReportError> {
        let msg = QueueMessage::PostFilenames {
            ordered_paths: paths
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect(),
        };
        run_with_retry(&self.post_policy, ReportError::kind, |attempt| {
            let res = self.send(&msg);
            if let Err(ref e) = res {
                tracing::debug!(attempt, addr = %self.addr, "post filenames failed: {}", e);
            }
            res
        })
    }

    fn stop(&self, final_count: usize) -> Result<(), ReportError> {
        self.send(&QueueMessage::Stop { final_count })
    }
}
