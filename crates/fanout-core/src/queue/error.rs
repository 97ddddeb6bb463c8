use crate::retry::{classify_io_error, ErrorKind};

/// Failure talking to the queue coordinator.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("coordinator I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not resolve coordinator address {0}")]
    Resolve(String),

    #[error("filename payload encoding: {0}")]
    Encode(#[from] postcard::Error),

    #[error("'{value}' does not fit in a {header_size}-byte header")]
    HeaderTooSmall { value: String, header_size: usize },

    #[error("malformed coordinator message: {0}")]
    Protocol(String),
}

impl ReportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReportError::Io(e) => classify_io_error(e),
            ReportError::Resolve(_) => ErrorKind::Connection,
            _ => ErrorKind::Other,
        }
    }
}
