use crate::links::LinkError;

/// Errors that end a run. Per-link fetch failures are not errors; they are
/// collected and retried by round.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("configuration: {0}")]
    Config(#[from] LinkError),

    #[error("expected {expected} links but the link set has {actual}")]
    CountMismatch { expected: usize, actual: usize },

    #[error("round {round}, batch {batch}: worker failed: {reason}")]
    Fatal {
        round: u32,
        batch: usize,
        reason: String,
    },
}

impl RunError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, RunError::Fatal { .. })
    }
}
