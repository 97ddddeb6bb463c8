//! Run state: configuration plus the counters the dispatcher updates per round.

/// Pool sizes for the two tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolCaps {
    /// Batches in flight at once (outer tier).
    pub process_cap: usize,
    /// Links per batch and threads per batch (inner tier).
    pub thread_cap: usize,
}

impl Default for PoolCaps {
    fn default() -> Self {
        Self {
            process_cap: 8,
            thread_cap: 4,
        }
    }
}

impl PoolCaps {
    pub fn new(process_cap: usize, thread_cap: usize) -> Self {
        Self {
            process_cap: process_cap.max(1),
            thread_cap: thread_cap.max(1),
        }
    }
}

/// Mutable accounting for one invocation. Owned by the dispatcher; workers
/// only ever see their own batch and return results by value.
#[derive(Debug, Clone)]
pub struct RunState {
    total_links: usize,
    downloaded_count: usize,
    retry_count: u32,
    max_retries: u32,
    error_links: Vec<String>,
    caps: PoolCaps,
}

impl RunState {
    pub fn new(total_links: usize, max_retries: u32, caps: PoolCaps) -> Self {
        Self {
            total_links,
            downloaded_count: 0,
            retry_count: 0,
            max_retries,
            error_links: Vec::new(),
            caps: PoolCaps::new(caps.process_cap, caps.thread_cap),
        }
    }

    /// `min(requested, thread_cap)`, never below one.
    pub fn effective_thread_count(&self, requested: usize) -> usize {
        requested.min(self.caps.thread_cap).max(1)
    }

    pub fn process_cap(&self) -> usize {
        self.caps.process_cap
    }

    pub fn thread_cap(&self) -> usize {
        self.caps.thread_cap
    }

    pub fn total_links(&self) -> usize {
        self.total_links
    }

    pub fn downloaded_count(&self) -> usize {
        self.downloaded_count
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn error_links(&self) -> &[String] {
        &self.error_links
    }

    pub fn remaining(&self) -> usize {
        self.total_links - self.downloaded_count
    }

    /// Count links confirmed while a round is still draining. Never decreases
    /// and never passes `total_links`.
    pub fn add_downloaded(&mut self, n: usize) {
        self.downloaded_count = (self.downloaded_count + n).min(self.total_links);
    }

    /// Links for the next round: the previous round's failures if there are
    /// any, otherwise the whole link set. Clears `error_links`.
    pub fn take_candidates(&mut self, all: &[String]) -> Vec<String> {
        if self.error_links.is_empty() {
            all.to_vec()
        } else {
            std::mem::take(&mut self.error_links)
        }
    }

    /// Close a round: store its failures and recompute the downloaded count
    /// so that `downloaded_count + error_links.len() == total_links`.
    pub fn finish_round(&mut self, failed: Vec<String>) {
        self.downloaded_count = self.total_links.saturating_sub(failed.len());
        self.error_links = failed;
    }

    pub fn retries_exhausted(&self) -> bool {
        self.retry_count >= self.max_retries
    }

    /// Spend one retry. Returns false (and changes nothing) when the budget is used up.
    pub fn begin_retry(&mut self) -> bool {
        if self.retries_exhausted() {
            return false;
        }
        self.retry_count += 1;
        true
    }
}
