//! In-memory fetcher and reporter doubles for scheduler tests.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::fetch::{FetchError, FetchOptions, Fetcher};
use crate::queue::{ReportError, Reporter};

/// Writes a small file for every link unless told to fail or panic on it.
#[derive(Default)]
pub struct ScriptedFetcher {
    fail_all: bool,
    fail_always: HashSet<String>,
    fail_first: HashMap<String, usize>,
    panic_on: HashSet<String>,
    delay: Option<Duration>,
    calls: Mutex<HashMap<String, usize>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn failing<'a>(links: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            fail_always: links.into_iter().map(str::to_string).collect(),
            ..Self::default()
        }
    }

    pub fn always_failing() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    /// Fail each of `links` on its first `times` attempts, then succeed.
    pub fn failing_first<'a>(links: impl IntoIterator<Item = &'a str>, times: usize) -> Self {
        Self {
            fail_first: links.into_iter().map(|l| (l.to_string(), times)).collect(),
            ..Self::default()
        }
    }

    pub fn panicking_on(link: &str) -> Self {
        Self {
            panic_on: [link.to_string()].into_iter().collect(),
            ..Self::default()
        }
    }

    /// Hold every fetch for `delay` so overlapping calls can be observed.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Most fetch calls seen in flight at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self, link: &str) -> usize {
        self.calls.lock().unwrap().get(link).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

impl Fetcher for ScriptedFetcher {
    fn fetch(&self, link: &str, dest: &Path, _opts: &FetchOptions) -> Result<(), FetchError> {
        let attempt = {
            let mut calls = self.calls.lock().unwrap();
            let n = calls.entry(link.to_string()).or_insert(0);
            *n += 1;
            *n
        };
        if self.panic_on.contains(link) {
            panic!("scripted panic for {link}");
        }
        if let Some(delay) = self.delay {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(delay);
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
        let fails_now = self.fail_all
            || self.fail_always.contains(link)
            || self.fail_first.get(link).is_some_and(|&t| attempt <= t);
        if fails_now {
            return Err(FetchError::Http(503));
        }
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| FetchError::Storage(e.to_string()))?;
        }
        std::fs::write(dest, link.as_bytes()).map_err(|e| FetchError::Storage(e.to_string()))
    }
}

/// Records every delivered command; can be told to fail some of them.
#[derive(Default)]
pub struct RecordingReporter {
    posts: Mutex<Vec<Vec<PathBuf>>>,
    stops: Mutex<Vec<usize>>,
    failing_posts: AtomicUsize,
    fail_stop: bool,
}

impl RecordingReporter {
    /// The first `n` post attempts fail with a connection error.
    pub fn failing_posts(n: usize) -> Self {
        Self {
            failing_posts: AtomicUsize::new(n),
            ..Self::default()
        }
    }

    pub fn failing_stop() -> Self {
        Self {
            fail_stop: true,
            ..Self::default()
        }
    }

    pub fn posts(&self) -> Vec<Vec<PathBuf>> {
        self.posts.lock().unwrap().clone()
    }

    pub fn reported_paths(&self) -> Vec<PathBuf> {
        self.posts().into_iter().flatten().collect()
    }

    pub fn stops(&self) -> Vec<usize> {
        self.stops.lock().unwrap().clone()
    }
}

fn refused() -> ReportError {
    ReportError::Io(std::io::Error::from(std::io::ErrorKind::ConnectionRefused))
}

impl Reporter for RecordingReporter {
    fn post_filenames(&self, paths: &[PathBuf]) -> Result<(), ReportError> {
        let failed = self
            .failing_posts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(refused());
        }
        self.posts.lock().unwrap().push(paths.to_vec());
        Ok(())
    }

    fn stop(&self, final_count: usize) -> Result<(), ReportError> {
        if self.fail_stop {
            return Err(refused());
        }
        self.stops.lock().unwrap().push(final_count);
        Ok(())
    }
}
