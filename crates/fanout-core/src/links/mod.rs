//! Run inputs: the link set, the link → destination map, and request headers.
//!
//! Links are kept as absolute URL strings. Relative entries (playlist-style
//! link lists) are joined onto an optional base URL when loaded.

mod error;
mod file_map;
mod headers;

pub use error::LinkError;
pub use file_map::FileMap;
pub use headers::parse_headers;

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;
use url::Url;

/// Ordered, duplicate-free sequence of links for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSet {
    links: Vec<String>,
}

impl LinkSet {
    /// Build a link set. Duplicates are rejected because each link maps to
    /// exactly one destination and is counted once.
    pub fn new(links: Vec<String>) -> Result<Self, LinkError> {
        let mut seen = HashSet::with_capacity(links.len());
        for link in &links {
            if link.trim().is_empty() {
                return Err(LinkError::Empty);
            }
            if !seen.insert(link.as_str()) {
                return Err(LinkError::Duplicate(link.clone()));
            }
        }
        Ok(LinkSet { links })
    }

    /// Parse one link per line. Blank lines and lines starting with `#` are skipped.
    pub fn from_lines(text: &str, base: Option<&Url>) -> Result<Self, LinkError> {
        let links = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(|l| resolve_link(l, base))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(links)
    }

    /// Read a links file from disk.
    pub fn load(path: &Path, base: Option<&Url>) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read links file {}", path.display()))?;
        let set = Self::from_lines(&text, base)
            .with_context(|| format!("parse links file {}", path.display()))?;
        Ok(set)
    }

    /// Number of links, fixed at construction.
    pub fn total_count(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.links
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.links.iter()
    }
}

/// Turn a raw entry into an absolute URL string, joining relative entries onto `base`.
pub fn resolve_link(raw: &str, base: Option<&Url>) -> Result<String, LinkError> {
    match Url::parse(raw) {
        Ok(u) => Ok(u.to_string()),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = base.ok_or_else(|| LinkError::RelativeWithoutBase(raw.to_string()))?;
            base.join(raw)
                .map(|u| u.to_string())
                .map_err(|source| LinkError::InvalidUrl {
                    link: raw.to_string(),
                    source,
                })
        }
        Err(source) => Err(LinkError::InvalidUrl {
            link: raw.to_string(),
            source,
        }),
    }
}
