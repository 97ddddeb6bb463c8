//! Link → relative destination path mapping.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use url::Url;

use super::{resolve_link, LinkError, LinkSet};

/// Complete mapping from every link of a run to a path relative to the
/// destination prefix. Lookups for unknown links are configuration errors.
#[derive(Debug, Clone, Default)]
pub struct FileMap {
    entries: HashMap<String, PathBuf>,
}

impl FileMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mapping. Rejects absolute paths and paths that climb out of the prefix.
    pub fn insert(&mut self, link: impl Into<String>, path: impl Into<PathBuf>) -> Result<(), LinkError> {
        let link = link.into();
        let path = path.into();
        let escapes = path
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if path.as_os_str().is_empty() || escapes {
            return Err(LinkError::UnsafePath { link, path });
        }
        self.entries.insert(link, path);
        Ok(())
    }

    /// Parse a JSON object `{ "<link>": "<relative path>", ... }`. Keys are resolved
    /// against `base` the same way the link list is.
    pub fn from_json_str(json: &str, base: Option<&Url>) -> Result<Self, LinkError> {
        let raw: HashMap<String, String> = serde_json::from_str(json)?;
        let mut map = FileMap::new();
        for (link, path) in raw {
            let link = resolve_link(&link, base)?;
            map.insert(link, path)?;
        }
        Ok(map)
    }

    pub fn load(path: &Path, base: Option<&Url>) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("read file map {}", path.display()))?;
        let map = Self::from_json_str(&json, base)
            .with_context(|| format!("parse file map {}", path.display()))?;
        Ok(map)
    }

    pub fn get(&self, link: &str) -> Result<&Path, LinkError> {
        self.entries
            .get(link)
            .map(PathBuf::as_path)
            .ok_or_else(|| LinkError::MissingMapping(link.to_string()))
    }

    /// Destination of `link` under `prefix`.
    pub fn destination(&self, prefix: &Path, link: &str) -> Result<PathBuf, LinkError> {
        Ok(prefix.join(self.get(link)?))
    }

    /// Fails on the first link with no mapping, or on two links of the set
    /// sharing a destination (each file must be fetched and reported once).
    pub fn ensure_covers(&self, links: &LinkSet) -> Result<(), LinkError> {
        let mut owners: HashMap<PathBuf, &str> = HashMap::with_capacity(links.total_count());
        for link in links.iter() {
            let path = normalized(self.get(link)?);
            if let Some(first) = owners.get(&path) {
                return Err(LinkError::DuplicateDestination {
                    path,
                    first: first.to_string(),
                    second: link.clone(),
                });
            }
            owners.insert(path, link);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `a/./b.ts` and `a/b.ts` name the same file.
fn normalized(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}
