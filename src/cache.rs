//! Channel Link Cache
//!
//! Avoids a full catalog crawl for every channel lookup. The cache is built
//! wholesale from a fresh crawl — never merged incrementally — and consumers
//! treat it as a point-in-time snapshot that may be stale. On-disk shape:
//! `{"links": {"RAI 1 HD": "https://...", ...}}`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::providers::vavoo::Channel;

/// Persisted name → URL mapping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkCache {
    links: BTreeMap<String, String>,
}

impl LinkCache {
    /// Build the mapping from a freshly crawled catalog in one pass.
    /// Every distinct name keeps exactly one link; on a name collision the
    /// last crawled entry wins.
    pub fn build(channels: &[Channel]) -> Self {
        let mut links = BTreeMap::new();
        for ch in channels {
            let name = ch.name.trim();
            if name.is_empty() || ch.url.is_empty() {
                continue;
            }
            links.insert(name.to_string(), ch.url.clone());
        }
        Self { links }
    }

    /// Write the cache as pretty JSON. The document is serialized to a temp
    /// file next to the target and renamed over it, so a crashed or racing
    /// rebuild never leaves a torn file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(self)?)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Load a previously saved cache. No validation against the live
    /// catalog — the document is trusted verbatim.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.links.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

/// Default cache location under the user cache dir, falling back to the
/// working directory.
pub fn default_cache_path() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("trova").join("vavoo_cache.json"))
        .unwrap_or_else(|| PathBuf::from("vavoo_cache.json"))
}
