//! Domain configuration
//!
//! Both upstreams rotate their public domain regularly, so the current one
//! lives in a small JSON document (`{"animeunity": "...", "vavoo": "..."}`)
//! instead of the binary. The CLI shell loads it once at startup and hands
//! the value to each component at construction.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Logical source name → current base domain.
#[derive(Debug, Clone, Deserialize)]
pub struct Domains {
    #[serde(flatten)]
    map: HashMap<String, String>,
}

impl Domains {
    /// Load the domain map from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let domains: Self = serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("malformed {}: {e}", path.display())))?;
        Ok(domains)
    }

    /// Current domain for a logical source (e.g. `"vavoo"`).
    pub fn get(&self, source: &str) -> Result<&str> {
        self.map
            .get(source)
            .map(String::as_str)
            .ok_or_else(|| Error::Config(format!("no domain configured for '{source}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_lookup() {
        let domains: Domains =
            serde_json::from_str(r#"{"animeunity": "animeunity.so", "vavoo": "vavoo.to"}"#)
                .unwrap();
        assert_eq!(domains.get("vavoo").unwrap(), "vavoo.to");
        assert_eq!(domains.get("animeunity").unwrap(), "animeunity.so");
    }

    #[test]
    fn test_missing_source_is_config_error() {
        let domains: Domains = serde_json::from_str(r#"{"vavoo": "vavoo.to"}"#).unwrap();
        assert!(matches!(domains.get("animeunity"), Err(Error::Config(_))));
    }
}
