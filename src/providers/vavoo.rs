//! Vavoo IPTV catalog provider
//!
//! The app API is cursor-paginated and every call must carry the
//! `mediahubmx-signature` obtained from the fingerprint handshake
//! ([`crate::auth::SignatureAuth`]). A transient failure mid-crawl keeps
//! whatever pages were already fetched; nothing is retried.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::auth::{Authenticator, Credential, SignatureAuth};
use crate::error::Result;
use crate::fingerprint;

/// Client version advertised in catalog/resolve payloads. Independent of
/// the app version in the fingerprint ping.
const CLIENT_VERSION: &str = "3.0.2";

/// The resolve endpoint expects the in-app player's agent, not okhttp.
const RESOLVE_USER_AGENT: &str = "MediaHubMX/2";

/// Region group crawled by default.
pub const DEFAULT_GROUP: &str = "Italy";

const TIMEOUT_SECS: u64 = 10;

/// Trailing `.a` / `.b` dedup marker, as stripped for aliases.
static ALIAS_SUFFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.[a-zA-Z]$").unwrap());

/// One catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    /// Derived quality/suffix-stripped variants, filled for dumps only.
    #[serde(skip_deserializing, skip_serializing_if = "Vec::is_empty", default)]
    pub aliases: Vec<String>,
}

/// Vavoo catalog + link-resolution client.
pub struct Vavoo {
    client: Client,
    base_url: String,
    auth: SignatureAuth,
}

impl Vavoo {
    pub fn new(domain: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .user_agent(fingerprint::PING_USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            auth: SignatureAuth::new(client.clone()),
            base_url: format!("https://{domain}"),
            client,
        })
    }

    /// Crawl the full channel catalog for one region group.
    ///
    /// Issues cursor-paginated requests until the upstream stops returning
    /// a cursor. A request failure aborts the crawl silently, keeping the
    /// pages already accumulated. Signature failure degrades to an empty
    /// catalog.
    pub async fn channels(&self, group: &str) -> Result<Vec<Channel>> {
        let credential = match self.auth.credential().await {
            Ok(c) => c,
            Err(e) => {
                warn!("signature acquisition failed, returning empty catalog: {e}");
                return Ok(vec![]);
            }
        };

        let mut channels = Vec::new();
        let mut cursor = Value::from(0);
        loop {
            let page = match self.catalog_page(&credential, group, &cursor).await {
                Ok(p) => p,
                Err(e) => {
                    warn!(group, "catalog page failed, keeping {} channels: {e}", channels.len());
                    break;
                }
            };
            channels.extend(page.items);

            match page.next_cursor {
                Some(next) if !is_falsy_cursor(&next) => cursor = next,
                _ => break,
            }
        }

        debug!(group, count = channels.len(), "catalog crawl complete");
        Ok(channels)
    }

    async fn catalog_page(
        &self,
        credential: &Credential,
        group: &str,
        cursor: &Value,
    ) -> Result<CatalogPage> {
        let body = json!({
            "language": "de",
            "region": "AT",
            "catalogId": "iptv",
            "id": "iptv",
            "adult": false,
            "search": "",
            "sort": "name",
            "filter": {"group": group},
            "cursor": cursor,
            "clientVersion": CLIENT_VERSION,
        });

        let page = self
            .client
            .post(format!("{}/mediahubmx-catalog.json", self.base_url))
            .headers(credential.headers())
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json::<CatalogPage>()
            .await?;
        Ok(page)
    }

    /// Resolve a `vavoo.to/play/...` link into a playable stream URL.
    ///
    /// `None` means the upstream answered but did not produce a URL —
    /// a failed resolution, not a transport error.
    pub async fn resolve(&self, link: &str) -> Result<Option<String>> {
        let credential = match self.auth.credential().await {
            Ok(c) => c,
            Err(e) => {
                warn!("signature acquisition failed, cannot resolve: {e}");
                return Ok(None);
            }
        };

        let body = json!({
            "language": "de",
            "region": "AT",
            "url": link,
            "clientVersion": CLIENT_VERSION,
        });

        let result = self
            .client
            .post(format!("{}/mediahubmx-resolve.json", self.base_url))
            .headers(credential.headers())
            .header(USER_AGENT, RESOLVE_USER_AGENT)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;

        Ok(resolved_url(&result))
    }
}

/// The upstream answers with either an array of stream objects or a bare
/// object; both carry `url`.
fn resolved_url(result: &Value) -> Option<String> {
    let url = match result {
        Value::Array(items) => items.first()?.get("url")?.as_str(),
        Value::Object(obj) => obj.get("url")?.as_str(),
        _ => None,
    };
    match url.filter(|u| !u.is_empty()) {
        Some(u) => Some(u.to_string()),
        None => {
            debug!("unexpected resolve response shape: {result}");
            None
        }
    }
}

/// The crawl continues only on a truthy cursor: the upstream signals the
/// last page with an absent field, `null`, `0` or `""`.
fn is_falsy_cursor(cursor: &Value) -> bool {
    match cursor {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Quality/suffix-stripped name variants, in derivation order.
pub fn derive_aliases(name: &str) -> Vec<String> {
    vec![
        name.replace(" HD", "").replace(" FHD", "").replace(" 4K", ""),
        ALIAS_SUFFIX.replace(name, "").to_string(),
    ]
}

/// Attach derived aliases to every channel (dump output).
pub fn with_aliases(mut channels: Vec<Channel>) -> Vec<Channel> {
    for ch in &mut channels {
        if !ch.name.is_empty() {
            ch.aliases = derive_aliases(&ch.name);
        }
    }
    channels
}

// Serde structures for the catalog API

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogPage {
    #[serde(default)]
    items: Vec<Channel>,
    #[serde(default)]
    next_cursor: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_termination() {
        // The crawl must stop the first time the cursor goes falsy.
        assert!(is_falsy_cursor(&Value::Null));
        assert!(is_falsy_cursor(&json!(0)));
        assert!(is_falsy_cursor(&json!("")));
        assert!(is_falsy_cursor(&json!(false)));

        assert!(!is_falsy_cursor(&json!(120)));
        assert!(!is_falsy_cursor(&json!("opaque-cursor")));
    }

    #[test]
    fn test_resolved_url_from_array_and_object() {
        let array = json!([{"url": "https://cdn.example/stream.m3u8"}]);
        assert_eq!(
            resolved_url(&array).as_deref(),
            Some("https://cdn.example/stream.m3u8")
        );

        let object = json!({"url": "https://cdn.example/stream.m3u8"});
        assert_eq!(
            resolved_url(&object).as_deref(),
            Some("https://cdn.example/stream.m3u8")
        );

        assert_eq!(resolved_url(&json!([])), None);
        assert_eq!(resolved_url(&json!({"status": "error"})), None);
        assert_eq!(resolved_url(&json!("plain string")), None);
    }

    #[test]
    fn test_derive_aliases() {
        assert_eq!(derive_aliases("RAI 1 HD"), vec!["RAI 1", "RAI 1 HD"]);
        assert_eq!(
            derive_aliases("Canale 5 .a"),
            vec!["Canale 5 .a", "Canale 5 "]
        );
    }

    #[test]
    fn test_catalog_page_parses_without_cursor() {
        let page: CatalogPage = serde_json::from_str(
            r#"{"items": [{"name": "RAI 1", "url": "https://vavoo.to/play/1", "group": "Italy"}]}"#,
        )
        .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].name, "RAI 1");
        assert!(page.next_cursor.is_none());
    }
}
