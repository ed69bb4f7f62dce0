//! VixCloud Stream Extraction
//!
//! The embed player changes format without notice, so extraction is an
//! ordered cascade of independent strategies over the fetched page body.
//! The first strategy to produce a URL wins; the order is part of the
//! contract and must not be reordered for "better" matches. No strategy
//! matching is a normal outcome (player format drift), not an error.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::Result;
use crate::providers::animeunity::DESKTOP_USER_AGENT;

const TIMEOUT_SECS: u64 = 20;

/// `src_mp4`/`file` assignment inside an inline script.
static SRC_MP4: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:src_mp4|file)\s*[:=]\s*["']([^"']+\.mp4[^"']*)["']"#).unwrap()
});

/// Whole-body patterns for known CDN host fragments and video-URL keys.
/// Matches only count when they carry `token=` and `expires=` parameters
/// (the signed, time-limited form the CDN actually serves).
static SIGNED_URL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r#"(?i)(?:file|source|src)\s*[:=]\s*["']([^"']*au-d1-[^"']*\.mp4[^"']*)["']"#)
            .unwrap(),
        Regex::new(r#"(?i)["']([^"']*scws-content\.net[^"']*\.mp4[^"']*)["']"#).unwrap(),
        Regex::new(r#"(?i)(?:mp4|video)(?:Url|Source|File)\s*[:=]\s*["']([^"']+\.mp4[^"']*)["']"#)
            .unwrap(),
    ]
});

/// `config = {...};` / `window.config = {...};` assignment.
static PLAYER_CONFIG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)(?:config|window\.config)\s*=\s*(\{.*?\});").unwrap());

/// Keys under which the player config hides the playlist descriptor.
const CONFIG_KEYS: &[&str] = &["masterPlaylist", "window_parameter", "streams"];

struct Strategy {
    name: &'static str,
    run: fn(&str) -> Option<String>,
}

/// Extraction strategies in evaluation order.
const STRATEGIES: &[Strategy] = &[
    Strategy {
        name: "inline_script_mp4",
        run: inline_script_mp4,
    },
    Strategy {
        name: "signed_url_scan",
        run: signed_url_scan,
    },
    Strategy {
        name: "config_playlist_rewrite",
        run: config_playlist_rewrite,
    },
];

/// Fetches VixCloud embed pages and digs the direct MP4 URL out of them.
pub struct VixCloudExtractor {
    client: Client,
    referer: String,
}

impl VixCloudExtractor {
    /// `referer` is the catalog base URL the embed page expects.
    pub fn new(referer: impl Into<String>) -> Result<Self> {
        // SECURITY EXCEPTION: the VixCloud CDN serves a broken certificate
        // chain, so validation is disabled for this client ONLY. The
        // catalog/search clients validate normally; do not widen this.
        let client = Client::builder()
            .user_agent(DESKTOP_USER_AGENT)
            .danger_accept_invalid_certs(true)
            .timeout(std::time::Duration::from_secs(TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            referer: referer.into(),
        })
    }

    /// Fetch the embed page and run the strategy cascade over its body.
    pub async fn extract(&self, embed_url: &str) -> Result<Option<String>> {
        let resp = self
            .client
            .get(embed_url)
            .header("Referer", &self.referer)
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .send()
            .await?;

        if !resp.status().is_success() {
            warn!(status = %resp.status(), "embed page fetch failed");
            return Ok(None);
        }

        let body = resp.text().await?;
        Ok(extract_from_body(&body))
    }
}

/// Run the ordered strategy cascade over an embed page body.
pub fn extract_from_body(body: &str) -> Option<String> {
    for strategy in STRATEGIES {
        if let Some(url) = (strategy.run)(body) {
            debug!(strategy = strategy.name, "media URL extracted");
            return Some(url);
        }
    }
    debug!("no extraction strategy matched");
    None
}

/// Strategy 1: `src_mp4`/`file` assignment in an inline script body.
/// Only absolute URLs are accepted.
fn inline_script_mp4(body: &str) -> Option<String> {
    let doc = Html::parse_document(body);
    let scripts = Selector::parse("script").ok()?;
    for script in doc.select(&scripts) {
        let text: String = script.text().collect();
        if let Some(caps) = SRC_MP4.captures(&text) {
            let url = caps[1].replace("\\/", "/");
            if url.starts_with("http") {
                return Some(url);
            }
        }
    }
    None
}

/// Strategy 2: scan the whole body for known CDN URL shapes, keeping only
/// signed (`token=` + `expires=`) candidates.
fn signed_url_scan(body: &str) -> Option<String> {
    for pattern in SIGNED_URL_PATTERNS.iter() {
        for caps in pattern.captures_iter(body) {
            let url = caps[1].replace("\\/", "/");
            if url.contains("token=") && url.contains("expires=") {
                return Some(url);
            }
        }
    }
    None
}

/// Strategy 3: parse the embedded player config and rewrite its playlist
/// URL into the direct-download form.
fn config_playlist_rewrite(body: &str) -> Option<String> {
    let caps = PLAYER_CONFIG.captures(body)?;
    let config: Value = serde_json::from_str(&caps[1]).ok()?;

    for key in CONFIG_KEYS {
        let Some(section) = config.get(key).filter(|v| v.is_object()) else {
            continue;
        };
        let Some(base_url) = section.get("url").and_then(Value::as_str) else {
            continue;
        };
        if !base_url.contains("playlist") || !base_url.contains("vixcloud.co") {
            continue;
        }

        let mut mp4_url = base_url.replace("/playlist/", "/download/").replace("m3u8", "mp4");

        let params = section.get("params");
        let token = params.and_then(|p| p.get("token")).and_then(param_str);
        let expires = params.and_then(|p| p.get("expires")).and_then(param_str);

        // Unsigned playlist URLs are not playable; keep looking.
        let (Some(token), Some(expires)) = (token, expires) else {
            continue;
        };

        let separator = if mp4_url.contains('?') { '&' } else { '?' };
        mp4_url.push(separator);
        mp4_url.push_str(&format!("token={token}&expires={expires}"));

        if config
            .get("canPlayFHD")
            .and_then(Value::as_bool)
            .unwrap_or(false)
        {
            mp4_url.push_str("&quality=1080p");
        }

        return Some(mp4_url);
    }
    None
}

/// Config params arrive as strings or bare numbers depending on player
/// version.
fn param_str(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
