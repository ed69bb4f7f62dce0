//! AnimeUnity catalog provider
//!
//! A Laravel-style site: search and episode APIs sit behind a cookie+CSRF
//! session ([`crate::auth::CsrfAuth`]), episode listings come in fixed-size
//! offset windows, and the episode page embeds a VixCloud player that the
//! extractor turns into a direct MP4 link.

use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONNECTION};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};
use url::Url;

use crate::auth::{Authenticator, Credential, CsrfAuth};
use crate::error::Result;
use crate::extract::VixCloudExtractor;

/// Fixed desktop profile; the site rejects obviously headless agents.
pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

const TIMEOUT_SECS: u64 = 20;

/// Episode listings are fetched in windows of this many items.
const EPISODE_WINDOW: u64 = 120;

/// `<iframe src="...vixcloud...">` fallback when the `video-player` element
/// is missing.
static VIXCLOUD_IFRAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<iframe[^>]+src="([^"]*vixcloud[^"]+)""#).unwrap());

type QueryTransform = fn(&str) -> Option<String>;

/// Query-relaxation fallbacks, in order. Each returns `None` when it does
/// not apply to the query; the first transform producing results ends the
/// cascade.
const QUERY_FALLBACKS: &[QueryTransform] =
    &[strip_apostrophes, strip_parenthetical, first_three_words];

/// One merged search hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: u64,
    pub slug: String,
    pub name: String,
    pub episodes_count: u64,
}

/// Episode object, passed through with upstream fields intact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Final output of the stream pipeline. `mp4_url` can only be set when an
/// embed URL was found — extraction has nothing to work on otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedStream {
    pub episode_page: String,
    pub embed_url: Option<String>,
    pub mp4_url: Option<String>,
}

/// AnimeUnity search/catalog/stream client.
pub struct AnimeUnity {
    client: Client,
    base_url: String,
    auth: CsrfAuth,
    extractor: VixCloudExtractor,
}

impl AnimeUnity {
    pub fn new(domain: &str) -> Result<Self> {
        let base_url = format!("https://www.{domain}");

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(
            "Upgrade-Insecure-Requests",
            HeaderValue::from_static("1"),
        );

        let client = Client::builder()
            .user_agent(DESKTOP_USER_AGENT)
            .default_headers(headers)
            .cookie_store(true)
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            auth: CsrfAuth::new(client.clone(), base_url.clone(), DESKTOP_USER_AGENT),
            extractor: VixCloudExtractor::new(base_url.clone())?,
            client,
            base_url,
        })
    }

    /// Search both endpoints with the query as given.
    ///
    /// The lightweight live search and the full archive filter run
    /// independently; either can fail without affecting the other. A failed
    /// session handshake degrades to an empty result set.
    pub async fn search(&self, query: &str, dubbed: bool) -> Result<Vec<SearchResult>> {
        let credential = match self.auth.credential().await {
            Ok(c) => c,
            Err(e) => {
                warn!("session acquisition failed, returning no results: {e}");
                return Ok(vec![]);
            }
        };

        let live = self.search_endpoint(
            &credential,
            "livesearch",
            json!({"title": query}),
        );
        let archive = self.search_endpoint(
            &credential,
            "archivio/get-animes",
            json!({
                "title": query,
                "type": false,
                "year": false,
                "order": "Lista A-Z",
                "status": false,
                "genres": false,
                "season": false,
                "offset": 0,
                "dubbed": dubbed,
            }),
        );
        let (live, archive) = tokio::join!(live, archive);

        let mut batches = Vec::new();
        for (endpoint, outcome) in [("livesearch", live), ("archivio/get-animes", archive)] {
            match outcome {
                Ok(records) => batches.push(records),
                Err(e) => warn!(endpoint, "search endpoint failed: {e}"),
            }
        }

        let results = merge_records(batches);
        debug!(query, count = results.len(), "search complete");
        Ok(results)
    }

    /// Search with the ordered query-relaxation cascade: the raw query
    /// first, then each applicable fallback until one yields results.
    /// An exhausted cascade is an empty vec, not an error.
    pub async fn search_with_fallback(
        &self,
        query: &str,
        dubbed: bool,
    ) -> Result<Vec<SearchResult>> {
        let results = self.search(query, dubbed).await?;
        if !results.is_empty() {
            return Ok(results);
        }

        for transform in QUERY_FALLBACKS {
            let Some(relaxed) = transform(query) else {
                continue;
            };
            debug!(query = %relaxed, "retrying with relaxed query");
            let results = self.search(&relaxed, dubbed).await?;
            if !results.is_empty() {
                return Ok(results);
            }
        }
        Ok(vec![])
    }

    async fn search_endpoint(
        &self,
        credential: &Credential,
        endpoint: &str,
        payload: Value,
    ) -> Result<Vec<Record>> {
        let page = self
            .client
            .post(format!("{}/{endpoint}", self.base_url))
            .headers(credential.headers())
            .json(&payload)
            .send()
            .await?
            .error_for_status()?
            .json::<SearchPage>()
            .await?;
        Ok(page.records)
    }

    /// Fetch the full episode list: one count request, then fixed-size
    /// windows until the count is covered. A window failure truncates the
    /// listing to what was already fetched.
    pub async fn episodes(&self, anime_id: u64) -> Result<Vec<Episode>> {
        let total = match self.episode_count(anime_id).await {
            Ok(n) => n,
            Err(e) => {
                warn!(anime_id, "episode count failed: {e}");
                return Ok(vec![]);
            }
        };

        let mut episodes = Vec::new();
        for (start, end) in episode_windows(total) {
            match self.episode_window(anime_id, start, end).await {
                Ok(mut page) => episodes.append(&mut page),
                Err(e) => {
                    warn!(start, end, "episode window failed, keeping {}: {e}", episodes.len());
                    break;
                }
            }
        }
        Ok(episodes)
    }

    async fn episode_count(&self, anime_id: u64) -> Result<u64> {
        let info = self
            .client
            .get(format!("{}/info_api/{anime_id}/", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json::<InfoResponse>()
            .await?;
        Ok(info.episodes_count)
    }

    async fn episode_window(&self, anime_id: u64, start: u64, end: u64) -> Result<Vec<Episode>> {
        let page = self
            .client
            .get(format!("{}/info_api/{anime_id}/1", self.base_url))
            .query(&[("start_range", start), ("end_range", end)])
            .send()
            .await?
            .error_for_status()?
            .json::<EpisodesPage>()
            .await?;
        Ok(page.episodes)
    }

    /// Resolve one episode to its page, embed and direct media URLs.
    ///
    /// Every stage degrades independently: an unreachable episode page
    /// yields neither URL, a missing player yields no embed, and extraction
    /// drift yields an embed without media — all normal outcomes.
    pub async fn stream(
        &self,
        anime_id: u64,
        slug: &str,
        episode_id: u64,
    ) -> Result<ResolvedStream> {
        let episode_page = format!("{}/anime/{anime_id}-{slug}/{episode_id}", self.base_url);

        let body = match self.page_body(&episode_page).await {
            Ok(b) => b,
            Err(e) => {
                warn!(%episode_page, "episode page fetch failed: {e}");
                return Ok(ResolvedStream {
                    episode_page,
                    embed_url: None,
                    mp4_url: None,
                });
            }
        };

        let embed_url = extract_embed_url(&body, &self.base_url);
        let mp4_url = match embed_url.as_deref() {
            Some(url) => self.extractor.extract(url).await.unwrap_or_else(|e| {
                warn!("embed extraction failed: {e}");
                None
            }),
            None => None,
        };

        Ok(ResolvedStream {
            episode_page,
            embed_url,
            mp4_url,
        })
    }

    async fn page_body(&self, url: &str) -> Result<String> {
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    }
}

/// Merge search batches in endpoint order, deduplicating by record id.
/// Title precedence inside a record: `title_it`, `title_eng`, `title`.
/// Records without an id or with a blank title are dropped.
fn merge_records(batches: Vec<Vec<Record>>) -> Vec<SearchResult> {
    let mut seen = HashSet::new();
    let mut results = Vec::new();
    for record in batches.into_iter().flatten() {
        let Some(id) = record.id else { continue };
        if !seen.insert(id) {
            continue;
        }
        let name = [&record.title_it, &record.title_eng, &record.title]
            .into_iter()
            .find_map(|t| t.as_deref().filter(|t| !t.is_empty()))
            .unwrap_or_default()
            .trim()
            .to_string();
        if name.is_empty() {
            continue;
        }
        results.push(SearchResult {
            id,
            slug: record.slug.unwrap_or_default(),
            name,
            episodes_count: record.episodes_count.unwrap_or(0),
        });
    }
    results
}

/// Drop straight and curly apostrophes.
fn strip_apostrophes(query: &str) -> Option<String> {
    if query.contains('\'') || query.contains('\u{2019}') {
        Some(query.replace('\'', "").replace('\u{2019}', ""))
    } else {
        None
    }
}

/// Truncate at the first opening parenthesis.
fn strip_parenthetical(query: &str) -> Option<String> {
    query
        .split_once('(')
        .map(|(head, _)| head.trim().to_string())
}

/// Keep the first three whitespace-delimited words.
fn first_three_words(query: &str) -> Option<String> {
    let words: Vec<&str> = query.split_whitespace().collect();
    if words.len() > 3 {
        Some(words[..3].join(" "))
    } else {
        None
    }
}

/// Window boundaries (1-based, inclusive) covering `total` episodes.
fn episode_windows(total: u64) -> Vec<(u64, u64)> {
    let mut windows = Vec::new();
    let mut start = 1;
    while start <= total {
        let end = (start + EPISODE_WINDOW - 1).min(total);
        windows.push((start, end));
        start = end + 1;
    }
    windows
}

/// Find the VixCloud embed URL in an episode page: the `video-player`
/// element's `embed_url` attribute, else the first VixCloud iframe.
/// Protocol-relative and root-relative URLs are expanded against `base`.
fn extract_embed_url(html: &str, base: &str) -> Option<String> {
    let from_player = {
        let doc = scraper::Html::parse_document(html);
        let selector = scraper::Selector::parse("video-player").ok()?;
        doc.select(&selector)
            .next()
            .and_then(|el| el.value().attr("embed_url"))
            .filter(|u| !u.is_empty())
            .map(ToString::to_string)
    };

    let embed = from_player.or_else(|| {
        VIXCLOUD_IFRAME
            .captures(html)
            .map(|caps| caps[1].to_string())
    })?;

    normalize_embed_url(&embed, base)
}

fn normalize_embed_url(embed: &str, base: &str) -> Option<String> {
    if embed.starts_with("//") {
        Some(format!("https:{embed}"))
    } else if embed.starts_with('/') {
        Url::parse(base)
            .and_then(|b| b.join(embed))
            .map(String::from)
            .ok()
    } else {
        Some(embed.to_string())
    }
}

// Serde structures for the search/episode APIs

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    records: Vec<Record>,
}

#[derive(Debug, Deserialize)]
struct Record {
    id: Option<u64>,
    slug: Option<String>,
    title_it: Option<String>,
    title_eng: Option<String>,
    title: Option<String>,
    episodes_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct InfoResponse {
    #[serde(default)]
    episodes_count: u64,
}

#[derive(Debug, Deserialize)]
struct EpisodesPage {
    #[serde(default)]
    episodes: Vec<Episode>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u64, title_it: Option<&str>, title_eng: Option<&str>, title: Option<&str>) -> Record {
        Record {
            id: Some(id),
            slug: Some(format!("slug-{id}")),
            title_it: title_it.map(String::from),
            title_eng: title_eng.map(String::from),
            title: title.map(String::from),
            episodes_count: Some(12),
        }
    }

    #[test]
    fn test_merge_dedupes_by_id_with_title_precedence() {
        let live = vec![record(7, Some("Titolo IT"), Some("English Title"), None)];
        let archive = vec![
            record(7, None, Some("English Title"), None),
            record(9, None, None, Some("Bare Title")),
        ];
        let merged = merge_records(vec![live, archive]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].id, 7);
        assert_eq!(merged[0].name, "Titolo IT");
        assert_eq!(merged[1].name, "Bare Title");
    }

    #[test]
    fn test_merge_drops_blank_and_idless_records() {
        let blank = record(3, Some("   "), None, None);
        let idless = Record {
            id: None,
            ..record(0, Some("Ghost"), None, None)
        };
        assert!(merge_records(vec![vec![blank, idless]]).is_empty());
    }

    #[test]
    fn test_strip_apostrophes() {
        assert_eq!(
            strip_apostrophes("Jo'burg l\u{2019}anime").as_deref(),
            Some("Joburg lanime")
        );
        assert_eq!(strip_apostrophes("no apostrophe"), None);
    }

    #[test]
    fn test_strip_parenthetical() {
        assert_eq!(
            strip_parenthetical("Boku no Hero (Season 2)").as_deref(),
            Some("Boku no Hero")
        );
        assert_eq!(strip_parenthetical("Boku no Hero"), None);
    }

    #[test]
    fn test_first_three_words() {
        assert_eq!(
            first_three_words("one two three four five").as_deref(),
            Some("one two three")
        );
        assert_eq!(first_three_words("one two three"), None);
    }

    #[test]
    fn test_fallback_order() {
        // The parenthesis fallback must fire before the word-count one.
        let query = "Boku no Hero Academia (Season 2)";
        let applied: Vec<String> = QUERY_FALLBACKS
            .iter()
            .filter_map(|t| t(query))
            .collect();
        assert_eq!(applied[0], "Boku no Hero Academia");
        assert_eq!(applied[1], "Boku no Hero");
    }

    #[test]
    fn test_episode_windows() {
        assert_eq!(episode_windows(250), vec![(1, 120), (121, 240), (241, 250)]);
        assert_eq!(episode_windows(120), vec![(1, 120)]);
        assert_eq!(episode_windows(1), vec![(1, 1)]);
        assert!(episode_windows(0).is_empty());
    }

    #[test]
    fn test_extract_embed_url_from_video_player() {
        let html = r#"<video-player embed_url="https://vixcloud.co/embed/123"></video-player>"#;
        assert_eq!(
            extract_embed_url(html, "https://www.animeunity.so").as_deref(),
            Some("https://vixcloud.co/embed/123")
        );
    }

    #[test]
    fn test_extract_embed_url_iframe_fallback() {
        let html = r#"<iframe title="player" src="https://vixcloud.co/embed/456?x=1"></iframe>"#;
        assert_eq!(
            extract_embed_url(html, "https://www.animeunity.so").as_deref(),
            Some("https://vixcloud.co/embed/456?x=1")
        );
    }

    #[test]
    fn test_embed_url_normalization() {
        let base = "https://www.animeunity.so";
        assert_eq!(
            normalize_embed_url("//vixcloud.co/embed/1", base).as_deref(),
            Some("https://vixcloud.co/embed/1")
        );
        assert_eq!(
            normalize_embed_url("/embed/1", base).as_deref(),
            Some("https://www.animeunity.so/embed/1")
        );
        assert_eq!(
            normalize_embed_url("https://vixcloud.co/embed/1", base).as_deref(),
            Some("https://vixcloud.co/embed/1")
        );
    }
}
