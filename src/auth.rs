//! Session Authentication
//!
//! Both upstreams gate their APIs behind an ephemeral anti-bot session:
//!
//! - AnimeUnity hands out a CSRF token in a meta tag on the site root plus
//!   session cookies ([`CsrfAuth`]).
//! - Vavoo signs a device-fingerprint telemetry ping and expects the
//!   returned signature on every API call ([`SignatureAuth`]).
//!
//! Credentials are single-use: acquired once per invocation, never
//! refreshed or persisted. Neither variant retries — the caller decides
//! whether to abort or degrade to empty results.

use std::collections::HashMap;
use std::time::SystemTime;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::fingerprint;

/// Signature ping always goes to the official app host, regardless of the
/// configured catalog domain.
const SIGNATURE_URL: &str = "https://www.vavoo.tv/api/app/ping";

/// Per-request credentials for one upstream host.
#[derive(Debug, Clone)]
pub struct Credential {
    /// CSRF token or API signature, depending on the variant.
    pub token: String,
    /// Session cookies captured during acquisition.
    pub cookies: HashMap<String, String>,
    /// Headers to attach to every subsequent request.
    pub extra_headers: HashMap<String, String>,
    /// Acquisition time.
    pub issued_at: SystemTime,
}

impl Credential {
    /// Convert `extra_headers` to a reqwest `HeaderMap`, skipping any value
    /// that is not a legal header.
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.extra_headers {
            if let (Ok(name), Ok(value)) = (
                name.parse::<reqwest::header::HeaderName>(),
                HeaderValue::from_str(value),
            ) {
                headers.insert(name, value);
            }
        }
        headers
    }
}

/// Trait for per-source session acquisition.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Acquire a fresh [`Credential`] for the upstream.
    async fn credential(&self) -> Result<Credential>;
}

/// Cookie + CSRF session against a Laravel-style site root.
pub struct CsrfAuth {
    client: Client,
    base_url: String,
    user_agent: String,
}

impl CsrfAuth {
    pub fn new(client: Client, base_url: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            user_agent: user_agent.into(),
        }
    }
}

#[async_trait]
impl Authenticator for CsrfAuth {
    async fn credential(&self) -> Result<Credential> {
        let resp = self
            .client
            .get(format!("{}/", self.base_url))
            .send()
            .await
            .map_err(|e| Error::Auth(format!("site root unreachable: {e}")))?;

        if !resp.status().is_success() {
            return Err(Error::Auth(format!("site root status {}", resp.status())));
        }

        let cookies: HashMap<String, String> = resp
            .cookies()
            .map(|c| (c.name().to_string(), c.value().to_string()))
            .collect();

        let body = resp.text().await?;
        let token = extract_csrf_token(&body)
            .ok_or_else(|| Error::Auth("csrf-token meta tag not found".into()))?;

        debug!(cookies = cookies.len(), "CSRF session established");

        let extra_headers = HashMap::from([
            ("X-Requested-With".to_string(), "XMLHttpRequest".to_string()),
            (
                "Content-Type".to_string(),
                "application/json;charset=utf-8".to_string(),
            ),
            ("X-CSRF-Token".to_string(), token.clone()),
            ("Referer".to_string(), self.base_url.clone()),
            ("User-Agent".to_string(), self.user_agent.clone()),
        ]);

        Ok(Credential {
            token,
            cookies,
            extra_headers,
            issued_at: SystemTime::now(),
        })
    }
}

/// Signed device-fingerprint session for the Vavoo app API.
pub struct SignatureAuth {
    client: Client,
}

impl SignatureAuth {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Authenticator for SignatureAuth {
    async fn credential(&self) -> Result<Credential> {
        let resp = self
            .client
            .post(SIGNATURE_URL)
            .headers(fingerprint::ping_headers())
            .json(&fingerprint::ping_payload())
            .send()
            .await
            .map_err(|e| Error::Auth(format!("signature ping failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(Error::Auth(format!(
                "signature ping status {}",
                resp.status()
            )));
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| Error::Auth(format!("signature ping body: {e}")))?;

        let signature = body
            .get("addonSig")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::Auth("ping response missing addonSig".into()))?;

        debug!("app signature acquired");

        let extra_headers = HashMap::from([(
            "mediahubmx-signature".to_string(),
            signature.to_string(),
        )]);

        Ok(Credential {
            token: signature.to_string(),
            cookies: HashMap::new(),
            extra_headers,
            issued_at: SystemTime::now(),
        })
    }
}

/// Pull the CSRF token out of `<meta name="csrf-token" content="...">`.
fn extract_csrf_token(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let selector = Selector::parse(r#"meta[name="csrf-token"]"#).ok()?;
    doc.select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .filter(|content| !content.is_empty())
        .map(ToString::to_string)
}
