//! `trova` - Playable-link resolution for undocumented catalog APIs
//!
//! # Features
//!
//! - **Session handling**: cookie+CSRF handshake and signed
//!   device-fingerprint handshake, one per upstream
//! - **Search cascade**: two independent endpoints with ordered
//!   query-relaxation fallbacks
//! - **Catalog crawling**: count-then-range windows and cursor pagination
//! - **Stream extraction**: ordered strategies over the VixCloud embed
//!   player, down to a direct MP4 URL
//! - **Name matching**: three-tier channel-name resolution with a
//!   persisted name→URL cache
//!
//! # Example
//!
//! ```rust,no_run
//! use trova::providers::AnimeUnity;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let site = AnimeUnity::new("animeunity.so")?;
//!     let hits = site.search_with_fallback("Boku no Hero (Season 2)", false).await?;
//!     println!("{} results", hits.len());
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod fingerprint;
pub mod matcher;
pub mod providers;

pub use auth::{Authenticator, Credential, CsrfAuth, SignatureAuth};
pub use cache::LinkCache;
pub use config::Domains;
pub use error::{Error, Result};
pub use extract::VixCloudExtractor;
pub use matcher::{find_channel, MatchTier};
pub use providers::animeunity::{AnimeUnity, ResolvedStream, SearchResult};
pub use providers::vavoo::{Channel, Vavoo};

/// Version of trova
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
