//! Resolution pipeline errors
//!
//! Transport and parse failures at a single endpoint or pagination step are
//! caught at the call site and degrade the aggregate result (empty list,
//! truncated catalog, missing media URL). Auth failure is the one condition
//! that stops a whole branch: without credentials the dependent calls cannot
//! proceed. "Channel not found" and "found but no playable URL" are ordinary
//! outcomes, not errors — see [`crate::matcher`] and the CLI exit codes.

use thiserror::Error;

/// Pipeline errors
#[derive(Error, Debug)]
pub enum Error {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
