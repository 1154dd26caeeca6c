//! Error types for pattern fetching and caching.
//!
//! Nothing here escapes the updater as an exception; fetch failures
//! surface to callers only as a `None` refresh result plus stats.

use thiserror::Error;

/// Why a pattern refresh produced no update.
#[derive(Debug, Error)]
pub enum PatternFetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Stale version: fetched {fetched} is not newer than current {current}")]
    StaleVersion { fetched: u32, current: u32 },
}

/// Errors from the persistent pattern cache.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt cache document: {0}")]
    Corrupt(#[from] serde_json::Error),
}
