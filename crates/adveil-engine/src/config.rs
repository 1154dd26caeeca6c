//! Engine configuration.

use adveil_proxy::ReaperConfig;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Configuration for `Engine::new`.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Remote endpoint serving the versioned pattern manifest
    pub pattern_endpoint: Url,
    /// Where the last-good pattern set is cached
    pub pattern_cache_path: PathBuf,
    /// HTTP client for the manifest fetch. Network timeouts are the
    /// host's decision and travel with this client.
    pub http_client: reqwest::Client,
    /// Auto-update refresh interval
    pub refresh_interval: Duration,
    /// Idle-session reaper settings
    pub reaper: ReaperConfig,
}

impl EngineConfig {
    pub fn new(pattern_endpoint: Url, pattern_cache_path: impl Into<PathBuf>) -> Self {
        Self {
            pattern_endpoint,
            pattern_cache_path: pattern_cache_path.into(),
            http_client: reqwest::Client::new(),
            refresh_interval: Duration::from_secs(3600),
            reaper: ReaperConfig::default(),
        }
    }
}
