//! Pattern Source
//!
//! Transport seam for the remote pattern manifest. The HTTP source uses a
//! host-supplied `reqwest::Client` so network timeouts stay the host's
//! decision.

use crate::error::PatternFetchError;
use crate::set::RemoteManifest;
use async_trait::async_trait;
use url::Url;

/// Remote origin of the versioned pattern manifest.
#[async_trait]
pub trait PatternSource: Send + Sync {
    /// One fetch of the current manifest.
    async fn fetch(&self) -> Result<RemoteManifest, PatternFetchError>;
}

/// Fetches the manifest from an HTTP endpoint serving JSON.
pub struct HttpPatternSource {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpPatternSource {
    pub fn new(client: reqwest::Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait]
impl PatternSource for HttpPatternSource {
    async fn fetch(&self) -> Result<RemoteManifest, PatternFetchError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| PatternFetchError::Network(e.to_string()))?;

        response.json::<RemoteManifest>().await.map_err(|e| {
            if e.is_decode() {
                PatternFetchError::MalformedPayload(e.to_string())
            } else {
                PatternFetchError::Network(e.to_string())
            }
        })
    }
}
