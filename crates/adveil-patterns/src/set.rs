//! Pattern Set
//!
//! The versioned set of ad signatures applied to HLS playlists. Sets are
//! immutable once built; updates replace the whole set by reference.

use crate::error::PatternFetchError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Bundled fallback set, compiled into the binary.
const DEFAULT_PATTERNS: &str = include_str!("../resources/default_patterns.json");

static BUNDLED: LazyLock<AdPatternSet> = LazyLock::new(|| {
    let manifest: RemoteManifest =
        serde_json::from_str(DEFAULT_PATTERNS).expect("bundled pattern set must parse");
    manifest.into_set(None)
});

/// One ad signature. The closed set of kinds mirrors the stitched-ad
/// signaling conventions of the streaming platform: ad breaks are marked
/// by EXT-X-DATERANGE class/id, by known segment titles, or by segment
/// URI substrings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum AdSignature {
    /// EXT-X-DATERANGE CLASS attribute equals this value
    DaterangeClass(String),
    /// EXT-X-DATERANGE ID attribute starts with this prefix
    DaterangeIdPrefix(String),
    /// Segment title contains this value
    SegmentTitle(String),
    /// Segment URI contains this substring
    UriSubstring(String),
}

impl AdSignature {
    fn value(&self) -> &str {
        match self {
            Self::DaterangeClass(v)
            | Self::DaterangeIdPrefix(v)
            | Self::SegmentTitle(v)
            | Self::UriSubstring(v) => v,
        }
    }
}

/// The in-memory pattern set. Always defined post-init; never mutated in
/// place, only replaced by whole-reference swap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdPatternSet {
    pub version: u32,
    pub patterns: Vec<AdSignature>,
    /// When this set was fetched from the remote source.
    /// `None` for the bundled default.
    pub fetched_at: Option<DateTime<Utc>>,
}

impl AdPatternSet {
    /// The bundled fallback set.
    pub fn bundled() -> Self {
        BUNDLED.clone()
    }
}

/// Remote pattern manifest wire shape: a versioned JSON document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteManifest {
    pub version: u32,
    pub patterns: Vec<AdSignature>,
}

impl RemoteManifest {
    /// Structural validation of a fetched payload. Unknown signature
    /// kinds were already rejected during deserialization.
    pub fn validate(&self) -> Result<(), PatternFetchError> {
        if self.version == 0 {
            return Err(PatternFetchError::MalformedPayload(
                "version must be >= 1".into(),
            ));
        }
        if self.patterns.is_empty() {
            return Err(PatternFetchError::MalformedPayload(
                "empty pattern list".into(),
            ));
        }
        if let Some(sig) = self.patterns.iter().find(|s| s.value().is_empty()) {
            return Err(PatternFetchError::MalformedPayload(format!(
                "empty signature value in {sig:?}"
            )));
        }
        Ok(())
    }

    pub fn into_set(self, fetched_at: Option<DateTime<Utc>>) -> AdPatternSet {
        AdPatternSet {
            version: self.version,
            patterns: self.patterns,
            fetched_at,
        }
    }
}
