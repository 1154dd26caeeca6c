//! Stats Aggregator
//!
//! Read-only rollup over the classifier, proxy, pattern updater, and
//! cosmetic filter. Computed on demand from their accessors, with no
//! storage and no failure modes of its own.

use adveil_cosmetic::CosmeticFilter;
use adveil_patterns::PatternUpdater;
use adveil_proxy::{ManifestProxy, ProxyStats};
use adveil_rules::{BlockStats, RequestClassifier};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Pattern-set freshness metadata for the status display.
#[derive(Debug, Clone, Serialize)]
pub struct PatternFreshness {
    pub current_version: u32,
    pub last_fetch_attempt: Option<DateTime<Utc>>,
    pub last_successful_fetch: Option<DateTime<Utc>>,
    pub auto_update_enabled: bool,
}

/// Combined engine status snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub network_blocking_enabled: bool,
    pub cosmetic_filtering_enabled: bool,
    pub blocking: BlockStats,
    pub proxy: ProxyStats,
    pub patterns: PatternFreshness,
}

pub(crate) fn aggregate(
    classifier: &RequestClassifier,
    cosmetic: &CosmeticFilter,
    proxy: &ManifestProxy,
    updater: &PatternUpdater,
) -> EngineStatus {
    let updater_stats = updater.stats();
    EngineStatus {
        network_blocking_enabled: classifier.is_enabled(),
        cosmetic_filtering_enabled: cosmetic.is_active(),
        blocking: classifier.stats(),
        proxy: proxy.stats(),
        patterns: PatternFreshness {
            current_version: updater_stats.current_version,
            last_fetch_attempt: updater_stats.last_fetch_attempt,
            last_successful_fetch: updater_stats.last_successful_fetch,
            auto_update_enabled: updater_stats.is_auto_update_enabled,
        },
    }
}
