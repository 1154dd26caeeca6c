//! adveil - ad suppression for a live-streaming desktop client
//!
//! Ties the three suppression layers together behind one facade:
//! - network: `should_block` on every outgoing request
//! - playlist: `process_manifest` on every HLS playlist response
//! - page: `inject_cosmetics` once per loaded content view
//!
//! Services are constructed once at process start and passed by
//! reference: no global state, no import-time side effects. The host's
//! UI drives the engine through the `EngineCommand` surface.

mod command;
mod config;
mod status;

pub use command::{EngineCommand, EngineResponse};
pub use config::EngineConfig;
pub use status::{EngineStatus, PatternFreshness};

// Re-export the service types the host wires against.
pub use adveil_cosmetic::{
    CosmeticFilter, CosmeticInjectionResult, InjectionContext, InjectionFailure,
};
pub use adveil_patterns::{
    AdPatternSet, AdSignature, HttpPatternSource, JsonFileStore, MemoryStore, PatternSource,
    PatternStore, PatternUpdater, UpdaterStats,
};
pub use adveil_proxy::{ManifestProxy, ProxyStats, ReaperConfig, spawn_session_reaper};
pub use adveil_rules::{
    BlockDecision, BlockRule, BlockStats, RequestClassifier, RuleCategory, RuleTable,
    RuleTableError,
};

use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Engine construction failures. Only rule-table loading can fail;
/// everything else degrades to bundled defaults.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Rule table error: {0}")]
    Rules(#[from] RuleTableError),
}

/// The assembled ad-suppression engine.
pub struct Engine {
    classifier: Arc<RequestClassifier>,
    cosmetic: Arc<CosmeticFilter>,
    updater: Arc<PatternUpdater>,
    proxy: Arc<ManifestProxy>,
}

impl Engine {
    /// Build the engine with the bundled rule table, a file-backed
    /// pattern cache, and an HTTP pattern source. The cached pattern set
    /// is read synchronously here, before any classification occurs.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let classifier = Arc::new(RequestClassifier::new(RuleTable::bundled()?));
        let cosmetic = Arc::new(CosmeticFilter::new());

        let source = Arc::new(HttpPatternSource::new(
            config.http_client,
            config.pattern_endpoint,
        ));
        let store = Arc::new(JsonFileStore::new(config.pattern_cache_path));
        let updater = PatternUpdater::new(source, store, config.refresh_interval);

        let proxy = Arc::new(ManifestProxy::new(updater.clone()));
        spawn_session_reaper(config.reaper, Arc::downgrade(&proxy));

        info!(
            "Engine ready: {} rules, pattern set v{}",
            classifier.rule_count(),
            updater.current_patterns().version
        );

        Ok(Self {
            classifier,
            cosmetic,
            updater,
            proxy,
        })
    }

    /// Assemble an engine from caller-built services. Spawns the idle
    /// reaper over the given proxy.
    pub fn from_parts(
        classifier: Arc<RequestClassifier>,
        cosmetic: Arc<CosmeticFilter>,
        updater: Arc<PatternUpdater>,
        proxy: Arc<ManifestProxy>,
        reaper: ReaperConfig,
    ) -> Self {
        spawn_session_reaper(reaper, Arc::downgrade(&proxy));
        Self {
            classifier,
            cosmetic,
            updater,
            proxy,
        }
    }

    /// Network hot path: classify one outgoing request URL.
    #[inline]
    pub fn should_block(&self, url: &str) -> BlockDecision<'_> {
        self.classifier.should_block(url)
    }

    /// Playlist hot path: rewrite one manifest response for a channel.
    #[inline]
    pub fn process_manifest(&self, channel: &str, body: &str) -> String {
        self.proxy.process_manifest(channel, body)
    }

    /// Page layer: inject hide-rules into a content view.
    pub fn inject_cosmetics(&self, context: &dyn InjectionContext) -> CosmeticInjectionResult {
        self.cosmetic.inject_into_context(context)
    }

    /// Combined status rollup.
    pub fn status(&self) -> EngineStatus {
        status::aggregate(&self.classifier, &self.cosmetic, &self.proxy, &self.updater)
    }

    pub fn classifier(&self) -> &Arc<RequestClassifier> {
        &self.classifier
    }

    pub fn cosmetic(&self) -> &Arc<CosmeticFilter> {
        &self.cosmetic
    }

    pub fn updater(&self) -> &Arc<PatternUpdater> {
        &self.updater
    }

    pub fn proxy(&self) -> &Arc<ManifestProxy> {
        &self.proxy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adveil_patterns::{MemoryStore, PatternFetchError, PatternSource, RemoteManifest};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    struct FakeSource {
        manifest: Mutex<Option<RemoteManifest>>,
    }

    impl FakeSource {
        fn offline() -> Self {
            Self {
                manifest: Mutex::new(None),
            }
        }

        fn with_version(version: u32) -> Self {
            Self {
                manifest: Mutex::new(Some(RemoteManifest {
                    version,
                    patterns: vec![AdSignature::DaterangeClass("twitch-stitched-ad".into())],
                })),
            }
        }
    }

    #[async_trait]
    impl PatternSource for FakeSource {
        async fn fetch(&self) -> Result<RemoteManifest, PatternFetchError> {
            match &*self.manifest.lock().unwrap() {
                Some(m) => Ok(m.clone()),
                None => Err(PatternFetchError::Network("offline".into())),
            }
        }
    }

    fn test_engine(source: FakeSource) -> Engine {
        let classifier = Arc::new(RequestClassifier::new(RuleTable::bundled().unwrap()));
        let cosmetic = Arc::new(CosmeticFilter::new());
        let updater = PatternUpdater::new(
            Arc::new(source),
            Arc::new(MemoryStore::new()),
            Duration::from_secs(3600),
        );
        let proxy = Arc::new(ManifestProxy::new(updater.clone()));
        Engine::from_parts(classifier, cosmetic, updater, proxy, ReaperConfig::default())
    }

    struct FakeContext;

    impl InjectionContext for FakeContext {
        fn context_id(&self) -> &str {
            "player-view"
        }
        fn inject_css(&self, _css: &str) -> Result<(), adveil_cosmetic::InjectionFailure> {
            Ok(())
        }
        fn inject_js(&self, _js: &str) -> Result<(), adveil_cosmetic::InjectionFailure> {
            Ok(())
        }
    }

    const AD_PLAYLIST: &str = "#EXTM3U\n\
#EXT-X-VERSION:3\n\
#EXT-X-TARGETDURATION:2\n\
#EXT-X-MEDIA-SEQUENCE:5\n\
#EXTINF:2.000,Amazon\n\
https://video-edge.example.net/stitched-ad/seg5.ts\n\
#EXTINF:2.000,live\n\
https://video-edge.example.net/v1/seg6.ts\n";

    #[tokio::test]
    async fn test_end_to_end_suppression_layers() {
        let engine = test_engine(FakeSource::offline());

        // Network layer
        assert!(engine.should_block("https://edge.ads.twitch.tv/creative").is_blocked());
        assert!(!engine.should_block("https://www.twitch.tv/somechannel").is_blocked());

        // Playlist layer
        let body = engine.process_manifest("somechannel", AD_PLAYLIST);
        assert!(!body.contains("seg5.ts"));
        assert!(body.contains("seg6.ts"));

        // Page layer
        assert!(engine.inject_cosmetics(&FakeContext).success);

        let status = engine.status();
        assert_eq!(status.blocking.total_blocked, 1);
        assert_eq!(status.proxy.segments_stripped, 1);
        assert_eq!(status.patterns.current_version, 1);
    }

    #[tokio::test]
    async fn test_toggle_command_flips_only_named_layers() {
        let engine = test_engine(FakeSource::offline());

        let response = engine
            .handle(EngineCommand::Toggle {
                network: Some(false),
                cosmetic: None,
            })
            .await;

        match response {
            EngineResponse::Toggled {
                network_enabled,
                cosmetic_enabled,
            } => {
                assert!(!network_enabled);
                assert!(cosmetic_enabled);
            }
            other => panic!("unexpected response: {other:?}"),
        }

        assert!(!engine.should_block("https://edge.ads.twitch.tv/creative").is_blocked());
    }

    #[tokio::test]
    async fn test_refresh_command_reports_applied() {
        let engine = test_engine(FakeSource::with_version(4));

        let response = engine.handle(EngineCommand::RefreshPatterns).await;
        match response {
            EngineResponse::PatternsRefreshed { applied, version } => {
                assert!(applied);
                assert_eq!(version, 4);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_refresh_command_reports_not_applied_when_offline() {
        let engine = test_engine(FakeSource::offline());

        let response = engine.handle(EngineCommand::RefreshPatterns).await;
        match response {
            EngineResponse::PatternsRefreshed { applied, version } => {
                assert!(!applied);
                assert_eq!(version, 1);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_clear_stream_commands() {
        let engine = test_engine(FakeSource::offline());
        engine.process_manifest("chan-a", AD_PLAYLIST);
        engine.process_manifest("chan-b", AD_PLAYLIST);

        let response = engine
            .handle(EngineCommand::ClearStream {
                channel: "chan-a".into(),
            })
            .await;
        assert!(matches!(
            response,
            EngineResponse::StreamCleared { removed: true }
        ));

        engine.handle(EngineCommand::ClearAllStreams).await;
        assert_eq!(engine.proxy().stats().channels_tracked, 0);
    }

    #[tokio::test]
    async fn test_auto_update_command() {
        let engine = test_engine(FakeSource::with_version(2));

        let response = engine
            .handle(EngineCommand::SetAutoUpdate { enabled: true })
            .await;
        assert!(matches!(
            response,
            EngineResponse::AutoUpdateSet { enabled: true }
        ));

        let response = engine
            .handle(EngineCommand::SetAutoUpdate { enabled: false })
            .await;
        assert!(matches!(
            response,
            EngineResponse::AutoUpdateSet { enabled: false }
        ));
    }

    #[tokio::test]
    async fn test_inject_cosmetics_command() {
        let engine = test_engine(FakeSource::offline());

        let response = engine
            .handle(EngineCommand::InjectCosmetics {
                context: Arc::new(FakeContext),
            })
            .await;
        match response {
            EngineResponse::Injection(result) => assert!(result.success),
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_status_serializes_for_the_host_ui() {
        let engine = test_engine(FakeSource::offline());
        engine.should_block("https://edge.ads.twitch.tv/creative");

        let status = engine.status();
        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("\"total_blocked\":1"));
        assert!(json.contains("\"current_version\":1"));
    }
}
