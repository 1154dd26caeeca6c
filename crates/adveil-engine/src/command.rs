//! Command surface between the host/UI and the engine.
//!
//! Transport-agnostic: the host's IPC layer decodes whatever wire format
//! it uses into these commands and encodes the responses back.

use crate::Engine;
use crate::status::EngineStatus;
use adveil_cosmetic::{CosmeticInjectionResult, InjectionContext};
use adveil_patterns::{AdPatternSet, UpdaterStats};
use adveil_proxy::ProxyStats;
use adveil_rules::BlockStats;
use std::fmt;
use std::sync::Arc;

/// Commands the host/UI issues to the engine.
pub enum EngineCommand {
    /// Combined status snapshot
    GetStatus,
    /// Flip suppression layers; `None` leaves a layer untouched
    Toggle {
        network: Option<bool>,
        cosmetic: Option<bool>,
    },
    /// Network-blocking stats
    GetStats,
    /// Manifest proxy status
    GetProxyStatus,
    /// Inject hide-rules into a page context
    InjectCosmetics {
        context: Arc<dyn InjectionContext + Send + Sync>,
    },
    /// Drop one channel's proxy session
    ClearStream { channel: String },
    /// Drop every proxy session
    ClearAllStreams,
    /// Current pattern set
    GetPatterns,
    /// Fetch the remote pattern manifest now
    RefreshPatterns,
    /// Pattern freshness metadata
    GetPatternStats,
    /// Start/stop the periodic pattern refresh
    SetAutoUpdate { enabled: bool },
}

impl fmt::Debug for EngineCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GetStatus => write!(f, "GetStatus"),
            Self::Toggle { network, cosmetic } => f
                .debug_struct("Toggle")
                .field("network", network)
                .field("cosmetic", cosmetic)
                .finish(),
            Self::GetStats => write!(f, "GetStats"),
            Self::GetProxyStatus => write!(f, "GetProxyStatus"),
            Self::InjectCosmetics { context } => f
                .debug_struct("InjectCosmetics")
                .field("context", &context.context_id())
                .finish(),
            Self::ClearStream { channel } => {
                f.debug_struct("ClearStream").field("channel", channel).finish()
            }
            Self::ClearAllStreams => write!(f, "ClearAllStreams"),
            Self::GetPatterns => write!(f, "GetPatterns"),
            Self::RefreshPatterns => write!(f, "RefreshPatterns"),
            Self::GetPatternStats => write!(f, "GetPatternStats"),
            Self::SetAutoUpdate { enabled } => f
                .debug_struct("SetAutoUpdate")
                .field("enabled", enabled)
                .finish(),
        }
    }
}

/// Responses returned to the host/UI.
#[derive(Debug)]
pub enum EngineResponse {
    Status(EngineStatus),
    Stats(BlockStats),
    ProxyStatus(ProxyStats),
    Toggled {
        network_enabled: bool,
        cosmetic_enabled: bool,
    },
    Injection(CosmeticInjectionResult),
    StreamCleared {
        removed: bool,
    },
    AllStreamsCleared,
    Patterns(Arc<AdPatternSet>),
    /// `applied: false` means "no update available", the only
    /// user-visible failure surface of the refresh path
    PatternsRefreshed {
        applied: bool,
        version: u32,
    },
    PatternStats(UpdaterStats),
    AutoUpdateSet {
        enabled: bool,
    },
}

impl Engine {
    /// Dispatch one command.
    pub async fn handle(&self, command: EngineCommand) -> EngineResponse {
        match command {
            EngineCommand::GetStatus => EngineResponse::Status(self.status()),
            EngineCommand::Toggle { network, cosmetic } => {
                if let Some(enabled) = network {
                    if enabled {
                        self.classifier().enable();
                    } else {
                        self.classifier().disable();
                    }
                }
                if let Some(enabled) = cosmetic {
                    if enabled {
                        self.cosmetic().enable();
                    } else {
                        self.cosmetic().disable();
                    }
                }
                EngineResponse::Toggled {
                    network_enabled: self.classifier().is_enabled(),
                    cosmetic_enabled: self.cosmetic().is_active(),
                }
            }
            EngineCommand::GetStats => EngineResponse::Stats(self.classifier().stats()),
            EngineCommand::GetProxyStatus => EngineResponse::ProxyStatus(self.proxy().stats()),
            EngineCommand::InjectCosmetics { context } => {
                EngineResponse::Injection(self.cosmetic().inject_into_context(context.as_ref()))
            }
            EngineCommand::ClearStream { channel } => EngineResponse::StreamCleared {
                removed: self.proxy().clear_stream_info(&channel),
            },
            EngineCommand::ClearAllStreams => {
                self.proxy().clear_all_stream_infos();
                EngineResponse::AllStreamsCleared
            }
            EngineCommand::GetPatterns => {
                EngineResponse::Patterns(self.updater().current_patterns())
            }
            EngineCommand::RefreshPatterns => {
                let applied = self.updater().force_refresh().await;
                EngineResponse::PatternsRefreshed {
                    applied: applied.is_some(),
                    version: self.updater().current_patterns().version,
                }
            }
            EngineCommand::GetPatternStats => {
                EngineResponse::PatternStats(self.updater().stats())
            }
            EngineCommand::SetAutoUpdate { enabled } => {
                self.updater().set_auto_update_enabled(enabled);
                EngineResponse::AutoUpdateSet {
                    enabled: self.updater().is_auto_update_enabled(),
                }
            }
        }
    }
}
