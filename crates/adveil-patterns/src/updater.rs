//! Pattern Updater
//!
//! Owns the in-memory pattern set and the refresh lifecycle:
//! Idle → Fetching → (Applying | Error) → Idle.
//!
//! Readers never block on a refresh: `current_patterns` hands out the
//! current `Arc` and updates land as a whole-reference swap. At most one
//! fetch is ever in flight; refresh callers that arrive while one is
//! running adopt its result instead of issuing a duplicate request.

use crate::error::PatternFetchError;
use crate::set::AdPatternSet;
use crate::source::PatternSource;
use crate::store::PatternStore;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Updater lifecycle state, for status display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdaterState {
    Idle,
    Fetching,
    Applying,
    Error,
}

/// Freshness metadata exposed to the UI.
#[derive(Debug, Clone)]
pub struct UpdaterStats {
    pub current_version: u32,
    pub last_fetch_attempt: Option<DateTime<Utc>>,
    pub last_successful_fetch: Option<DateTime<Utc>>,
    pub is_auto_update_enabled: bool,
}

struct AutoUpdate {
    enabled: bool,
    task: Option<JoinHandle<()>>,
}

/// Fetches, validates, versions, and caches the ad-signature pattern set.
pub struct PatternUpdater {
    source: Arc<dyn PatternSource>,
    store: Arc<dyn PatternStore>,
    refresh_interval: Duration,

    current: RwLock<Arc<AdPatternSet>>,
    state: Mutex<UpdaterState>,

    // Refresh coalescing: the gate serializes refreshes; the generation
    // counter lets a waiter detect that a refresh completed while it was
    // queued, in which case it adopts that outcome instead of fetching.
    refresh_gate: tokio::sync::Mutex<()>,
    generation: AtomicU64,
    last_outcome: Mutex<Option<Arc<AdPatternSet>>>,

    last_fetch_attempt: Mutex<Option<DateTime<Utc>>>,
    last_successful_fetch: Mutex<Option<DateTime<Utc>>>,
    auto_update: Mutex<AutoUpdate>,

    weak_self: Weak<PatternUpdater>,
}

impl PatternUpdater {
    /// Build the updater, loading the last-cached set synchronously.
    /// Falls back to the bundled default if the cache is missing or
    /// corrupt; `current_patterns` never returns an empty set.
    pub fn new(
        source: Arc<dyn PatternSource>,
        store: Arc<dyn PatternStore>,
        refresh_interval: Duration,
    ) -> Arc<Self> {
        let initial = match store.load() {
            Ok(Some(cached)) => {
                info!("Loaded cached pattern set v{}", cached.version);
                cached
            }
            Ok(None) => {
                info!("No cached pattern set, using bundled default");
                AdPatternSet::bundled()
            }
            Err(e) => {
                warn!("Pattern cache unreadable ({}), using bundled default", e);
                AdPatternSet::bundled()
            }
        };

        Arc::new_cyclic(|weak| Self {
            source,
            store,
            refresh_interval,
            current: RwLock::new(Arc::new(initial)),
            state: Mutex::new(UpdaterState::Idle),
            refresh_gate: tokio::sync::Mutex::new(()),
            generation: AtomicU64::new(0),
            last_outcome: Mutex::new(None),
            last_fetch_attempt: Mutex::new(None),
            last_successful_fetch: Mutex::new(None),
            auto_update: Mutex::new(AutoUpdate {
                enabled: false,
                task: None,
            }),
            weak_self: weak.clone(),
        })
    }

    /// The current in-memory set. Never blocks on a refresh, never empty.
    pub fn current_patterns(&self) -> Arc<AdPatternSet> {
        self.current.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn state(&self) -> UpdaterState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: UpdaterState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    /// Fetch the remote manifest and apply it if strictly newer.
    ///
    /// Returns the newly applied set, or `None` when no update was
    /// applied (network failure, malformed payload, same-or-older
    /// version). Callers treat `None` as "no update available"; it is
    /// never an error. Calls made while a fetch is in flight coalesce
    /// onto it and observe its result.
    pub async fn force_refresh(&self) -> Option<Arc<AdPatternSet>> {
        let entry_generation = self.generation.load(Ordering::Acquire);
        let _gate = self.refresh_gate.lock().await;

        if self.generation.load(Ordering::Acquire) != entry_generation {
            // A refresh completed while we were queued; adopt its outcome.
            debug!("Refresh coalesced onto completed in-flight fetch");
            return self
                .last_outcome
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone();
        }

        let outcome = self.run_refresh().await;

        *self
            .last_outcome
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = outcome.clone();
        self.generation.fetch_add(1, Ordering::Release);
        outcome
    }

    async fn run_refresh(&self) -> Option<Arc<AdPatternSet>> {
        self.set_state(UpdaterState::Fetching);
        *self
            .last_fetch_attempt
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(Utc::now());

        let manifest = match self.source.fetch().await {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!("Pattern fetch failed: {}", e);
                self.set_state(UpdaterState::Error);
                self.set_state(UpdaterState::Idle);
                return None;
            }
        };

        if let Err(e) = manifest.validate() {
            warn!("Pattern manifest rejected: {}", e);
            self.set_state(UpdaterState::Error);
            self.set_state(UpdaterState::Idle);
            return None;
        }

        let current_version = self.current_patterns().version;
        if manifest.version <= current_version {
            let e = PatternFetchError::StaleVersion {
                fetched: manifest.version,
                current: current_version,
            };
            debug!("Pattern refresh not applied: {}", e);
            self.set_state(UpdaterState::Error);
            self.set_state(UpdaterState::Idle);
            return None;
        }

        self.set_state(UpdaterState::Applying);
        let new_set = Arc::new(manifest.into_set(Some(Utc::now())));

        *self.current.write().unwrap_or_else(|e| e.into_inner()) = new_set.clone();
        *self
            .last_successful_fetch
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(Utc::now());

        // Cache write failure is not fatal; the set is already live.
        if let Err(e) = self.store.save(&new_set) {
            warn!("Failed to persist pattern set v{}: {}", new_set.version, e);
        }

        self.set_state(UpdaterState::Idle);
        info!(
            "Applied pattern set v{} ({} signatures)",
            new_set.version,
            new_set.patterns.len()
        );
        Some(new_set)
    }

    /// Freshness metadata snapshot.
    pub fn stats(&self) -> UpdaterStats {
        UpdaterStats {
            current_version: self.current_patterns().version,
            last_fetch_attempt: *self
                .last_fetch_attempt
                .lock()
                .unwrap_or_else(|e| e.into_inner()),
            last_successful_fetch: *self
                .last_successful_fetch
                .lock()
                .unwrap_or_else(|e| e.into_inner()),
            is_auto_update_enabled: self.is_auto_update_enabled(),
        }
    }

    pub fn is_auto_update_enabled(&self) -> bool {
        self.auto_update
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .enabled
    }

    /// Start or stop the periodic refresh schedule.
    ///
    /// Enabling spawns an interval task that calls `force_refresh`;
    /// disabling cancels any pending scheduled call. Idempotent. Must be
    /// called from within a Tokio runtime when enabling.
    pub fn set_auto_update_enabled(&self, enabled: bool) {
        let mut auto = self.auto_update.lock().unwrap_or_else(|e| e.into_inner());
        if auto.enabled == enabled {
            return;
        }
        auto.enabled = enabled;

        if enabled {
            let weak = self.weak_self.clone();
            let interval = self.refresh_interval;
            info!("Auto-update enabled (every {:?})", interval);
            auto.task = Some(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                // The first tick completes immediately; skip it so the
                // schedule starts one full interval out.
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    let Some(updater) = weak.upgrade() else { break };
                    updater.force_refresh().await;
                }
            }));
        } else if let Some(task) = auto.task.take() {
            info!("Auto-update disabled");
            task.abort();
        }
    }
}

impl Drop for PatternUpdater {
    fn drop(&mut self) {
        if let Some(task) = self
            .auto_update
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .task
            .take()
        {
            task.abort();
        }
    }
}
