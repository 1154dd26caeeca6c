//! Manifest Proxy
//!
//! Sits between the host's playlist fetches and the player. The rewrite
//! itself is pure; this type owns the per-channel sessions, the stats,
//! and the fail-open boundary.

use crate::rewrite::{self, SequenceState};
use crate::session::StreamProxySession;
use adveil_patterns::PatternUpdater;
use serde::Serialize;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Proxy counters for status display.
#[derive(Debug, Clone, Serialize)]
pub struct ProxyStats {
    pub is_active: bool,
    pub requests_processed: u64,
    pub segments_stripped: u64,
    pub channels_tracked: usize,
}

/// Intercepts HLS playlist responses per channel and strips ad segments.
pub struct ManifestProxy {
    updater: Arc<PatternUpdater>,
    active: AtomicBool,
    requests_processed: AtomicU64,
    segments_stripped: AtomicU64,
    sessions: Mutex<HashMap<String, StreamProxySession>>,
}

impl ManifestProxy {
    pub fn new(updater: Arc<PatternUpdater>) -> Self {
        Self {
            updater,
            active: AtomicBool::new(true),
            requests_processed: AtomicU64::new(0),
            segments_stripped: AtomicU64::new(0),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Process a playlist response for a channel, returning the body the
    /// player should receive.
    ///
    /// This is the HOT PATH for playlist refreshes, synchronous and
    /// bounded. Fail-open is a hard invariant: on any rewrite failure
    /// (malformed input, pattern-application defect) the ORIGINAL body
    /// is returned unchanged. Ad-stripping failures must never become
    /// playback failures.
    pub fn process_manifest(&self, channel: &str, body: &str) -> String {
        if !self.active.load(Ordering::Relaxed) {
            return body.to_string();
        }

        self.requests_processed.fetch_add(1, Ordering::Relaxed);
        let patterns = self.updater.current_patterns();

        let state = {
            let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
            let session = sessions
                .entry(channel.to_string())
                .or_insert_with(StreamProxySession::new);
            session.touch();
            SequenceState {
                last_known_sequence: session.last_known_sequence,
                discontinuity_seen: session.discontinuity_seen,
            }
        };

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            rewrite::rewrite_playlist(body, &patterns, state)
        }));

        match result {
            Ok(Ok(outcome)) => {
                if let Some(seq) = outcome.sequence {
                    let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
                    if let Some(session) = sessions.get_mut(channel) {
                        session.last_known_sequence = seq.last_known_sequence;
                        session.discontinuity_seen = seq.discontinuity_seen;
                    }
                }
                if outcome.stripped > 0 {
                    self.segments_stripped
                        .fetch_add(outcome.stripped, Ordering::Relaxed);
                    debug!(
                        "Stripped {} ad segment(s) from {} manifest",
                        outcome.stripped, channel
                    );
                }
                outcome.body.unwrap_or_else(|| body.to_string())
            }
            Ok(Err(e)) => {
                warn!("Manifest rewrite failed for {}, failing open: {}", channel, e);
                body.to_string()
            }
            Err(_) => {
                warn!("Manifest rewrite panicked for {}, failing open", channel);
                body.to_string()
            }
        }
    }

    /// Remove exactly one channel's session. Called when playback of
    /// that channel stops.
    pub fn clear_stream_info(&self, channel: &str) -> bool {
        let removed = self
            .sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(channel)
            .is_some();
        if removed {
            debug!("Cleared proxy session for {}", channel);
        }
        removed
    }

    /// Clear every session. Called on global reset/logout.
    pub fn clear_all_stream_infos(&self) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let count = sessions.len();
        sessions.clear();
        if count > 0 {
            debug!("Cleared {} proxy session(s)", count);
        }
    }

    /// Evict sessions idle longer than `max_idle`. Returns the eviction
    /// count. The reaper calls this; correctness does not depend on the
    /// host remembering to clear.
    pub fn reap_idle_sessions(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let before = sessions.len();
        sessions.retain(|_, session| session.idle_for(now) <= max_idle);
        before - sessions.len()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Relaxed);
    }

    /// Counter snapshot.
    pub fn stats(&self) -> ProxyStats {
        ProxyStats {
            is_active: self.is_active(),
            requests_processed: self.requests_processed.load(Ordering::Relaxed),
            segments_stripped: self.segments_stripped.load(Ordering::Relaxed),
            channels_tracked: self
                .sessions
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .len(),
        }
    }
}
