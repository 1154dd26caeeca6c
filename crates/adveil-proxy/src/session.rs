//! Per-channel proxy session state.

use std::time::Instant;

/// Playlist-tracking state for one channel.
///
/// Created lazily on first manifest touch; removed by an explicit clear,
/// or by the idle reaper when the host forgets to clear. The proxy
/// assumes at most one active manifest stream per channel; concurrent
/// touches are last-write-wins on these fields.
#[derive(Debug, Clone)]
pub(crate) struct StreamProxySession {
    /// Next expected media sequence after the last playlist we saw.
    pub last_known_sequence: u64,
    /// Whether a discontinuity marker has been observed on this channel.
    pub discontinuity_seen: bool,
    pub created_at: Instant,
    pub last_touched: Instant,
}

impl StreamProxySession {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            last_known_sequence: 0,
            discontinuity_seen: false,
            created_at: now,
            last_touched: now,
        }
    }

    pub fn touch(&mut self) {
        self.last_touched = Instant::now();
    }

    pub fn idle_for(&self, now: Instant) -> std::time::Duration {
        now.duration_since(self.last_touched)
    }
}
