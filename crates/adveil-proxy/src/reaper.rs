//! Reaper thread for idle proxy sessions.
//!
//! The session map's lifetime is otherwise bounded only by cooperative
//! `clear_stream_info` calls from the host; the reaper sweeps sessions
//! the host forgot.

use crate::proxy::ManifestProxy;
use std::sync::Weak;
use std::thread;
use std::time::Duration;
use tracing::debug;

/// Configuration for the session reaper.
#[derive(Debug, Clone)]
pub struct ReaperConfig {
    /// How often to scan the session map
    pub scan_interval: Duration,
    /// How long a session may sit untouched before eviction
    pub max_idle: Duration,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            scan_interval: Duration::from_secs(60),
            max_idle: Duration::from_secs(600),
        }
    }
}

/// Spawn the reaper thread. It exits on its own once the proxy is
/// dropped.
pub fn spawn_session_reaper(
    config: ReaperConfig,
    proxy: Weak<ManifestProxy>,
) -> thread::JoinHandle<()> {
    thread::Builder::new()
        .name("session-reaper".to_string())
        .spawn(move || {
            debug!("Session reaper started");
            run_reaper_loop(config, proxy);
            debug!("Session reaper stopped");
        })
        .expect("Failed to spawn session reaper thread")
}

fn run_reaper_loop(config: ReaperConfig, proxy: Weak<ManifestProxy>) {
    loop {
        thread::sleep(config.scan_interval);

        let Some(proxy) = proxy.upgrade() else {
            break;
        };

        let evicted = proxy.reap_idle_sessions(config.max_idle);
        if evicted > 0 {
            debug!("Reaped {} idle proxy session(s)", evicted);
        }
    }
}
