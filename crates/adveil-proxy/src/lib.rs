//! adveil manifest integrity proxy
//!
//! Rewrites HLS media playlists per channel to drop stitched-ad segments
//! before the playlist reaches the player.
//!
//! Flow:
//! 1. Host network layer hands us a playlist response body for channel C
//! 2. Segments are classified against the current ad-pattern set
//! 3. Ad segments are stripped; sequence numbering is adjusted so the
//!    output stays a valid, gapless, monotonically-sequenced playlist
//! 4. Any failure along the way returns the ORIGINAL body; ad-stripping
//!    failures must never become playback failures
//!
//! Per-channel state lives in a session map, cleared cooperatively by the
//! host and swept by an idle reaper as a backstop.

mod proxy;
mod reaper;
mod rewrite;
mod session;

pub use proxy::{ManifestProxy, ProxyStats};
pub use reaper::{ReaperConfig, spawn_session_reaper};
pub use rewrite::ManifestRewriteError;
