//! Playlist Rewriting
//!
//! Pure rewrite step: parse a playlist body, classify segments against
//! the ad-pattern set, and emit the playlist with ad segments stripped.
//! No session access and no I/O; the proxy wraps this function and
//! applies its outcome.
//!
//! Ad markers follow the streaming platform's stitched-ad conventions:
//! EXT-X-DATERANGE entries (by CLASS or ID prefix) delimit ad windows
//! matched against segment EXT-X-PROGRAM-DATE-TIME, known segment titles
//! mark server-inserted creatives, and some edges expose ad creatives by
//! URI path.

use adveil_patterns::{AdPatternSet, AdSignature};
use m3u8_rs::{MediaPlaylist, Playlist, parse_playlist_res};
use thiserror::Error;
use tracing::{debug, trace};

/// Internal rewrite failure. Never escapes the proxy: every variant
/// results in the original manifest passing through.
#[derive(Debug, Error)]
pub enum ManifestRewriteError {
    #[error("Playlist parse failed: {0}")]
    Parse(String),

    #[error("Playlist serialize failed: {0}")]
    Serialize(#[from] std::io::Error),

    #[error("Rewritten playlist is not UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Session fields the rewrite reads and produces.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SequenceState {
    pub last_known_sequence: u64,
    pub discontinuity_seen: bool,
}

pub(crate) struct RewriteOutcome {
    /// Rewritten body, or `None` when the original text should pass
    /// through untouched (master playlist, or nothing to strip).
    pub body: Option<String>,
    /// Number of segments stripped.
    pub stripped: u64,
    /// Updated session fields; `None` for master playlists.
    pub sequence: Option<SequenceState>,
}

/// One ad window derived from an EXT-X-DATERANGE.
struct AdWindow {
    start_ms: i64,
    end_ms: i64,
}

pub(crate) fn rewrite_playlist(
    body: &str,
    patterns: &AdPatternSet,
    state: SequenceState,
) -> Result<RewriteOutcome, ManifestRewriteError> {
    let playlist = parse_playlist_res(body.as_bytes())
        .map_err(|e| ManifestRewriteError::Parse(format!("{e}")))?;

    match playlist {
        Playlist::MasterPlaylist(_) => Ok(RewriteOutcome {
            body: None,
            stripped: 0,
            sequence: None,
        }),
        Playlist::MediaPlaylist(media) => rewrite_media(body, media, patterns, state),
    }
}

fn rewrite_media(
    original: &str,
    playlist: MediaPlaylist,
    patterns: &AdPatternSet,
    state: SequenceState,
) -> Result<RewriteOutcome, ManifestRewriteError> {
    if state.last_known_sequence > 0 && playlist.media_sequence > state.last_known_sequence {
        debug!(
            "Sequence gap on refresh: expected {}, playlist starts at {}",
            state.last_known_sequence, playlist.media_sequence
        );
    }

    let ad_windows = collect_ad_windows(&playlist, patterns);
    let mut discontinuity_seen = state.discontinuity_seen;

    let mut flags = Vec::with_capacity(playlist.segments.len());
    for segment in &playlist.segments {
        if segment.discontinuity {
            discontinuity_seen = true;
        }

        let mut is_ad = false;

        if let Some(pdt) = segment.program_date_time {
            let pdt_ms = pdt.timestamp_millis();
            if ad_windows
                .iter()
                .any(|w| pdt_ms >= w.start_ms && pdt_ms < w.end_ms)
            {
                is_ad = true;
            }
        }

        if !is_ad {
            for sig in &patterns.patterns {
                match sig {
                    AdSignature::SegmentTitle(value) => {
                        if segment.title.as_deref().is_some_and(|t| t.contains(value)) {
                            is_ad = true;
                            break;
                        }
                    }
                    AdSignature::UriSubstring(value) => {
                        if segment.uri.contains(value) {
                            is_ad = true;
                            break;
                        }
                    }
                    _ => {}
                }
            }
        }

        if is_ad {
            trace!("Ad segment: {}", segment.uri);
        }
        flags.push(is_ad);
    }

    let next_sequence = playlist.media_sequence + playlist.segments.len() as u64;
    let sequence = Some(SequenceState {
        last_known_sequence: next_sequence,
        discontinuity_seen,
    });

    let stripped = flags.iter().filter(|&&ad| ad).count() as u64;
    if stripped == 0 {
        return Ok(RewriteOutcome {
            body: None,
            stripped: 0,
            sequence,
        });
    }

    // Stripping leading segments shifts the playlist window forward, so
    // the media sequence advances by exactly that count. Survivors are
    // emitted contiguously; stripped segments take their attached tags
    // (discontinuities included) with them.
    let leading_stripped = flags.iter().take_while(|&&ad| ad).count() as u64;

    let mut rewritten = playlist.clone();
    rewritten.segments = playlist
        .segments
        .iter()
        .zip(&flags)
        .filter(|&(_, &ad)| !ad)
        .map(|(segment, _)| segment.clone())
        .collect();
    rewritten.media_sequence = playlist.media_sequence + leading_stripped;

    let mut out = Vec::with_capacity(original.len());
    rewritten.write_to(&mut out)?;
    let body = String::from_utf8(out)?;

    Ok(RewriteOutcome {
        body: Some(body),
        stripped,
        sequence,
    })
}

/// Collect ad windows from EXT-X-DATERANGE entries matching the pattern
/// set. Only ranges with an end date bound a window.
fn collect_ad_windows(playlist: &MediaPlaylist, patterns: &AdPatternSet) -> Vec<AdWindow> {
    let mut windows = Vec::new();

    for segment in &playlist.segments {
        let Some(daterange) = &segment.daterange else {
            continue;
        };
        let Some(end_date) = daterange.end_date else {
            continue;
        };

        let matched = patterns.patterns.iter().any(|sig| match sig {
            AdSignature::DaterangeClass(value) => daterange.class.as_deref() == Some(value.as_str()),
            AdSignature::DaterangeIdPrefix(prefix) => daterange.id.starts_with(prefix),
            _ => false,
        });

        if matched {
            trace!("Ad daterange: id={}, class={:?}", daterange.id, daterange.class);
            windows.push(AdWindow {
                start_ms: daterange.start_date.timestamp_millis(),
                end_ms: end_date.timestamp_millis(),
            });
        }
    }

    windows
}
