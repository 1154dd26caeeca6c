//! Minimal host embedding: wire the engine, run each suppression layer
//! once, and print the status rollup.

use adveil_engine::{Engine, EngineCommand, EngineConfig};
use anyhow::Result;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let _subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .with_target(false)
        .compact()
        .init();

    let config = EngineConfig::new(
        "https://patterns.adveil.example/manifest.json".parse()?,
        std::env::temp_dir().join("adveil-patterns.json"),
    );
    let engine = Engine::new(config)?;

    // Network layer: the host calls this on every outgoing request.
    for url in [
        "https://edge.ads.twitch.tv/creative/123",
        "https://spade.twitch.tv/track",
        "https://www.twitch.tv/somechannel",
    ] {
        let decision = engine.should_block(url);
        info!("{} -> blocked={}", url, decision.is_blocked());
    }

    // Playlist layer: the host calls this on every manifest response.
    let manifest = "#EXTM3U\n\
#EXT-X-VERSION:3\n\
#EXT-X-TARGETDURATION:2\n\
#EXT-X-MEDIA-SEQUENCE:1\n\
#EXTINF:2.000,Amazon\n\
https://video-edge.example.net/stitched-ad/creative.ts\n\
#EXTINF:2.000,live\n\
https://video-edge.example.net/v1/seg2.ts\n";
    let rewritten = engine.process_manifest("somechannel", manifest);
    info!("Rewritten manifest:\n{}", rewritten);

    // UI surface.
    let status = engine.handle(EngineCommand::GetStatus).await;
    info!("Status: {:#?}", status);

    Ok(())
}
