//! Confluence Engine - tick loop over a snapshot file
//!
//! A data collaborator keeps the snapshot JSON fresh; this binary evaluates it
//! on a fixed cadence and logs proposals, trade transitions and the day's
//! scoreboard until Ctrl-C.

use tracing::info;

use confluence_engine::{EngineConfig, FileSnapshotSource, Runner, SignalEngine, TracingSink};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    info!("Starting Confluence Engine...");

    let config = EngineConfig::load(None)?;
    info!(
        "Snapshot: {:?}, tick every {}s, macro symbol {}",
        config.runner.snapshot_path, config.runner.tick_interval_secs, config.macro_symbol.0
    );

    let source = FileSnapshotSource::new(config.runner.snapshot_path.clone());
    let engine = SignalEngine::new(config);

    Runner::new(engine, source, TracingSink).run().await
}
