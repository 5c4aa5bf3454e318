//! Tick runner - drives the engine on a fixed cadence
//!
//! Pulls an already-fetched snapshot from a `SnapshotSource`, runs one engine
//! tick under the lock and hands the report to an `EventSink`. A failing tick
//! is logged and the loop keeps going.

use async_trait::async_trait;
use chrono::Utc;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::interval;
use tracing::{debug, error, info};

use crate::engine::{SignalEngine, TickReport};
use crate::market::{MarketSnapshot, RawSnapshot};
use crate::types::Result;

/// Supplier of market snapshots
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self) -> Result<MarketSnapshot>;
}

/// Snapshot read from a JSON file a collaborator keeps up to date
pub struct FileSnapshotSource {
    path: PathBuf,
}

impl FileSnapshotSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SnapshotSource for FileSnapshotSource {
    async fn fetch(&self) -> Result<MarketSnapshot> {
        let bytes = tokio::fs::read(&self.path).await?;
        let raw: RawSnapshot = serde_json::from_slice(&bytes)?;
        debug!(
            "Read snapshot {:?}: {} fast / {} slow rows",
            self.path,
            raw.fast.len(),
            raw.slow.len()
        );
        Ok(raw.into())
    }
}

/// Consumer of tick reports (notification, persistence, UI)
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, report: &TickReport) -> anyhow::Result<()>;
}

/// Sink that writes reports to the log
pub struct TracingSink;

#[async_trait]
impl EventSink for TracingSink {
    async fn publish(&self, report: &TickReport) -> anyhow::Result<()> {
        for outcome in &report.outcomes {
            match (outcome.evaluation.signal(), outcome.evaluation.wait_reason()) {
                (Some(signal), _) => {
                    let levels = signal.levels();
                    info!(
                        "[{}] {} {} - {} stop {} target {} {} EV {:.2}R",
                        outcome.mode,
                        signal.direction,
                        levels.entry_low.display,
                        levels.entry_high.display,
                        levels.stop.display,
                        levels.target.display,
                        levels.stars,
                        outcome.ev.map(|e| e.expected_value).unwrap_or_default()
                    );
                    for line in &signal.rationale {
                        debug!("[{}]   {}", outcome.mode, line);
                    }
                }
                (None, Some(reason)) => info!("[{}] wait: {}", outcome.mode, reason),
                (None, None) => {}
            }
        }

        for event in &report.events {
            match &event.resolution {
                Some(resolution) => info!(
                    "[{}] trade {} {:?}: {:+} units",
                    event.mode, event.trade_id, resolution.result, resolution.units
                ),
                None => info!("[{}] trade {} -> {}", event.mode, event.trade_id, event.to),
            }
        }

        let board = &report.scoreboard;
        info!(
            "Scoreboard {}: {} resolved ({}W {}L {}BE), {} pending, net {} units",
            board.date,
            board.resolved_count(),
            board.win_count,
            board.loss_count,
            board.breakeven_count,
            board.pending_count,
            board.net_risk_units
        );
        Ok(())
    }
}

pub struct Runner<S, K> {
    engine: Arc<Mutex<SignalEngine>>,
    source: S,
    sink: K,
    tick_interval: Duration,
}

impl<S: SnapshotSource, K: EventSink> Runner<S, K> {
    pub fn new(engine: SignalEngine, source: S, sink: K) -> Self {
        let tick_interval = Duration::from_secs(engine.config().runner.tick_interval_secs.max(1));
        Self {
            engine: Arc::new(Mutex::new(engine)),
            source,
            sink,
            tick_interval,
        }
    }

    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    /// Shared handle to the engine; ticks hold the lock for their whole pass
    pub fn engine(&self) -> Arc<Mutex<SignalEngine>> {
        Arc::clone(&self.engine)
    }

    /// Fetch, evaluate and publish once
    pub async fn tick_once(&self) -> anyhow::Result<TickReport> {
        let snapshot = self.source.fetch().await?;
        let report = {
            let mut engine = self.engine.lock().await;
            engine.tick(&snapshot, Utc::now())
        };
        self.sink.publish(&report).await?;
        Ok(report)
    }

    /// Run until Ctrl-C
    pub async fn run(self) -> anyhow::Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Run the tick loop until `shutdown` completes
    pub async fn run_until<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()>,
    {
        info!("Runner starting, tick every {:?}", self.tick_interval);
        let mut ticker = interval(self.tick_interval);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.tick_once().await {
                        error!("Tick failed: {}", e);
                    }
                }
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping runner");
                    break;
                }
            }
        }
        Ok(())
    }
}
