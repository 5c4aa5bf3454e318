//! Confluence Engine Library
//!
//! Rule-based signal generation and trade lifecycle tracking for a single
//! instrument: trend, imbalance zones, liquidity sweeps and candlestick
//! confirmation scored into proposals, then followed to resolution.

pub mod algorithms;
pub mod config;
pub mod detectors;
pub mod engine;
pub mod ev;
pub mod events;
pub mod indicators;
pub mod market;
pub mod runner;
pub mod scoreboard;
pub mod tracker;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export main types for convenience
pub use algorithms::{Evaluation, Evaluator, MarketContext, Signal, SignalOrigin, WaitReason};
pub use config::EngineConfig;
pub use engine::{ModeOutcome, SignalEngine, TickReport};
pub use ev::EvReport;
pub use events::{EventLight, EventProximity, Impact, ScheduledEvent};
pub use market::{FundFlow, MacroMetric, MarketSnapshot, RawCandle, RawSnapshot, Sentiment};
pub use runner::{EventSink, FileSnapshotSource, Runner, SnapshotSource, TracingSink};
pub use scoreboard::{Scoreboard, ScoreboardEntry};
pub use tracker::{Trade, TradeEvent, TradeResult, TradeState, TradeTracker};
pub use types::{Bias, Candle, EngineError, PriceLevel, Result, Side, Stars, TradeMode};
