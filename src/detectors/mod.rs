//! Pattern detectors - pure functions over read-only candle windows
//!
//! Every detector is total: short history or absent inputs produce a
//! neutral "not found" result, never an error.

pub mod candlestick;
pub mod sweep;
pub mod trend;
pub mod zones;

pub use candlestick::{CandlePattern, Confirmation};
pub use sweep::SweepEvent;
pub use trend::{Trend, TrendReading};
pub use zones::{Zone, ZoneKind, ZoneScan, ZoneSetup};
