//! Trend Classifier
//!
//! Labels one timeframe UP / DOWN / SIDEWAYS from the latest close and the
//! fast and slow EMAs of closing price.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::TrendConfig;
use crate::indicators::ema;
use crate::types::{Candle, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Trend {
    Up,
    Down,
    Sideways,
}

impl Trend {
    /// Trade side this trend favors, `None` when sideways
    pub fn side(self) -> Option<Side> {
        match self {
            Trend::Up => Some(Side::Buy),
            Trend::Down => Some(Side::Sell),
            Trend::Sideways => None,
        }
    }
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trend::Up => write!(f, "UP"),
            Trend::Down => write!(f, "DOWN"),
            Trend::Sideways => write!(f, "SIDEWAYS"),
        }
    }
}

/// Classification of one timeframe
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendReading {
    pub trend: Trend,
    /// Set when the classifier failed closed
    pub insufficient_data: bool,
    pub fast_ema: Option<Decimal>,
    pub slow_ema: Option<Decimal>,
}

impl TrendReading {
    fn insufficient() -> Self {
        Self {
            trend: Trend::Sideways,
            insufficient_data: true,
            fast_ema: None,
            slow_ema: None,
        }
    }
}

/// Classify the most recent candle of a single timeframe
pub fn classify(candles: &[Candle], config: &TrendConfig) -> TrendReading {
    let min_candles = config.min_candles.max(config.slow_ema).max(config.fast_ema);
    if candles.len() < min_candles {
        return TrendReading::insufficient();
    }

    let (Some(fast), Some(slow), Some(latest)) = (
        ema(candles, config.fast_ema),
        ema(candles, config.slow_ema),
        candles.last(),
    ) else {
        return TrendReading::insufficient();
    };

    let close = latest.close;
    let trend = if close > slow && fast > slow {
        Trend::Up
    } else if close < slow && fast < slow {
        Trend::Down
    } else {
        Trend::Sideways
    };

    TrendReading {
        trend,
        insufficient_data: false,
        fast_ema: Some(fast),
        slow_ema: Some(slow),
    }
}
