//! Core types shared by the detectors, the scorer and the trade tracker

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// OHLC candle for one timeframe
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl Candle {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
    ) -> Self {
        Self {
            open,
            high,
            low,
            close,
            timestamp,
        }
    }

    /// Absolute body size `|open - close|`
    pub fn body(&self) -> Decimal {
        (self.open - self.close).abs()
    }

    pub fn body_high(&self) -> Decimal {
        self.open.max(self.close)
    }

    pub fn body_low(&self) -> Decimal {
        self.open.min(self.close)
    }

    pub fn upper_wick(&self) -> Decimal {
        self.high - self.body_high()
    }

    pub fn lower_wick(&self) -> Decimal {
        self.body_low() - self.low
    }

    /// Direction of the body; `None` for a doji
    pub fn polarity(&self) -> Option<Bias> {
        if self.close > self.open {
            Some(Bias::Bullish)
        } else if self.close < self.open {
            Some(Bias::Bearish)
        } else {
            None
        }
    }
}

/// Directional bias of a pattern (sweep, candle shape, shock bar)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bias {
    Bullish,
    Bearish,
}

impl Bias {
    pub fn side(self) -> Side {
        match self {
            Bias::Bullish => Side::Buy,
            Bias::Bearish => Side::Sell,
        }
    }
}

impl std::fmt::Display for Bias {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Bias::Bullish => write!(f, "bullish"),
            Bias::Bearish => write!(f, "bearish"),
        }
    }
}

/// Trade side of a proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn bias(self) -> Bias {
        match self {
            Side::Buy => Bias::Bullish,
            Side::Sell => Bias::Bearish,
        }
    }

    /// +1 for Buy, -1 for Sell
    pub fn sign(self) -> Decimal {
        match self {
            Side::Buy => Decimal::ONE,
            Side::Sell => Decimal::NEGATIVE_ONE,
        }
    }

    /// True when `price` is at or beyond `reference` in this side's favor
    pub fn at_or_beyond(self, price: Decimal, reference: Decimal) -> bool {
        match self {
            Side::Buy => price >= reference,
            Side::Sell => price <= reference,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// Tracking mode. Each mode owns one independent trade slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeMode {
    /// Zone confluence scoring, higher frequency
    Normal,
    /// Sweep + confirmation breakout path, selective
    Sniper,
}

impl TradeMode {
    pub const ALL: [TradeMode; 2] = [TradeMode::Normal, TradeMode::Sniper];
}

impl std::fmt::Display for TradeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeMode::Normal => write!(f, "normal"),
            TradeMode::Sniper => write!(f, "sniper"),
        }
    }
}

/// Numeric price level carried together with its rendered form.
///
/// Consumers read `value`; `display` exists only for humans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub value: Decimal,
    pub display: String,
}

impl PriceLevel {
    pub fn new(value: Decimal) -> Self {
        Self {
            value,
            display: format!("${:.2}", value.round_dp(2)),
        }
    }
}

/// Confidence rating, always within 1..=5
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Stars(u8);

impl Stars {
    pub const MIN: Stars = Stars(1);
    pub const MAX: Stars = Stars(5);

    /// Clamp any count into the 1..=5 range
    pub fn saturating(count: u8) -> Self {
        Stars(count.clamp(1, 5))
    }

    pub fn count(self) -> u8 {
        self.0
    }

    /// Glyph rendering, e.g. `★★★☆☆`
    pub fn glyphs(self) -> String {
        let filled = self.0 as usize;
        format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
    }
}

impl TryFrom<u8> for Stars {
    type Error = EngineError;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        if (1..=5).contains(&value) {
            Ok(Stars(value))
        } else {
            Err(EngineError::InvalidStars(value))
        }
    }
}

impl From<Stars> for u8 {
    fn from(stars: Stars) -> u8 {
        stars.0
    }
}

/// Error types for the engine
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Snapshot I/O failed: {0}")]
    SnapshotIo(#[from] std::io::Error),

    #[error("Snapshot decode failed: {0}")]
    SnapshotDecode(#[from] serde_json::Error),

    #[error("Star rating out of range: {0}")]
    InvalidStars(u8),

    #[error("Mode {mode} already has an open trade ({trade_id})")]
    SlotOccupied { mode: TradeMode, trade_id: uuid::Uuid },

    #[error("Setup already traded in mode {0}")]
    DuplicateSetup(TradeMode),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn candle(open: Decimal, high: Decimal, low: Decimal, close: Decimal) -> Candle {
        Candle::new(Utc::now(), open, high, low, close)
    }

    #[test]
    fn test_candle_anatomy() {
        let c = candle(dec!(100), dec!(106), dec!(97), dec!(104));
        assert_eq!(c.body(), dec!(4));
        assert_eq!(c.upper_wick(), dec!(2));
        assert_eq!(c.lower_wick(), dec!(3));
        assert_eq!(c.polarity(), Some(Bias::Bullish));

        let doji = candle(dec!(100), dec!(101), dec!(99), dec!(100));
        assert_eq!(doji.polarity(), None);
    }

    #[test]
    fn test_price_level_display() {
        let level = PriceLevel::new(dec!(2001.5));
        assert_eq!(level.value, dec!(2001.5));
        assert_eq!(level.display, "$2001.50");
    }

    #[test]
    fn test_stars_bounds_and_glyphs() {
        assert_eq!(Stars::saturating(9).count(), 5);
        assert_eq!(Stars::saturating(0).count(), 1);
        assert_eq!(Stars::saturating(3).glyphs(), "★★★☆☆");
        assert!(Stars::try_from(6).is_err());
        assert_eq!(Stars::try_from(4).unwrap().count(), 4);
    }

    #[test]
    fn test_side_favor() {
        assert!(Side::Buy.at_or_beyond(dec!(2001), dec!(2000)));
        assert!(!Side::Sell.at_or_beyond(dec!(2001), dec!(2000)));
        assert_eq!(Side::Sell.sign(), dec!(-1));
    }
}
