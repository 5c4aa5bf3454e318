//! Candlestick confirmation at a candidate zone
//!
//! Checks, in priority order: engulfing, pin bar on the latest candle, and a
//! pin bar on the prior candle confirmed by the latest candle's polarity.

use serde::{Deserialize, Serialize};

use crate::config::CandlestickConfig;
use crate::types::{Bias, Candle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandlePattern {
    Engulfing,
    PinBar,
    ConfirmedReversal,
}

impl CandlePattern {
    pub fn label(self) -> &'static str {
        match self {
            CandlePattern::Engulfing => "engulfing",
            CandlePattern::PinBar => "pin bar",
            CandlePattern::ConfirmedReversal => "confirmed pin-bar reversal",
        }
    }
}

/// Confirmation result: found flag plus the matched shape
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Confirmation {
    pub pattern: Option<CandlePattern>,
}

impl Confirmation {
    pub fn found(&self) -> bool {
        self.pattern.is_some()
    }

    pub fn label(&self) -> &'static str {
        self.pattern.map(CandlePattern::label).unwrap_or("none")
    }
}

/// Detect a reversal shape in the direction of `target`
pub fn confirm(candles: &[Candle], target: Bias, config: &CandlestickConfig) -> Confirmation {
    let [.., prior, latest] = candles else {
        return Confirmation::default();
    };

    let pattern = if is_engulfing(prior, latest, target) {
        Some(CandlePattern::Engulfing)
    } else if is_pin_bar(latest, target, config) {
        Some(CandlePattern::PinBar)
    } else if is_pin_bar(prior, target, config) && latest.polarity() == Some(target) {
        Some(CandlePattern::ConfirmedReversal)
    } else {
        None
    };

    Confirmation { pattern }
}

fn is_engulfing(prior: &Candle, latest: &Candle, target: Bias) -> bool {
    let opposite = match target {
        Bias::Bullish => Bias::Bearish,
        Bias::Bearish => Bias::Bullish,
    };
    prior.polarity() == Some(opposite)
        && latest.polarity() == Some(target)
        && latest.body_low() <= prior.body_low()
        && latest.body_high() >= prior.body_high()
}

fn is_pin_bar(candle: &Candle, target: Bias, config: &CandlestickConfig) -> bool {
    let body = candle.body();
    let (wick, opposing) = match target {
        Bias::Bullish => (candle.lower_wick(), candle.upper_wick()),
        Bias::Bearish => (candle.upper_wick(), candle.lower_wick()),
    };
    wick > body * config.wick_body_ratio && opposing < body && wick >= config.min_pin_wick
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn c(open: Decimal, high: Decimal, low: Decimal, close: Decimal) -> Candle {
        Candle::new(Utc::now(), open, high, low, close)
    }

    fn config() -> CandlestickConfig {
        CandlestickConfig::default()
    }

    #[test]
    fn test_needs_two_candles() {
        let one = [c(dec!(1), dec!(2), dec!(0), dec!(1.5))];
        assert!(!confirm(&one, Bias::Bullish, &config()).found());
        assert!(!confirm(&[], Bias::Bearish, &config()).found());
    }

    #[test]
    fn test_bullish_engulfing() {
        let candles = [
            c(dec!(2005), dec!(2006), dec!(2001), dec!(2002)),
            c(dec!(2001.5), dec!(2008), dec!(2001), dec!(2007)),
        ];
        let result = confirm(&candles, Bias::Bullish, &config());
        assert_eq!(result.pattern, Some(CandlePattern::Engulfing));
        assert_eq!(result.label(), "engulfing");
        assert!(!confirm(&candles, Bias::Bearish, &config()).found());
    }

    #[test]
    fn test_bearish_pin_bar() {
        let candles = [
            c(dec!(2000.2), dec!(2002), dec!(1999), dec!(2001.2)),
            // body 1, upper wick 7, lower wick 0.5
            c(dec!(2001), dec!(2008), dec!(1999.5), dec!(2000)),
        ];
        let result = confirm(&candles, Bias::Bearish, &config());
        assert_eq!(result.pattern, Some(CandlePattern::PinBar));
    }

    #[test]
    fn test_tiny_pin_bar_filtered() {
        let candles = [
            c(dec!(2000), dec!(2000.2), dec!(1999.9), dec!(2000.1)),
            // proportions of a pin bar but wick only 0.5
            c(dec!(2000.1), dec!(2000.15), dec!(1999.5), dec!(2000.0)),
        ];
        assert!(!confirm(&candles, Bias::Bullish, &config()).found());
    }

    #[test]
    fn test_confirmed_reversal() {
        let candles = [
            // bullish pin: body 1, lower wick 5, upper wick 0.5
            c(dec!(2000), dec!(2001.5), dec!(1995), dec!(2001)),
            // small bullish confirmation bar that does not engulf
            c(dec!(2001), dec!(2003), dec!(2000.5), dec!(2001.5)),
        ];
        let result = confirm(&candles, Bias::Bullish, &config());
        assert_eq!(result.pattern, Some(CandlePattern::ConfirmedReversal));
    }

    #[test]
    fn test_no_pattern() {
        let candles = [
            c(dec!(2000), dec!(2003), dec!(1998), dec!(2002)),
            c(dec!(2002), dec!(2004), dec!(2000), dec!(2003)),
        ];
        let result = confirm(&candles, Bias::Bullish, &config());
        assert!(!result.found());
        assert_eq!(result.label(), "none");
    }
}
