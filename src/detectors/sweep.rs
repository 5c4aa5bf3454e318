//! Structure break / liquidity sweep (change of character)
//!
//! The last `window` candles split into a reference block (oldest
//! `reference`), a recent block (`recent` candles before the latest) and the
//! latest close. A bullish sweep pokes below the reference lows inside the
//! recent block, then the latest close reverses above the recent highs.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::SweepConfig;
use crate::types::{Bias, Candle};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepEvent {
    pub direction: Bias,
    /// Extreme of the recent block that ran the liquidity
    pub swept_extreme: Decimal,
    pub trigger_close: Decimal,
}

/// Detect a sweep + reversal; `None` without the full window
pub fn detect(candles: &[Candle], config: &SweepConfig) -> Option<SweepEvent> {
    if config.reference == 0 || config.recent == 0 || candles.len() < config.window {
        return None;
    }
    if config.reference + config.recent >= config.window {
        return None;
    }

    let window = &candles[candles.len() - config.window..];
    let reference = &window[..config.reference];
    let latest = window.last()?;
    let recent = &window[window.len() - 1 - config.recent..window.len() - 1];

    let reference_low = reference.iter().map(|c| c.low).min()?;
    let reference_high = reference.iter().map(|c| c.high).max()?;
    let recent_low = recent.iter().map(|c| c.low).min()?;
    let recent_high = recent.iter().map(|c| c.high).max()?;

    if recent_low < reference_low && latest.close > recent_high {
        return Some(SweepEvent {
            direction: Bias::Bullish,
            swept_extreme: recent_low,
            trigger_close: latest.close,
        });
    }

    if recent_high > reference_high && latest.close < recent_low {
        return Some(SweepEvent {
            direction: Bias::Bearish,
            swept_extreme: recent_high,
            trigger_close: latest.close,
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;

    fn range(count: usize) -> Vec<Candle> {
        let start = Utc::now();
        (0..count)
            .map(|i| {
                Candle::new(
                    start + Duration::minutes(15 * i as i64),
                    dec!(2000),
                    dec!(2003),
                    dec!(1997),
                    dec!(2000),
                )
            })
            .collect()
    }

    fn set(c: &mut Candle, high: Decimal, low: Decimal, close: Decimal) {
        c.high = high;
        c.low = low;
        c.close = close;
    }

    #[test]
    fn test_requires_full_window() {
        let candles = range(19);
        assert!(detect(&candles, &SweepConfig::default()).is_none());
    }

    #[test]
    fn test_no_sweep_in_range() {
        let candles = range(25);
        assert!(detect(&candles, &SweepConfig::default()).is_none());
    }

    #[test]
    fn test_bullish_sweep() {
        let mut candles = range(20);
        set(&mut candles[16], dec!(2001), dec!(1993), dec!(1995));
        set(&mut candles[17], dec!(1999), dec!(1994), dec!(1998));
        set(&mut candles[19], dec!(2006), dec!(1998), dec!(2005));
        let sweep = detect(&candles, &SweepConfig::default()).unwrap();
        assert_eq!(sweep.direction, Bias::Bullish);
        assert_eq!(sweep.swept_extreme, dec!(1993));
        assert_eq!(sweep.trigger_close, dec!(2005));
    }

    #[test]
    fn test_bearish_sweep() {
        let mut candles = range(22);
        // window is the last 20: indices 2..22, recent block 17..21
        set(&mut candles[18], dec!(2008), dec!(2001), dec!(2006));
        set(&mut candles[21], dec!(2001), dec!(1994), dec!(1995));
        let sweep = detect(&candles, &SweepConfig::default()).unwrap();
        assert_eq!(sweep.direction, Bias::Bearish);
        assert_eq!(sweep.swept_extreme, dec!(2008));
        assert_eq!(sweep.trigger_close, dec!(1995));
    }

    #[test]
    fn test_sweep_without_reversal_close() {
        let mut candles = range(20);
        set(&mut candles[16], dec!(2001), dec!(1993), dec!(1995));
        // close stays below the recent high of 2003
        set(&mut candles[19], dec!(2003), dec!(1998), dec!(2002));
        assert!(detect(&candles, &SweepConfig::default()).is_none());
    }
}
