//! Indicator math on Decimal closes: EMA, ATR, RSI

use rust_decimal::Decimal;

use crate::types::Candle;

/// Exponential moving average of closes, value at the last candle.
///
/// Recursive form seeded with the first close; `None` with fewer than
/// `period` candles.
pub fn ema(candles: &[Candle], period: usize) -> Option<Decimal> {
    if period == 0 || candles.len() < period {
        return None;
    }

    let multiplier = Decimal::from(2) / (Decimal::from(period as i64) + Decimal::ONE);
    let mut closes = candles.iter().map(|c| c.close);
    let mut ema = closes.next()?;
    for close in closes {
        ema = (close - ema) * multiplier + ema;
    }
    Some(ema)
}

/// True range of `current` against the previous close
pub fn true_range(current: &Candle, previous: &Candle) -> Decimal {
    let tr1 = current.high - current.low;
    let tr2 = (current.high - previous.close).abs();
    let tr3 = (current.low - previous.close).abs();
    tr1.max(tr2).max(tr3)
}

/// Average true range with Wilder smoothing, seeded by the SMA of the first `period` ranges
pub fn atr(candles: &[Candle], period: usize) -> Option<Decimal> {
    if period == 0 || candles.len() < period + 1 {
        return None;
    }

    let ranges: Vec<Decimal> = candles
        .windows(2)
        .map(|w| true_range(&w[1], &w[0]))
        .collect();

    let n = Decimal::from(period as i64);
    let mut atr = ranges.iter().take(period).sum::<Decimal>() / n;
    for tr in ranges.iter().skip(period) {
        atr = (atr * (n - Decimal::ONE) + *tr) / n;
    }
    Some(atr)
}

/// Relative strength index (Wilder), 0..=100
pub fn rsi(candles: &[Candle], period: usize) -> Option<Decimal> {
    if period == 0 || candles.len() < period + 1 {
        return None;
    }

    let changes: Vec<Decimal> = candles.windows(2).map(|w| w[1].close - w[0].close).collect();
    let n = Decimal::from(period as i64);

    let mut avg_gain = Decimal::ZERO;
    let mut avg_loss = Decimal::ZERO;
    for change in changes.iter().take(period) {
        if change.is_sign_positive() {
            avg_gain += *change;
        } else {
            avg_loss += change.abs();
        }
    }
    avg_gain /= n;
    avg_loss /= n;

    for change in changes.iter().skip(period) {
        let (gain, loss) = if change.is_sign_positive() {
            (*change, Decimal::ZERO)
        } else {
            (Decimal::ZERO, change.abs())
        };
        avg_gain = (avg_gain * (n - Decimal::ONE) + gain) / n;
        avg_loss = (avg_loss * (n - Decimal::ONE) + loss) / n;
    }

    if avg_loss.is_zero() {
        return Some(Decimal::ONE_HUNDRED);
    }

    let rs = avg_gain / avg_loss;
    Some(Decimal::ONE_HUNDRED - Decimal::ONE_HUNDRED / (Decimal::ONE + rs))
}
