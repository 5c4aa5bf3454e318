//! Market snapshot - the already-fetched inputs for one evaluation tick
//!
//! Collaborators deliver candles, macro metrics, sentiment, fund flow and
//! event calendars. Nothing here performs I/O beyond decoding.

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::events::ScheduledEvent;
use crate::types::Candle;

/// Candle row as delivered by the price feed (`o/h/l/c/t`).
///
/// Values may be numbers or numeric strings. Missing or malformed fields
/// decode as null and drop the row in `sanitize_candles`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawCandle {
    #[serde(default, rename = "o")]
    pub open: serde_json::Value,
    #[serde(default, rename = "h")]
    pub high: serde_json::Value,
    #[serde(default, rename = "l")]
    pub low: serde_json::Value,
    #[serde(default, rename = "c")]
    pub close: serde_json::Value,
    /// Unix seconds, number or numeric string
    #[serde(default, rename = "t")]
    pub time: serde_json::Value,
}

impl RawCandle {
    /// Convert to a typed candle, `None` if any field is malformed
    pub fn parse(&self) -> Option<Candle> {
        let open = parse_decimal(&self.open)?;
        let high = parse_decimal(&self.high)?;
        let low = parse_decimal(&self.low)?;
        let close = parse_decimal(&self.close)?;
        if high < low {
            return None;
        }
        let timestamp = parse_timestamp(&self.time)?;
        Some(Candle::new(timestamp, open, high, low, close))
    }
}

/// Unix seconds from a JSON integer or numeric string
pub fn parse_timestamp(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    let seconds = match value {
        serde_json::Value::Number(n) => n.as_i64()?,
        serde_json::Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    Utc.timestamp_opt(seconds, 0).single()
}

/// Decode candle rows one at a time so a bad row cannot sink the snapshot.
///
/// Rows that are not objects, or carry the wrong shape, become empty rows
/// that `sanitize_candles` drops and counts.
fn lenient_rows<'de, D>(deserializer: D) -> std::result::Result<Vec<RawCandle>, D::Error>
where
    D: Deserializer<'de>,
{
    let rows = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(rows
        .into_iter()
        .map(|row| serde_json::from_value(row).unwrap_or_default())
        .collect())
}

/// Parse a JSON number or numeric string into a Decimal
pub fn parse_decimal(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Decimal::from(i))
            } else {
                n.as_f64().and_then(|f| Decimal::from_str(&f.to_string()).ok())
            }
        }
        serde_json::Value::String(s) => parse_price(s),
        _ => None,
    }
}

/// Parse a price written for humans, e.g. `"$ 2,001.50"`
pub fn parse_price(text: &str) -> Option<Decimal> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();
    Decimal::from_str(&cleaned).ok()
}

/// Drop malformed rows and rows that do not strictly advance in time
pub fn sanitize_candles(rows: &[RawCandle]) -> Vec<Candle> {
    let mut candles: Vec<Candle> = Vec::with_capacity(rows.len());
    let mut malformed = 0usize;
    let mut out_of_order = 0usize;

    for row in rows {
        let Some(candle) = row.parse() else {
            malformed += 1;
            continue;
        };
        if let Some(last) = candles.last() {
            if candle.timestamp <= last.timestamp {
                out_of_order += 1;
                continue;
            }
        }
        candles.push(candle);
    }

    if malformed > 0 || out_of_order > 0 {
        warn!(
            "Dropped candle rows: {} malformed, {} out of order ({} kept)",
            malformed,
            out_of_order,
            candles.len()
        );
    } else {
        debug!("Sanitized {} candle rows", candles.len());
    }

    candles
}

/// Macro metric with its latest percent change
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacroMetric {
    pub value: Decimal,
    pub percent_change: Decimal,
}

impl MacroMetric {
    /// Metric from the last two closes of a series; zero change if `previous` is zero
    pub fn from_closes(current: Decimal, previous: Decimal) -> Self {
        let percent_change = if previous.is_zero() {
            Decimal::ZERO
        } else {
            (current - previous) / previous * Decimal::ONE_HUNDRED
        };
        Self {
            value: current,
            percent_change,
        }
    }

    /// Metric from a close series, `None` with fewer than two closes
    pub fn from_series(closes: &[Decimal]) -> Option<Self> {
        match closes {
            [.., previous, current] => Some(Self::from_closes(*current, *previous)),
            _ => None,
        }
    }
}

/// Retail positioning, percent of traders short vs long
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    pub short_percent: Decimal,
    pub long_percent: Decimal,
}

impl Default for Sentiment {
    fn default() -> Self {
        Self {
            short_percent: Decimal::from(50),
            long_percent: Decimal::from(50),
        }
    }
}

/// Smart-money fund flow: signed magnitude or neutral
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Option<Decimal>", into = "Option<Decimal>")]
pub enum FundFlow {
    #[default]
    Neutral,
    Signed(Decimal),
}

impl FundFlow {
    /// Sign of the flow, `None` when neutral or exactly zero
    pub fn bias(&self) -> Option<crate::types::Bias> {
        match self {
            FundFlow::Signed(v) if v.is_sign_positive() && !v.is_zero() => {
                Some(crate::types::Bias::Bullish)
            }
            FundFlow::Signed(v) if v.is_sign_negative() && !v.is_zero() => {
                Some(crate::types::Bias::Bearish)
            }
            _ => None,
        }
    }
}

impl From<Option<Decimal>> for FundFlow {
    fn from(value: Option<Decimal>) -> Self {
        value.map(FundFlow::Signed).unwrap_or(FundFlow::Neutral)
    }
}

impl From<FundFlow> for Option<Decimal> {
    fn from(flow: FundFlow) -> Self {
        match flow {
            FundFlow::Neutral => None,
            FundFlow::Signed(v) => Some(v),
        }
    }
}

/// Wire form of a snapshot as written by the data collaborator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSnapshot {
    #[serde(default, deserialize_with = "lenient_rows")]
    pub fast: Vec<RawCandle>,
    #[serde(default, deserialize_with = "lenient_rows")]
    pub slow: Vec<RawCandle>,
    #[serde(default, rename = "macro")]
    pub macro_metrics: HashMap<String, MacroMetric>,
    #[serde(default)]
    pub sentiment: Option<Sentiment>,
    #[serde(default)]
    pub fund_flow: FundFlow,
    /// Primary event feed
    #[serde(default)]
    pub events: Vec<ScheduledEvent>,
    /// Secondary calendar, deduplicated against `events`
    #[serde(default)]
    pub calendar: Vec<ScheduledEvent>,
}

/// Inputs for one evaluation tick, candles already sanitized
#[derive(Debug, Clone, Default)]
pub struct MarketSnapshot {
    /// Fast (entry) timeframe
    pub fast: Vec<Candle>,
    /// Slower confirming timeframe
    pub slow: Vec<Candle>,
    pub macro_metrics: HashMap<String, MacroMetric>,
    pub sentiment: Option<Sentiment>,
    pub fund_flow: FundFlow,
    pub events: Vec<ScheduledEvent>,
}

impl MarketSnapshot {
    pub fn latest(&self) -> Option<&Candle> {
        self.fast.last()
    }

    pub fn macro_change(&self, symbol: &str) -> Option<Decimal> {
        self.macro_metrics.get(symbol).map(|m| m.percent_change)
    }
}

impl From<RawSnapshot> for MarketSnapshot {
    fn from(raw: RawSnapshot) -> Self {
        Self {
            fast: sanitize_candles(&raw.fast),
            slow: sanitize_candles(&raw.slow),
            macro_metrics: raw.macro_metrics,
            sentiment: raw.sentiment,
            fund_flow: raw.fund_flow,
            events: crate::events::merge_event_sources(raw.events, raw.calendar),
        }
    }
}
