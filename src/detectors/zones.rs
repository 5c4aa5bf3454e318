//! Imbalance ("fair value gap") zone detection
//!
//! A three-candle gap where candle `i` never trades back into candle
//! `i-2` leaves an imbalance price tends to revisit:
//! - demand: `low[i] > high[i-2]`, zone `[high[i-2], low[i]]`
//! - supply: `high[i] < low[i-2]`, zone `[high[i], low[i-2]]`

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ZoneConfig;
use crate::detectors::trend::Trend;
use crate::indicators::atr;
use crate::types::{Candle, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneKind {
    Demand,
    Supply,
}

impl ZoneKind {
    pub fn side(self) -> Side {
        match self {
            ZoneKind::Demand => Side::Buy,
            ZoneKind::Supply => Side::Sell,
        }
    }

    pub fn for_side(side: Side) -> Self {
        match side {
            Side::Buy => ZoneKind::Demand,
            Side::Sell => ZoneKind::Supply,
        }
    }
}

/// Imbalance zone; `lower <= upper` always holds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub lower: Decimal,
    pub upper: Decimal,
    pub kind: ZoneKind,
    /// Index of the third (gap-closing) candle in the scanned sequence
    pub origin_index: usize,
    pub higher_timeframe_aligned: bool,
}

impl Zone {
    /// Closed-interval intersection test
    pub fn overlaps(&self, other: &Zone) -> bool {
        self.lower.max(other.lower) <= self.upper.min(other.upper)
    }
}

/// Unfilled zones of one kind in the last `window` candles, most recent first.
///
/// A zone counts as filled once a later candle trades through its far edge.
pub fn find_zones(candles: &[Candle], window: usize, kind: ZoneKind) -> Vec<Zone> {
    let len = candles.len();
    let start = len.saturating_sub(window);
    if len - start < 3 {
        return Vec::new();
    }

    let mut zones = Vec::new();
    for i in (start + 2..len).rev() {
        let first = &candles[i - 2];
        let third = &candles[i];

        let zone = match kind {
            ZoneKind::Demand if third.low > first.high => Zone {
                lower: first.high,
                upper: third.low,
                kind,
                origin_index: i,
                higher_timeframe_aligned: false,
            },
            ZoneKind::Supply if third.high < first.low => Zone {
                lower: third.high,
                upper: first.low,
                kind,
                origin_index: i,
                higher_timeframe_aligned: false,
            },
            _ => continue,
        };

        let filled = candles[i + 1..].iter().any(|c| match kind {
            ZoneKind::Demand => c.low <= zone.lower,
            ZoneKind::Supply => c.high >= zone.upper,
        });
        if !filled {
            zones.push(zone);
        }
    }
    zones
}

/// Candidate zone with its proposed trade geometry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneSetup {
    pub zone: Zone,
    pub side: Side,
    pub stop: Decimal,
    pub target: Decimal,
    pub atr: Decimal,
    /// How far price already sits beyond the zone in the trade's favor
    pub extension: Decimal,
}

/// Outcome of one zone scan
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ZoneScan {
    /// No zone consistent with the trend, or not enough history
    NotFound,
    /// Zone exists but price already ran too far from it
    Extended { zone: Zone, extension_atr: Decimal },
    Candidate(ZoneSetup),
}

impl ZoneScan {
    pub fn setup(&self) -> Option<&ZoneSetup> {
        match self {
            ZoneScan::Candidate(setup) => Some(setup),
            _ => None,
        }
    }
}

/// Pick the most recent trend-consistent zone and test it for chase entries
/// and higher-timeframe alignment.
pub fn scan(
    candles: &[Candle],
    trend: Trend,
    higher_zones: &[Zone],
    config: &ZoneConfig,
) -> ZoneScan {
    let Some(side) = trend.side() else {
        return ZoneScan::NotFound;
    };
    let kind = ZoneKind::for_side(side);

    let (Some(atr), Some(latest)) = (atr(candles, config.atr_period), candles.last()) else {
        return ZoneScan::NotFound;
    };

    let Some(mut zone) = find_zones(candles, config.window, kind).into_iter().next() else {
        debug!("No unfilled {:?} zone in last {} candles", kind, config.window);
        return ZoneScan::NotFound;
    };
    zone.higher_timeframe_aligned = higher_zones.iter().any(|h| h.kind == kind && zone.overlaps(h));

    let window = &candles[candles.len().saturating_sub(config.window)..];
    let (stop, target, extension) = match side {
        Side::Buy => (
            zone.lower - atr * config.stop_atr,
            window.iter().map(|c| c.high).max().unwrap_or(zone.upper),
            latest.close - zone.upper,
        ),
        Side::Sell => (
            zone.upper + atr * config.stop_atr,
            window.iter().map(|c| c.low).min().unwrap_or(zone.lower),
            zone.lower - latest.close,
        ),
    };

    if extension >= atr * config.max_extension_atr {
        let extension_atr = if atr.is_zero() { Decimal::ZERO } else { extension / atr };
        debug!(
            "Zone [{}, {}] rejected: price extended {:.2} ATR away",
            zone.lower, zone.upper, extension_atr
        );
        return ZoneScan::Extended { zone, extension_atr };
    }

    ZoneScan::Candidate(ZoneSetup {
        zone,
        side,
        stop,
        target,
        atr,
        extension,
    })
}
