//! Trading signals - output from the evaluation paths

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::detectors::Zone;
use crate::events::EventLight;
use crate::types::{PriceLevel, Side, Stars, TradeMode};

/// How the signal was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalOrigin {
    /// Zone confluence scoring
    Confluence,
    /// Liquidity sweep with confirmation
    Breakout,
    /// Volatility shock, scoring bypassed
    Emergency,
}

/// Directional trade proposal; immutable once built.
///
/// Invariant: `entry_low <= entry_high`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub mode: TradeMode,
    pub origin: SignalOrigin,
    pub direction: Side,
    pub entry_low: Decimal,
    pub entry_high: Decimal,
    pub stop: Decimal,
    pub target: Decimal,
    pub stars: Stars,
    pub rationale: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sweep_reference: Option<Decimal>,
    /// Zone the setup was built on, used to suppress re-proposals
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<Zone>,
    pub created_at: DateTime<Utc>,
}

impl Signal {
    /// Build a signal, ordering the entry bounds
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        mode: TradeMode,
        origin: SignalOrigin,
        direction: Side,
        entry_a: Decimal,
        entry_b: Decimal,
        stop: Decimal,
        target: Decimal,
        stars: Stars,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            mode,
            origin,
            direction,
            entry_low: entry_a.min(entry_b),
            entry_high: entry_a.max(entry_b),
            stop,
            target,
            stars,
            rationale: Vec::new(),
            sweep_reference: None,
            zone: None,
            created_at,
        }
    }

    pub fn with_rationale(mut self, rationale: Vec<String>) -> Self {
        self.rationale = rationale;
        self
    }

    pub fn with_sweep_reference(mut self, level: Decimal) -> Self {
        self.sweep_reference = Some(level);
        self
    }

    pub fn with_zone(mut self, zone: Zone) -> Self {
        self.zone = Some(zone);
        self
    }

    /// Limit price of the proposal: the entry edge met first by a retrace
    pub fn entry_price(&self) -> Decimal {
        match self.direction {
            Side::Buy => self.entry_high,
            Side::Sell => self.entry_low,
        }
    }

    /// Rendered levels for display, never parsed back
    pub fn levels(&self) -> SignalLevels {
        SignalLevels {
            entry_low: PriceLevel::new(self.entry_low),
            entry_high: PriceLevel::new(self.entry_high),
            stop: PriceLevel::new(self.stop),
            target: PriceLevel::new(self.target),
            stars: self.stars.glyphs(),
        }
    }
}

/// Display companion of a signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalLevels {
    pub entry_low: PriceLevel,
    pub entry_high: PriceLevel,
    pub stop: PriceLevel,
    pub target: PriceLevel,
    pub stars: String,
}

/// Why an evaluation produced no proposal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum WaitReason {
    NoData,
    EventWindow { title: String, hours_until: f64 },
    /// Breakout mode only trades the green news window
    NewsLight { light: EventLight },
    MomentumExhausted { direction: Side, rsi: Decimal },
    SidewaysTrend,
    NoZone,
    ExtendedFromZone { extension_atr: Decimal },
    NoRoomToTarget,
    NoSweep,
    NoConfirmation,
    MacroConflict { change: Decimal },
    FundFlowConflict,
    SentimentNotStretched { percent: Decimal },
    InvalidGeometry,
}

impl std::fmt::Display for WaitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WaitReason::NoData => write!(f, "no data"),
            WaitReason::EventWindow { title, hours_until } => write!(
                f,
                "high-impact event '{}' within the blackout window ({:+.0} min)",
                title,
                hours_until * 60.0
            ),
            WaitReason::NewsLight { light } => match light {
                EventLight::Idle => write!(f, "no high-impact event nearby, volatility too low"),
                EventLight::Red => {
                    write!(f, "high-impact event just released or imminent, waiting for the dust to settle")
                }
                EventLight::Yellow => {
                    write!(f, "high-impact event still far out, waiting for liquidity to build")
                }
                EventLight::Green => write!(f, "news window open"),
            },
            WaitReason::MomentumExhausted { direction, rsi } => write!(
                f,
                "momentum exhausted for a {} (RSI {:.1}), not chasing",
                direction, rsi
            ),
            WaitReason::SidewaysTrend => write!(f, "fast timeframe trend is sideways"),
            WaitReason::NoZone => write!(f, "no unfilled imbalance zone in trend direction"),
            WaitReason::ExtendedFromZone { extension_atr } => write!(
                f,
                "price already {:.1} ATR beyond the zone, not chasing",
                extension_atr
            ),
            WaitReason::NoRoomToTarget => write!(f, "target does not clear entry"),
            WaitReason::NoSweep => write!(f, "no liquidity sweep / change of character"),
            WaitReason::NoConfirmation => write!(f, "sweep found but no candlestick confirmation"),
            WaitReason::MacroConflict { change } => {
                write!(f, "currency index moving against the trade ({:+.2}%)", change)
            }
            WaitReason::FundFlowConflict => write!(f, "fund flow does not support the direction"),
            WaitReason::SentimentNotStretched { percent } => write!(
                f,
                "retail crowd not stretched against the trade ({:.1}%)",
                percent
            ),
            WaitReason::InvalidGeometry => write!(f, "stop does not sit beyond entry"),
        }
    }
}

/// Result of evaluating one mode for one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Evaluation {
    Signal(Box<Signal>),
    Wait(WaitReason),
}

impl Evaluation {
    pub fn wait(reason: WaitReason) -> Self {
        Evaluation::Wait(reason)
    }

    pub fn signal(&self) -> Option<&Signal> {
        match self {
            Evaluation::Signal(signal) => Some(signal),
            Evaluation::Wait(_) => None,
        }
    }

    pub fn wait_reason(&self) -> Option<&WaitReason> {
        match self {
            Evaluation::Wait(reason) => Some(reason),
            Evaluation::Signal(_) => None,
        }
    }
}

impl From<Signal> for Evaluation {
    fn from(signal: Signal) -> Self {
        Evaluation::Signal(Box::new(signal))
    }
}
