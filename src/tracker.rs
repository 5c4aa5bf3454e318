//! Trade lifecycle tracking, one slot per mode
//!
//! A Trade is opened from a Signal and then advanced by each new fast candle:
//!
//! ```text
//! Pending ──entry touched──▶ Active ──mid reached──▶ BreakevenArmed
//!    │                         │                        │
//!    └─target first─▶ Cancelled└─stop/target─▶ Win|Loss └─stop/target─▶ Win|Breakeven
//! ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::algorithms::Signal;
use crate::config::TrackerConfig;
use crate::detectors::ZoneKind;
use crate::ev::{self, EvReport};
use crate::types::{Candle, EngineError, Result, Side, TradeMode};

/// Trade states; transitions only move forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeState {
    Pending,
    Active,
    BreakevenArmed,
    ResolvedWin,
    ResolvedLoss,
    ResolvedBreakeven,
    Cancelled,
}

impl TradeState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TradeState::ResolvedWin
                | TradeState::ResolvedLoss
                | TradeState::ResolvedBreakeven
                | TradeState::Cancelled
        )
    }

    /// Result tag for resolved states
    pub fn result(self) -> Option<TradeResult> {
        match self {
            TradeState::ResolvedWin => Some(TradeResult::Win),
            TradeState::ResolvedLoss => Some(TradeResult::Loss),
            TradeState::ResolvedBreakeven => Some(TradeResult::Breakeven),
            _ => None,
        }
    }
}

impl std::fmt::Display for TradeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            TradeState::Pending => "pending",
            TradeState::Active => "active",
            TradeState::BreakevenArmed => "breakeven-armed",
            TradeState::ResolvedWin => "win",
            TradeState::ResolvedLoss => "loss",
            TradeState::ResolvedBreakeven => "breakeven",
            TradeState::Cancelled => "cancelled",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeResult {
    Win,
    Loss,
    Breakeven,
}

/// Identity of a setup, compared on structured values to suppress re-proposals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SetupKey {
    Zone { kind: ZoneKind, lower: Decimal, upper: Decimal },
    Sweep { level: Decimal },
    Levels { entry: Decimal, stop: Decimal },
}

impl SetupKey {
    pub fn of(signal: &Signal) -> Self {
        if let Some(zone) = &signal.zone {
            SetupKey::Zone {
                kind: zone.kind,
                lower: zone.lower,
                upper: zone.upper,
            }
        } else if let Some(level) = signal.sweep_reference {
            SetupKey::Sweep { level }
        } else {
            SetupKey::Levels {
                entry: signal.entry_price(),
                stop: signal.stop,
            }
        }
    }
}

/// Mutable record derived from one Signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: Uuid,
    pub mode: TradeMode,
    pub direction: Side,
    pub entry_price: Decimal,
    /// Live stop; ratchets toward entry once armed
    pub stop_price: Decimal,
    /// Stop at creation, used for loss accounting
    pub original_stop_price: Decimal,
    pub target_price: Decimal,
    pub mid_price: Decimal,
    pub state: TradeState,
    pub created_at: DateTime<Utc>,
    /// Newest candle already applied
    pub last_candle_at: DateTime<Utc>,
    pub signal: Signal,
}

impl Trade {
    pub fn from_signal(signal: Signal, opened_on: DateTime<Utc>) -> Self {
        let entry = signal.entry_price();
        Self {
            id: Uuid::new_v4(),
            mode: signal.mode,
            direction: signal.direction,
            entry_price: entry,
            stop_price: signal.stop,
            original_stop_price: signal.stop,
            target_price: signal.target,
            mid_price: entry + (signal.target - entry) / Decimal::TWO,
            state: TradeState::Pending,
            created_at: signal.created_at,
            last_candle_at: opened_on,
            signal,
        }
    }

    /// Elapsed time since creation, for human review only
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.created_at
    }

    pub fn original_risk(&self) -> Decimal {
        (self.entry_price - self.original_stop_price).abs()
    }

    pub fn planned_reward(&self) -> Decimal {
        (self.target_price - self.entry_price).abs()
    }

    fn touched(&self, candle: &Candle, level: Decimal) -> bool {
        match self.direction {
            Side::Buy if level <= self.entry_price => candle.low <= level,
            Side::Buy => candle.high >= level,
            Side::Sell if level >= self.entry_price => candle.high >= level,
            Side::Sell => candle.low <= level,
        }
    }

    fn target_touched(&self, candle: &Candle) -> bool {
        match self.direction {
            Side::Buy => candle.high >= self.target_price,
            Side::Sell => candle.low <= self.target_price,
        }
    }

    fn stop_touched(&self, candle: &Candle) -> bool {
        match self.direction {
            Side::Buy => candle.low <= self.stop_price,
            Side::Sell => candle.high >= self.stop_price,
        }
    }

    fn set_state(&mut self, to: TradeState, steps: &mut Vec<(TradeState, TradeState)>) {
        debug!("Trade {} ({}): {} -> {}", self.id, self.mode, self.state, to);
        steps.push((self.state, to));
        self.state = to;
    }

    /// Apply one candle, returning the transitions it caused in order
    fn advance(&mut self, candle: &Candle, breakeven_offset: Decimal) -> Vec<(TradeState, TradeState)> {
        let mut steps = Vec::new();

        if self.state == TradeState::Pending {
            if !self.touched(candle, self.entry_price) {
                if self.target_touched(candle) {
                    self.set_state(TradeState::Cancelled, &mut steps);
                }
                return steps;
            }
            self.set_state(TradeState::Active, &mut steps);
        }

        if !matches!(self.state, TradeState::Active | TradeState::BreakevenArmed) {
            return steps;
        }

        let armed = self.state == TradeState::BreakevenArmed;
        let stopped = if armed {
            TradeState::ResolvedBreakeven
        } else {
            TradeState::ResolvedLoss
        };
        let resolution = match (self.stop_touched(candle), self.target_touched(candle)) {
            // Candle straddles both levels: the close decides
            (true, true) if self.direction.at_or_beyond(candle.close, self.entry_price) => {
                Some(TradeState::ResolvedWin)
            }
            (true, true) => Some(stopped),
            (false, true) => Some(TradeState::ResolvedWin),
            (true, false) => Some(stopped),
            (false, false) => None,
        };
        if let Some(to) = resolution {
            self.set_state(to, &mut steps);
            return steps;
        }

        if !armed && self.touched(candle, self.mid_price) {
            let sign = self.direction.sign();
            let mut candidate = self.entry_price + sign * breakeven_offset;
            // never past the halfway mark
            if self.direction.at_or_beyond(candidate, self.mid_price) {
                candidate = self.mid_price;
            }
            if self.direction.at_or_beyond(candidate, self.stop_price) {
                self.stop_price = candidate;
            }
            self.set_state(TradeState::BreakevenArmed, &mut steps);
        }

        steps
    }
}

/// Terminal payload of a resolved trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub result: TradeResult,
    pub signal: Signal,
    pub ev: EvReport,
    /// Signed scoreboard units booked for this trade
    pub units: Decimal,
}

/// Lifecycle transition; `from` is `None` when the trade was just opened
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub mode: TradeMode,
    pub trade_id: Uuid,
    pub from: Option<TradeState>,
    pub to: TradeState,
    pub at: DateTime<Utc>,
    pub stop_price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
}

#[derive(Debug, Clone, Default)]
struct Slot {
    trade: Option<Trade>,
    last_setup: Option<SetupKey>,
}

/// Per-mode trade slots that survive across ticks
#[derive(Debug, Clone)]
pub struct TradeTracker {
    slots: BTreeMap<TradeMode, Slot>,
    config: TrackerConfig,
}

impl TradeTracker {
    pub fn new(config: TrackerConfig) -> Self {
        let slots = TradeMode::ALL.iter().map(|m| (*m, Slot::default())).collect();
        Self { slots, config }
    }

    pub fn open_trade(&self, mode: TradeMode) -> Option<&Trade> {
        self.slots.get(&mode).and_then(|s| s.trade.as_ref())
    }

    pub fn open_trades(&self) -> impl Iterator<Item = &Trade> {
        self.slots.values().filter_map(|s| s.trade.as_ref())
    }

    /// Setup most recently finished in this mode
    pub fn last_setup(&self, mode: TradeMode) -> Option<SetupKey> {
        self.slots.get(&mode).and_then(|s| s.last_setup)
    }

    /// Open a trade in the signal's mode.
    ///
    /// `opened_on` is the timestamp of the newest candle already seen; only
    /// later candles advance the trade.
    pub fn open(&mut self, signal: Signal, opened_on: DateTime<Utc>) -> Result<TradeEvent> {
        let mode = signal.mode;
        let slot = self.slots.entry(mode).or_default();

        if let Some(existing) = &slot.trade {
            return Err(EngineError::SlotOccupied {
                mode,
                trade_id: existing.id,
            });
        }
        if slot.last_setup == Some(SetupKey::of(&signal)) {
            return Err(EngineError::DuplicateSetup(mode));
        }

        let trade = Trade::from_signal(signal, opened_on);
        info!(
            "Opened {} {} trade {}: entry {} stop {} target {} ({})",
            mode,
            trade.direction,
            trade.id,
            trade.entry_price,
            trade.stop_price,
            trade.target_price,
            trade.signal.stars.glyphs()
        );
        let event = TradeEvent {
            mode,
            trade_id: trade.id,
            from: None,
            to: trade.state,
            at: trade.created_at,
            stop_price: trade.stop_price,
            resolution: None,
        };
        slot.trade = Some(trade);
        Ok(event)
    }

    /// Apply every candle newer than what the open trades have seen, oldest first.
    ///
    /// Candles are taken as final once appended: a candle whose timestamp was
    /// already applied is never re-read, so the feed should only deliver
    /// closed candles. A tick lost to a failed fetch is caught up here.
    pub fn on_candles(&mut self, candles: &[Candle]) -> Vec<TradeEvent> {
        let Some(oldest) = self.open_trades().map(|t| t.last_candle_at).min() else {
            return Vec::new();
        };
        let start = candles.partition_point(|c| c.timestamp <= oldest);
        candles[start..]
            .iter()
            .flat_map(|candle| self.on_candle(candle))
            .collect()
    }

    /// Advance every open trade with a new candle
    pub fn on_candle(&mut self, candle: &Candle) -> Vec<TradeEvent> {
        let mut events = Vec::new();

        for (mode, slot) in self.slots.iter_mut() {
            let Some(trade) = slot.trade.as_mut() else {
                continue;
            };
            if candle.timestamp <= trade.last_candle_at {
                continue;
            }
            trade.last_candle_at = candle.timestamp;

            let steps = trade.advance(candle, self.config.breakeven_offset);
            for (from, to) in steps {
                let resolution = match to.result() {
                    Some(result) => Some(Resolution {
                        result,
                        signal: trade.signal.clone(),
                        ev: ev::from_signal(&trade.signal),
                        units: booked_units(trade, result, &self.config),
                    }),
                    None => None,
                };
                if let Some(r) = &resolution {
                    info!(
                        "Trade {} ({}) resolved {:?}: {} units",
                        trade.id, mode, r.result, r.units
                    );
                }
                events.push(TradeEvent {
                    mode: *mode,
                    trade_id: trade.id,
                    from: Some(from),
                    to,
                    at: candle.timestamp,
                    stop_price: trade.stop_price,
                    resolution,
                });
            }

            if trade.state.is_terminal() {
                if trade.state == TradeState::Cancelled {
                    info!("Trade {} ({}) cancelled: target reached before entry", trade.id, mode);
                }
                slot.last_setup = Some(SetupKey::of(&trade.signal));
                slot.trade = None;
            }
        }

        events
    }
}

/// Win books the reward, loss the original risk, breakeven a fixed credit
fn booked_units(trade: &Trade, result: TradeResult, config: &TrackerConfig) -> Decimal {
    match result {
        TradeResult::Win => trade.planned_reward() * config.unit_value,
        TradeResult::Loss => -(trade.original_risk() * config.unit_value),
        TradeResult::Breakeven => config.breakeven_credit,
    }
}
