//! Day-scoped scoreboard of trade outcomes
//!
//! Days are calendar dates at a fixed UTC offset (the trading-day
//! convention); the first event of a new date starts a zeroed entry.

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::TrackerConfig;
use crate::tracker::{TradeEvent, TradeResult, TradeState};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreboardEntry {
    pub date: NaiveDate,
    pub win_count: u32,
    pub loss_count: u32,
    pub breakeven_count: u32,
    /// Trades opened and not yet finished on this date, never below zero
    pub pending_count: u32,
    pub net_risk_units: Decimal,
}

impl ScoreboardEntry {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            win_count: 0,
            loss_count: 0,
            breakeven_count: 0,
            pending_count: 0,
            net_risk_units: Decimal::ZERO,
        }
    }

    pub fn resolved_count(&self) -> u32 {
        self.win_count + self.loss_count + self.breakeven_count
    }
}

#[derive(Debug, Clone)]
pub struct Scoreboard {
    offset: FixedOffset,
    current: Option<ScoreboardEntry>,
    history: Vec<ScoreboardEntry>,
}

impl Scoreboard {
    pub fn new(config: &TrackerConfig) -> Self {
        let offset = config
            .utc_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| {
                warn!(
                    "UTC offset {}h out of range, using UTC trading days",
                    config.utc_offset_hours
                );
                Utc.fix()
            });
        Self {
            offset,
            current: None,
            history: Vec::new(),
        }
    }

    /// Trading day an instant belongs to
    pub fn trading_day(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset).date_naive()
    }

    /// Entry for the date of `at`, rolling over when the date changed
    fn entry_for(&mut self, at: DateTime<Utc>) -> &mut ScoreboardEntry {
        let date = self.trading_day(at);
        let stale = self.current.as_ref().map_or(true, |e| e.date != date);
        if stale {
            if let Some(done) = self.current.take() {
                info!(
                    "Scoreboard {} closed: {}W {}L {}BE, net {} units",
                    done.date, done.win_count, done.loss_count, done.breakeven_count, done.net_risk_units
                );
                self.history.push(done);
            }
        }
        self.current.get_or_insert_with(|| ScoreboardEntry::new(date))
    }

    /// Book one trade event on the trading day of `recorded_at`, the tick
    /// that observed it (candle timestamps may lag the wall clock)
    pub fn record(&mut self, event: &TradeEvent, recorded_at: DateTime<Utc>) {
        let entry = self.entry_for(recorded_at);

        if event.from.is_none() && event.to == TradeState::Pending {
            entry.pending_count += 1;
            return;
        }
        if !event.to.is_terminal() {
            return;
        }

        entry.pending_count = entry.pending_count.saturating_sub(1);
        if let Some(resolution) = &event.resolution {
            match resolution.result {
                TradeResult::Win => entry.win_count += 1,
                TradeResult::Loss => entry.loss_count += 1,
                TradeResult::Breakeven => entry.breakeven_count += 1,
            }
            entry.net_risk_units += resolution.units;
        }
    }

    /// Entry for the trading day containing `now`; zeroed if nothing happened yet
    pub fn snapshot(&self, now: DateTime<Utc>) -> ScoreboardEntry {
        let date = self.trading_day(now);
        match &self.current {
            Some(entry) if entry.date == date => entry.clone(),
            _ => self
                .history
                .iter()
                .find(|e| e.date == date)
                .cloned()
                .unwrap_or_else(|| ScoreboardEntry::new(date)),
        }
    }

    /// Closed days, oldest first
    pub fn history(&self) -> &[ScoreboardEntry] {
        &self.history
    }
}
