//! Signal engine - one evaluation pass per tick
//!
//! Owns the trade tracker and the scoreboard. Each tick advances open trades
//! with the fast candles they have not seen yet, evaluates every mode, opens
//! trades for fresh setups and reports everything that happened.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::algorithms::{
    BreakoutEvaluator, ConfluenceEvaluator, Evaluation, Evaluator, MarketContext, WaitReason,
};
use crate::config::EngineConfig;
use crate::events::{next_high_impact, EventLight, EventProximity};
use crate::ev::{self, EvReport};
use crate::market::MarketSnapshot;
use crate::scoreboard::{Scoreboard, ScoreboardEntry};
use crate::tracker::{Trade, TradeEvent, TradeTracker};
use crate::types::{EngineError, TradeMode};

/// Evaluation of one mode in one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeOutcome {
    pub mode: TradeMode,
    pub evaluation: Evaluation,
    /// Present whenever the evaluation produced a signal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ev: Option<EvReport>,
    /// Whether the signal opened a trade this tick
    pub opened: bool,
}

/// Everything one tick produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickReport {
    pub at: DateTime<Utc>,
    pub outcomes: Vec<ModeOutcome>,
    pub events: Vec<TradeEvent>,
    pub open_trades: Vec<Trade>,
    pub scoreboard: ScoreboardEntry,
    pub next_event: Option<EventProximity>,
    pub event_light: EventLight,
}

impl TickReport {
    pub fn outcome(&self, mode: TradeMode) -> Option<&ModeOutcome> {
        self.outcomes.iter().find(|o| o.mode == mode)
    }
}

pub struct SignalEngine {
    config: EngineConfig,
    evaluators: Vec<Box<dyn Evaluator>>,
    tracker: TradeTracker,
    scoreboard: Scoreboard,
}

impl SignalEngine {
    pub fn new(config: EngineConfig) -> Self {
        let evaluators: Vec<Box<dyn Evaluator>> = vec![
            Box::new(ConfluenceEvaluator::new(&config)),
            Box::new(BreakoutEvaluator::new(&config)),
        ];
        let tracker = TradeTracker::new(config.tracker);
        let scoreboard = Scoreboard::new(&config.tracker);
        Self {
            config,
            evaluators,
            tracker,
            scoreboard,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn tracker(&self) -> &TradeTracker {
        &self.tracker
    }

    pub fn scoreboard(&self) -> &Scoreboard {
        &self.scoreboard
    }

    /// Run one evaluation pass over an already-fetched snapshot
    pub fn tick(&mut self, snapshot: &MarketSnapshot, now: DateTime<Utc>) -> TickReport {
        let next_event = next_high_impact(&snapshot.events, now);
        let event_light = EventLight::from_proximity(next_event.as_ref());

        let Some(latest) = snapshot.latest() else {
            warn!("Tick with empty fast candle series, waiting");
            let outcomes = TradeMode::ALL
                .iter()
                .map(|mode| ModeOutcome {
                    mode: *mode,
                    evaluation: Evaluation::wait(WaitReason::NoData),
                    ev: None,
                    opened: false,
                })
                .collect();
            return self.report(now, outcomes, Vec::new(), next_event, event_light);
        };

        let mut events = self.tracker.on_candles(&snapshot.fast);

        let ctx = MarketContext::from_snapshot(snapshot, &self.config.macro_symbol.0, now);
        let mut outcomes = Vec::with_capacity(self.evaluators.len());
        for evaluator in &self.evaluators {
            let evaluation = evaluator.evaluate(&ctx);
            let mut outcome = ModeOutcome {
                mode: evaluator.mode(),
                ev: evaluation.signal().map(ev::from_signal),
                evaluation,
                opened: false,
            };

            match outcome.evaluation.signal() {
                Some(signal) => match self.tracker.open(signal.clone(), latest.timestamp) {
                    Ok(event) => {
                        outcome.opened = true;
                        events.push(event);
                    }
                    Err(e @ EngineError::SlotOccupied { .. }) => {
                        debug!("{}: signal not tracked: {}", evaluator.name(), e);
                    }
                    Err(e @ EngineError::DuplicateSetup(_)) => {
                        debug!(
                            "{}: signal not tracked: {} ({:?})",
                            evaluator.name(),
                            e,
                            self.tracker.last_setup(evaluator.mode())
                        );
                    }
                    Err(e) => warn!("{}: failed to open trade: {}", evaluator.name(), e),
                },
                None => {
                    if let Some(reason) = outcome.evaluation.wait_reason() {
                        debug!("{}: wait - {}", evaluator.name(), reason);
                    }
                }
            }
            outcomes.push(outcome);
        }

        self.report(now, outcomes, events, next_event, event_light)
    }

    fn report(
        &mut self,
        now: DateTime<Utc>,
        outcomes: Vec<ModeOutcome>,
        events: Vec<TradeEvent>,
        next_event: Option<EventProximity>,
        event_light: EventLight,
    ) -> TickReport {
        for event in &events {
            self.scoreboard.record(event, now);
        }

        let signals = outcomes.iter().filter(|o| o.evaluation.signal().is_some()).count();
        info!(
            "Tick {}: {} signal(s), {} trade event(s), event light {}",
            now.format("%Y-%m-%d %H:%M:%S"),
            signals,
            events.len(),
            event_light
        );

        TickReport {
            at: now,
            outcomes,
            events,
            open_trades: self.tracker.open_trades().cloned().collect(),
            scoreboard: self.scoreboard.snapshot(now),
            next_event,
            event_light,
        }
    }
}
