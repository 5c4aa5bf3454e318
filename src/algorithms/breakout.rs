//! Sweep Breakout Evaluator (sniper mode)
//!
//! Selective path, traded only in the green news window (a high-impact event
//! 15-30 minutes out). Requires a liquidity sweep plus candlestick
//! confirmation in the sweep's direction. Macro, fund flow and retail sentiment are hard
//! requirements instead of score increments. Geometry is fixed:
//! - entry a fixed offset back from the trigger close
//! - stop beyond the swept extreme, capped at a maximum risk
//! - target at `reward_ratio` times the risk

use rust_decimal::Decimal;
use tracing::debug;

use super::{
    fund_flow_supports, macro_supports, momentum_gate, Evaluation, Evaluator,
    MarketContext, Signal, SignalOrigin, WaitReason,
};
use crate::config::{BreakoutConfig, CandlestickConfig, EngineConfig, GateConfig, SweepConfig};
use crate::detectors::candlestick::confirm;
use crate::detectors::sweep::{detect, SweepEvent};
use crate::events::EventLight;
use crate::types::{Side, Stars, TradeMode};

pub struct BreakoutEvaluator {
    sweep: SweepConfig,
    candles: CandlestickConfig,
    gates: GateConfig,
    params: BreakoutConfig,
    name: String,
}

impl BreakoutEvaluator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            sweep: config.sweep,
            candles: config.candles,
            gates: config.gates,
            params: config.breakout,
            name: "Sweep Breakout".to_string(),
        }
    }

    /// Entry, stop and target for a confirmed sweep; `None` when risk is not positive
    fn geometry(&self, sweep: &SweepEvent) -> Option<(Decimal, Decimal, Decimal)> {
        let side = sweep.direction.side();
        let entry = sweep.trigger_close - side.sign() * self.params.entry_offset;
        let stop = match side {
            Side::Buy => (sweep.swept_extreme - self.params.sweep_buffer)
                .max(entry - self.params.max_risk),
            Side::Sell => (sweep.swept_extreme + self.params.sweep_buffer)
                .min(entry + self.params.max_risk),
        };
        let risk = (entry - stop) * side.sign();
        if risk <= Decimal::ZERO {
            return None;
        }
        let target = entry + side.sign() * risk * self.params.reward_ratio;
        Some((entry, stop, target))
    }
}

impl Evaluator for BreakoutEvaluator {
    fn name(&self) -> &str {
        &self.name
    }

    fn mode(&self) -> TradeMode {
        TradeMode::Sniper
    }

    fn evaluate(&self, ctx: &MarketContext<'_>) -> Evaluation {
        if ctx.fast.is_empty() {
            return Evaluation::wait(WaitReason::NoData);
        }
        let light = EventLight::from_proximity(ctx.next_event.as_ref());
        if light != EventLight::Green {
            return Evaluation::wait(WaitReason::NewsLight { light });
        }

        let Some(sweep) = detect(ctx.fast, &self.sweep) else {
            return Evaluation::wait(WaitReason::NoSweep);
        };
        let side = sweep.direction.side();

        let confirmation = confirm(ctx.fast, sweep.direction, &self.candles);
        if !confirmation.found() {
            return Evaluation::wait(WaitReason::NoConfirmation);
        }

        if let Some(reason) = momentum_gate(ctx, side, &self.gates) {
            return Evaluation::wait(reason);
        }

        if macro_supports(ctx.macro_change, side) == Some(false) {
            return Evaluation::wait(WaitReason::MacroConflict {
                change: ctx.macro_change.unwrap_or_default(),
            });
        }
        if fund_flow_supports(ctx.fund_flow, side) == Some(false) {
            return Evaluation::wait(WaitReason::FundFlowConflict);
        }

        // The crowd must be leaning the other way
        let sentiment = ctx.sentiment.unwrap_or_default();
        let crowd_against = match side {
            Side::Buy => sentiment.short_percent,
            Side::Sell => sentiment.long_percent,
        };
        if crowd_against < self.params.sentiment_threshold {
            return Evaluation::wait(WaitReason::SentimentNotStretched {
                percent: crowd_against,
            });
        }

        let Some((entry, stop, target)) = self.geometry(&sweep) else {
            return Evaluation::wait(WaitReason::InvalidGeometry);
        };

        debug!(
            "Breakout {} after {} sweep of {}: entry {} stop {} target {}",
            side, sweep.direction, sweep.swept_extreme, entry, stop, target
        );

        let rationale = vec![
            format!(
                "{} liquidity sweep of {} reversed by close {}",
                sweep.direction, sweep.swept_extreme, sweep.trigger_close
            ),
            format!("candlestick confirmation: {}", confirmation.label()),
            format!("retail crowd {:.1}% positioned against the move", crowd_against),
            "macro and fund flow not opposing".to_string(),
        ];

        Signal::new(
            self.mode(),
            SignalOrigin::Breakout,
            side,
            entry,
            entry,
            stop,
            target,
            Stars::MAX,
            ctx.now,
        )
        .with_sweep_reference(sweep.swept_extreme)
        .with_rationale(rationale)
        .into()
    }
}
