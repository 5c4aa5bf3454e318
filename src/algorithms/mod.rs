//! Evaluation paths - one per tracking mode
//!
//! Each path reads the same `MarketContext` and returns either a `Signal` or
//! an explicit `Wait`. Hard gates shared by the paths live here.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, info};

use crate::config::GateConfig;
use crate::events::{next_high_impact, EventProximity};
use crate::indicators::rsi;
use crate::market::{FundFlow, MarketSnapshot, Sentiment};
use crate::types::{Bias, Candle, Side, Stars, TradeMode};

pub mod breakout;
pub mod confluence;
pub mod signal;

pub use breakout::BreakoutEvaluator;
pub use confluence::ConfluenceEvaluator;
pub use signal::{Evaluation, Signal, SignalLevels, SignalOrigin, WaitReason};

/// Reward multiple applied to an emergency shock setup
const SHOCK_REWARD_RATIO: Decimal = dec!(2);

/// Core evaluation trait - one implementation per mode
pub trait Evaluator: Send + Sync {
    fn name(&self) -> &str;

    /// Tracker slot this evaluator proposes into
    fn mode(&self) -> TradeMode;

    /// Evaluate one tick; never fails
    fn evaluate(&self, ctx: &MarketContext<'_>) -> Evaluation;
}

/// Read-only inputs for one evaluation tick
#[derive(Debug, Clone)]
pub struct MarketContext<'a> {
    /// Fast (entry) timeframe, oldest first
    pub fast: &'a [Candle],
    /// Slower confirming timeframe
    pub slow: &'a [Candle],
    /// Percent change of the configured currency index
    pub macro_change: Option<Decimal>,
    pub sentiment: Option<Sentiment>,
    pub fund_flow: FundFlow,
    pub next_event: Option<EventProximity>,
    pub now: DateTime<Utc>,
}

impl<'a> MarketContext<'a> {
    pub fn from_snapshot(snapshot: &'a MarketSnapshot, macro_symbol: &str, now: DateTime<Utc>) -> Self {
        Self {
            fast: &snapshot.fast,
            slow: &snapshot.slow,
            macro_change: snapshot.macro_change(macro_symbol),
            sentiment: snapshot.sentiment,
            fund_flow: snapshot.fund_flow,
            next_event: next_high_impact(&snapshot.events, now),
            now,
        }
    }

    pub fn latest(&self) -> Option<&Candle> {
        self.fast.last()
    }
}

/// Volatility shock on the latest candle: a large body closing near its extreme.
///
/// Returns an emergency signal in the direction of the move; stop at the far
/// end of the candle, target at twice the risk.
pub fn volatility_shock(
    ctx: &MarketContext<'_>,
    mode: TradeMode,
    gates: &GateConfig,
) -> Option<Signal> {
    let latest = ctx.latest()?;
    let body = latest.body();
    if body <= gates.shock_body {
        return None;
    }

    let (side, opposing_wick, stop) = match latest.polarity()? {
        Bias::Bullish => (Side::Buy, latest.upper_wick(), latest.low),
        Bias::Bearish => (Side::Sell, latest.lower_wick(), latest.high),
    };
    if opposing_wick > body * gates.shock_wick_ratio {
        return None;
    }

    let entry = latest.close;
    let risk = (entry - stop).abs();
    let target = entry + side.sign() * risk * SHOCK_REWARD_RATIO;

    info!(
        "Volatility shock on {} timeframe: body {} ({}), emergency {}",
        mode, body, side.bias(), side
    );

    Some(
        Signal::new(
            mode,
            SignalOrigin::Emergency,
            side,
            entry,
            entry,
            stop,
            target,
            Stars::saturating(gates.shock_stars),
            ctx.now,
        )
        .with_rationale(vec![
            "abnormal directional move detected".to_string(),
            format!("shock body {:.2} with opposing wick {:.2}", body, opposing_wick),
        ]),
    )
}

/// High-impact event inside the blackout window suppresses everything
pub fn event_gate(ctx: &MarketContext<'_>, gates: &GateConfig) -> Option<WaitReason> {
    let event = ctx.next_event.as_ref()?;
    if !event.within_minutes(gates.event_window_minutes) {
        return None;
    }
    debug!("Event gate: '{}' in {:.2}h", event.title, event.hours_until);
    Some(WaitReason::EventWindow {
        title: event.title.clone(),
        hours_until: event.hours_until,
    })
}

/// Overbought longs / oversold shorts are not chased.
///
/// Without enough history for the oscillator the gate stays open.
pub fn momentum_gate(ctx: &MarketContext<'_>, side: Side, gates: &GateConfig) -> Option<WaitReason> {
    let rsi = rsi(ctx.fast, gates.rsi_period)?;
    let exhausted = match side {
        Side::Buy => rsi > gates.rsi_overbought,
        Side::Sell => rsi < gates.rsi_oversold,
    };
    if exhausted {
        debug!("Momentum gate: RSI {:.1} blocks {}", rsi, side);
        Some(WaitReason::MomentumExhausted { direction: side, rsi })
    } else {
        None
    }
}

/// Currency index moving against the metal favours the trade: weakening supports a long
pub fn macro_supports(change: Option<Decimal>, side: Side) -> Option<bool> {
    let change = change.filter(|c| !c.is_zero())?;
    Some(match side {
        Side::Buy => change.is_sign_negative(),
        Side::Sell => change.is_sign_positive(),
    })
}

/// Fund flow agreement; `None` when neutral
pub fn fund_flow_supports(flow: FundFlow, side: Side) -> Option<bool> {
    flow.bias().map(|bias| bias == side.bias())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Impact, ScheduledEvent};
    use chrono::Duration;

    fn candle(open: Decimal, high: Decimal, low: Decimal, close: Decimal) -> Candle {
        Candle::new(Utc::now(), open, high, low, close)
    }

    fn ctx(fast: &[Candle]) -> MarketContext<'_> {
        MarketContext {
            fast,
            slow: &[],
            macro_change: None,
            sentiment: None,
            fund_flow: FundFlow::Neutral,
            next_event: None,
            now: Utc::now(),
        }
    }

    #[test]
    fn test_bullish_shock_emergency_signal() {
        let fast = [candle(dec!(2000), dec!(2021), dec!(1999), dec!(2020))];
        let signal = volatility_shock(&ctx(&fast), TradeMode::Normal, &GateConfig::default())
            .expect("shock");
        assert_eq!(signal.direction, Side::Buy);
        assert_eq!(signal.origin, SignalOrigin::Emergency);
        assert_eq!(signal.stop, dec!(1999));
        assert_eq!(signal.target, dec!(2062));
        assert_eq!(signal.stars.count(), 3);
        assert_eq!(signal.rationale[0], "abnormal directional move detected");
    }

    #[test]
    fn test_shock_with_long_opposing_wick_ignored() {
        // body 20, upper wick 10
        let fast = [candle(dec!(2000), dec!(2030), dec!(1999), dec!(2020))];
        assert!(volatility_shock(&ctx(&fast), TradeMode::Normal, &GateConfig::default()).is_none());
        let small = [candle(dec!(2000), dec!(2010), dec!(1999), dec!(2010))];
        assert!(volatility_shock(&ctx(&small), TradeMode::Normal, &GateConfig::default()).is_none());
    }

    #[test]
    fn test_event_gate_window() {
        let fast = [candle(dec!(1), dec!(2), dec!(0), dec!(1))];
        let mut context = ctx(&fast);
        let gates = GateConfig::default();
        assert!(event_gate(&context, &gates).is_none());

        let now = context.now;
        let events = vec![ScheduledEvent {
            title: "Non-Farm Payrolls".to_string(),
            impact: Impact::High,
            scheduled_at: now + Duration::minutes(20),
        }];
        context.next_event = next_high_impact(&events, now);
        assert!(matches!(
            event_gate(&context, &gates),
            Some(WaitReason::EventWindow { .. })
        ));

        context.next_event = Some(EventProximity {
            title: "CPI".to_string(),
            hours_until: 1.5,
        });
        assert!(event_gate(&context, &gates).is_none());
    }

    #[test]
    fn test_momentum_gate_blocks_overbought_long() {
        let fast: Vec<Candle> = (0..20)
            .map(|i| {
                let close = Decimal::from(2000 + i);
                candle(close - dec!(1), close + dec!(0.5), close - dec!(1.5), close)
            })
            .collect();
        let gates = GateConfig::default();
        assert!(momentum_gate(&ctx(&fast), Side::Buy, &gates).is_some());
        assert!(momentum_gate(&ctx(&fast), Side::Sell, &gates).is_none());
        assert!(momentum_gate(&ctx(&fast[..5]), Side::Buy, &gates).is_none());
    }

    #[test]
    fn test_macro_and_flow_support() {
        assert_eq!(macro_supports(Some(dec!(-0.2)), Side::Buy), Some(true));
        assert_eq!(macro_supports(Some(dec!(0.2)), Side::Buy), Some(false));
        assert_eq!(macro_supports(Some(Decimal::ZERO), Side::Sell), None);
        assert_eq!(macro_supports(None, Side::Sell), None);
        assert_eq!(fund_flow_supports(FundFlow::Signed(dec!(-5)), Side::Sell), Some(true));
        assert_eq!(fund_flow_supports(FundFlow::Neutral, Side::Buy), None);
    }
}
