//! Cross-module scenarios and shared candle fixtures

pub(crate) mod fixtures {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::types::Candle;

    pub fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap()
    }

    /// Fifteen-minute bar `i` after the base time
    pub fn bar(i: usize, open: Decimal, high: Decimal, low: Decimal, close: Decimal) -> Candle {
        Candle::new(base_time() + Duration::minutes(15 * i as i64), open, high, low, close)
    }

    pub fn push(candles: &mut Vec<Candle>, open: Decimal, high: Decimal, low: Decimal, close: Decimal) {
        let i = candles.len();
        candles.push(bar(i, open, high, low, close));
    }

    /// Zig-zag uptrend, an impulse leaving demand gap [2010.5, 2014.9], then a
    /// shallow pullback into the gap. RSI stays below 70.
    pub fn uptrend_pullback() -> Vec<Candle> {
        let mut candles = Vec::new();
        let mut price = dec!(2000);
        for i in 0..48 {
            let step = if i % 2 == 0 { dec!(1.0) } else { dec!(-0.6) };
            let close = price + step;
            push(
                &mut candles,
                price,
                price.max(close) + dec!(0.3),
                price.min(close) - dec!(0.3),
                close,
            );
            price = close;
        }
        push(&mut candles, dec!(2009.6), dec!(2015.6), dec!(2009.4), dec!(2015.4));
        push(&mut candles, dec!(2015.4), dec!(2017.4), dec!(2014.9), dec!(2016.9));
        push(&mut candles, dec!(2016.9), dec!(2017.3), dec!(2014.9), dec!(2015.3));
        push(&mut candles, dec!(2015.3), dec!(2015.6), dec!(2013.9), dec!(2014.1));
        candles
    }

    /// Range at 2000, dip to 1993 in the recent block, engulfing reversal to 2004
    pub fn bullish_sweep() -> Vec<Candle> {
        let mut candles: Vec<Candle> = (0..16)
            .map(|i| bar(i, dec!(2000), dec!(2003), dec!(1997), dec!(2000)))
            .collect();
        push(&mut candles, dec!(2000), dec!(2001), dec!(1993), dec!(1994));
        push(&mut candles, dec!(1994), dec!(1999), dec!(1993.5), dec!(1998));
        push(&mut candles, dec!(2001), dec!(2003), dec!(1998), dec!(1999));
        push(&mut candles, dec!(1998.5), dec!(2005), dec!(1998), dec!(2004));
        candles
    }
}

use chrono::{DateTime, Duration, Utc};
use rust_decimal_macros::dec;
use std::collections::HashMap;

use crate::algorithms::{Evaluator, MarketContext, SignalOrigin, WaitReason};
use crate::algorithms::ConfluenceEvaluator;
use crate::config::EngineConfig;
use crate::engine::SignalEngine;
use crate::events::{EventLight, Impact, ScheduledEvent};
use crate::market::{FundFlow, MacroMetric, MarketSnapshot, Sentiment};
use crate::runner::{FileSnapshotSource, SnapshotSource};
use crate::tracker::{TradeResult, TradeState};
use crate::types::{Candle, Side, Stars, TradeMode};
use fixtures::*;

fn snapshot(fast: Vec<Candle>, slow: Vec<Candle>) -> MarketSnapshot {
    let mut macro_metrics = HashMap::new();
    macro_metrics.insert(
        "DXY".to_string(),
        MacroMetric {
            value: dec!(104.1),
            percent_change: dec!(-0.2),
        },
    );
    MarketSnapshot {
        fast,
        slow,
        macro_metrics,
        sentiment: Some(Sentiment {
            short_percent: dec!(80),
            long_percent: dec!(20),
        }),
        fund_flow: FundFlow::Signed(dec!(25)),
        events: Vec::new(),
    }
}

fn high_impact(title: &str, at: DateTime<Utc>) -> ScheduledEvent {
    ScheduledEvent {
        title: title.to_string(),
        impact: Impact::High,
        scheduled_at: at,
    }
}

fn after_last(candles: &[Candle]) -> DateTime<Utc> {
    candles.last().map(|c| c.timestamp).unwrap_or_else(base_time) + Duration::minutes(15)
}

#[test]
fn test_empty_series_waits_for_every_mode() {
    let mut engine = SignalEngine::new(EngineConfig::default());
    let report = engine.tick(&MarketSnapshot::default(), base_time());
    assert_eq!(report.outcomes.len(), TradeMode::ALL.len());
    for outcome in &report.outcomes {
        assert_eq!(outcome.evaluation.wait_reason(), Some(&WaitReason::NoData));
        assert!(outcome.ev.is_none());
    }
    assert!(report.events.is_empty());
    assert_eq!(report.event_light, EventLight::Idle);
}

#[test]
fn test_confluence_stars_follow_factors() {
    let fast = uptrend_pullback();
    let config = EngineConfig::default();
    let evaluator = ConfluenceEvaluator::new(&config);
    let now = after_last(&fast);

    // zone alone
    let bare = MarketContext {
        fast: &fast,
        slow: &[],
        macro_change: None,
        sentiment: None,
        fund_flow: FundFlow::Neutral,
        next_event: None,
        now,
    };
    let signal = evaluator.evaluate(&bare).signal().cloned().expect("zone signal");
    assert_eq!(signal.stars.count(), 2);
    assert_eq!(signal.direction, Side::Buy);
    assert_eq!(signal.origin, SignalOrigin::Confluence);
    assert_eq!(signal.entry_low, dec!(2010.5));
    assert_eq!(signal.entry_high, dec!(2014.9));
    assert_eq!(signal.entry_price(), dec!(2014.9));
    assert_eq!(signal.target, dec!(2017.4));
    assert!(signal.stop < signal.entry_low);
    assert_eq!(signal.rationale.len(), 6);

    // slow timeframe agreement and higher-timeframe overlap
    let aligned = MarketContext {
        slow: &fast,
        ..bare.clone()
    };
    let signal = evaluator.evaluate(&aligned).signal().cloned().unwrap();
    assert_eq!(signal.stars.count(), 4);
    assert!(signal.zone.unwrap().higher_timeframe_aligned);

    // every factor: capped at five
    let full = MarketContext {
        macro_change: Some(dec!(-0.2)),
        fund_flow: FundFlow::Signed(dec!(3)),
        ..aligned.clone()
    };
    assert_eq!(evaluator.evaluate(&full).signal().unwrap().stars, Stars::MAX);

    // a dollar rally does not add a star
    let against = MarketContext {
        macro_change: Some(dec!(0.4)),
        ..aligned
    };
    assert_eq!(evaluator.evaluate(&against).signal().unwrap().stars.count(), 4);
}

#[test]
fn test_imminent_event_suppresses_both_modes() {
    let fast = uptrend_pullback();
    let now = after_last(&fast);
    let mut snap = snapshot(fast.clone(), fast);
    snap.events.push(high_impact("FOMC Statement", now + Duration::minutes(10)));

    let mut engine = SignalEngine::new(EngineConfig::default());
    let report = engine.tick(&snap, now);
    assert!(matches!(
        report.outcome(TradeMode::Normal).unwrap().evaluation.wait_reason(),
        Some(WaitReason::EventWindow { .. })
    ));
    assert_eq!(
        report.outcome(TradeMode::Sniper).unwrap().evaluation.wait_reason(),
        Some(&WaitReason::NewsLight { light: EventLight::Red })
    );
    assert!(report.open_trades.is_empty());
    assert_eq!(report.event_light, EventLight::Red);
}

#[test]
fn test_normal_trade_lifecycle_through_engine() {
    let mut engine = SignalEngine::new(EngineConfig::default());
    let mut fast = uptrend_pullback();

    // tick 1: zone setup opens a pending trade, sniper has no news to trade
    let now = after_last(&fast);
    let report = engine.tick(&snapshot(fast.clone(), fast.clone()), now);
    let normal = report.outcome(TradeMode::Normal).unwrap();
    assert!(normal.opened);
    assert_eq!(normal.evaluation.signal().unwrap().stars, Stars::MAX);
    let ev = normal.ev.expect("ev attached");
    assert_eq!(ev.win_probability, dec!(0.80));
    assert_eq!(ev.reward, dec!(2.5));
    assert_eq!(
        report.outcome(TradeMode::Sniper).unwrap().evaluation.wait_reason(),
        Some(&WaitReason::NewsLight { light: EventLight::Idle })
    );
    assert_eq!(report.events.len(), 1);
    assert_eq!(report.events[0].to, TradeState::Pending);
    assert_eq!(report.scoreboard.pending_count, 1);

    // same snapshot again: nothing new happens
    let report = engine.tick(&snapshot(fast.clone(), fast.clone()), now + Duration::minutes(1));
    assert!(report.events.is_empty());
    assert!(!report.outcome(TradeMode::Normal).unwrap().opened);

    // tick 2: pullback fills the entry
    push(&mut fast, dec!(2014.1), dec!(2015.5), dec!(2013.8), dec!(2015.2));
    let report = engine.tick(&snapshot(fast.clone(), fast.clone()), after_last(&fast));
    assert_eq!(report.events.len(), 1);
    assert_eq!(report.events[0].from, Some(TradeState::Pending));
    assert_eq!(report.events[0].to, TradeState::Active);
    assert_eq!(report.open_trades[0].state, TradeState::Active);

    // tick 3: target reached, the same zone is not proposed again
    push(&mut fast, dec!(2015.2), dec!(2017.6), dec!(2014.95), dec!(2015.4));
    let report = engine.tick(&snapshot(fast.clone(), fast.clone()), after_last(&fast));
    assert_eq!(report.events.len(), 1);
    let resolution = report.events[0].resolution.as_ref().unwrap();
    assert_eq!(resolution.result, TradeResult::Win);
    assert_eq!(resolution.units, dec!(2.5));
    let normal = report.outcome(TradeMode::Normal).unwrap();
    assert!(normal.evaluation.signal().is_some());
    assert!(!normal.opened);
    assert!(engine.tracker().open_trade(TradeMode::Normal).is_none());

    assert_eq!(report.scoreboard.win_count, 1);
    assert_eq!(report.scoreboard.pending_count, 0);
    assert_eq!(report.scoreboard.net_risk_units, dec!(2.5));
}

#[test]
fn test_sniper_setup_through_engine() {
    let fast = bullish_sweep();
    let now = after_last(&fast);
    let mut snap = snapshot(fast, Vec::new());
    snap.events.push(high_impact("Non-Farm Payrolls", now + Duration::minutes(20)));

    let mut engine = SignalEngine::new(EngineConfig::default());
    let report = engine.tick(&snap, now);

    // green window for the breakout, blackout for the zone path
    assert_eq!(report.event_light, EventLight::Green);
    assert!(matches!(
        report.outcome(TradeMode::Normal).unwrap().evaluation.wait_reason(),
        Some(WaitReason::EventWindow { .. })
    ));
    let sniper = report.outcome(TradeMode::Sniper).unwrap();
    assert!(sniper.opened);
    let signal = sniper.evaluation.signal().unwrap();
    assert_eq!(signal.stars, Stars::MAX);
    assert_eq!(signal.levels().entry_low.display, "$2003.00");

    let trade = engine.tracker().open_trade(TradeMode::Sniper).unwrap();
    assert_eq!(trade.entry_price, dec!(2003));
    assert_eq!(trade.stop_price, dec!(2000));
    assert_eq!(trade.target_price, dec!(2009));
    assert_eq!(trade.mid_price, dec!(2006));
    // 5 stars at 2R: 0.8 * 2 - 0.2
    assert_eq!(sniper.ev.unwrap().expected_value, dec!(1.4));
}

#[test]
fn test_shock_candle_opens_emergency_trade() {
    let mut fast = uptrend_pullback();
    push(&mut fast, dec!(2014.1), dec!(2032.5), dec!(2013.9), dec!(2032));
    let mut engine = SignalEngine::new(EngineConfig::default());
    let report = engine.tick(&snapshot(fast.clone(), fast.clone()), after_last(&fast));

    let normal = report.outcome(TradeMode::Normal).unwrap();
    let signal = normal.evaluation.signal().unwrap();
    assert_eq!(signal.origin, SignalOrigin::Emergency);
    assert_eq!(signal.direction, Side::Buy);
    assert_eq!(signal.stop, dec!(2013.9));
    assert_eq!(signal.rationale[0], "abnormal directional move detected");
    assert!(normal.opened);
}

#[test]
fn test_file_snapshot_source_feeds_engine() {
    let fast = uptrend_pullback();
    let rows: Vec<serde_json::Value> = fast
        .iter()
        .map(|c| {
            serde_json::json!({
                "o": c.open.to_string(),
                "h": c.high.to_string(),
                "l": c.low.to_string(),
                "c": c.close.to_string(),
                "t": c.timestamp.timestamp(),
            })
        })
        .collect();
    let mut bad_rows = rows.clone();
    bad_rows.insert(10, serde_json::json!({"o": "--", "h": 1, "l": 0, "c": 1, "t": 1}));
    bad_rows.insert(20, serde_json::json!({"o": 2000, "h": 2001, "l": 1999}));
    bad_rows.insert(30, serde_json::json!({"o": 2000, "h": 2001, "l": 1999, "c": 2000, "t": null}));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snapshot.json");
    std::fs::write(
        &path,
        serde_json::to_vec(&serde_json::json!({
            "fast": bad_rows,
            "slow": rows,
            "macro": {"DXY": {"value": "104.0", "percent_change": "-0.15"}},
            "fund_flow": null,
            "events": [],
            "calendar": []
        }))
        .unwrap(),
    )
    .unwrap();

    let source = FileSnapshotSource::new(&path);
    let snapshot = tokio_test::block_on(source.fetch()).unwrap();
    assert_eq!(snapshot.fast.len(), fast.len());
    assert_eq!(snapshot.fast, fast);
    assert_eq!(snapshot.fund_flow, FundFlow::Neutral);

    let mut engine = SignalEngine::new(EngineConfig::default());
    let report = engine.tick(&snapshot, after_last(&fast));
    let signal = report.outcome(TradeMode::Normal).unwrap().evaluation.signal().unwrap();
    // zone, slow agreement, alignment, dollar weakness
    assert_eq!(signal.stars.count(), 5);
}

#[test]
fn test_missing_snapshot_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let source = FileSnapshotSource::new(dir.path().join("absent.json"));
    let result = tokio_test::block_on(source.fetch());
    assert!(matches!(result, Err(crate::types::EngineError::SnapshotIo(_))));
}
