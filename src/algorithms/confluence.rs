//! Zone Confluence Evaluator (normal mode)
//!
//! Gates first (volatility shock, event blackout, momentum exhaustion), then
//! an unfilled imbalance zone in the fast trend's direction. A zone alone is
//! worth 2 stars; each supporting factor adds one, capped at 5:
//! - slow timeframe trend agrees with the fast one
//! - zone overlaps a higher-timeframe zone
//! - currency index moving against the trade direction
//! - fund flow agrees
//! - candlestick confirmation at the zone

use tracing::debug;

use super::{
    event_gate, fund_flow_supports, macro_supports, momentum_gate, volatility_shock, Evaluation,
    Evaluator, MarketContext, Signal, SignalOrigin, WaitReason,
};
use crate::config::{CandlestickConfig, EngineConfig, GateConfig, TrendConfig, ZoneConfig};
use crate::detectors::candlestick::confirm;
use crate::detectors::trend::classify;
use crate::detectors::zones::{find_zones, scan, ZoneKind, ZoneScan};
use crate::types::{PriceLevel, Side, Stars, TradeMode};

/// Stars earned by the zone itself
const BASE_STARS: u8 = 2;

pub struct ConfluenceEvaluator {
    trend: TrendConfig,
    zones: ZoneConfig,
    candles: CandlestickConfig,
    gates: GateConfig,
    name: String,
}

impl ConfluenceEvaluator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            trend: config.trend,
            zones: config.zones,
            candles: config.candles,
            gates: config.gates,
            name: "Zone Confluence".to_string(),
        }
    }
}

impl Evaluator for ConfluenceEvaluator {
    fn name(&self) -> &str {
        &self.name
    }

    fn mode(&self) -> TradeMode {
        TradeMode::Normal
    }

    fn evaluate(&self, ctx: &MarketContext<'_>) -> Evaluation {
        if ctx.fast.is_empty() {
            return Evaluation::wait(WaitReason::NoData);
        }

        if let Some(signal) = volatility_shock(ctx, self.mode(), &self.gates) {
            return signal.into();
        }
        if let Some(reason) = event_gate(ctx, &self.gates) {
            return Evaluation::wait(reason);
        }

        let fast_trend = classify(ctx.fast, &self.trend);
        let Some(side) = fast_trend.trend.side() else {
            return Evaluation::wait(WaitReason::SidewaysTrend);
        };

        if let Some(reason) = momentum_gate(ctx, side, &self.gates) {
            return Evaluation::wait(reason);
        }

        let kind = ZoneKind::for_side(side);
        let higher_zones = find_zones(ctx.slow, self.zones.higher_window, kind);

        let setup = match scan(ctx.fast, fast_trend.trend, &higher_zones, &self.zones) {
            ZoneScan::NotFound => return Evaluation::wait(WaitReason::NoZone),
            ZoneScan::Extended { extension_atr, .. } => {
                return Evaluation::wait(WaitReason::ExtendedFromZone { extension_atr })
            }
            ZoneScan::Candidate(setup) => setup,
        };

        let zone = setup.zone;
        let entry = match side {
            Side::Buy => zone.upper,
            Side::Sell => zone.lower,
        };
        if !side.at_or_beyond(setup.target, entry) || setup.target == entry {
            return Evaluation::wait(WaitReason::NoRoomToTarget);
        }

        let mut stars = BASE_STARS;
        let mut rationale = vec![format!(
            "{} trend, unfilled {:?} zone {} - {}",
            fast_trend.trend,
            zone.kind,
            PriceLevel::new(zone.lower).display,
            PriceLevel::new(zone.upper).display
        )];
        let mut factor = |hit: bool, yes: String, no: String| {
            if hit {
                stars += 1;
                rationale.push(format!("+ {}", yes));
            } else {
                rationale.push(format!("- {}", no));
            }
        };

        let slow_trend = classify(ctx.slow, &self.trend);
        factor(
            slow_trend.trend == fast_trend.trend,
            format!("slow timeframe agrees ({})", slow_trend.trend),
            format!("slow timeframe does not agree ({})", slow_trend.trend),
        );
        factor(
            zone.higher_timeframe_aligned,
            "zone aligned with higher timeframe zone".to_string(),
            "no higher timeframe zone overlap".to_string(),
        );
        let macro_label = ctx
            .macro_change
            .map(|c| format!("{:+.2}%", c))
            .unwrap_or_else(|| "n/a".to_string());
        factor(
            macro_supports(ctx.macro_change, side) == Some(true),
            format!("currency index supports the {} ({})", side, macro_label),
            format!("currency index not supportive ({})", macro_label),
        );
        factor(
            fund_flow_supports(ctx.fund_flow, side) == Some(true),
            "fund flow agrees".to_string(),
            "fund flow neutral or opposed".to_string(),
        );
        let confirmation = confirm(ctx.fast, side.bias(), &self.candles);
        factor(
            confirmation.found(),
            format!("candlestick confirmation: {}", confirmation.label()),
            "no candlestick confirmation".to_string(),
        );

        let stars = Stars::saturating(stars);
        debug!(
            "Confluence {} setup at zone [{}, {}]: {} stars",
            side,
            zone.lower,
            zone.upper,
            stars.count()
        );

        Signal::new(
            self.mode(),
            SignalOrigin::Confluence,
            side,
            zone.lower,
            zone.upper,
            setup.stop,
            setup.target,
            stars,
            ctx.now,
        )
        .with_zone(zone)
        .with_rationale(rationale)
        .into()
    }
}
