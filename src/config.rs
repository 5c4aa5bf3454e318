//! Engine Configuration
//!
//! Every threshold the detectors, gates and tracker use lives here. All
//! fields default, so an absent config file yields the stock setup.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

use crate::types::Result;

/// Environment prefix for overrides, e.g. `CONFLUENCE__GATES__RSI_OVERBOUGHT=75`
pub const ENV_PREFIX: &str = "CONFLUENCE";

/// Default config file name, overridable through `CONFIG_PATH`
pub const DEFAULT_CONFIG_FILE: &str = "confluence.toml";

/// Complete engine configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub trend: TrendConfig,
    pub zones: ZoneConfig,
    pub sweep: SweepConfig,
    pub candles: CandlestickConfig,
    pub gates: GateConfig,
    pub breakout: BreakoutConfig,
    pub tracker: TrackerConfig,
    pub macro_symbol: MacroSymbol,
    pub runner: RunnerConfig,
}

impl EngineConfig {
    /// Load from an optional file layered under `CONFLUENCE__*` environment variables
    pub fn load(path: Option<&str>) -> Result<Self> {
        let path = path
            .map(str::to_string)
            .or_else(|| std::env::var("CONFIG_PATH").ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

        let settings = config::Config::builder()
            .add_source(config::File::with_name(&path).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        let loaded: EngineConfig = settings.try_deserialize()?;
        info!("Loaded engine config (file: {})", path);
        Ok(loaded)
    }
}

/// Trend classifier parameters
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct TrendConfig {
    #[serde(default = "default_fast_ema")]
    pub fast_ema: usize,
    #[serde(default = "default_slow_ema")]
    pub slow_ema: usize,
    /// Fewer candles than this classifies as sideways with insufficient data
    #[serde(default = "default_min_candles")]
    pub min_candles: usize,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            fast_ema: default_fast_ema(),
            slow_ema: default_slow_ema(),
            min_candles: default_min_candles(),
        }
    }
}

/// Imbalance zone detector parameters
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct ZoneConfig {
    /// Candles scanned on the fast timeframe
    #[serde(default = "default_zone_window")]
    pub window: usize,
    /// Candles scanned on the higher timeframe for alignment
    #[serde(default = "default_higher_window")]
    pub higher_window: usize,
    #[serde(default = "default_atr_period")]
    pub atr_period: usize,
    /// Stop distance beyond the zone, in ATR
    #[serde(default = "default_stop_atr")]
    pub stop_atr: Decimal,
    /// Maximum distance price may already have run away from the zone, in ATR
    #[serde(default = "default_max_extension_atr")]
    pub max_extension_atr: Decimal,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            window: default_zone_window(),
            higher_window: default_higher_window(),
            atr_period: default_atr_period(),
            stop_atr: default_stop_atr(),
            max_extension_atr: default_max_extension_atr(),
        }
    }
}

/// Liquidity sweep window split
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct SweepConfig {
    #[serde(default = "default_sweep_window")]
    pub window: usize,
    #[serde(default = "default_sweep_reference")]
    pub reference: usize,
    #[serde(default = "default_sweep_recent")]
    pub recent: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            window: default_sweep_window(),
            reference: default_sweep_reference(),
            recent: default_sweep_recent(),
        }
    }
}

/// Candlestick confirmation thresholds
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct CandlestickConfig {
    /// Pin-bar wick must exceed this multiple of the body
    #[serde(default = "default_wick_body_ratio")]
    pub wick_body_ratio: Decimal,
    /// Absolute minimum pin-bar wick, filters noise on tiny candles
    #[serde(default = "default_min_pin_wick")]
    pub min_pin_wick: Decimal,
}

impl Default for CandlestickConfig {
    fn default() -> Self {
        Self {
            wick_body_ratio: default_wick_body_ratio(),
            min_pin_wick: default_min_pin_wick(),
        }
    }
}

/// Hard gates evaluated before any scoring
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct GateConfig {
    /// Body size that qualifies a candle as a volatility shock
    #[serde(default = "default_shock_body")]
    pub shock_body: Decimal,
    /// Opposing wick must stay below this fraction of the body
    #[serde(default = "default_shock_wick_ratio")]
    pub shock_wick_ratio: Decimal,
    #[serde(default = "default_shock_stars")]
    pub shock_stars: u8,
    /// Suppression window around a high-impact event, minutes either side
    #[serde(default = "default_event_window_minutes")]
    pub event_window_minutes: u32,
    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,
    #[serde(default = "default_rsi_overbought")]
    pub rsi_overbought: Decimal,
    #[serde(default = "default_rsi_oversold")]
    pub rsi_oversold: Decimal,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            shock_body: default_shock_body(),
            shock_wick_ratio: default_shock_wick_ratio(),
            shock_stars: default_shock_stars(),
            event_window_minutes: default_event_window_minutes(),
            rsi_period: default_rsi_period(),
            rsi_overbought: default_rsi_overbought(),
            rsi_oversold: default_rsi_oversold(),
        }
    }
}

/// Sniper (sweep breakout) geometry and hard requirements
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct BreakoutConfig {
    /// Limit entry is placed this far back from the trigger close
    #[serde(default = "default_entry_offset")]
    pub entry_offset: Decimal,
    /// Stop sits this far beyond the swept extreme
    #[serde(default = "default_sweep_buffer")]
    pub sweep_buffer: Decimal,
    /// Stop is never further than this from entry
    #[serde(default = "default_max_risk")]
    pub max_risk: Decimal,
    #[serde(default = "default_reward_ratio")]
    pub reward_ratio: Decimal,
    /// Retail crowd must lean against the trade by at least this percent
    #[serde(default = "default_sentiment_threshold")]
    pub sentiment_threshold: Decimal,
}

impl Default for BreakoutConfig {
    fn default() -> Self {
        Self {
            entry_offset: default_entry_offset(),
            sweep_buffer: default_sweep_buffer(),
            max_risk: default_max_risk(),
            reward_ratio: default_reward_ratio(),
            sentiment_threshold: default_sentiment_threshold(),
        }
    }
}

/// Trade lifecycle and scoreboard accounting
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct TrackerConfig {
    /// Stop is ratcheted to entry plus this offset once breakeven arms
    #[serde(default = "default_breakeven_offset")]
    pub breakeven_offset: Decimal,
    /// Scoreboard units per price unit
    #[serde(default = "default_unit_value")]
    pub unit_value: Decimal,
    /// Units credited for a breakeven exit
    #[serde(default = "default_breakeven_credit")]
    pub breakeven_credit: Decimal,
    /// Trading-day boundary offset from UTC, hours
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            breakeven_offset: default_breakeven_offset(),
            unit_value: default_unit_value(),
            breakeven_credit: default_breakeven_credit(),
            utc_offset_hours: default_utc_offset_hours(),
        }
    }
}

/// Macro metric read for the currency-index factor
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(transparent)]
pub struct MacroSymbol(pub String);

impl Default for MacroSymbol {
    fn default() -> Self {
        MacroSymbol("DXY".to_string())
    }
}

/// Tick loop settings for the binary
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RunnerConfig {
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval_secs(),
            snapshot_path: default_snapshot_path(),
        }
    }
}

fn default_fast_ema() -> usize { 12 }
fn default_slow_ema() -> usize { 50 }
fn default_min_candles() -> usize { 50 }
fn default_zone_window() -> usize { 40 }
fn default_higher_window() -> usize { 60 }
fn default_atr_period() -> usize { 14 }
fn default_stop_atr() -> Decimal { dec!(0.5) }
fn default_max_extension_atr() -> Decimal { dec!(2) }
fn default_sweep_window() -> usize { 20 }
fn default_sweep_reference() -> usize { 15 }
fn default_sweep_recent() -> usize { 4 }
fn default_wick_body_ratio() -> Decimal { dec!(2) }
fn default_min_pin_wick() -> Decimal { dec!(1.0) }
fn default_shock_body() -> Decimal { dec!(15.0) }
fn default_shock_wick_ratio() -> Decimal { dec!(0.2) }
fn default_shock_stars() -> u8 { 3 }
fn default_event_window_minutes() -> u32 { 30 }
fn default_rsi_period() -> usize { 14 }
fn default_rsi_overbought() -> Decimal { dec!(70) }
fn default_rsi_oversold() -> Decimal { dec!(30) }
fn default_entry_offset() -> Decimal { dec!(1.0) }
fn default_sweep_buffer() -> Decimal { dec!(0.5) }
fn default_max_risk() -> Decimal { dec!(3.0) }
fn default_reward_ratio() -> Decimal { dec!(2) }
fn default_sentiment_threshold() -> Decimal { dec!(75.0) }
fn default_breakeven_offset() -> Decimal { dec!(1.0) }
fn default_unit_value() -> Decimal { dec!(1.0) }
fn default_breakeven_credit() -> Decimal { dec!(1.0) }
fn default_utc_offset_hours() -> i32 { 7 }
fn default_tick_interval_secs() -> u64 { 60 }
fn default_snapshot_path() -> PathBuf { PathBuf::from("market_snapshot.json") }
