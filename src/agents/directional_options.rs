use std::collections::BTreeMap;

use chrono::Duration;

use crate::data::{OptionLeg, RegimeSignal, TradeIntent};
use crate::enums::{Bias, Direction, InstrumentType, OptionType, RegimeType};

use super::{Agent, MarketState};

const MAX_SPREAD_PCT: f64 = 6.0;
const MIN_OPEN_INTEREST: f64 = 100.0;
const MIN_VOLUME: f64 = 10.0;
const IV_PERCENTILE_MIN: f64 = 20.0;
const IV_PERCENTILE_MAX: f64 = 85.0;
const MIN_ABS_DELTA: f64 = 0.3;
const MAX_GAMMA: f64 = 0.08;
const TARGET_DTE_DAYS: i64 = 21;

/// On TREND/EXPANSION with a strong bias, proposes a single-leg directional
/// option — call above spot in a bullish move, put below spot in a bearish
/// one — subject to the liquidity and Greeks filters in spec.md §4.4. There
/// is no live option chain in scope (spec.md §1 Non-goals), so strike,
/// spread, open interest, volume, and the Greeks are all derived
/// deterministically from the bar and feature snapshot.
#[derive(Debug, Clone)]
pub struct DirectionalOptionsAgent {
    min_confidence: f64,
    strong_bias_confidence: f64,
    delta_target: f64,
    quantity: f64,
}

impl Default for DirectionalOptionsAgent {
    fn default() -> Self {
        Self {
            min_confidence: 0.4,
            strong_bias_confidence: 0.6,
            delta_target: 0.4,
            quantity: 1.0,
        }
    }
}

impl DirectionalOptionsAgent {
    fn synth_strike(&self, spot: f64, atr: f64, option_type: OptionType) -> f64 {
        let offset = atr * (1.0 - self.delta_target) * 3.0;
        let raw = match option_type {
            OptionType::Call => spot + offset,
            OptionType::Put => spot - offset,
        };
        (raw * 100.0).round() / 100.0
    }

    fn synth_spread_pct(&self, iv_proxy: f64) -> f64 {
        (iv_proxy * 10.0).clamp(0.5, 12.0)
    }

    fn synth_liquidity(&self, bar_volume: f64) -> (f64, f64) {
        ((bar_volume * 50.0).max(1.0), (bar_volume * 5.0).max(1.0))
    }

    fn synth_gamma(&self, atr: f64) -> f64 {
        1.0 / (atr.max(0.01) + 1.0) * 0.05
    }
}

impl Agent for DirectionalOptionsAgent {
    fn id(&self) -> &str {
        "directional_options"
    }

    fn active_regimes(&self) -> &[RegimeType] {
        &[RegimeType::Trend, RegimeType::Expansion]
    }

    fn min_confidence(&self) -> f64 {
        self.min_confidence
    }

    fn evaluate(&self, signal: &RegimeSignal, state: &MarketState) -> Vec<TradeIntent> {
        if !self.is_active(signal, state.testing_mode) {
            return Vec::new();
        }
        let strong_floor = if state.testing_mode { 0.05 } else { self.strong_bias_confidence };
        if signal.confidence < strong_floor || signal.bias == Bias::Neutral {
            return Vec::new();
        }

        let (option_type, direction) = match signal.bias {
            Bias::Long => (OptionType::Call, Direction::Long),
            Bias::Short => (OptionType::Put, Direction::Long),
            Bias::Neutral => return Vec::new(),
        };

        let spread_pct = self.synth_spread_pct(state.snapshot.iv_proxy);
        let (oi, volume) = self.synth_liquidity(state.bar.volume);
        let gamma = self.synth_gamma(state.snapshot.atr);

        if spread_pct > MAX_SPREAD_PCT
            || oi < MIN_OPEN_INTEREST
            || volume < MIN_VOLUME
            || state.iv_percentile < IV_PERCENTILE_MIN
            || state.iv_percentile > IV_PERCENTILE_MAX
            || self.delta_target.abs() < MIN_ABS_DELTA
            || gamma > MAX_GAMMA
        {
            return Vec::new();
        }

        let strike = self.synth_strike(state.bar.close, state.snapshot.atr, option_type);
        let expiry = state.bar.ts + Duration::days(TARGET_DTE_DAYS);

        vec![TradeIntent {
            symbol: signal.symbol.clone(),
            instrument_type: InstrumentType::Option,
            direction,
            position_delta: self.quantity,
            confidence: signal.confidence,
            agent_id: self.id().to_string(),
            reason: format!("directional {:?} at {:.2} delta-target {:.2}", option_type, strike, self.delta_target),
            option: Some(OptionLeg {
                option_type,
                strike,
                expiry,
                call_symbol: None,
                put_symbol: None,
                total_credit: None,
                total_debit: None,
                sim_only: false,
            }),
            metadata: BTreeMap::new(),
        }]
    }
}
