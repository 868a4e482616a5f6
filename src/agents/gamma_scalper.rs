use std::collections::BTreeMap;

use chrono::Duration;

use crate::data::{OptionLeg, RegimeSignal, TradeIntent};
use crate::enums::{Direction, InstrumentType, OptionType, RegimeType};

use super::{Agent, MarketState};

const IV_PERCENTILE_TRIGGER: f64 = 30.0;
const DELTA_TARGET: f64 = 0.25;
const TARGET_DTE_DAYS: i64 = 30;

/// On a negative dealer-gamma proxy with low IV percentile, proposes a long
/// strangle at 25-delta strikes (spec.md §4.4). Not regime-gated in the
/// usual sense — the trigger is the gamma/IV proxy pair — so this agent
/// declares itself active in every regime and does its own filtering.
#[derive(Debug, Clone)]
pub struct GammaScalperAgent {
    min_confidence: f64,
    iv_percentile_trigger: f64,
    quantity: f64,
    active_regimes: [RegimeType; 4],
}

impl Default for GammaScalperAgent {
    fn default() -> Self {
        Self {
            min_confidence: 0.0,
            iv_percentile_trigger: IV_PERCENTILE_TRIGGER,
            quantity: 1.0,
            active_regimes: [
                RegimeType::Trend,
                RegimeType::MeanReversion,
                RegimeType::Compression,
                RegimeType::Expansion,
            ],
        }
    }
}

impl Agent for GammaScalperAgent {
    fn id(&self) -> &str {
        "gamma_scalper"
    }

    fn active_regimes(&self) -> &[RegimeType] {
        &self.active_regimes
    }

    fn min_confidence(&self) -> f64 {
        self.min_confidence
    }

    fn evaluate(&self, signal: &RegimeSignal, state: &MarketState) -> Vec<TradeIntent> {
        if !self.is_active(signal, state.testing_mode) {
            return Vec::new();
        }
        if state.has_open_package {
            return Vec::new();
        }
        if state.dealer_gamma_proxy >= 0.0 || state.iv_percentile >= self.iv_percentile_trigger {
            return Vec::new();
        }

        let spot = state.bar.close;
        let atr = state.snapshot.atr.max(0.01);
        let offset = atr * (1.0 - DELTA_TARGET) * 3.0;
        let call_strike = ((spot + offset) * 100.0).round() / 100.0;
        let put_strike = ((spot - offset) * 100.0).round() / 100.0;
        let expiry = state.bar.ts + Duration::days(TARGET_DTE_DAYS);

        let mut metadata = BTreeMap::new();
        metadata.insert("put_strike".to_string(), put_strike.to_string());
        metadata.insert("trade_type".to_string(), "strangle".to_string());
        metadata.insert("package_direction".to_string(), "long".to_string());

        vec![TradeIntent {
            symbol: signal.symbol.clone(),
            instrument_type: InstrumentType::Option,
            direction: Direction::Long,
            position_delta: self.quantity,
            confidence: signal.confidence.max(0.5),
            agent_id: self.id().to_string(),
            reason: format!(
                "negative dealer gamma proxy={:.3}, iv_percentile={:.1}: long strangle",
                state.dealer_gamma_proxy, state.iv_percentile
            ),
            option: Some(OptionLeg {
                option_type: OptionType::Call,
                strike: call_strike,
                expiry,
                call_symbol: None,
                put_symbol: None,
                total_credit: None,
                total_debit: None,
                sim_only: false,
            }),
            metadata,
        }]
    }
}
