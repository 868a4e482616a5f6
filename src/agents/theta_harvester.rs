use std::collections::BTreeMap;

use chrono::Duration;

use crate::data::{OptionLeg, RegimeSignal, TradeIntent};
use crate::enums::{Direction, InstrumentType, OptionType, RegimeType};

use super::{Agent, MarketState};

const IV_PERCENTILE_TRIGGER: f64 = 70.0;
const TARGET_DTE_DAYS: i64 = 14;

/// On COMPRESSION with high IV percentile, proposes a short ATM straddle
/// (spec.md §4.4). The put leg's strike and the package shape travel in
/// `TradeIntent::metadata` since `OptionLeg` only carries one strike — the
/// package engine reads them back out when assembling the `MultiLegPosition`.
#[derive(Debug, Clone)]
pub struct ThetaHarvesterAgent {
    min_confidence: f64,
    iv_percentile_trigger: f64,
    quantity: f64,
}

impl Default for ThetaHarvesterAgent {
    fn default() -> Self {
        Self {
            min_confidence: 0.4,
            iv_percentile_trigger: IV_PERCENTILE_TRIGGER,
            quantity: 1.0,
        }
    }
}

impl Agent for ThetaHarvesterAgent {
    fn id(&self) -> &str {
        "theta_harvester"
    }

    fn active_regimes(&self) -> &[RegimeType] {
        &[RegimeType::Compression]
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
        if state.iv_percentile <= self.iv_percentile_trigger {
            return Vec::new();
        }

        let atm = (state.bar.close * 100.0).round() / 100.0;
        let expiry = state.bar.ts + Duration::days(TARGET_DTE_DAYS);

        let mut metadata = BTreeMap::new();
        metadata.insert("put_strike".to_string(), atm.to_string());
        metadata.insert("trade_type".to_string(), "straddle".to_string());
        metadata.insert("package_direction".to_string(), "short".to_string());

        vec![TradeIntent {
            symbol: signal.symbol.clone(),
            instrument_type: InstrumentType::Option,
            direction: Direction::Short,
            position_delta: self.quantity,
            confidence: signal.confidence,
            agent_id: self.id().to_string(),
            reason: format!("compression + iv_percentile={:.1}: short ATM straddle", state.iv_percentile),
            option: Some(OptionLeg {
                option_type: OptionType::Call,
                strike: atm,
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
