use std::collections::BTreeMap;

use crate::data::{RegimeSignal, TradeIntent};
use crate::enums::{Bias, Direction, InstrumentType, RegimeType, TrendDirection};

use super::{Agent, MarketState};

/// Emits directional stock intents on TREND with an aligned bias
/// (spec.md §4.4).
#[derive(Debug, Clone)]
pub struct TrendAgent {
    min_confidence: f64,
    position_delta: f64,
}

impl Default for TrendAgent {
    fn default() -> Self {
        Self {
            min_confidence: 0.4,
            position_delta: 100.0,
        }
    }
}

impl Agent for TrendAgent {
    fn id(&self) -> &str {
        "trend"
    }

    fn active_regimes(&self) -> &[RegimeType] {
        &[RegimeType::Trend]
    }

    fn min_confidence(&self) -> f64 {
        self.min_confidence
    }

    fn evaluate(&self, signal: &RegimeSignal, state: &MarketState) -> Vec<TradeIntent> {
        if !self.is_active(signal, state.testing_mode) {
            return Vec::new();
        }
        if signal.direction == TrendDirection::Sideways || signal.bias == Bias::Neutral {
            return Vec::new();
        }

        let direction = match signal.bias {
            Bias::Long => Direction::Long,
            Bias::Short => Direction::Short,
            Bias::Neutral => return Vec::new(),
        };

        let already_aligned = state
            .positions
            .iter()
            .any(|p| (p.is_long() && direction == Direction::Long) || (!p.is_long() && direction == Direction::Short));
        if already_aligned {
            return Vec::new();
        }

        vec![TradeIntent {
            symbol: signal.symbol.clone(),
            instrument_type: InstrumentType::Stock,
            direction,
            position_delta: self.position_delta,
            confidence: signal.confidence,
            agent_id: self.id().to_string(),
            reason: format!("trend regime, direction={}, confidence={:.2}", signal.direction, signal.confidence),
            option: None,
            metadata: BTreeMap::new(),
        }]
    }
}
