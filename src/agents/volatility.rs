use std::collections::BTreeMap;

use crate::data::{RegimeSignal, TradeIntent};
use crate::enums::{Bias, Direction, InstrumentType, RegimeType};

use super::{Agent, MarketState};

/// Emits directional stock intents on EXPANSION, sized larger than the
/// trend agent to capture displacement (spec.md §4.4).
#[derive(Debug, Clone)]
pub struct VolatilityAgent {
    min_confidence: f64,
    position_delta: f64,
}

impl Default for VolatilityAgent {
    fn default() -> Self {
        Self {
            min_confidence: 0.4,
            position_delta: 150.0,
        }
    }
}

impl Agent for VolatilityAgent {
    fn id(&self) -> &str {
        "volatility"
    }

    fn active_regimes(&self) -> &[RegimeType] {
        &[RegimeType::Expansion]
    }

    fn min_confidence(&self) -> f64 {
        self.min_confidence
    }

    fn evaluate(&self, signal: &RegimeSignal, state: &MarketState) -> Vec<TradeIntent> {
        if !self.is_active(signal, state.testing_mode) {
            return Vec::new();
        }
        let direction = match signal.bias {
            Bias::Long => Direction::Long,
            Bias::Short => Direction::Short,
            Bias::Neutral => return Vec::new(),
        };

        vec![TradeIntent {
            symbol: signal.symbol.clone(),
            instrument_type: InstrumentType::Stock,
            direction,
            position_delta: self.position_delta,
            confidence: signal.confidence,
            agent_id: self.id().to_string(),
            reason: format!("expansion regime, volatility={}", signal.volatility),
            option: None,
            metadata: BTreeMap::new(),
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Bar, FeatureSnapshot};
    use chrono::Utc;

    #[test]
    fn emits_short_intent_on_down_biased_expansion() {
        let agent = VolatilityAgent::default();
        let sig = RegimeSignal {
            symbol: "SPY".into(),
            ts: Utc::now(),
            regime: RegimeType::Expansion,
            direction: crate::enums::TrendDirection::Down,
            volatility: crate::enums::VolatilityLevel::Extreme,
            bias: Bias::Short,
            confidence: 0.7,
            features: BTreeMap::new(),
        };
        let b = Bar {
            symbol: "SPY".into(),
            timeframe: "1m".into(),
            ts: Utc::now(),
            open: 100.0,
            high: 102.0,
            low: 98.0,
            close: 99.0,
            volume: 1.0,
            synthetic: false,
        };
        let s = FeatureSnapshot {
            symbol: "SPY".into(),
            ts: Utc::now(),
            ema9: 100.0,
            ema21: 100.0,
            atr: 3.0,
            adx: 20.0,
            hurst: 0.5,
            regression_slope: -1.0,
            regression_r2: 0.5,
            vwap: 100.0,
            rsi: 40.0,
            fvg_ranges: Vec::new(),
            iv_proxy: 0.8,
        };
        let state = MarketState {
            bar: &b,
            snapshot: &s,
            positions: &[],
            testing_mode: false,
            iv_percentile: 80.0,
            dealer_gamma_proxy: 0.0,
            has_open_package: false,
        };
        let intents = agent.evaluate(&sig, &state);
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].direction, Direction::Short);
    }
}
