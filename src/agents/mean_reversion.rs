use std::collections::BTreeMap;

use crate::data::{RegimeSignal, TradeIntent};
use crate::enums::{Direction, InstrumentType, RegimeType};

use super::{Agent, MarketState};

const RSI_OVERSOLD: f64 = 30.0;
const RSI_OVERBOUGHT: f64 = 70.0;
/// Fraction of ATR a close must be within an FVG midpoint to count as "near".
const FVG_PROXIMITY_ATR: f64 = 0.5;

/// Emits in MEAN_REVERSION near fair-value-gap midpoints or at extreme RSI
/// readings (spec.md §4.4).
#[derive(Debug, Clone)]
pub struct MeanReversionAgent {
    min_confidence: f64,
    position_delta: f64,
}

impl Default for MeanReversionAgent {
    fn default() -> Self {
        Self {
            min_confidence: 0.4,
            position_delta: 50.0,
        }
    }
}

impl Agent for MeanReversionAgent {
    fn id(&self) -> &str {
        "mean_reversion_fvg"
    }

    fn active_regimes(&self) -> &[RegimeType] {
        &[RegimeType::MeanReversion]
    }

    fn min_confidence(&self) -> f64 {
        self.min_confidence
    }

    fn evaluate(&self, signal: &RegimeSignal, state: &MarketState) -> Vec<TradeIntent> {
        if !self.is_active(signal, state.testing_mode) {
            return Vec::new();
        }

        let close = state.bar.close;
        let near_fvg = state.snapshot.fvg_ranges.iter().find(|r| {
            (close - r.midpoint()).abs() <= state.snapshot.atr.max(0.01) * FVG_PROXIMITY_ATR
        });

        let direction = if let Some(range) = near_fvg {
            // revert toward the gap: below midpoint -> expect fill upward, above -> downward.
            if close < range.midpoint() { Direction::Long } else { Direction::Short }
        } else if state.snapshot.rsi <= RSI_OVERSOLD {
            Direction::Long
        } else if state.snapshot.rsi >= RSI_OVERBOUGHT {
            Direction::Short
        } else {
            return Vec::new();
        };

        let reason = match near_fvg {
            Some(_) => "mean reversion toward FVG midpoint".to_string(),
            None => format!("mean reversion on extreme RSI={:.1}", state.snapshot.rsi),
        };

        vec![TradeIntent {
            symbol: signal.symbol.clone(),
            instrument_type: InstrumentType::Stock,
            direction,
            position_delta: self.position_delta,
            confidence: signal.confidence,
            agent_id: self.id().to_string(),
            reason,
            option: None,
            metadata: BTreeMap::new(),
        }]
    }
}
