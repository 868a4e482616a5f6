use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{Bias, RegimeType, TrendDirection, VolatilityLevel};

/// Default confidence floor below which the controller emits no trade
/// (spec.md §4.3). Lowered to `0.05` under `testing_mode`.
pub const CONFIDENCE_FLOOR: f64 = 0.4;
pub const CONFIDENCE_FLOOR_TESTING: f64 = 0.05;

/// Output of the regime classifier for one symbol on one bar.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegimeSignal {
    pub symbol: String,
    pub ts: DateTime<Utc>,
    pub regime: RegimeType,
    pub direction: TrendDirection,
    pub volatility: VolatilityLevel,
    pub bias: Bias,
    /// In `[0, 1]`; margin of the winning regime over the runner-up.
    pub confidence: f64,
    pub features: std::collections::BTreeMap<String, f64>,
}

impl RegimeSignal {
    pub fn meets_floor(&self, testing_mode: bool) -> bool {
        let floor = if testing_mode {
            CONFIDENCE_FLOOR_TESTING
        } else {
            CONFIDENCE_FLOOR
        };
        self.confidence >= floor
    }
}
