use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of a bar: `(symbol, timeframe, ts)`. Two bars with the same key
/// are considered the same observation regardless of OHLCV payload.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BarKey {
    pub symbol: String,
    pub timeframe: String,
    pub ts: DateTime<Utc>,
}

/// A single fixed-interval OHLCV observation. Timestamp is the bar *close*
/// time, always UTC. Bars are immutable once constructed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub timeframe: String,
    pub ts: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    /// Set by the data feed when this bar was not observed but synthesized
    /// under `strict_data_mode = false` (spec.md §4.2).
    pub synthetic: bool,
}

impl Bar {
    pub fn key(&self) -> BarKey {
        BarKey {
            symbol: self.symbol.clone(),
            timeframe: self.timeframe.clone(),
            ts: self.ts,
        }
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn is_bullish(&self) -> bool {
        self.close >= self.open
    }
}
