use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::bar::Bar;

/// Minimum bars of feature history required for a non-testing-mode
/// computation (spec.md §4.3).
pub const WARMUP_RELAXED: usize = 15;
/// Minimum bars of feature history required when `testing_mode = true`.
pub const WARMUP_TESTING: usize = 1;
/// Ring buffer depth kept per symbol (spec.md §3: "N >= 50 for warmup").
pub const HISTORY_DEPTH: usize = 128;

/// A detected fair-value-gap range used by the mean-reversion agent.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FvgRange {
    pub low: f64,
    pub high: f64,
}

impl FvgRange {
    pub fn midpoint(&self) -> f64 {
        (self.low + self.high) / 2.0
    }
}

/// Per-symbol, per-bar feature values (spec.md §3).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureSnapshot {
    pub symbol: String,
    pub ts: DateTime<Utc>,
    pub ema9: f64,
    pub ema21: f64,
    pub atr: f64,
    pub adx: f64,
    pub hurst: f64,
    pub regression_slope: f64,
    pub regression_r2: f64,
    pub vwap: f64,
    pub rsi: f64,
    pub fvg_ranges: Vec<FvgRange>,
    pub iv_proxy: f64,
}

/// Per-symbol ring buffer of bars and computed feature snapshots, keeping
/// the last `HISTORY_DEPTH` entries (spec.md §3 "Ownership").
#[derive(Clone, Debug, Default)]
pub struct FeatureHistory {
    bars: VecDeque<Bar>,
    snapshots: VecDeque<FeatureSnapshot>,
}

impl FeatureHistory {
    pub fn new() -> Self {
        Self {
            bars: VecDeque::with_capacity(HISTORY_DEPTH),
            snapshots: VecDeque::with_capacity(HISTORY_DEPTH),
        }
    }

    pub fn push_bar(&mut self, bar: Bar) {
        if self.bars.len() == HISTORY_DEPTH {
            self.bars.pop_front();
        }
        self.bars.push_back(bar);
    }

    pub fn push_snapshot(&mut self, snapshot: FeatureSnapshot) {
        if self.snapshots.len() == HISTORY_DEPTH {
            self.snapshots.pop_front();
        }
        self.snapshots.push_back(snapshot);
    }

    pub fn bars(&self) -> &VecDeque<Bar> {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn latest_snapshot(&self) -> Option<&FeatureSnapshot> {
        self.snapshots.back()
    }

    pub fn snapshots(&self) -> &VecDeque<FeatureSnapshot> {
        &self.snapshots
    }

    pub fn warmup_met(&self, testing_mode: bool) -> bool {
        let need = if testing_mode {
            WARMUP_TESTING
        } else {
            WARMUP_RELAXED
        };
        self.len() >= need
    }

    pub fn required_warmup(testing_mode: bool) -> usize {
        if testing_mode {
            WARMUP_TESTING
        } else {
            WARMUP_RELAXED
        }
    }
}
