use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-package hedge state (spec.md §3). Owned by the hedge engine;
/// cross-referenced to its `MultiLegPosition` by `package_id` (a relation,
/// not ownership, per spec.md §9).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HedgePosition {
    pub package_id: String,
    pub symbol: String,
    /// Signed shares of the underlying; negative = short.
    pub shares: f64,
    pub weighted_avg_price: f64,
    pub realized_pnl: f64,
    pub unrealized_pnl: f64,
    pub last_hedge_bar_index: u64,
    pub daily_trade_count: u32,
    pub daily_notional: f64,
    /// Bar index on which the options of the associated package were last
    /// observed open; used to detect orphaned hedges (spec.md §4.9).
    pub last_seen_options_open_bar: u64,
}

impl HedgePosition {
    pub fn new(package_id: String, symbol: String, bar_index: u64) -> Self {
        Self {
            package_id,
            symbol,
            shares: 0.0,
            weighted_avg_price: 0.0,
            realized_pnl: 0.0,
            unrealized_pnl: 0.0,
            last_hedge_bar_index: 0,
            daily_trade_count: 0,
            daily_notional: 0.0,
            last_seen_options_open_bar: bar_index,
        }
    }

    pub fn mark(&mut self, mark_price: f64) {
        self.unrealized_pnl = (mark_price - self.weighted_avg_price) * self.shares;
    }

    pub fn is_flat(&self) -> bool {
        self.shares.abs() < f64::EPSILON
    }
}

/// One row of the per-bar hedge timeline (spec.md §4.9), exportable as a
/// human-readable table under `phase1_results/{run_label}/{run_id}/{package_id}_timeline.txt`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HedgeTimelineRow {
    pub bar_index: u64,
    pub ts: DateTime<Utc>,
    pub underlying_price: f64,
    pub net_options_delta: f64,
    pub hedge_shares: f64,
    pub total_delta: f64,
    pub options_pnl: f64,
    pub hedge_pnl: f64,
    pub total_pnl: f64,
    pub note: String,
}
