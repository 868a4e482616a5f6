use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{Bias, RegimeType, VolatilityLevel};

/// An immutable entry+exit pair for a single-leg position (spec.md §3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoundTripTrade {
    pub symbol: String,
    pub agent_id: String,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub entry_price: f64,
    pub exit_price: f64,
    pub quantity: f64,
    pub regime_at_entry: RegimeType,
    pub vol_bucket_at_entry: VolatilityLevel,
    pub bias_at_entry: Bias,
    pub reason: String,
    pub pnl_abs: f64,
    pub pnl_pct: f64,
}

impl RoundTripTrade {
    pub fn duration(&self) -> chrono::Duration {
        self.exit_time - self.entry_time
    }

    pub fn new(
        symbol: String,
        agent_id: String,
        entry_time: DateTime<Utc>,
        exit_time: DateTime<Utc>,
        entry_price: f64,
        exit_price: f64,
        quantity: f64,
        regime_at_entry: RegimeType,
        vol_bucket_at_entry: VolatilityLevel,
        bias_at_entry: Bias,
        reason: String,
    ) -> Self {
        let pnl_abs = quantity * (exit_price - entry_price);
        let cost_basis = (quantity * entry_price).abs();
        let pnl_pct = if cost_basis > f64::EPSILON {
            pnl_abs / cost_basis * 100.0
        } else {
            0.0
        };
        Self {
            symbol,
            agent_id,
            entry_time,
            exit_time,
            entry_price,
            exit_price,
            quantity,
            regime_at_entry,
            vol_bucket_at_entry,
            bias_at_entry,
            reason,
            pnl_abs,
            pnl_pct,
        }
    }
}
