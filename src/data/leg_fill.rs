use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{LegRole, OrderStatus};

/// Contract multiplier applied to every option fill (spec.md §3).
pub const CONTRACT_MULTIPLIER: f64 = 100.0;

/// A single leg's fill record within a two-legged package (spec.md §3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LegFill {
    pub role: LegRole,
    pub option_symbol: String,
    pub strike: f64,
    pub quantity: f64,
    pub fill_price: f64,
    pub fill_time: DateTime<Utc>,
    pub broker_order_id: String,
    pub status: OrderStatus,
}

impl LegFill {
    pub fn total_cost(&self) -> f64 {
        self.quantity * self.fill_price * CONTRACT_MULTIPLIER
    }

    pub fn is_filled(&self) -> bool {
        matches!(self.status, OrderStatus::Filled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_cost_applies_contract_multiplier() {
        let leg = LegFill {
            role: LegRole::Call,
            option_symbol: "SPY260116C00680000".into(),
            strike: 680.0,
            quantity: 5.0,
            fill_price: 2.5,
            fill_time: Utc::now(),
            broker_order_id: "o1".into(),
            status: OrderStatus::Filled,
        };
        assert_eq!(leg.total_cost(), 5.0 * 2.5 * 100.0);
    }
}
