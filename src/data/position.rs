use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{Bias, RegimeType, VolatilityLevel};

/// A single-instrument open position (spec.md §3). Quantity is signed;
/// `quantity * sign` of the originating direction is always >= 0 within one
/// side — averaging on a same-side add uses a weighted mean price, and an
/// opposite-side add closes or reduces (enforced by the executor, see
/// `crate::execution::portfolio`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: f64,
    pub entry_price: f64,
    pub entry_time: DateTime<Utc>,
    pub entry_regime: RegimeType,
    pub entry_volatility: VolatilityLevel,
    pub entry_bias: Bias,
    pub agent_id: String,
    pub take_profit_pct: Option<f64>,
    pub stop_loss_pct: Option<f64>,
}

impl Position {
    pub fn is_long(&self) -> bool {
        self.quantity > 0.0
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.quantity * (price - self.entry_price)
    }

    /// Weighted-average price after adding `qty` more units at `price` on
    /// the same side.
    pub fn weighted_average(&self, qty: f64, price: f64) -> f64 {
        let total_qty = self.quantity + qty;
        if total_qty.abs() < f64::EPSILON {
            return self.entry_price;
        }
        (self.quantity * self.entry_price + qty * price) / total_qty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(qty: f64, entry: f64) -> Position {
        Position {
            symbol: "SPY".into(),
            quantity: qty,
            entry_price: entry,
            entry_time: Utc::now(),
            entry_regime: RegimeType::Trend,
            entry_volatility: VolatilityLevel::Medium,
            entry_bias: Bias::Long,
            agent_id: "trend".into(),
            take_profit_pct: None,
            stop_loss_pct: None,
        }
    }

    #[test]
    fn weighted_average_blends_same_side_add() {
        let p = pos(10.0, 100.0);
        // add 10 more shares at 110 -> avg should be 105
        assert_eq!(p.weighted_average(10.0, 110.0), 105.0);
    }

    #[test]
    fn unrealized_pnl_scales_with_quantity_and_move() {
        let p = pos(10.0, 100.0);
        assert_eq!(p.unrealized_pnl(105.0), 50.0);
    }
}
