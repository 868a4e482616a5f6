//! Position bookkeeping shared by the single-leg executor (spec.md §4.7
//! "Position math"): same-side adds weighted-average the entry price,
//! opposite-side adds close or reduce FIFO-style (a single position per
//! symbol collapses FIFO to "close the one position").

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::data::{Position, RoundTripTrade};
use crate::enums::{Bias, RegimeType, VolatilityLevel};

#[derive(Debug, Default)]
pub struct Portfolio {
    positions: HashMap<String, Position>,
    round_trips: Vec<RoundTripTrade>,
}

impl Portfolio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn positions_for(&self, symbol: &str) -> Vec<Position> {
        self.positions.get(symbol).cloned().into_iter().collect()
    }

    pub fn round_trips(&self) -> &[RoundTripTrade] {
        &self.round_trips
    }

    /// Applies a signed fill to the symbol's position: same sign as the
    /// existing position extends it at a weighted-average price; opposite
    /// sign closes or reduces it, emitting a `RoundTripTrade` for the
    /// closed portion.
    #[allow(clippy::too_many_arguments)]
    pub fn apply_fill(
        &mut self,
        symbol: &str,
        signed_qty: f64,
        fill_price: f64,
        fill_time: DateTime<Utc>,
        agent_id: &str,
        entry_regime: RegimeType,
        entry_volatility: VolatilityLevel,
        entry_bias: Bias,
        take_profit_pct: Option<f64>,
        stop_loss_pct: Option<f64>,
    ) {
        match self.positions.get_mut(symbol) {
            None => {
                if signed_qty.abs() > f64::EPSILON {
                    self.positions.insert(
                        symbol.to_string(),
                        Position {
                            symbol: symbol.to_string(),
                            quantity: signed_qty,
                            entry_price: fill_price,
                            entry_time: fill_time,
                            entry_regime,
                            entry_volatility,
                            entry_bias,
                            agent_id: agent_id.to_string(),
                            take_profit_pct,
                            stop_loss_pct,
                        },
                    );
                }
            }
            Some(existing) => {
                let same_side = existing.quantity.signum() == signed_qty.signum();
                if same_side {
                    let new_avg = existing.weighted_average(signed_qty, fill_price);
                    existing.quantity += signed_qty;
                    existing.entry_price = new_avg;
                } else {
                    let closing_qty = signed_qty.abs().min(existing.quantity.abs());
                    let sign = existing.quantity.signum();
                    let pnl_abs = closing_qty * sign * (fill_price - existing.entry_price);
                    let round_trip = RoundTripTrade::new(
                        symbol.to_string(),
                        agent_id.to_string(),
                        existing.entry_time,
                        fill_time,
                        existing.entry_price,
                        fill_price,
                        closing_qty * sign,
                        existing.entry_regime,
                        existing.entry_volatility,
                        existing.entry_bias,
                        "closed".to_string(),
                    );
                    debug_assert!((round_trip.pnl_abs - pnl_abs).abs() < 1e-6);
                    self.round_trips.push(round_trip);

                    let remaining = existing.quantity.abs() - closing_qty;
                    if remaining <= f64::EPSILON {
                        let leftover = signed_qty.abs() - closing_qty;
                        self.positions.remove(symbol);
                        if leftover > f64::EPSILON {
                            self.positions.insert(
                                symbol.to_string(),
                                Position {
                                    symbol: symbol.to_string(),
                                    quantity: leftover * signed_qty.signum(),
                                    entry_price: fill_price,
                                    entry_time: fill_time,
                                    entry_regime,
                                    entry_volatility,
                                    entry_bias,
                                    agent_id: agent_id.to_string(),
                                    take_profit_pct,
                                    stop_loss_pct,
                                },
                            );
                        }
                    } else {
                        existing.quantity = remaining * sign;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn opening_fill_creates_a_position() {
        let mut pf = Portfolio::new();
        pf.apply_fill("SPY", 10.0, 100.0, now(), "trend", RegimeType::Trend, VolatilityLevel::Medium, Bias::Long, None, None);
        assert_eq!(pf.position("SPY").unwrap().quantity, 10.0);
    }

    #[test]
    fn same_side_add_uses_weighted_average() {
        let mut pf = Portfolio::new();
        pf.apply_fill("SPY", 10.0, 100.0, now(), "trend", RegimeType::Trend, VolatilityLevel::Medium, Bias::Long, None, None);
        pf.apply_fill("SPY", 10.0, 110.0, now(), "trend", RegimeType::Trend, VolatilityLevel::Medium, Bias::Long, None, None);
        let p = pf.position("SPY").unwrap();
        assert_eq!(p.quantity, 20.0);
        assert_eq!(p.entry_price, 105.0);
    }

    #[test]
    fn opposite_side_closes_and_emits_round_trip() {
        let mut pf = Portfolio::new();
        let t0 = now();
        pf.apply_fill("SPY", 10.0, 100.0, t0, "trend", RegimeType::Trend, VolatilityLevel::Medium, Bias::Long, None, None);
        pf.apply_fill("SPY", -10.0, 110.0, t0 + Duration::minutes(5), "trend", RegimeType::Trend, VolatilityLevel::Medium, Bias::Long, None, None);
        assert!(pf.position("SPY").is_none());
        assert_eq!(pf.round_trips().len(), 1);
        assert_eq!(pf.round_trips()[0].pnl_abs, 100.0);
    }

    #[test]
    fn partial_close_leaves_remainder_open() {
        let mut pf = Portfolio::new();
        let t0 = now();
        pf.apply_fill("SPY", 10.0, 100.0, t0, "trend", RegimeType::Trend, VolatilityLevel::Medium, Bias::Long, None, None);
        pf.apply_fill("SPY", -4.0, 110.0, t0 + Duration::minutes(5), "trend", RegimeType::Trend, VolatilityLevel::Medium, Bias::Long, None, None);
        let p = pf.position("SPY").unwrap();
        assert_eq!(p.quantity, 6.0);
        assert_eq!(pf.round_trips().len(), 1);
    }
}
