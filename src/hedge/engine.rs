//! Delta-hedge engine (spec.md §4.9): per-bar net-delta computation for an
//! open long-strangle package, a banded/frequency-limited hedging decision,
//! weighted-average share accounting, and orphan-hedge flattening.

use crate::data::HedgePosition;

const MIN_ADJ_SHARES: f64 = 5.0;
const MIN_BARS_BETWEEN_HEDGES: u64 = 5;
const MAX_DAILY_TRADES: u32 = 50;
const MAX_DAILY_NOTIONAL: f64 = 100_000.0;
pub const CONTRACT_MULTIPLIER: f64 = 100.0;
pub const ORPHAN_FLATTEN_BARS: u64 = 60;

#[derive(Debug, Clone, PartialEq)]
pub enum HedgeDecision {
    Skipped { reason: String },
    Executed { adj_shares: f64, fill_price: f64 },
}

/// Stand-in delta: since there is no live option chain (spec.md §1
/// Non-goals), moneyness relative to ATR drives a monotone proxy in
/// `[-1, 1]`, the same texture as the agents' other greek proxies.
pub fn proxy_call_delta(spot: f64, strike: f64, atr: f64) -> f64 {
    (0.5 + (spot - strike) / (atr.max(0.01) * 4.0)).clamp(0.0, 1.0)
}

pub fn proxy_put_delta(spot: f64, strike: f64, atr: f64) -> f64 {
    proxy_call_delta(spot, strike, atr) - 1.0
}

/// `net_Δ = (call_Δ + put_Δ) × qty` (spec.md §4.9).
pub fn net_options_delta(call_strike: f64, put_strike: f64, spot: f64, atr: f64, qty: f64) -> f64 {
    let call_delta = proxy_call_delta(spot, call_strike, atr);
    let put_delta = proxy_put_delta(spot, put_strike, atr);
    (call_delta + put_delta) * qty
}

/// Target hedge shares = `-round(net_Δ × 100)`.
pub fn target_hedge_shares(net_delta: f64) -> f64 {
    -(net_delta * CONTRACT_MULTIPLIER).round()
}

/// Decides whether to adjust the hedge this bar and, if so, applies the
/// resulting fill to `position`'s weighted-average accounting.
pub fn evaluate_hedge(
    position: &mut HedgePosition,
    target_shares: f64,
    current_price: f64,
    bar_index: u64,
) -> HedgeDecision {
    let adj = target_shares - position.shares;

    if adj.abs() < MIN_ADJ_SHARES {
        return HedgeDecision::Skipped { reason: "below minimum hedge size".to_string() };
    }
    if position.last_hedge_bar_index != 0 && bar_index.saturating_sub(position.last_hedge_bar_index) < MIN_BARS_BETWEEN_HEDGES {
        return HedgeDecision::Skipped { reason: "inside hedge frequency band".to_string() };
    }
    let notional = adj.abs() * current_price;
    if position.daily_trade_count >= MAX_DAILY_TRADES || position.daily_notional + notional >= MAX_DAILY_NOTIONAL {
        return HedgeDecision::Skipped { reason: "daily hedge rate/notional guardrail".to_string() };
    }

    apply_fill(position, adj, current_price, bar_index, notional);
    HedgeDecision::Executed { adj_shares: adj, fill_price: current_price }
}

/// Force-flattens a residual hedge outside the normal band/frequency checks
/// (spec.md §4.9 "orphan flatten"). Returns `None` if already flat.
pub fn flatten(position: &mut HedgePosition, current_price: f64, bar_index: u64) -> Option<HedgeDecision> {
    if position.is_flat() {
        return None;
    }
    let adj = -position.shares;
    let notional = adj.abs() * current_price;
    apply_fill(position, adj, current_price, bar_index, notional);
    Some(HedgeDecision::Executed { adj_shares: adj, fill_price: current_price })
}

pub fn is_orphaned(position: &HedgePosition, package_closed: bool, bars_since_options_open: u64) -> bool {
    !position.is_flat() && (package_closed || bars_since_options_open > ORPHAN_FLATTEN_BARS)
}

fn apply_fill(position: &mut HedgePosition, adj: f64, fill_price: f64, bar_index: u64, notional: f64) {
    let old_shares = position.shares;
    let new_shares = old_shares + adj;
    let extending = old_shares == 0.0 || old_shares.signum() == adj.signum();

    if extending {
        position.weighted_avg_price = if new_shares.abs() < f64::EPSILON {
            0.0
        } else {
            (old_shares * position.weighted_avg_price + adj * fill_price) / new_shares
        };
    } else {
        let sign = old_shares.signum();
        let reduced_qty = old_shares.abs().min(adj.abs());
        position.realized_pnl += reduced_qty * (fill_price - position.weighted_avg_price) * sign;

        if adj.abs() > old_shares.abs() {
            // flipped through flat: the excess opens a new position at fill_price.
            position.weighted_avg_price = fill_price;
        } else if new_shares.abs() < f64::EPSILON {
            position.weighted_avg_price = 0.0;
        }
        // partial reduction on the same side keeps the existing weighted average.
    }

    position.shares = new_shares;
    position.last_hedge_bar_index = bar_index;
    position.daily_trade_count += 1;
    position.daily_notional += notional;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh(bar_index: u64) -> HedgePosition {
        let mut p = HedgePosition::new("pkg".into(), "SPY".into(), bar_index);
        p.last_hedge_bar_index = 0;
        p
    }

    #[test]
    fn target_shares_rounds_and_negates() {
        assert_eq!(target_hedge_shares(0.30), -30.0);
        assert_eq!(target_hedge_shares(-0.12), 12.0);
    }

    #[test]
    fn small_adjustment_is_skipped() {
        let mut p = fresh(0);
        let decision = evaluate_hedge(&mut p, 3.0, 675.0, 100);
        assert_eq!(decision, HedgeDecision::Skipped { reason: "below minimum hedge size".to_string() });
    }

    #[test]
    fn executes_when_above_minimum_and_outside_frequency_band() {
        let mut p = fresh(0);
        let decision = evaluate_hedge(&mut p, -15.0, 675.0, 100);
        assert!(matches!(decision, HedgeDecision::Executed { adj_shares, .. } if adj_shares == -15.0));
        assert_eq!(p.shares, -15.0);
        assert_eq!(p.weighted_avg_price, 675.0);
    }

    #[test]
    fn second_hedge_inside_frequency_band_is_skipped() {
        let mut p = fresh(0);
        evaluate_hedge(&mut p, -15.0, 675.0, 100);
        let decision = evaluate_hedge(&mut p, -30.0, 677.0, 103);
        assert_eq!(decision, HedgeDecision::Skipped { reason: "inside hedge frequency band".to_string() });
    }

    #[test]
    fn extends_short_side_with_weighted_average() {
        let mut p = fresh(0);
        evaluate_hedge(&mut p, -15.0, 675.0, 100);
        evaluate_hedge(&mut p, -30.0, 677.0, 110);
        assert_eq!(p.shares, -30.0);
        assert!((p.weighted_avg_price - 676.0).abs() < 1e-9);
    }

    #[test]
    fn reducing_realizes_pnl_on_the_closed_amount() {
        let mut p = fresh(0);
        evaluate_hedge(&mut p, -20.0, 680.0, 100);
        evaluate_hedge(&mut p, 0.0, 670.0, 110);
        assert_eq!(p.shares, 0.0);
        assert!((p.realized_pnl - 200.0).abs() < 1e-9);
    }

    #[test]
    fn flatten_zeroes_residual_shares() {
        let mut p = fresh(0);
        evaluate_hedge(&mut p, -15.0, 675.0, 100);
        let decision = flatten(&mut p, 680.0, 200).unwrap();
        assert!(matches!(decision, HedgeDecision::Executed { .. }));
        assert_eq!(p.shares, 0.0);
    }

    #[test]
    fn flatten_on_already_flat_position_is_a_no_op() {
        let mut p = fresh(0);
        assert!(flatten(&mut p, 680.0, 200).is_none());
    }

    #[test]
    fn orphaned_when_package_closed_with_residual_shares() {
        let mut p = fresh(0);
        evaluate_hedge(&mut p, -15.0, 675.0, 100);
        assert!(is_orphaned(&p, true, 0));
        assert!(!is_orphaned(&p, false, 10));
        assert!(is_orphaned(&p, false, 61));
    }
}
