//! Per-bar auto-exit evaluation for open multi-leg packages (spec.md
//! §4.8): a short straddle (Theta Harvester) and a long strangle (Gamma
//! Scalper) have different take-profit/stop-loss/regime-exit rules.

use crate::data::MultiLegPosition;
use crate::enums::{RegimeType, TradeType};

const SHORT_STRADDLE_TP_PCT: f64 = 50.0;
const SHORT_STRADDLE_SL_PCT: f64 = -200.0;
const SHORT_STRADDLE_IV_DROP_PCT: f64 = 30.0;

const LONG_STRANGLE_TP_PCT: f64 = 150.0;
const LONG_STRANGLE_SL_PCT: f64 = -50.0;
const LONG_STRANGLE_MIN_HOLD_BARS: u32 = 5;
const LONG_STRANGLE_MAX_HOLD_BARS: u32 = 390;

#[derive(Debug, Clone, PartialEq)]
pub enum AutoExitDecision {
    Hold,
    Close { reason: String },
}

/// `combined_pnl` is the options P&L plus any associated hedge's realized
/// and unrealized P&L (spec.md §4.9: "Package combined exit P&L used by
/// auto-exit rules is options P&L plus hedge realized+unrealized").
pub fn evaluate_auto_exit(
    position: &MultiLegPosition,
    combined_pnl: f64,
    current_iv: f64,
    current_gex: f64,
    current_regime: RegimeType,
    bars_held: u32,
) -> AutoExitDecision {
    let pnl_pct = if position.net_premium.abs() > f64::EPSILON {
        combined_pnl / position.net_premium * 100.0
    } else {
        0.0
    };

    match position.trade_type {
        TradeType::Straddle => evaluate_short_straddle(position, pnl_pct, current_iv, current_regime),
        TradeType::Strangle => evaluate_long_strangle(position, pnl_pct, current_gex, bars_held),
    }
}

fn evaluate_short_straddle(position: &MultiLegPosition, pnl_pct: f64, current_iv: f64, current_regime: RegimeType) -> AutoExitDecision {
    if pnl_pct >= SHORT_STRADDLE_TP_PCT {
        return AutoExitDecision::Close { reason: format!("take-profit: {pnl_pct:.1}% of credit") };
    }
    if pnl_pct <= SHORT_STRADDLE_SL_PCT {
        return AutoExitDecision::Close { reason: format!("stop-loss: {pnl_pct:.1}% of credit") };
    }
    if position.entry_iv.abs() > f64::EPSILON {
        let iv_drop_pct = (position.entry_iv - current_iv) / position.entry_iv * 100.0;
        if iv_drop_pct >= SHORT_STRADDLE_IV_DROP_PCT {
            return AutoExitDecision::Close { reason: format!("iv dropped {iv_drop_pct:.1}% from entry") };
        }
    }
    if current_regime != RegimeType::Compression {
        return AutoExitDecision::Close { reason: "regime left compression".to_string() };
    }
    AutoExitDecision::Hold
}

fn evaluate_long_strangle(position: &MultiLegPosition, pnl_pct: f64, current_gex: f64, bars_held: u32) -> AutoExitDecision {
    if pnl_pct >= LONG_STRANGLE_TP_PCT {
        return AutoExitDecision::Close { reason: format!("take-profit: {pnl_pct:.1}% of premium") };
    }
    if pnl_pct <= LONG_STRANGLE_SL_PCT {
        return AutoExitDecision::Close { reason: format!("stop-loss: {pnl_pct:.1}% of premium") };
    }
    if bars_held < LONG_STRANGLE_MIN_HOLD_BARS {
        return AutoExitDecision::Hold;
    }
    if position.entry_gex < 0.0 && current_gex >= 0.0 {
        return AutoExitDecision::Close { reason: "dealer gamma flipped negative to positive".to_string() };
    }
    if bars_held >= LONG_STRANGLE_MAX_HOLD_BARS {
        return AutoExitDecision::Close { reason: format!("max hold of {LONG_STRANGLE_MAX_HOLD_BARS} bars reached") };
    }
    AutoExitDecision::Hold
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::LegFill;
    use crate::enums::{LegRole, OrderStatus, PackageDirection, PackageState};
    use chrono::Utc;

    fn leg(role: LegRole) -> LegFill {
        LegFill {
            role,
            option_symbol: "SPY   260116C00100000".into(),
            strike: 100.0,
            quantity: 1.0,
            fill_price: 2.0,
            fill_time: Utc::now(),
            broker_order_id: "o".into(),
            status: OrderStatus::Filled,
        }
    }

    fn short_straddle(entry_iv: f64) -> MultiLegPosition {
        MultiLegPosition {
            package_id: "pkg".into(),
            symbol: "SPY".into(),
            trade_type: TradeType::Straddle,
            direction: PackageDirection::Short,
            state: PackageState::OpenFull,
            call_fill: Some(leg(LegRole::Call)),
            put_fill: Some(leg(LegRole::Put)),
            net_premium: 400.0,
            entry_iv,
            entry_gex: -0.1,
            entry_regime: RegimeType::Compression,
            entry_time: Utc::now(),
            options_unrealized_pnl: 0.0,
            quantity: 1.0,
        }
    }

    fn long_strangle() -> MultiLegPosition {
        MultiLegPosition {
            package_id: "pkg2".into(),
            symbol: "SPY".into(),
            trade_type: TradeType::Strangle,
            direction: PackageDirection::Long,
            state: PackageState::OpenFull,
            call_fill: Some(leg(LegRole::Call)),
            put_fill: Some(leg(LegRole::Put)),
            net_premium: 400.0,
            entry_iv: 0.2,
            entry_gex: -0.1,
            entry_regime: RegimeType::Trend,
            entry_time: Utc::now(),
            options_unrealized_pnl: 0.0,
            quantity: 1.0,
        }
    }

    #[test]
    fn short_straddle_takes_profit_at_50_pct_of_credit() {
        let pos = short_straddle(0.3);
        let decision = evaluate_auto_exit(&pos, 200.0, 0.3, -0.1, RegimeType::Compression, 10);
        assert!(matches!(decision, AutoExitDecision::Close { .. }));
    }

    #[test]
    fn short_straddle_holds_inside_bands() {
        let pos = short_straddle(0.3);
        let decision = evaluate_auto_exit(&pos, 10.0, 0.3, -0.1, RegimeType::Compression, 10);
        assert_eq!(decision, AutoExitDecision::Hold);
    }

    #[test]
    fn short_straddle_exits_on_regime_leaving_compression() {
        let pos = short_straddle(0.3);
        let decision = evaluate_auto_exit(&pos, 10.0, 0.3, -0.1, RegimeType::Trend, 10);
        assert!(matches!(decision, AutoExitDecision::Close { .. }));
    }

    #[test]
    fn short_straddle_exits_on_iv_collapse() {
        let pos = short_straddle(1.0);
        let decision = evaluate_auto_exit(&pos, 10.0, 0.6, -0.1, RegimeType::Compression, 10);
        assert!(matches!(decision, AutoExitDecision::Close { .. }));
    }

    #[test]
    fn long_strangle_respects_min_hold_before_gex_flip_exit() {
        let pos = long_strangle();
        let decision = evaluate_auto_exit(&pos, 10.0, 0.0, 0.1, RegimeType::Trend, 2);
        assert_eq!(decision, AutoExitDecision::Hold);
    }

    #[test]
    fn long_strangle_exits_on_gex_flip_after_min_hold() {
        let pos = long_strangle();
        let decision = evaluate_auto_exit(&pos, 10.0, 0.0, 0.1, RegimeType::Trend, 6);
        assert!(matches!(decision, AutoExitDecision::Close { .. }));
    }

    #[test]
    fn long_strangle_forces_exit_at_max_hold() {
        let pos = long_strangle();
        let decision = evaluate_auto_exit(&pos, 10.0, 0.0, -0.1, RegimeType::Trend, 390);
        assert!(matches!(decision, AutoExitDecision::Close { .. }));
    }
}
