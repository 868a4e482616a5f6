use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{PackageDirection, PackageState, RegimeType, TradeType};

use super::leg_fill::LegFill;

/// Builds the deterministic package id:
/// `{symbol}_{type}_{dir}_{callK}_{putK}_{expiry}` (spec.md §3).
pub fn package_id(
    symbol: &str,
    trade_type: TradeType,
    direction: PackageDirection,
    call_strike: f64,
    put_strike: f64,
    expiry: NaiveDate,
) -> String {
    format!(
        "{symbol}_{ttype}_{dir}_{callk}_{putk}_{expiry}",
        symbol = symbol,
        ttype = trade_type,
        dir = direction,
        callk = strike_tag(call_strike),
        putk = strike_tag(put_strike),
        expiry = expiry.format("%Y%m%d"),
    )
}

/// Formats a strike as `{whole}{cents:02}`, e.g. `680.0 -> "68000"`,
/// `680.5 -> "68050"`.
fn strike_tag(strike: f64) -> String {
    let cents = (strike * 100.0).round() as i64;
    let (whole, frac) = (cents / 100, cents % 100);
    format!("{whole}{frac:02}")
}

/// A two-legged option position (spec.md §3). Once both legs are filled,
/// further mutation is limited to P&L marks and exit — the package engine
/// enforces this by never re-entering `OpenPending` once `OpenFull` is
/// reached.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MultiLegPosition {
    pub package_id: String,
    pub symbol: String,
    pub trade_type: TradeType,
    pub direction: PackageDirection,
    pub state: PackageState,
    pub call_fill: Option<LegFill>,
    pub put_fill: Option<LegFill>,
    /// Credit (short) or debit (long) received/paid at entry, always >= 0.
    pub net_premium: f64,
    pub entry_iv: f64,
    pub entry_gex: f64,
    pub entry_regime: RegimeType,
    pub entry_time: DateTime<Utc>,
    /// Current mark-to-market PnL of the options legs only, excluding any
    /// associated hedge (see `crate::hedge`).
    pub options_unrealized_pnl: f64,
    pub quantity: f64,
}

impl MultiLegPosition {
    pub fn both_legs_filled(&self) -> bool {
        self.call_fill.as_ref().is_some_and(|f| f.is_filled())
            && self.put_fill.as_ref().is_some_and(|f| f.is_filled())
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, PackageState::OpenFull | PackageState::Exiting)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, PackageState::Closed | PackageState::Broken)
    }
}

/// Closed multi-leg record (spec.md §3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MultiLegTrade {
    pub package_id: String,
    pub symbol: String,
    pub trade_type: TradeType,
    pub direction: PackageDirection,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub call_entry_price: f64,
    pub call_exit_price: f64,
    pub put_entry_price: f64,
    pub put_exit_price: f64,
    pub quantity: f64,
    pub combined_pnl: f64,
    pub combined_pnl_pct: f64,
    pub exit_reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_id_is_deterministic() {
        let d = NaiveDate::from_ymd_opt(2026, 1, 16).unwrap();
        let a = package_id("SPY", TradeType::Strangle, PackageDirection::Long, 680.0, 665.0, d);
        let b = package_id("SPY", TradeType::Strangle, PackageDirection::Long, 680.0, 665.0, d);
        assert_eq!(a, b);
        assert_eq!(a, "SPY_strangle_long_68000_66500_20260116");
    }
}
