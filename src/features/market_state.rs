//! Dealer-positioning proxies (spec.md §4.9, §4.8): with no live option
//! chain or OI data available, `iv_percentile` and `dealer_gamma_proxy` are
//! deterministic stand-ins derived from the same ATR-based `iv_proxy` the
//! feature engine already computes, in the spirit of `iv_proxy_from_atr`.

use crate::data::{FeatureHistory, FeatureSnapshot};

const GAMMA_LOOKBACK: usize = 10;

/// Percentile rank (0-100) of `current_iv` among the trailing `iv_proxy`
/// values in `history`. Defaults to 50.0 (neutral) with no history.
pub fn iv_percentile(history: &FeatureHistory, current_iv: f64) -> f64 {
    let snaps = history.snapshots();
    if snaps.is_empty() {
        return 50.0;
    }
    let below_or_equal = snaps.iter().filter(|s| s.iv_proxy <= current_iv).count();
    (below_or_equal as f64 / snaps.len() as f64) * 100.0
}

/// Proxy for dealer net gamma exposure: positive when recent ATR is
/// contracting relative to its trailing average (dealers long gamma,
/// pinning price), negative when ATR is expanding (dealers short gamma,
/// amplifying moves). Clamped to [-1.0, 1.0].
pub fn dealer_gamma_proxy(history: &FeatureHistory, snap: &FeatureSnapshot) -> f64 {
    let snaps = history.snapshots();
    if snaps.is_empty() {
        return 0.0;
    }
    let take = snaps.len().min(GAMMA_LOOKBACK);
    let window: Vec<f64> = snaps.iter().rev().take(take).map(|s| s.atr).collect();
    let trailing_avg = window.iter().sum::<f64>() / window.len() as f64;
    if trailing_avg <= f64::EPSILON {
        return 0.0;
    }
    let displacement = snap.atr / trailing_avg;
    (1.0 - displacement).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn snap(iv: f64, atr: f64) -> FeatureSnapshot {
        FeatureSnapshot {
            symbol: "SPY".to_string(),
            ts: Utc::now(),
            ema9: 0.0,
            ema21: 0.0,
            atr,
            adx: 0.0,
            hurst: 0.5,
            regression_slope: 0.0,
            regression_r2: 0.0,
            vwap: 0.0,
            rsi: 50.0,
            fvg_ranges: Vec::new(),
            iv_proxy: iv,
        }
    }

    #[test]
    fn iv_percentile_defaults_neutral_with_no_history() {
        let history = FeatureHistory::new();
        assert_eq!(iv_percentile(&history, 0.5), 50.0);
    }

    #[test]
    fn iv_percentile_ranks_against_trailing_snapshots() {
        let mut history = FeatureHistory::new();
        for iv in [0.1, 0.2, 0.3, 0.4] {
            history.push_snapshot(snap(iv, 1.0));
        }
        assert_eq!(iv_percentile(&history, 0.3), 75.0);
    }

    #[test]
    fn dealer_gamma_proxy_negative_when_atr_expanding() {
        let mut history = FeatureHistory::new();
        for _ in 0..5 {
            history.push_snapshot(snap(0.2, 1.0));
        }
        let current = snap(0.2, 3.0);
        assert!(dealer_gamma_proxy(&history, &current) < 0.0);
    }

    #[test]
    fn dealer_gamma_proxy_positive_when_atr_contracting() {
        let mut history = FeatureHistory::new();
        for _ in 0..5 {
            history.push_snapshot(snap(0.2, 3.0));
        }
        let current = snap(0.2, 1.0);
        assert!(dealer_gamma_proxy(&history, &current) > 0.0);
    }
}
