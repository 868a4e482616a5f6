//! Regime classification (spec.md §4.3): scores all four regimes from the
//! current feature snapshot plus recent history, picks the winner, and
//! reports confidence as the margin over the runner-up.

use std::collections::BTreeMap;

use crate::data::{FeatureHistory, FeatureSnapshot, RegimeSignal};
use crate::enums::{Bias, RegimeType, TrendDirection, VolatilityLevel};

const ADX_TREND_THRESHOLD: f64 = 25.0;
const R2_TREND_THRESHOLD: f64 = 0.6;
const HURST_MEAN_REVERSION_THRESHOLD: f64 = 0.45;
const IV_COMPRESSION_THRESHOLD: f64 = 0.35;
const DISPLACEMENT_THRESHOLD: f64 = 1.5;
const ATR_TREND_LOOKBACK: usize = 10;

/// Trailing-window average ATR, excluding the current snapshot, used to
/// tell "ATR expanding" from "ATR contracting".
fn trailing_avg_atr(history: &FeatureHistory) -> Option<f64> {
    let snaps = history.snapshots();
    if snaps.is_empty() {
        return None;
    }
    let take = snaps.len().min(ATR_TREND_LOOKBACK);
    let window: Vec<f64> = snaps.iter().rev().take(take).map(|s| s.atr).collect();
    Some(window.iter().sum::<f64>() / window.len() as f64)
}

fn trend_score(snap: &FeatureSnapshot) -> f64 {
    let adx_ok = snap.adx >= ADX_TREND_THRESHOLD;
    let r2_ok = snap.regression_r2 >= R2_TREND_THRESHOLD;
    let monotone = snap.regression_slope.abs() > f64::EPSILON;
    if adx_ok && r2_ok && monotone {
        let adx_component = ((snap.adx - ADX_TREND_THRESHOLD) / (100.0 - ADX_TREND_THRESHOLD)).clamp(0.0, 1.0);
        (0.5 * snap.regression_r2 + 0.5 * adx_component).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn mean_reversion_score(snap: &FeatureSnapshot, avg_atr: Option<f64>) -> f64 {
    let contracting = avg_atr.map(|avg| snap.atr <= avg).unwrap_or(true);
    if snap.hurst < HURST_MEAN_REVERSION_THRESHOLD && contracting {
        ((HURST_MEAN_REVERSION_THRESHOLD - snap.hurst) / HURST_MEAN_REVERSION_THRESHOLD).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn compression_score(snap: &FeatureSnapshot, avg_atr: Option<f64>) -> f64 {
    let range_contracting = avg_atr.map(|avg| snap.atr < avg).unwrap_or(false);
    if snap.iv_proxy < IV_COMPRESSION_THRESHOLD && range_contracting {
        ((IV_COMPRESSION_THRESHOLD - snap.iv_proxy) / IV_COMPRESSION_THRESHOLD).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn expansion_score(snap: &FeatureSnapshot, avg_atr: Option<f64>) -> f64 {
    let expanding = avg_atr.map(|avg| avg > f64::EPSILON && snap.atr > avg).unwrap_or(false);
    let displacement = avg_atr
        .filter(|avg| avg.abs() > f64::EPSILON)
        .map(|avg| snap.atr / avg)
        .unwrap_or(0.0);
    if expanding && displacement >= DISPLACEMENT_THRESHOLD {
        ((displacement - DISPLACEMENT_THRESHOLD) / DISPLACEMENT_THRESHOLD).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn direction_of(snap: &FeatureSnapshot) -> TrendDirection {
    if snap.regression_slope > f64::EPSILON {
        TrendDirection::Up
    } else if snap.regression_slope < -f64::EPSILON {
        TrendDirection::Down
    } else {
        TrendDirection::Sideways
    }
}

fn volatility_of(snap: &FeatureSnapshot, avg_atr: Option<f64>) -> VolatilityLevel {
    let ratio = avg_atr
        .filter(|avg| avg.abs() > f64::EPSILON)
        .map(|avg| snap.atr / avg)
        .unwrap_or(1.0);
    if ratio >= 2.0 {
        VolatilityLevel::Extreme
    } else if ratio >= 1.3 {
        VolatilityLevel::High
    } else if ratio >= 0.8 {
        VolatilityLevel::Medium
    } else {
        VolatilityLevel::Low
    }
}

fn bias_of(regime: RegimeType, direction: TrendDirection) -> Bias {
    match (regime, direction) {
        (RegimeType::Trend, TrendDirection::Up) => Bias::Long,
        (RegimeType::Trend, TrendDirection::Down) => Bias::Short,
        (RegimeType::Expansion, TrendDirection::Up) => Bias::Long,
        (RegimeType::Expansion, TrendDirection::Down) => Bias::Short,
        _ => Bias::Neutral,
    }
}

/// Classifies the current snapshot into a `RegimeSignal`, using `history`
/// for the trailing ATR baseline that distinguishes contraction from
/// expansion (spec.md §4.3).
pub fn classify(history: &FeatureHistory, snap: &FeatureSnapshot) -> RegimeSignal {
    let avg_atr = trailing_avg_atr(history);

    let scores = [
        (RegimeType::Trend, trend_score(snap)),
        (RegimeType::MeanReversion, mean_reversion_score(snap, avg_atr)),
        (RegimeType::Compression, compression_score(snap, avg_atr)),
        (RegimeType::Expansion, expansion_score(snap, avg_atr)),
    ];

    let mut ranked = scores.to_vec();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.0.priority().cmp(&a.0.priority()))
    });

    let (winner, winner_score) = ranked[0];
    let runner_up_score = ranked.get(1).map(|(_, s)| *s).unwrap_or(0.0);
    let confidence = (winner_score - runner_up_score).clamp(0.0, 1.0);

    let direction = direction_of(snap);
    let volatility = volatility_of(snap, avg_atr);
    let bias = bias_of(winner, direction);

    let mut features = BTreeMap::new();
    features.insert("adx".to_string(), snap.adx);
    features.insert("hurst".to_string(), snap.hurst);
    features.insert("regression_r2".to_string(), snap.regression_r2);
    features.insert("regression_slope".to_string(), snap.regression_slope);
    features.insert("iv_proxy".to_string(), snap.iv_proxy);
    features.insert("atr".to_string(), snap.atr);

    RegimeSignal {
        symbol: snap.symbol.clone(),
        ts: snap.ts,
        regime: winner,
        direction,
        volatility,
        bias,
        confidence,
        features,
    }
}
