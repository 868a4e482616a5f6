use std::collections::{HashMap, VecDeque};

use crate::data::{Bar, FeatureHistory, FeatureSnapshot, FvgRange};
use crate::error::{DataError, EngineResult};

use super::indicators::{Adx, Atr, Ema, RegressionChannel, Rsi, StreamingIndicator, Vwap, hurst_exponent};

const REGRESSION_WINDOW: usize = 20;
const HURST_WINDOW: usize = 40;
const ATR_PERIOD: usize = 14;
const ADX_PERIOD: usize = 14;
const RSI_PERIOD: usize = 14;

#[derive(Debug)]
struct SymbolIndicators {
    ema9: Ema,
    ema21: Ema,
    atr: Atr,
    adx: Adx,
    rsi: Rsi,
    regression: RegressionChannel,
    vwap: Vwap,
    closes: VecDeque<f64>,
    current_day: Option<chrono::NaiveDate>,
    atr_history: VecDeque<f64>,
}

impl SymbolIndicators {
    fn new() -> Self {
        Self {
            ema9: Ema::new(9),
            ema21: Ema::new(21),
            atr: Atr::new(ATR_PERIOD),
            adx: Adx::new(ADX_PERIOD),
            rsi: Rsi::new(RSI_PERIOD),
            regression: RegressionChannel::new(REGRESSION_WINDOW),
            vwap: Vwap::new(),
            closes: VecDeque::with_capacity(HURST_WINDOW),
            current_day: None,
            atr_history: VecDeque::with_capacity(32),
        }
    }
}

/// Computes `FeatureSnapshot`s from trailing bar history, maintaining
/// incremental indicator state per symbol (spec.md §4.3). Fails with
/// `InsufficientHistory` below warmup (15 bars, or 1 in `testing_mode`).
#[derive(Debug, Default)]
pub struct FeatureEngine {
    symbols: HashMap<String, SymbolIndicators>,
}

impl FeatureEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compute(
        &mut self,
        history: &FeatureHistory,
        bar: &Bar,
        testing_mode: bool,
    ) -> EngineResult<FeatureSnapshot> {
        if !history.warmup_met(testing_mode) {
            return Err(DataError::InsufficientHistory {
                symbol: bar.symbol.clone(),
                have: history.len(),
                need: FeatureHistory::required_warmup(testing_mode),
            }
            .into());
        }

        let state = self
            .symbols
            .entry(bar.symbol.clone())
            .or_insert_with(SymbolIndicators::new);

        let day = bar.ts.date_naive();
        if state.current_day != Some(day) {
            state.vwap.reset();
            state.current_day = Some(day);
        }

        let ema9 = state.ema9.update(bar.close).unwrap_or(bar.close);
        let ema21 = state.ema21.update(bar.close).unwrap_or(bar.close);
        let atr = state.atr.update_hlc(bar.high, bar.low, bar.close).unwrap_or(bar.range());
        let adx = state.adx.update_hlc(bar.high, bar.low, bar.close).unwrap_or(0.0);
        let rsi = state.rsi.update(bar.close).unwrap_or(50.0);
        let (slope, r2) = state.regression.update(bar.close).unwrap_or((0.0, 0.0));
        let typical_price = (bar.high + bar.low + bar.close) / 3.0;
        let vwap = state.vwap.update(typical_price, bar.volume.max(1.0));

        if state.closes.len() == HURST_WINDOW {
            state.closes.pop_front();
        }
        state.closes.push_back(bar.close);
        let hurst = hurst_exponent(state.closes.make_contiguous()).unwrap_or(0.5);

        if state.atr_history.len() == 20 {
            state.atr_history.pop_front();
        }
        state.atr_history.push_back(atr);

        let fvg_ranges = detect_fvg(history, bar);
        let iv_proxy = iv_proxy_from_atr(atr, bar.close, &state.atr_history);

        Ok(FeatureSnapshot {
            symbol: bar.symbol.clone(),
            ts: bar.ts,
            ema9,
            ema21,
            atr,
            adx,
            hurst,
            regression_slope: slope,
            regression_r2: r2,
            vwap,
            rsi,
            fvg_ranges,
            iv_proxy,
        })
    }
}

/// A 3-bar fair-value-gap detector: a gap between bar `i-2`'s high/low and
/// bar `i`'s low/high, with bar `i-1` as the displacement candle.
fn detect_fvg(history: &FeatureHistory, current: &Bar) -> Vec<FvgRange> {
    let bars = history.bars();
    if bars.len() < 2 {
        return Vec::new();
    }
    let prev2 = &bars[bars.len() - 2];
    let prev1 = bars.back().unwrap();

    let mut ranges = Vec::new();
    if current.low > prev2.high && prev1.is_bullish() {
        ranges.push(FvgRange {
            low: prev2.high,
            high: current.low,
        });
    }
    if current.high < prev2.low && !prev1.is_bullish() {
        ranges.push(FvgRange {
            low: current.high,
            high: prev2.low,
        });
    }
    ranges
}

/// Since the engine has no real option chain in scope (spec.md §1
/// Non-goals: "Black-Scholes exactness... a pragmatic approximation
/// suffices"), IV is proxied from normalized ATR relative to its own
/// trailing range, giving a `[0, 1]`-ish signal that rises with realized
/// volatility.
fn iv_proxy_from_atr(atr: f64, close: f64, atr_history: &VecDeque<f64>) -> f64 {
    if atr_history.is_empty() || close.abs() < f64::EPSILON {
        return (atr / close.max(1.0)).clamp(0.0, 1.0);
    }
    let max_atr = atr_history.iter().cloned().fold(f64::MIN, f64::max).max(atr);
    if max_atr.abs() < f64::EPSILON {
        0.0
    } else {
        (atr / max_atr).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn bar(i: i64, close: f64) -> Bar {
        Bar {
            symbol: "SPY".into(),
            timeframe: "1m".into(),
            ts: Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::minutes(i),
            open: close - 0.1,
            high: close + 0.2,
            low: close - 0.2,
            close,
            volume: 1000.0,
            synthetic: false,
        }
    }

    #[test]
    fn fails_below_warmup() {
        let mut engine = FeatureEngine::new();
        let mut history = FeatureHistory::new();
        for i in 0..10 {
            history.push_bar(bar(i, 100.0 + i as f64 * 0.1));
        }
        let last = bar(10, 101.0);
        let err = engine.compute(&history, &last, false).unwrap_err();
        assert!(matches!(
            err,
            crate::error::EngineError::Data(DataError::InsufficientHistory { .. })
        ));
    }

    #[test]
    fn succeeds_with_one_bar_in_testing_mode() {
        let mut engine = FeatureEngine::new();
        let mut history = FeatureHistory::new();
        let b = bar(0, 100.0);
        history.push_bar(b.clone());
        let snap = engine.compute(&history, &b, true).unwrap();
        assert_eq!(snap.symbol, "SPY");
    }

    #[test]
    fn computes_snapshot_after_warmup() {
        let mut engine = FeatureEngine::new();
        let mut history = FeatureHistory::new();
        let mut last = bar(0, 100.0);
        for i in 0..16 {
            last = bar(i, 100.0 + i as f64 * 0.3);
            history.push_bar(last.clone());
        }
        let snap = engine.compute(&history, &last, false).unwrap();
        assert!(snap.ema9 > 0.0);
        assert!(snap.rsi >= 0.0 && snap.rsi <= 100.0);
    }
}
