//! Incremental technical indicators, following the `StreamingIndicator`
//! pattern: each indicator consumes one scalar at a time and reports
//! `None` until it has enough history to be meaningful.

use std::collections::VecDeque;

/// An indicator updated one observation at a time.
pub trait StreamingIndicator: std::fmt::Debug {
    fn update(&mut self, value: f64) -> Option<f64>;
    fn reset(&mut self);
}

/// Exponential moving average with period `n` (standard `alpha = 2/(n+1)`).
#[derive(Debug, Clone)]
pub struct Ema {
    alpha: f64,
    period: usize,
    seed_buffer: Vec<f64>,
    value: Option<f64>,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        Self {
            alpha: 2.0 / (period as f64 + 1.0),
            period,
            seed_buffer: Vec::with_capacity(period),
            value: None,
        }
    }
}

impl StreamingIndicator for Ema {
    fn update(&mut self, value: f64) -> Option<f64> {
        match self.value {
            Some(prev) => {
                let next = self.alpha * value + (1.0 - self.alpha) * prev;
                self.value = Some(next);
                Some(next)
            }
            None => {
                self.seed_buffer.push(value);
                if self.seed_buffer.len() >= self.period {
                    let seed = self.seed_buffer.iter().sum::<f64>() / self.seed_buffer.len() as f64;
                    self.value = Some(seed);
                    Some(seed)
                } else {
                    None
                }
            }
        }
    }

    fn reset(&mut self) {
        self.seed_buffer.clear();
        self.value = None;
    }
}

/// Wilder's Average True Range.
#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    prev_close: Option<f64>,
    seed_buffer: Vec<f64>,
    value: Option<f64>,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            prev_close: None,
            seed_buffer: Vec::with_capacity(period),
            value: None,
        }
    }

    pub fn update_hlc(&mut self, high: f64, low: f64, close: f64) -> Option<f64> {
        let tr = match self.prev_close {
            Some(pc) => (high - low).max((high - pc).abs()).max((low - pc).abs()),
            None => high - low,
        };
        self.prev_close = Some(close);

        match self.value {
            Some(prev) => {
                let next = (prev * (self.period as f64 - 1.0) + tr) / self.period as f64;
                self.value = Some(next);
                Some(next)
            }
            None => {
                self.seed_buffer.push(tr);
                if self.seed_buffer.len() >= self.period {
                    let seed = self.seed_buffer.iter().sum::<f64>() / self.seed_buffer.len() as f64;
                    self.value = Some(seed);
                    Some(seed)
                } else {
                    None
                }
            }
        }
    }
}

/// Relative Strength Index, Wilder smoothing.
#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    prev_close: Option<f64>,
    avg_gain: Option<f64>,
    avg_loss: Option<f64>,
    gains: Vec<f64>,
    losses: Vec<f64>,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            prev_close: None,
            avg_gain: None,
            avg_loss: None,
            gains: Vec::with_capacity(period),
            losses: Vec::with_capacity(period),
        }
    }
}

impl StreamingIndicator for Rsi {
    fn update(&mut self, close: f64) -> Option<f64> {
        let prev = match self.prev_close.replace(close) {
            Some(p) => p,
            None => return None,
        };
        let change = close - prev;
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);

        match (self.avg_gain, self.avg_loss) {
            (Some(ag), Some(al)) => {
                let next_ag = (ag * (self.period as f64 - 1.0) + gain) / self.period as f64;
                let next_al = (al * (self.period as f64 - 1.0) + loss) / self.period as f64;
                self.avg_gain = Some(next_ag);
                self.avg_loss = Some(next_al);
                Some(rsi_from_averages(next_ag, next_al))
            }
            _ => {
                self.gains.push(gain);
                self.losses.push(loss);
                if self.gains.len() >= self.period {
                    let ag = self.gains.iter().sum::<f64>() / self.period as f64;
                    let al = self.losses.iter().sum::<f64>() / self.period as f64;
                    self.avg_gain = Some(ag);
                    self.avg_loss = Some(al);
                    Some(rsi_from_averages(ag, al))
                } else {
                    None
                }
            }
        }
    }

    fn reset(&mut self) {
        self.prev_close = None;
        self.avg_gain = None;
        self.avg_loss = None;
        self.gains.clear();
        self.losses.clear();
    }
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss.abs() < f64::EPSILON {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

/// Rolling linear-regression slope and R^2 over the last `window` closes.
#[derive(Debug, Clone)]
pub struct RegressionChannel {
    window: usize,
    buffer: VecDeque<f64>,
}

impl RegressionChannel {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            buffer: VecDeque::with_capacity(window),
        }
    }

    pub fn update(&mut self, close: f64) -> Option<(f64, f64)> {
        if self.buffer.len() == self.window {
            self.buffer.pop_front();
        }
        self.buffer.push_back(close);
        if self.buffer.len() < self.window {
            return None;
        }
        Some(linreg_slope_r2(&self.buffer))
    }
}

fn linreg_slope_r2(ys: &VecDeque<f64>) -> (f64, f64) {
    let n = ys.len() as f64;
    let xs: Vec<f64> = (0..ys.len()).map(|i| i as f64).collect();
    let x_mean = xs.iter().sum::<f64>() / n;
    let y_mean = ys.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    for (x, y) in xs.iter().zip(ys.iter()) {
        cov += (x - x_mean) * (y - y_mean);
        var_x += (x - x_mean) * (x - x_mean);
    }
    let slope = if var_x.abs() < f64::EPSILON { 0.0 } else { cov / var_x };
    let intercept = y_mean - slope * x_mean;

    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for (x, y) in xs.iter().zip(ys.iter()) {
        let pred = slope * x + intercept;
        ss_res += (y - pred).powi(2);
        ss_tot += (y - y_mean).powi(2);
    }
    let r2 = if ss_tot.abs() < f64::EPSILON { 0.0 } else { 1.0 - ss_res / ss_tot };
    (slope, r2.clamp(0.0, 1.0))
}

/// Average Directional Index (simplified Wilder construction) computed
/// from a rolling window of high/low/close triples.
#[derive(Debug, Clone)]
pub struct Adx {
    period: usize,
    prev: Option<(f64, f64, f64)>,
    dx_values: VecDeque<f64>,
    smoothed_plus_dm: Option<f64>,
    smoothed_minus_dm: Option<f64>,
    smoothed_tr: Option<f64>,
}

impl Adx {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            prev: None,
            dx_values: VecDeque::with_capacity(period),
            smoothed_plus_dm: None,
            smoothed_minus_dm: None,
            smoothed_tr: None,
        }
    }

    pub fn update_hlc(&mut self, high: f64, low: f64, close: f64) -> Option<f64> {
        let (prev_high, prev_low, prev_close) = match self.prev {
            Some(p) => p,
            None => {
                self.prev = Some((high, low, close));
                return None;
            }
        };
        self.prev = Some((high, low, close));

        let up_move = high - prev_high;
        let down_move = prev_low - low;
        let plus_dm = if up_move > down_move && up_move > 0.0 { up_move } else { 0.0 };
        let minus_dm = if down_move > up_move && down_move > 0.0 { down_move } else { 0.0 };
        let tr = (high - low).max((high - prev_close).abs()).max((low - prev_close).abs());

        let n = self.period as f64;
        self.smoothed_plus_dm = Some(smooth(self.smoothed_plus_dm, plus_dm, n));
        self.smoothed_minus_dm = Some(smooth(self.smoothed_minus_dm, minus_dm, n));
        self.smoothed_tr = Some(smooth(self.smoothed_tr, tr, n));

        let str_ = self.smoothed_tr.unwrap_or(0.0);
        if str_.abs() < f64::EPSILON {
            return None;
        }
        let plus_di = 100.0 * self.smoothed_plus_dm.unwrap_or(0.0) / str_;
        let minus_di = 100.0 * self.smoothed_minus_dm.unwrap_or(0.0) / str_;
        let di_sum = plus_di + minus_di;
        if di_sum.abs() < f64::EPSILON {
            return None;
        }
        let dx = 100.0 * (plus_di - minus_di).abs() / di_sum;

        if self.dx_values.len() == self.period {
            self.dx_values.pop_front();
        }
        self.dx_values.push_back(dx);
        if self.dx_values.len() < self.period {
            return None;
        }
        Some(self.dx_values.iter().sum::<f64>() / self.dx_values.len() as f64)
    }
}

fn smooth(prev: Option<f64>, value: f64, period: f64) -> f64 {
    match prev {
        Some(p) => p - p / period + value,
        None => value,
    }
}

/// Rescaled-range estimate of the Hurst exponent over a rolling window.
/// `H < 0.5` indicates mean reversion, `H > 0.5` indicates trending
/// persistence, `H ~= 0.5` is a random walk.
pub fn hurst_exponent(closes: &[f64]) -> Option<f64> {
    if closes.len() < 20 {
        return None;
    }
    let returns: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let mut cumulative = 0.0;
    let mut max_c = f64::MIN;
    let mut min_c = f64::MAX;
    for r in &returns {
        cumulative += r - mean;
        max_c = max_c.max(cumulative);
        min_c = min_c.min(cumulative);
    }
    let range = max_c - min_c;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / returns.len() as f64;
    let std_dev = variance.sqrt();
    if std_dev.abs() < f64::EPSILON || range <= 0.0 {
        return Some(0.5);
    }
    let rescaled_range = range / std_dev;
    let n = returns.len() as f64;
    Some((rescaled_range.ln() / n.ln()).clamp(0.0, 1.0))
}

/// Rolling VWAP over the bars provided so far (reset at session boundary
/// by the caller, which owns the per-day windowing decision).
#[derive(Debug, Clone, Default)]
pub struct Vwap {
    cum_pv: f64,
    cum_v: f64,
}

impl Vwap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, typical_price: f64, volume: f64) -> f64 {
        self.cum_pv += typical_price * volume;
        self.cum_v += volume;
        if self.cum_v.abs() < f64::EPSILON {
            typical_price
        } else {
            self.cum_pv / self.cum_v
        }
    }

    pub fn reset(&mut self) {
        self.cum_pv = 0.0;
        self.cum_v = 0.0;
    }
}
