use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rand_chacha::rand_core::SeedableRng;

use crate::data::Bar;

/// Generates a plausible next bar from the last known close: a bounded
/// random drift on the close and a bounded random intrabar range.
/// Only ever invoked by the feed when `mode = offline` and
/// `strict_data_mode = false` (spec.md §4.2) — never in live mode.
#[derive(Debug)]
pub struct SyntheticGenerator {
    rng: ChaCha8Rng,
    /// Max absolute drift per bar, as a fraction of price (e.g. 0.002 = 0.2%).
    max_drift: f64,
    /// Max additional intrabar range, as a fraction of price.
    max_range: f64,
}

impl SyntheticGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            max_drift: 0.002,
            max_range: 0.0015,
        }
    }

    pub fn with_bounds(mut self, max_drift: f64, max_range: f64) -> Self {
        self.max_drift = max_drift;
        self.max_range = max_range;
        self
    }

    /// Produces the next synthetic bar following `last`, advancing the
    /// timestamp by one bar interval of `interval`.
    pub fn next_bar(&mut self, last: &Bar, interval: Duration, next_ts: DateTime<Utc>) -> Bar {
        let base = last.close;
        let drift = self.rng.random_range(-self.max_drift..=self.max_drift);
        let close = (base * (1.0 + drift)).max(0.01);
        let range = base * self.rng.random_range(0.0..=self.max_range);
        let open = base;
        let high = open.max(close) + range / 2.0;
        let low = (open.min(close) - range / 2.0).max(0.01);
        let _ = interval; // reserved: interval is informational for callers advancing next_ts

        Bar {
            symbol: last.symbol.clone(),
            timeframe: last.timeframe.clone(),
            ts: next_ts,
            open,
            high,
            low,
            close,
            volume: last.volume,
            synthetic: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bar() -> Bar {
        Bar {
            symbol: "SPY".into(),
            timeframe: "1m".into(),
            ts: Utc.with_ymd_and_hms(2024, 11, 27, 10, 0, 0).unwrap(),
            open: 100.0,
            high: 100.5,
            low: 99.5,
            close: 100.0,
            volume: 1000.0,
            synthetic: false,
        }
    }

    #[test]
    fn synthetic_bar_is_flagged_and_bounded() {
        let mut gen = SyntheticGenerator::new(42);
        let last = bar();
        let next_ts = last.ts + Duration::minutes(1);
        let synth = gen.next_bar(&last, Duration::minutes(1), next_ts);
        assert!(synth.synthetic);
        assert!((synth.close - last.close).abs() / last.close <= 0.002 + f64::EPSILON);
        assert!(synth.high >= synth.low);
        assert_eq!(synth.ts, next_ts);
    }

    #[test]
    fn deterministic_given_same_seed() {
        let last = bar();
        let next_ts = last.ts + Duration::minutes(1);
        let mut a = SyntheticGenerator::new(7);
        let mut b = SyntheticGenerator::new(7);
        let ba = a.next_bar(&last, Duration::minutes(1), next_ts);
        let bb = b.next_bar(&last, Duration::minutes(1), next_ts);
        assert_eq!(ba.close, bb.close);
        assert_eq!(ba.high, bb.high);
    }
}
