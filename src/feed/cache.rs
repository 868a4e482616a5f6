use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::data::Bar;

/// Key-value historical bar store on `(symbol, timeframe, date)`, as named
/// in spec.md §6. Bars within a day are kept sorted by timestamp.
#[derive(Clone, Debug, Default)]
pub struct HistoricalCache {
    days: BTreeMap<(String, String, NaiveDate), Vec<Bar>>,
}

impl HistoricalCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a bar, keeping each day's bars sorted by timestamp.
    pub fn insert(&mut self, bar: Bar) {
        let date = bar.ts.date_naive();
        let key = (bar.symbol.clone(), bar.timeframe.clone(), date);
        let day = self.days.entry(key).or_default();
        day.push(bar);
        day.sort_by_key(|b| b.ts);
    }

    pub fn day(&self, symbol: &str, timeframe: &str, date: NaiveDate) -> Option<&[Bar]> {
        self.days
            .get(&(symbol.to_string(), timeframe.to_string(), date))
            .map(|v| v.as_slice())
    }

    pub fn has_day(&self, symbol: &str, timeframe: &str, date: NaiveDate) -> bool {
        self.day(symbol, timeframe, date).is_some()
    }

    /// All bars for `symbol`/`timeframe` in ascending timestamp order,
    /// across every cached day. Used for `get_latest_bars` warmup queries.
    pub fn all_bars(&self, symbol: &str, timeframe: &str) -> Vec<Bar> {
        self.days
            .iter()
            .filter(|((s, tf, _), _)| s == symbol && tf == timeframe)
            .flat_map(|(_, bars)| bars.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn bar(symbol: &str, ts: chrono::DateTime<Utc>) -> Bar {
        Bar {
            symbol: symbol.into(),
            timeframe: "1m".into(),
            ts,
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
            volume: 1.0,
            synthetic: false,
        }
    }

    #[test]
    fn insert_sorts_bars_within_a_day() {
        let mut cache = HistoricalCache::new();
        let d0 = Utc.with_ymd_and_hms(2024, 11, 27, 10, 1, 0).unwrap();
        let d1 = Utc.with_ymd_and_hms(2024, 11, 27, 10, 0, 0).unwrap();
        cache.insert(bar("SPY", d0));
        cache.insert(bar("SPY", d1));
        let day = cache
            .day("SPY", "1m", NaiveDate::from_ymd_opt(2024, 11, 27).unwrap())
            .unwrap();
        assert_eq!(day[0].ts, d1);
        assert_eq!(day[1].ts, d0);
    }

    #[test]
    fn has_day_reports_absent_dates() {
        let cache = HistoricalCache::new();
        assert!(!cache.has_day("SPY", "1m", NaiveDate::from_ymd_opt(2024, 11, 28).unwrap()));
    }
}
