//! U.S. equity trading-calendar filter (spec.md §4.2).
//!
//! All timestamps are stored and compared in UTC; calendar filtering itself
//! resolves the instant to `America/New_York` local time before checking
//! weekday/holiday rules, since "is this a trading day" is an
//! exchange-local question even though the engine's clock is UTC.

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use chrono_tz::America::New_York;

/// Returns the fixed first-Monday-of-January-style observed date for a
/// holiday defined by (month, nth weekday) rules, or a literal date for
/// fixed-calendar holidays. This module hardcodes the authoritative set
/// named in spec.md §4.2 rather than deriving it, since the holiday
/// calendar does not change within a single engine run.
pub fn is_us_market_holiday(date: NaiveDate) -> bool {
    let year = date.year();
    us_market_holidays(year).contains(&date)
}

/// Computes the full holiday set for a given year: New Year's, MLK,
/// Presidents, Memorial, Juneteenth, Independence, Labor, Thanksgiving, the
/// day after Thanksgiving, and Christmas.
pub fn us_market_holidays(year: i32) -> Vec<NaiveDate> {
    let mut holidays = Vec::new();

    holidays.push(observed(NaiveDate::from_ymd_opt(year, 1, 1).unwrap()));
    holidays.push(nth_weekday(year, 1, Weekday::Mon, 3)); // MLK: 3rd Monday of Jan
    holidays.push(nth_weekday(year, 2, Weekday::Mon, 3)); // Presidents: 3rd Monday of Feb
    holidays.push(last_weekday(year, 5, Weekday::Mon)); // Memorial: last Monday of May
    holidays.push(observed(NaiveDate::from_ymd_opt(year, 6, 19).unwrap())); // Juneteenth
    holidays.push(observed(NaiveDate::from_ymd_opt(year, 7, 4).unwrap())); // Independence
    holidays.push(nth_weekday(year, 9, Weekday::Mon, 1)); // Labor: 1st Monday of Sep
    let thanksgiving = nth_weekday(year, 11, Weekday::Thu, 4); // 4th Thursday of Nov
    holidays.push(thanksgiving);
    holidays.push(thanksgiving + chrono::Duration::days(1)); // day after Thanksgiving
    holidays.push(observed(NaiveDate::from_ymd_opt(year, 12, 25).unwrap())); // Christmas

    holidays
}

/// Shifts a fixed-date holiday that falls on a weekend to the nearest
/// trading day: Saturday -> preceding Friday, Sunday -> following Monday.
fn observed(date: NaiveDate) -> NaiveDate {
    match date.weekday() {
        Weekday::Sat => date - chrono::Duration::days(1),
        Weekday::Sun => date + chrono::Duration::days(1),
        _ => date,
    }
}

fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u32) -> NaiveDate {
    let first = NaiveDate::from_ymd_opt(year, month, 1).unwrap();
    let offset = (7 + weekday.num_days_from_monday() as i64
        - first.weekday().num_days_from_monday() as i64)
        % 7;
    first + chrono::Duration::days(offset + 7 * (n as i64 - 1))
}

fn last_weekday(year: i32, month: u32, weekday: Weekday) -> NaiveDate {
    let next_month_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1).unwrap()
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1).unwrap()
    };
    let mut date = next_month_first - chrono::Duration::days(1);
    while date.weekday() != weekday {
        date -= chrono::Duration::days(1);
    }
    date
}

/// True when `ts` (any UTC instant) falls on a U.S. equity trading day:
/// not a weekend, not a market holiday, resolved in exchange-local time.
pub fn is_trading_day(ts: DateTime<Utc>) -> bool {
    let local = ts.with_timezone(&New_York);
    let date = local.date_naive();
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !is_us_market_holiday(date)
}

/// All trading days (inclusive) between `start` and `end`, in order.
pub fn trading_days_between(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut d = start;
    while d <= end {
        if !matches!(d.weekday(), Weekday::Sat | Weekday::Sun) && !is_us_market_holiday(d) {
            days.push(d);
        }
        d += chrono::Duration::days(1);
    }
    days
}
