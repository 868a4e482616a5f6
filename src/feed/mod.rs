//! Data feed abstraction (spec.md §4.2, §6): a unified bar stream whose
//! source (live broker, historical cache, or synthesized filler) is hidden
//! behind a small capability trait.

mod cache;
mod live;
mod replay;
mod synthetic;

pub use cache::HistoricalCache;
pub use live::{LiveFeed, LivePoller};
pub use replay::ReplayFeed;
pub use synthetic::SyntheticGenerator;

/// Trading days between `start` and `end`, inclusive, with weekends and all
/// U.S. market holidays excluded — the "available dates" query surface
/// named in spec.md §4.2.
pub fn available_trading_dates(
    start: chrono::NaiveDate,
    end: chrono::NaiveDate,
) -> Vec<chrono::NaiveDate> {
    crate::calendar::trading_days_between(start, end)
}

use crate::data::Bar;
use crate::error::EngineResult;

/// Engine operating mode. `Offline` is replay over a historical cache at a
/// speed multiplier; `Live` polls a real-time source at wall-clock pace.
#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineMode {
    Live,
    Offline,
}

/// Capability set every bar source implements (spec.md §6 "Bar source
/// plug-in"): `connect`, `subscribe`, `get_next_bar`, `get_next_n_bars`, and
/// the warmup-only `get_latest_bars`.
pub trait DataFeed {
    fn connect(&mut self) -> EngineResult<()>;

    /// Loads up to `preload_bars` most recent bars into the per-symbol ring
    /// buffer; preloaded bars must still be drawn through `get_next_bar` the
    /// first time — `subscribe` never hands them to the caller directly.
    fn subscribe(&mut self, symbols: &[String], preload_bars: usize) -> EngineResult<()>;

    /// Returns the next bar for `symbol`, or `Ok(None)` when the feed has
    /// genuinely reached the end of its configured data (no more bars will
    /// ever be produced for this symbol). Returns
    /// `Err(DataError::DataMissing)` when `strict_data_mode` is set and a
    /// bar is missing at the expected slot (a condition that, absent strict
    /// mode, would have been filled with a synthesized bar).
    fn get_next_bar(&mut self, symbol: &str) -> EngineResult<Option<Bar>>;

    fn get_next_n_bars(&mut self, symbol: &str, n: usize) -> EngineResult<Vec<Bar>> {
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            match self.get_next_bar(symbol)? {
                Some(bar) => out.push(bar),
                None => break,
            }
        }
        Ok(out)
    }

    /// Used by feature warmup: the most recent `n` bars already observed,
    /// without consuming them from the stream.
    fn get_latest_bars(&self, symbol: &str, timeframe: &str, n: usize) -> Vec<Bar>;
}
