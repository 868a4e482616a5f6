//! Run status and termination reasons (spec.md §4.1, §6 `/live/status`).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::feed::EngineMode;

/// Why the replay/live loop stopped (spec.md §4.1 "Loop contract").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndOfData,
    EndTimeReached,
    UserStop,
    Error,
}

/// Terminal result of `scheduler::run`: always carries a `stop_reason`;
/// `error` and `exit_code` are populated only when it is `Error` (spec.md §6
/// "Exit codes": 1 execution-plane, 2 data-plane, 3 decision-plane).
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub stop_reason: StopReason,
    pub error: Option<String>,
    pub exit_code: Option<u8>,
    pub bar_count: u64,
}

/// Snapshot served by `GET /live/status` (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveStatus {
    pub mode: EngineMode,
    pub is_running: bool,
    pub is_paused: bool,
    pub bar_count: u64,
    pub last_bar_time: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub stop_reason: Option<StopReason>,
    pub bars_per_symbol: HashMap<String, u64>,
    pub symbols: Vec<String>,
    pub duration_seconds: f64,
}

impl LiveStatus {
    /// Builds the running snapshot (`outcome = None`) or the terminal one
    /// (`outcome = Some`) from the same pieces of `Context` state.
    pub fn new(
        mode: EngineMode,
        symbols: Vec<String>,
        bars_per_symbol: HashMap<String, u64>,
        last_bar_time: Option<DateTime<Utc>>,
        duration_seconds: f64,
        outcome: Option<&RunOutcome>,
    ) -> Self {
        let bar_count = outcome
            .map(|o| o.bar_count)
            .unwrap_or_else(|| bars_per_symbol.values().copied().sum());
        Self {
            mode,
            is_running: outcome.is_none(),
            is_paused: false,
            bar_count,
            last_bar_time,
            error: outcome.and_then(|o| o.error.clone()),
            stop_reason: outcome.map(|o| o.stop_reason),
            bars_per_symbol,
            symbols,
            duration_seconds,
        }
    }
}
