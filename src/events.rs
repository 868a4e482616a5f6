//! Append-only event log (spec.md §6, §7): every non-fatal condition the
//! engine wants an external observer to see — risk vetoes, credit
//! mismatches, synthetic-bar fallbacks, orphan hedge flattens — is an
//! `Event`, never an `Err`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    RiskBlock { symbol: String, agent_id: String, reason: String },
    AgentFailure { agent_id: String, reason: String },
    AllAgentsFailed { count: usize },
    CreditMismatch { package_id: String, expected: f64, actual: f64, pct_diff: f64 },
    BrokerRejected { order_context: String, reason: String },
    SyntheticBarFallback { symbol: String, ts: DateTime<Utc> },
    OrphanHedgeFlatten { package_id: String, residual_shares: f64 },
    PackageBroken { package_id: String, reason: String },
    /// Logged by `scheduler::runner::close_package` for every package close;
    /// the reconciliation tool (`crate::reconcile`) replays these to
    /// recompute each package's P&L independently of the stored trade.
    PackageClosed {
        package_id: String,
        call_leg_id: String,
        put_leg_id: String,
        call_entry_price: f64,
        call_exit_price: f64,
        put_entry_price: f64,
        put_exit_price: f64,
        quantity: f64,
        direction: String,
    },
    StateMismatch { package_id: String, computed_pnl: f64, stored_pnl: f64, leg_ids: Vec<String> },
}

/// One envelope per log line (spec.md §6: `{run_id, package_id, strategy,
/// event, ts, ...}`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventRecord {
    pub run_id: String,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub event: Event,
}

pub trait EventSink: std::fmt::Debug {
    fn emit(&mut self, event: Event, ts: DateTime<Utc>);

    /// Lets callers (tests, the reconciliation tool) downcast back to a
    /// concrete sink when they need to read records rather than just emit.
    fn as_any(&self) -> &dyn std::any::Any;
}

/// In-memory sink, primarily for tests and for the `/live/status` and
/// `/trades/...` query surfaces to read back from.
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    run_id: String,
    records: Vec<EventRecord>,
}

impl MemoryEventSink {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self { run_id: run_id.into(), records: Vec::new() }
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }
}

impl EventSink for MemoryEventSink {
    fn emit(&mut self, event: Event, ts: DateTime<Utc>) {
        self.records.push(EventRecord { run_id: self.run_id.clone(), ts, event });
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// JSONL append-only file sink (spec.md §6 "event log (JSONL)").
#[derive(Debug)]
pub struct JsonlEventSink {
    run_id: String,
    writer: std::fs::File,
}

impl JsonlEventSink {
    pub fn create(path: impl AsRef<std::path::Path>, run_id: impl Into<String>) -> std::io::Result<Self> {
        let writer = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { run_id: run_id.into(), writer })
    }
}

impl EventSink for JsonlEventSink {
    fn emit(&mut self, event: Event, ts: DateTime<Utc>) {
        let record = EventRecord { run_id: self.run_id.clone(), ts, event };
        if let Ok(line) = serde_json::to_string(&record) {
            let _ = writeln!(self.writer, "{line}");
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_records_events_in_order() {
        let mut sink = MemoryEventSink::new("run-1");
        sink.emit(Event::RiskBlock { symbol: "SPY".into(), agent_id: "trend".into(), reason: "kill_switch".into() }, Utc::now());
        sink.emit(Event::AllAgentsFailed { count: 3 }, Utc::now());
        assert_eq!(sink.records().len(), 2);
        assert_eq!(sink.records()[0].run_id, "run-1");
    }
}
