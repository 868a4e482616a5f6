//! Reconciliation tool (spec.md §7): replays `Event::PackageClosed` log
//! entries, recomputes each package's combined P&L independently of the
//! stored `MultiLegTrade`, and flags any divergence beyond floating-point
//! noise as a `StateMismatch` — both as an emitted `Event` for the log and
//! as a returned `ReconcileError` for the caller.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::data::{MultiLegTrade, CONTRACT_MULTIPLIER};
use crate::enums::PackageDirection;
use crate::error::ReconcileError;
use crate::events::{Event, EventRecord, EventSink};

/// Max acceptable drift between recomputed and stored P&L, in dollars,
/// before a divergence counts as a real mismatch rather than rounding.
const PNL_TOLERANCE: f64 = 0.01;

/// Replays every `Event::PackageClosed` in `events` and diffs its
/// independently recomputed P&L against the matching entry in `trades`.
/// Emits `Event::StateMismatch` on `sink` for every divergence found, and
/// returns the first one as an `Err` — callers that need the full list
/// should inspect `sink` afterward.
pub fn reconcile_positions(
    sink: &mut dyn EventSink,
    events: &[EventRecord],
    trades: &[MultiLegTrade],
    now: DateTime<Utc>,
) -> Result<(), ReconcileError> {
    let stored: HashMap<&str, &MultiLegTrade> = trades.iter().map(|t| (t.package_id.as_str(), t)).collect();
    let mut first_mismatch = None;

    for record in events {
        let Event::PackageClosed {
            package_id,
            call_leg_id,
            put_leg_id,
            call_entry_price,
            call_exit_price,
            put_entry_price,
            put_exit_price,
            quantity,
            direction,
        } = &record.event
        else {
            continue;
        };

        let direction = match PackageDirection::from_str(direction) {
            Ok(d) => d,
            Err(_) => continue,
        };

        let computed_pnl = recompute_pnl(
            direction,
            *quantity,
            *call_entry_price,
            *call_exit_price,
            *put_entry_price,
            *put_exit_price,
        );
        let stored_pnl = stored.get(package_id.as_str()).map(|t| t.combined_pnl).unwrap_or(0.0);

        if (computed_pnl - stored_pnl).abs() > PNL_TOLERANCE {
            let leg_ids = vec![call_leg_id.clone(), put_leg_id.clone()];
            sink.emit(
                Event::StateMismatch {
                    package_id: package_id.clone(),
                    computed_pnl,
                    stored_pnl,
                    leg_ids: leg_ids.clone(),
                },
                now,
            );
            first_mismatch.get_or_insert(ReconcileError::StateMismatch {
                package_id: package_id.clone(),
                computed_pnl,
                stored_pnl,
                leg_ids,
            });
        }
    }

    match first_mismatch {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn recompute_pnl(
    direction: PackageDirection,
    quantity: f64,
    call_entry_price: f64,
    call_exit_price: f64,
    put_entry_price: f64,
    put_exit_price: f64,
) -> f64 {
    let call_entry = call_entry_price * quantity * CONTRACT_MULTIPLIER;
    let call_exit = call_exit_price * quantity * CONTRACT_MULTIPLIER;
    let put_entry = put_entry_price * quantity * CONTRACT_MULTIPLIER;
    let put_exit = put_exit_price * quantity * CONTRACT_MULTIPLIER;

    match direction {
        PackageDirection::Long => (call_exit - call_entry) + (put_exit - put_entry),
        PackageDirection::Short => (call_entry - call_exit) + (put_entry - put_exit),
    }
}
