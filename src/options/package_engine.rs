//! Multi-leg package engine (spec.md §4.8): two independent orders, two
//! independent `LegFill`s, credit/debit verification that warns but never
//! blocks, and the package state machine
//! `OpenPending -> OpenFull | Broken -> Exiting -> Closed`. Both legs are
//! submitted and awaited within the same call, so `OpenPending` never
//! outlives `open_package` itself: it resolves synchronously to `OpenFull`
//! (both legs filled) or `Broken` (one or both rejected, with whatever fill
//! did land carried on the returned position so it is still visible to the
//! caller). `Exiting` is set by `scheduler::runner` just before it calls
//! `close_package`, which lands the position in `Closed` right before it is
//! retired from the open-position store.

use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use crate::data::{package_id as build_package_id, Bar, LegFill, MultiLegPosition, TradeIntent};
use crate::enums::{LegRole, OptionType, OrderSide, PackageDirection, PackageState, RegimeType, TradeType};
use crate::error::EngineResult;
use crate::events::{Event, EventSink};
use crate::execution::OptionBroker;

use super::occ::format_occ_symbol;

const CREDIT_MISMATCH_TOLERANCE_PCT: f64 = 10.0;

pub enum PackageOpenOutcome {
    Filled(MultiLegPosition),
    Broken { position: MultiLegPosition, reason: String },
}

#[derive(Debug, Default)]
pub struct PackageEngine;

impl PackageEngine {
    pub fn new() -> Self {
        Self
    }

    /// Reads the call strike, put strike, trade type, and package direction
    /// out of `intent` (agents stash the put strike and package shape in
    /// `TradeIntent::metadata`, since `OptionLeg` only carries one strike),
    /// submits both leg orders, and returns the resulting package state.
    #[instrument(skip_all, fields(symbol = %intent.symbol))]
    pub fn open_package(
        &self,
        intent: &TradeIntent,
        bar: &Bar,
        quantity: f64,
        entry_iv: f64,
        entry_gex: f64,
        entry_regime: RegimeType,
        broker: &mut dyn OptionBroker,
        sink: &mut dyn EventSink,
    ) -> EngineResult<PackageOpenOutcome> {
        let option = intent
            .option
            .as_ref()
            .expect("multi-leg agent intents always carry an OptionLeg for the call strike");
        let call_strike = option.strike;
        let put_strike: f64 = intent
            .metadata
            .get("put_strike")
            .and_then(|s| s.parse().ok())
            .unwrap_or(call_strike);
        let trade_type = match intent.metadata.get("trade_type").map(String::as_str) {
            Some("strangle") => TradeType::Strangle,
            _ => TradeType::Straddle,
        };
        let direction = match intent.metadata.get("package_direction").map(String::as_str) {
            Some("long") => PackageDirection::Long,
            _ => PackageDirection::Short,
        };

        let expiry = option.expiry.date_naive();
        let package_id = build_package_id(&intent.symbol, trade_type, direction, call_strike, put_strike, expiry);

        let call_occ = format_occ_symbol(&intent.symbol, expiry, OptionType::Call, call_strike)?;
        let put_occ = format_occ_symbol(&intent.symbol, expiry, OptionType::Put, put_strike)?;

        let leg_side = match direction {
            PackageDirection::Short => OrderSide::Sell,
            PackageDirection::Long => OrderSide::Buy,
        };

        let call_result = broker.submit_option_order(&call_occ, leg_side, quantity, None);
        let put_result = broker.submit_option_order(&put_occ, leg_side, quantity, None);

        let call_fill = call_result.ok().map(|ack| to_leg_fill(LegRole::Call, &call_occ, call_strike, quantity, &ack, bar.ts));
        let put_fill = put_result.ok().map(|ack| to_leg_fill(LegRole::Put, &put_occ, put_strike, quantity, &ack, bar.ts));

        let call_filled = call_fill.as_ref().is_some_and(LegFill::is_filled);
        let put_filled = put_fill.as_ref().is_some_and(LegFill::is_filled);

        if !call_filled || !put_filled {
            warn!(package_id = package_id.as_str(), "package broken: one or both legs failed to fill");
            sink.emit(
                Event::PackageBroken { package_id: package_id.clone(), reason: "one or both legs failed to fill".to_string() },
                bar.ts,
            );
            let position = MultiLegPosition {
                package_id: package_id.clone(),
                symbol: intent.symbol.clone(),
                trade_type,
                direction,
                state: PackageState::Broken,
                call_fill,
                put_fill,
                net_premium: 0.0,
                entry_iv,
                entry_gex,
                entry_regime,
                entry_time: bar.ts,
                options_unrealized_pnl: 0.0,
                quantity,
            };
            return Ok(PackageOpenOutcome::Broken {
                position,
                reason: "one or both legs failed to fill; the other leg is left open, no auto-cancel".to_string(),
            });
        }

        let call_fill = call_fill.unwrap();
        let put_fill = put_fill.unwrap();
        let net_premium = (call_fill.total_cost() + put_fill.total_cost()).abs();

        if let Some(expected) = expected_premium(intent) {
            let pct_diff = if expected.abs() > f64::EPSILON {
                (net_premium - expected).abs() / expected.abs() * 100.0
            } else {
                0.0
            };
            if pct_diff > CREDIT_MISMATCH_TOLERANCE_PCT {
                warn!(package_id = package_id.as_str(), expected, actual = net_premium, pct_diff, "credit mismatch");
                sink.emit(
                    Event::CreditMismatch { package_id: package_id.clone(), expected, actual: net_premium, pct_diff },
                    bar.ts,
                );
            }
        }

        info!(package_id = package_id.as_str(), net_premium, "package filled");
        Ok(PackageOpenOutcome::Filled(MultiLegPosition {
            package_id,
            symbol: intent.symbol.clone(),
            trade_type,
            direction,
            state: PackageState::OpenFull,
            call_fill: Some(call_fill),
            put_fill: Some(put_fill),
            net_premium,
            entry_iv,
            entry_gex,
            entry_regime,
            entry_time: bar.ts,
            options_unrealized_pnl: 0.0,
            quantity,
        }))
    }

    /// Submits two closing orders of opposite side to both legs and returns
    /// the exit `LegFill`s.
    #[instrument(skip_all, fields(package_id = %position.package_id))]
    pub fn close_package(
        &self,
        position: &MultiLegPosition,
        root: &str,
        expiry: chrono::NaiveDate,
        broker: &mut dyn OptionBroker,
        now: DateTime<Utc>,
    ) -> EngineResult<(LegFill, LegFill)> {
        let call_fill = position.call_fill.as_ref().expect("open_full implies both legs filled");
        let put_fill = position.put_fill.as_ref().expect("open_full implies both legs filled");

        let closing_side = match position.direction {
            PackageDirection::Short => OrderSide::Buy,
            PackageDirection::Long => OrderSide::Sell,
        };

        let call_occ = format_occ_symbol(root, expiry, OptionType::Call, call_fill.strike)?;
        let put_occ = format_occ_symbol(root, expiry, OptionType::Put, put_fill.strike)?;

        let call_ack = broker.submit_option_order(&call_occ, closing_side, position.quantity, None)?;
        let put_ack = broker.submit_option_order(&put_occ, closing_side, position.quantity, None)?;

        Ok((
            to_leg_fill(LegRole::Call, &call_occ, call_fill.strike, position.quantity, &call_ack, now),
            to_leg_fill(LegRole::Put, &put_occ, put_fill.strike, position.quantity, &put_ack, now),
        ))
    }
}

/// Marks an open package to market using the ratio of current IV to entry
/// IV as a proxy for option value drift, since no live chain is available
/// (same texture as `features::compute::iv_proxy_from_atr`). The ratio is
/// clamped to [0, 4] to keep a stale or noisy IV proxy from producing an
/// unbounded mark.
pub fn mark_unrealized_pnl(position: &MultiLegPosition, current_iv: f64) -> f64 {
    let iv_ratio = if position.entry_iv > f64::EPSILON {
        (current_iv / position.entry_iv).clamp(0.0, 4.0)
    } else {
        1.0
    };
    let current_value = position.net_premium * iv_ratio;
    match position.direction {
        PackageDirection::Short => position.net_premium - current_value,
        PackageDirection::Long => current_value - position.net_premium,
    }
}

fn to_leg_fill(
    role: LegRole,
    occ_symbol: &str,
    strike: f64,
    quantity: f64,
    ack: &crate::execution::OrderAck,
    now: DateTime<Utc>,
) -> LegFill {
    LegFill {
        role,
        option_symbol: occ_symbol.to_string(),
        strike,
        quantity,
        fill_price: ack.fill_price.unwrap_or(0.0),
        fill_time: now,
        broker_order_id: ack.broker_order_id.clone(),
        status: ack.status,
    }
}

fn expected_premium(intent: &TradeIntent) -> Option<f64> {
    intent
        .option
        .as_ref()
        .and_then(|o| o.total_credit.or(o.total_debit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::OptionLeg;
    use crate::enums::{Direction, InstrumentType};
    use crate::execution::SimulatedBroker;
    use crate::events::MemoryEventSink;
    use chrono::Duration;
    use std::collections::BTreeMap;

    fn bar() -> Bar {
        Bar {
            symbol: "SPY".into(),
            timeframe: "1m".into(),
            ts: Utc::now(),
            open: 100.0,
            high: 100.5,
            low: 99.5,
            close: 100.0,
            volume: 1000.0,
            synthetic: false,
        }
    }

    fn short_straddle_intent() -> TradeIntent {
        let mut metadata = BTreeMap::new();
        metadata.insert("put_strike".to_string(), "100.0".to_string());
        metadata.insert("trade_type".to_string(), "straddle".to_string());
        metadata.insert("package_direction".to_string(), "short".to_string());
        TradeIntent {
            symbol: "SPY".into(),
            instrument_type: InstrumentType::Option,
            direction: Direction::Short,
            position_delta: 1.0,
            confidence: 0.6,
            agent_id: "theta_harvester".into(),
            reason: "test".into(),
            option: Some(OptionLeg {
                option_type: OptionType::Call,
                strike: 100.0,
                expiry: Utc::now() + Duration::days(14),
                call_symbol: None,
                put_symbol: None,
                total_credit: None,
                total_debit: None,
                sim_only: false,
            }),
            metadata,
        }
    }

    #[test]
    fn mark_unrealized_pnl_profits_short_package_as_iv_falls() {
        let position = MultiLegPosition {
            package_id: "SPY_straddle_short_10000_10000_20260101".into(),
            symbol: "SPY".into(),
            trade_type: TradeType::Straddle,
            direction: PackageDirection::Short,
            state: PackageState::OpenFull,
            call_fill: None,
            put_fill: None,
            net_premium: 500.0,
            entry_iv: 0.5,
            entry_gex: 0.0,
            entry_regime: RegimeType::Compression,
            entry_time: Utc::now(),
            options_unrealized_pnl: 0.0,
            quantity: 1.0,
        };
        assert!(mark_unrealized_pnl(&position, 0.25) > 0.0);
        assert!(mark_unrealized_pnl(&position, 1.0) < 0.0);
    }

    #[test]
    fn opens_a_fully_filled_package_when_both_legs_fill() {
        let engine = PackageEngine::new();
        let mut broker = SimulatedBroker::new(1_000_000.0, 0.0);
        broker.set_reference_price(2.5);
        let mut sink = MemoryEventSink::new("run-1");
        let intent = short_straddle_intent();
        let b = bar();

        let outcome = engine
            .open_package(&intent, &b, 1.0, 0.3, -0.1, RegimeType::Compression, &mut broker, &mut sink)
            .unwrap();

        match outcome {
            PackageOpenOutcome::Filled(pos) => {
                assert!(pos.both_legs_filled());
                assert_eq!(pos.state, PackageState::OpenFull);
            }
            PackageOpenOutcome::Broken { .. } => panic!("expected a filled package"),
        }
    }
}
