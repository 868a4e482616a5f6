//! Replay/live driver loop (spec.md §4.1): pulls bars from the configured
//! feed, classifies regime, evaluates agents, arbitrates their intents,
//! sizes and executes, then updates any open multi-leg packages and their
//! hedges — one bar at a time, in symbol order within each iteration.

use std::time::Duration;

use crate::agents::{default_agents, gamma_only_agents, Agent, MarketState};
use crate::controller::{arbitrate, AgentWeights};
use crate::data::{
    Bar, FeatureHistory, HedgePosition, MultiLegTrade, RegimeSignal, CONFIDENCE_FLOOR,
    CONFIDENCE_FLOOR_TESTING,
};
use crate::enums::{PackageDirection, PackageState, TradeType};
use crate::error::{AgentError, EngineResult};
use crate::events::Event;
use crate::execution::{ExecutionMode, SingleLegExecutor};
use crate::feed::EngineMode;
use crate::features::{classify, dealer_gamma_proxy, iv_percentile};
use crate::hedge;
use crate::options::{self, PackageEngine};
use crate::risk::{self, RiskDecision};

use super::clock::{Clock, Sleeper};
use super::context::Context;
use super::status::{RunOutcome, StopReason};

use tracing::{error, info, instrument, warn};

const BARS_PER_ITERATION: usize = 10;
const EMPTY_ITERATIONS_BEFORE_STOP: usize = 5;
const BAR_INTERVAL: Duration = Duration::from_secs(60);

/// Runs the engine to completion (or until externally stopped), returning
/// the terminal `RunOutcome`. The agent set is chosen once at startup from
/// `gamma_only_test_mode`; `testing_mode` independently relaxes warmup and
/// confidence thresholds every bar (spec.md §9 "open questions": the two
/// knobs compose rather than one implying the other).
pub fn run(ctx: &mut Context, sleeper: Box<dyn Sleeper>) -> RunOutcome {
    let agents: Vec<Box<dyn Agent>> =
        if ctx.config.gamma_only_test_mode { gamma_only_agents() } else { default_agents() };
    run_with_agents(ctx, sleeper, agents)
}

/// Same driver loop as [`run`], but with the enabled agent set injected
/// rather than chosen from config — the seam integration tests use to
/// install a stub `Agent` and drive specific failure scenarios.
pub fn run_with_agents(ctx: &mut Context, sleeper: Box<dyn Sleeper>, agents: Vec<Box<dyn Agent>>) -> RunOutcome {
    let weights = AgentWeights::new();
    let package_engine = PackageEngine::new();
    let executor = SingleLegExecutor::new(match ctx.config.mode {
        EngineMode::Live => ExecutionMode::Real,
        EngineMode::Offline => ExecutionMode::Simulated { slippage_pct: ctx.config.slippage_pct },
    });
    let clock = Clock::new(ctx.config.mode, ctx.config.replay_speed, sleeper);

    if let Err(e) = ctx.feed.connect() {
        return fault(e, 0);
    }
    if let Err(e) = ctx.feed.subscribe(&ctx.config.symbols, BARS_PER_ITERATION) {
        return fault(e, 0);
    }

    let symbols = ctx.config.symbols.clone();
    let mut bar_count: u64 = 0;
    let mut empty_iterations = 0usize;

    loop {
        if ctx.kill_switch.is_tripped() {
            return RunOutcome { stop_reason: StopReason::UserStop, error: None, exit_code: None, bar_count };
        }

        let mut produced_any = false;

        for symbol in &symbols {
            let bars = match ctx.feed.get_next_n_bars(symbol, BARS_PER_ITERATION) {
                Ok(bars) => bars,
                Err(e) => return fault(e, bar_count),
            };
            if bars.is_empty() {
                continue;
            }
            produced_any = true;

            for bar in bars {
                if ctx.kill_switch.is_tripped() {
                    return RunOutcome { stop_reason: StopReason::UserStop, error: None, exit_code: None, bar_count };
                }

                let end_time_reached = ctx.config.end_time.is_some_and(|end| bar.ts >= end);
                let bar_ts = bar.ts;

                if bar.synthetic {
                    warn!(symbol = symbol.as_str(), bar_ts = %bar.ts, "synthetic bar fallback");
                    ctx.event_sink.emit(Event::SyntheticBarFallback { symbol: symbol.clone(), ts: bar.ts }, bar.ts);
                }

                if let Err(e) = process_bar(ctx, symbol, bar, &agents, &executor, &package_engine, &weights) {
                    return fault(e, bar_count);
                }

                bar_count += 1;
                ctx.last_bar_time = Some(bar_ts);

                if end_time_reached {
                    return RunOutcome {
                        stop_reason: StopReason::EndTimeReached,
                        error: None,
                        exit_code: None,
                        bar_count,
                    };
                }
            }
        }

        if produced_any {
            empty_iterations = 0;
        } else {
            empty_iterations += 1;
            if empty_iterations >= EMPTY_ITERATIONS_BEFORE_STOP {
                return RunOutcome { stop_reason: StopReason::EndOfData, error: None, exit_code: None, bar_count };
            }
        }

        clock.wait(BAR_INTERVAL);
    }
}

fn fault(e: crate::error::EngineError, bar_count: u64) -> RunOutcome {
    RunOutcome { stop_reason: StopReason::Error, exit_code: Some(e.exit_code()), error: Some(e.to_string()), bar_count }
}

/// The nine-step per-bar pipeline (spec.md §4.1): feature history append,
/// feature compute + classify (only past warmup), agent evaluation, the
/// meta-policy arbitration, risk sizing/veto, single- or multi-leg
/// execution, per-bar package/hedge maintenance, and finally the bar
/// counter bump.
#[instrument(skip_all, fields(symbol = %symbol, bar_ts = %bar.ts))]
fn process_bar(
    ctx: &mut Context,
    symbol: &str,
    bar: Bar,
    agents: &[Box<dyn Agent>],
    executor: &SingleLegExecutor,
    package_engine: &PackageEngine,
    weights: &AgentWeights,
) -> EngineResult<()> {
    let bar_index = ctx.bars_per_symbol.get(symbol).copied().unwrap_or(0) + 1;

    ctx.histories.entry(symbol.to_string()).or_insert_with(FeatureHistory::new).push_bar(bar.clone());

    let history = ctx.histories.get(symbol).expect("inserted above");
    if !history.warmup_met(ctx.config.testing_mode) {
        ctx.bump_bar_count(symbol);
        return Ok(());
    }

    let snapshot = ctx.feature_engine.compute(history, &bar, ctx.config.testing_mode)?;
    let signal = classify(history, &snapshot);
    let iv_pct = iv_percentile(history, snapshot.iv_proxy);
    let gamma_proxy = dealer_gamma_proxy(history, &snapshot);

    ctx.histories.get_mut(symbol).expect("inserted above").push_snapshot(snapshot.clone());

    ctx.broker.set_reference_price(bar.close);

    let positions = ctx.portfolio.positions_for(symbol);
    let open_package_quantity: f64 = ctx
        .multi_leg_positions
        .values()
        .filter(|p| p.symbol == symbol && p.is_open())
        .map(|p| p.quantity.abs())
        .sum();
    let market_state = MarketState {
        bar: &bar,
        snapshot: &snapshot,
        positions: &positions,
        testing_mode: ctx.config.testing_mode,
        iv_percentile: iv_pct,
        dealer_gamma_proxy: gamma_proxy,
        has_open_package: open_package_quantity > 0.0,
    };

    let active: Vec<&Box<dyn Agent>> =
        agents.iter().filter(|a| a.is_active(&signal, ctx.config.testing_mode)).collect();
    let mut intents = Vec::new();
    let mut failed = 0usize;
    for agent in &active {
        match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| agent.evaluate(&signal, &market_state))) {
            Ok(mut agent_intents) => intents.append(&mut agent_intents),
            Err(_) => {
                failed += 1;
                warn!(agent_id = agent.id(), "agent panicked during evaluate");
                ctx.event_sink.emit(
                    Event::AgentFailure { agent_id: agent.id().to_string(), reason: "panicked during evaluate".to_string() },
                    bar.ts,
                );
            }
        }
    }
    if !active.is_empty() && failed == active.len() {
        error!(count = failed, "all active agents failed on this bar");
        ctx.event_sink.emit(Event::AllAgentsFailed { count: failed }, bar.ts);
        return Err(AgentError::AllAgentsFailed { count: failed }.into());
    }

    let confidence_floor = if ctx.config.testing_mode { CONFIDENCE_FLOOR_TESTING } else { CONFIDENCE_FLOOR };
    let final_intent = arbitrate(intents, &signal, confidence_floor, ctx.config.testing_mode, weights);

    if let Some(final_intent) = final_intent {
        let agent_id = final_intent.intent.agent_id.clone();
        let is_multi_leg = final_intent.intent.metadata.contains_key("trade_type");
        let symbol_risk = ctx.config.symbol_risk(symbol);
        let open_positions = ctx.portfolio.positions_for(symbol);

        let decision = risk::evaluate(
            final_intent,
            &mut ctx.risk_state,
            &ctx.config.risk,
            &symbol_risk,
            &open_positions,
            open_package_quantity,
            signal.volatility,
            false,
            bar.ts,
        );

        match decision {
            RiskDecision::Blocked { reason } => {
                warn!(symbol, agent_id = agent_id.as_str(), reason = reason.as_str(), "risk manager blocked intent");
                ctx.event_sink.emit(Event::RiskBlock { symbol: symbol.to_string(), agent_id, reason }, bar.ts);
            }
            RiskDecision::Approved(approved) => {
                if is_multi_leg {
                    let quantity = approved.intent.position_delta.abs().max(1.0).round();
                    let outcome = package_engine.open_package(
                        &approved.intent,
                        &bar,
                        quantity,
                        snapshot.iv_proxy,
                        gamma_proxy,
                        signal.regime,
                        ctx.broker.as_mut(),
                        ctx.event_sink.as_mut(),
                    )?;
                    match outcome {
                        options::PackageOpenOutcome::Filled(position) => {
                            let package_id = position.package_id.clone();
                            info!(symbol, package_id = package_id.as_str(), "opened multi-leg package");
                            ctx.package_entry_bar_index.insert(package_id.clone(), bar_index);
                            ctx.multi_leg_positions.insert(package_id, position);
                        }
                        options::PackageOpenOutcome::Broken { position, reason } => {
                            warn!(symbol, reason = reason.as_str(), "package open left a broken leg");
                            ctx.multi_leg_positions.insert(position.package_id.clone(), position);
                        }
                    }
                } else {
                    let before = ctx.portfolio.round_trips().len();
                    executor.execute(&approved, &bar, &signal, ctx.broker.as_mut(), &mut ctx.portfolio)?;
                    if ctx.portfolio.round_trips().len() > before {
                        let pnl_abs = ctx.portfolio.round_trips()[before].pnl_abs;
                        info!(symbol, pnl_abs, "closed round trip");
                        ctx.risk_state.record_round_trip(pnl_abs);
                    }
                }
            }
        }
    }

    update_packages_and_hedges(ctx, symbol, &bar, &signal, snapshot.iv_proxy, gamma_proxy, package_engine, bar_index)?;

    ctx.bump_bar_count(symbol);
    Ok(())
}

/// Step 8 (spec.md §4.8, §4.9): marks every open package for `symbol` to
/// market, runs its auto-exit rule, closes it or advances its hedge, then
/// separately scans every hedge position for `symbol` for orphan flatten —
/// a hedge can outlive the package that spawned it.
#[allow(clippy::too_many_arguments)]
fn update_packages_and_hedges(
    ctx: &mut Context,
    symbol: &str,
    bar: &Bar,
    signal: &RegimeSignal,
    current_iv: f64,
    current_gex: f64,
    package_engine: &PackageEngine,
    bar_index: u64,
) -> EngineResult<()> {
    let package_ids: Vec<String> = ctx
        .multi_leg_positions
        .iter()
        .filter(|(_, p)| p.symbol == symbol && p.is_open())
        .map(|(id, _)| id.clone())
        .collect();

    for package_id in package_ids {
        let entry_bar_index = ctx.package_entry_bar_index.get(&package_id).copied().unwrap_or(bar_index);
        let bars_held = bar_index.saturating_sub(entry_bar_index) as u32;

        let options_pnl = {
            let position = ctx.multi_leg_positions.get_mut(&package_id).expect("iterated above");
            let pnl = options::mark_unrealized_pnl(position, current_iv);
            position.options_unrealized_pnl = pnl;
            pnl
        };

        let (hedge_realized, hedge_unrealized) = match ctx.hedge_positions.get_mut(&package_id) {
            Some(hedge_position) => {
                hedge_position.mark(bar.close);
                (hedge_position.realized_pnl, hedge_position.unrealized_pnl)
            }
            None => (0.0, 0.0),
        };

        let combined_pnl = options_pnl + hedge_realized + hedge_unrealized;

        let (decision, trade_type) = {
            let position = ctx.multi_leg_positions.get(&package_id).expect("iterated above");
            (
                options::evaluate_auto_exit(position, combined_pnl, current_iv, current_gex, signal.regime, bars_held),
                position.trade_type,
            )
        };

        match decision {
            options::AutoExitDecision::Close { reason } => {
                if let Some(position) = ctx.multi_leg_positions.get_mut(&package_id) {
                    position.state = PackageState::Exiting;
                }
                close_package(ctx, package_engine, &package_id, symbol, bar, bar_index, reason)?;
            }
            options::AutoExitDecision::Hold => {
                if trade_type == TradeType::Strangle {
                    let atr = ctx.histories.get(symbol).and_then(|h| h.latest_snapshot()).map(|s| s.atr).unwrap_or(0.0);
                    hedge_long_strangle(ctx, &package_id, symbol, bar, atr, bar_index, options_pnl, combined_pnl);
                }
            }
        }
    }

    let hedge_ids: Vec<String> =
        ctx.hedge_positions.iter().filter(|(_, h)| h.symbol == symbol).map(|(id, _)| id.clone()).collect();

    for package_id in hedge_ids {
        let package_closed = !ctx.multi_leg_positions.contains_key(&package_id);
        let Some(hedge_position) = ctx.hedge_positions.get_mut(&package_id) else { continue };
        let bars_since_open = bar_index.saturating_sub(hedge_position.last_seen_options_open_bar);
        if hedge::is_orphaned(&*hedge_position, package_closed, bars_since_open) {
            let residual = hedge_position.shares;
            if hedge::flatten(hedge_position, bar.close, bar_index).is_some() {
                warn!(package_id = package_id.as_str(), residual_shares = residual, "flattened orphaned hedge");
                ctx.event_sink.emit(
                    Event::OrphanHedgeFlatten { package_id: package_id.clone(), residual_shares: residual },
                    bar.ts,
                );
            }
        }
    }

    Ok(())
}

/// Advances (or opens) the delta hedge for an open long-strangle package and
/// appends one row to its timeline (spec.md §4.9).
#[allow(clippy::too_many_arguments)]
#[instrument(skip_all, fields(package_id, symbol))]
fn hedge_long_strangle(
    ctx: &mut Context,
    package_id: &str,
    symbol: &str,
    bar: &Bar,
    atr: f64,
    bar_index: u64,
    options_pnl: f64,
    combined_pnl: f64,
) {
    let (call_strike, put_strike, quantity) = {
        let position = ctx.multi_leg_positions.get(package_id).expect("caller ensures package is open");
        (
            position.call_fill.as_ref().map(|f| f.strike).unwrap_or(0.0),
            position.put_fill.as_ref().map(|f| f.strike).unwrap_or(0.0),
            position.quantity,
        )
    };

    let net_delta = hedge::net_options_delta(call_strike, put_strike, bar.close, atr, quantity);
    let target = hedge::target_hedge_shares(net_delta);

    let symbol_owned = symbol.to_string();
    let hedge_position = ctx
        .hedge_positions
        .entry(package_id.to_string())
        .or_insert_with(|| HedgePosition::new(package_id.to_string(), symbol_owned, bar_index));
    hedge_position.last_seen_options_open_bar = bar_index;

    let decision = hedge::evaluate_hedge(hedge_position, target, bar.close, bar_index);
    hedge_position.mark(bar.close);

    if let hedge::HedgeDecision::Executed { adj_shares, fill_price } = &decision {
        info!(package_id, adj_shares, fill_price, "adjusted delta hedge");
    }

    let hedge_shares = hedge_position.shares;
    let total_delta = net_delta + hedge_shares / hedge::CONTRACT_MULTIPLIER;
    let note = match &decision {
        hedge::HedgeDecision::Executed { adj_shares, fill_price } => format!("hedged {adj_shares:+.0} sh @ {fill_price:.2}"),
        hedge::HedgeDecision::Skipped { reason } => reason.clone(),
    };

    let row = crate::data::HedgeTimelineRow {
        bar_index,
        ts: bar.ts,
        underlying_price: bar.close,
        net_options_delta: net_delta,
        hedge_shares,
        total_delta,
        options_pnl,
        hedge_pnl: hedge_position.realized_pnl + hedge_position.unrealized_pnl,
        total_pnl: combined_pnl,
        note,
    };
    ctx.hedge_timelines.entry(package_id.to_string()).or_insert_with(hedge::HedgeTimeline::new).push(row);
}

/// Closes a multi-leg package (spec.md §4.8): submits both closing legs,
/// computes the combined P&L per the package's direction sign rule,
/// persists a `MultiLegTrade`, feeds the risk manager, and force-flattens
/// any hedge still attached to this package — hedges are owned by the
/// hedge engine, not the package engine, so the scheduler is responsible
/// for tearing one down when its package goes away (spec.md §3
/// "Ownership").
#[instrument(skip_all, fields(package_id, symbol, reason = reason.as_str()))]
fn close_package(
    ctx: &mut Context,
    package_engine: &PackageEngine,
    package_id: &str,
    symbol: &str,
    bar: &Bar,
    bar_index: u64,
    reason: String,
) -> EngineResult<()> {
    let position = ctx.multi_leg_positions.get(package_id).cloned().expect("caller ensures package is open");

    let call_fill = position.call_fill.clone().expect("open_full implies both legs filled");
    let put_fill = position.put_fill.clone().expect("open_full implies both legs filled");
    let (_, expiry, _, _) = options::parse_occ_symbol(&call_fill.option_symbol)?;

    let (call_exit, put_exit) = package_engine.close_package(&position, symbol, expiry, ctx.broker.as_mut(), bar.ts)?;

    let combined_pnl = match position.direction {
        PackageDirection::Long => {
            (call_exit.total_cost() - call_fill.total_cost()) + (put_exit.total_cost() - put_fill.total_cost())
        }
        PackageDirection::Short => {
            (call_fill.total_cost() - call_exit.total_cost()) + (put_fill.total_cost() - put_exit.total_cost())
        }
    };
    let combined_pnl_pct = if position.net_premium.abs() > f64::EPSILON {
        combined_pnl / position.net_premium.abs() * 100.0
    } else {
        0.0
    };

    ctx.multi_leg_trades.push(MultiLegTrade {
        package_id: position.package_id.clone(),
        symbol: position.symbol.clone(),
        trade_type: position.trade_type,
        direction: position.direction,
        entry_time: position.entry_time,
        exit_time: bar.ts,
        call_entry_price: call_fill.fill_price,
        call_exit_price: call_exit.fill_price,
        put_entry_price: put_fill.fill_price,
        put_exit_price: put_exit.fill_price,
        quantity: position.quantity,
        combined_pnl,
        combined_pnl_pct,
        exit_reason: reason,
    });
    info!(package_id, combined_pnl, combined_pnl_pct, "closed multi-leg package");
    ctx.event_sink.emit(
        Event::PackageClosed {
            package_id: package_id.to_string(),
            call_leg_id: call_fill.option_symbol.clone(),
            put_leg_id: put_fill.option_symbol.clone(),
            call_entry_price: call_fill.fill_price,
            call_exit_price: call_exit.fill_price,
            put_entry_price: put_fill.fill_price,
            put_exit_price: put_exit.fill_price,
            quantity: position.quantity,
            direction: position.direction.to_string(),
        },
        bar.ts,
    );
    ctx.risk_state.record_round_trip(combined_pnl);
    if let Some(closed) = ctx.multi_leg_positions.get_mut(package_id) {
        closed.state = PackageState::Closed;
    }
    ctx.multi_leg_positions.remove(package_id);
    ctx.package_entry_bar_index.remove(package_id);

    if let Some(hedge_position) = ctx.hedge_positions.get_mut(package_id) {
        let residual = hedge_position.shares;
        if hedge::flatten(hedge_position, bar.close, bar_index).is_some() {
            warn!(package_id, residual_shares = residual, "flattened hedge attached to closed package");
            ctx.event_sink.emit(
                Event::OrphanHedgeFlatten { package_id: package_id.to_string(), residual_shares: residual },
                bar.ts,
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{OptionLeg, TradeIntent};
    use crate::enums::{Direction, InstrumentType, OptionType, RegimeType};
    use crate::events::MemoryEventSink;
    use crate::execution::SimulatedBroker;
    use crate::feed::{HistoricalCache, ReplayFeed};
    use crate::scheduler::clock::NoopSleeper;
    use crate::scheduler::config::EngineConfig;
    use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
    use std::collections::BTreeMap;

    /// An empty replay feed: zero trading days configured, so every draw
    /// returns immediately with no bars (no cache entries, no synthetic
    /// fallback).
    fn empty_feed() -> ReplayFeed {
        let d = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        ReplayFeed::new(HistoricalCache::new(), false, None).with_window(d, d)
    }

    fn bar(i: i64, close: f64) -> Bar {
        Bar {
            symbol: "SPY".into(),
            timeframe: "1m".into(),
            ts: Utc::now() + ChronoDuration::minutes(i),
            open: close,
            high: close + 0.3,
            low: close - 0.3,
            close,
            volume: 1000.0,
            synthetic: false,
        }
    }

    fn test_context() -> Context {
        let feed = Box::new(empty_feed());
        let broker = Box::new(SimulatedBroker::new(1_000_000.0, 0.0));
        let sink = Box::new(MemoryEventSink::new("test-run"));
        let mut config = EngineConfig::offline(vec!["SPY".into()]);
        config.testing_mode = true;
        Context::new(config, feed, broker, sink, "test-run".to_string())
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
            confidence: 0.9,
            agent_id: "theta_harvester".into(),
            reason: "test".into(),
            option: Some(OptionLeg {
                option_type: OptionType::Call,
                strike: 100.0,
                expiry: Utc::now() + ChronoDuration::days(14),
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
    fn processing_a_bar_below_warmup_still_bumps_the_bar_counter() {
        let mut ctx = test_context();
        let agents = gamma_only_agents();
        let executor = SingleLegExecutor::new(ExecutionMode::Simulated { slippage_pct: 0.0 });
        let package_engine = PackageEngine::new();
        let weights = AgentWeights::new();

        process_bar(&mut ctx, "SPY", bar(0, 100.0), &agents, &executor, &package_engine, &weights).unwrap();
        assert_eq!(ctx.bars_per_symbol.get("SPY").copied().unwrap_or(0), 1);
        assert!(ctx.histories.get("SPY").unwrap().latest_snapshot().is_none());
    }

    #[test]
    fn close_package_flattens_an_attached_hedge() {
        let mut ctx = test_context();
        let package_engine = PackageEngine::new();
        let b = bar(0, 100.0);
        let intent = short_straddle_intent();

        let outcome = package_engine
            .open_package(&intent, &b, 1.0, 0.3, -0.1, RegimeType::Compression, ctx.broker.as_mut(), ctx.event_sink.as_mut())
            .unwrap();
        let position = match outcome {
            options::PackageOpenOutcome::Filled(p) => p,
            options::PackageOpenOutcome::Broken { .. } => panic!("expected a filled package"),
        };
        let package_id = position.package_id.clone();
        ctx.package_entry_bar_index.insert(package_id.clone(), 1);
        ctx.multi_leg_positions.insert(package_id.clone(), position);
        ctx.hedge_positions.insert(package_id.clone(), {
            let mut h = HedgePosition::new(package_id.clone(), "SPY".to_string(), 1);
            h.shares = -15.0;
            h
        });

        close_package(&mut ctx, &package_engine, &package_id, "SPY", &b, 2, "test close".to_string()).unwrap();

        assert!(!ctx.multi_leg_positions.contains_key(&package_id));
        assert_eq!(ctx.multi_leg_trades.len(), 1);
        assert_eq!(ctx.hedge_positions.get(&package_id).unwrap().shares, 0.0);
    }

    #[test]
    fn end_of_data_stops_after_five_empty_iterations() {
        let feed = Box::new(empty_feed());
        let broker = Box::new(SimulatedBroker::new(1_000_000.0, 0.0));
        let sink = Box::new(MemoryEventSink::new("test-run"));
        let mut config = EngineConfig::offline(vec!["SPY".into()]);
        config.testing_mode = true;
        let mut ctx = Context::new(config, feed, broker, sink, "test-run".to_string());

        let outcome = run(&mut ctx, Box::new(NoopSleeper));
        assert_eq!(outcome.stop_reason, StopReason::EndOfData);
        assert_eq!(outcome.bar_count, 0);
    }

    #[test]
    fn user_stop_halts_before_any_bar_is_processed() {
        let feed = Box::new(empty_feed());
        let broker = Box::new(SimulatedBroker::new(1_000_000.0, 0.0));
        let sink = Box::new(MemoryEventSink::new("test-run"));
        let config = EngineConfig::offline(vec!["SPY".into()]);
        let mut ctx = Context::new(config, feed, broker, sink, "test-run".to_string());
        ctx.kill_switch.trip();

        let outcome = run(&mut ctx, Box::new(NoopSleeper));
        assert_eq!(outcome.stop_reason, StopReason::UserStop);
        assert_eq!(outcome.bar_count, 0);
    }
}
