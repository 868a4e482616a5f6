//! End-to-end scheduler scenarios driven entirely through the public API:
//! construct a `Context` over a synthetic `ReplayFeed`, run the loop to
//! completion, and check the properties the per-module unit tests can't see
//! on their own (exit codes, bar counters, determinism across two runs).

use chrono::{NaiveDate, TimeZone, Utc};

use regimecore::agents::{Agent, MarketState};
use regimecore::data::{Bar, RegimeSignal, TradeIntent};
use regimecore::enums::RegimeType;
use regimecore::events::{Event, MemoryEventSink};
use regimecore::execution::SimulatedBroker;
use regimecore::feed::{HistoricalCache, ReplayFeed};
use regimecore::scheduler::clock::NoopSleeper;
use regimecore::scheduler::{run, run_with_agents, Context, EngineConfig, KillSwitch, StopReason};

fn config(symbols: &[&str], strict: bool, testing: bool, seed: Option<u64>) -> (EngineConfig, Option<u64>) {
    let mut c = EngineConfig::offline(symbols.iter().map(|s| s.to_string()).collect());
    c.strict_data_mode = strict;
    c.testing_mode = testing;
    c.gamma_only_test_mode = false;
    (c, seed)
}

fn offline_feed(start: NaiveDate, end: NaiveDate, strict: bool, seed: Option<u64>) -> ReplayFeed {
    ReplayFeed::new(HistoricalCache::new(), strict, seed).with_window(start, end)
}

fn run_once(config: EngineConfig, start: NaiveDate, end: NaiveDate, seed: Option<u64>) -> (regimecore::scheduler::RunOutcome, Context) {
    let feed = Box::new(offline_feed(start, end, config.strict_data_mode, seed));
    let broker = Box::new(SimulatedBroker::new(config.starting_equity, config.slippage_pct));
    let sink = Box::new(MemoryEventSink::new("it-run"));
    let mut ctx = Context::new(config, feed, broker, sink, "it-run".to_string());
    let outcome = run(&mut ctx, Box::new(NoopSleeper));
    (outcome, ctx)
}

// An empty cache forces every bar in the window through the synthetic
// fallback, which hands out at most one bar per trading day in the
// calendar-filtered window (feed::ReplayFeed's hole-recovery path advances
// one synthetic bar per call until the day cursor runs out) — so a
// multi-week span is what it takes to exercise more than a couple of bars.
fn a_few_weeks() -> (NaiveDate, NaiveDate) {
    (NaiveDate::from_ymd_opt(2024, 11, 1).unwrap(), NaiveDate::from_ymd_opt(2024, 11, 29).unwrap())
}

#[test]
fn bars_per_symbol_increases_by_exactly_one_per_bar_processed() {
    let (config, seed) = config(&["SPY"], false, true, Some(7));
    let (start, end) = a_few_weeks();
    let (outcome, ctx) = run_once(config, start, end, seed);

    assert!(outcome.bar_count > 0);
    let counted: u64 = ctx.bars_per_symbol.values().copied().sum();
    assert_eq!(counted, outcome.bar_count, "per-symbol counters must sum to the total bar count");
}

#[test]
fn strict_data_mode_halts_immediately_on_a_holiday_window() {
    // spec.md §8 scenario 3: replay configured entirely over Thanksgiving.
    let (config, seed) = config(&["SPY"], true, false, None);
    let thanksgiving = NaiveDate::from_ymd_opt(2024, 11, 28).unwrap();
    let (outcome, ctx) = run_once(config, thanksgiving, thanksgiving, seed);

    assert_eq!(outcome.stop_reason, StopReason::Error);
    assert_eq!(outcome.exit_code, Some(2));
    assert!(outcome.error.is_some());
    assert_eq!(outcome.bar_count, 0);
    assert!(ctx.multi_leg_trades.is_empty());
    assert!(ctx.portfolio.round_trips().is_empty());
}

#[test]
fn testing_mode_off_with_fewer_than_warmup_bars_produces_no_trades() {
    // spec.md §8 "boundary behaviors": warmup under non-testing mode is 15
    // bars. A single-day window over an empty cache synthesizes exactly one
    // bar, which never clears that floor.
    let (config, seed) = config(&["SPY"], false, false, Some(42));
    let day = NaiveDate::from_ymd_opt(2024, 11, 25).unwrap();

    let (outcome, ctx) = run_once(config, day, day, seed);

    assert!(outcome.bar_count < 15);
    assert!(ctx.multi_leg_trades.is_empty());
    assert!(ctx.portfolio.round_trips().is_empty());
}

#[test]
fn replaying_the_same_config_and_seed_reproduces_identical_trades() {
    let (config_a, seed) = config(&["SPY"], false, true, Some(99));
    let (config_b, _) = config(&["SPY"], false, true, Some(99));
    let (start, end) = a_few_weeks();

    let (_outcome_a, ctx_a) = run_once(config_a, start, end, seed);
    let (_outcome_b, ctx_b) = run_once(config_b, start, end, seed);

    let pnls_a: Vec<f64> = ctx_a.portfolio.round_trips().iter().map(|t| t.pnl_abs).collect();
    let pnls_b: Vec<f64> = ctx_b.portfolio.round_trips().iter().map(|t| t.pnl_abs).collect();
    assert_eq!(pnls_a, pnls_b);
    assert_eq!(ctx_a.bars_per_symbol, ctx_b.bars_per_symbol);
}

#[test]
fn kill_switch_trip_is_idempotent() {
    let switch = KillSwitch::new();
    assert!(!switch.is_tripped());
    switch.trip();
    switch.trip();
    assert!(switch.is_tripped());
}

#[test]
fn end_time_reached_stops_the_loop_without_an_error() {
    let (mut config, seed) = config(&["SPY"], false, true, Some(3));
    let (start, end) = a_few_weeks();
    // Each synthetic bar in the fallback path lands one minute after the
    // last, starting at the first trading day's 9:30 open — cut the run off
    // five bars in.
    config.end_time = Some(Utc.with_ymd_and_hms(2024, 11, 1, 9, 35, 0).unwrap());

    let (outcome, _ctx) = run_once(config, start, end, seed);
    assert_eq!(outcome.stop_reason, StopReason::EndTimeReached);
    assert!(outcome.exit_code.is_none());
}

#[test]
fn non_strict_run_over_an_empty_cache_emits_synthetic_bar_fallback_events() {
    // An empty cache over a non-holiday window forces every bar through the
    // synthetic generator, so the fallback marker must fire at least once.
    let (config, seed) = config(&["SPY"], false, true, Some(11));
    let (start, end) = a_few_weeks();
    let (outcome, ctx) = run_once(config, start, end, seed);

    assert!(outcome.bar_count > 0);
    let records = ctx.event_sink.as_any().downcast_ref::<MemoryEventSink>().expect("memory sink").records();
    let fallbacks = records.iter().filter(|r| matches!(r.event, Event::SyntheticBarFallback { .. })).count();
    assert!(fallbacks > 0, "expected at least one synthetic bar fallback event");
}

#[test]
fn strict_mode_over_a_fully_populated_window_emits_zero_synthetic_bar_fallback_events() {
    // spec.md §8: under strict mode, zero SyntheticBarFallback events occur.
    // Feeding a real bar for every trading day in the window (instead of an
    // empty cache) means the replay feed never needs to fall back.
    let mut cache = HistoricalCache::new();
    let day = NaiveDate::from_ymd_opt(2024, 11, 25).unwrap();
    let ts = Utc.from_utc_datetime(&day.and_hms_opt(9, 30, 0).unwrap());
    cache.insert(Bar {
        symbol: "SPY".into(),
        timeframe: "1m".into(),
        ts,
        open: 100.0,
        high: 100.5,
        low: 99.5,
        close: 100.0,
        volume: 1000.0,
        synthetic: false,
    });

    let (config, seed) = config(&["SPY"], true, true, None);
    let feed = Box::new(ReplayFeed::new(cache, config.strict_data_mode, seed).with_window(day, day));
    let broker = Box::new(SimulatedBroker::new(config.starting_equity, config.slippage_pct));
    let sink = Box::new(MemoryEventSink::new("it-run-strict"));
    let mut ctx = Context::new(config, feed, broker, sink, "it-run-strict".to_string());
    let outcome = run(&mut ctx, Box::new(NoopSleeper));

    assert_ne!(outcome.stop_reason, StopReason::Error);
    let records = ctx.event_sink.as_any().downcast_ref::<MemoryEventSink>().expect("memory sink").records();
    let fallbacks = records.iter().filter(|r| matches!(r.event, Event::SyntheticBarFallback { .. })).count();
    assert_eq!(fallbacks, 0);
}

#[derive(Debug)]
struct AlwaysPanicsAgent;

impl Agent for AlwaysPanicsAgent {
    fn id(&self) -> &str {
        "always_panics"
    }

    fn active_regimes(&self) -> &[RegimeType] {
        &[RegimeType::Trend, RegimeType::MeanReversion, RegimeType::Compression, RegimeType::Expansion]
    }

    fn min_confidence(&self) -> f64 {
        0.0
    }

    fn evaluate(&self, _signal: &RegimeSignal, _state: &MarketState) -> Vec<TradeIntent> {
        panic!("stub agent always fails");
    }
}

#[test]
fn all_agents_failing_on_one_bar_halts_the_run_with_no_further_bars() {
    // spec.md §8 scenario 4: every enabled agent fails on a bar -> the
    // engine emits AllAgentsFailed, stops with StopReason::Error, and
    // processes no further bars.
    let (config, seed) = config(&["SPY"], false, true, Some(5));
    let (start, end) = a_few_weeks();
    let feed = Box::new(offline_feed(start, end, config.strict_data_mode, seed));
    let broker = Box::new(SimulatedBroker::new(config.starting_equity, config.slippage_pct));
    let sink = Box::new(MemoryEventSink::new("it-run-all-fail"));
    let mut ctx = Context::new(config, feed, broker, sink, "it-run-all-fail".to_string());

    let agents: Vec<Box<dyn Agent>> = vec![Box::new(AlwaysPanicsAgent)];
    let outcome = run_with_agents(&mut ctx, Box::new(NoopSleeper), agents);

    assert_eq!(outcome.stop_reason, StopReason::Error);
    assert_eq!(outcome.exit_code, Some(3));
    assert_eq!(outcome.bar_count, 0);
    let records = ctx.event_sink.as_any().downcast_ref::<MemoryEventSink>().expect("memory sink").records();
    assert!(records.iter().any(|r| matches!(r.event, Event::AllAgentsFailed { .. })));
}

