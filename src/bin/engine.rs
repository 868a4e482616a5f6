//! Minimal replay entry point (spec.md §2.5): loads an `EngineConfig` from
//! a JSON file, runs the scheduler to completion against an offline replay
//! feed, and prints the terminal `LiveStatus`. The HTTP dashboard and live
//! broker wiring referenced elsewhere in the design stay external to this
//! crate; this binary only drives the deterministic replay path.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Utc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use regimecore::events::JsonlEventSink;
use regimecore::execution::SimulatedBroker;
use regimecore::feed::{EngineMode, HistoricalCache, ReplayFeed};
use regimecore::scheduler::{Context, EngineConfig, LiveStatus, RealSleeper};

fn main() -> ExitCode {
    init_tracing();

    let config_path = match std::env::args().nth(1) {
        Some(p) => PathBuf::from(p),
        None => {
            eprintln!("usage: engine <config.json>");
            return ExitCode::from(2);
        }
    };

    let mut config = match load_config(&config_path) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "failed to load config");
            return ExitCode::from(2);
        }
    };
    config.apply_env_overlay();

    if let Err(e) = config.validate() {
        error!(error = %e, "invalid config");
        return ExitCode::from(2);
    }
    if config.mode == EngineMode::Live {
        error!("live mode requires a broker-connected poller this binary does not implement");
        return ExitCode::from(1);
    }

    let run_id = run_id_for(&config);
    let run_label = config.symbols.join("_");
    let artifacts_dir = PathBuf::from("phase1_results").join(&run_label).join(&run_id);
    if let Err(e) = fs::create_dir_all(&artifacts_dir) {
        error!(error = %e, "failed to create artifacts directory");
        return ExitCode::from(1);
    }
    if let Err(e) = write_run_config(&artifacts_dir, &config) {
        error!(error = %e, "failed to write run_config.json");
        return ExitCode::from(1);
    }

    let sink = match JsonlEventSink::create(artifacts_dir.join("events.jsonl"), run_id.clone()) {
        Ok(s) => Box::new(s),
        Err(e) => {
            error!(error = %e, "failed to open event log");
            return ExitCode::from(1);
        }
    };

    let start = config.start_time.map(|t| t.date_naive()).unwrap_or_else(|| Utc::now().date_naive());
    let end = config.end_time.map(|t| t.date_naive()).unwrap_or(start);
    let seed = synthetic_seed_for(&run_id);
    let feed = Box::new(
        ReplayFeed::new(HistoricalCache::new(), config.strict_data_mode, Some(seed)).with_window(start, end),
    );
    let broker = Box::new(SimulatedBroker::new(config.starting_equity, config.slippage_pct));

    info!(run_id = %run_id, symbols = ?config.symbols, "starting replay run");

    let mut ctx = Context::new(config, feed, broker, sink, run_id);
    let outcome = regimecore::scheduler::run(&mut ctx, Box::new(RealSleeper));

    let status = LiveStatus::new(
        EngineMode::Offline,
        ctx.config.symbols.clone(),
        ctx.bars_per_symbol.clone(),
        ctx.last_bar_time,
        0.0,
        Some(&outcome),
    );
    match serde_json::to_string_pretty(&status) {
        Ok(json) => println!("{json}"),
        Err(e) => error!(error = %e, "failed to render final status"),
    }

    if let Some(reason) = &outcome.error {
        error!(stop_reason = ?outcome.stop_reason, error = %reason, "run ended with a fault");
    } else {
        info!(stop_reason = ?outcome.stop_reason, bar_count = outcome.bar_count, "run completed");
    }

    ExitCode::from(outcome.exit_code.unwrap_or(0))
}

fn load_config(path: &PathBuf) -> std::io::Result<EngineConfig> {
    let raw = fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

fn write_run_config(dir: &PathBuf, config: &EngineConfig) -> std::io::Result<()> {
    let json = serde_json::to_vec_pretty(config)?;
    fs::write(dir.join("run_config.json"), json)
}

/// Deterministic `run_id` from the effective config (spec.md §5
/// "Determinism"): same config, same bytes, same hash.
fn run_id_for(config: &EngineConfig) -> String {
    let bytes = serde_json::to_vec(config).expect("EngineConfig always serializes");
    blake3::hash(&bytes).to_hex().to_string()
}

fn synthetic_seed_for(run_id: &str) -> u64 {
    let digest = blake3::hash(run_id.as_bytes());
    u64::from_le_bytes(digest.as_bytes()[0..8].try_into().expect("blake3 digest is 32 bytes"))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).with_target(false).init();
}
