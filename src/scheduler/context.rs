//! Single-owner engine state (spec.md §5 "Shared resources"): the
//! portfolio, multi-leg store, and hedge store all live here with no
//! interior mutability; the kill-switch is the one piece of state shared
//! with the outside world, via an atomic flag.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::data::{FeatureHistory, HedgePosition, MultiLegPosition, MultiLegTrade};
use crate::events::EventSink;
use crate::execution::{OptionBroker, Portfolio};
use crate::feed::DataFeed;
use crate::features::FeatureEngine;
use crate::hedge::HedgeTimeline;
use crate::risk::RiskState;

use super::config::EngineConfig;

/// Single-writer (risk manager / external API) / single-reader (loop)
/// kill-switch (spec.md §5).
#[derive(Debug, Clone, Default)]
pub struct KillSwitch(Arc<AtomicBool>);

impl KillSwitch {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn trip(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_tripped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct Context {
    pub config: EngineConfig,
    pub feed: Box<dyn DataFeed>,
    pub broker: Box<dyn OptionBroker>,
    pub event_sink: Box<dyn EventSink>,
    pub feature_engine: FeatureEngine,
    pub histories: HashMap<String, FeatureHistory>,
    pub portfolio: Portfolio,
    pub multi_leg_positions: HashMap<String, MultiLegPosition>,
    pub multi_leg_trades: Vec<MultiLegTrade>,
    pub hedge_positions: HashMap<String, HedgePosition>,
    pub hedge_timelines: HashMap<String, HedgeTimeline>,
    pub risk_state: RiskState,
    pub kill_switch: KillSwitch,
    pub bars_per_symbol: HashMap<String, u64>,
    pub last_bar_time: Option<DateTime<Utc>>,
    pub run_id: String,
    /// Bar index (per symbol, from `bars_per_symbol`) a multi-leg package
    /// was opened at, keyed by `package_id`; feeds `bars_held` into
    /// `options::evaluate_auto_exit`.
    pub package_entry_bar_index: HashMap<String, u64>,
}

impl Context {
    pub fn new(
        config: EngineConfig,
        feed: Box<dyn DataFeed>,
        broker: Box<dyn OptionBroker>,
        event_sink: Box<dyn EventSink>,
        run_id: String,
    ) -> Self {
        let starting_equity = config.starting_equity;
        Self {
            config,
            feed,
            broker,
            event_sink,
            feature_engine: FeatureEngine::new(),
            histories: HashMap::new(),
            portfolio: Portfolio::new(),
            multi_leg_positions: HashMap::new(),
            multi_leg_trades: Vec::new(),
            hedge_positions: HashMap::new(),
            hedge_timelines: HashMap::new(),
            risk_state: RiskState::new(starting_equity),
            kill_switch: KillSwitch::new(),
            bars_per_symbol: HashMap::new(),
            last_bar_time: None,
            run_id,
            package_entry_bar_index: HashMap::new(),
        }
    }

    pub fn history_for(&mut self, symbol: &str) -> &mut FeatureHistory {
        self.histories.entry(symbol.to_string()).or_default()
    }

    pub fn bump_bar_count(&mut self, symbol: &str) -> u64 {
        let counter = self.bars_per_symbol.entry(symbol.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }
}
