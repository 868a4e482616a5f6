//! Effective run configuration (spec.md §6 "Configuration contract").

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, EngineResult};
use crate::feed::EngineMode;
use crate::risk::{RiskConfig, SymbolRiskConfig};

/// Effective run configuration (spec.md §6 "Configuration contract"),
/// loaded from JSON by `src/bin/engine.rs` and written back verbatim to
/// `run_config.json` at startup (spec.md §5 "Determinism").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub symbols: Vec<String>,
    pub mode: EngineMode,
    pub replay_speed: f64,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub strict_data_mode: bool,
    pub testing_mode: bool,
    pub fixed_investment_amount: Option<f64>,
    pub risk: RiskConfig,
    pub symbol_risk: HashMap<String, SymbolRiskConfig>,
    /// `GAMMA_ONLY_TEST_MODE` env override (spec.md §6): restricts the
    /// active agent set to the gamma scalper alone.
    pub gamma_only_test_mode: bool,
    pub starting_equity: f64,
    pub slippage_pct: f64,
}

impl EngineConfig {
    pub fn offline(symbols: Vec<String>) -> Self {
        Self {
            symbols,
            mode: EngineMode::Offline,
            replay_speed: 1.0,
            start_time: None,
            end_time: None,
            strict_data_mode: false,
            testing_mode: false,
            fixed_investment_amount: None,
            risk: RiskConfig::default(),
            symbol_risk: HashMap::new(),
            gamma_only_test_mode: read_gamma_only_env(),
            starting_equity: 100_000.0,
            slippage_pct: 0.05,
        }
    }

    pub fn validate(&self) -> EngineResult<()> {
        if !(1.0..=3000.0).contains(&self.replay_speed) {
            return Err(ConfigError::InvalidReplaySpeed(self.replay_speed).into());
        }
        if self.symbols.is_empty() {
            return Err(ConfigError::MissingKey("symbols").into());
        }
        Ok(())
    }

    pub fn symbol_risk(&self, symbol: &str) -> SymbolRiskConfig {
        self.symbol_risk.get(symbol).cloned().unwrap_or_default()
    }

    /// Applies the `GAMMA_ONLY_TEST_MODE` environment overlay on top of a
    /// file-loaded config (spec.md §2.3 "environment overlays are applied
    /// after file load"). A set env var always wins; an unset one leaves
    /// the file's value untouched.
    pub fn apply_env_overlay(&mut self) {
        if let Ok(v) = std::env::var("GAMMA_ONLY_TEST_MODE") {
            self.gamma_only_test_mode = matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
    }
}

fn read_gamma_only_env() -> bool {
    std::env::var("GAMMA_ONLY_TEST_MODE")
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}
