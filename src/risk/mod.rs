//! Risk manager (spec.md §4.6): per-trade sizing plus global limits. A
//! veto never raises an error — it turns the intent into a no-op and emits
//! a `RiskBlock` event (see `crate::events`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::{FinalTradeIntent, Position};
use crate::enums::VolatilityLevel;

/// Config-driven per-symbol sizing overrides (spec.md §6 `symbols[*]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SymbolRiskConfig {
    pub risk_per_trade_pct: f64,
    pub take_profit_pct: Option<f64>,
    pub stop_loss_pct: Option<f64>,
}

impl Default for SymbolRiskConfig {
    fn default() -> Self {
        Self {
            risk_per_trade_pct: 1.0,
            take_profit_pct: None,
            stop_loss_pct: None,
        }
    }
}

/// Global risk configuration (spec.md §6 `risk`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub max_daily_loss_pct: f64,
    pub max_loss_streak: u32,
    pub cvar_lookback: usize,
    pub kill_switch: bool,
    pub fixed_investment_amount: Option<f64>,
    pub max_packages_per_minute_per_strategy: u32,
    pub max_packages_per_hour_global: u32,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_daily_loss_pct: 3.0,
            max_loss_streak: 5,
            cvar_lookback: 20,
            kill_switch: false,
            fixed_investment_amount: None,
            max_packages_per_minute_per_strategy: 5,
            max_packages_per_hour_global: 30,
        }
    }
}

/// Mutable, single-owner risk state tracked across the session (spec.md
/// §5 "single-owner"): daily PnL, consecutive-loss streak, emergency stop,
/// and the sliding windows used for order-rate limiting.
#[derive(Debug, Default)]
pub struct RiskState {
    pub daily_pnl: f64,
    pub account_equity: f64,
    pub consecutive_losses: u32,
    pub emergency_stop: bool,
    recent_package_times: Vec<(String, DateTime<Utc>)>,
    global_package_times: Vec<DateTime<Utc>>,
    realized_pnl_history: Vec<f64>,
}

impl RiskState {
    pub fn new(starting_equity: f64) -> Self {
        Self {
            account_equity: starting_equity,
            ..Default::default()
        }
    }

    pub fn record_round_trip(&mut self, pnl_abs: f64) {
        self.daily_pnl += pnl_abs;
        self.account_equity += pnl_abs;
        if pnl_abs < 0.0 {
            self.consecutive_losses += 1;
        } else {
            self.consecutive_losses = 0;
        }
        self.realized_pnl_history.push(pnl_abs);
    }

    pub fn reset_daily(&mut self) {
        self.daily_pnl = 0.0;
    }

    fn cvar(&self, lookback: usize) -> f64 {
        if self.realized_pnl_history.is_empty() {
            return 0.0;
        }
        let take = self.realized_pnl_history.len().min(lookback);
        let mut tail: Vec<f64> = self.realized_pnl_history[self.realized_pnl_history.len() - take..].to_vec();
        tail.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let worst_n = (tail.len() as f64 * 0.2).ceil().max(1.0) as usize;
        tail.into_iter().take(worst_n).sum::<f64>() / worst_n as f64
    }
}

/// Outcome of running an intent through the risk manager.
#[derive(Debug, Clone)]
pub enum RiskDecision {
    Approved(FinalTradeIntent),
    Blocked { reason: String },
}

/// Pure function (besides rate-limit bookkeeping) applying spec.md §4.6's
/// sizing and veto rules. `is_exit` intents bypass the entry-blocking
/// global limits, per "existing exit intents are still allowed".
pub fn evaluate(
    mut final_intent: FinalTradeIntent,
    state: &mut RiskState,
    config: &RiskConfig,
    symbol_config: &SymbolRiskConfig,
    open_positions: &[Position],
    open_package_quantity: f64,
    volatility: VolatilityLevel,
    is_exit: bool,
    now: DateTime<Utc>,
) -> RiskDecision {
    if config.kill_switch {
        return RiskDecision::Blocked { reason: "kill_switch active".to_string() };
    }

    if !is_exit {
        if state.emergency_stop {
            return RiskDecision::Blocked { reason: "emergency_stop: new entries blocked".to_string() };
        }
        if config.max_daily_loss_pct > 0.0
            && state.account_equity > 0.0
            && -state.daily_pnl / state.account_equity * 100.0 >= config.max_daily_loss_pct
        {
            state.emergency_stop = true;
            return RiskDecision::Blocked { reason: "daily loss cap breached".to_string() };
        }
        if state.consecutive_losses >= config.max_loss_streak {
            return RiskDecision::Blocked { reason: "max consecutive losses breached".to_string() };
        }
        if state.cvar(config.cvar_lookback) < -(state.account_equity * symbol_config.risk_per_trade_pct / 100.0 * 3.0) {
            return RiskDecision::Blocked { reason: "cvar tail bound breached".to_string() };
        }

        let one_minute_ago = now - chrono::Duration::minutes(1);
        let one_hour_ago = now - chrono::Duration::hours(1);
        let agent_id = final_intent.intent.agent_id.clone();

        state.recent_package_times.retain(|(_, t)| *t >= one_minute_ago);
        state.global_package_times.retain(|t| *t >= one_hour_ago);

        let per_strategy_count = state
            .recent_package_times
            .iter()
            .filter(|(id, _)| *id == agent_id)
            .count() as u32;
        if per_strategy_count >= config.max_packages_per_minute_per_strategy {
            return RiskDecision::Blocked { reason: format!("order-rate limit: {agent_id} exceeded per-minute cap") };
        }
        if state.global_package_times.len() as u32 >= config.max_packages_per_hour_global {
            return RiskDecision::Blocked { reason: "order-rate limit: global per-hour cap exceeded".to_string() };
        }

        state.recent_package_times.push((agent_id, now));
        state.global_package_times.push(now);
    }

    // Per-trade sizing.
    let vol_cap = volatility_bucket_cap(volatility);
    let mut sized = final_intent.intent.position_delta.abs().min(vol_cap);

    if let Some(fixed) = config.fixed_investment_amount {
        sized = fixed;
    } else {
        let risk_cap = state.account_equity * symbol_config.risk_per_trade_pct / 100.0;
        sized = sized.min(risk_cap.max(1.0));
    }

    let already_exposed: f64 =
        open_positions.iter().map(|p| p.quantity.abs()).sum::<f64>() + open_package_quantity.abs();
    if already_exposed + sized > vol_cap * 4.0 {
        sized = (vol_cap * 4.0 - already_exposed).max(0.0);
    }
    if sized <= 0.0 && !is_exit {
        return RiskDecision::Blocked { reason: "sizing collapsed to zero".to_string() };
    }

    let original_sign = if final_intent.intent.position_delta < 0.0 { -1.0 } else { 1.0 };
    final_intent.intent.position_delta = sized * original_sign;
    RiskDecision::Approved(final_intent)
}

fn volatility_bucket_cap(volatility: VolatilityLevel) -> f64 {
    match volatility {
        VolatilityLevel::Low => 300.0,
        VolatilityLevel::Medium => 200.0,
        VolatilityLevel::High => 120.0,
        VolatilityLevel::Extreme => 60.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TradeIntent;
    use crate::enums::{Direction, InstrumentType};
    use std::collections::BTreeMap;

    fn final_intent(confidence: f64, delta: f64) -> FinalTradeIntent {
        FinalTradeIntent {
            intent: TradeIntent {
                symbol: "SPY".into(),
                instrument_type: InstrumentType::Stock,
                direction: Direction::Long,
                position_delta: delta,
                confidence,
                agent_id: "trend".into(),
                reason: "test".into(),
                option: None,
                metadata: BTreeMap::new(),
            },
            score: confidence,
            blended_from: None,
        }
    }

    #[test]
    fn kill_switch_blocks_everything() {
        let mut state = RiskState::new(100_000.0);
        let config = RiskConfig { kill_switch: true, ..Default::default() };
        let decision = evaluate(
            final_intent(0.8, 100.0),
            &mut state,
            &config,
            &SymbolRiskConfig::default(),
            &[],
            0.0,
            VolatilityLevel::Medium,
            false,
            Utc::now(),
        );
        assert!(matches!(decision, RiskDecision::Blocked { .. }));
    }

    #[test]
    fn emergency_stop_allows_exits_but_blocks_entries() {
        let mut state = RiskState::new(100_000.0);
        state.emergency_stop = true;
        let config = RiskConfig::default();
        let blocked = evaluate(
            final_intent(0.8, 100.0),
            &mut state,
            &config,
            &SymbolRiskConfig::default(),
            &[],
            0.0,
            VolatilityLevel::Medium,
            false,
            Utc::now(),
        );
        assert!(matches!(blocked, RiskDecision::Blocked { .. }));

        let mut state2 = RiskState::new(100_000.0);
        state2.emergency_stop = true;
        let approved = evaluate(
            final_intent(0.8, 100.0),
            &mut state2,
            &config,
            &SymbolRiskConfig::default(),
            &[],
            0.0,
            VolatilityLevel::Medium,
            true,
            Utc::now(),
        );
        assert!(matches!(approved, RiskDecision::Approved(_)));
    }

    #[test]
    fn sizing_respects_volatility_bucket_cap() {
        let mut state = RiskState::new(1_000_000.0);
        let config = RiskConfig::default();
        let decision = evaluate(
            final_intent(0.8, 10_000.0),
            &mut state,
            &config,
            &SymbolRiskConfig { risk_per_trade_pct: 100.0, ..Default::default() },
            &[],
            0.0,
            VolatilityLevel::Extreme,
            false,
            Utc::now(),
        );
        match decision {
            RiskDecision::Approved(fi) => assert!(fi.intent.position_delta <= 60.0),
            RiskDecision::Blocked { .. } => panic!("expected approval"),
        }
    }

    #[test]
    fn consecutive_loss_streak_blocks_new_entries() {
        let mut state = RiskState::new(100_000.0);
        state.consecutive_losses = 5;
        let config = RiskConfig::default();
        let decision = evaluate(
            final_intent(0.8, 100.0),
            &mut state,
            &config,
            &SymbolRiskConfig::default(),
            &[],
            0.0,
            VolatilityLevel::Medium,
            false,
            Utc::now(),
        );
        assert!(matches!(decision, RiskDecision::Blocked { .. }));
    }

    #[test]
    fn open_package_quantity_counts_toward_exposure_cap() {
        let mut state = RiskState::new(1_000_000.0);
        let config = RiskConfig::default();
        let decision = evaluate(
            final_intent(0.8, 250.0),
            &mut state,
            &config,
            &SymbolRiskConfig { risk_per_trade_pct: 100.0, ..Default::default() },
            &[],
            1_150.0,
            VolatilityLevel::Low,
            false,
            Utc::now(),
        );
        match decision {
            RiskDecision::Approved(fi) => assert!(fi.intent.position_delta <= 50.0),
            RiskDecision::Blocked { .. } => panic!("expected approval with a clamped size"),
        }
    }
}
