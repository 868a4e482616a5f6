//! Meta-policy controller (spec.md §4.5): collect -> filter -> score ->
//! arbitrate -> finalize. Reduces the union of every agent's intents to at
//! most one `FinalTradeIntent` per symbol per bar.

use std::collections::HashMap;

use crate::data::{FinalTradeIntent, RegimeSignal, TradeIntent};
use crate::enums::{RegimeType, VolatilityLevel};

/// Per-agent weight, adapted elsewhere from a rolling performance memory
/// (spec.md §4.5: "not in scope to re-derive here; treat as supplied").
#[derive(Debug, Clone, Default)]
pub struct AgentWeights(HashMap<String, f64>);

impl AgentWeights {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    pub fn set(&mut self, agent_id: impl Into<String>, weight: f64) {
        self.0.insert(agent_id.into(), weight);
    }

    pub fn get(&self, agent_id: &str) -> f64 {
        *self.0.get(agent_id).unwrap_or(&1.0)
    }
}

/// Fraction of the top score within which the runner-up gets blended in
/// rather than discarded (spec.md §4.5 stage 4 "blend threshold").
const BLEND_THRESHOLD_PCT: f64 = 0.10;

fn regime_fit(intent: &TradeIntent, signal: &RegimeSignal) -> f64 {
    match (signal.regime, intent.is_option()) {
        (RegimeType::Trend, false) => 1.0,
        (RegimeType::Expansion, false) => 0.9,
        (RegimeType::MeanReversion, false) => 0.8,
        (RegimeType::Trend, true) | (RegimeType::Expansion, true) => 0.85,
        (RegimeType::Compression, true) => 0.85,
        _ => 0.5,
    }
}

fn volatility_fit(volatility: VolatilityLevel) -> f64 {
    match volatility {
        VolatilityLevel::Low => 0.7,
        VolatilityLevel::Medium => 1.0,
        VolatilityLevel::High => 0.9,
        VolatilityLevel::Extreme => 0.7,
    }
}

fn score_intent(intent: &TradeIntent, signal: &RegimeSignal, weights: &AgentWeights) -> f64 {
    weights.get(&intent.agent_id) * regime_fit(intent, signal) * volatility_fit(signal.volatility) * intent.confidence
}

/// Runs the full collect/filter/score/arbitrate/finalize pipeline for one
/// symbol's intents on one bar.
pub fn arbitrate(
    intents: Vec<TradeIntent>,
    signal: &RegimeSignal,
    confidence_floor: f64,
    testing_mode: bool,
    weights: &AgentWeights,
) -> Option<FinalTradeIntent> {
    // Stage 2: filter.
    let filtered: Vec<TradeIntent> = intents
        .into_iter()
        .filter(|i| testing_mode || regime_applies(i, signal.regime))
        .filter(|i| i.confidence >= confidence_floor)
        .collect();

    let filtered = drop_opposite_direction_conflicts(filtered);
    if filtered.is_empty() {
        return None;
    }

    // Stage 3: score.
    let mut scored: Vec<(TradeIntent, f64)> = filtered
        .into_iter()
        .map(|i| {
            let s = score_intent(&i, signal, weights);
            (i, s)
        })
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    // Stage 4: arbitrate.
    let (top, top_score) = scored.remove(0);
    let runner_up = scored.into_iter().next();

    match runner_up {
        Some((runner, runner_score))
            if top_score > 0.0 && (top_score - runner_score) / top_score <= BLEND_THRESHOLD_PCT
                && top.direction == runner.direction
                && top.instrument_type == runner.instrument_type =>
        {
            let total_weight = top_score + runner_score;
            let blended_delta = if total_weight.abs() < f64::EPSILON {
                top.position_delta
            } else {
                (top.position_delta * top_score + runner.position_delta * runner_score) / total_weight
            };
            let blend_ids = vec![top.agent_id.clone(), runner.agent_id.clone()];
            let mut blended = top;
            blended.position_delta = blended_delta;
            blended.reason = format!("blended: {}", blend_ids.join("+"));
            Some(FinalTradeIntent {
                intent: blended,
                score: top_score,
                blended_from: Some(blend_ids),
            })
        }
        _ => Some(FinalTradeIntent {
            intent: top,
            score: top_score,
            blended_from: None,
        }),
    }
}

fn regime_applies(intent: &TradeIntent, regime: RegimeType) -> bool {
    intent
        .metadata
        .get("required_regime")
        .map(|r| r == regime.to_string().as_str())
        .unwrap_or(true)
}

/// Keeps only the highest-confidence intent among opposite-direction
/// conflicts on the same symbol (spec.md §4.5 stage 2).
fn drop_opposite_direction_conflicts(intents: Vec<TradeIntent>) -> Vec<TradeIntent> {
    let mut by_symbol: HashMap<String, Vec<TradeIntent>> = HashMap::new();
    for intent in intents {
        by_symbol.entry(intent.symbol.clone()).or_default().push(intent);
    }

    let mut out = Vec::new();
    for (_, mut group) in by_symbol {
        let directions: std::collections::HashSet<_> = group.iter().map(|i| i.direction).collect();
        if directions.len() <= 1 {
            out.append(&mut group);
            continue;
        }
        group.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));
        let winning_direction = group[0].direction;
        out.extend(group.into_iter().filter(|i| i.direction == winning_direction));
    }
    out
}
