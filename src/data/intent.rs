use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{Direction, InstrumentType, OptionType};

/// Option-specific fields carried on a `TradeIntent` when
/// `instrument_type == InstrumentType::Option`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OptionLeg {
    pub option_type: OptionType,
    pub strike: f64,
    pub expiry: DateTime<Utc>,
    pub call_symbol: Option<String>,
    pub put_symbol: Option<String>,
    pub total_credit: Option<f64>,
    pub total_debit: Option<f64>,
    /// Set when the broker does not permit naked selling on the current
    /// account; in that case orders are never submitted, only synthetic
    /// fills recorded (spec.md §4.8).
    pub sim_only: bool,
}

/// An agent's proposal for a position change on a symbol (spec.md §3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TradeIntent {
    pub symbol: String,
    pub instrument_type: InstrumentType,
    pub direction: Direction,
    /// Signed size: positive extends/opens long, negative extends/opens
    /// short, relative to `direction`.
    pub position_delta: f64,
    pub confidence: f64,
    pub agent_id: String,
    pub reason: String,
    pub option: Option<OptionLeg>,
    pub metadata: std::collections::BTreeMap<String, String>,
}

impl TradeIntent {
    pub fn is_option(&self) -> bool {
        matches!(self.instrument_type, InstrumentType::Option) && self.option.is_some()
    }

    /// True when this intent carries both legs of a multi-leg package
    /// (straddle/strangle), identified by both `call_symbol` and
    /// `put_symbol` being set.
    pub fn is_multi_leg(&self) -> bool {
        self.option
            .as_ref()
            .map(|o| o.call_symbol.is_some() && o.put_symbol.is_some())
            .unwrap_or(false)
    }
}

/// The single winning intent per symbol per bar, after meta-policy
/// arbitration (spec.md §4.5 stage 5).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FinalTradeIntent {
    pub intent: TradeIntent,
    pub score: f64,
    /// Present when this intent was produced by blending the top two
    /// candidates (spec.md §9 open question on blend fraction).
    pub blended_from: Option<Vec<String>>,
}
