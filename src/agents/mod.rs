//! Trading agents (spec.md §4.4): independent, stateless proposers of
//! `TradeIntent`s. Kept behind a trait object so the scheduler can hold a
//! `Vec<Box<dyn Agent>>` without knowing concrete agent types — composition
//! over inheritance, per spec.md §REDESIGN FLAGS.

mod directional_options;
mod gamma_scalper;
mod mean_reversion;
mod theta_harvester;
mod trend;
mod volatility;

pub use directional_options::DirectionalOptionsAgent;
pub use gamma_scalper::GammaScalperAgent;
pub use mean_reversion::MeanReversionAgent;
pub use theta_harvester::ThetaHarvesterAgent;
pub use trend::TrendAgent;
pub use volatility::VolatilityAgent;

use crate::data::{Bar, FeatureSnapshot, Position, RegimeSignal, TradeIntent};
use crate::enums::RegimeType;

/// Everything an agent needs to evaluate one symbol on one bar, beyond its
/// own configured parameters.
#[derive(Debug, Clone, Copy)]
pub struct MarketState<'a> {
    pub bar: &'a Bar,
    pub snapshot: &'a FeatureSnapshot,
    pub positions: &'a [Position],
    pub testing_mode: bool,
    /// Proxy IV percentile in `[0, 100]`, derived from `iv_proxy` history by
    /// the caller (spec.md §4.4: "filtered by ... IV percentile").
    pub iv_percentile: f64,
    /// Proxy for dealer gamma exposure; negative means dealers are short
    /// gamma (spec.md §4.4 Gamma Scalper trigger).
    pub dealer_gamma_proxy: f64,
    /// True when this symbol already has an open multi-leg package
    /// (spec.md §4.8's implicit one-package-per-symbol lifecycle). The two
    /// options agents gate on this directly rather than relying on the
    /// controller or risk manager to notice after the fact.
    pub has_open_package: bool,
}

/// Agent contract (spec.md §4.4): `evaluate(signal, market_state) ->
/// Vec<TradeIntent>`. Implementations must be pure with respect to their
/// own parameters — no mutation of shared state.
pub trait Agent: std::fmt::Debug {
    fn id(&self) -> &str;

    /// Regimes in which this agent is willing to propose anything.
    fn active_regimes(&self) -> &[RegimeType];

    /// Minimum regime-signal confidence this agent requires.
    fn min_confidence(&self) -> f64;

    fn evaluate(&self, signal: &RegimeSignal, state: &MarketState) -> Vec<TradeIntent>;

    /// Gate shared by every concrete agent: wrong regime or confidence
    /// below floor means "propose nothing" before agent-specific logic
    /// runs. `testing_mode` bypasses the regime check, per spec.md §4.1.
    fn is_active(&self, signal: &RegimeSignal, testing_mode: bool) -> bool {
        let regime_ok = testing_mode || self.active_regimes().contains(&signal.regime);
        let confidence_floor = if testing_mode { 0.05 } else { self.min_confidence() };
        regime_ok && signal.confidence >= confidence_floor
    }
}

impl Agent for Box<dyn Agent> {
    fn id(&self) -> &str {
        (**self).id()
    }

    fn active_regimes(&self) -> &[RegimeType] {
        (**self).active_regimes()
    }

    fn min_confidence(&self) -> f64 {
        (**self).min_confidence()
    }

    fn evaluate(&self, signal: &RegimeSignal, state: &MarketState) -> Vec<TradeIntent> {
        (**self).evaluate(signal, state)
    }
}

/// The default enabled-agent set (spec.md §4.4 catalog), in insertion
/// order — this order also governs same-bar tie-breaking elsewhere.
pub fn default_agents() -> Vec<Box<dyn Agent>> {
    vec![
        Box::new(TrendAgent::default()),
        Box::new(MeanReversionAgent::default()),
        Box::new(VolatilityAgent::default()),
        Box::new(DirectionalOptionsAgent::default()),
        Box::new(ThetaHarvesterAgent::default()),
        Box::new(GammaScalperAgent::default()),
    ]
}

/// `GAMMA_ONLY_TEST_MODE` restricts the active set to the gamma scalper
/// alone (spec.md §6), independent of `testing_mode`.
pub fn gamma_only_agents() -> Vec<Box<dyn Agent>> {
    vec![Box::new(GammaScalperAgent::default())]
}
