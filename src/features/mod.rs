//! Feature computation and regime classification (spec.md §4.3): turns
//! trailing bar history into indicator snapshots, then scores those
//! snapshots against the four regime definitions.

mod classifier;
mod compute;
mod indicators;
mod market_state;

pub use classifier::classify;
pub use compute::FeatureEngine;
pub use indicators::{Adx, Atr, Ema, RegressionChannel, Rsi, StreamingIndicator, Vwap, hurst_exponent};
pub use market_state::{dealer_gamma_proxy, iv_percentile};
