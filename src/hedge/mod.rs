//! Delta-hedge engine (spec.md §4.9): applies only to open long-strangle
//! packages, computing a banded/frequency-limited hedge against net option
//! delta and logging a per-bar timeline.

mod engine;
mod timeline;

pub use engine::{
    evaluate_hedge, flatten, is_orphaned, net_options_delta, proxy_call_delta, proxy_put_delta,
    target_hedge_shares, HedgeDecision, CONTRACT_MULTIPLIER, ORPHAN_FLATTEN_BARS,
};
pub use timeline::HedgeTimeline;
