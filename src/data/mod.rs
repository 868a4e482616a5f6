//! Core data model (spec.md §3): bars, feature snapshots, regime signals,
//! trade intents, positions, round-trip trades, multi-leg packages, and
//! hedge positions. These types carry no behavior beyond their own
//! invariants; the engines that mutate them live in sibling modules.

mod bar;
mod feature;
mod hedge;
mod intent;
mod leg_fill;
mod multi_leg;
mod position;
mod regime_signal;
mod round_trip;

pub use bar::{Bar, BarKey};
pub use feature::{FeatureHistory, FeatureSnapshot, FvgRange};
pub use hedge::{HedgeTimelineRow, HedgePosition};
pub use intent::{FinalTradeIntent, OptionLeg, TradeIntent};
pub use leg_fill::{LegFill, CONTRACT_MULTIPLIER};
pub use multi_leg::{package_id, MultiLegPosition, MultiLegTrade};
pub use position::Position;
pub use regime_signal::{RegimeSignal, CONFIDENCE_FLOOR, CONFIDENCE_FLOOR_TESTING};
pub use round_trip::RoundTripTrade;
