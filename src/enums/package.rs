use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
pub enum TradeType {
    #[strum(serialize = "straddle")]
    #[serde(rename = "straddle")]
    Straddle,
    #[strum(serialize = "strangle")]
    #[serde(rename = "strangle")]
    Strangle,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
pub enum PackageDirection {
    #[strum(serialize = "long")]
    #[serde(rename = "long")]
    Long,
    #[strum(serialize = "short")]
    #[serde(rename = "short")]
    Short,
}

/// Package lifecycle state machine (spec.md §4.8):
/// `OpenPending -> OpenFull -> Exiting -> Closed`, with `Broken` as a
/// terminal alternate reached from `OpenPending` on leg rejection.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
pub enum PackageState {
    #[strum(serialize = "open_pending")]
    #[serde(rename = "open_pending")]
    OpenPending,
    #[strum(serialize = "open_full")]
    #[serde(rename = "open_full")]
    OpenFull,
    #[strum(serialize = "exiting")]
    #[serde(rename = "exiting")]
    Exiting,
    #[strum(serialize = "closed")]
    #[serde(rename = "closed")]
    Closed,
    #[strum(serialize = "broken")]
    #[serde(rename = "broken")]
    Broken,
}
