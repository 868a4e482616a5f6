use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
pub enum OrderSide {
    #[strum(serialize = "buy")]
    #[serde(rename = "buy")]
    Buy,
    #[strum(serialize = "sell")]
    #[serde(rename = "sell")]
    Sell,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
pub enum OrderType {
    #[strum(serialize = "market")]
    #[serde(rename = "market")]
    Market,
    #[strum(serialize = "limit")]
    #[serde(rename = "limit")]
    Limit,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
pub enum LegRole {
    #[strum(serialize = "call")]
    #[serde(rename = "call")]
    Call,
    #[strum(serialize = "put")]
    #[serde(rename = "put")]
    Put,
}
