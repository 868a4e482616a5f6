//! Tagged sum types for every classification used across the engine.
//!
//! The source system this engine replaces treated several of these as plain
//! strings in some call sites and as enums in others, producing silent
//! failures on `.value`-style access when the two drifted apart. Every type
//! here is a real Rust enum with an explicit `as_str`/`from_str` pair backed
//! by `strum`, so the tag and its string form can never desynchronize: there
//! is only one representation, and both directions go through it.

mod instrument;
mod order;
mod package;
mod regime;

pub use instrument::{Direction, InstrumentType, OptionType};
pub use order::{LegRole, OrderSide, OrderType};
pub use package::{PackageDirection, PackageState, TradeType};
pub use regime::{Bias, RegimeType, TrendDirection, VolatilityLevel};

use crate::error::DataError;
use std::str::FromStr;
use std::fmt::Display;
use strum::EnumString;
use strum_macros::Display as StrumDisplay;

/// Helper trait giving every tagged enum in this module the same two
/// entry points. Implemented via a blanket impl over `Display + FromStr`
/// so each enum only has to derive `strum::Display` / `strum::EnumString`.
pub trait TaggedEnum: Sized {
    const TYPE_NAME: &'static str;

    fn as_str(&self) -> String;
    fn from_str_tagged(value: &str) -> Result<Self, DataError>;
}

impl<T> TaggedEnum for T
where
    T: Display + FromStr<Err = strum::ParseError>,
    T: NamedEnum,
{
    const TYPE_NAME: &'static str = T::NAME;

    fn as_str(&self) -> String {
        self.to_string()
    }

    fn from_str_tagged(value: &str) -> Result<Self, DataError> {
        T::from_str(value).map_err(|_| DataError::InvalidEnumString {
            type_name: T::NAME,
            value: value.to_string(),
        })
    }
}

/// Associates a `&'static str` type name with an enum, used purely for
/// error messages in `TaggedEnum::from_str_tagged`.
pub trait NamedEnum {
    const NAME: &'static str;
}

macro_rules! named_enum {
    ($ty:ty, $name:literal) => {
        impl NamedEnum for $ty {
            const NAME: &'static str = $name;
        }
    };
}

named_enum!(RegimeType, "RegimeType");
named_enum!(TrendDirection, "TrendDirection");
named_enum!(VolatilityLevel, "VolatilityLevel");
named_enum!(Bias, "Bias");
named_enum!(InstrumentType, "InstrumentType");
named_enum!(Direction, "Direction");
named_enum!(OptionType, "OptionType");
named_enum!(OrderSide, "OrderSide");
named_enum!(OrderType, "OrderType");
named_enum!(LegRole, "LegRole");
named_enum!(TradeType, "TradeType");
named_enum!(PackageDirection, "PackageDirection");
named_enum!(PackageState, "PackageState");

#[derive(Copy, Clone, Debug, PartialEq, Eq, StrumDisplay, EnumString, serde::Serialize, serde::Deserialize)]
pub enum OrderStatus {
    #[strum(serialize = "pending")]
    #[serde(rename = "pending")]
    Pending,
    #[strum(serialize = "partially_filled")]
    #[serde(rename = "partially_filled")]
    PartiallyFilled,
    #[strum(serialize = "filled")]
    #[serde(rename = "filled")]
    Filled,
    #[strum(serialize = "rejected")]
    #[serde(rename = "rejected")]
    Rejected,
}
named_enum!(OrderStatus, "OrderStatus");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_string_form() {
        let r = RegimeType::Trend;
        let s = TaggedEnum::as_str(&r);
        assert_eq!(s, "trend");
        let back = RegimeType::from_str_tagged(&s).unwrap();
        assert_eq!(back, RegimeType::Trend);
    }

    #[test]
    fn rejects_unknown_string() {
        let err = RegimeType::from_str_tagged("not_a_regime").unwrap_err();
        assert!(matches!(err, DataError::InvalidEnumString { .. }));
    }
}
