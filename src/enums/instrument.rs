use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
pub enum InstrumentType {
    #[strum(serialize = "stock")]
    #[serde(rename = "stock")]
    Stock,
    #[strum(serialize = "option")]
    #[serde(rename = "option")]
    Option,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
pub enum Direction {
    #[strum(serialize = "long")]
    #[serde(rename = "long")]
    Long,
    #[strum(serialize = "short")]
    #[serde(rename = "short")]
    Short,
}

impl Direction {
    pub fn sign(self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
pub enum OptionType {
    #[strum(serialize = "call")]
    #[serde(rename = "call")]
    Call,
    #[strum(serialize = "put")]
    #[serde(rename = "put")]
    Put,
}

impl OptionType {
    pub fn occ_code(self) -> char {
        match self {
            OptionType::Call => 'C',
            OptionType::Put => 'P',
        }
    }
}
