use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
pub enum RegimeType {
    #[strum(serialize = "trend")]
    #[serde(rename = "trend")]
    Trend,
    #[strum(serialize = "mean_reversion")]
    #[serde(rename = "mean_reversion")]
    MeanReversion,
    #[strum(serialize = "compression")]
    #[serde(rename = "compression")]
    Compression,
    #[strum(serialize = "expansion")]
    #[serde(rename = "expansion")]
    Expansion,
}

impl RegimeType {
    /// Priority order used to break ties when more than one regime's
    /// conditions hold on the same bar: TREND > EXPANSION > MEAN_REVERSION >
    /// COMPRESSION.
    pub fn priority(self) -> u8 {
        match self {
            RegimeType::Trend => 3,
            RegimeType::Expansion => 2,
            RegimeType::MeanReversion => 1,
            RegimeType::Compression => 0,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
pub enum TrendDirection {
    #[strum(serialize = "up")]
    #[serde(rename = "up")]
    Up,
    #[strum(serialize = "down")]
    #[serde(rename = "down")]
    Down,
    #[strum(serialize = "sideways")]
    #[serde(rename = "sideways")]
    Sideways,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Display, EnumString, Serialize, Deserialize)]
pub enum VolatilityLevel {
    #[strum(serialize = "low")]
    #[serde(rename = "low")]
    Low,
    #[strum(serialize = "medium")]
    #[serde(rename = "medium")]
    Medium,
    #[strum(serialize = "high")]
    #[serde(rename = "high")]
    High,
    #[strum(serialize = "extreme")]
    #[serde(rename = "extreme")]
    Extreme,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
pub enum Bias {
    #[strum(serialize = "long")]
    #[serde(rename = "long")]
    Long,
    #[strum(serialize = "short")]
    #[serde(rename = "short")]
    Short,
    #[strum(serialize = "neutral")]
    #[serde(rename = "neutral")]
    Neutral,
}

impl Bias {
    pub fn opposes(self, other: Bias) -> bool {
        matches!(
            (self, other),
            (Bias::Long, Bias::Short) | (Bias::Short, Bias::Long)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_orders_trend_highest() {
        assert!(RegimeType::Trend.priority() > RegimeType::Expansion.priority());
        assert!(RegimeType::Expansion.priority() > RegimeType::MeanReversion.priority());
        assert!(RegimeType::MeanReversion.priority() > RegimeType::Compression.priority());
    }

    #[test]
    fn bias_opposes_is_symmetric() {
        assert!(Bias::Long.opposes(Bias::Short));
        assert!(Bias::Short.opposes(Bias::Long));
        assert!(!Bias::Long.opposes(Bias::Long));
        assert!(!Bias::Neutral.opposes(Bias::Long));
    }
}
