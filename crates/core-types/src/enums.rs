use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// The side of a position or signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// Returns the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::Long => Side::Short,
            Side::Short => Side::Long,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => write!(f, "long"),
            Side::Short => write!(f, "short"),
        }
    }
}

/// Expected price direction implied by a chart pattern or trend reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Bullish,
    Bearish,
    Neutral,
}

impl Direction {
    /// The position side a trader would take on this direction, if any.
    pub fn side(&self) -> Option<Side> {
        match self {
            Direction::Bullish => Some(Side::Long),
            Direction::Bearish => Some(Side::Short),
            Direction::Neutral => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Bullish => write!(f, "bullish"),
            Direction::Bearish => write!(f, "bearish"),
            Direction::Neutral => write!(f, "neutral"),
        }
    }
}

/// Identifies every strategy the factory knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyId {
    Patterns,
    EmaTrend,
    Rsi,
    Macd,
    Obv,
    Volatility,
    TrendAnalysis,
    DoubleBottomRsi,
}

impl StrategyId {
    pub const ALL: [StrategyId; 8] = [
        StrategyId::Patterns,
        StrategyId::EmaTrend,
        StrategyId::Rsi,
        StrategyId::Macd,
        StrategyId::Obv,
        StrategyId::Volatility,
        StrategyId::TrendAnalysis,
        StrategyId::DoubleBottomRsi,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyId::Patterns => "patterns",
            StrategyId::EmaTrend => "ema_trend",
            StrategyId::Rsi => "rsi",
            StrategyId::Macd => "macd",
            StrategyId::Obv => "obv",
            StrategyId::Volatility => "volatility",
            StrategyId::TrendAnalysis => "trend_analysis",
            StrategyId::DoubleBottomRsi => "double_bottom_rsi",
        }
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyId {
    type Err = CoreError;

    /// Accepts both `snake_case` and `kebab-case` spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        StrategyId::ALL
            .into_iter()
            .find(|id| id.as_str() == normalized)
            .ok_or_else(|| CoreError::InvalidInput("strategy".to_string(), s.to_string()))
    }
}

/// Every chart-pattern family the detectors recognise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    HeadAndShoulders,
    DoubleTop,
    DoubleBottom,
    AscendingTriangle,
    DescendingTriangle,
    SymmetricalTriangle,
    BullFlag,
    BearFlag,
    RisingWedge,
    FallingWedge,
}

impl PatternKind {
    pub const ALL: [PatternKind; 10] = [
        PatternKind::HeadAndShoulders,
        PatternKind::DoubleTop,
        PatternKind::DoubleBottom,
        PatternKind::AscendingTriangle,
        PatternKind::DescendingTriangle,
        PatternKind::SymmetricalTriangle,
        PatternKind::BullFlag,
        PatternKind::BearFlag,
        PatternKind::RisingWedge,
        PatternKind::FallingWedge,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PatternKind::HeadAndShoulders => "head_and_shoulders",
            PatternKind::DoubleTop => "double_top",
            PatternKind::DoubleBottom => "double_bottom",
            PatternKind::AscendingTriangle => "ascending_triangle",
            PatternKind::DescendingTriangle => "descending_triangle",
            PatternKind::SymmetricalTriangle => "symmetrical_triangle",
            PatternKind::BullFlag => "bull_flag",
            PatternKind::BearFlag => "bear_flag",
            PatternKind::RisingWedge => "rising_wedge",
            PatternKind::FallingWedge => "falling_wedge",
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_id_parses_both_spellings() {
        assert_eq!("ema-trend".parse::<StrategyId>().unwrap(), StrategyId::EmaTrend);
        assert_eq!(
            "double_bottom_rsi".parse::<StrategyId>().unwrap(),
            StrategyId::DoubleBottomRsi
        );
        assert!("martingale".parse::<StrategyId>().is_err());
    }

    #[test]
    fn direction_maps_to_side() {
        assert_eq!(Direction::Bullish.side(), Some(Side::Long));
        assert_eq!(Direction::Bearish.side(), Some(Side::Short));
        assert_eq!(Direction::Neutral.side(), None);
        assert_eq!(Side::Long.opposite(), Side::Short);
    }

    #[test]
    fn pattern_kind_serializes_as_snake_case() {
        assert_eq!(PatternKind::HeadAndShoulders.to_string(), "head_and_shoulders");
        assert_eq!(PatternKind::ALL.len(), 10);
    }
}
