use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The sampling interval of a price series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1h")]
    Hourly,
    #[default]
    #[serde(rename = "1d")]
    Daily,
    #[serde(rename = "1wk")]
    Weekly,
    #[serde(rename = "1mo")]
    Monthly,
}

impl Interval {
    /// The short code used by data providers and on the command line.
    pub fn code(&self) -> &'static str {
        match self {
            Interval::Hourly => "1h",
            Interval::Daily => "1d",
            Interval::Weekly => "1wk",
            Interval::Monthly => "1mo",
        }
    }

    /// Number of bars in a trading year, used to annualise volatility.
    /// Hourly assumes 6.5 trading hours over 252 sessions.
    pub fn periods_per_year(&self) -> f64 {
        match self {
            Interval::Hourly => 1638.0,
            Interval::Daily => 252.0,
            Interval::Weekly => 52.0,
            Interval::Monthly => 12.0,
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Interval {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1h" | "hourly" => Ok(Interval::Hourly),
            "1d" | "daily" => Ok(Interval::Daily),
            "1wk" | "weekly" => Ok(Interval::Weekly),
            "1mo" | "monthly" => Ok(Interval::Monthly),
            other => Err(CoreError::UnknownInterval(other.to_string())),
        }
    }
}

/// The side of a backtest position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeDirection {
    Long,
    Short,
}

impl TradeDirection {
    /// Maps a position value (+1 / -1) to a direction. Flat maps to `None`.
    pub fn from_position(position: i8) -> Option<Self> {
        match position.signum() {
            1 => Some(TradeDirection::Long),
            -1 => Some(TradeDirection::Short),
            _ => None,
        }
    }

    /// The position value of this direction: +1 for long, -1 for short.
    pub fn sign(self) -> i8 {
        match self {
            TradeDirection::Long => 1,
            TradeDirection::Short => -1,
        }
    }
}

/// Whether a trade was closed by a signal or force-closed at the last bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeStatus {
    Closed,
    OpenAtEnd,
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeStatus::Closed => f.write_str("Closed"),
            TradeStatus::OpenAtEnd => f.write_str("Open at End"),
        }
    }
}

/// What a correlation is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationBasis {
    /// Closing prices, as plotted.
    #[default]
    Prices,
    /// Simple percentage returns of the closing prices.
    Returns,
}

impl FromStr for CorrelationBasis {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prices" | "price" => Ok(CorrelationBasis::Prices),
            "returns" | "return" => Ok(CorrelationBasis::Returns),
            other => Err(CoreError::InvalidInput(
                "basis".to_string(),
                format!("'{}' is not one of prices, returns", other),
            )),
        }
    }
}

impl fmt::Display for CorrelationBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorrelationBasis::Prices => f.write_str("prices"),
            CorrelationBasis::Returns => f.write_str("returns"),
        }
    }
}
