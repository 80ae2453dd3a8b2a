use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ParameterError;

/// Direction asked for by the user. `Auto` lets the synthesizer decide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RequestedDirection {
    #[default]
    Auto,
    Long,
    Short,
}

impl RequestedDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestedDirection::Auto => "auto",
            RequestedDirection::Long => "long",
            RequestedDirection::Short => "short",
        }
    }

    pub fn from_token(token: &str) -> Option<RequestedDirection> {
        match token.to_ascii_lowercase().as_str() {
            "auto" => Some(RequestedDirection::Auto),
            "long" => Some(RequestedDirection::Long),
            "short" => Some(RequestedDirection::Short),
            _ => None,
        }
    }

    /// The forced plan direction, if any.
    pub fn forced(self) -> Option<PlanDirection> {
        match self {
            RequestedDirection::Auto => None,
            RequestedDirection::Long => Some(PlanDirection::Long),
            RequestedDirection::Short => Some(PlanDirection::Short),
        }
    }
}

impl fmt::Display for RequestedDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RequestedDirection {
    type Err = ParameterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_token(s.trim()).ok_or_else(|| ParameterError::InvalidDirection(s.to_string()))
    }
}

/// Direction of a finished trade plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanDirection {
    Long,
    Short,
    Neutral,
}

impl PlanDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanDirection::Long => "LONG",
            PlanDirection::Short => "SHORT",
            PlanDirection::Neutral => "NEUTRAL",
        }
    }

    /// +1 for long, -1 for short, 0 for neutral.
    pub fn sign(&self) -> f64 {
        match self {
            PlanDirection::Long => 1.0,
            PlanDirection::Short => -1.0,
            PlanDirection::Neutral => 0.0,
        }
    }

    /// Zone polarity that supports this direction.
    pub fn supporting_polarity(&self) -> Option<Polarity> {
        match self {
            PlanDirection::Long => Some(Polarity::Bullish),
            PlanDirection::Short => Some(Polarity::Bearish),
            PlanDirection::Neutral => None,
        }
    }
}

impl fmt::Display for PlanDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Bullish,
    Bearish,
}

impl Polarity {
    pub fn sign(&self) -> f64 {
        match self {
            Polarity::Bullish => 1.0,
            Polarity::Bearish => -1.0,
        }
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Polarity::Bullish => write!(f, "bullish"),
            Polarity::Bearish => write!(f, "bearish"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZoneKind {
    #[serde(rename = "FVG")]
    Fvg,
    #[serde(rename = "OB")]
    OrderBlock,
}

impl fmt::Display for ZoneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZoneKind::Fvg => write!(f, "FVG"),
            ZoneKind::OrderBlock => write!(f, "OB"),
        }
    }
}
