use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{EmaPair, Exchange, PlanDirection, Polarity, Timeframe, ZoneKind};

/// Confidence at or above which a plan is considered actionable.
pub const ACTIONABLE_CONFIDENCE: f64 = 50.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuralZone {
    pub kind: ZoneKind,
    pub polarity: Polarity,
    pub high: f64,
    pub low: f64,
    pub candle_index: usize,
}

impl StructuralZone {
    pub fn midpoint(&self) -> f64 {
        (self.high + self.low) / 2.0
    }

    pub fn contains(&self, price: f64) -> bool {
        price >= self.low && price <= self.high
    }

    /// Distance from `price` to the nearest edge, zero when inside.
    pub fn distance_to(&self, price: f64) -> f64 {
        if self.contains(price) {
            0.0
        } else if price > self.high {
            price - self.high
        } else {
            self.low - price
        }
    }
}

/// Indicator series aligned index-for-index with the candle window.
/// Leading entries are `None` until enough history exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub ema: EmaPair,
    pub ema_short_series: Vec<Option<f64>>,
    pub ema_long_series: Vec<Option<f64>>,
    pub rsi_series: Vec<Option<f64>>,
    pub atr_series: Vec<Option<f64>>,
    pub macd_line_series: Vec<Option<f64>>,
    pub macd_signal_series: Vec<Option<f64>>,
    pub stoch_k_series: Vec<Option<f64>>,
    pub stoch_d_series: Vec<Option<f64>>,
    pub volume_ratio: Option<f64>,
}

impl IndicatorSet {
    pub fn len(&self) -> usize {
        self.ema_short_series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ema_short_series.is_empty()
    }

    pub fn last_ema_short(&self) -> Option<f64> {
        self.ema_short_series.last().copied().flatten()
    }

    pub fn last_ema_long(&self) -> Option<f64> {
        self.ema_long_series.last().copied().flatten()
    }

    pub fn last_rsi(&self) -> Option<f64> {
        self.rsi_series.last().copied().flatten()
    }

    pub fn last_atr(&self) -> Option<f64> {
        self.atr_series.last().copied().flatten()
    }

    /// Last MACD line and signal, when both are defined.
    pub fn last_macd(&self) -> Option<(f64, f64)> {
        let line = self.macd_line_series.last().copied().flatten()?;
        let signal = self.macd_signal_series.last().copied().flatten()?;
        Some((line, signal))
    }

    /// Last stochastic %K and %D, when both are defined.
    pub fn last_stochastic(&self) -> Option<(f64, f64)> {
        let k = self.stoch_k_series.last().copied().flatten()?;
        let d = self.stoch_d_series.last().copied().flatten()?;
        Some((k, d))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanLevels {
    pub entry: f64,
    pub stop_loss: f64,
    pub tp1: f64,
    pub tp2: f64,
    pub risk_reward: f64,
}

impl PlanLevels {
    pub fn risk(&self) -> f64 {
        (self.entry - self.stop_loss).abs()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradePlan {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub exchange: Exchange,
    pub direction: PlanDirection,
    /// Absent for neutral plans.
    #[serde(flatten)]
    pub levels: Option<PlanLevels>,
    pub confidence: f64,
    pub reasoning: Vec<String>,
    pub zones: Vec<StructuralZone>,
    pub current_price: f64,
    pub indicators: IndicatorSet,
}

impl TradePlan {
    pub fn is_actionable(&self) -> bool {
        self.direction != PlanDirection::Neutral && self.confidence >= ACTIONABLE_CONFIDENCE
    }

    pub fn confidence_label(&self) -> ConfidenceLabel {
        ConfidenceLabel::from_score(self.confidence)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceLabel {
    High,
    Medium,
    Low,
    VeryLow,
}

impl ConfidenceLabel {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            ConfidenceLabel::High
        } else if score >= 60.0 {
            ConfidenceLabel::Medium
        } else if score >= 40.0 {
            ConfidenceLabel::Low
        } else {
            ConfidenceLabel::VeryLow
        }
    }
}

impl fmt::Display for ConfidenceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfidenceLabel::High => write!(f, "HIGH"),
            ConfidenceLabel::Medium => write!(f, "MEDIUM"),
            ConfidenceLabel::Low => write!(f, "LOW"),
            ConfidenceLabel::VeryLow => write!(f, "VERY LOW"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanEntry {
    pub symbol: String,
    pub ema: EmaPair,
    pub plan: TradePlan,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanExclusion {
    pub symbol: String,
    pub reason: String,
}

/// Ranked scan outcome: best plan per symbol by descending confidence,
/// plus every symbol that could not be analysed and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub timeframe: Timeframe,
    pub exchange: Exchange,
    pub entries: Vec<ScanEntry>,
    pub excluded: Vec<ScanExclusion>,
}
