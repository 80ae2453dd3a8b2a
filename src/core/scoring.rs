//! Declarative rule tables for direction resolution and confidence.
//!
//! Every direction rule votes `+weight`, `-weight` or nothing, and every
//! confidence factor awards points or abstains, so the aggregate is a plain
//! sum over the table.

use crate::core::zones::nearest_zone;
use crate::error::AnalysisError;
use crate::models::{CandleSeries, IndicatorSet, PlanDirection, Polarity, StructuralZone, ZoneKind};

/// |score| above this resolves Auto to Long/Short.
pub const DIRECTION_THRESHOLD: f64 = 25.0;
/// Zones within this many ATRs of price count as "near".
pub const ZONE_PROXIMITY_ATR: f64 = 1.0;
/// Neutral plans never report more than this.
pub const NEUTRAL_CONFIDENCE_CAP: f64 = 40.0;
/// MACD histogram, as a fraction of price, that counts as strong momentum.
pub const MACD_STRONG_FRACTION: f64 = 0.0005;
/// Bounds of the combined stochastic award.
pub const STOCH_POINTS_MIN: f64 = -5.0;
pub const STOCH_POINTS_MAX: f64 = 12.0;

/// Last-bar readings every rule is evaluated against.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub ema_short_period: u32,
    pub ema_long_period: u32,
    pub price: f64,
    pub ema_short: f64,
    pub ema_long: f64,
    pub rsi: f64,
    pub prev_rsi: Option<f64>,
    pub atr: f64,
    /// MACD line and signal.
    pub macd: Option<(f64, f64)>,
    /// Stochastic %K and %D.
    pub stochastic: Option<(f64, f64)>,
    pub volume_ratio: Option<f64>,
    pub bullish_zone_near: Option<ZoneKind>,
    pub bearish_zone_near: Option<ZoneKind>,
    pub bullish_ob_near: bool,
    pub bearish_ob_near: bool,
}

impl Snapshot {
    pub fn capture(
        candles: &CandleSeries,
        indicators: &IndicatorSet,
        zones: &[StructuralZone],
    ) -> Result<Snapshot, AnalysisError> {
        let insufficient = || AnalysisError::DataInsufficient {
            required: indicators.ema.required_candles(),
            available: candles.len(),
        };

        let price = candles.last().map(|c| c.close).ok_or_else(insufficient)?;
        let ema_short = indicators.last_ema_short().ok_or_else(insufficient)?;
        let ema_long = indicators.last_ema_long().ok_or_else(insufficient)?;
        let rsi = indicators.last_rsi().ok_or_else(insufficient)?;
        let atr = indicators.last_atr().ok_or_else(insufficient)?;
        let prev_rsi = indicators
            .rsi_series
            .len()
            .checked_sub(2)
            .and_then(|i| indicators.rsi_series[i]);

        let band = ZONE_PROXIMITY_ATR * atr;
        let near = |polarity: Polarity| nearest_zone(zones, price, polarity, band);
        let ob_near = |polarity: Polarity| {
            zones.iter().any(|z| {
                z.kind == ZoneKind::OrderBlock
                    && z.polarity == polarity
                    && z.distance_to(price) <= band
            })
        };

        Ok(Snapshot {
            ema_short_period: indicators.ema.short,
            ema_long_period: indicators.ema.long,
            price,
            ema_short,
            ema_long,
            rsi,
            prev_rsi,
            atr,
            macd: indicators.last_macd(),
            stochastic: indicators.last_stochastic(),
            volume_ratio: indicators.volume_ratio,
            bullish_zone_near: near(Polarity::Bullish).map(|z| z.kind),
            bearish_zone_near: near(Polarity::Bearish).map(|z| z.kind),
            bullish_ob_near: ob_near(Polarity::Bullish),
            bearish_ob_near: ob_near(Polarity::Bearish),
        })
    }

    fn ema_spread_pct(&self) -> f64 {
        if self.ema_long == 0.0 {
            return 0.0;
        }
        (self.ema_short - self.ema_long) / self.ema_long * 100.0
    }

    fn zone_near(&self, polarity: Polarity) -> Option<ZoneKind> {
        match polarity {
            Polarity::Bullish => self.bullish_zone_near,
            Polarity::Bearish => self.bearish_zone_near,
        }
    }

    fn ob_near(&self, polarity: Polarity) -> bool {
        match polarity {
            Polarity::Bullish => self.bullish_ob_near,
            Polarity::Bearish => self.bearish_ob_near,
        }
    }
}

/// One signed vote: which side the evidence favours and how to describe it.
pub type Vote = Option<(Polarity, String)>;

pub struct DirectionRule {
    pub name: &'static str,
    pub weight: f64,
    pub vote: fn(&Snapshot) -> Vote,
}

pub const DIRECTION_RULES: &[DirectionRule] = &[
    DirectionRule {
        name: "ema_cross",
        weight: 30.0,
        vote: ema_cross_vote,
    },
    DirectionRule {
        name: "ema_spread",
        weight: 10.0,
        vote: ema_spread_vote,
    },
    DirectionRule {
        name: "rsi_midline",
        weight: 15.0,
        vote: rsi_midline_vote,
    },
    DirectionRule {
        name: "rsi_extreme",
        weight: 20.0,
        vote: rsi_extreme_vote,
    },
    DirectionRule {
        name: "zone_proximity",
        weight: 20.0,
        vote: zone_vote,
    },
    DirectionRule {
        name: "price_vs_ema_long",
        weight: 10.0,
        vote: price_vs_ema_vote,
    },
];

fn ema_cross_vote(s: &Snapshot) -> Vote {
    if s.ema_short > s.ema_long {
        Some((
            Polarity::Bullish,
            format!("EMA {} above EMA {}", s.ema_short_period, s.ema_long_period),
        ))
    } else if s.ema_short < s.ema_long {
        Some((
            Polarity::Bearish,
            format!("EMA {} below EMA {}", s.ema_short_period, s.ema_long_period),
        ))
    } else {
        None
    }
}

fn ema_spread_vote(s: &Snapshot) -> Vote {
    let spread = s.ema_spread_pct();
    if spread > 0.5 {
        Some((Polarity::Bullish, format!("EMA spread {spread:.2}% widening up")))
    } else if spread < -0.5 {
        Some((Polarity::Bearish, format!("EMA spread {spread:.2}% widening down")))
    } else {
        None
    }
}

fn rsi_midline_vote(s: &Snapshot) -> Vote {
    if s.rsi > 50.0 {
        Some((Polarity::Bullish, format!("RSI {:.1} above 50", s.rsi)))
    } else if s.rsi < 50.0 {
        Some((Polarity::Bearish, format!("RSI {:.1} below 50", s.rsi)))
    } else {
        None
    }
}

fn rsi_extreme_vote(s: &Snapshot) -> Vote {
    if s.rsi >= 70.0 {
        Some((Polarity::Bearish, format!("RSI {:.1} overbought", s.rsi)))
    } else if s.rsi <= 30.0 {
        Some((Polarity::Bullish, format!("RSI {:.1} oversold", s.rsi)))
    } else {
        None
    }
}

fn zone_vote(s: &Snapshot) -> Vote {
    match (s.bullish_zone_near, s.bearish_zone_near) {
        (Some(kind), None) => Some((Polarity::Bullish, format!("price at bullish {kind}"))),
        (None, Some(kind)) => Some((Polarity::Bearish, format!("price at bearish {kind}"))),
        _ => None,
    }
}

fn price_vs_ema_vote(s: &Snapshot) -> Vote {
    if s.price > s.ema_long {
        Some((Polarity::Bullish, format!("price above EMA {}", s.ema_long_period)))
    } else if s.price < s.ema_long {
        Some((Polarity::Bearish, format!("price below EMA {}", s.ema_long_period)))
    } else {
        None
    }
}

/// Signed sum of the direction table with one reasoning line per vote cast.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionScore {
    pub score: f64,
    pub reasoning: Vec<String>,
}

impl DirectionScore {
    pub fn direction(&self, threshold: f64) -> PlanDirection {
        if self.score > threshold {
            PlanDirection::Long
        } else if self.score < -threshold {
            PlanDirection::Short
        } else {
            PlanDirection::Neutral
        }
    }

    /// Confidence reported for a Neutral outcome: proportional to how close
    /// the score came to the threshold, capped below the actionable level.
    pub fn neutral_confidence(&self, threshold: f64) -> f64 {
        if threshold <= 0.0 {
            return 0.0;
        }
        (self.score.abs() / threshold * NEUTRAL_CONFIDENCE_CAP).min(NEUTRAL_CONFIDENCE_CAP)
    }
}

pub fn score_direction(snapshot: &Snapshot) -> DirectionScore {
    let mut score = 0.0;
    let mut reasoning = Vec::new();

    for rule in DIRECTION_RULES {
        if let Some((polarity, text)) = (rule.vote)(snapshot) {
            let signed = polarity.sign() * rule.weight;
            score += signed;
            reasoning.push(format!("{text} ({signed:+.0})"));
        }
    }

    DirectionScore { score, reasoning }
}

/// Points awarded for one piece of evidence toward a chosen direction.
pub struct ConfidenceFactor {
    pub name: &'static str,
    pub award: fn(&Snapshot, Polarity) -> Option<(f64, String)>,
}

pub const CONFIDENCE_FACTORS: &[ConfidenceFactor] = &[
    ConfidenceFactor {
        name: "ema_alignment",
        award: ema_alignment_points,
    },
    ConfidenceFactor {
        name: "ema_spread",
        award: ema_spread_points,
    },
    ConfidenceFactor {
        name: "rsi_zone",
        award: rsi_zone_points,
    },
    ConfidenceFactor {
        name: "rsi_momentum",
        award: rsi_momentum_points,
    },
    ConfidenceFactor {
        name: "macd",
        award: macd_points,
    },
    ConfidenceFactor {
        name: "macd_momentum",
        award: macd_momentum_points,
    },
    ConfidenceFactor {
        name: "stochastic",
        award: stochastic_points,
    },
    ConfidenceFactor {
        name: "zone_confluence",
        award: zone_points,
    },
    ConfidenceFactor {
        name: "order_block",
        award: order_block_points,
    },
    ConfidenceFactor {
        name: "price_vs_ema_long",
        award: price_vs_ema_points,
    },
    ConfidenceFactor {
        name: "ema_short_distance",
        award: ema_distance_points,
    },
    ConfidenceFactor {
        name: "volume",
        award: volume_points,
    },
];

fn ema_alignment_points(s: &Snapshot, side: Polarity) -> Option<(f64, String)> {
    ((s.ema_short - s.ema_long) * side.sign() > 0.0)
        .then(|| (25.0, format!("EMA trend aligned with {side}")))
}

fn ema_spread_points(s: &Snapshot, side: Polarity) -> Option<(f64, String)> {
    let aligned = s.ema_spread_pct() * side.sign();
    if aligned > 1.0 {
        Some((10.0, format!("strong EMA separation {:.2}%", aligned)))
    } else if aligned > 0.5 {
        Some((5.0, format!("EMA separation {:.2}%", aligned)))
    } else {
        None
    }
}

fn rsi_zone_points(s: &Snapshot, _side: Polarity) -> Option<(f64, String)> {
    if (40.0..=60.0).contains(&s.rsi) {
        Some((15.0, format!("RSI {:.1} neutral, room to move", s.rsi)))
    } else if (30.0..40.0).contains(&s.rsi) || (s.rsi > 60.0 && s.rsi < 70.0) {
        Some((8.0, format!("RSI {:.1} not extended", s.rsi)))
    } else {
        None
    }
}

fn rsi_momentum_points(s: &Snapshot, side: Polarity) -> Option<(f64, String)> {
    let prev = s.prev_rsi?;
    ((s.rsi - prev) * side.sign() > 0.0).then(|| (5.0, "RSI momentum confirms".to_string()))
}

fn macd_points(s: &Snapshot, side: Polarity) -> Option<(f64, String)> {
    let (line, signal) = s.macd?;
    ((line - signal) * side.sign() > 0.0).then(|| (12.0, format!("MACD {side} of signal")))
}

fn macd_momentum_points(s: &Snapshot, side: Polarity) -> Option<(f64, String)> {
    let (line, signal) = s.macd?;
    ((line - signal) * side.sign() > MACD_STRONG_FRACTION * s.price)
        .then(|| (8.0, "strong MACD momentum".to_string()))
}

/// %K crossing %D toward the trade scores 8, more from the far extreme and
/// less when already stretched. Without a cross, %K near the launching
/// extreme scores 3.
fn stochastic_points(s: &Snapshot, side: Polarity) -> Option<(f64, String)> {
    let (k, d) = s.stochastic?;
    // %K measured from the extreme the trade launches from
    let from_origin = match side {
        Polarity::Bullish => k,
        Polarity::Bearish => 100.0 - k,
    };

    let mut points: f64 = 0.0;
    let text = if (k - d) * side.sign() > 0.0 {
        points += 8.0;
        if from_origin < 20.0 {
            points += 4.0;
            format!("stochastic {side} cross from extreme")
        } else if from_origin > 80.0 {
            points -= 3.0;
            format!("stochastic {side} cross, already stretched")
        } else {
            format!("stochastic {side} cross")
        }
    } else if from_origin < 30.0 {
        points += 3.0;
        format!("stochastic near {side} turn")
    } else {
        return None;
    };
    Some((points.clamp(STOCH_POINTS_MIN, STOCH_POINTS_MAX), format!("{text} K {k:.1} D {d:.1}")))
}

fn zone_points(s: &Snapshot, side: Polarity) -> Option<(f64, String)> {
    s.zone_near(side)
        .map(|kind| (15.0, format!("{side} {kind} near price")))
}

fn order_block_points(s: &Snapshot, side: Polarity) -> Option<(f64, String)> {
    s.ob_near(side)
        .then(|| (5.0, format!("{side} order block support")))
}

fn price_vs_ema_points(s: &Snapshot, side: Polarity) -> Option<(f64, String)> {
    ((s.price - s.ema_long) * side.sign() > 0.0)
        .then(|| (10.0, format!("price on the {side} side of EMA {}", s.ema_long_period)))
}

fn ema_distance_points(s: &Snapshot, _side: Polarity) -> Option<(f64, String)> {
    ((s.price - s.ema_short).abs() <= s.atr)
        .then(|| (5.0, format!("price within one ATR of EMA {}", s.ema_short_period)))
}

fn volume_points(s: &Snapshot, _side: Polarity) -> Option<(f64, String)> {
    let ratio = s.volume_ratio?;
    let points = if ratio >= 1.5 {
        10.0
    } else if ratio >= 1.0 {
        6.0
    } else if ratio >= 0.7 {
        2.0
    } else {
        -5.0
    };
    Some((points, format!("volume {ratio:.2}x average")))
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfidenceScore {
    pub confidence: f64,
    pub reasoning: Vec<String>,
}

/// Sums the factor table toward `direction`, clamped to `[0, 100]`.
pub fn score_confidence(snapshot: &Snapshot, direction: PlanDirection) -> ConfidenceScore {
    let Some(side) = direction.supporting_polarity() else {
        return ConfidenceScore {
            confidence: 0.0,
            reasoning: Vec::new(),
        };
    };

    let mut total = 0.0;
    let mut reasoning = Vec::new();
    for factor in CONFIDENCE_FACTORS {
        if let Some((points, text)) = (factor.award)(snapshot, side) {
            total += points;
            reasoning.push(format!("{text} ({points:+.0})"));
        }
    }

    ConfidenceScore {
        confidence: total.clamp(0.0, 100.0),
        reasoning,
    }
}
