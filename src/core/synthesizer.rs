use tracing::debug;

use crate::core::indicators;
use crate::core::levels::{self, StopSource};
use crate::core::scoring::{self, Snapshot, DIRECTION_THRESHOLD, ZONE_PROXIMITY_ATR};
use crate::core::zones::ZoneDetector;
use crate::error::AnalysisError;
use crate::models::{CandleSeries, IndicatorSet, PlanDirection, SignalRequest, TradePlan};

/// Tunable knobs of the synthesizer. Defaults match the rule tables.
#[derive(Debug, Clone)]
pub struct SynthesisPolicy {
    pub direction_threshold: f64,
    pub zone_proximity_atr: f64,
    pub zones: ZoneDetector,
}

impl Default for SynthesisPolicy {
    fn default() -> Self {
        Self {
            direction_threshold: DIRECTION_THRESHOLD,
            zone_proximity_atr: ZONE_PROXIMITY_ATR,
            zones: ZoneDetector::default(),
        }
    }
}

/// Turns a candle window and its indicators into one `TradePlan`.
#[derive(Debug, Clone, Default)]
pub struct Synthesizer {
    policy: SynthesisPolicy,
}

impl Synthesizer {
    pub fn new(policy: SynthesisPolicy) -> Self {
        Self { policy }
    }

    /// Computes indicators for `request.ema` and synthesizes the plan.
    pub fn analyze(
        &self,
        request: &SignalRequest,
        candles: &CandleSeries,
    ) -> Result<TradePlan, AnalysisError> {
        let indicators = indicators::compute(candles, request.ema)?;
        self.synthesize(request, candles, &indicators)
    }

    pub fn synthesize(
        &self,
        request: &SignalRequest,
        candles: &CandleSeries,
        indicators: &IndicatorSet,
    ) -> Result<TradePlan, AnalysisError> {
        let required = request.ema.required_candles();
        if candles.len() < required {
            return Err(AnalysisError::DataInsufficient {
                required,
                available: candles.len(),
            });
        }
        if indicators.len() != candles.len() || indicators.ema != request.ema {
            return Err(AnalysisError::InvalidCandles(
                "indicator set does not match candle window".to_string(),
            ));
        }

        let zones = self.policy.zones.detect(candles, &indicators.atr_series);
        let snapshot = Snapshot::capture(candles, indicators, &zones)?;
        let mut reasoning = Vec::new();

        let direction_score = scoring::score_direction(&snapshot);
        let direction = match request.direction.forced() {
            Some(forced) => {
                reasoning.push(format!("direction {forced} set by request"));
                forced
            }
            None => {
                reasoning.extend(direction_score.reasoning.iter().cloned());
                let resolved = direction_score.direction(self.policy.direction_threshold);
                reasoning.push(format!(
                    "direction score {:+.0} resolves to {resolved}",
                    direction_score.score
                ));
                resolved
            }
        };

        let placement = levels::place(
            direction,
            snapshot.price,
            snapshot.atr,
            &zones,
            candles,
            self.policy.zone_proximity_atr,
        );

        let confidence = if direction == PlanDirection::Neutral {
            let c = direction_score.neutral_confidence(self.policy.direction_threshold);
            reasoning.push(format!("no directional edge, confidence capped at {c:.0}"));
            c
        } else {
            let scored = scoring::score_confidence(&snapshot, direction);
            reasoning.extend(scored.reasoning);
            scored.confidence
        };

        if let Some(p) = &placement {
            if let Some(zone) = &p.entry_zone {
                if p.levels.entry != snapshot.price {
                    reasoning.push(format!("entry refined to {} edge", zone.kind));
                }
            }
            reasoning.push(match p.stop_source {
                StopSource::OrderBlock => "stop beyond order block".to_string(),
                StopSource::Zone(kind) => format!("stop beyond {kind}"),
                StopSource::Volatility => "stop at 1.5 ATR".to_string(),
            });
            if p.liquidity_target {
                reasoning.push("tp2 at recent liquidity".to_string());
            }
        }

        debug!(
            symbol = %request.symbol,
            timeframe = %request.timeframe,
            ema = %request.ema,
            direction = %direction,
            confidence,
            "plan synthesized"
        );

        Ok(TradePlan {
            symbol: request.symbol.clone(),
            timeframe: request.timeframe,
            exchange: request.exchange,
            direction,
            levels: placement.map(|p| p.levels),
            confidence,
            reasoning,
            zones,
            current_price: snapshot.price,
            indicators: indicators.clone(),
        })
    }
}
