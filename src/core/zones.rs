use crate::models::{CandleSeries, Polarity, StructuralZone, ZoneKind};

/// Fair-value-gaps kept per request.
pub const MAX_FVGS: usize = 5;
/// A move candle must span more than this many ATRs to mark an order block.
pub const OB_RANGE_ATR_MULT: f64 = 1.5;
/// Minimum body/range ratio of the move candle.
pub const OB_MIN_BODY_RATIO: f64 = 0.5;

/// Detects FVG zones and the active order block in a candle window.
#[derive(Debug, Clone)]
pub struct ZoneDetector {
    pub max_fvgs: usize,
    pub ob_range_atr_mult: f64,
    pub ob_min_body_ratio: f64,
}

impl Default for ZoneDetector {
    fn default() -> Self {
        Self {
            max_fvgs: MAX_FVGS,
            ob_range_atr_mult: OB_RANGE_ATR_MULT,
            ob_min_body_ratio: OB_MIN_BODY_RATIO,
        }
    }
}

impl ZoneDetector {
    /// FVGs (oldest first, at most `max_fvgs`) followed by the active order
    /// block, if any.
    pub fn detect(&self, candles: &CandleSeries, atr: &[Option<f64>]) -> Vec<StructuralZone> {
        let mut zones = self.detect_fvgs(candles);
        if let Some(ob) = self.detect_order_block(candles, atr) {
            zones.push(ob);
        }
        zones
    }

    pub fn detect_fvgs(&self, candles: &CandleSeries) -> Vec<StructuralZone> {
        let mut found = Vec::new();
        if candles.len() < 3 {
            return found;
        }

        for i in 1..candles.len() - 1 {
            let before = &candles[i - 1];
            let after = &candles[i + 1];

            if after.low > before.high {
                found.push(StructuralZone {
                    kind: ZoneKind::Fvg,
                    polarity: Polarity::Bullish,
                    high: after.low,
                    low: before.high,
                    candle_index: i,
                });
            } else if after.high < before.low {
                found.push(StructuralZone {
                    kind: ZoneKind::Fvg,
                    polarity: Polarity::Bearish,
                    high: before.low,
                    low: after.high,
                    candle_index: i,
                });
            }
        }

        let excess = found.len().saturating_sub(self.max_fvgs);
        found.drain(..excess);
        found
    }

    /// Most recent candle preceding a strong move. A move is strong when its
    /// range exceeds `ob_range_atr_mult` times the ATR before it and its body
    /// covers at least `ob_min_body_ratio` of that range.
    pub fn detect_order_block(
        &self,
        candles: &CandleSeries,
        atr: &[Option<f64>],
    ) -> Option<StructuralZone> {
        let mut active = None;

        for i in 1..candles.len() {
            let Some(Some(threshold_atr)) = atr.get(i - 1) else {
                continue;
            };
            let mv = &candles[i];
            let range = mv.total_range();
            if range <= self.ob_range_atr_mult * threshold_atr {
                continue;
            }
            if mv.body() < self.ob_min_body_ratio * range {
                continue;
            }

            let polarity = if mv.is_bullish() {
                Polarity::Bullish
            } else if mv.is_bearish() {
                Polarity::Bearish
            } else {
                continue;
            };

            let base = &candles[i - 1];
            active = Some(StructuralZone {
                kind: ZoneKind::OrderBlock,
                polarity,
                high: base.high,
                low: base.low,
                candle_index: i - 1,
            });
        }

        active
    }
}

/// Zone of the given polarity closest to `price` and no further than `band`
/// from it; ties go to the most recent.
pub fn nearest_zone<'a>(
    zones: impl IntoIterator<Item = &'a StructuralZone>,
    price: f64,
    polarity: Polarity,
    band: f64,
) -> Option<&'a StructuralZone> {
    zones
        .into_iter()
        .filter(|z| z.polarity == polarity && z.distance_to(price) <= band)
        .min_by(|a, b| {
            a.distance_to(price)
                .total_cmp(&b.distance_to(price))
                .then(b.candle_index.cmp(&a.candle_index))
        })
}
