use crate::core::zones::nearest_zone;
use crate::models::{
    CandleSeries, PlanDirection, PlanLevels, Polarity, StructuralZone, ZoneKind,
};

/// Offset beyond a structural level, in ATRs.
pub const STOP_BUFFER_ATR: f64 = 0.2;
/// Volatility stop distance when no zone qualifies, in ATRs.
pub const FALLBACK_STOP_ATR: f64 = 1.5;
/// Structural stops further than this from entry are ignored.
pub const MAX_STOP_ATR: f64 = 3.0;
/// Bars searched for a liquidity target.
pub const LIQUIDITY_LOOKBACK: usize = 50;
/// Liquidity targets beyond this many R are ignored.
pub const MAX_TARGET_R: f64 = 4.0;
/// ATR substitute, as a fraction of price, when the series reports zero.
const MIN_ATR_FRACTION: f64 = 0.002;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopSource {
    OrderBlock,
    Zone(ZoneKind),
    Volatility,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LevelPlacement {
    pub levels: PlanLevels,
    pub entry_zone: Option<StructuralZone>,
    pub stop_source: StopSource,
    pub liquidity_target: bool,
}

/// Places entry, stop and targets for a directional plan. `None` for
/// Neutral. For Long `stop < entry < tp1 < tp2`, mirrored for Short.
pub fn place(
    direction: PlanDirection,
    price: f64,
    atr: f64,
    zones: &[StructuralZone],
    candles: &CandleSeries,
    proximity_atr: f64,
) -> Option<LevelPlacement> {
    let polarity = direction.supporting_polarity()?;
    let sign = polarity.sign();
    let atr = if atr > 0.0 { atr } else { price * MIN_ATR_FRACTION };
    let buffer = STOP_BUFFER_ATR * atr;

    let entry_zone = entry_zone(zones, price, polarity, proximity_atr * atr).cloned();
    let entry = match (&entry_zone, polarity) {
        (Some(z), Polarity::Bullish) => price.min(z.high),
        (Some(z), Polarity::Bearish) => price.max(z.low),
        (None, _) => price,
    };

    // edge of the zone that invalidates the trade
    let invalidation = |z: &StructuralZone| match polarity {
        Polarity::Bullish => z.low - buffer,
        Polarity::Bearish => z.high + buffer,
    };
    let acceptable = |stop: f64| {
        let risk = (entry - stop) * sign;
        risk > 0.0 && risk <= MAX_STOP_ATR * atr
    };

    let order_block = zones
        .iter()
        .rev()
        .find(|z| z.kind == ZoneKind::OrderBlock && z.polarity == polarity);

    let (mut stop, stop_source) = match order_block.map(invalidation).filter(|s| acceptable(*s)) {
        Some(stop) => (stop, StopSource::OrderBlock),
        None => match entry_zone
            .as_ref()
            .map(|z| (invalidation(z), z.kind))
            .filter(|(s, _)| acceptable(*s))
        {
            Some((stop, kind)) => (stop, StopSource::Zone(kind)),
            None => (entry - sign * FALLBACK_STOP_ATR * atr, StopSource::Volatility),
        },
    };

    // keep every level positive
    let mut risk = (entry - stop) * sign;
    match polarity {
        Polarity::Bullish if risk >= entry => {
            risk = entry / 2.0;
            stop = entry - risk;
        }
        Polarity::Bearish if 2.0 * risk >= entry => {
            risk = entry / 3.0;
            stop = entry + risk;
        }
        _ => {}
    }

    let tp1 = entry + sign * risk;
    let mut tp2 = entry + sign * 2.0 * risk;
    let extreme = match polarity {
        Polarity::Bullish => candles.recent_high(LIQUIDITY_LOOKBACK),
        Polarity::Bearish => candles.recent_low(LIQUIDITY_LOOKBACK),
    };
    let reach = (extreme - entry) * sign;
    let liquidity_target = reach > 2.0 * risk && reach <= MAX_TARGET_R * risk;
    if liquidity_target {
        tp2 = extreme;
    }

    let risk_reward = round2(((tp2 - entry) / (entry - stop)).abs());

    Some(LevelPlacement {
        levels: PlanLevels {
            entry,
            stop_loss: stop,
            tp1,
            tp2,
            risk_reward,
        },
        entry_zone,
        stop_source,
        liquidity_target,
    })
}

/// Nearest zone of `polarity` within `band` of price that still sits on the
/// entry side: at or below price for longs, at or above for shorts.
fn entry_zone(
    zones: &[StructuralZone],
    price: f64,
    polarity: Polarity,
    band: f64,
) -> Option<&StructuralZone> {
    let entry_side = zones.iter().filter(|z| match polarity {
        Polarity::Bullish => z.low < price,
        Polarity::Bearish => z.high > price,
    });
    nearest_zone(entry_side, price, polarity, band)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
