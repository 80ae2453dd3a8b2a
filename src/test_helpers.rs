use chrono::{DateTime, Duration, Utc};

use crate::models::{Candle, CandleSeries};

/// 2024-01-15 12:00:00 UTC, the base of every generated series.
pub fn fixed_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-01-15T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// Create candles from (open, high, low, close) tuples with auto-incrementing 1h timestamps.
pub fn make_candles(data: &[(f64, f64, f64, f64)]) -> CandleSeries {
    let base = fixed_time();

    let candles: Vec<Candle> = data
        .iter()
        .enumerate()
        .map(|(i, &(o, h, l, c))| Candle {
            open_time: base + Duration::hours(i as i64),
            open: o,
            high: h,
            low: l,
            close: c,
            volume: 100.0,
        })
        .collect();

    CandleSeries::new(candles)
}

/// Create n rising (bullish) candles starting from `start` price.
pub fn make_bullish_trend(n: usize, start: f64) -> CandleSeries {
    let data: Vec<(f64, f64, f64, f64)> = (0..n)
        .map(|i| {
            let open = start + i as f64 * 10.0;
            let close = open + 8.0;
            (open, close + 2.0, open - 1.0, close)
        })
        .collect();
    make_candles(&data)
}

/// Create n falling (bearish) candles starting from `start` price.
pub fn make_bearish_trend(n: usize, start: f64) -> CandleSeries {
    let data: Vec<(f64, f64, f64, f64)> = (0..n)
        .map(|i| {
            let open = start - i as f64 * 10.0;
            let close = open - 8.0;
            (open, open + 1.0, close - 2.0, close)
        })
        .collect();
    make_candles(&data)
}

/// Create n doji candles at `price` with a 0.2% range.
pub fn make_flat(n: usize, price: f64) -> CandleSeries {
    let data: Vec<(f64, f64, f64, f64)> = (0..n)
        .map(|_| (price, price * 1.001, price * 0.999, price))
        .collect();
    make_candles(&data)
}
