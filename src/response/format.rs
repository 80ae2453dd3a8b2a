use chrono::{DateTime, Utc};

use crate::models::{Exchange, Timeframe};

/// Price with magnitude-based precision: below 1 up to 8 decimals with
/// trailing zeros trimmed, below 10 four, below 1000 three, otherwise two.
pub fn format_price(x: f64) -> String {
    if !x.is_finite() {
        return "-".to_string();
    }
    let abs = x.abs();
    if abs < 1.0 {
        let s = format!("{x:.8}");
        return s.trim_end_matches('0').trim_end_matches('.').to_string();
    }
    if abs < 10.0 {
        return format!("{x:.4}");
    }
    if abs < 1000.0 {
        return format!("{x:.3}");
    }
    format!("{x:.2}")
}

pub fn format_ratio(rr: f64) -> String {
    format!("{rr:.2}R")
}

pub fn format_time(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

pub fn tradingview_url(exchange: Exchange, symbol: &str, timeframe: Timeframe) -> String {
    format!(
        "https://www.tradingview.com/chart/?symbol={}:{}&interval={}",
        exchange.display_name(),
        symbol,
        timeframe.tradingview_interval()
    )
}
