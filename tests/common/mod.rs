#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use signal_desk::exchange::{MarketData, StaticMarket};
use signal_desk::models::{Candle, CandleSeries, Timeframe};

pub fn base_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-01-15T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// Deterministic drifting wave: `drift` per bar as a fraction of `start`,
/// plus a sine swing of `swing` (fraction of price). Wicks are 0.3% of price.
pub fn make_wave(n: usize, start: f64, drift: f64, swing: f64) -> CandleSeries {
    let mut prev_close = start;
    let candles: Vec<Candle> = (0..n)
        .map(|i| {
            let t = i as f64;
            let trend = start * (1.0 + drift * t);
            let close = trend * (1.0 + swing * (t * 0.7).sin());
            let open = prev_close;
            prev_close = close;
            let wick = close * 0.003;
            Candle {
                open_time: base_time() + Duration::hours(i as i64),
                open,
                high: open.max(close) + wick,
                low: open.min(close) - wick,
                close,
                volume: 1000.0 + 200.0 * (t * 1.3).cos(),
            }
        })
        .collect();
    CandleSeries::new(candles)
}

pub fn make_uptrend(n: usize, start: f64) -> CandleSeries {
    make_wave(n, start, 0.004, 0.002)
}

pub fn make_downtrend(n: usize, start: f64) -> CandleSeries {
    make_wave(n, start, -0.003, 0.002)
}

pub fn make_range(n: usize, price: f64) -> CandleSeries {
    make_wave(n, price, 0.0, 0.01)
}

/// Bybit-like market with a handful of hourly series.
pub fn sample_market() -> StaticMarket {
    StaticMarket::new()
        .with_candles("BTCUSDT", Timeframe::H1, make_uptrend(300, 40_000.0))
        .with_candles("ETHUSDT", Timeframe::H1, make_downtrend(300, 2_500.0))
        .with_candles("SOLUSDT", Timeframe::H1, make_range(300, 100.0))
        .with_candles("PEPEUSDT", Timeframe::H1, make_uptrend(300, 0.000_012))
        .with_candles("NEWUSDT", Timeframe::H1, make_uptrend(30, 5.0))
}

/// Wraps a market and fails candle requests for chosen symbols.
pub struct FlakyMarket {
    pub inner: StaticMarket,
    pub failing: HashSet<String>,
}

impl FlakyMarket {
    pub fn new(inner: StaticMarket, failing: &[&str]) -> Self {
        Self {
            inner,
            failing: failing.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[async_trait]
impl MarketData for FlakyMarket {
    async fn get_candles(&self, symbol: &str, timeframe: Timeframe, limit: usize) -> Result<CandleSeries> {
        if self.failing.contains(symbol) {
            anyhow::bail!("connection reset while fetching {symbol}");
        }
        self.inner.get_candles(symbol, timeframe, limit).await
    }

    async fn resolve_symbol(&self, input: &str) -> Result<Option<String>> {
        self.inner.resolve_symbol(input).await
    }

    async fn list_symbols(&self) -> Result<Vec<String>> {
        self.inner.list_symbols().await
    }
}

/// Records the peak number of concurrent candle requests.
pub struct SlowMarket {
    pub inner: StaticMarket,
    pub in_flight: AtomicUsize,
    pub peak: AtomicUsize,
}

impl SlowMarket {
    pub fn new(inner: StaticMarket) -> Self {
        Self {
            inner,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl MarketData for SlowMarket {
    async fn get_candles(&self, symbol: &str, timeframe: Timeframe, limit: usize) -> Result<CandleSeries> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let result = self.inner.get_candles(symbol, timeframe, limit).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn resolve_symbol(&self, input: &str) -> Result<Option<String>> {
        self.inner.resolve_symbol(input).await
    }

    async fn list_symbols(&self) -> Result<Vec<String>> {
        self.inner.list_symbols().await
    }
}
