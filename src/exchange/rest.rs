//! Plumbing shared by the REST providers: request spacing, the cached
//! symbol catalogue and small JSON helpers.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::Value;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::{Candle, CandleSeries};

pub const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(100);

pub fn http_client(cfg: &Config) -> Result<Client> {
    Client::builder()
        .timeout(cfg.http_timeout())
        .user_agent(concat!("signal-desk/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")
}

/// Keeps consecutive requests at least `MIN_REQUEST_INTERVAL` apart.
#[derive(Debug, Default)]
pub struct Throttle {
    last_request: Mutex<Option<Instant>>,
}

impl Throttle {
    pub async fn wait(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < MIN_REQUEST_INTERVAL {
                tokio::time::sleep(MIN_REQUEST_INTERVAL - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Symbol catalogue refreshed at most once per `ttl`. A failed refresh
/// serves the previous list when there is one.
#[derive(Debug)]
pub struct SymbolCatalog {
    ttl: Duration,
    entry: Mutex<Option<(Instant, Vec<String>)>>,
}

impl SymbolCatalog {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: Mutex::new(None),
        }
    }

    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Result<Vec<String>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<String>>>,
    {
        let mut entry = self.entry.lock().await;
        if let Some((fetched_at, symbols)) = entry.as_ref() {
            if fetched_at.elapsed() < self.ttl {
                return Ok(symbols.clone());
            }
        }

        match refresh().await {
            Ok(symbols) => {
                debug!(count = symbols.len(), "symbol catalogue refreshed");
                *entry = Some((Instant::now(), symbols.clone()));
                Ok(symbols)
            }
            Err(e) => match entry.as_ref() {
                Some((_, stale)) => {
                    warn!(error = %format!("{e:#}"), "symbol refresh failed, serving stale list");
                    Ok(stale.clone())
                }
                None => Err(e),
            },
        }
    }
}

/// Case-insensitive exact match against the catalogue.
pub fn match_symbol(symbols: &[String], input: &str) -> Option<String> {
    symbols
        .iter()
        .find(|s| s.eq_ignore_ascii_case(input))
        .cloned()
}

pub fn ms_to_utc(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
}

/// Number carried either as a JSON string or a JSON number.
pub fn num(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

pub fn int(value: &Value) -> Option<i64> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

/// `[time, open, high, low, close, volume, ...]` rows into ascending
/// candles. Malformed rows are skipped.
pub fn candles_from_rows(rows: &[Value]) -> CandleSeries {
    let mut candles: Vec<Candle> = rows
        .iter()
        .filter_map(|row| {
            let arr = row.as_array()?;
            if arr.len() < 6 {
                return None;
            }
            Some(Candle {
                open_time: ms_to_utc(int(&arr[0])?)?,
                open: num(&arr[1])?,
                high: num(&arr[2])?,
                low: num(&arr[3])?,
                close: num(&arr[4])?,
                volume: num(&arr[5])?,
            })
        })
        .collect();

    candles.sort_by_key(|c| c.open_time);
    candles.dedup_by_key(|c| c.open_time);
    CandleSeries::new(candles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn rows_sorted_and_malformed_skipped() {
        let rows = vec![
            json!(["1700000060000", "2", "3", "1", "2.5", "10"]),
            json!([1700000000000i64, "1", "2", "0.5", "1.5", "8"]),
            json!(["bad", "1", "2", "0.5", "1.5", "8"]),
            json!(["1700000120000", "1"]),
        ];
        let s = candles_from_rows(&rows);
        assert_eq!(s.len(), 2);
        assert_eq!(s[0].open, 1.0);
        assert_eq!(s[1].close, 2.5);
        assert!(s[0].open_time < s[1].open_time);
    }

    #[test]
    fn symbol_match_ignores_case() {
        let symbols = vec!["BTCUSDT".to_string(), "ETHUSDT".to_string()];
        assert_eq!(match_symbol(&symbols, "ethusdt"), Some("ETHUSDT".to_string()));
        assert_eq!(match_symbol(&symbols, "DOGEUSDT"), None);
    }

    #[tokio::test]
    async fn catalog_caches_within_ttl() {
        let catalog = SymbolCatalog::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            let list = catalog
                .get_or_refresh(|| async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec!["BTCUSDT".to_string()])
                })
                .await
                .unwrap();
            assert_eq!(list, vec!["BTCUSDT".to_string()]);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn catalog_serves_stale_on_failure() {
        let catalog = SymbolCatalog::new(Duration::ZERO);
        catalog
            .get_or_refresh(|| async { Ok(vec!["BTCUSDT".to_string()]) })
            .await
            .unwrap();
        let list = catalog
            .get_or_refresh(|| async { Err(anyhow::anyhow!("boom")) })
            .await
            .unwrap();
        assert_eq!(list, vec!["BTCUSDT".to_string()]);

        let empty = SymbolCatalog::new(Duration::ZERO);
        assert!(empty
            .get_or_refresh(|| async { Err(anyhow::anyhow!("boom")) })
            .await
            .is_err());
    }
}
