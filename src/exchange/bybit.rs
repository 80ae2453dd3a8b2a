use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::exchange::rest::{self, SymbolCatalog, Throttle};
use crate::exchange::MarketData;
use crate::models::{CandleSeries, Timeframe};

const MAX_KLINE_LIMIT: usize = 1000;
const INSTRUMENT_PAGE_LIMIT: &str = "1000";
/// Upper bound on catalogue pages followed.
const MAX_INSTRUMENT_PAGES: usize = 20;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<T> {
    ret_code: i64,
    #[serde(default)]
    ret_msg: String,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct KlineResult {
    #[serde(default)]
    list: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstrumentsResult {
    #[serde(default)]
    list: Vec<Instrument>,
    #[serde(default)]
    next_page_cursor: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Instrument {
    symbol: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    quote_coin: String,
}

/// Bybit v5 linear (USDT perpetual) market data.
pub struct BybitClient {
    client: Client,
    base_url: String,
    throttle: Throttle,
    catalog: SymbolCatalog,
}

impl BybitClient {
    pub fn new(cfg: &Config) -> Result<Self> {
        Ok(Self {
            client: rest::http_client(cfg)?,
            base_url: cfg.bybit_base_url.trim_end_matches('/').to_string(),
            throttle: Throttle::default(),
            catalog: SymbolCatalog::new(cfg.symbol_cache_ttl()),
        })
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        self.throttle.wait().await;
        let resp = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(query)
            .send()
            .await
            .with_context(|| format!("Failed to reach Bybit {path}"))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Bybit API error {}: {}", status, body);
        }
        resp.json().await.context("Failed to decode Bybit response")
    }

    async fn fetch_symbols(&self) -> Result<Vec<String>> {
        let mut symbols = Vec::new();
        let mut cursor = String::new();

        for _ in 0..MAX_INSTRUMENT_PAGES {
            let mut query = vec![
                ("category", "linear".to_string()),
                ("status", "Trading".to_string()),
                ("limit", INSTRUMENT_PAGE_LIMIT.to_string()),
            ];
            if !cursor.is_empty() {
                query.push(("cursor", cursor.clone()));
            }
            let body = self.get("/v5/market/instruments-info", &query).await?;
            let (page, next) = parse_instruments(body)?;
            symbols.extend(page);
            if next.is_empty() {
                break;
            }
            cursor = next;
        }

        symbols.sort();
        symbols.dedup();
        debug!(count = symbols.len(), "bybit instruments loaded");
        Ok(symbols)
    }
}

/// Kline payload into ascending candles. Bybit lists newest first.
pub fn parse_klines(body: Value) -> Result<CandleSeries> {
    let env: Envelope<KlineResult> =
        serde_json::from_value(body).context("Unexpected Bybit kline payload")?;
    if env.ret_code != 0 {
        anyhow::bail!("Bybit kline error {}: {}", env.ret_code, env.ret_msg);
    }
    let rows = env.result.map(|r| r.list).unwrap_or_default();
    Ok(rest::candles_from_rows(&rows))
}

/// One catalogue page: trading USDT symbols plus the next cursor.
pub fn parse_instruments(body: Value) -> Result<(Vec<String>, String)> {
    let env: Envelope<InstrumentsResult> =
        serde_json::from_value(body).context("Unexpected Bybit instruments payload")?;
    if env.ret_code != 0 {
        anyhow::bail!("Bybit instruments error {}: {}", env.ret_code, env.ret_msg);
    }
    let result = env.result.unwrap_or(InstrumentsResult {
        list: Vec::new(),
        next_page_cursor: String::new(),
    });
    let symbols = result
        .list
        .into_iter()
        .filter(|i| {
            i.status.eq_ignore_ascii_case("trading")
                && (i.quote_coin == "USDT" || i.symbol.ends_with("USDT"))
        })
        .map(|i| i.symbol)
        .collect();
    Ok((symbols, result.next_page_cursor))
}

#[async_trait]
impl MarketData for BybitClient {
    async fn get_candles(&self, symbol: &str, timeframe: Timeframe, limit: usize) -> Result<CandleSeries> {
        let limit = limit.min(MAX_KLINE_LIMIT);
        let body = self
            .get(
                "/v5/market/kline",
                &[
                    ("category", "linear".to_string()),
                    ("symbol", symbol.to_string()),
                    ("interval", timeframe.bybit_interval().to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        let mut series = parse_klines(body)?;
        series.truncate_front(limit);
        Ok(series)
    }

    async fn resolve_symbol(&self, input: &str) -> Result<Option<String>> {
        let symbols = self.list_symbols().await?;
        Ok(rest::match_symbol(&symbols, input))
    }

    async fn list_symbols(&self) -> Result<Vec<String>> {
        self.catalog.get_or_refresh(|| self.fetch_symbols()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn klines_reversed_to_ascending() {
        let body = json!({
            "retCode": 0,
            "retMsg": "OK",
            "result": {
                "category": "linear",
                "symbol": "BTCUSDT",
                "list": [
                    ["1700003600000", "101", "103", "100", "102", "12.5", "1270"],
                    ["1700000000000", "100", "102", "99", "101", "10", "1005"]
                ]
            }
        });
        let s = parse_klines(body).unwrap();
        assert_eq!(s.len(), 2);
        assert_eq!(s[0].open, 100.0);
        assert_eq!(s[1].close, 102.0);
        assert_eq!(s[1].volume, 12.5);
    }

    #[test]
    fn kline_error_code_surfaces() {
        let body = json!({"retCode": 10001, "retMsg": "params error", "result": {}});
        let err = parse_klines(body).unwrap_err();
        assert!(err.to_string().contains("10001"));
    }

    #[test]
    fn instruments_filtered_with_cursor() {
        let body = json!({
            "retCode": 0,
            "retMsg": "OK",
            "result": {
                "category": "linear",
                "list": [
                    {"symbol": "BTCUSDT", "status": "Trading", "quoteCoin": "USDT"},
                    {"symbol": "BTCPERP", "status": "Trading", "quoteCoin": "USDC"},
                    {"symbol": "OLDUSDT", "status": "Closed", "quoteCoin": "USDT"}
                ],
                "nextPageCursor": "abc"
            }
        });
        let (symbols, next) = parse_instruments(body).unwrap();
        assert_eq!(symbols, vec!["BTCUSDT".to_string()]);
        assert_eq!(next, "abc");
    }
}
