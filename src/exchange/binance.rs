use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::config::Config;
use crate::exchange::rest::{self, SymbolCatalog, Throttle};
use crate::exchange::MarketData;
use crate::models::{CandleSeries, Timeframe};

const MAX_KLINE_LIMIT: usize = 1500;

#[derive(Debug, Deserialize)]
struct ExchangeInfo {
    #[serde(default)]
    symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SymbolInfo {
    symbol: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    contract_type: String,
    #[serde(default)]
    quote_asset: String,
}

/// Binance USDT-M futures market data.
pub struct BinanceClient {
    client: Client,
    base_url: String,
    throttle: Throttle,
    catalog: SymbolCatalog,
}

impl BinanceClient {
    pub fn new(cfg: &Config) -> Result<Self> {
        Ok(Self {
            client: rest::http_client(cfg)?,
            base_url: cfg.binance_base_url.trim_end_matches('/').to_string(),
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
            .with_context(|| format!("Failed to reach Binance {path}"))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Binance API error {}: {}", status, body);
        }
        resp.json().await.context("Failed to decode Binance response")
    }

    async fn fetch_symbols(&self) -> Result<Vec<String>> {
        let body = self.get("/fapi/v1/exchangeInfo", &[]).await?;
        parse_exchange_info(body)
    }
}

/// `/fapi/v1/klines` rows, already oldest first.
pub fn parse_klines(body: Value) -> Result<CandleSeries> {
    let rows = body
        .as_array()
        .context("Unexpected Binance kline payload")?;
    Ok(rest::candles_from_rows(rows))
}

/// Trading USDT perpetuals from `/fapi/v1/exchangeInfo`.
pub fn parse_exchange_info(body: Value) -> Result<Vec<String>> {
    let info: ExchangeInfo =
        serde_json::from_value(body).context("Unexpected Binance exchangeInfo payload")?;
    let mut symbols: Vec<String> = info
        .symbols
        .into_iter()
        .filter(|s| {
            s.status == "TRADING"
                && s.contract_type == "PERPETUAL"
                && (s.quote_asset == "USDT" || s.symbol.ends_with("USDT"))
        })
        .map(|s| s.symbol)
        .collect();
    symbols.sort();
    symbols.dedup();
    Ok(symbols)
}

#[async_trait]
impl MarketData for BinanceClient {
    async fn get_candles(&self, symbol: &str, timeframe: Timeframe, limit: usize) -> Result<CandleSeries> {
        let limit = limit.min(MAX_KLINE_LIMIT);
        let body = self
            .get(
                "/fapi/v1/klines",
                &[
                    ("symbol", symbol.to_string()),
                    ("interval", timeframe.binance_interval().to_string()),
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
