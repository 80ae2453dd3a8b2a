use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::config::Config;
use crate::exchange::rest::{self, SymbolCatalog, Throttle};
use crate::exchange::MarketData;
use crate::models::{CandleSeries, Timeframe};

const PRODUCT_TYPE: &str = "USDT-FUTURES";
const MAX_KLINE_LIMIT: usize = 1000;
const SUCCESS_CODE: &str = "00000";

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: String,
    #[serde(default)]
    msg: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Contract {
    symbol: String,
    #[serde(default)]
    quote_coin: String,
    #[serde(default)]
    symbol_status: Option<String>,
}

/// Bitget v2 USDT-futures market data.
pub struct BitgetClient {
    client: Client,
    base_url: String,
    throttle: Throttle,
    catalog: SymbolCatalog,
}

impl BitgetClient {
    pub fn new(cfg: &Config) -> Result<Self> {
        Ok(Self {
            client: rest::http_client(cfg)?,
            base_url: cfg.bitget_base_url.trim_end_matches('/').to_string(),
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
            .with_context(|| format!("Failed to reach Bitget {path}"))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Bitget API error {}: {}", status, body);
        }
        resp.json().await.context("Failed to decode Bitget response")
    }

    async fn fetch_symbols(&self) -> Result<Vec<String>> {
        let body = self
            .get(
                "/api/v2/mix/market/contracts",
                &[("productType", PRODUCT_TYPE.to_string())],
            )
            .await?;
        parse_contracts(body)
    }
}

fn unwrap_envelope<T>(env: Envelope<T>, what: &str) -> Result<Option<T>> {
    if env.code != SUCCESS_CODE {
        anyhow::bail!("Bitget {} error {}: {}", what, env.code, env.msg);
    }
    Ok(env.data)
}

pub fn parse_candles(body: Value) -> Result<CandleSeries> {
    let env: Envelope<Vec<Value>> =
        serde_json::from_value(body).context("Unexpected Bitget candle payload")?;
    let rows = unwrap_envelope(env, "candles")?.unwrap_or_default();
    Ok(rest::candles_from_rows(&rows))
}

/// USDT contracts that are not delisted or halted.
pub fn parse_contracts(body: Value) -> Result<Vec<String>> {
    let env: Envelope<Vec<Contract>> =
        serde_json::from_value(body).context("Unexpected Bitget contracts payload")?;
    let mut symbols: Vec<String> = unwrap_envelope(env, "contracts")?
        .unwrap_or_default()
        .into_iter()
        .filter(|c| c.quote_coin == "USDT" && c.symbol.ends_with("USDT"))
        .filter(|c| c.symbol_status.as_deref().map_or(true, |s| s == "normal"))
        .map(|c| c.symbol)
        .collect();
    symbols.sort();
    symbols.dedup();
    Ok(symbols)
}

#[async_trait]
impl MarketData for BitgetClient {
    async fn get_candles(&self, symbol: &str, timeframe: Timeframe, limit: usize) -> Result<CandleSeries> {
        let limit = limit.min(MAX_KLINE_LIMIT);
        let body = self
            .get(
                "/api/v2/mix/market/candles",
                &[
                    ("symbol", symbol.to_string()),
                    ("productType", PRODUCT_TYPE.to_string()),
                    ("granularity", timeframe.bitget_granularity().to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        let mut series = parse_candles(body)?;
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
    fn candles_parse() {
        let body = json!({
            "code": "00000",
            "msg": "success",
            "requestTime": 1700000000000i64,
            "data": [
                ["1700000000000", "100", "102", "99", "101", "10", "1005"],
                ["1700003600000", "101", "103", "100", "102", "11", "1120"]
            ]
        });
        let s = parse_candles(body).unwrap();
        assert_eq!(s.len(), 2);
        assert_eq!(s.last().unwrap().close, 102.0);
    }

    #[test]
    fn error_code_surfaces() {
        let body = json!({"code": "40034", "msg": "Parameter does not exist", "data": null});
        let err = parse_candles(body).unwrap_err();
        assert!(err.to_string().contains("40034"));
    }

    #[test]
    fn contracts_filtered() {
        let body = json!({
            "code": "00000",
            "msg": "success",
            "data": [
                {"symbol": "SOLUSDT", "quoteCoin": "USDT", "symbolStatus": "normal"},
                {"symbol": "BTCUSDT", "quoteCoin": "USDT"},
                {"symbol": "DEADUSDT", "quoteCoin": "USDT", "symbolStatus": "off"},
                {"symbol": "BTCUSD", "quoteCoin": "USD", "symbolStatus": "normal"}
            ]
        });
        let symbols = parse_contracts(body).unwrap();
        assert_eq!(symbols, vec!["BTCUSDT".to_string(), "SOLUSDT".to_string()]);
    }
}
