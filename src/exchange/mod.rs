pub mod binance;
pub mod bitget;
pub mod bybit;
pub mod memory;
pub mod rest;

pub use binance::BinanceClient;
pub use bitget::BitgetClient;
pub use bybit::BybitClient;
pub use memory::StaticMarket;

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::config::Config;
use crate::error::AnalysisError;
use crate::models::{CandleSeries, Exchange, Timeframe};

/// Candle and symbol-catalogue source for one exchange.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Most recent `limit` candles, oldest first.
    async fn get_candles(&self, symbol: &str, timeframe: Timeframe, limit: usize) -> Result<CandleSeries>;
    /// Canonical symbol for `input`, or `None` if the exchange does not list it.
    async fn resolve_symbol(&self, input: &str) -> Result<Option<String>>;
    async fn list_symbols(&self) -> Result<Vec<String>>;
}

/// One provider per supported exchange.
#[derive(Clone, Default)]
pub struct MarketDirectory {
    providers: HashMap<Exchange, Arc<dyn MarketData>>,
}

impl MarketDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// REST providers for every exchange, configured from `cfg`.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let mut dir = Self::new();
        dir.insert(Exchange::Bybit, Arc::new(BybitClient::new(cfg)?));
        dir.insert(Exchange::Binance, Arc::new(BinanceClient::new(cfg)?));
        dir.insert(Exchange::Bitget, Arc::new(BitgetClient::new(cfg)?));
        Ok(dir)
    }

    pub fn insert(&mut self, exchange: Exchange, provider: Arc<dyn MarketData>) {
        self.providers.insert(exchange, provider);
    }

    pub fn with(mut self, exchange: Exchange, provider: Arc<dyn MarketData>) -> Self {
        self.insert(exchange, provider);
        self
    }

    pub fn get(&self, exchange: Exchange) -> Option<Arc<dyn MarketData>> {
        self.providers.get(&exchange).cloned()
    }
}

/// Resolves `symbol` on `market` and fetches its candle window, mapping
/// data-layer failures onto `AnalysisError`.
pub async fn fetch_window(
    market: &dyn MarketData,
    exchange: Exchange,
    symbol: &str,
    timeframe: Timeframe,
    limit: usize,
) -> Result<(String, CandleSeries), AnalysisError> {
    let resolved = market
        .resolve_symbol(symbol)
        .await
        .map_err(|e| data_source(exchange, symbol, e))?
        .ok_or_else(|| AnalysisError::SymbolNotFound {
            symbol: symbol.to_string(),
            exchange,
        })?;

    let candles = market
        .get_candles(&resolved, timeframe, limit)
        .await
        .map_err(|e| data_source(exchange, &resolved, e))?;

    Ok((resolved, candles))
}

fn data_source(exchange: Exchange, symbol: &str, err: anyhow::Error) -> AnalysisError {
    warn!(%exchange, symbol, error = %format!("{err:#}"), "market data request failed");
    AnalysisError::DataSource(format!("{err:#}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::make_flat;

    #[tokio::test]
    async fn fetch_window_resolves_then_loads() {
        let market = StaticMarket::new().with_candles("BTCUSDT", Timeframe::H1, make_flat(60, 100.0));
        let (symbol, candles) = fetch_window(&market, Exchange::Bybit, "btcusdt", Timeframe::H1, 50)
            .await
            .unwrap();
        assert_eq!(symbol, "BTCUSDT");
        assert_eq!(candles.len(), 50);
    }

    #[tokio::test]
    async fn unknown_symbol_is_not_found() {
        let market = StaticMarket::new();
        let err = fetch_window(&market, Exchange::Binance, "FOOUSDT", Timeframe::H1, 50)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            AnalysisError::SymbolNotFound {
                symbol: "FOOUSDT".to_string(),
                exchange: Exchange::Binance
            }
        );
    }

    #[test]
    fn directory_lookup() {
        let dir = MarketDirectory::new().with(Exchange::Bitget, Arc::new(StaticMarket::new()));
        assert!(dir.get(Exchange::Bitget).is_some());
        assert!(dir.get(Exchange::Bybit).is_none());
    }
}
