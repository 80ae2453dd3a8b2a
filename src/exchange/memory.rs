use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};

use crate::exchange::MarketData;
use crate::models::{Candle, CandleSeries, Timeframe};

/// A MarketData implementation serving pre-loaded candles. An optional
/// cursor (`as_of`) hides candles opened after it, so a stored history can
/// be replayed bar by bar.
#[derive(Debug, Clone, Default)]
pub struct StaticMarket {
    data: HashMap<(String, Timeframe), Vec<Candle>>,
    symbols: BTreeSet<String>,
    as_of: Option<DateTime<Utc>>,
}

impl StaticMarket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load candles for one symbol and timeframe. Candles must be sorted
    /// oldest-first.
    pub fn load(&mut self, symbol: &str, tf: Timeframe, candles: CandleSeries) {
        let symbol = symbol.to_ascii_uppercase();
        self.symbols.insert(symbol.clone());
        self.data.insert((symbol, tf), candles.as_slice().to_vec());
    }

    pub fn with_candles(mut self, symbol: &str, tf: Timeframe, candles: CandleSeries) -> Self {
        self.load(symbol, tf, candles);
        self
    }

    /// List a symbol without any candle history.
    pub fn with_symbol(mut self, symbol: &str) -> Self {
        self.symbols.insert(symbol.to_ascii_uppercase());
        self
    }

    pub fn set_time(&mut self, t: DateTime<Utc>) {
        self.as_of = Some(t);
    }

    fn visible_candles(&self, symbol: &str, tf: Timeframe, limit: usize) -> CandleSeries {
        let key = (symbol.to_ascii_uppercase(), tf);
        let Some(all) = self.data.get(&key) else {
            return CandleSeries::default();
        };

        let end = match self.as_of {
            Some(now) => all.partition_point(|c| c.open_time <= now),
            None => all.len(),
        };
        let start = end.saturating_sub(limit);
        CandleSeries::new(all[start..end].to_vec())
    }
}

#[async_trait]
impl MarketData for StaticMarket {
    async fn get_candles(&self, symbol: &str, timeframe: Timeframe, limit: usize) -> Result<CandleSeries> {
        Ok(self.visible_candles(symbol, timeframe, limit))
    }

    async fn resolve_symbol(&self, input: &str) -> Result<Option<String>> {
        let upper = input.to_ascii_uppercase();
        Ok(self.symbols.contains(&upper).then_some(upper))
    }

    async fn list_symbols(&self) -> Result<Vec<String>> {
        Ok(self.symbols.iter().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::make_bullish_trend;

    #[tokio::test]
    async fn serves_most_recent_window() {
        let market = StaticMarket::new().with_candles("BTCUSDT", Timeframe::H1, make_bullish_trend(100, 100.0));
        let s = market.get_candles("btcusdt", Timeframe::H1, 30).await.unwrap();
        assert_eq!(s.len(), 30);
        assert_eq!(s.last().unwrap().open, 100.0 + 99.0 * 10.0);
        assert!(market.get_candles("BTCUSDT", Timeframe::H4, 30).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cursor_hides_future_candles() {
        let series = make_bullish_trend(100, 100.0);
        let cutoff = series[49].open_time;
        let mut market = StaticMarket::new().with_candles("ETHUSDT", Timeframe::H1, series);
        market.set_time(cutoff);
        let s = market.get_candles("ETHUSDT", Timeframe::H1, 500).await.unwrap();
        assert_eq!(s.len(), 50);
        assert_eq!(s.last().unwrap().open_time, cutoff);
    }

    #[tokio::test]
    async fn symbols_listed_sorted() {
        let market = StaticMarket::new()
            .with_symbol("solusdt")
            .with_candles("BTCUSDT", Timeframe::H1, make_bullish_trend(5, 1.0));
        assert_eq!(
            market.list_symbols().await.unwrap(),
            vec!["BTCUSDT".to_string(), "SOLUSDT".to_string()]
        );
        assert_eq!(market.resolve_symbol("SolUsdt").await.unwrap(), Some("SOLUSDT".to_string()));
        assert_eq!(market.resolve_symbol("DOGEUSDT").await.unwrap(), None);
    }
}
