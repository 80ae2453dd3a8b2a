use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::core::synthesizer::Synthesizer;
use crate::error::AnalysisError;
use crate::exchange::{self, MarketData};
use crate::models::{CandleSeries, EmaPair, ScanEntry, ScanExclusion, ScanRequest, ScanResult, MAX_SCAN_SYMBOLS};

/// EMA pairs tried for every scanned symbol after the requested one.
pub const SCAN_PRESETS: [EmaPair; 4] = [
    EmaPair::new(9, 21),
    EmaPair::new(13, 21),
    EmaPair::new(20, 50),
    EmaPair::new(50, 100),
];

/// Requested pair first, then the presets, without duplicates.
pub fn scan_configs(requested: EmaPair) -> Vec<EmaPair> {
    let mut configs = vec![requested];
    for preset in SCAN_PRESETS {
        if !configs.contains(&preset) {
            configs.push(preset);
        }
    }
    configs
}

/// Best configuration for one symbol over an already loaded window.
/// Highest confidence wins, ties go to the earlier configuration. Fails
/// with the first configuration's error only when every one fails.
pub fn best_setup(
    synthesizer: &Synthesizer,
    request: &ScanRequest,
    symbol: &str,
    candles: &CandleSeries,
) -> Result<ScanEntry, AnalysisError> {
    let mut best: Option<ScanEntry> = None;
    let mut first_err = None;

    for ema in scan_configs(request.ema) {
        let signal = request.signal_for(symbol, ema);
        match synthesizer.analyze(&signal, candles) {
            Ok(plan) => {
                if best.as_ref().map_or(true, |b| plan.confidence > b.plan.confidence) {
                    best = Some(ScanEntry {
                        symbol: symbol.to_string(),
                        ema,
                        plan,
                    });
                }
            }
            Err(e) => {
                first_err.get_or_insert(e);
            }
        }
    }

    best.ok_or_else(|| {
        first_err.unwrap_or(AnalysisError::DataInsufficient {
            required: request.ema.required_candles(),
            available: candles.len(),
        })
    })
}

/// Runs the synthesizer across a scan's symbols with bounded concurrency
/// and ranks the results.
#[derive(Debug, Clone)]
pub struct ScanRanker {
    synthesizer: Arc<Synthesizer>,
    concurrency: usize,
    candle_limit: usize,
}

impl ScanRanker {
    pub fn new(synthesizer: Arc<Synthesizer>, concurrency: usize, candle_limit: usize) -> Self {
        Self {
            synthesizer,
            concurrency: concurrency.clamp(1, MAX_SCAN_SYMBOLS),
            candle_limit,
        }
    }

    /// One task per symbol, at most `concurrency` in flight. Results are
    /// collected in request order, so ranking is independent of completion
    /// order. A failing symbol becomes an exclusion and never aborts the rest.
    pub async fn rank(&self, market: Arc<dyn MarketData>, request: &ScanRequest) -> ScanResult {
        info!(
            symbols = ?request.symbols,
            timeframe = %request.timeframe,
            exchange = %request.exchange,
            "scan started"
        );

        let limit = scan_configs(request.ema)
            .iter()
            .map(|e| e.required_candles())
            .max()
            .unwrap_or(0)
            .max(self.candle_limit);
        let permits = Arc::new(Semaphore::new(self.concurrency));

        let handles: Vec<_> = request
            .symbols
            .iter()
            .map(|symbol| {
                let permits = permits.clone();
                let market = market.clone();
                let synthesizer = self.synthesizer.clone();
                let request = request.clone();
                let symbol = symbol.clone();
                tokio::spawn(async move {
                    let _permit = permits
                        .acquire_owned()
                        .await
                        .map_err(|e| AnalysisError::DataSource(e.to_string()))?;
                    let (resolved, candles) = exchange::fetch_window(
                        market.as_ref(),
                        request.exchange,
                        &symbol,
                        request.timeframe,
                        limit,
                    )
                    .await?;
                    best_setup(&synthesizer, &request, &resolved, &candles)
                })
            })
            .collect();

        let mut entries = Vec::new();
        let mut excluded = Vec::new();
        for (symbol, handle) in request.symbols.iter().zip(handles) {
            let reason = match handle.await {
                Ok(Ok(entry)) => {
                    entries.push(entry);
                    continue;
                }
                Ok(Err(e)) => e.to_string(),
                Err(e) => {
                    warn!(%symbol, error = %e, "scan task failed");
                    "internal failure".to_string()
                }
            };
            warn!(%symbol, %reason, "symbol excluded from scan");
            excluded.push(ScanExclusion {
                symbol: symbol.clone(),
                reason,
            });
        }

        entries.sort_by(|a, b| b.plan.confidence.total_cmp(&a.plan.confidence));

        info!(ranked = entries.len(), excluded = excluded.len(), "scan finished");
        ScanResult {
            timeframe: request.timeframe,
            exchange: request.exchange,
            entries,
            excluded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::StaticMarket;
    use crate::models::{Exchange, Timeframe};
    use crate::test_helpers::{make_bearish_trend, make_bullish_trend, make_flat};

    fn scan(symbols: &[&str]) -> ScanRequest {
        ScanRequest {
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            timeframe: Timeframe::H1,
            ema: EmaPair::DEFAULT,
            exchange: Exchange::Bybit,
            detail: false,
        }
    }

    fn ranker() -> ScanRanker {
        ScanRanker::new(Arc::new(Synthesizer::default()), 5, 200)
    }

    #[test]
    fn configs_deduplicated_in_order() {
        assert_eq!(
            scan_configs(EmaPair::DEFAULT),
            vec![
                EmaPair::new(13, 21),
                EmaPair::new(9, 21),
                EmaPair::new(20, 50),
                EmaPair::new(50, 100)
            ]
        );
        assert_eq!(scan_configs(EmaPair::new(20, 50)).len(), 4);
        assert_eq!(scan_configs(EmaPair::new(8, 30)).len(), 5);
    }

    #[test]
    fn short_history_skips_long_presets() {
        let candles = make_bullish_trend(60, 100.0);
        let entry = best_setup(&Synthesizer::default(), &scan(&["BTCUSDT"]), "BTCUSDT", &candles).unwrap();
        assert!(entry.ema.long <= 50);
    }

    #[test]
    fn all_configs_failing_reports_first_error() {
        let candles = make_flat(16, 100.0);
        let err = best_setup(&Synthesizer::default(), &scan(&["BTCUSDT"]), "BTCUSDT", &candles).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::DataInsufficient {
                required: 21,
                available: 16
            }
        );
    }

    #[tokio::test]
    async fn ranks_by_confidence_and_records_exclusions() {
        let market = StaticMarket::new()
            .with_candles("BTCUSDT", Timeframe::H1, make_bullish_trend(150, 100.0))
            .with_candles("ETHUSDT", Timeframe::H1, make_flat(150, 50.0))
            .with_candles("SOLUSDT", Timeframe::H1, make_bearish_trend(150, 5000.0))
            .with_candles("XRPUSDT", Timeframe::H1, make_flat(10, 1.0));
        let market: Arc<dyn MarketData> = Arc::new(market);

        let result = ranker()
            .rank(market, &scan(&["ETHUSDT", "BTCUSDT", "NOPEUSDT", "SOLUSDT", "XRPUSDT"]))
            .await;

        assert_eq!(result.entries.len(), 3);
        let confidences: Vec<f64> = result.entries.iter().map(|e| e.plan.confidence).collect();
        assert!(confidences.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(result.entries.last().unwrap().symbol, "ETHUSDT");

        let excluded: Vec<&str> = result.excluded.iter().map(|e| e.symbol.as_str()).collect();
        assert_eq!(excluded, vec!["NOPEUSDT", "XRPUSDT"]);
        assert!(result.excluded[0].reason.contains("not available"));
        assert!(result.excluded[1].reason.contains("not enough candle history"));
    }

    #[tokio::test]
    async fn scan_is_deterministic() {
        let market: Arc<dyn MarketData> = Arc::new(
            StaticMarket::new()
                .with_candles("BTCUSDT", Timeframe::H1, make_bullish_trend(150, 100.0))
                .with_candles("ETHUSDT", Timeframe::H1, make_bullish_trend(150, 300.0)),
        );
        let request = scan(&["BTCUSDT", "ETHUSDT"]);
        let a = ranker().rank(market.clone(), &request).await;
        let b = ranker().rank(market, &request).await;
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn equal_confidence_keeps_request_order() {
        let market: Arc<dyn MarketData> = Arc::new(
            StaticMarket::new()
                .with_candles("BTCUSDT", Timeframe::H1, make_bullish_trend(150, 100.0))
                .with_candles("ETHUSDT", Timeframe::H1, make_bullish_trend(150, 100.0))
                .with_candles("SOLUSDT", Timeframe::H1, make_bullish_trend(150, 100.0)),
        );

        let result = ranker()
            .rank(market, &scan(&["SOLUSDT", "ETHUSDT", "BTCUSDT"]))
            .await;

        let ranked: Vec<&str> = result.entries.iter().map(|e| e.symbol.as_str()).collect();
        assert_eq!(ranked, vec!["SOLUSDT", "ETHUSDT", "BTCUSDT"]);
        let first = result.entries[0].plan.confidence;
        assert!(result.entries.iter().all(|e| e.plan.confidence == first));
    }
}
