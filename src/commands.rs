use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::SharedConfig;
use crate::core::{ParameterResolver, ScanRanker, Synthesizer};
use crate::error::CommandError;
use crate::exchange::{self, MarketData, MarketDirectory};
use crate::models::{
    CandleSeries, CoinListRequest, CommandMode, Exchange, ResolvedCommand, ScanRequest, ScanResult,
    SignalRequest, TradePlan,
};
use crate::response::{Reply, ResponseAssembler};

/// Result of a command before rendering.
#[derive(Debug, Clone)]
pub enum Outcome {
    Signal {
        plan: TradePlan,
        candles: CandleSeries,
        detail: bool,
    },
    Scan {
        result: ScanResult,
        detail: bool,
    },
    CoinList {
        exchange: Exchange,
        filter: Option<String>,
        symbols: Vec<String>,
    },
    Help,
}

/// Chat-command surface: resolves a command line, runs the analysis
/// against the market directory and renders the reply.
pub struct CommandRouter {
    config: SharedConfig,
    resolver: ParameterResolver,
    markets: MarketDirectory,
    synthesizer: Arc<Synthesizer>,
    ranker: ScanRanker,
    assembler: ResponseAssembler,
}

impl CommandRouter {
    pub fn new(config: SharedConfig, markets: MarketDirectory) -> Self {
        let synthesizer = Arc::new(Synthesizer::default());
        Self {
            resolver: ParameterResolver::with_default_exchange(config.default_exchange),
            ranker: ScanRanker::new(synthesizer.clone(), config.scan_concurrency, config.candle_limit),
            assembler: ResponseAssembler::from_config(&config),
            synthesizer,
            markets,
            config,
        }
    }

    /// Command name and arguments of a chat line, prefix optional.
    pub fn parse_line(&self, line: &str) -> Option<(String, Vec<String>)> {
        let line = line.trim();
        let line = line.strip_prefix(self.config.command_prefix.as_str()).unwrap_or(line);
        let mut words = line.split_whitespace();
        let name = words.next()?.to_ascii_lowercase();
        Some((name, words.map(str::to_string).collect()))
    }

    /// Handles one line end to end. Errors become error replies; `None` for
    /// a blank line.
    pub async fn handle(&self, line: &str, now: DateTime<Utc>) -> Option<Reply> {
        let (name, args) = self.parse_line(line)?;
        info!(command = %name, args = ?args, "command received");

        let reply = match self.execute(&name, &args).await {
            Ok(outcome) => self.render(&outcome, now),
            Err(e) => {
                match &e {
                    CommandError::Internal(msg) => error!(command = %name, error = %msg, "command failed"),
                    other => warn!(command = %name, error = %other, "command rejected"),
                }
                self.assembler.error(&e, now)
            }
        };
        Some(reply)
    }

    pub async fn execute(&self, name: &str, args: &[String]) -> Result<Outcome, CommandError> {
        if name == "help" {
            return Ok(Outcome::Help);
        }
        let mode = CommandMode::from_name(name)
            .ok_or_else(|| CommandError::UnknownCommand(name.to_string()))?;

        match self.resolver.resolve(args, mode)? {
            ResolvedCommand::Signal(req) => {
                let (plan, candles) = self.signal(&req).await?;
                Ok(Outcome::Signal {
                    plan,
                    candles,
                    detail: req.detail,
                })
            }
            ResolvedCommand::Scan(req) => {
                let detail = req.detail;
                let result = self.scan(&req).await?;
                Ok(Outcome::Scan { result, detail })
            }
            ResolvedCommand::CoinList(req) => {
                let symbols = self.coin_list(&req).await?;
                Ok(Outcome::CoinList {
                    exchange: req.exchange,
                    filter: req.filter,
                    symbols,
                })
            }
        }
    }

    fn market(&self, exchange: Exchange) -> Result<Arc<dyn MarketData>, CommandError> {
        self.markets
            .get(exchange)
            .ok_or_else(|| CommandError::Internal(format!("no market data provider for {exchange}")))
    }

    /// Single-symbol analysis. Returns the candle window too, for charting.
    pub async fn signal(&self, req: &SignalRequest) -> Result<(TradePlan, CandleSeries), CommandError> {
        let market = self.market(req.exchange)?;
        let limit = self.config.candle_limit.max(req.ema.required_candles());
        let (symbol, candles) =
            exchange::fetch_window(market.as_ref(), req.exchange, &req.symbol, req.timeframe, limit).await?;

        let mut req = req.clone();
        req.symbol = symbol;
        let plan = self.synthesizer.analyze(&req, &candles)?;
        info!(
            symbol = %plan.symbol,
            direction = %plan.direction,
            confidence = plan.confidence,
            "signal generated"
        );
        Ok((plan, candles))
    }

    pub async fn scan(&self, req: &ScanRequest) -> Result<ScanResult, CommandError> {
        let market = self.market(req.exchange)?;
        Ok(self.ranker.rank(market, req).await)
    }

    /// Listed symbols, filtered by base-asset prefix when given.
    pub async fn coin_list(&self, req: &CoinListRequest) -> Result<Vec<String>, CommandError> {
        let market = self.market(req.exchange)?;
        let symbols = market.list_symbols().await.map_err(|e| {
            warn!(exchange = %req.exchange, error = %format!("{e:#}"), "symbol list failed");
            crate::error::AnalysisError::DataSource(format!("{e:#}"))
        })?;
        Ok(match &req.filter {
            Some(prefix) => symbols.into_iter().filter(|s| s.starts_with(prefix.as_str())).collect(),
            None => symbols,
        })
    }

    pub fn render(&self, outcome: &Outcome, now: DateTime<Utc>) -> Reply {
        match outcome {
            Outcome::Signal { plan, detail, .. } => self.assembler.signal(plan, *detail, now),
            Outcome::Scan { result, detail } => self.assembler.scan(result, *detail, now),
            Outcome::CoinList {
                exchange,
                filter,
                symbols,
            } => self.assembler.coin_list(*exchange, filter.as_deref(), symbols, now),
            Outcome::Help => self.assembler.help(now),
        }
    }
}
