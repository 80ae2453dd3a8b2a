use thiserror::Error;

use crate::models::Exchange;

/// Rejections raised while resolving a command's tokens. Always recoverable;
/// the message is shown to the user as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParameterError {
    #[error("parameter `{0}` not recognized")]
    UnrecognizedToken(String),
    #[error("no coin given")]
    NoSymbol,
    #[error("invalid timeframe `{0}`, choose one of 1m 3m 5m 15m 30m 1h 2h 4h 6h 12h 1d 1w 1M")]
    InvalidTimeframe(String),
    #[error("invalid direction `{0}`, use long, short or auto")]
    InvalidDirection(String),
    #[error("EMA period {period} out of range, must be between 5 and 200")]
    EmaOutOfRange { period: u32 },
    #[error("EMA periods {short} and {long} cannot be ordered, they must differ")]
    EmaOrdering { short: u32, long: u32 },
    #[error("invalid exchange `{0}`, use bybit, binance or bitget")]
    InvalidExchange(String),
    #[error("too many coins: {count} given, at most {max} allowed")]
    TooManySymbols { count: usize, max: usize },
    #[error("{field} given twice: `{first}` and `{second}`")]
    ConflictingParameter {
        field: &'static str,
        first: String,
        second: String,
    },
}

/// Failures of a single symbol analysis. Terminal for that symbol only.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("not enough candle history: need {required}, got {available}")]
    DataInsufficient { required: usize, available: usize },
    #[error("pair {symbol} not available on {exchange}")]
    SymbolNotFound { symbol: String, exchange: Exchange },
    #[error("invalid candle data: {0}")]
    InvalidCandles(String),
    #[error("market data unavailable")]
    DataSource(String),
}

#[derive(Error, Debug)]
pub enum CommandError {
    #[error(transparent)]
    Parameter(#[from] ParameterError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error("unknown command `{0}`")]
    UnknownCommand(String),
    #[error("something went wrong while processing the command")]
    Internal(String),
}
