use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{Exchange, RequestedDirection, Timeframe};

pub const MIN_EMA_PERIOD: u32 = 5;
pub const MAX_EMA_PERIOD: u32 = 200;
pub const MAX_SCAN_SYMBOLS: usize = 5;

/// Short/long EMA periods. Always `short < long` once resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmaPair {
    pub short: u32,
    pub long: u32,
}

impl EmaPair {
    pub const DEFAULT: EmaPair = EmaPair { short: 13, long: 21 };

    pub const fn new(short: u32, long: u32) -> Self {
        Self { short, long }
    }

    /// Candles needed before every indicator of this pair is defined.
    pub fn required_candles(&self) -> usize {
        (self.long as usize).max(crate::core::indicators::RSI_PERIOD + 1)
    }
}

impl Default for EmaPair {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for EmaPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EMA{}/EMA{}", self.short, self.long)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandMode {
    Signal,
    Scan,
    CoinList,
}

impl CommandMode {
    pub fn from_name(name: &str) -> Option<CommandMode> {
        match name.to_ascii_lowercase().as_str() {
            "signal" => Some(CommandMode::Signal),
            "scan" => Some(CommandMode::Scan),
            "coinlist" | "coins" => Some(CommandMode::CoinList),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalRequest {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub direction: RequestedDirection,
    pub ema: EmaPair,
    pub exchange: Exchange,
    pub detail: bool,
}

impl SignalRequest {
    /// A request with every optional field at its default.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe: Timeframe::default(),
            direction: RequestedDirection::default(),
            ema: EmaPair::DEFAULT,
            exchange: Exchange::default(),
            detail: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequest {
    pub symbols: Vec<String>,
    pub timeframe: Timeframe,
    pub ema: EmaPair,
    pub exchange: Exchange,
    pub detail: bool,
}

impl ScanRequest {
    /// The Auto-direction signal request for one scanned symbol.
    pub fn signal_for(&self, symbol: &str, ema: EmaPair) -> SignalRequest {
        SignalRequest {
            symbol: symbol.to_string(),
            timeframe: self.timeframe,
            direction: RequestedDirection::Auto,
            ema,
            exchange: self.exchange,
            detail: self.detail,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinListRequest {
    pub exchange: Exchange,
    pub filter: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolvedCommand {
    Signal(SignalRequest),
    Scan(ScanRequest),
    CoinList(CoinListRequest),
}
