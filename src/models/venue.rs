use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ParameterError;

/// Futures venue a request is served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Exchange {
    #[default]
    Bybit,
    Binance,
    Bitget,
}

impl Exchange {
    pub const ALL: [Exchange; 3] = [Exchange::Bybit, Exchange::Binance, Exchange::Bitget];

    pub fn as_str(&self) -> &'static str {
        match self {
            Exchange::Bybit => "bybit",
            Exchange::Binance => "binance",
            Exchange::Bitget => "bitget",
        }
    }

    /// Upper-case name used in replies and TradingView links.
    pub fn display_name(&self) -> &'static str {
        match self {
            Exchange::Bybit => "BYBIT",
            Exchange::Binance => "BINANCE",
            Exchange::Bitget => "BITGET",
        }
    }

    pub fn from_token(token: &str) -> Option<Exchange> {
        let lower = token.to_ascii_lowercase();
        Exchange::ALL.iter().copied().find(|e| e.as_str() == lower)
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Exchange {
    type Err = ParameterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_token(s.trim()).ok_or_else(|| ParameterError::InvalidExchange(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exchange_tokens() {
        assert_eq!(Exchange::from_token("BINANCE"), Some(Exchange::Binance));
        assert_eq!(Exchange::from_token("bitget"), Some(Exchange::Bitget));
        assert_eq!(Exchange::from_token("kraken"), None);
        assert_eq!(
            "kraken".parse::<Exchange>(),
            Err(ParameterError::InvalidExchange("kraken".to_string()))
        );
    }
}
