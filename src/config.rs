use crate::models::Exchange;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::models::MAX_SCAN_SYMBOLS;

pub type SharedConfig = Arc<Config>;

pub const MIN_CANDLE_LIMIT: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Market data
    pub default_exchange: Exchange,
    pub candle_limit: usize,
    pub scan_concurrency: usize,
    pub symbol_cache_ttl_secs: u64,
    pub http_timeout_secs: u64,
    pub bybit_base_url: String,
    pub binance_base_url: String,
    pub bitget_base_url: String,

    // Replies
    pub title_prefix: String,
    pub footer_name: String,
    pub command_prefix: String,

    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup. Missing or unparseable values
    /// fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str, default: &str| -> String {
            lookup(key).unwrap_or_else(|| default.to_string())
        };

        Config {
            default_exchange: Exchange::from_token(&env("DEFAULT_EXCHANGE", "bybit"))
                .unwrap_or_default(),
            candle_limit: env("CANDLE_LIMIT", "500")
                .parse::<usize>()
                .unwrap_or(500)
                .max(MIN_CANDLE_LIMIT),
            scan_concurrency: env("SCAN_CONCURRENCY", "5")
                .parse::<usize>()
                .unwrap_or(MAX_SCAN_SYMBOLS)
                .clamp(1, MAX_SCAN_SYMBOLS),
            symbol_cache_ttl_secs: env("SYMBOL_CACHE_TTL", "3600").parse().unwrap_or(3600),
            http_timeout_secs: env("HTTP_TIMEOUT", "30").parse().unwrap_or(30),
            bybit_base_url: env("BYBIT_BASE_URL", "https://api.bybit.com"),
            binance_base_url: env("BINANCE_BASE_URL", "https://fapi.binance.com"),
            bitget_base_url: env("BITGET_BASE_URL", "https://api.bitget.com"),
            title_prefix: env("BOT_TITLE_PREFIX", "CRYPTO SIGNAL —"),
            footer_name: env("BOT_FOOTER_NAME", "Crypto Bot"),
            command_prefix: env("COMMAND_PREFIX", "!"),
            log_level: env("LOG_LEVEL", "info"),
        }
    }

    pub fn symbol_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.symbol_cache_ttl_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn base_url(&self, exchange: Exchange) -> &str {
        match exchange {
            Exchange::Bybit => &self.bybit_base_url,
            Exchange::Binance => &self.binance_base_url,
            Exchange::Bitget => &self.bitget_base_url,
        }
    }

    pub fn shared(self) -> SharedConfig {
        Arc::new(self)
    }
}
