use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ParameterError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "3m")]
    M3,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "30m")]
    M30,
    #[default]
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "2h")]
    H2,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "6h")]
    H6,
    #[serde(rename = "12h")]
    H12,
    #[serde(rename = "1d")]
    D1,
    #[serde(rename = "1w")]
    W1,
    #[serde(rename = "1M")]
    Mo1,
}

impl Timeframe {
    pub const ALL: [Timeframe; 13] = [
        Timeframe::M1,
        Timeframe::M3,
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::M30,
        Timeframe::H1,
        Timeframe::H2,
        Timeframe::H4,
        Timeframe::H6,
        Timeframe::H12,
        Timeframe::D1,
        Timeframe::W1,
        Timeframe::Mo1,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M3 => "3m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::M30 => "30m",
            Timeframe::H1 => "1h",
            Timeframe::H2 => "2h",
            Timeframe::H4 => "4h",
            Timeframe::H6 => "6h",
            Timeframe::H12 => "12h",
            Timeframe::D1 => "1d",
            Timeframe::W1 => "1w",
            Timeframe::Mo1 => "1M",
        }
    }

    pub fn as_duration(&self) -> Duration {
        let minutes: u64 = match self {
            Timeframe::M1 => 1,
            Timeframe::M3 => 3,
            Timeframe::M5 => 5,
            Timeframe::M15 => 15,
            Timeframe::M30 => 30,
            Timeframe::H1 => 60,
            Timeframe::H2 => 120,
            Timeframe::H4 => 240,
            Timeframe::H6 => 360,
            Timeframe::H12 => 720,
            Timeframe::D1 => 1440,
            Timeframe::W1 => 10_080,
            Timeframe::Mo1 => 43_200,
        };
        Duration::from_secs(minutes * 60)
    }

    pub fn as_millis(&self) -> i64 {
        self.as_duration().as_millis() as i64
    }

    /// Bybit v5 kline `interval` parameter.
    pub fn bybit_interval(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1",
            Timeframe::M3 => "3",
            Timeframe::M5 => "5",
            Timeframe::M15 => "15",
            Timeframe::M30 => "30",
            Timeframe::H1 => "60",
            Timeframe::H2 => "120",
            Timeframe::H4 => "240",
            Timeframe::H6 => "360",
            Timeframe::H12 => "720",
            Timeframe::D1 => "D",
            Timeframe::W1 => "W",
            Timeframe::Mo1 => "M",
        }
    }

    /// Binance futures kline `interval` parameter.
    pub fn binance_interval(&self) -> &'static str {
        self.as_str()
    }

    /// Bitget v2 `granularity` parameter (uppercase hours and days).
    pub fn bitget_granularity(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M3 => "3m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::M30 => "30m",
            Timeframe::H1 => "1H",
            Timeframe::H2 => "2H",
            Timeframe::H4 => "4H",
            Timeframe::H6 => "6H",
            Timeframe::H12 => "12H",
            Timeframe::D1 => "1D",
            Timeframe::W1 => "1W",
            Timeframe::Mo1 => "1M",
        }
    }

    /// TradingView chart `interval` query value.
    pub fn tradingview_interval(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1",
            Timeframe::M3 => "3",
            Timeframe::M5 => "5",
            Timeframe::M15 => "15",
            Timeframe::M30 => "30",
            Timeframe::H1 => "60",
            Timeframe::H2 => "120",
            Timeframe::H4 => "240",
            Timeframe::H6 => "360",
            Timeframe::H12 => "720",
            Timeframe::D1 => "1D",
            Timeframe::W1 => "1W",
            Timeframe::Mo1 => "1M",
        }
    }

    /// Matches a timeframe token. `1M` is the month; every other spelling
    /// is compared case-insensitively, so `1H` and `15M` are hours and minutes.
    pub fn from_str_loose(s: &str) -> Option<Timeframe> {
        if s == "1M" {
            return Some(Timeframe::Mo1);
        }
        let lower = s.to_ascii_lowercase();
        Timeframe::ALL
            .iter()
            .copied()
            .filter(|tf| *tf != Timeframe::Mo1)
            .find(|tf| tf.as_str() == lower)
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = ParameterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_loose(s.trim()).ok_or_else(|| ParameterError::InvalidTimeframe(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loose_parsing_is_case_insensitive_except_month() {
        assert_eq!(Timeframe::from_str_loose("1h"), Some(Timeframe::H1));
        assert_eq!(Timeframe::from_str_loose("1H"), Some(Timeframe::H1));
        assert_eq!(Timeframe::from_str_loose("15M"), Some(Timeframe::M15));
        assert_eq!(Timeframe::from_str_loose("1m"), Some(Timeframe::M1));
        assert_eq!(Timeframe::from_str_loose("1M"), Some(Timeframe::Mo1));
        assert_eq!(Timeframe::from_str_loose("1W"), Some(Timeframe::W1));
    }

    #[test]
    fn unsupported_timeframe_rejected() {
        assert_eq!(Timeframe::from_str_loose("7m"), None);
        assert_eq!(Timeframe::from_str_loose("2d"), None);
        assert!("3h".parse::<Timeframe>().is_err());
    }

    #[test]
    fn exchange_interval_codes() {
        assert_eq!(Timeframe::H4.bybit_interval(), "240");
        assert_eq!(Timeframe::D1.bybit_interval(), "D");
        assert_eq!(Timeframe::H4.binance_interval(), "4h");
        assert_eq!(Timeframe::H4.bitget_granularity(), "4H");
        assert_eq!(Timeframe::H1.tradingview_interval(), "60");
    }

    #[test]
    fn durations() {
        assert_eq!(Timeframe::M15.as_duration().as_secs(), 900);
        assert_eq!(Timeframe::D1.as_millis(), 86_400_000);
    }

    #[test]
    fn serde_uses_short_codes() {
        let json = serde_json::to_string(&Timeframe::Mo1).unwrap();
        assert_eq!(json, "\"1M\"");
        let tf: Timeframe = serde_json::from_str("\"4h\"").unwrap();
        assert_eq!(tf, Timeframe::H4);
    }
}
