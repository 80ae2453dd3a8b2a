//! Order-independent command argument resolution.
//!
//! Every token is classified on its own shape into a [`Token`]; a single
//! reduction pass then checks conflicts, applies defaults and validates in a
//! fixed order: symbol presence, timeframe, direction, EMA pair, exchange,
//! scan size.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::ParameterError;
use crate::models::{
    CoinListRequest, CommandMode, EmaPair, Exchange, RequestedDirection, ResolvedCommand,
    ScanRequest, SignalRequest, Timeframe, MAX_EMA_PERIOD, MAX_SCAN_SYMBOLS, MIN_EMA_PERIOD,
};

static TIMEFRAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[0-9]+[mhdw]$").expect("static timeframe pattern"));
static EMA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^ema(\d{1,3})$").expect("static ema pattern"));

const USDT: &str = "USDT";
const MIN_SYMBOL_LEN: usize = 2;
const MAX_SYMBOL_LEN: usize = 10;

/// Canonical futures ticker: upper case with exactly one `USDT` suffix.
/// `btc` and `BTCUSDT` both give `BTCUSDT`.
pub fn normalize_symbol(raw: &str) -> String {
    let upper = raw.trim().to_ascii_uppercase();
    let base = strip_quote(&upper);
    format!("{base}{USDT}")
}

fn strip_quote(upper: &str) -> &str {
    match upper.strip_suffix(USDT) {
        Some(base) if !base.is_empty() => base,
        _ => upper,
    }
}

/// Letters with optional digits, 2 to 10 characters not counting a `USDT` suffix.
pub fn is_symbol_shaped(token: &str) -> bool {
    let upper = token.to_ascii_uppercase();
    let base = strip_quote(&upper);
    (MIN_SYMBOL_LEN..=MAX_SYMBOL_LEN).contains(&base.len())
        && base.chars().all(|c| c.is_ascii_alphanumeric())
        && base.chars().any(|c| c.is_ascii_alphabetic())
}

/// A raw token tagged with the category its shape matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Timeframe(String),
    Direction(RequestedDirection, String),
    Ema(u32, String),
    Exchange(Exchange, String),
    Detail,
    Symbol(String),
    Unrecognized(String),
}

impl Token {
    pub fn classify(raw: &str) -> Token {
        if TIMEFRAME_RE.is_match(raw) {
            return Token::Timeframe(raw.to_string());
        }
        if let Some(direction) = RequestedDirection::from_token(raw) {
            return Token::Direction(direction, raw.to_string());
        }
        if let Some(caps) = EMA_RE.captures(raw) {
            // at most three digits, always fits
            let period = caps[1].parse::<u32>().unwrap_or(u32::MAX);
            return Token::Ema(period, raw.to_string());
        }
        if let Some(exchange) = Exchange::from_token(raw) {
            return Token::Exchange(exchange, raw.to_string());
        }
        if raw.eq_ignore_ascii_case("detail") {
            return Token::Detail;
        }
        if is_symbol_shaped(raw) {
            return Token::Symbol(raw.to_string());
        }
        Token::Unrecognized(raw.to_string())
    }
}

/// Splits raw arguments on whitespace and commas alike.
pub fn tokenize<S: AsRef<str>>(args: &[S]) -> Vec<String> {
    args.iter()
        .flat_map(|a| {
            a.as_ref()
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}

#[derive(Debug, Default)]
struct Collected {
    symbols: Vec<String>,
    timeframes: Vec<String>,
    directions: Vec<(RequestedDirection, String)>,
    emas: Vec<(u32, String)>,
    exchanges: Vec<(Exchange, String)>,
    detail: bool,
    unrecognized: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ParameterResolver {
    default_exchange: Exchange,
}

impl Default for ParameterResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterResolver {
    pub fn new() -> Self {
        Self::with_default_exchange(Exchange::default())
    }

    pub fn with_default_exchange(default_exchange: Exchange) -> Self {
        Self { default_exchange }
    }

    pub fn resolve<S: AsRef<str>>(
        &self,
        args: &[S],
        mode: CommandMode,
    ) -> Result<ResolvedCommand, ParameterError> {
        let collected = Self::classify_all(args, mode)?;
        match mode {
            CommandMode::Signal => self.reduce_signal(collected).map(ResolvedCommand::Signal),
            CommandMode::Scan => self.reduce_scan(collected).map(ResolvedCommand::Scan),
            CommandMode::CoinList => self.reduce_coinlist(collected).map(ResolvedCommand::CoinList),
        }
    }

    pub fn resolve_signal<S: AsRef<str>>(&self, args: &[S]) -> Result<SignalRequest, ParameterError> {
        self.reduce_signal(Self::classify_all(args, CommandMode::Signal)?)
    }

    pub fn resolve_scan<S: AsRef<str>>(&self, args: &[S]) -> Result<ScanRequest, ParameterError> {
        self.reduce_scan(Self::classify_all(args, CommandMode::Scan)?)
    }

    fn classify_all<S: AsRef<str>>(args: &[S], mode: CommandMode) -> Result<Collected, ParameterError> {
        let tokens: Vec<Token> = tokenize(args).iter().map(|t| Token::classify(t)).collect();
        let collected = Self::collect(tokens, mode);
        match collected.unrecognized.first() {
            Some(token) => Err(ParameterError::UnrecognizedToken(token.clone())),
            None => Ok(collected),
        }
    }

    /// Routes each classified token to its field. Symbols are only taken
    /// from the first contiguous run of symbol-shaped tokens, and signal mode
    /// keeps only the first one; any other symbol-shaped token is left
    /// unrecognized. Categories a mode does not accept are unrecognized too.
    fn collect(tokens: Vec<Token>, mode: CommandMode) -> Collected {
        let mut c = Collected::default();
        let mut run_open = true;
        let mut in_run = false;

        for token in tokens {
            let is_symbol = matches!(token, Token::Symbol(_));
            if in_run && !is_symbol {
                run_open = false;
            }
            in_run = is_symbol && run_open;

            match (token, mode) {
                (Token::Symbol(raw), CommandMode::Scan) if run_open => c.symbols.push(raw),
                (Token::Symbol(raw), CommandMode::Signal | CommandMode::CoinList)
                    if c.symbols.is_empty() =>
                {
                    c.symbols.push(raw);
                    run_open = false;
                    in_run = false;
                }
                (Token::Symbol(raw), _) => c.unrecognized.push(raw),

                (Token::Exchange(ex, raw), _) => c.exchanges.push((ex, raw)),

                (Token::Timeframe(raw), CommandMode::Signal | CommandMode::Scan) => {
                    c.timeframes.push(raw)
                }
                (Token::Ema(p, raw), CommandMode::Signal | CommandMode::Scan) => c.emas.push((p, raw)),
                (Token::Detail, CommandMode::Signal | CommandMode::Scan) => c.detail = true,
                (Token::Direction(d, raw), CommandMode::Signal) => c.directions.push((d, raw)),

                (Token::Timeframe(raw), _)
                | (Token::Ema(_, raw), _)
                | (Token::Direction(_, raw), _)
                | (Token::Unrecognized(raw), _) => c.unrecognized.push(raw),
                (Token::Detail, _) => c.unrecognized.push("detail".to_string()),
            }
        }
        c
    }

    fn reduce_signal(&self, c: Collected) -> Result<SignalRequest, ParameterError> {
        let symbol = c.symbols.first().ok_or(ParameterError::NoSymbol)?;
        let timeframe = Self::resolve_timeframe(&c.timeframes)?;
        let direction = Self::resolve_direction(&c.directions)?;
        let ema = Self::resolve_ema(&c.emas)?;
        let exchange = self.resolve_exchange(&c.exchanges)?;

        Ok(SignalRequest {
            symbol: normalize_symbol(symbol),
            timeframe,
            direction,
            ema,
            exchange,
            detail: c.detail,
        })
    }

    fn reduce_scan(&self, c: Collected) -> Result<ScanRequest, ParameterError> {
        if c.symbols.is_empty() {
            return Err(ParameterError::NoSymbol);
        }
        let timeframe = Self::resolve_timeframe(&c.timeframes)?;
        let ema = Self::resolve_ema(&c.emas)?;
        let exchange = self.resolve_exchange(&c.exchanges)?;

        let mut symbols: Vec<String> = Vec::with_capacity(c.symbols.len());
        for raw in &c.symbols {
            let symbol = normalize_symbol(raw);
            if !symbols.contains(&symbol) {
                symbols.push(symbol);
            }
        }
        if symbols.len() > MAX_SCAN_SYMBOLS {
            return Err(ParameterError::TooManySymbols {
                count: symbols.len(),
                max: MAX_SCAN_SYMBOLS,
            });
        }

        Ok(ScanRequest {
            symbols,
            timeframe,
            ema,
            exchange,
            detail: c.detail,
        })
    }

    fn reduce_coinlist(&self, c: Collected) -> Result<CoinListRequest, ParameterError> {
        let exchange = self.resolve_exchange(&c.exchanges)?;
        let filter = c
            .symbols
            .first()
            .map(|raw| strip_quote(&raw.to_ascii_uppercase()).to_string());
        Ok(CoinListRequest { exchange, filter })
    }

    fn resolve_timeframe(raw: &[String]) -> Result<Timeframe, ParameterError> {
        let mut chosen: Option<(Timeframe, &String)> = None;
        for token in raw {
            let tf = Timeframe::from_str_loose(token)
                .ok_or_else(|| ParameterError::InvalidTimeframe(token.clone()))?;
            match chosen {
                Some((first, first_raw)) if first != tf => {
                    return Err(ParameterError::ConflictingParameter {
                        field: "timeframe",
                        first: first_raw.clone(),
                        second: token.clone(),
                    })
                }
                Some(_) => {}
                None => chosen = Some((tf, token)),
            }
        }
        Ok(chosen.map(|(tf, _)| tf).unwrap_or_default())
    }

    fn resolve_direction(
        raw: &[(RequestedDirection, String)],
    ) -> Result<RequestedDirection, ParameterError> {
        Self::single_value("direction", raw).map(Option::unwrap_or_default)
    }

    fn resolve_exchange(&self, raw: &[(Exchange, String)]) -> Result<Exchange, ParameterError> {
        Self::single_value("exchange", raw).map(|ex| ex.unwrap_or(self.default_exchange))
    }

    fn single_value<T: Copy + PartialEq>(
        field: &'static str,
        raw: &[(T, String)],
    ) -> Result<Option<T>, ParameterError> {
        let Some((first, first_raw)) = raw.first() else {
            return Ok(None);
        };
        if let Some((_, other_raw)) = raw.iter().find(|(v, _)| v != first) {
            return Err(ParameterError::ConflictingParameter {
                field,
                first: first_raw.clone(),
                second: other_raw.clone(),
            });
        }
        Ok(Some(*first))
    }

    /// First EMA token is the tentative short period, the second the long
    /// one. A lone token replaces the short period against the default long.
    /// The pair is swapped if needed so that short < long, then range-checked.
    fn resolve_ema(raw: &[(u32, String)]) -> Result<EmaPair, ParameterError> {
        let (short, long) = match raw {
            [] => return Ok(EmaPair::DEFAULT),
            [(p, _)] => (*p, EmaPair::DEFAULT.long),
            [(a, _), (b, _)] => (*a, *b),
            [_, (_, second), (_, third), ..] => {
                return Err(ParameterError::ConflictingParameter {
                    field: "EMA",
                    first: second.clone(),
                    second: third.clone(),
                })
            }
        };

        if short == long {
            return Err(ParameterError::EmaOrdering { short, long });
        }
        let (short, long) = if short > long { (long, short) } else { (short, long) };

        for period in [short, long] {
            if !(MIN_EMA_PERIOD..=MAX_EMA_PERIOD).contains(&period) {
                return Err(ParameterError::EmaOutOfRange { period });
            }
        }
        Ok(EmaPair::new(short, long))
    }
}
