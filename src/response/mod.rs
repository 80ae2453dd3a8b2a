pub mod format;

pub use format::{format_price, format_ratio, format_time, tradingview_url};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::Config;
use crate::error::CommandError;
use crate::models::{CandleSeries, Exchange, PlanDirection, ScanResult, TradePlan};

pub const COLOR_LONG: u32 = 0x00FF88;
pub const COLOR_SHORT: u32 = 0xFF5555;
pub const COLOR_NEUTRAL: u32 = 0xFFD700;
pub const COLOR_ERROR: u32 = 0xFF0000;
/// Symbols listed in one coin-list reply.
pub const MAX_LISTED_SYMBOLS: usize = 100;

/// Data handed to the chart renderer: the plan exactly as synthesized plus
/// the candle window it was computed from.
#[derive(Debug, Clone, Serialize)]
pub struct ChartPayload<'a> {
    pub plan: &'a TradePlan,
    pub candles: &'a CandleSeries,
}

pub fn chart_payload<'a>(plan: &'a TradePlan, candles: &'a CandleSeries) -> ChartPayload<'a> {
    ChartPayload { plan, candles }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplyField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Renderer-neutral reply: an embed-shaped message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply {
    pub title: String,
    pub description: String,
    pub color: u32,
    pub footer: String,
    pub fields: Vec<ReplyField>,
}

impl Reply {
    fn field(&mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) {
        self.fields.push(ReplyField {
            name: name.into(),
            value: value.into(),
            inline,
        });
    }

    pub fn field_value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }

    /// Plain-text rendering for terminals and logs.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.title);
        out.push('\n');
        if !self.description.is_empty() {
            out.push_str(&self.description);
            out.push('\n');
        }
        for f in &self.fields {
            if f.value.contains('\n') {
                out.push_str(&format!("{}:\n{}\n", f.name, f.value));
            } else {
                out.push_str(&format!("{}: {}\n", f.name, f.value));
            }
        }
        if !self.footer.is_empty() {
            out.push_str(&self.footer);
            out.push('\n');
        }
        out
    }
}

pub fn direction_color(direction: PlanDirection) -> u32 {
    match direction {
        PlanDirection::Long => COLOR_LONG,
        PlanDirection::Short => COLOR_SHORT,
        PlanDirection::Neutral => COLOR_NEUTRAL,
    }
}

/// Maps finished plans, scans and errors onto replies. Pure: the
/// generation time is passed in.
#[derive(Debug, Clone)]
pub struct ResponseAssembler {
    title_prefix: String,
    footer_name: String,
    command_prefix: String,
}

impl Default for ResponseAssembler {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ResponseAssembler {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            title_prefix: cfg.title_prefix.clone(),
            footer_name: cfg.footer_name.clone(),
            command_prefix: cfg.command_prefix.clone(),
        }
    }

    fn footer(&self, last_price: Option<f64>, generated: DateTime<Utc>) -> String {
        match last_price {
            Some(p) => format!(
                "{} • Last Price: {} | Generated: {}",
                self.footer_name,
                format_price(p),
                format_time(generated)
            ),
            None => format!("{} • Generated: {}", self.footer_name, format_time(generated)),
        }
    }

    pub fn signal(&self, plan: &TradePlan, detail: bool, generated: DateTime<Utc>) -> Reply {
        let chart = tradingview_url(plan.exchange, &plan.symbol, plan.timeframe);
        let header = format!(
            "PAIR: {}\nTIMEFRAME: {}\nEXCHANGE: {}\nTime: {}",
            plan.symbol,
            plan.timeframe,
            plan.exchange.display_name(),
            format_time(generated)
        );

        let mut reply = Reply {
            title: String::new(),
            description: String::new(),
            color: direction_color(plan.direction),
            footer: self.footer(Some(plan.current_price), generated),
            fields: Vec::new(),
        };

        match &plan.levels {
            Some(levels) => {
                reply.title = format!("{} {} {}", self.title_prefix, plan.direction, plan.symbol);
                reply.description = header;
                reply.field("Entry", format_price(levels.entry), true);
                reply.field("Stop Loss", format_price(levels.stop_loss), true);
                reply.field("TP1", format_price(levels.tp1), true);
                reply.field(
                    "TP2",
                    format!("{} ({})", format_price(levels.tp2), format_ratio(levels.risk_reward)),
                    true,
                );
            }
            None => {
                reply.title = format!("{} — {} NEUTRAL", plan.symbol, plan.timeframe);
                reply.description = format!(
                    "No clear setup: trend, momentum and structure do not agree.\n{header}"
                );
            }
        }

        reply.field(
            "Confidence",
            format!("{:.1} ({})", plan.confidence, plan.confidence_label()),
            true,
        );
        reply.field("EMA", plan.indicators.ema.to_string(), true);
        if detail {
            reply.field("Reasoning", bullet_list(&plan.reasoning), false);
        }
        reply.field("Chart", chart, false);
        reply
    }

    pub fn scan(&self, result: &ScanResult, detail: bool, generated: DateTime<Utc>) -> Reply {
        let color = result
            .entries
            .first()
            .map(|e| direction_color(e.plan.direction))
            .unwrap_or(COLOR_NEUTRAL);

        let description = if result.entries.is_empty() {
            "No symbol could be analysed.".to_string()
        } else {
            result
                .entries
                .iter()
                .enumerate()
                .map(|(rank, e)| {
                    let levels = match &e.plan.levels {
                        Some(l) => format!(
                            " | entry {} sl {} tp2 {} ({})",
                            format_price(l.entry),
                            format_price(l.stop_loss),
                            format_price(l.tp2),
                            format_ratio(l.risk_reward)
                        ),
                        None => String::new(),
                    };
                    format!(
                        "{}. {} {} {:.1} ({}) {}{}",
                        rank + 1,
                        e.symbol,
                        e.plan.direction,
                        e.plan.confidence,
                        e.plan.confidence_label(),
                        e.ema,
                        levels
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        };

        let mut reply = Reply {
            title: format!(
                "{} SCAN {} {}",
                self.title_prefix,
                result.timeframe,
                result.exchange.display_name()
            ),
            description,
            color,
            footer: self.footer(None, generated),
            fields: Vec::new(),
        };

        if detail {
            for e in &result.entries {
                reply.field(
                    format!("{} {}", e.symbol, e.ema),
                    bullet_list(&e.plan.reasoning),
                    false,
                );
            }
        }
        if !result.excluded.is_empty() {
            let skipped = result
                .excluded
                .iter()
                .map(|x| format!("{}: {}", x.symbol, x.reason))
                .collect::<Vec<_>>()
                .join("\n");
            reply.field("Skipped", skipped, false);
        }
        reply
    }

    pub fn coin_list(
        &self,
        exchange: Exchange,
        filter: Option<&str>,
        symbols: &[String],
        generated: DateTime<Utc>,
    ) -> Reply {
        let shown: Vec<&str> = symbols
            .iter()
            .take(MAX_LISTED_SYMBOLS)
            .map(String::as_str)
            .collect();
        let mut description = match filter {
            Some(f) => format!("{} pairs starting with {}", symbols.len(), f),
            None => format!("{} pairs", symbols.len()),
        };
        if !shown.is_empty() {
            description.push('\n');
            description.push_str(&shown.join(", "));
        }
        if symbols.len() > shown.len() {
            description.push_str(&format!("\n… and {} more", symbols.len() - shown.len()));
        }

        Reply {
            title: format!("{} USDT futures", exchange.display_name()),
            description,
            color: COLOR_NEUTRAL,
            footer: self.footer(None, generated),
            fields: Vec::new(),
        }
    }

    pub fn help(&self, generated: DateTime<Utc>) -> Reply {
        let p = &self.command_prefix;
        Reply {
            title: "Commands".to_string(),
            description: [
                format!("{p}signal <coin> [timeframe] [long|short] [emaN emaM] [exchange] [detail]"),
                format!("{p}scan <coin,coin,...> [timeframe] [emaN emaM] [exchange] [detail]"),
                format!("{p}coinlist [exchange] [prefix]"),
                format!("{p}help"),
                "timeframes: 1m 3m 5m 15m 30m 1h 2h 4h 6h 12h 1d 1w 1M".to_string(),
                "exchanges: bybit binance bitget".to_string(),
            ]
            .join("\n"),
            color: COLOR_NEUTRAL,
            footer: self.footer(None, generated),
            fields: Vec::new(),
        }
    }

    pub fn error(&self, err: &CommandError, generated: DateTime<Utc>) -> Reply {
        let title = match err {
            CommandError::Parameter(_) | CommandError::UnknownCommand(_) => "Invalid command",
            CommandError::Analysis(_) => "Analysis failed",
            CommandError::Internal(_) => "Error",
        };
        Reply {
            title: title.to_string(),
            description: err.to_string(),
            color: COLOR_ERROR,
            footer: self.footer(None, generated),
            fields: Vec::new(),
        }
    }
}

fn bullet_list(lines: &[String]) -> String {
    lines
        .iter()
        .map(|l| format!("• {l}"))
        .collect::<Vec<_>>()
        .join("\n")
}
