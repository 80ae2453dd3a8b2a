mod bot;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, EnvFilter};

use signal_desk::commands::CommandRouter;
use signal_desk::config::Config;
use signal_desk::exchange::MarketDirectory;

use crate::bot::SignalBot;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    let markets = MarketDirectory::from_config(&cfg).context("Failed to set up market data")?;
    let router = CommandRouter::new(cfg.shared(), markets);
    let bot = SignalBot::new(router);

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        bot.run().await?;
    } else {
        bot.run_once(&args.join(" ")).await;
    }

    Ok(())
}
