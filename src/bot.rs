use anyhow::{Context, Result};
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use signal_desk::commands::CommandRouter;

/// Terminal front end: one command per line, replies printed as text.
pub struct SignalBot {
    router: CommandRouter,
}

impl SignalBot {
    pub fn new(router: CommandRouter) -> Self {
        info!("{}", "=".repeat(60));
        info!("Signal desk starting up");
        info!("{}", "=".repeat(60));
        Self { router }
    }

    pub async fn run_once(&self, line: &str) {
        if let Some(reply) = self.router.handle(line, Utc::now()).await {
            println!("{}", reply.to_text());
        }
    }

    pub async fn run(&self) -> Result<()> {
        info!("Reading commands from stdin. Press Ctrl+C to stop.");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutting down");
                    return Ok(());
                }
                line = lines.next_line() => {
                    match line.context("Failed to read stdin")? {
                        Some(line) => self.run_once(&line).await,
                        None => {
                            info!("Input closed");
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}
