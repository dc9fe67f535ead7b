//! Verso command-line tool.
//!
//! Usage:
//!   verso --db site.db init post-1 article
//!   verso --db site.db commit post-1 draft.json --author alice
//!   verso --db site.db history post-1 --limit 5
//!
//! Output is JSON on stdout; logs go to stderr.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use verso_cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let output = verso_cli::run(&cli).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
