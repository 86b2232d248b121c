//! askgate binary entry point.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;

use askgate::config::Config;
use askgate::logging;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; real environment variables still apply.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).with_context(|| "Failed to load config")?;
    logging::init(config.logging.format)?;

    match cli.command.unwrap_or(Command::Serve {
        bind: None,
        port: None,
    }) {
        Command::Serve { bind, port } => cli::serve::cmd_serve(config, bind, port).await,
        Command::Ask { user, question } => cli::ask::cmd_ask(config, user, question).await,
    }
}
