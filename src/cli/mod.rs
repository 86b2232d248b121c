//! Command-line interface.

pub(crate) mod ask;
pub(crate) mod common;
pub(crate) mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "askgate", version, about = "Quota-gated geography Q&A gateway")]
pub(crate) struct Cli {
    /// Config file (overrides ASKGATE_CONFIG and ~/.askgate/config.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Run the HTTP server (default).
    Serve {
        /// Bind address.
        #[arg(long)]
        bind: Option<String>,
        /// Listen port.
        #[arg(long)]
        port: Option<u16>,
    },
    /// Ask one question through a local gateway and print the answer.
    Ask {
        /// User identifier charged for the question.
        #[arg(long, default_value = "cli")]
        user: String,
        /// The question.
        #[arg(long)]
        question: String,
    },
}
