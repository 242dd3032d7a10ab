//! PeerLink CLI - one-shot peer-to-peer file sharing gateway
//!
//! Uploading a file to the gateway returns a share code. The file is then
//! offered on the TCP port equal to that code until exactly one peer has
//! fetched it.
//!
//! ## Quick Start
//!
//! ```bash
//! # Start the gateway on port 8080
//! peerlink serve
//!
//! # Share a file
//! curl -F file=@report.pdf http://localhost:8080/upload
//!
//! # Fetch it (once) through the gateway
//! curl -OJ http://localhost:8080/download/51234
//! ```

#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]

use anyhow::Result;
use clap::Parser;

mod commands;

use commands::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve(args) => commands::serve::run(args, cli.config.as_deref()).await,
        Command::Config(args) => commands::config::run(args, cli.config.as_deref()),
    }
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,peerlink=info,peerlink_core=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}
