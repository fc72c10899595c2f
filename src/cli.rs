use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::load_config::load_config;
use crate::server::serve;

/// CLI for testsmith: generate tests from repository files and publish them as pull requests.
#[derive(Parser)]
#[clap(
    name = "testsmith",
    version,
    about = "Serve the GitHub OAuth + test generation + pull request API"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP service
    Serve {
        /// Path to an optional YAML config file
        #[clap(long)]
        config: Option<PathBuf>,
        /// Address to bind, overrides config and HOST
        #[clap(long)]
        host: Option<String>,
        /// Port to bind, overrides config and PORT
        #[clap(long)]
        port: Option<u16>,
    },
}

/// Async CLI entrypoint shared by main() and the integration tests.
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Serve { config, host, port } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            serve(config).await.context("HTTP server failed")
        }
    }
}
