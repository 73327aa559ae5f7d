//! # kvprobe
//!
//! Test harness driver for a multi-node key-value store.
//!
//! ## Commands
//!
//! - `run`: Warm up, then send each configured command to a random node
//! - `send`: Send one command to one node
//!
//! ## Example
//!
//! ```bash
//! # Reference scenario against localhost:8081..8083
//! kvprobe run
//!
//! # Against the compose network, reproducible node picks
//! kvprobe run --docker --seed 42
//!
//! # One-off request
//! kvprobe send --node localhost:8081 GET session:user1
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kvprobe_types::NodeEndpoint;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::run::RunOptions;
use commands::{run, send};
use config::Config;

/// Test harness driver for a multi-node key-value store.
#[derive(Parser, Debug)]
#[command(name = "kvprobe")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file (default: ./kvprobe.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the command sequence against the node set
    Run {
        /// Use the container node profile (kvstore1..3)
        #[arg(long)]
        docker: bool,

        /// Seed for node selection
        #[arg(long)]
        seed: Option<u64>,

        /// Warm-up delay in milliseconds
        #[arg(long)]
        warmup_ms: Option<u64>,

        /// Delay after each command in milliseconds
        #[arg(long)]
        pacing_ms: Option<u64>,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,

        /// Exit with an error if any assertion fails
        #[arg(long)]
        strict: bool,
    },

    /// Send a single command to one node
    Send {
        /// Target node as HOST:PORT
        #[arg(long)]
        node: NodeEndpoint,

        /// Command words, joined with spaces
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries responses and reports.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Run {
            docker,
            seed,
            warmup_ms,
            pacing_ms,
            json,
            strict,
        } => {
            let options = RunOptions {
                docker,
                seed,
                warmup_ms,
                pacing_ms,
                json,
                strict,
            };
            run::run(config, options).await?;
        }
        Commands::Send { node, command } => {
            send::run(&config, &node, &command).await?;
        }
    }

    Ok(())
}
