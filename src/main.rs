//! Multi-process reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌─────────────── master ────────────────┐
//!   Client Request      │  ┌────────┐   ┌─────────────┐         │
//!   ────────────────────┼─▶│  http  │──▶│ round robin │         │
//!                       │  │ server │   └──────┬──────┘         │
//!   Client Response     │  │        │          ▼                │
//!   ◀───────────────────┼──│        │◀── worker handle i        │
//!                       │  └────────┘   (lock, write, read)     │
//!                       └──────────────────┬───────▲────────────┘
//!                              stdin (JSON) │       │ stdout (JSON)
//!                       ┌──────────────────▼───────┴────────────┐
//!                       │ worker i: reader → task per request   │
//!                       │   cache → route → upstream → cache    │
//!                       │   → single writer                     │
//!                       └───────────────────────────────────────┘
//! ```
//!
//! The same binary runs in both roles; `IS_WORKER=true` selects the worker.

use std::path::PathBuf;

use clap::Parser;
use tracing::Instrument;

use pooled_proxy::config::{self, ProxyConfig};
use pooled_proxy::lifecycle::{run_master, signals};
use pooled_proxy::observability::logging::init_logging;
use pooled_proxy::worker;

#[derive(Parser)]
#[command(name = "pooled-proxy")]
#[command(version, about = "Reverse proxy with a master/worker process pool", long_about = None)]
struct Cli {
    /// Path to the YAML or TOML configuration file.
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Number of worker processes (overrides `server.worker`).
    #[arg(short, long)]
    workers: Option<usize>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if worker::is_worker_process() {
        return run_worker_process().await;
    }

    let cli = Cli::parse();

    let config = match config::load_config(&cli.config) {
        Ok(config) => config,
        Err(config::ConfigError::Validation(errors)) => {
            eprintln!("invalid configuration in {}:", cli.config.display());
            for error in errors {
                eprintln!("  - {error}");
            }
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("failed to load {}: {e}", cli.config.display());
            std::process::exit(1);
        }
    };

    init_logging(&config.observability);

    let workers = cli
        .workers
        .filter(|n| *n > 0)
        .unwrap_or_else(|| config.server.effective_worker_count());

    if cli.check {
        print_summary(&config, workers);
        return Ok(());
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        listen = %config.server.bind_address(),
        workers,
        rules = config.server.rules.len(),
        upstreams = config.server.upstreams.len(),
        "Master starting"
    );

    run_master(config, workers).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn run_worker_process() -> Result<(), Box<dyn std::error::Error>> {
    let worker_id = worker::worker_id();
    let config = config::load_worker_config()?;
    init_logging(&config.observability);

    // Terminal signals reach the whole process group. Workers outlive them
    // and stop when the master closes their stdin.
    tokio::spawn(async {
        signals::wait_for_signal().await;
        tracing::info!("Signal received, waiting for the master to close stdin");
    });

    let span = tracing::info_span!("worker", worker_id = %worker_id);
    worker::run_worker(worker_id, config).instrument(span).await?;
    Ok(())
}

fn print_summary(config: &ProxyConfig, workers: usize) {
    println!("configuration OK");
    println!("  listen:    {}", config.server.bind_address());
    println!("  workers:   {workers}");
    for upstream in &config.server.upstreams {
        println!("  upstream:  {} -> {}", upstream.id, upstream.url);
    }
    for rule in &config.server.rules {
        println!("  rule:      {} -> [{}]", rule.path, rule.upstreams.join(", "));
    }
}
