//! API Rewrite Proxy
//!
//! Forwards `/api/*` requests to the backend named by `NEXT_PUBLIC_API_URL`
//! (default `http://localhost:3000`), plus any extra rewrites declared in the
//! config file.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │               REWRITE PROXY                  │
//!                        │                                              │
//!     Client Request     │  ┌─────────┐    ┌──────────────┐             │
//!     ───────────────────┼─▶│  http   │───▶│   routing    │             │
//!                        │  │ server  │    │ rewrite table│             │
//!                        │  └─────────┘    └──────┬───────┘             │
//!                        │                        │ /api/x → origin/x   │
//!                        │                        ▼                      │
//!     Client Response    │  ┌─────────┐    ┌──────────────┐             │
//!     ◀──────────────────┼──│response │◀───│   upstream   │◀────────────┼──── Backend
//!                        │  │transform│    │    client    │             │     API
//!                        │  └─────────┘    └──────────────┘             │
//!                        │                                              │
//!                        │  config · lifecycle · observability          │
//!                        └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use api_rewrite_proxy::config::{self, RewriteConfig};
use api_rewrite_proxy::lifecycle::{signals, startup, Shutdown};
use api_rewrite_proxy::observability::logging;
use api_rewrite_proxy::routing::RewriteTable;

#[derive(Parser)]
#[command(name = "api-rewrite-proxy")]
#[command(about = "Reverse proxy that rewrites /api/* to a backend origin", long_about = None)]
struct Cli {
    /// Optional TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,

    /// Print the resolved rewrite rules as JSON and exit.
    #[arg(long)]
    print_rules: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match config::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
        if let Err(errors) = config::validation::validate_config(&config) {
            eprintln!("Invalid configuration: {}", config::ConfigError::Validation(errors));
            return ExitCode::FAILURE;
        }
    }

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "api-rewrite-proxy starting");

    if cli.print_rules {
        return print_rules(&config);
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        api_source = %config.api.source,
        extra_rewrites = config.rewrites.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone());

    match startup::start(config, shutdown.subscribe()).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Proxy failed");
            ExitCode::FAILURE
        }
    }
}

fn print_rules(config: &config::ProxyConfig) -> ExitCode {
    let table = match RewriteTable::from_config(config) {
        Ok(table) => table,
        Err(e) => {
            eprintln!("Invalid rewrite rules: {e}");
            return ExitCode::FAILURE;
        }
    };

    let rules: Vec<RewriteConfig> = table.rules().iter().map(|r| r.to_config()).collect();
    match serde_json::to_string_pretty(&rules) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Failed to serialize rules: {e}");
            ExitCode::FAILURE
        }
    }
}
