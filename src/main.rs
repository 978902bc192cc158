//! # Ticket Search Gateway CLI (`tsg`)
//!
//! Runs the gateway server and offers a terminal client for it.
//!
//! ## Usage
//!
//! ```bash
//! tsg --config ./config/tsg.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `tsg serve` | Start the gateway HTTP server |
//! | `tsg query "<text>"` | Print the engine query the gateway would send |
//! | `tsg search "<text>"` | Search through a running gateway |
//! | `tsg ready` | Ask a running gateway whether the system is ready |
//! | `tsg watch` | Wait for readiness, then show the initial ticket list |
//! | `tsg update-status <email> <status>` | Change a customer's ticket status |

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

use ticket_search_gateway::client::{GatewayClient, PollOutcome, ReadinessPoller};
use ticket_search_gateway::config::{self, Config};
use ticket_search_gateway::models::{SearchRequest, SortOrder};
use ticket_search_gateway::query::build_query;
use ticket_search_gateway::server;
use ticket_search_gateway::view::{self, ViewState};

/// Ticket Search Gateway: a thin HTTP search front for support tickets.
#[derive(Parser)]
#[command(name = "tsg", version, about)]
struct Cli {
    /// Path to configuration file (TOML). Optional; defaults apply when the
    /// file does not exist. `ES_HOST`, `ES_PORT`, `INDEXER_URL` and
    /// `TSG_BIND` override file values.
    #[arg(long, global = true, default_value = "./config/tsg.toml")]
    config: PathBuf,

    /// Gateway URL for client commands (overrides `[client].gateway_url`).
    #[arg(long, global = true)]
    gateway: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway HTTP server.
    Serve,

    /// Print the engine-native query built for the given text. No I/O.
    Query {
        /// Search text. Blank means match-all.
        #[arg(default_value = "")]
        text: String,

        /// Exclude resolved tickets.
        #[arg(long)]
        unresolved: bool,

        /// `priority-high-to-low` or `priority-low-to-high`.
        #[arg(long, default_value = "priority-high-to-low")]
        sort: SortOrder,
    },

    /// Search tickets through a running gateway.
    Search {
        /// Search text. Blank means match-all.
        #[arg(default_value = "")]
        text: String,

        #[arg(long)]
        unresolved: bool,

        #[arg(long, default_value = "priority-high-to-low")]
        sort: SortOrder,
    },

    /// Ask a running gateway whether the system is ready.
    Ready,

    /// Poll readiness, show every ticket, then apply any search text or
    /// filter given here.
    Watch {
        #[arg(default_value = "")]
        text: String,

        #[arg(long)]
        unresolved: bool,

        #[arg(long, default_value = "priority-high-to-low")]
        sort: SortOrder,
    },

    /// Set the status of a customer's tickets.
    UpdateStatus {
        /// Customer email identifying the tickets.
        email: String,
        /// New status, e.g. `resolved` or `rejected`.
        status: String,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ticket_search_gateway=info,tower_http=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let mut cfg = config::load_config(&cli.config)?;
    if let Some(url) = cli.gateway {
        cfg.client.gateway_url = url;
    }

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Query {
            text,
            unresolved,
            sort,
        } => {
            let view = ViewState::new(text, unresolved, sort);
            let req = view.search_request();
            let query = build_query(&req.query, req.filter_unresolved, req.sort_order)
                .with_size(cfg.engine.page_size);
            println!("{}", serde_json::to_string_pretty(&query)?);
        }
        Commands::Search {
            text,
            unresolved,
            sort,
        } => {
            let client = GatewayClient::new(&cfg.client)?;
            let mut view = ViewState::new(text, unresolved, sort);
            let request = view.search_request();
            run_search(&client, &mut view, &request).await;
            print!("{}", view::render(&view));
        }
        Commands::Ready => {
            let client = GatewayClient::new(&cfg.client)?;
            let ready = client.ready().await.unwrap_or(false);
            println!("ready: {}", ready);
        }
        Commands::Watch {
            text,
            unresolved,
            sort,
        } => {
            run_watch(&cfg, ViewState::new(text, unresolved, sort)).await?;
        }
        Commands::UpdateStatus { email, status } => {
            let client = GatewayClient::new(&cfg.client)?;
            let body = client.update_status(&email, &status).await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
    }

    Ok(())
}

async fn run_search(client: &GatewayClient, view: &mut ViewState, request: &SearchRequest) {
    match client.search(request).await {
        Ok(resp) => view.apply_response(resp),
        Err(e) => {
            tracing::debug!(error = %e, "search request failed");
            view.apply_failure("Failed to search. Please try again.");
        }
    }
}

/// Wait for readiness (Ctrl-C cancels), then load every ticket. Text or
/// `--unresolved` given on the command line is searched after that first
/// load, as a follow-up submit.
async fn run_watch(cfg: &Config, mut view: ViewState) -> Result<()> {
    let client = Arc::new(GatewayClient::new(&cfg.client)?);
    let poller = ReadinessPoller::new(cfg.client.poll_interval());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    println!("System Status: Initializing... ({})", client.base_url());
    let outcome = poller.run(client.clone(), shutdown_rx).await;
    tracing::info!(
        probes = poller.probes(),
        skipped = poller.skipped(),
        ?outcome,
        "readiness polling finished"
    );

    match outcome {
        PollOutcome::Ready => {
            println!("System Status: Ready");
            println!();
            let initial = view.initial_request();
            run_search(&client, &mut view, &initial).await;
            print!("{}", view::render(&view));

            if view.has_refinement() {
                let refined = view.search_request();
                run_search(&client, &mut view, &refined).await;
                println!();
                print!("{}", view::render(&view));
            }
        }
        PollOutcome::Cancelled => {
            println!("Cancelled before the system became ready.");
        }
    }

    Ok(())
}
