// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Caution Node
//!
//! Entry point for the `caution-node` binary. Parses CLI arguments,
//! initializes logging and metrics, opens the ledger database and serves
//! the HTTP API.
//!
//! Subcommands:
//!
//! - `init`: bind a data directory to an escrow identity
//! - `run`: serve the API and metrics
//! - `address`: derive an address from a seed
//! - `version`: print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;

use caution_contracts::{EscrowLedger, PaymentRegistry};
use caution_protocol::identity::derive_address;
use caution_protocol::storage::CautionDB;
use caution_protocol::Bech32AddressValidator;

use cli::{CautionNodeCli, Commands};
use metrics::LedgerMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = CautionNodeCli::parse();

    match cli.command {
        Commands::Init(args) => {
            logging::init_logging(logging::DEFAULT_FILTER, cli.log_format);
            init_ledger(args)
        }
        Commands::Run(args) => {
            logging::init_logging(
                &format!("{},tower_http=debug", logging::DEFAULT_FILTER),
                cli.log_format,
            );
            run_node(args).await
        }
        Commands::Address(args) => {
            let address = derive_address(&args.hrp, args.seed.as_bytes())
                .context("failed to derive address")?;
            println!("{address}");
            Ok(())
        }
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Opens (creating if needed) the sled database under the data directory.
fn open_db(data: &cli::DataDirArg) -> Result<CautionDB> {
    let db_path = data.db_path();
    std::fs::create_dir_all(&db_path)
        .with_context(|| format!("failed to create database directory: {}", db_path.display()))?;

    let db = CautionDB::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;
    tracing::info!(path = %db_path.display(), "database opened");
    Ok(db)
}

/// Binds the ledger in the data directory to an escrow identity.
fn init_ledger(args: cli::InitArgs) -> Result<()> {
    let db = open_db(&args.data)?;
    let ledger = EscrowLedger::init(db, args.escrow, Bech32AddressValidator::default())
        .context("failed to initialize escrow ledger")?;
    ledger
        .store()
        .flush()
        .context("failed to flush database")?;

    println!("Ledger initialized.");
    println!("  Data directory : {}", args.data.data_dir.display());
    println!("  Escrow         : {}", ledger.escrow_address());
    Ok(())
}

/// Serves the API and metrics endpoints until a shutdown signal arrives.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    tracing::info!(
        rpc_port = args.rpc_port,
        metrics_port = args.metrics_port,
        data_dir = %args.data.data_dir.display(),
        "starting caution-node"
    );

    let db = open_db(&args.data)?;
    let ledger = match args.escrow {
        Some(escrow) => EscrowLedger::init(db.clone(), escrow, Bech32AddressValidator::default()),
        None => EscrowLedger::open(db.clone(), Bech32AddressValidator::default()),
    }
    .context("failed to open escrow ledger (run `caution-node init --escrow <addr>` first)")?;
    tracing::info!(escrow = %ledger.escrow_address(), "escrow ledger ready");

    let payments = PaymentRegistry::new(db.clone(), Bech32AddressValidator::default());
    let ledger_metrics = Arc::new(LedgerMetrics::new());

    let app_state = api::AppState {
        version: format!(
            "{} (protocol {})",
            env!("CARGO_PKG_VERSION"),
            caution_protocol::config::PROTOCOL_VERSION,
        ),
        ledger: Arc::new(ledger),
        payments: Arc::new(payments),
        metrics: Arc::clone(&ledger_metrics),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.rpc_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(ledger_metrics);
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received");
        }
    }

    db.flush().context("failed to flush database on shutdown")?;
    tracing::info!("caution-node stopped");
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("caution-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol     {}", caution_protocol::config::PROTOCOL_VERSION);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
