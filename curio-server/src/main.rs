//! Curio visibility server.
//!
//! Serves the per-user content visibility API over HTTP: restriction
//! rules, hidden entities, exclusion recomputes, and stats. State lives
//! in two SQLite files: the visibility database (rules, hidden
//! entities, exclusion snapshots) and a read-only mirror of the library
//! catalog maintained by the sync layer.
//!
//! Usage:
//!   curio-server --db curio-visibility.db --mirror curio-mirror.db

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use curio_catalog::SqliteCatalog;
use curio_server::{AppState, build_router};
use curio_visibility::{
    ExclusionComputer, ExclusionStore, HiddenEntityManager, RecomputeCoordinator, RuleStore,
    StatsAggregator, VisibilityDb,
};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "curio-server")]
#[command(about = "Curio content visibility API server")]
struct Args {
    /// Path to the visibility database
    #[arg(long, default_value = "curio-visibility.db")]
    db: PathBuf,

    /// Path to the catalog mirror database
    #[arg(long, default_value = "curio-mirror.db")]
    mirror: PathBuf,

    /// Address to bind the HTTP API on
    #[arg(long, default_value = "127.0.0.1:7227")]
    addr: SocketAddr,

    /// Number of concurrent workers for recompute-all sweeps
    #[arg(long, default_value = "4")]
    workers: usize,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    info!("Curio visibility server starting...");

    let catalog = Arc::new(
        SqliteCatalog::open(&args.mirror)
            .with_context(|| format!("failed to open catalog mirror at {:?}", args.mirror))?,
    );
    let db = VisibilityDb::open(&args.db)
        .with_context(|| format!("failed to open visibility db at {:?}", args.db))?;

    let rules = RuleStore::new(db.clone());
    let hidden = HiddenEntityManager::with_catalog(db.clone(), catalog.clone());
    let exclusions = ExclusionStore::new(db.clone());
    let stats = StatsAggregator::new(ExclusionStore::new(db.clone()));

    let computer = Arc::new(ExclusionComputer::new(
        catalog.clone(),
        catalog.clone(),
        RuleStore::new(db.clone()),
        HiddenEntityManager::with_catalog(db.clone(), catalog.clone()),
        ExclusionStore::new(db.clone()),
    ));
    let coordinator =
        RecomputeCoordinator::with_workers(computer, catalog.clone(), args.workers);

    let state = Arc::new(AppState {
        rules,
        hidden,
        exclusions,
        stats,
        coordinator,
    });

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .with_context(|| format!("failed to bind {}", args.addr))?;
    info!("HTTP API listening on {}", args.addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for shutdown signal: {e}");
    }
}
