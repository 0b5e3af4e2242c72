//! Tournament server with live event streams.
//!
//! Serves the REST API and WebSocket observers over one listener, backed by
//! PostgreSQL or an in-memory store.

use std::sync::Arc;

use anyhow::Error;
use log::{info, warn};
use nexus_tournaments::{
    EventHub, TournamentService,
    db::{Database, MemoryStore, TournamentStore},
};
use nt_server::{
    api,
    config::{CliOverrides, ServerConfig, StoreBackend},
    logging, metrics,
};
use pico_args::Arguments;

const HELP: &str = "\
Run a tournament management server

USAGE:
  nt_server [OPTIONS]

OPTIONS:
  --bind          IP:PORT  Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8080]
  --db-url        URL      Database connection string  [default: env DATABASE_URL or postgres://postgres@localhost/nexus_tournaments]
  --metrics-bind  IP:PORT  Prometheus exporter address [default: env METRICS_BIND, disabled if unset]

FLAGS:
  --memory                 Keep data in memory instead of PostgreSQL
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL             PostgreSQL connection string
  STORE_BACKEND            Set to 'memory' for the in-memory store
  EVENT_BUFFER_SIZE        Events buffered per observer before it is dropped
  RUST_LOG                 Log filter (e.g., info,nexus_tournaments=debug)
  (See .env file for all configuration options)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let cli = CliOverrides {
        bind: pargs.opt_value_from_str("--bind")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
        metrics_bind: pargs.opt_value_from_str("--metrics-bind")?,
        memory: pargs.contains("--memory"),
    };

    let remaining = pargs.finish();
    if !remaining.is_empty() {
        anyhow::bail!("Unexpected arguments: {:?}\n\n{}", remaining, HELP);
    }

    logging::init();

    let config = ServerConfig::from_env(cli)?;
    config.validate()?;
    info!("Starting tournament server at {}", config.bind);

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(|e| anyhow::anyhow!(e))?;
        info!("Prometheus metrics available at http://{}/metrics", addr);
    }

    let (store, database): (Arc<dyn TournamentStore>, Option<Database>) = match &config.store {
        StoreBackend::Postgres(db_config) => {
            info!("Connecting to database");
            let db = Database::connect(db_config)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;
            info!("Database connected successfully");
            (Arc::new(db.tournament_store()), Some(db))
        }
        StoreBackend::Memory => {
            warn!("Using in-memory store; data will be lost on restart");
            (Arc::new(MemoryStore::new()), None)
        }
    };

    let hub = EventHub::new(config.event_buffer_size);
    let sampler = metrics::spawn_hub_sampler(hub.clone());
    let service = TournamentService::new(store, hub);

    let app = api::create_router(api::AppState { service });

    info!("Starting HTTP/WebSocket server on {}", config.bind);
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", config.bind, e))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Shutting down server...");
    sampler.abort();
    if let Some(db) = database {
        db.close().await;
    }

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl+C: {}", e);
        // Without a signal handler, keep serving until the process is killed
        std::future::pending::<()>().await;
    }
}
