//! Esports arena tournament server.
//!
//! Serves the player and admin HTTP API over either the PostgreSQL store
//! or the in-memory backend, and runs the scheduled credential release
//! sweeper alongside it.

use std::sync::Arc;

use anyhow::{Context, Error};
use arena_core::{
    auth::AuthManager,
    db::{Database, PgProfileRepository, WalletRepository},
    memory::MemoryBackend,
    tournament::{PgTournamentStore, TournamentManager},
    wallet::WalletManager,
};
use arena_server::{
    api,
    config::{CliOverrides, ServerConfig, StorageBackend},
    logging, metrics, sweeper,
};
use log::info;
use pico_args::Arguments;
use tokio::sync::watch;

const HELP: &str = "\
Run the esports arena tournament server

USAGE:
  arena_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8080]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]

FLAGS:
  --memory                 Keep all state in memory (no database)
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND                  Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL                 PostgreSQL connection string
  JWT_SECRET                   JWT signing secret, at least 32 characters (required)
  STORAGE_BACKEND              postgres | memory [default: postgres]
  RELEASE_SWEEP_INTERVAL_SECS  Scheduled release sweep period [default: 30]
  METRICS_BIND                 Prometheus listener address (disabled when unset)
  RUN_MIGRATIONS               Apply schema migrations at startup [default: true]
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

    let overrides = CliOverrides {
        memory: pargs.contains("--memory"),
        bind: pargs.opt_value_from_str("--bind")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
    };

    let config = ServerConfig::from_env(overrides)?;
    config.validate()?;

    logging::init();
    info!("Starting arena server at {}", config.bind);

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(|e| anyhow::anyhow!(e))?;
        info!("Prometheus metrics exposed on {}", addr);
    }

    let auth = Arc::new(AuthManager::new(config.jwt_secret.clone()));

    let (manager, wallets): (TournamentManager, Arc<dyn WalletRepository>) = match config.storage
    {
        StorageBackend::Postgres => {
            info!("Connecting to database");
            let db = Database::new(&config.database)
                .await
                .context("Failed to connect to database")?;

            if config.run_migrations {
                db.migrate().await.context("Failed to apply migrations")?;
                info!("Database migrations applied");
            }

            let pool = Arc::new(db.pool().clone());
            let manager = TournamentManager::new(
                Arc::new(PgTournamentStore::new(pool.clone())),
                Arc::new(PgProfileRepository::new(pool.clone())),
            );
            let wallets: Arc<dyn WalletRepository> = Arc::new(WalletManager::new(pool));
            (manager, wallets)
        }
        StorageBackend::Memory => {
            log::warn!("Using in-memory storage; all state is lost on shutdown");
            let backend = Arc::new(MemoryBackend::new());
            let wallets: Arc<dyn WalletRepository> = backend.clone();
            (TournamentManager::with_backend(backend), wallets)
        }
    };
    let manager = Arc::new(manager);

    // SIGINT and SIGTERM both trigger a graceful shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.send(true);
    })?;

    let sweeper = sweeper::spawn(
        manager.clone(),
        config.release_sweep_interval,
        shutdown_rx.clone(),
    );

    let app = api::create_router(api::AppState {
        manager,
        wallets,
        auth,
    });

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_rx))
        .await
        .context("Server error")?;

    info!("Shutting down server...");
    let _ = sweeper.await;

    Ok(())
}

/// Resolves once the shutdown flag is raised
async fn shutdown_signal(mut shutdown: watch::Receiver<bool>) {
    while !*shutdown.borrow() {
        if shutdown.changed().await.is_err() {
            break;
        }
    }
}
