//! Bazaar API server binary.
//!
//! Loads `config.yaml` (plus `APP_*` environment overrides), connects to
//! PostgreSQL, applies migrations and serves the HTTP API until SIGINT or
//! SIGTERM.

use std::path::PathBuf;

use bazaar_api::config::AppConfig;
use bazaar_api::{AppState, Repositories};
use clap::Parser;
use tracing::info;

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "bazaar_server", about = "Bazaar marketplace API server")]
struct Args {
    /// YAML configuration file. Missing is fine unless set explicitly.
    #[arg(long, env = "APP_CONFIG")]
    config: Option<PathBuf>,
}

const DEFAULT_CONFIG: &str = "config.yaml";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let required = args.config.is_some();
    let path = args.config.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let config = AppConfig::load(&path, required)?;

    // RUST_LOG wins over the configured level.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&config.logger.level))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(config = %path.display(), "starting bazaar_server");

    let pool = bazaar_core::db::connect(&config.db.settings()).await?;
    info!("running database migrations");
    bazaar_api::migrate(&pool).await?;

    let state = AppState::new(&config, Repositories::postgres(pool.clone()));
    let app = bazaar_api::router(state);

    let listener = tokio::net::TcpListener::bind(config.server.bind_addr()).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    info!("server stopped");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    info!("shutdown signal received");
}
