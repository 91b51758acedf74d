//! bank_cards - Bank Card Management Backend API
//!
//! Serves card funds movement (withdrawal, recharge, transfer), spending
//! limits, block requests and card administration over HTTP.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bank_cards::api::{self, AppState};
use bank_cards::config::{LogFormat, StorageKind};
use bank_cards::domain::{SharedClock, SystemClock};
use bank_cards::store::{InMemoryStore, PgStore, Store};
use bank_cards::{db, Config};

/// Initialize tracing/logging
fn init_tracing(format: LogFormat) {
    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "bank_cards=debug,tower_http=debug".into()),
    );

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let clock: SharedClock = Arc::new(SystemClock::new(config.reference_zone()?));

    tracing::info!("Starting bank_cards server");

    match config.storage {
        StorageKind::Postgres => {
            tracing::info!("Connecting to database...");
            let pool = db::connect(&config).await?;
            db::verify_connection(&pool).await?;

            if !db::check_schema(&pool).await? {
                tracing::error!("Database schema is not complete. Please run migrations.");
                return Err(anyhow::anyhow!("Database schema incomplete"));
            }
            tracing::info!("Database connected successfully");

            let state = AppState::new(PgStore::new(pool.clone()), clock, config.card_validity_years);
            serve(state, addr).await?;

            pool.close().await;
            tracing::info!("Database connections closed. Goodbye!");
        }
        StorageKind::Memory => {
            if config.is_production() {
                tracing::warn!("In-memory storage selected in production; data is lost on restart");
            }

            let state = AppState::new(InMemoryStore::new(), clock, config.card_validity_years);
            serve(state, addr).await?;
        }
    }

    Ok(())
}

async fn serve<S: Store>(state: AppState<S>, addr: SocketAddr) -> anyhow::Result<()> {
    let app = api::build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutting down...");
    Ok(())
}

/// Shutdown signal handler for graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}
