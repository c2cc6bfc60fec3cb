//! Unlabel Storefront - cart and checkout API.
//!
//! This binary serves the JSON cart and checkout API on port 3000.
//!
//! # Architecture
//!
//! - Axum web framework, JSON in and out
//! - `PostgreSQL` (or an in-process store for local development) behind the
//!   `CommerceStore` seam
//! - tower-sessions for the authenticated user, issued by the account service
//!
//! Migrations are NOT run automatically on startup. Run them explicitly via
//! `cargo run -p unlabel-cli -- migrate`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use sentry::integrations::tracing as sentry_tracing;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use unlabel_storefront::config::{ConfigError, LogFormat, StoreBackend, StorefrontConfig};
use unlabel_storefront::db::{self, PgStore};
use unlabel_storefront::middleware::api_rate_limiter;
use unlabel_storefront::state::AppState;
use unlabel_storefront::store::{CatalogFileError, CommerceStore, MemoryStore};

/// Errors that stop the server from starting or running.
#[derive(Debug, Error)]
enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogFileError),
    #[error("rate limiter configuration rejected")]
    RateLimiter,
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

/// Install the tracing subscriber.
///
/// Defaults to info level for our crate if `RUST_LOG` is not set.
fn init_tracing(format: LogFormat) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "unlabel_storefront=info,tower_http=debug".into());

    let (pretty, json) = match format {
        LogFormat::Pretty => (Some(tracing_subscriber::fmt::layer()), None),
        LogFormat::Json => (None, Some(tracing_subscriber::fmt::layer().json())),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(pretty)
        .with(json)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

async fn run(config: StorefrontConfig) -> Result<(), StartupError> {
    let rate_limiter = api_rate_limiter(&config.rate_limit).ok_or(StartupError::RateLimiter)?;

    let app = match &config.store {
        StoreBackend::Postgres { database_url } => {
            let pool = db::create_pool(database_url).await?;
            tracing::info!("Database pool created");

            // Sessions share the store's database.
            let sessions = tower_sessions_sqlx_store::PostgresStore::new(pool.clone());
            let store: Arc<dyn CommerceStore> = Arc::new(PgStore::new(pool, config.lock_timeout));
            unlabel_storefront::app(
                AppState::new(config.clone(), store),
                sessions,
                Some(rate_limiter),
            )
        }
        StoreBackend::Memory { catalog_file } => {
            tracing::warn!("Using in-memory store; nothing will be persisted");
            let memory = MemoryStore::new();
            match catalog_file {
                Some(path) => {
                    let count = memory.load_catalog(path).await?;
                    tracing::info!(path = %path.display(), count, "Catalog loaded");
                }
                None => tracing::warn!("STOREFRONT_CATALOG_FILE not set; catalog is empty"),
            }
            let store: Arc<dyn CommerceStore> = Arc::new(memory);
            unlabel_storefront::app(
                AppState::new(config.clone(), store),
                tower_sessions::MemoryStore::default(),
                Some(rate_limiter),
            )
        }
    };

    let addr = config.socket_addr();
    tracing::info!("storefront listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load configuration from environment (needed for Sentry init)
    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            #[allow(clippy::print_stderr)] // tracing is not installed yet
            {
                eprintln!("Failed to load configuration: {e}");
            }
            return ExitCode::FAILURE;
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);
    init_tracing(config.log_format);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Storefront stopped");
            ExitCode::FAILURE
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
