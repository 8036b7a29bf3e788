//! # Organizit API Server
//!
//! Task tracker backend with a free/pro plan gate and a Flutterwave-backed
//! upgrade flow.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p organizit-api
//! ```
//!
//! Without `DATABASE_URL` the server runs on the in-memory store.

use organizit_api::{app, config::Config};
use organizit_shared::db::{
    migrations::run_migrations,
    pool::{close_pool, create_pool, DatabaseConfig},
};
use organizit_shared::payments::flutterwave::FlutterwaveClient;
use organizit_shared::store::{MemoryStore, PgStore, Store};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "organizit_api=debug,organizit_shared=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Organizit API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let (store, pool) = match &config.database.url {
        Some(url) => {
            let pool = create_pool(DatabaseConfig {
                max_connections: config.database.max_connections,
                ..DatabaseConfig::from_url(url.clone())
            })
            .await?;
            run_migrations(&pool).await?;
            let store: Arc<dyn Store> = Arc::new(PgStore::new(pool.clone()));
            (store, Some(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store; data is lost on exit");
            let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
            (store, None)
        }
    };

    if config.payment.webhook_secret_hash.is_none() {
        tracing::warn!("FLUTTERWAVE_SECRET_HASH not set, payment webhooks will be ignored");
    }

    let processor = Arc::new(FlutterwaveClient::new(config.payment.flutterwave())?);
    let bind_address = config.bind_address();

    let router = app::build_router(app::AppState::new(store, processor, config));

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(pool) = pool {
        close_pool(pool).await;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received, exiting...");
}
