//! quill-gateway server entry point.
//!
//! Starts the Axum HTTP server over the configured storage backend.

use std::time::Duration;

use anyhow::Context;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use quill_gateway::api;
use quill_gateway::app_state::AppState;
use quill_gateway::config::{GatewayConfig, StorageBackend};
use quill_gateway::storage::{MemoryStore, PostgresStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = GatewayConfig::from_env()
        .map_err(|e| anyhow::anyhow!("failed to load configuration: {e}"))?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.json_logs {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        addr = %config.listen_addr,
        env = ?config.app_env,
        storage = %config.storage_backend,
        "starting quill-gateway"
    );

    let app_state = match config.storage_backend {
        StorageBackend::Postgres => {
            let options = config
                .database
                .clone()
                .context("postgres backend selected without database settings")?;
            let store = PostgresStore::connect_pool(
                options,
                config.database_max_connections,
                config.database_min_connections,
                Duration::from_secs(config.database_connect_timeout_secs),
            )
            .await
            .context("failed to connect to postgres")?;
            tracing::info!("connected to postgres");
            AppState::with_store(store, StorageBackend::Postgres.as_str(), &config.public_scheme)
        }
        StorageBackend::Memory => AppState::with_store(
            MemoryStore::new(),
            StorageBackend::Memory.as_str(),
            &config.public_scheme,
        ),
    };

    let app = Router::new().merge(api::build_router());

    #[cfg(feature = "swagger-ui")]
    let app = {
        use utoipa::OpenApi;
        app.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", api::ApiDoc::openapi()),
        )
    };

    let app = app
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
