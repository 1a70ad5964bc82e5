pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod response;
pub mod routes;
pub mod state;

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogFormat, Settings};
use crate::state::ApiState;
use taskboard_auth::TokenIssuer;
use taskboard_core::{MemoryStore, Store};

/// Installs the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing(format: LogFormat) {
    let json = format == LogFormat::Json;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "taskboard_api=debug,taskboard_core=info,tower_http=debug,axum::rejection=trace".into()
            }),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();
}

/// Connects the store and builds the shared handler state.
pub async fn build_state(settings: &Settings) -> anyhow::Result<ApiState> {
    let store: Arc<dyn Store> = match settings.database_url {
        Some(ref db_url) => {
            let database =
                taskboard_db::Database::with_max_connections(db_url, settings.db_max_connections)
                    .await?;
            if settings.init_schema {
                database.init_schema().await?;
            }
            Arc::new(database)
        }
        None => {
            tracing::warn!("No DATABASE_URL provided, running without persistence");
            Arc::new(MemoryStore::new())
        }
    };

    let tokens = TokenIssuer::new(
        &settings.jwt_secret()?,
        chrono::Duration::minutes(settings.token_ttl_minutes),
    );

    Ok(ApiState::new(store, tokens, settings.max_export_rows))
}

pub async fn serve(settings: Settings) -> anyhow::Result<()> {
    let state = build_state(&settings).await?;
    let app = routes::create_router(state);

    let addr = format!("{}:{}", settings.host, settings.port);
    tracing::info!("Taskboard API server running on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
